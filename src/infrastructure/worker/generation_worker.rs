//! Generation Worker - 后台任务处理器
//!
//! 从队列消费 job_id，用 Semaphore 限制同时运行的任务数

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use super::pipeline::GenerationPipeline;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct GenerationWorkerConfig {
    /// 最大并发任务数（合成与对齐共享计算设备）
    pub max_concurrent_jobs: usize,
}

impl Default for GenerationWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
        }
    }
}

/// 生成 Worker
pub struct GenerationWorker {
    config: GenerationWorkerConfig,
    queue_receiver: mpsc::Receiver<Uuid>,
    pipeline: Arc<GenerationPipeline>,
}

impl GenerationWorker {
    pub fn new(
        config: GenerationWorkerConfig,
        queue_receiver: mpsc::Receiver<Uuid>,
        pipeline: Arc<GenerationPipeline>,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            pipeline,
        }
    }

    /// 启动 Worker，队列关闭后返回
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "GenerationWorker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_jobs.max(1)));

        while let Some(job_id) = self.queue_receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Failed to acquire semaphore permit");
                    continue;
                }
            };

            let pipeline = self.pipeline.clone();
            tokio::spawn(async move {
                let _permit = permit; // 持有 permit 直到任务结束

                // 在独立任务里运行，panic 时也能把任务标记为失败
                let runner = pipeline.clone();
                let handle = tokio::spawn(async move { runner.run(job_id).await });
                if let Err(e) = handle.await {
                    tracing::error!(job_id = %job_id, error = %e, "Job task aborted");
                    let _ = pipeline
                        .job_registry()
                        .fail(job_id, "internal error while generating audiobook".to_string());
                }
            });
        }

        tracing::info!("GenerationWorker stopped");
    }
}
