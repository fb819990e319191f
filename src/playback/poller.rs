//! Job Poller - 客户端任务状态轮询
//!
//! 按固定间隔请求 `GET {base}/api/tasks/{job_id}`，直到任务进入
//! `completed` 或 `failed`。状态的滞后上限即轮询间隔

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::infrastructure::http::dto::TaskStatusResponse;

/// 轮询错误
#[derive(Debug, Error)]
pub enum PollError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Status request failed with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unknown job status: {0}")]
    UnknownStatus(String),

    #[error("Job {job_id} still running after {polls} polls")]
    GaveUp { job_id: Uuid, polls: u32 },
}

/// 轮询配置
#[derive(Debug, Clone)]
pub struct JobPollerConfig {
    /// 生成服务或 Gateway 的地址
    pub base_url: String,
    pub interval: Duration,
    /// None 表示一直轮询到终态
    pub max_polls: Option<u32>,
    pub request_timeout: Duration,
}

impl JobPollerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            interval: Duration::from_secs(3),
            max_polls: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }
}

/// 任务状态轮询器
pub struct JobPoller {
    client: Client,
    config: JobPollerConfig,
}

impl JobPoller {
    pub fn new(config: JobPollerConfig) -> Result<Self, PollError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    fn status_url(&self, job_id: Uuid) -> String {
        format!(
            "{}/api/tasks/{}",
            self.config.base_url.trim_end_matches('/'),
            job_id
        )
    }

    /// 查询一次任务状态
    pub async fn status(&self, job_id: Uuid) -> Result<TaskStatusResponse, PollError> {
        let response = self.client.get(self.status_url(job_id)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PollError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let task: TaskStatusResponse = response.json().await?;
        if task.job_status().is_none() {
            return Err(PollError::UnknownStatus(task.status));
        }
        Ok(task)
    }

    /// 轮询直到终态，返回最终的任务状态
    pub async fn wait(&self, job_id: Uuid) -> Result<TaskStatusResponse, PollError> {
        let mut polls = 0u32;
        let mut last_seen: Option<(String, Option<u32>)> = None;

        loop {
            let task = self.status(job_id).await?;
            polls += 1;

            let seen = (task.status.clone(), task.chapter);
            if last_seen.as_ref() != Some(&seen) {
                tracing::debug!(
                    job_id = %job_id,
                    status = %task.status,
                    chapter = ?task.chapter,
                    "Job status changed"
                );
                last_seen = Some(seen);
            }

            if task.is_terminal() {
                tracing::info!(job_id = %job_id, status = %task.status, polls, "Job finished");
                return Ok(task);
            }

            if self.config.max_polls.is_some_and(|max| polls >= max) {
                return Err(PollError::GaveUp { job_id, polls });
            }

            tokio::time::sleep(self.config.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    fn task(status: &str, chapter: Option<u32>) -> TaskStatusResponse {
        TaskStatusResponse {
            job_id: Uuid::nil(),
            book_id: "moby-dick".into(),
            status: status.into(),
            chapter,
            detail: None,
            chapters: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct Service {
        calls: AtomicUsize,
        finish_after: usize,
    }

    /// 依次返回 pending → synthesizing(1)… → completed
    async fn spawn_service(finish_after: usize) -> (String, Arc<Service>) {
        async fn status(State(service): State<Arc<Service>>) -> Json<TaskStatusResponse> {
            let n = service.calls.fetch_add(1, Ordering::SeqCst);
            Json(match n {
                0 => task("pending", None),
                n if n < service.finish_after => task("synthesizing", Some(1)),
                _ => task("completed", None),
            })
        }

        let service = Arc::new(Service {
            calls: AtomicUsize::new(0),
            finish_after,
        });
        let app = Router::new()
            .route("/api/tasks/:job_id", get(status))
            .with_state(service.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), service)
    }

    #[tokio::test]
    async fn test_polls_until_terminal() {
        let (base, service) = spawn_service(2).await;
        let poller = JobPoller::new(
            JobPollerConfig::new(base).with_interval(Duration::from_millis(10)),
        )
        .unwrap();

        let task = poller.wait(Uuid::nil()).await.unwrap();
        assert_eq!(task.status, "completed");
        assert!(task.is_terminal());
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_polls() {
        let (base, _) = spawn_service(1000).await;
        let poller = JobPoller::new(
            JobPollerConfig::new(base)
                .with_interval(Duration::from_millis(5))
                .with_max_polls(3),
        )
        .unwrap();

        let result = poller.wait(Uuid::nil()).await;
        assert!(matches!(result, Err(PollError::GaveUp { polls: 3, .. })));
    }

    #[tokio::test]
    async fn test_unknown_job_is_status_error() {
        async fn missing() -> (StatusCode, &'static str) {
            (StatusCode::NOT_FOUND, r#"{"errno":404,"error":"Job not found"}"#)
        }

        let app = Router::new().route("/api/tasks/:job_id", get(missing));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let poller = JobPoller::new(JobPollerConfig::new(format!("http://{}/", addr))).unwrap();
        let result = poller.status(Uuid::new_v4()).await;
        assert!(matches!(result, Err(PollError::Status { status: 404, .. })));
    }
}
