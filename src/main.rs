//! Narrator - 有声书生成服务
//!
//! 启动顺序: 配置 → 日志 → 存储 → 合成/对齐后端 → 生成 Worker → HTTP 服务

use std::sync::Arc;
use std::time::Duration;

use narrator::application::{
    AlignerRegistry, AlignmentBackend, AlignmentPolicy, AlignmentSelection, GenerationDefaults,
    SynthesisEnginePort,
};
use narrator::config::{load_config, print_config, AppConfig, SynthesisEngineKind};
use narrator::domain::ChunkConfig;
use narrator::infrastructure::adapters::{
    HttpAligner, HttpSynthesisClient, HttpSynthesisClientConfig, PlainTextParser, ToneSynthesizer,
    ToneSynthesizerConfig, WavContainerPackager,
};
use narrator::infrastructure::http::{AppState, HttpServer, ServerConfig, UploadSettings};
use narrator::infrastructure::memory::InMemoryJobRegistry;
use narrator::infrastructure::persistence::FileBookRepository;
use narrator::infrastructure::worker::{
    GenerationPipeline, GenerationWorker, GenerationWorkerConfig,
};
use tokio::sync::mpsc;

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},narrator={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_synthesis_engine(config: &AppConfig) -> anyhow::Result<Arc<dyn SynthesisEnginePort>> {
    let engine: Arc<dyn SynthesisEnginePort> = match config.synthesis.engine {
        SynthesisEngineKind::Http => {
            let url = config
                .synthesis
                .url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("synthesis.url is not configured"))?;
            let client_config = HttpSynthesisClientConfig::new(url)
                .with_timeout(config.synthesis.timeout_secs)
                .with_retries(config.synthesis.max_retries);
            Arc::new(HttpSynthesisClient::new(client_config)?)
        }
        SynthesisEngineKind::Tone => Arc::new(ToneSynthesizer::new(ToneSynthesizerConfig::default())),
    };
    Ok(engine)
}

/// 按配置注册模型对齐后端；未配置 URL 时只剩启发式估计
fn build_aligner_registry(config: &AppConfig) -> anyhow::Result<AlignerRegistry> {
    let mut registry = AlignerRegistry::new();
    let Some(url) = &config.alignment.url else {
        tracing::warn!("No alignment service configured, word timings will be estimated");
        return Ok(registry);
    };

    let client = HttpAligner::build_client(config.alignment.timeout_secs)?;
    for backend in AlignmentBackend::AUTO_SEQUENCE {
        registry = registry.register(
            backend,
            Arc::new(HttpAligner::new(client.clone(), url.clone(), backend)),
        );
    }
    Ok(registry)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Narrator - audiobook generation service");
    print_config(&config);

    // 确保数据目录存在
    tokio::fs::create_dir_all(&config.storage.books_dir).await?;
    tokio::fs::create_dir_all(&config.storage.uploads_dir).await?;

    // 任务队列与存储
    let (job_tx, job_rx) = mpsc::channel(config.worker.queue_capacity);
    let job_registry = InMemoryJobRegistry::new(job_tx).arc();
    let book_repo = Arc::new(FileBookRepository::open(&config.storage.books_dir).await?);
    let parser = Arc::new(PlainTextParser::new());

    // 合成与对齐后端
    let synthesis = build_synthesis_engine(&config)?;
    let aligners = build_aligner_registry(&config)?;

    let default_alignment = AlignmentSelection::parse(&config.alignment.default_backend)
        .ok_or_else(|| anyhow::anyhow!("Unknown alignment backend: {}", config.alignment.default_backend))?;
    let defaults = GenerationDefaults {
        voices: config.synthesis.voices.clone(),
        default_voice: config.synthesis.default_voice.clone(),
        default_alignment,
    };

    // 生成流水线与 Worker
    let pipeline = Arc::new(GenerationPipeline::new(
        job_registry.clone(),
        book_repo.clone(),
        parser.clone(),
        synthesis,
        AlignmentPolicy::new(aligners.clone()),
        Arc::new(WavContainerPackager::new()),
        ChunkConfig {
            max_chars: config.synthesis.chunk_chars,
        },
    ));
    let worker = GenerationWorker::new(
        GenerationWorkerConfig {
            max_concurrent_jobs: config.worker.max_concurrent_jobs,
        },
        job_rx,
        pipeline,
    );

    // 启动 Worker 与过期任务清理
    tokio::spawn(worker.run());
    tokio::spawn(job_registry.clone().run_expiry_sweeper(
        Duration::from_secs(config.jobs.ttl_secs),
        Duration::from_secs(config.jobs.sweep_interval_secs),
    ));

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let state = AppState::new(
        job_registry,
        book_repo,
        parser,
        defaults,
        aligners,
        UploadSettings {
            dir: config.storage.uploads_dir.clone(),
            max_size: config.storage.max_upload_size,
        },
    );

    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
