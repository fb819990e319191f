//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, SynthesisEngineKind};
use crate::application::AlignmentSelection;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// # 环境变量示例
/// - `NARRATOR_SERVER__PORT=8080`
/// - `NARRATOR_SYNTHESIS__URL=http://tts-server:8000`
/// - `NARRATOR_SYNTHESIS__VOICES=af_heart,bm_fable`
/// - `NARRATOR_ALIGNMENT__URL=http://aligner:9000`
/// - `NARRATOR_GATEWAY__BASE_URL=http://narrator:5080`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5080)?
        .set_default("synthesis.engine", "http")?
        .set_default("synthesis.url", "http://localhost:8000")?
        .set_default("synthesis.timeout_secs", 300)?
        .set_default("synthesis.max_retries", 2)?
        .set_default("synthesis.default_voice", "af_heart")?
        .set_default("synthesis.chunk_chars", 3000)?
        .set_default("alignment.default_backend", "whisperx")?
        .set_default("alignment.timeout_secs", 600)?
        .set_default("storage.books_dir", "data/books")?
        .set_default("storage.uploads_dir", "data/uploads")?
        .set_default("storage.max_upload_size", 50 * 1024 * 1024)?
        .set_default("worker.max_concurrent_jobs", 1)?
        .set_default("worker.queue_capacity", 64)?
        .set_default("jobs.ttl_secs", 24 * 60 * 60)?
        .set_default("jobs.sweep_interval_secs", 10 * 60)?
        .set_default("gateway.host", "0.0.0.0")?
        .set_default("gateway.port", 5090)?
        .set_default("gateway.timeout_secs", 300)?
        .set_default("gateway.temp_dir", "data/gateway-uploads")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    builder = builder.add_source(
        Environment::with_prefix("NARRATOR")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("synthesis.voices")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

    if config.server.port == 0 {
        return invalid("Server port cannot be 0".to_string());
    }
    if config.gateway.port == 0 {
        return invalid("Gateway port cannot be 0".to_string());
    }

    let synthesis = &config.synthesis;
    if synthesis.chunk_chars == 0 {
        return invalid("synthesis.chunk_chars must be greater than 0".to_string());
    }
    if synthesis.voices.is_empty() {
        return invalid("synthesis.voices cannot be empty".to_string());
    }
    if !synthesis.voices.contains(&synthesis.default_voice) {
        return invalid(format!(
            "synthesis.default_voice '{}' is not in synthesis.voices",
            synthesis.default_voice
        ));
    }
    if synthesis.engine == SynthesisEngineKind::Http
        && synthesis.url.as_deref().map(str::trim).unwrap_or_default().is_empty()
    {
        return invalid("synthesis.url is required when synthesis.engine = \"http\"".to_string());
    }

    if AlignmentSelection::parse(&config.alignment.default_backend).is_none() {
        return invalid(format!(
            "Unknown alignment.default_backend '{}'",
            config.alignment.default_backend
        ));
    }

    if config.worker.max_concurrent_jobs == 0 {
        return invalid("worker.max_concurrent_jobs must be greater than 0".to_string());
    }
    if config.worker.queue_capacity == 0 {
        return invalid("worker.queue_capacity must be greater than 0".to_string());
    }
    if config.jobs.ttl_secs == 0 || config.jobs.sweep_interval_secs == 0 {
        return invalid("jobs.ttl_secs and jobs.sweep_interval_secs must be greater than 0".to_string());
    }

    Ok(())
}

/// 打印配置信息（生成服务启动时）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Public Base URL: {}", config.server.public_base_url());
    tracing::info!("Synthesis Engine: {:?}", config.synthesis.engine);
    if let Some(url) = &config.synthesis.url {
        tracing::info!("Synthesis URL: {}", url);
    }
    tracing::info!("Synthesis Timeout: {}s", config.synthesis.timeout_secs);
    tracing::info!("Voices: {}", config.synthesis.voices.join(", "));
    tracing::info!("Default Voice: {}", config.synthesis.default_voice);
    tracing::info!("Chunk Size: {} chars", config.synthesis.chunk_chars);
    match &config.alignment.url {
        Some(url) => tracing::info!("Alignment URL: {}", url),
        None => tracing::info!("Alignment URL: <not configured, heuristic timing only>"),
    }
    tracing::info!("Default Alignment: {}", config.alignment.default_backend);
    tracing::info!("Books Directory: {:?}", config.storage.books_dir);
    tracing::info!("Uploads Directory: {:?}", config.storage.uploads_dir);
    tracing::info!("Max Concurrent Jobs: {}", config.worker.max_concurrent_jobs);
    tracing::info!("Finished Job TTL: {}s", config.jobs.ttl_secs);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

/// 打印 Gateway 配置
pub fn print_gateway_config(config: &AppConfig) {
    tracing::info!("=== Gateway Configuration ===");
    tracing::info!("Listen: {}", config.gateway.addr());
    match &config.gateway.base_url {
        Some(url) => tracing::info!("Upstream: {}", url),
        None => tracing::warn!("Upstream: <not configured, every request returns 503>"),
    }
    tracing::info!("Upstream Timeout: {}s", config.gateway.timeout_secs);
    tracing::info!("Temp Directory: {:?}", config.gateway.temp_dir);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=============================");
}
