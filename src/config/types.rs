//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 语音合成配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 强制对齐配置
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 后台任务配置
    #[serde(default)]
    pub worker: WorkerConfig,

    /// 任务记录保留配置
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Chapter Gateway 配置
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 公开访问的 Base URL
    /// 如果未设置，则使用 http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取公开的 Base URL
    pub fn public_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            let host = if self.host == "0.0.0.0" {
                "localhost"
            } else {
                &self.host
            };
            format!("http://{}:{}", host, self.port)
        })
    }
}

/// 合成引擎类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisEngineKind {
    /// 远程 HTTP 合成服务
    Http,
    /// 本地正弦音合成（开发用）
    Tone,
}

/// 语音合成配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_engine")]
    pub engine: SynthesisEngineKind,

    /// 合成服务基础 URL（engine = http 时必填）
    #[serde(default)]
    pub url: Option<String>,

    /// 请求超时时间（秒）
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,

    /// 最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 可选音色
    #[serde(default = "default_voices")]
    pub voices: Vec<String>,

    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// 单次合成的最大字符数
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
}

fn default_engine() -> SynthesisEngineKind {
    SynthesisEngineKind::Http
}

fn default_synthesis_timeout() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    2
}

fn default_voices() -> Vec<String> {
    ["af_heart", "af_bella", "am_fenrir", "bf_emma", "bm_fable"]
        .iter()
        .map(|v| v.to_string())
        .collect()
}

fn default_voice() -> String {
    "af_heart".to_string()
}

fn default_chunk_chars() -> usize {
    3000
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            url: Some("http://localhost:8000".to_string()),
            timeout_secs: default_synthesis_timeout(),
            max_retries: default_max_retries(),
            voices: default_voices(),
            default_voice: default_voice(),
            chunk_chars: default_chunk_chars(),
        }
    }
}

/// 强制对齐配置
#[derive(Debug, Clone, Deserialize)]
pub struct AlignmentConfig {
    /// 对齐服务基础 URL，未设置时所有模型后端均不可用
    #[serde(default)]
    pub url: Option<String>,

    /// 默认后端（auto / whisperx / nemo / torchaudio / heuristic）
    #[serde(default = "default_backend")]
    pub default_backend: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_alignment_timeout")]
    pub timeout_secs: u64,
}

fn default_backend() -> String {
    "whisperx".to_string()
}

fn default_alignment_timeout() -> u64 {
    600
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            url: None,
            default_backend: default_backend(),
            timeout_secs: default_alignment_timeout(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 有声书目录（每本书一个子目录）
    #[serde(default = "default_books_dir")]
    pub books_dir: PathBuf,

    /// 上传文件暂存目录
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// 上传文件最大大小（字节），默认 50MB
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_books_dir() -> PathBuf {
    PathBuf::from("data/books")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_max_upload_size() -> u64 {
    50 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            books_dir: default_books_dir(),
            uploads_dir: default_uploads_dir(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

/// 后台任务配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// 同时运行的任务数
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// 等待队列容量，满时提交返回 503
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_max_concurrent_jobs() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// 任务记录保留配置
///
/// 终态任务在 `ttl_secs` 后从登记表中清除，清理每 `sweep_interval_secs` 执行一次
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_job_ttl")]
    pub ttl_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_job_ttl() -> u64 {
    24 * 60 * 60
}

fn default_sweep_interval() -> u64 {
    10 * 60
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_job_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Chapter Gateway 配置
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// 生成服务地址；未设置时所有代理请求返回 503
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// 上游请求超时时间（秒）
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,

    /// 上传文件暂存目录
    #[serde(default = "default_gateway_temp_dir")]
    pub temp_dir: PathBuf,

    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_gateway_port() -> u16 {
    5090
}

fn default_gateway_timeout() -> u64 {
    300
}

fn default_gateway_temp_dir() -> PathBuf {
    PathBuf::from("data/gateway-uploads")
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            host: default_host(),
            port: default_gateway_port(),
            timeout_secs: default_gateway_timeout(),
            temp_dir: default_gateway_temp_dir(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

impl GatewayConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5080);
        assert_eq!(config.synthesis.voices.len(), 5);
        assert_eq!(config.synthesis.chunk_chars, 3000);
        assert_eq!(config.worker.max_concurrent_jobs, 1);
        assert!(config.alignment.url.is_none());
        assert!(config.gateway.base_url.is_none());
    }

    #[test]
    fn test_public_base_url() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5080");
        assert_eq!(config.public_base_url(), "http://localhost:5080");
    }
}
