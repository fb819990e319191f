//! Synthesis Engine Port - 语音合成引擎抽象
//!
//! 文本 → (音频, 朴素词边界)，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::timing::WordBoundary;
use crate::domain::AudioBuffer;

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    /// 计算设备（cpu / cuda），由后端自行解释
    pub device: Option<String>,
}

/// 合成结果
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub audio: AudioBuffer,
    /// 朴素词边界（可能为空），只作为对齐的临时输入
    pub boundaries: Vec<WordBoundary>,
}

/// Synthesis Engine Port
#[async_trait]
pub trait SynthesisEnginePort: Send + Sync {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError>;

    /// 检查合成服务是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
