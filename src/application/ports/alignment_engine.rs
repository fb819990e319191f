//! Alignment Engine Port - 强制对齐后端抽象
//!
//! (音频, 文本) → 精确词边界；后端可能未安装或不可用

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::timing::WordBoundary;
use crate::domain::AudioBuffer;

/// 对齐错误
#[derive(Debug, Error)]
pub enum AlignmentError {
    /// 后端未配置、未安装或暂不可用
    #[error("Alignment backend unavailable: {0}")]
    Unavailable(String),

    #[error("Alignment failed: {0}")]
    Failed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 已知的对齐后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentBackend {
    WhisperX,
    Nemo,
    TorchAudio,
    Heuristic,
}

impl AlignmentBackend {
    /// 注册表中的全部后端（列出顺序）
    pub const ALL: [AlignmentBackend; 4] = [
        AlignmentBackend::WhisperX,
        AlignmentBackend::Nemo,
        AlignmentBackend::TorchAudio,
        AlignmentBackend::Heuristic,
    ];

    /// `auto` 依次尝试的模型后端
    pub const AUTO_SEQUENCE: [AlignmentBackend; 3] = [
        AlignmentBackend::WhisperX,
        AlignmentBackend::Nemo,
        AlignmentBackend::TorchAudio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentBackend::WhisperX => "whisperx",
            AlignmentBackend::Nemo => "nemo",
            AlignmentBackend::TorchAudio => "torchaudio",
            AlignmentBackend::Heuristic => "heuristic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisperx" => Some(AlignmentBackend::WhisperX),
            "nemo" => Some(AlignmentBackend::Nemo),
            "torchaudio" => Some(AlignmentBackend::TorchAudio),
            "heuristic" => Some(AlignmentBackend::Heuristic),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlignmentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 提交任务时选择的对齐方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentSelection {
    /// 按 whisperx → nemo → torchaudio 依次尝试
    Auto,
    Backend(AlignmentBackend),
}

impl AlignmentSelection {
    /// 解析请求参数，未知名称返回 None
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Some(AlignmentSelection::Auto);
        }
        AlignmentBackend::parse(s).map(AlignmentSelection::Backend)
    }

    /// 需要依次尝试的模型后端（heuristic 不调用任何模型）
    pub fn sequence(&self) -> Vec<AlignmentBackend> {
        match self {
            AlignmentSelection::Auto => AlignmentBackend::AUTO_SEQUENCE.to_vec(),
            AlignmentSelection::Backend(AlignmentBackend::Heuristic) => Vec::new(),
            AlignmentSelection::Backend(backend) => vec![*backend],
        }
    }
}

impl std::fmt::Display for AlignmentSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentSelection::Auto => write!(f, "auto"),
            AlignmentSelection::Backend(b) => write!(f, "{}", b),
        }
    }
}

/// Alignment Engine Port
#[async_trait]
pub trait AlignmentEnginePort: Send + Sync {
    /// 对齐一段章节音频
    async fn align(
        &self,
        audio: &AudioBuffer,
        text: &str,
        device: Option<&str>,
    ) -> Result<Vec<WordBoundary>, AlignmentError>;
}

/// 显式的后端注册表（按名称选择，不做运行时类型探测）
#[derive(Clone, Default)]
pub struct AlignerRegistry {
    engines: HashMap<AlignmentBackend, Arc<dyn AlignmentEnginePort>>,
}

impl AlignerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, backend: AlignmentBackend, engine: Arc<dyn AlignmentEnginePort>) -> Self {
        self.engines.insert(backend, engine);
        self
    }

    pub fn get(&self, backend: AlignmentBackend) -> Option<Arc<dyn AlignmentEnginePort>> {
        self.engines.get(&backend).cloned()
    }

    /// 可供选择的名称: `auto` + 全部后端
    pub fn names(&self) -> Vec<String> {
        std::iter::once("auto".to_string())
            .chain(AlignmentBackend::ALL.iter().map(|b| b.as_str().to_string()))
            .collect()
    }
}
