//! Timing Context - 逐词时间戳上下文
//!
//! 职责:
//! - WordTiming 数据契约与不变量校验
//! - 分词与权重
//! - 启发式时间估计
//! - 对齐结果映射

mod heuristic;
mod mapping;
mod tokenizer;
mod word_timing;

use thiserror::Error;

pub use heuristic::{estimate_timings, ChunkTiming};
pub use mapping::{apply_word_boundaries, WordBoundary};
pub use tokenizer::{normalize_token, token_weight, tokenize, Token};
pub use word_timing::{enforce_monotonic, reconstruct_text, validate_timings, WordTiming};

/// 时间戳不变量错误（携带出错的词序号）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("空的字符区间: #{0}")]
    EmptySpan(usize),

    #[error("字符区间重叠或乱序: #{0}")]
    OverlappingSpan(usize),

    #[error("字符区间越界: #{0}")]
    SpanOutOfBounds(usize),

    #[error("词与原文不一致: #{0}")]
    TokenMismatch(usize),

    #[error("结束时间早于开始时间: #{0}")]
    InvertedTiming(usize),

    #[error("开始时间非单调: #{0}")]
    NonMonotonic(usize),
}
