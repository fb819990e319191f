//! Book Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("invalid book id: {0}")]
    InvalidBookId(String),

    #[error("invalid chapter range: {0}")]
    InvalidRange(String),

    #[error("chapter not found: {0}")]
    ChapterNotFound(u32),
}

/// 源文档解析与章节选择失败（Job 进入 Failed）
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("source is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("failed to parse source: {0}")]
    Parse(String),

    #[error("source contains no chapters")]
    NoChapters,

    #[error("chapter range {start}..{end} exceeds chapter count {count}")]
    RangeOutOfBounds { start: u32, end: String, count: usize },

    #[error("failed to read source: {0}")]
    Io(String),
}
