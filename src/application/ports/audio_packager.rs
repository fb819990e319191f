//! Audio Packager Port - 打包阶段抽象
//!
//! 章节音频写出与整书无缝拼接（带章节标记）

use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::AudioBuffer;

/// 打包错误
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Incompatible audio: {0}")]
    Incompatible(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for PackagingError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// 参与拼接的章节
#[derive(Debug, Clone)]
pub struct ContainerChapter {
    pub title: String,
    pub audio_path: PathBuf,
}

/// 整书中的章节标记
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMarker {
    pub title: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Audio Packager Port
#[async_trait]
pub trait AudioPackagerPort: Send + Sync {
    /// 音频文件扩展名
    fn extension(&self) -> &'static str;

    /// 写出单章音频
    async fn write_chapter_audio(&self, path: &Path, audio: &AudioBuffer) -> Result<(), PackagingError>;

    /// 无缝拼接全部章节并嵌入章节标记，返回各章节在整书中的位置
    async fn build_container(
        &self,
        chapters: &[ContainerChapter],
        output: &Path,
    ) -> Result<Vec<ChapterMarker>, PackagingError>;
}

fn escape_ffmetadata(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 生成 ffmetadata 章节文件（时间基 1/1000）
pub fn render_ffmetadata(title: &str, author: Option<&str>, markers: &[ChapterMarker]) -> String {
    let mut out = String::from(";FFMETADATA1\n");
    let _ = writeln!(out, "title={}", escape_ffmetadata(title));
    if let Some(author) = author {
        let _ = writeln!(out, "artist={}", escape_ffmetadata(author));
    }
    for marker in markers {
        out.push_str("\n[CHAPTER]\nTIMEBASE=1/1000\n");
        let _ = writeln!(out, "START={}", marker.start_ms);
        let _ = writeln!(out, "END={}", marker.end_ms);
        let _ = writeln!(out, "title={}", escape_ffmetadata(&marker.title));
    }
    out
}
