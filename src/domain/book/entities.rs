//! Book Context - Entities

use serde::{Deserialize, Serialize};

use super::value_objects::slugify;
use crate::domain::timing::{validate_timings, TimingError, WordTiming};

/// 章节处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

/// 章节摘要（清单中的一项）
///
/// 只有打包成功后才会进入 `Ready`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub index: u32,
    pub title: String,
    pub status: ChapterStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ChapterSummary {
    pub fn pending(index: u32, title: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            status: ChapterStatus::Pending,
            duration_ms: None,
            audio: None,
            metadata: None,
            detail: None,
        }
    }

    pub fn mark_processing(&mut self) {
        self.status = ChapterStatus::Processing;
    }

    pub fn mark_ready(&mut self, duration_ms: u64, audio: String, metadata: String) {
        self.status = ChapterStatus::Ready;
        self.duration_ms = Some(duration_ms);
        self.audio = Some(audio);
        self.metadata = Some(metadata);
        self.detail = None;
    }

    pub fn mark_failed(&mut self, detail: impl Into<String>) {
        self.status = ChapterStatus::Failed;
        self.detail = Some(detail.into());
    }

    pub fn is_ready(&self) -> bool {
        self.status == ChapterStatus::Ready
    }

    /// 章节文件名主干: `0001_<title-slug>`
    pub fn file_stem(&self) -> String {
        chapter_file_stem(self.index, &self.title)
    }
}

pub fn chapter_file_stem(index: u32, title: &str) -> String {
    format!("{:04}_{}", index, slugify(title, "chapter"))
}

/// 章节元数据（播放同步客户端的输入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMetadata {
    pub chapter_index: u32,
    pub chapter_title: String,
    pub audio_file: String,
    pub duration_ms: u64,
    pub text: String,
    pub words: Vec<WordTiming>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_author: Option<String>,
}

impl ChapterMetadata {
    /// 校验逐词时间戳不变量
    pub fn validate(&self) -> Result<(), TimingError> {
        validate_timings(&self.text, &self.words)
    }
}
