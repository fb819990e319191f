//! Book Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{BookError, BookId, ChapterSummary};

/// 当前清单格式版本
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// 书籍级资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// 无缝拼接的整书音频
    Container,
    /// 章节标记文件
    Chapters,
    /// 源文档副本
    Source,
    Manifest,
}

/// Book 聚合根
///
/// 不变量:
/// - 只在所属 Job 完成时整体发布
/// - 删除后不再出现在列表中，也不再提供任何章节或资源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    book_id: BookId,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    chapters: Vec<ChapterSummary>,
    assets: BTreeMap<AssetKind, String>,
    generated_at: DateTime<Utc>,
}

impl Book {
    pub fn new(book_id: BookId, title: impl Into<String>, author: Option<String>) -> Self {
        Self {
            book_id,
            title: title.into(),
            author,
            chapters: Vec::new(),
            assets: BTreeMap::new(),
            generated_at: Utc::now(),
        }
    }

    pub fn add_chapter(&mut self, chapter: ChapterSummary) {
        self.chapters.push(chapter);
    }

    pub fn set_asset(&mut self, kind: AssetKind, filename: impl Into<String>) {
        self.assets.insert(kind, filename.into());
    }

    pub fn chapter_mut(&mut self, index: u32) -> Result<&mut ChapterSummary, BookError> {
        self.chapters
            .iter_mut()
            .find(|c| c.index == index)
            .ok_or(BookError::ChapterNotFound(index))
    }

    /// 标记生成完成时间
    pub fn touch(&mut self) {
        self.generated_at = Utc::now();
    }

    // Getters
    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn chapters(&self) -> &[ChapterSummary] {
        &self.chapters
    }

    pub fn chapter(&self, index: u32) -> Option<&ChapterSummary> {
        self.chapters.iter().find(|c| c.index == index)
    }

    pub fn assets(&self) -> &BTreeMap<AssetKind, String> {
        &self.assets
    }

    /// 只有登记过的资源文件名才可下载
    pub fn has_asset_file(&self, filename: &str) -> bool {
        self.assets.values().any(|f| f == filename)
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn ready_count(&self) -> usize {
        self.chapters.iter().filter(|c| c.is_ready()).count()
    }

    pub fn all_ready(&self) -> bool {
        !self.chapters.is_empty() && self.chapters.iter().all(|c| c.is_ready())
    }
}

/// 书籍清单（manifest.json）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(flatten)]
    pub book: Book,
}

impl Manifest {
    pub fn new(book: Book, job_id: Option<Uuid>) -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            job_id,
            book,
        }
    }
}
