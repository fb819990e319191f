//! Book Repository Port - 有声书持久化抽象
//!
//! 任务在暂存目录里写出全部产物，完成时整体发布；删除同样对读者原子可见

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::book::{Book, BookId, ChapterMetadata, Manifest};

/// 仓储错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(err.to_string())
        } else {
            Self::Io(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// 已打开的书籍文件（用于流式响应）
#[derive(Debug)]
pub struct BookFile {
    pub path: PathBuf,
    pub file: tokio::fs::File,
    pub len: u64,
}

/// Book Repository Port
#[async_trait]
pub trait BookRepositoryPort: Send + Sync {
    /// 为任务创建暂存目录
    async fn prepare(&self, book_id: &BookId) -> Result<PathBuf, RepositoryError>;

    /// 在暂存目录写入清单，然后整体发布并登记
    async fn publish(&self, staging: &Path, manifest: Manifest) -> Result<Book, RepositoryError>;

    /// 丢弃暂存目录（失败的任务）
    async fn discard(&self, staging: &Path);

    /// 列出所有已发布的书
    fn find_all(&self) -> Vec<Book>;

    fn find_by_id(&self, book_id: &BookId) -> Option<Book>;

    fn exists(&self, book_id: &BookId) -> bool;

    /// 删除书籍：先从索引移除，再清理磁盘
    async fn delete(&self, book_id: &BookId) -> Result<(), RepositoryError>;

    /// 读取章节元数据
    async fn read_chapter_metadata(
        &self,
        book_id: &BookId,
        chapter_index: u32,
    ) -> Result<ChapterMetadata, RepositoryError>;

    /// 打开书籍目录中的文件
    async fn open_file(&self, book_id: &BookId, filename: &str) -> Result<BookFile, RepositoryError>;
}
