//! File Book Repository - 文件系统有声书仓储
//!
//! 目录布局:
//! - `<root>/<book_id>/` 已发布的书（章节音频、章节 JSON、整书音频、源文档、manifest.json）
//! - `<root>/.staging/` 生成中的任务目录
//! - `<root>/.trash/` 删除时的中转目录
//!
//! 内存索引是列表与查询的唯一来源：发布时先落盘再登记，删除时先摘除再清理

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::application::ports::{BookFile, BookRepositoryPort, RepositoryError};
use crate::domain::book::{Book, BookId, ChapterMetadata, Manifest};

/// 清单文件名
pub const MANIFEST_FILE: &str = "manifest.json";

const STAGING_DIR: &str = ".staging";
const TRASH_DIR: &str = ".trash";

/// 文件系统有声书仓储
pub struct FileBookRepository {
    root: PathBuf,
    index: DashMap<BookId, Book>,
}

impl FileBookRepository {
    /// 打开仓储并从已有清单重建索引
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        // 上次运行残留的暂存与回收目录
        for leftover in [STAGING_DIR, TRASH_DIR] {
            let dir = root.join(leftover);
            if fs::try_exists(&dir).await.unwrap_or(false) {
                if let Err(e) = fs::remove_dir_all(&dir).await {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to clean leftover directory");
                }
            }
        }
        fs::create_dir_all(root.join(STAGING_DIR)).await?;
        fs::create_dir_all(root.join(TRASH_DIR)).await?;

        let repo = Self {
            root,
            index: DashMap::new(),
        };
        repo.load_index().await?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load_index(&self) -> Result<(), RepositoryError> {
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(book_id) = BookId::parse(name.as_str()) else {
                continue;
            };

            let manifest_path = entry.path().join(MANIFEST_FILE);
            let bytes = match fs::read(&manifest_path).await {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            match serde_json::from_slice::<Manifest>(&bytes) {
                Ok(manifest) if manifest.book.book_id() == &book_id => {
                    self.index.insert(book_id, manifest.book);
                }
                Ok(_) => {
                    tracing::warn!(book_id = %book_id, "Manifest book id does not match directory");
                }
                Err(e) => {
                    tracing::warn!(book_id = %book_id, error = %e, "Skipping unreadable manifest");
                }
            }
        }

        tracing::info!(count = self.index.len(), root = %self.root.display(), "Book index loaded");
        Ok(())
    }

    fn book_dir(&self, book_id: &BookId) -> PathBuf {
        self.root.join(book_id.as_str())
    }
}

/// 只允许书籍目录下的普通文件名
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\'])
        && !filename.contains("..")
}

#[async_trait]
impl BookRepositoryPort for FileBookRepository {
    async fn prepare(&self, book_id: &BookId) -> Result<PathBuf, RepositoryError> {
        let staging = self
            .root
            .join(STAGING_DIR)
            .join(format!("{}-{}", book_id, Uuid::new_v4().simple()));
        fs::create_dir_all(&staging).await?;
        Ok(staging)
    }

    async fn publish(&self, staging: &Path, manifest: Manifest) -> Result<Book, RepositoryError> {
        let book = manifest.book.clone();
        let book_id = book.book_id().clone();
        let target = self.book_dir(&book_id);

        if self.index.contains_key(&book_id) || fs::try_exists(&target).await.unwrap_or(false) {
            return Err(RepositoryError::AlreadyExists(book_id.to_string()));
        }

        let json = serde_json::to_vec_pretty(&manifest)?;
        fs::write(staging.join(MANIFEST_FILE), json).await?;
        fs::rename(staging, &target).await?;

        self.index.insert(book_id.clone(), book.clone());
        tracing::info!(book_id = %book_id, chapters = book.chapters().len(), "Book published");
        Ok(book)
    }

    async fn discard(&self, staging: &Path) {
        if let Err(e) = fs::remove_dir_all(staging).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %staging.display(), error = %e, "Failed to discard staging directory");
            }
        }
    }

    fn find_all(&self) -> Vec<Book> {
        self.index.iter().map(|entry| entry.value().clone()).collect()
    }

    fn find_by_id(&self, book_id: &BookId) -> Option<Book> {
        self.index.get(book_id).map(|b| b.clone())
    }

    fn exists(&self, book_id: &BookId) -> bool {
        self.index.contains_key(book_id) || self.book_dir(book_id).exists()
    }

    async fn delete(&self, book_id: &BookId) -> Result<(), RepositoryError> {
        if self.index.remove(book_id).is_none() {
            return Err(RepositoryError::NotFound(book_id.to_string()));
        }

        let dir = self.book_dir(book_id);
        let trash = self
            .root
            .join(TRASH_DIR)
            .join(format!("{}-{}", book_id, Uuid::new_v4().simple()));

        let doomed = match fs::rename(&dir, &trash).await {
            Ok(()) => trash,
            Err(e) => {
                tracing::warn!(book_id = %book_id, error = %e, "Failed to move book to trash");
                dir
            }
        };
        fs::remove_dir_all(&doomed).await?;
        Ok(())
    }

    async fn read_chapter_metadata(
        &self,
        book_id: &BookId,
        chapter_index: u32,
    ) -> Result<ChapterMetadata, RepositoryError> {
        let filename = self
            .index
            .get(book_id)
            .and_then(|book| book.chapter(chapter_index).and_then(|c| c.metadata.clone()))
            .ok_or_else(|| RepositoryError::NotFound(format!("{}/chapters/{}", book_id, chapter_index)))?;

        let bytes = fs::read(self.book_dir(book_id).join(filename)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn open_file(&self, book_id: &BookId, filename: &str) -> Result<BookFile, RepositoryError> {
        if !self.index.contains_key(book_id) || !is_safe_filename(filename) {
            return Err(RepositoryError::NotFound(format!("{}/{}", book_id, filename)));
        }

        let path = self.book_dir(book_id).join(filename);
        let file = fs::File::open(&path).await?;
        let len = file.metadata().await?.len();
        Ok(BookFile { path, file, len })
    }
}
