//! Book Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{BookFile, BookRepositoryPort, Job, JobRegistryPort};
use crate::application::queries::{
    GetAsset, GetBook, GetChapterAudio, GetChapterMetadata, GetJobStatus, ListBooks,
};
use crate::domain::book::{Book, BookId, ChapterMetadata};

fn find_book(repo: &dyn BookRepositoryPort, book_id: &str) -> Result<Book, ApplicationError> {
    let id = BookId::parse(book_id)?;
    repo.find_by_id(&id)
        .ok_or_else(|| ApplicationError::not_found("Book", book_id))
}

/// GetJobStatus Handler
pub struct GetJobStatusHandler {
    job_registry: Arc<dyn JobRegistryPort>,
}

impl GetJobStatusHandler {
    pub fn new(job_registry: Arc<dyn JobRegistryPort>) -> Self {
        Self { job_registry }
    }

    pub fn handle(&self, query: GetJobStatus) -> Result<Job, ApplicationError> {
        self.job_registry
            .get(query.job_id)
            .ok_or_else(|| ApplicationError::not_found("Job", query.job_id))
    }
}

/// ListBooks Handler
pub struct ListBooksHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl ListBooksHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub fn handle(&self, _query: ListBooks) -> Vec<Book> {
        let mut books = self.book_repo.find_all();
        books.sort_by(|a, b| b.generated_at().cmp(&a.generated_at()));
        books
    }
}

/// GetBook Handler
pub struct GetBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl GetBookHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub fn handle(&self, query: GetBook) -> Result<Book, ApplicationError> {
        find_book(self.book_repo.as_ref(), &query.book_id)
    }
}

/// GetChapterMetadata Handler
pub struct GetChapterMetadataHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl GetChapterMetadataHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, query: GetChapterMetadata) -> Result<ChapterMetadata, ApplicationError> {
        let book = find_book(self.book_repo.as_ref(), &query.book_id)?;
        let chapter = book
            .chapter(query.chapter_index)
            .filter(|c| c.is_ready())
            .ok_or_else(|| ApplicationError::not_found("Chapter", query.chapter_index))?;

        tracing::debug!(book_id = %book.book_id(), chapter = chapter.index, "Reading chapter metadata");
        Ok(self
            .book_repo
            .read_chapter_metadata(book.book_id(), chapter.index)
            .await?)
    }
}

/// GetChapterAudio Handler
pub struct GetChapterAudioHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl GetChapterAudioHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, query: GetChapterAudio) -> Result<BookFile, ApplicationError> {
        let book = find_book(self.book_repo.as_ref(), &query.book_id)?;
        let audio = book
            .chapter(query.chapter_index)
            .filter(|c| c.is_ready())
            .and_then(|c| c.audio.clone())
            .ok_or_else(|| ApplicationError::not_found("Chapter", query.chapter_index))?;

        Ok(self.book_repo.open_file(book.book_id(), &audio).await?)
    }
}

/// GetAsset Handler
///
/// 只提供清单中登记过的资源文件
pub struct GetAssetHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl GetAssetHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, query: GetAsset) -> Result<BookFile, ApplicationError> {
        let book = find_book(self.book_repo.as_ref(), &query.book_id)?;
        if !book.has_asset_file(&query.filename) {
            return Err(ApplicationError::not_found("Asset", &query.filename));
        }

        Ok(self.book_repo.open_file(book.book_id(), &query.filename).await?)
    }
}
