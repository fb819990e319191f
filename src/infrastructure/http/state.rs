//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::{
    // Command handlers
    DeleteBookHandler, GenerationDefaults, SubmitAudiobookHandler,
    // Query handlers
    GetAssetHandler, GetBookHandler, GetChapterAudioHandler, GetChapterMetadataHandler,
    GetJobStatusHandler, ListAlignersHandler, ListBooksHandler, ListVoicesHandler,
    // Ports
    AlignerRegistry, BookRepositoryPort, DocumentParserPort, JobRegistryPort,
};

/// 上传设置
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// 上传文件暂存目录
    pub dir: PathBuf,
    /// 单个上传文件的最大字节数
    pub max_size: u64,
}

/// 应用状态
pub struct AppState {
    pub uploads: UploadSettings,

    // ========== Command Handlers ==========
    pub submit_audiobook_handler: SubmitAudiobookHandler,
    pub delete_book_handler: DeleteBookHandler,

    // ========== Query Handlers ==========
    pub get_job_status_handler: GetJobStatusHandler,
    pub list_books_handler: ListBooksHandler,
    pub get_book_handler: GetBookHandler,
    pub get_chapter_metadata_handler: GetChapterMetadataHandler,
    pub get_chapter_audio_handler: GetChapterAudioHandler,
    pub get_asset_handler: GetAssetHandler,
    pub list_voices_handler: ListVoicesHandler,
    pub list_aligners_handler: ListAlignersHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        job_registry: Arc<dyn JobRegistryPort>,
        book_repo: Arc<dyn BookRepositoryPort>,
        parser: Arc<dyn DocumentParserPort>,
        defaults: GenerationDefaults,
        aligners: AlignerRegistry,
        uploads: UploadSettings,
    ) -> Self {
        let voices = defaults.voices.clone();
        Self {
            uploads,

            // Command handlers
            submit_audiobook_handler: SubmitAudiobookHandler::new(
                job_registry.clone(),
                book_repo.clone(),
                parser,
                defaults,
            ),
            delete_book_handler: DeleteBookHandler::new(job_registry.clone(), book_repo.clone()),

            // Query handlers
            get_job_status_handler: GetJobStatusHandler::new(job_registry),
            list_books_handler: ListBooksHandler::new(book_repo.clone()),
            get_book_handler: GetBookHandler::new(book_repo.clone()),
            get_chapter_metadata_handler: GetChapterMetadataHandler::new(book_repo.clone()),
            get_chapter_audio_handler: GetChapterAudioHandler::new(book_repo.clone()),
            get_asset_handler: GetAssetHandler::new(book_repo),
            list_voices_handler: ListVoicesHandler::new(voices),
            list_aligners_handler: ListAlignersHandler::new(aligners),
        }
    }
}
