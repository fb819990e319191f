//! Audiobook Command Handlers

use std::path::Path;
use std::sync::Arc;

use crate::application::commands::{DeleteBook, SubmitAudiobook, SubmitAudiobookResponse};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AlignmentSelection, BookRepositoryPort, DocumentParserPort, Job, JobError, JobRegistryPort,
    JobRequest,
};
use crate::domain::book::{BookId, ChapterRange};

/// book_id 去重的最大尝试次数
const MAX_BOOK_ID_ATTEMPTS: u32 = 1000;

/// 提交参数的缺省值与可选范围
#[derive(Debug, Clone)]
pub struct GenerationDefaults {
    pub voices: Vec<String>,
    pub default_voice: String,
    pub default_alignment: AlignmentSelection,
}

// ============================================================================
// SubmitAudiobook
// ============================================================================

/// SubmitAudiobook Handler - 校验参数、分配 book_id、登记任务
///
/// 只负责登记，实际生成由后台 worker 执行
pub struct SubmitAudiobookHandler {
    job_registry: Arc<dyn JobRegistryPort>,
    book_repo: Arc<dyn BookRepositoryPort>,
    parser: Arc<dyn DocumentParserPort>,
    defaults: GenerationDefaults,
}

impl SubmitAudiobookHandler {
    pub fn new(
        job_registry: Arc<dyn JobRegistryPort>,
        book_repo: Arc<dyn BookRepositoryPort>,
        parser: Arc<dyn DocumentParserPort>,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            job_registry,
            book_repo,
            parser,
            defaults,
        }
    }

    pub fn handle(&self, cmd: SubmitAudiobook) -> Result<SubmitAudiobookResponse, ApplicationError> {
        let filename = Path::new(&cmd.original_filename);
        let stem = filename
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApplicationError::upload("missing file name"))?;
        let extension = filename
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        if !self.parser.supports(&extension) {
            return Err(ApplicationError::upload(format!(
                "unsupported file type: {}",
                cmd.original_filename
            )));
        }

        let voice = cmd
            .voice
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.defaults.default_voice.clone());
        if !self.defaults.voices.contains(&voice) {
            return Err(ApplicationError::validation(format!("unsupported voice: {}", voice)));
        }

        let alignment = match cmd.alignment_backend.as_deref().map(str::trim) {
            None | Some("") => self.defaults.default_alignment,
            Some(name) => AlignmentSelection::parse(name).ok_or_else(|| {
                ApplicationError::validation(format!("unknown alignment backend: {}", name))
            })?,
        };

        let range = ChapterRange::new(cmd.chapter_start, cmd.chapter_end)?;

        let request = JobRequest {
            source_path: cmd.source_path,
            original_filename: cmd.original_filename.clone(),
            voice,
            device: cmd.device.filter(|d| !d.trim().is_empty()),
            alignment,
            range,
        };

        let base_id = BookId::from_stem(stem);
        for attempt in 1..=MAX_BOOK_ID_ATTEMPTS {
            let candidate = if attempt == 1 {
                base_id.clone()
            } else {
                base_id.with_suffix(attempt)
            };
            if self.book_repo.exists(&candidate) || self.job_registry.is_book_id_reserved(&candidate) {
                continue;
            }

            match self.job_registry.submit(Job::new(candidate.clone(), request.clone())) {
                Ok(job_id) => {
                    tracing::info!(
                        job_id = %job_id,
                        book_id = %candidate,
                        voice = %request.voice,
                        alignment = %request.alignment,
                        "Audiobook job submitted"
                    );
                    return Ok(SubmitAudiobookResponse {
                        job_id,
                        book_id: candidate,
                    });
                }
                // 与并发提交竞争同一 id，换下一个后缀
                Err(JobError::AlreadyExists(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ApplicationError::Conflict(format!(
            "no free book id for {}",
            base_id
        )))
    }
}

// ============================================================================
// DeleteBook
// ============================================================================

/// DeleteBook Handler
///
/// 删除书籍目录后一并清理该书已结束的任务记录
pub struct DeleteBookHandler {
    job_registry: Arc<dyn JobRegistryPort>,
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl DeleteBookHandler {
    pub fn new(job_registry: Arc<dyn JobRegistryPort>, book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self {
            job_registry,
            book_repo,
        }
    }

    pub async fn handle(&self, cmd: DeleteBook) -> Result<(), ApplicationError> {
        let book_id = BookId::parse(cmd.book_id)?;
        if !self.book_repo.exists(&book_id) {
            return Err(ApplicationError::not_found("Book", &book_id));
        }

        self.book_repo.delete(&book_id).await?;
        let jobs = self.job_registry.remove_by_book(&book_id);
        tracing::info!(book_id = %book_id, jobs, "Book deleted");
        Ok(())
    }
}
