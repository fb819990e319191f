//! Generation Pipeline - 单个任务的分章、合成、对齐、打包
//!
//! 全部产物先写入暂存目录，成功后整体发布；失败时丢弃暂存目录

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use thiserror::Error;
use uuid::Uuid;

use crate::application::ports::{
    render_ffmetadata, AudioPackagerPort, BookRepositoryPort, ContainerChapter, DocumentParserPort,
    Job, JobError, JobRegistryPort, JobStatus, PackagingError, RepositoryError, SynthesisEnginePort,
    SynthesisError, SynthesisRequest,
};
use crate::application::{AlignmentPolicy, ChapterAlignment};
use crate::domain::book::{
    chapter_file_stem, AssetKind, Book, ChapterMetadata, ChapterSummary, IngestionError, Manifest,
};
use crate::domain::timing::{ChunkTiming, TimingError, WordBoundary};
use crate::domain::{chunk_text, split_chapters, AudioBuffer, ChapterText, ChunkConfig, ParsedDocument};
use crate::infrastructure::persistence::MANIFEST_FILE;

/// 章节标记文件名
pub const FFMETADATA_FILE: &str = "chapters.ffmetadata";

/// 流水线错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Packaging failed: {0}")]
    Packaging(#[from] PackagingError),

    #[error("Invalid word timings: {0}")]
    Timing(#[from] TimingError),

    #[error("Storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("No chapter could be generated")]
    NoChapterReady,
}

impl PipelineError {
    /// 只影响当前章节的错误，任务继续处理后续章节
    fn is_chapter_local(&self) -> bool {
        matches!(
            self,
            PipelineError::Synthesis(_) | PipelineError::Packaging(_) | PipelineError::Timing(_)
        )
    }
}

/// 一章合成后的中间结果
struct SynthesizedChapter {
    audio: AudioBuffer,
    chunks: Vec<ChunkTiming>,
    boundaries: Vec<WordBoundary>,
}

/// 生成流水线
pub struct GenerationPipeline {
    job_registry: Arc<dyn JobRegistryPort>,
    book_repo: Arc<dyn BookRepositoryPort>,
    parser: Arc<dyn DocumentParserPort>,
    synthesis: Arc<dyn SynthesisEnginePort>,
    alignment: AlignmentPolicy,
    packager: Arc<dyn AudioPackagerPort>,
    chunk_config: ChunkConfig,
}

impl GenerationPipeline {
    pub fn new(
        job_registry: Arc<dyn JobRegistryPort>,
        book_repo: Arc<dyn BookRepositoryPort>,
        parser: Arc<dyn DocumentParserPort>,
        synthesis: Arc<dyn SynthesisEnginePort>,
        alignment: AlignmentPolicy,
        packager: Arc<dyn AudioPackagerPort>,
        chunk_config: ChunkConfig,
    ) -> Self {
        Self {
            job_registry,
            book_repo,
            parser,
            synthesis,
            alignment,
            packager,
            chunk_config,
        }
    }

    pub fn job_registry(&self) -> &Arc<dyn JobRegistryPort> {
        &self.job_registry
    }

    /// 执行任务直到终态
    ///
    /// 上传的源文件在任何退出路径上都会被删除
    pub async fn run(&self, job_id: Uuid) {
        let job = match self.job_registry.get(job_id) {
            Some(job) => job,
            None => {
                tracing::warn!(job_id = %job_id, "Job not found, skipping");
                return;
            }
        };
        let _upload = TempPath::from_path(&job.request.source_path);

        if let Err(e) = self.execute(&job).await {
            tracing::error!(job_id = %job_id, book_id = %job.book_id, error = %e, "Job failed");
            if let Err(e) = self.job_registry.fail(job_id, e.to_string()) {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
            }
        }
    }

    async fn execute(&self, job: &Job) -> Result<(), PipelineError> {
        self.transition(job, JobStatus::Splitting)?;
        let document = self.parse_source(job).await?;
        let chapters = split_chapters(&document, &job.request.range)?;

        tracing::info!(
            job_id = %job.job_id,
            book_id = %job.book_id,
            title = %document.title,
            chapters = chapters.len(),
            "Source split into chapters"
        );
        self.job_registry.set_chapters(
            job.job_id,
            chapters
                .iter()
                .map(|c| ChapterSummary::pending(c.index, c.title.clone()))
                .collect(),
        )?;

        let staging = self.book_repo.prepare(&job.book_id).await?;
        let result = self.generate(job, &document, &chapters, &staging).await;
        if result.is_err() {
            self.book_repo.discard(&staging).await;
        }
        result
    }

    async fn parse_source(&self, job: &Job) -> Result<ParsedDocument, PipelineError> {
        let bytes = tokio::fs::read(&job.request.source_path)
            .await
            .map_err(|e| IngestionError::Io(e.to_string()))?;

        let filename = Path::new(&job.request.original_filename);
        let stem = filename
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        Ok(self.parser.parse(&bytes, stem)?)
    }

    async fn generate(
        &self,
        job: &Job,
        document: &ParsedDocument,
        chapters: &[ChapterText],
        staging: &Path,
    ) -> Result<(), PipelineError> {
        let mut book = Book::new(job.book_id.clone(), document.title.clone(), document.author.clone());

        for chapter in chapters {
            let mut summary = ChapterSummary::pending(chapter.index, chapter.title.clone());
            summary.mark_processing();
            self.job_registry.update_chapter(job.job_id, summary.clone())?;

            match self.process_chapter(job, document, chapter, staging).await {
                Ok(metadata) => {
                    summary.mark_ready(
                        metadata.duration_ms,
                        metadata.audio_file.clone(),
                        format!("{}.json", summary.file_stem()),
                    );
                    tracing::info!(
                        job_id = %job.job_id,
                        chapter = chapter.index,
                        duration_ms = metadata.duration_ms,
                        words = metadata.words.len(),
                        "Chapter ready"
                    );
                }
                Err(e) if e.is_chapter_local() => {
                    tracing::warn!(job_id = %job.job_id, chapter = chapter.index, error = %e, "Chapter failed");
                    summary.mark_failed(e.to_string());
                }
                Err(e) => return Err(e),
            }

            self.job_registry.update_chapter(job.job_id, summary.clone())?;
            book.add_chapter(summary);
        }

        if book.ready_count() == 0 {
            return Err(PipelineError::NoChapterReady);
        }

        if book.all_ready() {
            // 整书容器是附加产物，失败时各章节仍然可用
            if let Err(e) = self.package_container(&mut book, staging).await {
                tracing::warn!(job_id = %job.job_id, error = %e, "Skipping container, packaging failed");
            }
        } else {
            tracing::warn!(
                job_id = %job.job_id,
                ready = book.ready_count(),
                total = book.chapters().len(),
                "Skipping container, not every chapter is ready"
            );
        }

        let source_name = source_asset_name(&job.request.original_filename);
        tokio::fs::copy(&job.request.source_path, staging.join(&source_name))
            .await
            .map_err(RepositoryError::from)?;
        book.set_asset(AssetKind::Source, source_name);
        book.set_asset(AssetKind::Manifest, MANIFEST_FILE);
        book.touch();

        self.book_repo
            .publish(staging, Manifest::new(book, Some(job.job_id)))
            .await?;
        self.transition(job, JobStatus::Completed)?;

        tracing::info!(job_id = %job.job_id, book_id = %job.book_id, "Job completed");
        Ok(())
    }

    async fn process_chapter(
        &self,
        job: &Job,
        document: &ParsedDocument,
        chapter: &ChapterText,
        staging: &Path,
    ) -> Result<ChapterMetadata, PipelineError> {
        self.transition(job, JobStatus::Synthesizing(chapter.index))?;
        let synthesized = self.synthesize_chapter(job, &chapter.text).await?;

        self.transition(job, JobStatus::Aligning(chapter.index))?;
        let outcome = self
            .alignment
            .resolve(ChapterAlignment {
                text: &chapter.text,
                audio: &synthesized.audio,
                chunks: &synthesized.chunks,
                boundaries: &synthesized.boundaries,
                selection: job.request.alignment,
                device: job.request.device.as_deref(),
            })
            .await;
        tracing::debug!(
            job_id = %job.job_id,
            chapter = chapter.index,
            source = %outcome.source,
            "Word timings resolved"
        );

        self.transition(job, JobStatus::Packaging(chapter.index))?;
        let stem = chapter_file_stem(chapter.index, &chapter.title);
        let audio_file = format!("{}.{}", stem, self.packager.extension());
        self.packager
            .write_chapter_audio(&staging.join(&audio_file), &synthesized.audio)
            .await?;

        let metadata = ChapterMetadata {
            chapter_index: chapter.index,
            chapter_title: chapter.title.clone(),
            audio_file,
            duration_ms: synthesized.audio.duration_ms(),
            text: chapter.text.clone(),
            words: outcome.words,
            book_title: Some(document.title.clone()),
            book_author: document.author.clone(),
        };
        metadata.validate()?;

        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| PackagingError::EncodingError(e.to_string()))?;
        tokio::fs::write(staging.join(format!("{}.json", stem)), json)
            .await
            .map_err(PackagingError::from)?;
        Ok(metadata)
    }

    /// 分块合成并拼接，记录每块的位置与静音
    async fn synthesize_chapter(&self, job: &Job, text: &str) -> Result<SynthesizedChapter, PipelineError> {
        let mut audio = AudioBuffer::empty(0);
        let mut chunks = Vec::new();
        let mut boundaries = Vec::new();

        for chunk in chunk_text(text, &self.chunk_config) {
            if chunk.is_blank() {
                chunks.push(ChunkTiming {
                    char_offset: chunk.char_offset,
                    char_len: chunk.char_len(),
                    duration_ms: 0.0,
                    leading_silence_ms: 0.0,
                });
                continue;
            }

            let output = self
                .synthesis
                .synthesize(SynthesisRequest {
                    text: chunk.text.clone(),
                    voice: job.request.voice.clone(),
                    device: job.request.device.clone(),
                })
                .await?;

            let offset_ms = audio.duration_ms_f64();
            let silence = output.audio.analyze_silence();
            chunks.push(ChunkTiming {
                char_offset: chunk.char_offset,
                char_len: chunk.char_len(),
                duration_ms: silence.duration_ms,
                leading_silence_ms: silence.leading_silence_ms,
            });
            boundaries.extend(output.boundaries.into_iter().map(|b| WordBoundary {
                word: b.word,
                start_ms: b.start_ms + offset_ms.round() as u64,
                end_ms: b.end_ms + offset_ms.round() as u64,
            }));
            audio
                .append(&output.audio)
                .map_err(SynthesisError::InvalidResponse)?;
        }

        if audio.is_empty() {
            return Err(SynthesisError::InvalidResponse("synthesis produced no audio".into()).into());
        }
        Ok(SynthesizedChapter {
            audio,
            chunks,
            boundaries,
        })
    }

    /// 整书容器与 ffmetadata 章节文件
    async fn package_container(&self, book: &mut Book, staging: &Path) -> Result<(), PipelineError> {
        let chapters: Vec<ContainerChapter> = book
            .chapters()
            .iter()
            .filter_map(|c| {
                c.audio.as_ref().map(|audio| ContainerChapter {
                    title: c.title.clone(),
                    audio_path: staging.join(audio),
                })
            })
            .collect();

        let container = format!("{}.{}", book.book_id(), self.packager.extension());
        let container_path = staging.join(&container);
        let markers = match self.packager.build_container(&chapters, &container_path).await {
            Ok(markers) => markers,
            Err(e) => {
                let _ = tokio::fs::remove_file(&container_path).await;
                return Err(e.into());
            }
        };

        let ffmetadata = render_ffmetadata(book.title(), book.author(), &markers);
        tokio::fs::write(staging.join(FFMETADATA_FILE), ffmetadata)
            .await
            .map_err(PackagingError::from)?;

        book.set_asset(AssetKind::Container, container);
        book.set_asset(AssetKind::Chapters, FFMETADATA_FILE);
        Ok(())
    }

    fn transition(&self, job: &Job, status: JobStatus) -> Result<(), JobError> {
        self.job_registry.transition(job.job_id, status)?;
        tracing::debug!(job_id = %job.job_id, status = %status, "Job status changed");
        Ok(())
    }
}

/// 源文件副本名: `source.<ext>`
fn source_asset_name(original_filename: &str) -> String {
    let extension = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "txt".to_string());
    PathBuf::from("source")
        .with_extension(extension)
        .to_string_lossy()
        .into_owned()
}
