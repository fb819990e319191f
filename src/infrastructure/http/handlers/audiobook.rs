//! Audiobook HTTP Handlers - 提交生成任务与查询任务状态

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::path::Path as FsPath;
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::application::{GetJobStatus, SubmitAudiobook};
use crate::domain::book::ChapterEnd;
use crate::infrastructure::http::dto::{SubmitResponse, TaskStatusResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 表单中的生成参数
#[derive(Debug)]
struct SubmitForm {
    voice: Option<String>,
    device: Option<String>,
    alignment_backend: Option<String>,
    chapter_start: i64,
    chapter_end: i64,
}

impl Default for SubmitForm {
    fn default() -> Self {
        Self {
            voice: None,
            device: None,
            alignment_backend: None,
            chapter_start: 1,
            chapter_end: ChapterEnd::SENTINEL,
        }
    }
}

async fn read_text(field: Field<'_>, name: &str) -> Result<Option<String>, ApiError> {
    let value = field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

async fn read_int(field: Field<'_>, name: &str, default: i64) -> Result<i64, ApiError> {
    match read_text(field, name).await? {
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| ApiError::BadRequest(format!("{} must be an integer, got {:?}", name, value))),
        None => Ok(default),
    }
}

/// 把上传文件流式写入磁盘，超过大小上限时中止
async fn stream_to_file(field: &mut Field<'_>, path: &FsPath, max_size: u64) -> Result<u64, ApiError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create upload file: {}", e)))?;

    let mut written: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
    {
        written += chunk.len() as u64;
        if written > max_size {
            return Err(ApiError::BadRequest(format!(
                "File too large. Maximum size is {} MB",
                max_size / 1024 / 1024
            )));
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to save upload: {}", e)))?;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save upload: {}", e)))?;

    Ok(written)
}

/// 提交有声书生成任务（立即返回 202，生成在后台进行）
pub async fn submit_audiobook(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let mut form = SubmitForm::default();
    let mut upload: Option<(TempPath, String)> = None;

    tokio::fs::create_dir_all(&state.uploads.dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create uploads directory: {}", e)))?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ApiError::BadRequest("File name is required".to_string()))?;
                let suffix = FsPath::new(&filename)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{}", e.to_lowercase()))
                    .unwrap_or_default();

                // 落盘文件由 TempPath 持有，提交失败时随之删除
                let guard = tempfile::Builder::new()
                    .prefix("upload-")
                    .suffix(&suffix)
                    .tempfile_in(&state.uploads.dir)
                    .map_err(|e| ApiError::Internal(format!("Failed to create upload file: {}", e)))?
                    .into_temp_path();
                let size = stream_to_file(&mut field, &guard, state.uploads.max_size).await?;
                if size == 0 {
                    return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
                }
                tracing::debug!(filename = %filename, size, "Upload received");
                upload = Some((guard, filename));
            }
            "voice" => form.voice = read_text(field, "voice").await?,
            "device" => form.device = read_text(field, "device").await?,
            "alignment_backend" | "alignmentBackend" => {
                form.alignment_backend = read_text(field, "alignment_backend").await?
            }
            "chapter_start" | "chapterStart" => {
                form.chapter_start = read_int(field, "chapter_start", 1).await?
            }
            "chapter_end" | "chapterEnd" => {
                form.chapter_end = read_int(field, "chapter_end", ChapterEnd::SENTINEL).await?
            }
            _ => {}
        }
    }

    let (upload, original_filename) =
        upload.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;

    let command = SubmitAudiobook {
        source_path: upload.to_path_buf(),
        original_filename,
        voice: form.voice,
        device: form.device,
        alignment_backend: form.alignment_backend,
        chapter_start: form.chapter_start,
        chapter_end: form.chapter_end,
    };
    let response = state.submit_audiobook_handler.handle(command)?;

    // 上传文件交给 worker，任务结束后删除
    upload
        .keep()
        .map_err(|e| ApiError::Internal(format!("Failed to hand off upload: {}", e)))?;

    Ok((StatusCode::ACCEPTED, Json(response.into())))
}

/// 查询任务状态
pub async fn get_task_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let job = state.get_job_status_handler.handle(GetJobStatus { job_id })?;
    Ok(Json(job.into()))
}
