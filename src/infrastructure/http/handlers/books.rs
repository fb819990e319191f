//! Book HTTP Handlers - 书籍列表、章节元数据与文件流

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::application::{
    BookFile, DeleteBook, GetAsset, GetBook, GetChapterAudio, GetChapterMetadata, ListBooks,
};
use crate::domain::book::{Book, ChapterMetadata};
use crate::infrastructure::http::dto::DeletedResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4b") | Some("m4a") => "audio/mp4",
        Some("json") => "application/json",
        Some("md") | Some("markdown") => "text/markdown; charset=utf-8",
        Some("txt") | Some("ffmetadata") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// 流式返回书籍文件
fn stream_file(book_file: BookFile, attachment: bool) -> Result<Response, ApiError> {
    let filename = book_file
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download")
        .to_string();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&filename))
        .header(header::CONTENT_LENGTH, book_file.len)
        .header(header::ACCEPT_RANGES, "none");
    if attachment {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        );
    }

    builder
        .body(Body::from_stream(ReaderStream::new(book_file.file)))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// 列出所有书籍（最新的在前）
pub async fn list_books(State(state): State<Arc<AppState>>) -> Json<Vec<Book>> {
    Json(state.list_books_handler.handle(ListBooks))
}

/// 获取书籍清单
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.get_book_handler.handle(GetBook { book_id })?))
}

/// 删除书籍
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state
        .delete_book_handler
        .handle(DeleteBook {
            book_id: book_id.clone(),
        })
        .await?;

    Ok(Json(DeletedResponse {
        book_id,
        deleted: true,
    }))
}

/// 获取章节元数据（逐词时间戳）
pub async fn get_chapter_metadata(
    State(state): State<Arc<AppState>>,
    Path((book_id, chapter_index)): Path<(String, u32)>,
) -> Result<Json<ChapterMetadata>, ApiError> {
    let metadata = state
        .get_chapter_metadata_handler
        .handle(GetChapterMetadata {
            book_id,
            chapter_index,
        })
        .await?;
    Ok(Json(metadata))
}

/// 流式返回章节音频
pub async fn get_chapter_audio(
    State(state): State<Arc<AppState>>,
    Path((book_id, chapter_index)): Path<(String, u32)>,
) -> Result<Response, ApiError> {
    let file = state
        .get_chapter_audio_handler
        .handle(GetChapterAudio {
            book_id,
            chapter_index,
        })
        .await?;
    stream_file(file, false)
}

/// 下载书籍资源（整书容器、章节标记、源文件、清单）
pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path((book_id, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let file = state
        .get_asset_handler
        .handle(GetAsset { book_id, filename })
        .await?;
    stream_file(file, true)
}
