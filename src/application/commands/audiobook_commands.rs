//! Audiobook Commands

use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::book::BookId;

/// 提交有声书生成任务
#[derive(Debug, Clone)]
pub struct SubmitAudiobook {
    /// 已落盘的上传文件
    pub source_path: PathBuf,
    pub original_filename: String,
    pub voice: Option<String>,
    pub device: Option<String>,
    pub alignment_backend: Option<String>,
    pub chapter_start: i64,
    /// `-1` 表示直到最后一章
    pub chapter_end: i64,
}

/// 提交响应（任务在后台执行）
#[derive(Debug, Clone)]
pub struct SubmitAudiobookResponse {
    pub job_id: Uuid,
    pub book_id: BookId,
}

/// 删除有声书
#[derive(Debug, Clone)]
pub struct DeleteBook {
    pub book_id: String,
}
