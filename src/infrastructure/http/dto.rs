//! Data Transfer Objects
//!
//! `TaskStatusResponse` 同时被客户端轮询器反序列化

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{Job, JobStatus, SubmitAudiobookResponse};
use crate::domain::book::ChapterSummary;

// ============================================================================
// Audiobook DTOs
// ============================================================================

/// 提交响应（202）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub book_id: String,
}

impl From<SubmitAudiobookResponse> for SubmitResponse {
    fn from(resp: SubmitAudiobookResponse) -> Self {
        Self {
            job_id: resp.job_id,
            book_id: resp.book_id.to_string(),
        }
    }
}

/// 任务状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub job_id: Uuid,
    pub book_id: String,
    pub status: String,
    /// 正在处理的章节（synthesizing / aligning / packaging）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default)]
    pub chapters: Vec<ChapterSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskStatusResponse {
    pub fn job_status(&self) -> Option<JobStatus> {
        JobStatus::from_parts(&self.status, self.chapter)
    }

    pub fn is_terminal(&self) -> bool {
        self.job_status().map(|s| s.is_terminal()).unwrap_or(false)
    }
}

impl From<Job> for TaskStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id,
            book_id: job.book_id.to_string(),
            status: job.status.as_str().to_string(),
            chapter: job.status.chapter(),
            detail: job.error,
            chapters: job.chapters,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

// ============================================================================
// Catalog DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicesResponse {
    pub voices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignersResponse {
    pub aligners: Vec<String>,
}

/// 删除响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub book_id: String,
    pub deleted: bool,
}
