//! Job Registry Port - 生成任务管理
//!
//! 定义任务登记与状态机的抽象接口，具体实现在 infrastructure/memory 层

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use super::AlignmentSelection;
use crate::domain::book::{BookId, ChapterRange, ChapterSummary};

/// Job Registry 错误
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Book id already reserved: {0}")]
    AlreadyExists(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Job queue is full")]
    QueueFull,
}

/// 任务状态
///
/// `Pending → Splitting → {Synthesizing(k) → Aligning(k) → Packaging(k)}×N → Completed`，
/// 任意非终态都可以直接进入 `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Splitting,
    Synthesizing(u32),
    Aligning(u32),
    Packaging(u32),
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Splitting => "splitting",
            JobStatus::Synthesizing(_) => "synthesizing",
            JobStatus::Aligning(_) => "aligning",
            JobStatus::Packaging(_) => "packaging",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// 当前处理的章节
    pub fn chapter(&self) -> Option<u32> {
        match self {
            JobStatus::Synthesizing(k) | JobStatus::Aligning(k) | JobStatus::Packaging(k) => Some(*k),
            _ => None,
        }
    }

    pub fn from_parts(status: &str, chapter: Option<u32>) -> Option<Self> {
        let chapter_status = |f: fn(u32) -> JobStatus| chapter.map(f);
        match status {
            "pending" => Some(JobStatus::Pending),
            "splitting" => Some(JobStatus::Splitting),
            "synthesizing" => chapter_status(JobStatus::Synthesizing),
            "aligning" => chapter_status(JobStatus::Aligning),
            "packaging" => chapter_status(JobStatus::Packaging),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// 状态在流水线中的先后顺序
    fn order(&self) -> (u8, u32, u8) {
        match self {
            JobStatus::Pending => (0, 0, 0),
            JobStatus::Splitting => (1, 0, 0),
            JobStatus::Synthesizing(k) => (2, *k, 0),
            JobStatus::Aligning(k) => (2, *k, 1),
            JobStatus::Packaging(k) => (2, *k, 2),
            JobStatus::Completed => (3, 0, 0),
            JobStatus::Failed => (4, 0, 0),
        }
    }

    /// 只允许向前推进，不允许重入
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == JobStatus::Failed || next.order() > self.order()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.chapter() {
            Some(k) => write!(f, "{}({})", self.as_str(), k),
            None => write!(f, "{}", self.as_str()),
        }
    }
}

/// 提交时的生成参数
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// 上传文件的临时路径（任务结束后删除）
    pub source_path: PathBuf,
    pub original_filename: String,
    pub voice: String,
    pub device: Option<String>,
    pub alignment: AlignmentSelection,
    pub range: ChapterRange,
}

/// 生成任务
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: Uuid,
    pub book_id: BookId,
    pub status: JobStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub request: JobRequest,
    /// 切分后的章节进度
    pub chapters: Vec<ChapterSummary>,
}

impl Job {
    pub fn new(book_id: BookId, request: JobRequest) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            book_id,
            status: JobStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
            request,
            chapters: Vec::new(),
        }
    }
}

/// Job Registry Port
///
/// 任务登记表，所有状态存储在内存中；写入对读者原子可见
pub trait JobRegistryPort: Send + Sync {
    /// 登记任务并放入执行队列，同一 book_id 只能被一个进行中的任务占用
    fn submit(&self, job: Job) -> Result<Uuid, JobError>;

    /// 获取任务快照
    fn get(&self, job_id: Uuid) -> Option<Job>;

    /// 推进状态
    fn transition(&self, job_id: Uuid, status: JobStatus) -> Result<(), JobError>;

    /// 标记失败并记录原因
    fn fail(&self, job_id: Uuid, error: String) -> Result<(), JobError>;

    /// 设置章节列表
    fn set_chapters(&self, job_id: Uuid, chapters: Vec<ChapterSummary>) -> Result<(), JobError>;

    /// 更新单个章节
    fn update_chapter(&self, job_id: Uuid, chapter: ChapterSummary) -> Result<(), JobError>;

    /// book_id 是否被进行中的任务占用
    fn is_book_id_reserved(&self, book_id: &BookId) -> bool;

    /// 删除某本书已结束的任务记录，返回删除数量
    fn remove_by_book(&self, book_id: &BookId) -> usize;

    /// 清理结束时间早于 `ttl` 的终态任务，返回删除数量
    fn evict_expired(&self, ttl: chrono::Duration) -> usize;
}
