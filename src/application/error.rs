//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{JobError, RepositoryError};
use crate::domain::book::BookError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 上传内容缺失或无效
    #[error("Upload error: {0}")]
    UploadError(String),

    /// 资源冲突
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 服务暂不可用（队列已满等）
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建上传错误
    pub fn upload(message: impl Into<String>) -> Self {
        Self::UploadError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => Self::not_found("File", what),
            RepositoryError::AlreadyExists(what) => Self::Conflict(what),
            other => Self::RepositoryError(other.to_string()),
        }
    }
}

impl From<JobError> for ApplicationError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => Self::not_found("Job", id),
            JobError::AlreadyExists(id) => Self::Conflict(format!("book id already reserved: {}", id)),
            JobError::QueueFull => Self::Unavailable(err.to_string()),
            JobError::InvalidTransition { .. } => Self::internal(err.to_string()),
        }
    }
}

impl From<BookError> for ApplicationError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::InvalidBookId(id) => Self::not_found("Book", id),
            BookError::ChapterNotFound(index) => Self::not_found("Chapter", index),
            BookError::InvalidRange(_) => Self::validation(err.to_string()),
        }
    }
}
