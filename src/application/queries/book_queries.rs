//! Book Queries

use uuid::Uuid;

/// 查询生成任务状态
#[derive(Debug, Clone)]
pub struct GetJobStatus {
    pub job_id: Uuid,
}

/// 列出所有有声书
#[derive(Debug, Clone)]
pub struct ListBooks;

/// 获取有声书详情
#[derive(Debug, Clone)]
pub struct GetBook {
    pub book_id: String,
}

/// 获取章节元数据
#[derive(Debug, Clone)]
pub struct GetChapterMetadata {
    pub book_id: String,
    pub chapter_index: u32,
}

/// 获取章节音频
#[derive(Debug, Clone)]
pub struct GetChapterAudio {
    pub book_id: String,
    pub chapter_index: u32,
}

/// 下载书籍资源
#[derive(Debug, Clone)]
pub struct GetAsset {
    pub book_id: String,
    pub filename: String,
}
