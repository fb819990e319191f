//! Persistence Layer - 数据持久化
//!
//! 基于文件系统的有声书存储

mod file_book_repository;

pub use file_book_repository::{FileBookRepository, MANIFEST_FILE};
