//! Book Context - 有声书限界上下文
//!
//! 职责:
//! - Book 聚合与清单
//! - 章节摘要与章节元数据
//! - 章节区间与书籍标识

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::{AssetKind, Book, Manifest, MANIFEST_FORMAT_VERSION};
pub use entities::{chapter_file_stem, ChapterMetadata, ChapterStatus, ChapterSummary};
pub use errors::{BookError, IngestionError};
pub use value_objects::{slugify, BookId, ChapterEnd, ChapterRange};
