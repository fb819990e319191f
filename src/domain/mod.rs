//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Book Context: 有声书、章节与清单
//! - Timing Context: 逐词时间戳
//!
//! 以及共享的音频缓冲区、文本分块器与章节切分

pub mod book;
pub mod timing;

mod audio;
mod chapter_splitter;
mod text_segmenter;

pub use audio::{AudioBuffer, SilenceProfile};
pub use chapter_splitter::{split_chapters, ChapterText, ParsedDocument, RawChapter};
pub use text_segmenter::{chunk_text, ChunkConfig, TextChunk, DEFAULT_MAX_CHARS};
