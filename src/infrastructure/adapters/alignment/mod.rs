//! Alignment Adapter - 强制对齐后端实现

mod http_aligner;

pub use http_aligner::HttpAligner;
