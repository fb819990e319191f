//! Catalog Queries

/// 列出可用音色
#[derive(Debug, Clone)]
pub struct ListVoices;

/// 列出可用对齐后端
#[derive(Debug, Clone)]
pub struct ListAligners;
