//! 章节切分
//!
//! 解析后的文档 + 章节区间 → 按序的 `(index, title, text)` 列表

use crate::domain::book::{ChapterRange, IngestionError};

/// 解析器输出的原始章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChapter {
    pub title: String,
    pub text: String,
}

/// 解析后的文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub title: String,
    pub author: Option<String>,
    pub chapters: Vec<RawChapter>,
}

/// 区间内的一个章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterText {
    /// 章节在全书中的 1-based 序号
    pub index: u32,
    pub title: String,
    pub text: String,
}

/// 选出区间内的章节
///
/// 空章节在区间选择之前丢弃；区间起点超出章节数或终点超出章节数时返回 `IngestionError`
pub fn split_chapters(
    document: &ParsedDocument,
    range: &ChapterRange,
) -> Result<Vec<ChapterText>, IngestionError> {
    let chapters: Vec<&RawChapter> = document
        .chapters
        .iter()
        .filter(|c| !c.text.trim().is_empty())
        .collect();

    let (start, end) = range.resolve(chapters.len())?;

    let selected: Vec<ChapterText> = chapters
        .into_iter()
        .enumerate()
        .map(|(i, c)| (i as u32 + 1, c))
        .filter(|(index, _)| *index >= start && *index <= end)
        .map(|(index, c)| ChapterText {
            index,
            title: chapter_title(c, index),
            text: c.text.trim().to_string(),
        })
        .collect();

    if selected.is_empty() {
        return Err(IngestionError::NoChapters);
    }
    Ok(selected)
}

fn chapter_title(chapter: &RawChapter, index: u32) -> String {
    let title = chapter.title.trim();
    if title.is_empty() {
        format!("Chapter {}", index)
    } else {
        title.to_string()
    }
}
