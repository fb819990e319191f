//! Plain Text Parser - 纯文本 / Markdown 源文档解析
//!
//! 章节识别：
//! - Markdown 标题 `# ` / `## `
//! - `Chapter N` / `CHAPTER N` / `Part N`（阿拉伯或罗马数字）
//! - `第N章` / `第N节`
//!
//! 首个 `# ` 标题在还有其他标题时作为书名；`Title:` / `Author:` / `by <name>` 行作为元数据

use regex::Regex;
use std::sync::OnceLock;

use crate::application::ports::DocumentParserPort;
use crate::domain::book::IngestionError;
use crate::domain::{ParsedDocument, RawChapter};

/// 元数据行只在开头若干非空行内识别
const METADATA_SCAN_LINES: usize = 10;

/// 标题行长度上限（更长的视为正文）
const MAX_HEADING_CHARS: usize = 120;

const PREAMBLE_TITLE: &str = "Introduction";

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:#{1,2}\s+\S.*|(?:Chapter|CHAPTER|Part|PART)\s+(?:\d+|[IVXLCivxlc]+)\b.*|第[零一二三四五六七八九十百千万\d]+[章节].*)$",
        )
        .expect("heading pattern is valid")
    })
}

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^title:\s*(\S.*)$").expect("title pattern is valid"))
}

fn author_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^author:\s*(\S.*)$").expect("author pattern is valid"))
}

/// `by <name>` 行：短且不以句末标点结尾，避免把正文当作作者
fn byline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^by\s+(\S.{0,58}[^.!?,;:])$").expect("byline pattern is valid")
    })
}

fn is_heading(line: &str) -> bool {
    line.chars().count() <= MAX_HEADING_CHARS && heading_pattern().is_match(line)
}

fn heading_text(line: &str) -> String {
    line.trim_start_matches('#').trim().to_string()
}

/// 纯文本 / Markdown 解析器
#[derive(Debug, Clone, Default)]
pub struct PlainTextParser;

impl PlainTextParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParserPort for PlainTextParser {
    fn supports(&self, extension: &str) -> bool {
        matches!(extension, "txt" | "text" | "md" | "markdown")
    }

    fn parse(&self, bytes: &[u8], file_stem: &str) -> Result<ParsedDocument, IngestionError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|_| IngestionError::InvalidEncoding)?;

        let lines: Vec<&str> = text.lines().map(|l| l.trim_end()).collect();

        let mut title: Option<String> = None;
        let mut author: Option<String> = None;
        let mut skip = vec![false; lines.len()];

        // 开头的元数据行
        let mut seen = 0;
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen >= METADATA_SCAN_LINES || (is_heading(trimmed) && !trimmed.starts_with("# ")) {
                break;
            }
            seen += 1;

            if let Some(caps) = title_pattern().captures(trimmed) {
                title.get_or_insert_with(|| caps[1].trim().to_string());
                skip[i] = true;
            } else if let Some(caps) = author_pattern()
                .captures(trimmed)
                .or_else(|| byline_pattern().captures(trimmed))
            {
                author.get_or_insert_with(|| caps[1].trim().to_string());
                skip[i] = true;
            }
        }

        let headings: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(i, l)| !skip[*i] && is_heading(l.trim()))
            .map(|(i, _)| i)
            .collect();

        // 首个 `# ` 标题在还有其他标题时是书名
        let mut chapter_starts = headings.clone();
        if let Some(&first) = headings.first() {
            let line = lines[first].trim();
            let is_h1 = line.starts_with("# ");
            let only_blank_before = lines[..first]
                .iter()
                .enumerate()
                .all(|(i, l)| skip[i] || l.trim().is_empty());
            if is_h1 && only_blank_before && headings.len() > 1 {
                title.get_or_insert_with(|| heading_text(line));
                skip[first] = true;
                chapter_starts.remove(0);
            } else if is_h1 && headings.len() == 1 {
                title.get_or_insert_with(|| heading_text(line));
            }
        }

        let title = title.unwrap_or_else(|| file_stem.trim().to_string());
        let body = |from: usize, to: usize| -> String {
            lines[from..to]
                .iter()
                .enumerate()
                .filter(|(offset, _)| !skip[from + offset])
                .map(|(_, l)| *l)
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        };

        let mut chapters = Vec::new();
        if chapter_starts.is_empty() {
            chapters.push(RawChapter {
                title: title.clone(),
                text: body(0, lines.len()),
            });
        } else {
            let preamble = body(0, chapter_starts[0]);
            if !preamble.is_empty() {
                chapters.push(RawChapter {
                    title: PREAMBLE_TITLE.to_string(),
                    text: preamble,
                });
            }
            for (n, &start) in chapter_starts.iter().enumerate() {
                let end = chapter_starts.get(n + 1).copied().unwrap_or(lines.len());
                chapters.push(RawChapter {
                    title: heading_text(lines[start].trim()),
                    text: body(start + 1, end),
                });
            }
        }

        tracing::debug!(title = %title, chapters = chapters.len(), "Parsed text document");
        Ok(ParsedDocument {
            title,
            author,
            chapters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedDocument {
        PlainTextParser::new().parse(text.as_bytes(), "fallback-title").unwrap()
    }

    #[test]
    fn test_markdown_title_and_chapters() {
        let doc = parse(
            "# The Book\nby Jane Doe\n\n## One\nFirst text.\n\n## Two\nSecond text.\nMore.\n",
        );
        assert_eq!(doc.title, "The Book");
        assert_eq!(doc.author.as_deref(), Some("Jane Doe"));
        assert_eq!(doc.chapters.len(), 2);
        assert_eq!(doc.chapters[0].title, "One");
        assert_eq!(doc.chapters[1].text, "Second text.\nMore.");
    }

    #[test]
    fn test_plain_chapter_headings() {
        let doc = parse(
            "Title: Sea Stories\nAuthor: A. Sailor\n\nChapter 1\nWaves.\n\nCHAPTER II\nWind.\n\n第3章 风\n雨。",
        );
        assert_eq!(doc.title, "Sea Stories");
        assert_eq!(doc.author.as_deref(), Some("A. Sailor"));
        let titles: Vec<&str> = doc.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter 1", "CHAPTER II", "第3章 风"]);
        assert_eq!(doc.chapters[2].text, "雨。");
    }

    #[test]
    fn test_no_headings_single_chapter() {
        let doc = parse("Just some prose.\nAnother line.");
        assert_eq!(doc.title, "fallback-title");
        assert_eq!(doc.chapters.len(), 1);
        assert_eq!(doc.chapters[0].title, "fallback-title");
        assert_eq!(doc.chapters[0].text, "Just some prose.\nAnother line.");
    }

    #[test]
    fn test_preamble_becomes_introduction() {
        let doc = parse("A short foreword.\n\nChapter 1\nBody.");
        assert_eq!(doc.chapters.len(), 2);
        assert_eq!(doc.chapters[0].title, "Introduction");
        assert_eq!(doc.chapters[1].text, "Body.");
    }

    #[test]
    fn test_prose_starting_with_by_is_not_author() {
        let doc = parse("By the river we sat down and wept.\nThe end.");
        assert!(doc.author.is_none());
        assert!(doc.chapters[0].text.starts_with("By the river"));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let result = PlainTextParser::new().parse(&[0xff, 0xfe, 0x00, 0x41], "x");
        assert!(matches!(result, Err(IngestionError::InvalidEncoding)));
    }

    #[test]
    fn test_supported_extensions() {
        let parser = PlainTextParser::new();
        assert!(parser.supports("md"));
        assert!(parser.supports("txt"));
        assert!(!parser.supports("epub"));
    }
}
