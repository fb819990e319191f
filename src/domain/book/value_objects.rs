//! Book Context - Value Objects

use serde::{Deserialize, Serialize};

use super::{BookError, IngestionError};

/// 有声书唯一标识（由上传文件名生成的 slug）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// 解析外部传入的 book id，只接受 `[a-z0-9-]`
    pub fn parse(value: impl Into<String>) -> Result<Self, BookError> {
        let value = value.into();
        let valid = !value.is_empty()
            && value.len() <= 128
            && !value.starts_with('-')
            && value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(BookError::InvalidBookId(value));
        }
        Ok(Self(value))
    }

    /// 由文件名主干生成
    pub fn from_stem(stem: &str) -> Self {
        Self(slugify(stem, "book"))
    }

    /// 追加去重后缀: `name-2`、`name-3` ...
    pub fn with_suffix(&self, counter: u32) -> Self {
        Self(format!("{}-{}", self.0, counter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 把任意字符串转成小写 slug，非字母数字连续段替换为 `-`
pub fn slugify(value: &str, fallback: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// 章节区间终点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterEnd {
    /// 直到最后一章（请求中的 `-1`）
    Last,
    At(u32),
}

impl ChapterEnd {
    /// 请求参数中表示"直到最后一章"的取值
    pub const SENTINEL: i64 = -1;
}

impl std::fmt::Display for ChapterEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChapterEnd::Last => write!(f, "end"),
            ChapterEnd::At(n) => write!(f, "{}", n),
        }
    }
}

/// 1-based 闭区间章节选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    start: u32,
    end: ChapterEnd,
}

impl ChapterRange {
    /// 全书
    pub fn full() -> Self {
        Self {
            start: 1,
            end: ChapterEnd::Last,
        }
    }

    /// 从请求参数构造，`end == -1` 表示全书
    pub fn new(start: i64, end: i64) -> Result<Self, BookError> {
        if start < 1 || start > u32::MAX as i64 {
            return Err(BookError::InvalidRange(format!(
                "chapter_start must be >= 1, got {}",
                start
            )));
        }
        let start = start as u32;

        let end = match end {
            ChapterEnd::SENTINEL => ChapterEnd::Last,
            e if e >= start as i64 && e <= u32::MAX as i64 => ChapterEnd::At(e as u32),
            e => {
                return Err(BookError::InvalidRange(format!(
                    "chapter_end must be -1 or >= chapter_start ({}), got {}",
                    start, e
                )))
            }
        };

        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> ChapterEnd {
        self.end
    }

    /// 针对实际章节数求出闭区间 `(start, end)`
    pub fn resolve(&self, chapter_count: usize) -> Result<(u32, u32), IngestionError> {
        let out_of_bounds = || IngestionError::RangeOutOfBounds {
            start: self.start,
            end: self.end.to_string(),
            count: chapter_count,
        };

        if chapter_count == 0 {
            return Err(IngestionError::NoChapters);
        }
        if self.start as usize > chapter_count {
            return Err(out_of_bounds());
        }
        let end = match self.end {
            ChapterEnd::Last => chapter_count as u32,
            ChapterEnd::At(e) if e as usize > chapter_count => return Err(out_of_bounds()),
            ChapterEnd::At(e) => e,
        };
        Ok((self.start, end))
    }
}

impl Default for ChapterRange {
    fn default() -> Self {
        Self::full()
    }
}
