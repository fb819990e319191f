//! 文本分块器
//!
//! 把章节文本切成合成后端可接受长度的分块。分块首尾相接、完整覆盖原文，
//! 每个分块记录自己在章节中的字符偏移，供时间估计使用

/// 默认单块最大字符数
pub const DEFAULT_MAX_CHARS: usize = 3000;

/// 分块配置
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 单块最大字符数
    pub max_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// 文本分块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 分块在章节文本中的字符起点
    pub char_offset: usize,
    pub text: String,
}

impl TextChunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// 是否包含可朗读内容
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// 检查是否为强分隔符（句末标点与换行）
#[inline]
fn is_strong_delimiter(ch: char) -> bool {
    matches!(ch, '。' | '？' | '！' | '.' | '?' | '!' | '\n')
}

/// 检查是否为弱分隔符（逗号等）
#[inline]
fn is_weak_delimiter(ch: char) -> bool {
    matches!(ch, '，' | '；' | '：' | ',' | ';' | ':')
}

/// 在 `window` 内寻找切分点（返回切分后的字符数）
///
/// 优先级: 强分隔符 > 弱分隔符 > 空白 > 硬切
fn find_cut(window: &[char]) -> usize {
    let last_matching = |pred: fn(char) -> bool| {
        window
            .iter()
            .rposition(|c| pred(*c))
            .map(|i| i + 1)
    };

    last_matching(is_strong_delimiter)
        .or_else(|| last_matching(is_weak_delimiter))
        .or_else(|| last_matching(char::is_whitespace))
        .unwrap_or(window.len())
}

/// 对文本分块
///
/// 所有分块按顺序拼接后与原文完全一致
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let max_chars = config.max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let remaining = chars.len() - start;
        let len = if remaining <= max_chars {
            remaining
        } else {
            find_cut(&chars[start..start + max_chars])
        };

        chunks.push(TextChunk {
            char_offset: start,
            text: chars[start..start + len].iter().collect(),
        });
        start += len;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(chunks: &[TextChunk]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Hello there.", &ChunkConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].char_offset, 0);
        assert_eq!(chunks[0].text, "Hello there.");
    }

    #[test]
    fn test_strong_delimiter_preferred() {
        let config = ChunkConfig { max_chars: 20 };
        let text = "One, two. Three four five six.";
        let chunks = chunk_text(text, &config);

        assert_eq!(chunks[0].text, "One, two.");
        assert_eq!(chunks[1].char_offset, 9);
        assert_eq!(joined(&chunks), text);
    }

    #[test]
    fn test_weak_then_whitespace_then_hard_cut() {
        let config = ChunkConfig { max_chars: 8 };
        assert_eq!(chunk_text("ab, cdefghij", &config)[0].text, "ab,");
        assert_eq!(chunk_text("abc defghij", &config)[0].text, "abc ");
        assert_eq!(chunk_text("abcdefghij", &config)[0].text, "abcdefgh");
    }

    #[test]
    fn test_chunks_cover_text_with_char_offsets() {
        let config = ChunkConfig { max_chars: 5 };
        let text = "这是第一句。这是第二句。";
        let chunks = chunk_text(text, &config);

        assert_eq!(joined(&chunks), text);
        let mut expected = 0;
        for chunk in &chunks {
            assert_eq!(chunk.char_offset, expected);
            assert!(chunk.char_len() <= 5);
            expected += chunk.char_len();
        }
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", &ChunkConfig::default()).is_empty());
    }
}
