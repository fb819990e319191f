//! 分词器
//!
//! 单词为 `[\w]+(?:['\-][\w]+)*`，其余每个非空白字符单独成词

use regex::Regex;
use std::sync::OnceLock;

/// 最小权重
const MIN_TOKEN_WEIGHT: u32 = 3;

/// 停顿类标点（额外 +8 权重）
const PAUSE_TOKENS: &[&str] = &[".", "!", "?", ";", ":"];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\w]+(?:['\-][\w]+)*|[^\s]").expect("token pattern is valid")
    })
}

/// 分词结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    /// 字符偏移（Unicode 标量）
    pub char_start: usize,
    pub char_end: usize,
    /// 时长分配权重
    pub weight: u32,
}

impl Token {
    /// 是否为可被对齐的单词（至少含一个字母或数字）
    pub fn is_word(&self) -> bool {
        self.value.chars().any(|c| c.is_alphanumeric())
    }
}

/// 计算词的时长权重
pub fn token_weight(token: &str) -> u32 {
    let stripped = token.trim();
    if stripped.is_empty() {
        return MIN_TOKEN_WEIGHT;
    }
    let len = stripped.chars().count() as u32;
    if PAUSE_TOKENS.contains(&stripped) {
        return MIN_TOKEN_WEIGHT.max(len + 8);
    }
    if stripped.chars().all(|c| !c.is_alphanumeric() && c != '_') {
        return MIN_TOKEN_WEIGHT.max(len + 4);
    }
    MIN_TOKEN_WEIGHT.max(len)
}

/// 对文本分词，`base_offset` 为文本在章节中的字符起点
pub fn tokenize(text: &str, base_offset: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut byte_cursor = 0usize;
    let mut char_cursor = 0usize;

    for m in token_pattern().find_iter(text) {
        char_cursor += text[byte_cursor..m.start()].chars().count();
        let char_start = char_cursor;
        char_cursor += m.as_str().chars().count();
        byte_cursor = m.end();

        tokens.push(Token {
            value: m.as_str().to_string(),
            char_start: base_offset + char_start,
            char_end: base_offset + char_cursor,
            weight: token_weight(m.as_str()),
        });
    }

    tokens
}

/// 归一化：小写并只保留字母数字，用于对齐匹配
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_words_and_punctuation() {
        let tokens = tokenize("Don't stop, well-known!", 0);
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["Don't", "stop", ",", "well-known", "!"]);
        assert_eq!((tokens[1].char_start, tokens[1].char_end), (6, 10));
    }

    #[test]
    fn test_offsets_are_char_based() {
        let tokens = tokenize("café über", 10);
        assert_eq!((tokens[0].char_start, tokens[0].char_end), (10, 14));
        assert_eq!((tokens[1].char_start, tokens[1].char_end), (15, 19));
    }

    #[test]
    fn test_weights() {
        assert_eq!(token_weight("a"), 3);
        assert_eq!(token_weight("chapter"), 7);
        assert_eq!(token_weight("."), 9);
        assert_eq!(token_weight(","), 5);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_token("Don't!"), "dont");
        assert_eq!(normalize_token("..."), "");
    }
}
