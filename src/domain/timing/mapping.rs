//! 对齐结果映射
//!
//! 把后端返回的词级时间（朴素边界或强制对齐结果）按顺序匹配回章节分词

use serde::{Deserialize, Serialize};

use super::tokenizer::normalize_token;
use super::word_timing::{enforce_monotonic, WordTiming};

/// 向前查找匹配的最大窗口
const MATCH_LOOKAHEAD: usize = 8;

/// 后端给出的词边界
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBoundary {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// 将词边界应用到已有时间戳上，返回命中的词数
///
/// 未命中的词保留原有（启发式）时间，最后统一修正为单调序列
pub fn apply_word_boundaries(timings: &mut [WordTiming], boundaries: &[WordBoundary]) -> usize {
    let normalized: Vec<(String, &WordBoundary)> = boundaries
        .iter()
        .map(|b| (normalize_token(&b.word), b))
        .filter(|(n, _)| !n.is_empty())
        .collect();

    if normalized.is_empty() {
        return 0;
    }

    let mut cursor = 0usize;
    let mut matched = 0usize;

    for timing in timings.iter_mut() {
        if cursor >= normalized.len() {
            break;
        }
        let key = normalize_token(&timing.token);
        if key.is_empty() {
            continue;
        }

        let window_end = (cursor + MATCH_LOOKAHEAD).min(normalized.len());
        if let Some(offset) = normalized[cursor..window_end]
            .iter()
            .position(|(n, _)| *n == key)
        {
            let boundary = normalized[cursor + offset].1;
            timing.start_ms = boundary.start_ms;
            timing.end_ms = boundary.end_ms.max(boundary.start_ms);
            cursor += offset + 1;
            matched += 1;
        }
    }

    enforce_monotonic(timings);
    matched
}
