//! Timing Context - WordTiming
//!
//! 章节文本与逐词时间戳的共享数据契约，播放同步客户端直接消费该结构

use serde::{Deserialize, Serialize};

use super::TimingError;

/// 单词时间戳
///
/// 不变量:
/// - `char_start < char_end`，区间按阅读顺序递增且互不重叠
/// - `start_ms <= end_ms`，`start_ms` 在序列中单调不减
///
/// 字符偏移按 Unicode 标量计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordTiming {
    pub token: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub char_start: usize,
    pub char_end: usize,
}

/// 修正为单调序列：`start = max(start, prev_end)`，`end = max(end, start)`
pub fn enforce_monotonic(timings: &mut [WordTiming]) {
    let mut previous_end = 0u64;
    for timing in timings.iter_mut() {
        timing.start_ms = timing.start_ms.max(previous_end);
        timing.end_ms = timing.end_ms.max(timing.start_ms);
        previous_end = timing.end_ms;
    }
}

/// 用词区间与间隙重建原文
///
/// 区间越界或乱序时返回 None
pub fn reconstruct_text(text: &str, words: &[WordTiming]) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    for word in words {
        if word.char_start < cursor || word.char_end > chars.len() || word.char_start >= word.char_end {
            return None;
        }
        out.extend(&chars[cursor..word.char_start]);
        out.extend(&chars[word.char_start..word.char_end]);
        cursor = word.char_end;
    }
    out.extend(&chars[cursor..]);

    Some(out)
}

/// 校验章节时间戳的全部不变量
pub fn validate_timings(text: &str, words: &[WordTiming]) -> Result<(), TimingError> {
    let chars: Vec<char> = text.chars().collect();
    let mut cursor = 0usize;
    let mut previous_start = 0u64;

    for (i, word) in words.iter().enumerate() {
        if word.char_start >= word.char_end {
            return Err(TimingError::EmptySpan(i));
        }
        if word.char_start < cursor {
            return Err(TimingError::OverlappingSpan(i));
        }
        if word.char_end > chars.len() {
            return Err(TimingError::SpanOutOfBounds(i));
        }
        let slice: String = chars[word.char_start..word.char_end].iter().collect();
        if slice != word.token {
            return Err(TimingError::TokenMismatch(i));
        }
        if word.start_ms > word.end_ms {
            return Err(TimingError::InvertedTiming(i));
        }
        if word.start_ms < previous_start {
            return Err(TimingError::NonMonotonic(i));
        }
        cursor = word.char_end;
        previous_start = word.start_ms;
    }

    Ok(())
}
