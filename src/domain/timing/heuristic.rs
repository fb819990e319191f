//! 启发式时间估计
//!
//! 对齐后端不可用时使用：按词权重把每个合成分块的有效时长分配给分块内的词

use super::tokenizer::Token;
use super::word_timing::WordTiming;

/// 一个合成分块在章节音频中的位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkTiming {
    /// 分块在章节文本中的字符起点
    pub char_offset: usize,
    /// 分块字符数
    pub char_len: usize,
    /// 分块音频时长（毫秒）
    pub duration_ms: f64,
    /// 分块开头的静音（毫秒）
    pub leading_silence_ms: f64,
}

impl ChunkTiming {
    fn char_end(&self) -> usize {
        self.char_offset + self.char_len
    }
}

/// 估计逐词时间戳
///
/// - 分块内的词从首段静音之后开始，按权重分配剩余时长，最后一个词吸收余量
/// - 没有词的分块只推进音频偏移
/// - 超出最后一个分块的词得到零长度时间戳
pub fn estimate_timings(chunks: &[ChunkTiming], tokens: &[Token]) -> Vec<WordTiming> {
    let mut timings = Vec::with_capacity(tokens.len());
    let mut audio_offset = 0.0f64;
    let mut index = 0usize;

    for chunk in chunks {
        let first = index;
        while index < tokens.len() && tokens[index].char_start < chunk.char_end() {
            index += 1;
        }
        let chunk_tokens = &tokens[first..index];

        let total_weight: u64 = chunk_tokens.iter().map(|t| t.weight as u64).sum();
        if chunk_tokens.is_empty() || total_weight == 0 {
            audio_offset += chunk.duration_ms;
            continue;
        }

        let leading = chunk.leading_silence_ms.max(0.0);
        let effective = (chunk.duration_ms - leading).max(0.0);
        let mut remaining = effective;
        let mut token_start = audio_offset + leading;

        for (i, token) in chunk_tokens.iter().enumerate() {
            let token_duration = if i == chunk_tokens.len() - 1 {
                remaining
            } else {
                let share = effective * token.weight as f64 / total_weight as f64;
                remaining = (remaining - share).max(0.0);
                share
            };

            let token_end = token_start + token_duration;
            timings.push(WordTiming {
                token: token.value.clone(),
                start_ms: token_start.round() as u64,
                end_ms: token_end.round() as u64,
                char_start: token.char_start,
                char_end: token.char_end,
            });
            token_start = token_end;
        }

        audio_offset += chunk.duration_ms;
    }

    let tail_ms = audio_offset.round() as u64;
    for token in &tokens[index..] {
        timings.push(WordTiming {
            token: token.value.clone(),
            start_ms: tail_ms,
            end_ms: tail_ms,
            char_start: token.char_start,
            char_end: token.char_end,
        });
    }

    timings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timing::tokenizer::tokenize;
    use crate::domain::timing::word_timing::validate_timings;

    #[test]
    fn test_single_chunk_distribution() {
        let text = "aaa bbbbbb.";
        let tokens = tokenize(text, 0);
        let chunks = [ChunkTiming {
            char_offset: 0,
            char_len: text.chars().count(),
            duration_ms: 1800.0,
            leading_silence_ms: 0.0,
        }];

        let timings = estimate_timings(&chunks, &tokens);
        // 权重 3 + 6 + 9 = 18 → 300 / 600 / 900ms
        assert_eq!(timings.len(), 3);
        assert_eq!((timings[0].start_ms, timings[0].end_ms), (0, 300));
        assert_eq!((timings[1].start_ms, timings[1].end_ms), (300, 900));
        assert_eq!((timings[2].start_ms, timings[2].end_ms), (900, 1800));
        assert!(validate_timings(text, &timings).is_ok());
    }

    #[test]
    fn test_leading_silence_and_chunk_offsets() {
        let text = "one two";
        let tokens = tokenize(text, 0);
        let chunks = [
            ChunkTiming {
                char_offset: 0,
                char_len: 4,
                duration_ms: 500.0,
                leading_silence_ms: 200.0,
            },
            ChunkTiming {
                char_offset: 4,
                char_len: 3,
                duration_ms: 400.0,
                leading_silence_ms: 100.0,
            },
        ];

        let timings = estimate_timings(&chunks, &tokens);
        assert_eq!((timings[0].start_ms, timings[0].end_ms), (200, 500));
        assert_eq!((timings[1].start_ms, timings[1].end_ms), (600, 900));
    }

    #[test]
    fn test_tokens_past_last_chunk_are_zero_length() {
        let tokens = tokenize("alpha beta", 0);
        let chunks = [ChunkTiming {
            char_offset: 0,
            char_len: 5,
            duration_ms: 1000.0,
            leading_silence_ms: 0.0,
        }];

        let timings = estimate_timings(&chunks, &tokens);
        assert_eq!(timings.len(), 2);
        assert_eq!((timings[1].start_ms, timings[1].end_ms), (1000, 1000));
    }
}
