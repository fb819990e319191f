//! Word Synchronizer - 逐词高亮同步
//!
//! 每个播放时钟采样调用一次 `tick`。游标在上次位置附近做有界的双向扫描：
//! 正常顺序播放时均摊 O(1)，小幅回退时向前回扫；显式跳转时游标归零后重新扫描

use crate::domain::timing::WordTiming;

/// 词的时间区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSpan {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl From<&WordTiming> for WordSpan {
    fn from(word: &WordTiming) -> Self {
        Self {
            start_ms: word.start_ms,
            end_ms: word.end_ms,
        }
    }
}

/// 高亮变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightChange {
    /// 高亮第 `index` 个词
    Activate(usize),
    /// 清除高亮
    Clear,
}

/// 逐词同步状态
#[derive(Debug, Clone)]
pub struct WordSynchronizer {
    spans: Vec<WordSpan>,
    cursor: usize,
    active: Option<usize>,
}

impl WordSynchronizer {
    pub fn new(spans: Vec<WordSpan>) -> Self {
        Self {
            spans,
            cursor: 0,
            active: None,
        }
    }

    pub fn from_words(words: &[WordTiming]) -> Self {
        Self::new(words.iter().map(WordSpan::from).collect())
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// 处理一个播放位置采样，返回需要应用的高亮变化
    pub fn tick(&mut self, time_ms: u64) -> Option<HighlightChange> {
        let last = self.spans.len().checked_sub(1)?;
        if self.cursor > last {
            self.cursor = 0;
        }

        while self.cursor > 0 && time_ms < self.spans[self.cursor].start_ms {
            self.cursor -= 1;
        }
        while self.cursor < last && time_ms > self.spans[self.cursor].end_ms {
            self.cursor += 1;
        }

        let span = self.spans[self.cursor];
        if span.start_ms <= time_ms && time_ms <= span.end_ms {
            if self.active != Some(self.cursor) {
                self.active = Some(self.cursor);
                return Some(HighlightChange::Activate(self.cursor));
            }
        } else if time_ms > span.end_ms && self.cursor == last {
            return self.clear();
        }

        None
    }

    /// 跳转：游标归零、清除当前高亮后重新扫描
    ///
    /// 返回相对跳转前状态的净变化
    pub fn seek(&mut self, time_ms: u64) -> Option<HighlightChange> {
        let previous = self.active.take();
        self.cursor = 0;
        self.tick(time_ms);

        match (previous, self.active) {
            (prev, Some(now)) if prev != Some(now) => Some(HighlightChange::Activate(now)),
            (Some(_), None) => Some(HighlightChange::Clear),
            _ => None,
        }
    }

    /// 清除高亮（播放结束）
    pub fn clear(&mut self) -> Option<HighlightChange> {
        self.active.take().map(|_| HighlightChange::Clear)
    }
}
