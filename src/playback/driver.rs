//! Playback Driver - 由播放时钟驱动的高亮循环
//!
//! 不使用固定频率的定时器：每个时钟采样驱动一次同步；
//! 倍速变化只影响采样到达的节奏，不影响词序号

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::synchronizer::{HighlightChange, WordSynchronizer};

/// 播放时钟采样
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockSample {
    /// 连续播放中的当前位置（毫秒）
    Position(u64),
    /// 显式跳转
    Seek(u64),
    RateChanged(f32),
    Ended,
}

/// 播放时钟
#[async_trait]
pub trait PlaybackClock: Send {
    /// 下一个采样；时钟关闭时返回 None
    async fn next_sample(&mut self) -> Option<ClockSample>;
}

/// 高亮输出
pub trait HighlightSink: Send {
    fn apply(&mut self, change: HighlightChange);
}

impl<F> HighlightSink for F
where
    F: FnMut(HighlightChange) + Send,
{
    fn apply(&mut self, change: HighlightChange) {
        self(change)
    }
}

/// 基于 mpsc 通道的时钟，播放器通过 `ClockHandle` 推送采样
pub struct ChannelClock {
    rx: mpsc::Receiver<ClockSample>,
}

/// 播放器一侧的时钟句柄
#[derive(Clone)]
pub struct ClockHandle {
    tx: mpsc::Sender<ClockSample>,
}

impl ChannelClock {
    pub fn new(capacity: usize) -> (ClockHandle, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClockHandle { tx }, Self { rx })
    }
}

impl ClockHandle {
    /// 推送采样；驱动循环已退出时返回 false
    pub async fn send(&self, sample: ClockSample) -> bool {
        self.tx.send(sample).await.is_ok()
    }
}

#[async_trait]
impl PlaybackClock for ChannelClock {
    async fn next_sample(&mut self) -> Option<ClockSample> {
        self.rx.recv().await
    }
}

/// 驱动结束时的统计
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSummary {
    pub samples: u64,
    pub changes: u64,
    pub rate: f32,
}

/// 消费时钟采样直到播放结束或时钟关闭
pub async fn drive<C, S>(sync: &mut WordSynchronizer, clock: &mut C, sink: &mut S) -> PlaybackSummary
where
    C: PlaybackClock + ?Sized,
    S: HighlightSink + ?Sized,
{
    let mut summary = PlaybackSummary {
        samples: 0,
        changes: 0,
        rate: 1.0,
    };

    while let Some(sample) = clock.next_sample().await {
        summary.samples += 1;

        let change = match sample {
            ClockSample::Position(time_ms) => sync.tick(time_ms),
            ClockSample::Seek(time_ms) => {
                tracing::debug!(time_ms, "Playback seek");
                sync.seek(time_ms)
            }
            ClockSample::RateChanged(rate) => {
                tracing::debug!(rate, "Playback rate changed");
                summary.rate = rate;
                None
            }
            ClockSample::Ended => {
                if let Some(change) = sync.clear() {
                    sink.apply(change);
                    summary.changes += 1;
                }
                break;
            }
        };

        if let Some(change) = change {
            sink.apply(change);
            summary.changes += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::synchronizer::WordSpan;

    fn synchronizer() -> WordSynchronizer {
        WordSynchronizer::new(vec![
            WordSpan { start_ms: 0, end_ms: 500 },
            WordSpan { start_ms: 500, end_ms: 1200 },
            WordSpan { start_ms: 1200, end_ms: 2000 },
        ])
    }

    #[tokio::test]
    async fn test_drive_forwards_changes_until_ended() {
        let (handle, mut clock) = ChannelClock::new(16);
        let player = tokio::spawn(async move {
            for sample in [
                ClockSample::Position(100),
                ClockSample::Position(300),
                ClockSample::RateChanged(1.5),
                ClockSample::Position(650),
                ClockSample::Seek(1500),
                ClockSample::Seek(200),
                ClockSample::Ended,
                ClockSample::Position(900),
            ] {
                if !handle.send(sample).await {
                    break;
                }
            }
        });

        let mut changes = Vec::new();
        let mut sync = synchronizer();
        let mut sink = |change: HighlightChange| changes.push(change);
        let summary = drive(&mut sync, &mut clock, &mut sink).await;
        player.await.unwrap();

        assert_eq!(
            changes,
            vec![
                HighlightChange::Activate(0),
                HighlightChange::Activate(1),
                HighlightChange::Activate(2),
                HighlightChange::Activate(0),
                HighlightChange::Clear,
            ]
        );
        assert_eq!(summary.samples, 7);
        assert_eq!(summary.changes, 5);
        assert_eq!(summary.rate, 1.5);
        assert_eq!(sync.active(), None);
    }

    #[tokio::test]
    async fn test_drive_stops_when_clock_closes() {
        let (handle, mut clock) = ChannelClock::new(4);
        handle.send(ClockSample::Position(700)).await;
        drop(handle);

        let mut last = None;
        let mut sync = synchronizer();
        let mut sink = |change: HighlightChange| last = Some(change);
        let summary = drive(&mut sync, &mut clock, &mut sink).await;

        assert_eq!(summary.samples, 1);
        assert_eq!(last, Some(HighlightChange::Activate(1)));
        assert_eq!(sync.active(), Some(1));
    }
}
