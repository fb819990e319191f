//! Playback Synchronization Client - 播放端逐词同步
//!
//! - synchronizer: 有界双向扫描的高亮算法
//! - driver: 由播放时钟采样驱动的高亮循环
//! - poller: 固定间隔的任务状态轮询

mod driver;
mod poller;
mod synchronizer;

pub use driver::{drive, ChannelClock, ClockHandle, ClockSample, HighlightSink, PlaybackClock, PlaybackSummary};
pub use poller::{JobPoller, JobPollerConfig, PollError};
pub use synchronizer::{HighlightChange, WordSpan, WordSynchronizer};
