//! 对齐降级策略
//!
//! 按选择依次尝试对齐后端；后端不可用、报错或没有匹配到任何词时，
//! 使用合成后端的朴素边界或启发式估计。该步骤永远不会让任务失败

use crate::application::ports::{AlignerRegistry, AlignmentBackend, AlignmentError, AlignmentSelection};
use crate::domain::timing::{
    apply_word_boundaries, enforce_monotonic, estimate_timings, tokenize, ChunkTiming, WordBoundary,
    WordTiming,
};
use crate::domain::AudioBuffer;

/// 最终时间戳的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingSource {
    Aligned(AlignmentBackend),
    SynthesisBoundaries,
    Heuristic,
}

impl std::fmt::Display for TimingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingSource::Aligned(backend) => write!(f, "{}", backend),
            TimingSource::SynthesisBoundaries => write!(f, "synthesis"),
            TimingSource::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// 单章对齐输入
pub struct ChapterAlignment<'a> {
    pub text: &'a str,
    pub audio: &'a AudioBuffer,
    /// 各合成分块的位置与静音信息
    pub chunks: &'a [ChunkTiming],
    /// 合成后端给出的朴素边界（已换算为章节时间）
    pub boundaries: &'a [WordBoundary],
    pub selection: AlignmentSelection,
    pub device: Option<&'a str>,
}

/// 对齐结果
#[derive(Debug, Clone)]
pub struct AlignmentOutcome {
    pub words: Vec<WordTiming>,
    pub source: TimingSource,
}

/// 对齐策略
#[derive(Clone)]
pub struct AlignmentPolicy {
    registry: AlignerRegistry,
}

impl AlignmentPolicy {
    pub fn new(registry: AlignerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AlignerRegistry {
        &self.registry
    }

    /// 计算章节逐词时间戳
    pub async fn resolve(&self, input: ChapterAlignment<'_>) -> AlignmentOutcome {
        let tokens = tokenize(input.text, 0);
        let mut words = estimate_timings(input.chunks, &tokens);
        let mut source = TimingSource::Heuristic;

        if !input.boundaries.is_empty() && apply_word_boundaries(&mut words, input.boundaries) > 0 {
            source = TimingSource::SynthesisBoundaries;
        }

        if words.is_empty() {
            return AlignmentOutcome { words, source };
        }

        for backend in input.selection.sequence() {
            let Some(engine) = self.registry.get(backend) else {
                tracing::debug!(backend = %backend, "Alignment backend not registered");
                continue;
            };

            match engine.align(input.audio, input.text, input.device).await {
                Ok(aligned) if !aligned.is_empty() => {
                    let mut refined = words.clone();
                    let matched = apply_word_boundaries(&mut refined, &aligned);
                    if matched > 0 {
                        tracing::debug!(backend = %backend, matched, total = refined.len(), "Alignment applied");
                        return AlignmentOutcome {
                            words: refined,
                            source: TimingSource::Aligned(backend),
                        };
                    }
                    tracing::warn!(backend = %backend, "Aligned words did not match chapter text");
                }
                Ok(_) => {
                    tracing::warn!(backend = %backend, "Alignment backend returned no words");
                }
                Err(AlignmentError::Unavailable(reason)) => {
                    tracing::info!(backend = %backend, reason = %reason, "Alignment backend unavailable");
                }
                Err(e) => {
                    tracing::warn!(backend = %backend, error = %e, "Alignment failed");
                }
            }
        }

        enforce_monotonic(&mut words);
        tracing::debug!(source = %source, "Using fallback word timings");
        AlignmentOutcome { words, source }
    }
}
