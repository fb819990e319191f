//! Tone Synthesizer - 本地确定性合成器
//!
//! 不调用任何模型：每个词生成一段正弦音，标点生成静音，
//! 并给出朴素词边界。用于开发环境与测试

use async_trait::async_trait;
use std::f32::consts::PI;

use crate::application::ports::{
    SynthesisEnginePort, SynthesisError, SynthesisOutput, SynthesisRequest,
};
use crate::domain::timing::{tokenize, WordBoundary};
use crate::domain::AudioBuffer;

/// Tone Synthesizer 配置
#[derive(Debug, Clone)]
pub struct ToneSynthesizerConfig {
    pub sample_rate: u32,
    /// 每个字符的发音时长
    pub ms_per_char: u32,
    /// 开头静音
    pub leading_silence_ms: u32,
    /// 词间静音
    pub gap_ms: u32,
    /// 是否返回朴素词边界
    pub emit_boundaries: bool,
}

impl Default for ToneSynthesizerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            ms_per_char: 55,
            leading_silence_ms: 120,
            gap_ms: 40,
            emit_boundaries: true,
        }
    }
}

/// Tone Synthesizer
pub struct ToneSynthesizer {
    config: ToneSynthesizerConfig,
}

impl ToneSynthesizer {
    pub fn new(config: ToneSynthesizerConfig) -> Self {
        tracing::info!(sample_rate = config.sample_rate, "ToneSynthesizer initialized");
        Self { config }
    }

    fn samples_for(&self, ms: u32) -> usize {
        (self.config.sample_rate as u64 * ms as u64 / 1000) as usize
    }

    /// 不同音色对应不同基频
    fn pitch_hz(voice: &str) -> f32 {
        let seed = voice.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        160.0 + (seed % 6) as f32 * 30.0
    }

    fn render(&self, text: &str, voice: &str) -> SynthesisOutput {
        let rate = self.config.sample_rate;
        let pitch = Self::pitch_hz(voice);
        let mut samples = vec![0.0f32; self.samples_for(self.config.leading_silence_ms)];
        let mut boundaries = Vec::new();

        for token in tokenize(text, 0) {
            if token.is_word() {
                let ms = (token.char_end - token.char_start) as u32 * self.config.ms_per_char;
                let len = self.samples_for(ms.max(80));
                let start = samples.len();
                samples.extend((0..len).map(|i| {
                    let t = i as f32 / rate as f32;
                    0.4 * (2.0 * PI * pitch * t).sin()
                }));
                boundaries.push(WordBoundary {
                    word: token.value.clone(),
                    start_ms: (start as u64 * 1000) / rate as u64,
                    end_ms: (samples.len() as u64 * 1000) / rate as u64,
                });
            } else {
                let pause = if matches!(token.value.as_str(), "." | "!" | "?" | ";" | ":") {
                    self.config.gap_ms * 4
                } else {
                    self.config.gap_ms * 2
                };
                samples.extend(std::iter::repeat(0.0).take(self.samples_for(pause)));
                continue;
            }
            samples.extend(std::iter::repeat(0.0).take(self.samples_for(self.config.gap_ms)));
        }

        if !self.config.emit_boundaries {
            boundaries.clear();
        }

        SynthesisOutput {
            audio: AudioBuffer::new(samples, rate),
            boundaries,
        }
    }
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self::new(ToneSynthesizerConfig::default())
    }
}

#[async_trait]
impl SynthesisEnginePort for ToneSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
        if request.voice.trim().is_empty() {
            return Err(SynthesisError::VoiceNotFound(request.voice));
        }

        tracing::debug!(
            text_len = request.text.len(),
            voice = %request.voice,
            "ToneSynthesizer: rendering text"
        );
        Ok(self.render(&request.text, &request.voice))
    }
}
