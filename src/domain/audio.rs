//! 音频缓冲区
//!
//! 合成后端返回单声道 f32 采样，打包阶段再量化为 16-bit PCM

/// 静音检测的最低阈值
const MIN_SILENCE_THRESHOLD: f32 = 1e-4;

/// 相对于峰值的自适应阈值比例
const ADAPTIVE_THRESHOLD_RATIO: f32 = 0.005;

/// 单声道音频缓冲区
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// 首尾静音分析结果（毫秒）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SilenceProfile {
    pub duration_ms: f64,
    pub leading_silence_ms: f64,
    pub trailing_silence_ms: f64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 精确时长（毫秒，浮点）
    pub fn duration_ms_f64(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    /// 时长（毫秒，四舍五入）
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms_f64().round() as u64
    }

    /// 追加另一段音频（采样率必须一致）
    pub fn append(&mut self, other: &AudioBuffer) -> Result<(), String> {
        if self.samples.is_empty() {
            self.sample_rate = other.sample_rate;
        } else if !other.samples.is_empty() && other.sample_rate != self.sample_rate {
            return Err(format!(
                "sample rate mismatch: {} vs {}",
                self.sample_rate, other.sample_rate
            ));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// 分析首尾静音
    ///
    /// 阈值为 `max(1e-4, 峰值 × 0.005)`；全静音时不计首尾静音
    pub fn analyze_silence(&self) -> SilenceProfile {
        let duration_ms = self.duration_ms_f64();
        if self.samples.is_empty() || self.sample_rate == 0 {
            return SilenceProfile::default();
        }

        let peak = self
            .samples
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        if peak <= 1e-6 {
            return SilenceProfile {
                duration_ms,
                ..Default::default()
            };
        }

        let threshold = MIN_SILENCE_THRESHOLD.max(peak * ADAPTIVE_THRESHOLD_RATIO);
        let first = self.samples.iter().position(|s| s.abs() >= threshold);
        let last = self.samples.iter().rposition(|s| s.abs() >= threshold);

        match (first, last) {
            (Some(first), Some(last)) => {
                let rate = self.sample_rate as f64;
                SilenceProfile {
                    duration_ms,
                    leading_silence_ms: first as f64 * 1000.0 / rate,
                    trailing_silence_ms: (self.samples.len() - last - 1) as f64 * 1000.0 / rate,
                }
            }
            _ => SilenceProfile {
                duration_ms,
                leading_silence_ms: 0.0,
                trailing_silence_ms: duration_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 16000], 16000);
        assert_eq!(buffer.duration_ms(), 1000);
        assert_eq!(AudioBuffer::empty(16000).duration_ms(), 0);
    }

    #[test]
    fn test_append_rejects_rate_mismatch() {
        let mut a = AudioBuffer::new(vec![0.1; 10], 16000);
        let b = AudioBuffer::new(vec![0.1; 10], 22050);
        assert!(a.append(&b).is_err());

        let mut empty = AudioBuffer::empty(0);
        empty.append(&b).unwrap();
        assert_eq!(empty.sample_rate, 22050);
        assert_eq!(empty.samples.len(), 10);
    }

    #[test]
    fn test_leading_silence_detected() {
        // 100ms 静音 + 100ms 信号 + 50ms 静音 @ 1kHz
        let mut samples = vec![0.0f32; 100];
        samples.extend(vec![0.5f32; 100]);
        samples.extend(vec![0.0f32; 50]);
        let profile = AudioBuffer::new(samples, 1000).analyze_silence();

        assert_eq!(profile.duration_ms, 250.0);
        assert_eq!(profile.leading_silence_ms, 100.0);
        assert_eq!(profile.trailing_silence_ms, 50.0);
    }

    #[test]
    fn test_all_silent_has_no_leading_silence() {
        let profile = AudioBuffer::new(vec![0.0; 500], 1000).analyze_silence();
        assert_eq!(profile.duration_ms, 500.0);
        assert_eq!(profile.leading_silence_ms, 0.0);
    }
}
