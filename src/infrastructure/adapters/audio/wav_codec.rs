//! WAV Codec - 基于 symphonia 解码、hound 编码
//!
//! 合成后端返回任意 WAV，统一解码为单声道 f32；写盘时量化为 16-bit PCM

use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::PackagingError;
use crate::domain::AudioBuffer;

/// 写出格式
fn pcm16_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

#[inline]
fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// 解码 WAV 字节为单声道缓冲区（多声道取平均）
pub fn decode_wav(data: &[u8]) -> Result<AudioBuffer, PackagingError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| PackagingError::DecodingError(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| PackagingError::DecodingError("No audio track found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PackagingError::DecodingError("Unknown sample rate".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PackagingError::DecodingError(format!("Decoder creation failed: {}", e)))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(PackagingError::DecodingError(format!(
                    "Packet read error: {}",
                    e
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Decode error (skipping packet): {}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        if channels == 1 {
            samples.extend_from_slice(sample_buf.samples());
        } else {
            samples.extend(
                sample_buf
                    .samples()
                    .chunks_exact(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }
    }

    Ok(AudioBuffer::new(samples, sample_rate))
}

/// 编码为 16-bit PCM WAV 字节
pub fn encode_wav(audio: &AudioBuffer) -> Result<Vec<u8>, PackagingError> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, pcm16_spec(audio.sample_rate))
            .map_err(|e| PackagingError::EncodingError(e.to_string()))?;
        for sample in &audio.samples {
            writer
                .write_sample(quantize(*sample))
                .map_err(|e| PackagingError::EncodingError(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| PackagingError::EncodingError(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

/// 写出 16-bit PCM WAV 文件（阻塞）
pub fn write_wav_file(path: &Path, audio: &AudioBuffer) -> Result<(), PackagingError> {
    let mut writer = hound::WavWriter::create(path, pcm16_spec(audio.sample_rate))
        .map_err(|e| PackagingError::EncodingError(format!("{}: {}", path.display(), e)))?;
    for sample in &audio.samples {
        writer
            .write_sample(quantize(*sample))
            .map_err(|e| PackagingError::EncodingError(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| PackagingError::EncodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_then_decode_preserves_length_and_rate() {
        let samples: Vec<f32> = (0..2400).map(|i| ((i as f32) * 0.05).sin() * 0.5).collect();
        let audio = AudioBuffer::new(samples, 24000);

        let bytes = encode_wav(&audio).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");

        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 24000);
        assert_eq!(decoded.samples.len(), 2400);
        assert!((decoded.samples[100] - audio.samples[100]).abs() < 1e-3);
    }

    #[test]
    fn test_decode_downmixes_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..800 {
                writer.write_sample(i16::MAX / 2).unwrap();
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let decoded = decode_wav(&cursor.into_inner()).unwrap();
        assert_eq!(decoded.samples.len(), 800);
        assert!((decoded.samples[0] - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_wav(b"not a wav file").is_err());
    }
}
