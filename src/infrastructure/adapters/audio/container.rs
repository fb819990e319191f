//! WAV Container Packager - 整书无缝拼接
//!
//! 各章节 PCM 直接首尾相接，不插入静音；在 data 之后追加
//! `cue ` 与 `LIST/adtl` (labl) 块作为章节标记，并修正 RIFF 长度
//!
//! RIFF 长度字段为 32 位，超过 4 GiB 的整书返回 `Incompatible`

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use super::wav_codec::write_wav_file;
use crate::application::ports::{
    AudioPackagerPort, ChapterMarker, ContainerChapter, PackagingError,
};
use crate::domain::AudioBuffer;

/// WAV 打包器
pub struct WavContainerPackager;

impl WavContainerPackager {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WavContainerPackager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioPackagerPort for WavContainerPackager {
    fn extension(&self) -> &'static str {
        "wav"
    }

    async fn write_chapter_audio(&self, path: &Path, audio: &AudioBuffer) -> Result<(), PackagingError> {
        let path = path.to_path_buf();
        let audio = audio.clone();
        tokio::task::spawn_blocking(move || write_wav_file(&path, &audio))
            .await
            .map_err(|e| PackagingError::IoError(format!("packaging task aborted: {}", e)))?
    }

    async fn build_container(
        &self,
        chapters: &[ContainerChapter],
        output: &Path,
    ) -> Result<Vec<ChapterMarker>, PackagingError> {
        let chapters = chapters.to_vec();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || concat_chapters(&chapters, &output))
            .await
            .map_err(|e| PackagingError::IoError(format!("packaging task aborted: {}", e)))?
    }
}

fn open_reader(path: &Path) -> Result<hound::WavReader<BufReader<File>>, PackagingError> {
    hound::WavReader::open(path)
        .map_err(|e| PackagingError::DecodingError(format!("{}: {}", path.display(), e)))
}

/// 拼接章节 WAV，返回每章在整书中的起止时间
fn concat_chapters(
    chapters: &[ContainerChapter],
    output: &Path,
) -> Result<Vec<ChapterMarker>, PackagingError> {
    let first = chapters
        .first()
        .ok_or_else(|| PackagingError::Incompatible("no chapters to package".to_string()))?;
    let spec = open_reader(&first.audio_path)?.spec();

    let mut writer = hound::WavWriter::create(output, spec)
        .map_err(|e| PackagingError::EncodingError(e.to_string()))?;
    let mut cue_points: Vec<(u32, String)> = Vec::with_capacity(chapters.len());
    let mut markers = Vec::with_capacity(chapters.len());
    let mut frames_written: u64 = 0;

    for chapter in chapters {
        let mut reader = open_reader(&chapter.audio_path)?;
        let chapter_spec = reader.spec();
        if chapter_spec.sample_rate != spec.sample_rate
            || chapter_spec.channels != spec.channels
            || chapter_spec.bits_per_sample != spec.bits_per_sample
        {
            return Err(PackagingError::Incompatible(format!(
                "{} has format {:?}, expected {:?}",
                chapter.audio_path.display(),
                chapter_spec,
                spec
            )));
        }

        let start_frame = frames_written;
        for sample in reader.samples::<i16>() {
            let sample = sample.map_err(|e| PackagingError::DecodingError(e.to_string()))?;
            writer
                .write_sample(sample)
                .map_err(|e| PackagingError::EncodingError(e.to_string()))?;
        }
        frames_written += reader.duration() as u64;

        cue_points.push((start_frame as u32, chapter.title.clone()));
        markers.push(ChapterMarker {
            title: chapter.title.clone(),
            start_ms: frames_to_ms(start_frame, spec.sample_rate),
            end_ms: frames_to_ms(frames_written, spec.sample_rate),
        });
    }

    writer
        .finalize()
        .map_err(|e| PackagingError::EncodingError(e.to_string()))?;

    append_marker_chunks(output, &cue_points)?;
    Ok(markers)
}

fn frames_to_ms(frames: u64, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (frames * 1000 + sample_rate as u64 / 2) / sample_rate as u64
}

/// 构造 `cue ` 块
fn cue_chunk(points: &[(u32, String)]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + points.len() * 24);
    body.extend_from_slice(&(points.len() as u32).to_le_bytes());
    for (i, (position, _)) in points.iter().enumerate() {
        let id = i as u32 + 1;
        body.extend_from_slice(&id.to_le_bytes());
        body.extend_from_slice(&position.to_le_bytes());
        body.extend_from_slice(b"data");
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&position.to_le_bytes());
    }
    riff_chunk(b"cue ", &body)
}

/// 构造 `LIST/adtl` 块，每个章节一个 `labl`
fn label_list_chunk(points: &[(u32, String)]) -> Vec<u8> {
    let mut body = b"adtl".to_vec();
    for (i, (_, title)) in points.iter().enumerate() {
        let mut label = (i as u32 + 1).to_le_bytes().to_vec();
        label.extend_from_slice(title.as_bytes());
        label.push(0);
        body.extend(riff_chunk(b"labl", &label));
    }
    riff_chunk(b"LIST", &body)
}

/// 块头 + 内容，奇数长度补一个填充字节
fn riff_chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(8 + body.len() + 1);
    chunk.extend_from_slice(id);
    chunk.extend_from_slice(&(body.len() as u32).to_le_bytes());
    chunk.extend_from_slice(body);
    if body.len() % 2 == 1 {
        chunk.push(0);
    }
    chunk
}

fn append_marker_chunks(path: &Path, points: &[(u32, String)]) -> Result<(), PackagingError> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;

    let mut end = file.seek(SeekFrom::End(0))?;
    // data 块为奇数长度时 hound 不补齐
    if end % 2 == 1 {
        file.write_all(&[0])?;
        end += 1;
    }
    file.write_all(&cue_chunk(points))?;
    file.write_all(&label_list_chunk(points))?;

    let total = file.seek(SeekFrom::End(0))?;
    let riff_size = u32::try_from(total - 8)
        .map_err(|_| PackagingError::Incompatible(format!("container exceeds 4 GiB ({} bytes)", total)))?;
    file.seek(SeekFrom::Start(4))?;
    file.write_all(&riff_size.to_le_bytes())?;
    file.flush()?;

    tracing::debug!(path = %path.display(), data_end = end, total, "Chapter markers written");
    Ok(())
}
