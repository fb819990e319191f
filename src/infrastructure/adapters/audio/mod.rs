//! Audio Adapter - WAV 编解码与整书打包

mod container;
mod wav_codec;

pub use container::WavContainerPackager;
pub use wav_codec::{decode_wav, encode_wav, write_wav_file};
