//! Transcoder Adapter - 上传音频规范化

mod ffmpeg_transcoder;
mod wav_header;

pub use ffmpeg_transcoder::{FfmpegTranscoder, FfmpegTranscoderConfig};
pub use wav_header::{inspect_wav, inspect_wav_header, pcm_silence};
