//! WAV 文件头解析
//!
//! 只读 RIFF/fmt/data 三个 chunk，用来确认转码输出确实是规范格式

use crate::application::ports::{AudioInfo, TranscodeError};

/// PCM 编码的 format tag
const WAVE_FORMAT_PCM: u16 = 1;
/// WAVE_FORMAT_EXTENSIBLE（ffmpeg 偶尔会写这个）
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

#[derive(Debug)]
struct FmtChunk {
    audio_format: u16,
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

#[derive(Debug)]
struct WavHeader {
    fmt: FmtChunk,
    data_size: usize,
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn invalid(reason: &str) -> TranscodeError {
    TranscodeError::InvalidOutput(format!("Invalid WAV: {}", reason))
}

/// `file_len` 是整个文件的长度，`data` 可以只是文件开头的一段
fn parse_wav_header(data: &[u8], file_len: usize) -> Result<WavHeader, TranscodeError> {
    if data.len() < 12 {
        return Err(invalid("data too short"));
    }
    if &data[0..4] != b"RIFF" {
        return Err(invalid("missing RIFF header"));
    }
    if &data[8..12] != b"WAVE" {
        return Err(invalid("missing WAVE identifier"));
    }

    let mut pos = 12;
    let mut fmt: Option<FmtChunk> = None;
    let mut data_size: Option<usize> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32(data, pos + 4) as usize;
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > data.len() {
                    return Err(invalid("truncated fmt chunk"));
                }
                fmt = Some(FmtChunk {
                    audio_format: read_u16(data, body),
                    num_channels: read_u16(data, body + 2),
                    sample_rate: read_u32(data, body + 4),
                    bits_per_sample: read_u16(data, body + 14),
                });
            }
            b"data" => {
                // 头部声明的长度可能大于实际写入的长度，以实际为准
                data_size = Some(chunk_size.min(file_len.saturating_sub(body)));
                break;
            }
            _ => {}
        }

        pos = body.saturating_add(chunk_size);
        // 对齐到偶数字节
        if chunk_size % 2 != 0 {
            pos = pos.saturating_add(1);
        }
    }

    let fmt = fmt.ok_or_else(|| invalid("missing fmt chunk"))?;
    let data_size = data_size.ok_or_else(|| invalid("missing data chunk"))?;

    Ok(WavHeader { fmt, data_size })
}

/// 读取 WAV 的格式信息
///
/// 非 PCM 编码视为错误；时长按 data chunk 的大小计算
pub fn inspect_wav(data: &[u8]) -> Result<AudioInfo, TranscodeError> {
    inspect_wav_header(data, data.len() as u64)
}

/// 只凭文件开头一段解析格式信息，`file_len` 为完整文件长度
pub fn inspect_wav_header(prefix: &[u8], file_len: u64) -> Result<AudioInfo, TranscodeError> {
    let file_len = usize::try_from(file_len).unwrap_or(usize::MAX);
    let header = parse_wav_header(prefix, file_len.max(prefix.len()))?;

    if header.fmt.audio_format != WAVE_FORMAT_PCM
        && header.fmt.audio_format != WAVE_FORMAT_EXTENSIBLE
    {
        return Err(invalid(&format!(
            "not PCM (format tag {})",
            header.fmt.audio_format
        )));
    }

    let bytes_per_frame =
        (header.fmt.bits_per_sample as usize / 8) * header.fmt.num_channels as usize;
    let frames = if bytes_per_frame > 0 {
        header.data_size / bytes_per_frame
    } else {
        0
    };
    let duration_ms = if header.fmt.sample_rate > 0 {
        (frames as u64 * 1000) / header.fmt.sample_rate as u64
    } else {
        0
    };

    Ok(AudioInfo {
        duration_ms,
        sample_rate: header.fmt.sample_rate,
        channels: header.fmt.num_channels.min(u8::MAX as u16) as u8,
        bits_per_sample: header.fmt.bits_per_sample,
        data_size: header.data_size,
    })
}

/// 生成一段静音 PCM WAV
pub fn pcm_silence(
    sample_rate: u32,
    num_channels: u16,
    bits_per_sample: u16,
    millis: u32,
) -> Vec<u8> {
    let bytes_per_frame = num_channels as usize * (bits_per_sample as usize / 8);
    let frames = (sample_rate as usize * millis as usize) / 1000;
    let data_size = frames * bytes_per_frame;

    let mut wav = Vec::with_capacity(44 + data_size);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&((36 + data_size) as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    wav.extend_from_slice(&num_channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * bytes_per_frame as u32).to_le_bytes());
    wav.extend_from_slice(&(bytes_per_frame as u16).to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());
    wav.resize(44 + data_size, 0);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CANONICAL_FORMAT;

    #[test]
    fn test_canonical_wav() {
        let wav = pcm_silence(16000, 1, 16, 1000);
        let info = inspect_wav(&wav).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.duration_ms, 1000);
        assert_eq!(info.data_size, 32000);
        assert!(info.matches(&CANONICAL_FORMAT));
    }

    #[test]
    fn test_stereo_is_not_canonical() {
        let wav = pcm_silence(44100, 2, 16, 500);
        let info = inspect_wav(&wav).unwrap();
        assert_eq!(info.duration_ms, 500);
        assert!(!info.matches(&CANONICAL_FORMAT));
    }

    #[test]
    fn test_skips_list_chunk() {
        let canonical = pcm_silence(16000, 1, 16, 250);
        let mut wav = canonical[..36].to_vec();
        // ffmpeg 会在 fmt 和 data 之间写一个 LIST chunk（奇数长度，带填充字节）
        wav.extend_from_slice(b"LIST");
        wav.extend_from_slice(&5u32.to_le_bytes());
        wav.extend_from_slice(b"INFO!\0");
        wav.extend_from_slice(&canonical[36..]);

        let info = inspect_wav(&wav).unwrap();
        assert_eq!(info.duration_ms, 250);
    }

    #[test]
    fn test_empty_data_chunk_is_valid() {
        let wav = pcm_silence(16000, 1, 16, 0);
        let info = inspect_wav(&wav).unwrap();
        assert_eq!(info.duration_ms, 0);
    }

    #[test]
    fn test_header_prefix_uses_file_length() {
        let wav = pcm_silence(16000, 1, 16, 3000);
        let info = inspect_wav_header(&wav[..64], wav.len() as u64).unwrap();
        assert_eq!(info.duration_ms, 3000);
        assert_eq!(info.data_size, 96000);

        // 文件比头部声明的短
        let info = inspect_wav_header(&wav[..64], 44 + 1600).unwrap();
        assert_eq!(info.duration_ms, 50);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            inspect_wav(b"OggS\0\0\0\0\0\0\0\0\0\0"),
            Err(TranscodeError::InvalidOutput(_))
        ));
        assert!(inspect_wav(b"RIFF").is_err());
    }

    #[test]
    fn test_rejects_missing_data_chunk() {
        let wav = pcm_silence(16000, 1, 16, 100);
        assert!(inspect_wav(&wav[..36]).is_err());
    }

    #[test]
    fn test_rejects_float_samples() {
        let mut wav = pcm_silence(16000, 1, 32, 100);
        wav[20..22].copy_from_slice(&3u16.to_le_bytes());
        assert!(inspect_wav(&wav).is_err());
    }
}
