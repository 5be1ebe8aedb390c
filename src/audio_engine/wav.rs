//! Wave container parsing.
//!
//! Drum one-shots are small, so the whole file is decoded from a byte
//! slice: validate the two container markers, walk the chunk list until
//! the format chunk describes the PCM layout, then convert the data
//! chunk to normalized floats.

use crate::audio_engine::decoder::DecodedAudio;
use crate::audio_engine::errors::LoadError;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WAVE_MAGIC: &[u8; 4] = b"WAVE";
const FMT_CHUNK_ID: &[u8; 4] = b"fmt ";
const DATA_CHUNK_ID: &[u8; 4] = b"data";

/// Integer PCM format tag.
const FORMAT_TAG_PCM: u16 = 1;

struct FormatChunk {
    format_tag: u16,
    channels: u16,
    sample_rate_hz: u32,
    bits_per_sample: u16,
}

/// Decodes a wave container into normalized mono-interleaved floats.
///
/// The chunk list is scanned by 4-byte ID plus 4-byte little-endian
/// size; unknown chunks are skipped and odd-sized chunks are padded to
/// word alignment. 16-bit samples divide by 32768; 8-bit samples are
/// recentered around 128 and divide by 128.
pub(crate) fn decode(bytes: &[u8]) -> Result<DecodedAudio, LoadError> {
    if bytes.len() < 12 {
        return Err(LoadError::MalformedContainer("truncated container header"));
    }
    if &bytes[0..4] != RIFF_MAGIC {
        return Err(LoadError::MalformedContainer("missing RIFF marker"));
    }
    if &bytes[8..12] != WAVE_MAGIC {
        return Err(LoadError::MalformedContainer("missing WAVE marker"));
    }

    let mut pos = 12;
    let mut fmt: Option<FormatChunk> = None;

    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = read_u32_le(bytes, pos + 4) as usize;
        pos += 8;

        let end = match pos.checked_add(size) {
            Some(end) if end <= bytes.len() => end,
            _ => return Err(LoadError::MalformedContainer("chunk extends past end of file")),
        };

        if id == FMT_CHUNK_ID {
            if size < 16 {
                return Err(LoadError::MalformedContainer("format chunk too short"));
            }
            fmt = Some(FormatChunk {
                format_tag: read_u16_le(bytes, pos),
                channels: read_u16_le(bytes, pos + 2),
                sample_rate_hz: read_u32_le(bytes, pos + 4),
                bits_per_sample: read_u16_le(bytes, pos + 14),
            });
        } else if id == DATA_CHUNK_ID {
            let Some(fmt) = fmt else {
                return Err(LoadError::MalformedContainer("data chunk appears before format chunk"));
            };
            if fmt.format_tag != FORMAT_TAG_PCM {
                return Err(LoadError::UnsupportedEncoding {
                    format_tag: fmt.format_tag,
                });
            }

            let data = &bytes[pos..end];
            let samples = match fmt.bits_per_sample {
                16 => decode_pcm16(data),
                8 => decode_pcm8(data),
                bits => return Err(LoadError::UnsupportedBitDepth { bits }),
            };

            return Ok(DecodedAudio {
                samples,
                channels: usize::from(fmt.channels),
                sample_rate_hz: fmt.sample_rate_hz,
            });
        }

        // RIFF chunks are word aligned.
        pos = end + (size & 1);
    }

    Err(LoadError::MalformedContainer("no data chunk before end of stream"))
}

fn decode_pcm16(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32_768.0)
        .collect()
}

fn decode_pcm8(data: &[u8]) -> Vec<f32> {
    data.iter().map(|&byte| (f32::from(byte) - 128.0) / 128.0).collect()
}

fn read_u16_le(bytes: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([bytes[pos], bytes[pos + 1]])
}

fn read_u32_le(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
}
