//! Audio file loading and decoding.
//!
//! Turns an on-disk audio file into a canonical [`SampleBuffer`]: format
//! dispatch by extension, wave or compressed decode, then downmix and
//! resample to the engine's fixed mono rate.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use symphonia::core::{
    audio::SampleBuffer as SymphoniaSampleBuffer, codecs::CODEC_TYPE_NULL,
    codecs::DecoderOptions, errors::Error as SymphoniaError, formats::FormatOptions,
    io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use crate::audio_engine::errors::LoadError;
use crate::audio_engine::wav;
use crate::sample::SampleBuffer;

/// Interleaved decode output before canonicalization.
pub(crate) struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate_hz: u32,
}

/// Supported input formats, each bound to one decode path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AudioFormat {
    Wave,
    Mp3,
    Ogg,
    Flac,
    Aac,
}

impl AudioFormat {
    /// Resolves the decode path from the file extension.
    fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "wav" | "wave" => Ok(Self::Wave),
            "mp3" => Ok(Self::Mp3),
            "ogg" | "oga" => Ok(Self::Ogg),
            "flac" => Ok(Self::Flac),
            "m4a" | "mp4" | "aac" => Ok(Self::Aac),
            _ => Err(LoadError::UnsupportedFormat { extension }),
        }
    }

    /// Extension hint handed to the container probe.
    fn extension_hint(self) -> &'static str {
        match self {
            Self::Wave => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
            Self::Aac => "m4a",
        }
    }
}

/// Decodes an audio file into a sample buffer at the target rate.
///
/// Dispatches to the wave parser or the compressed decode loop, then
/// downmixes to mono and resamples if the source rate differs. Any
/// failure leaves no partial state behind; the caller decides whether
/// to install the result.
pub(crate) fn decode_file(path: &Path, target_rate_hz: u32) -> Result<SampleBuffer, LoadError> {
    let format = AudioFormat::from_path(path)?;

    let decoded = match format {
        AudioFormat::Wave => {
            let bytes = read_file(path)?;
            wav::decode(&bytes)?
        }
        _ => decode_compressed(path, format.extension_hint())?,
    };

    let mono = downmix_to_mono(decoded.samples, decoded.channels);
    let samples = resample_linear(&mono, decoded.sample_rate_hz, target_rate_hz);

    Ok(SampleBuffer::new(samples, target_rate_hz))
}

/// Decodes a compressed stream by feeding packets through the first
/// audio track's decoder until the input side signals end-of-stream.
fn decode_compressed(path: &Path, extension_hint: &str) -> Result<DecodedAudio, LoadError> {
    let file = open_file(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(extension_hint);

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(LoadError::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate_hz = track
        .codec_params
        .sample_rate
        .ok_or(LoadError::MissingSampleRate)?;
    let channels = track
        .codec_params
        .channels
        .ok_or(LoadError::MissingChannels)?
        .count();

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => {
                break;
            }
            Err(err) => return Err(LoadError::Decode(err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = decoder.decode(&packet)?;
        let spec = *audio_buf.spec();
        let duration = audio_buf.capacity() as u64;

        let mut pcm = SymphoniaSampleBuffer::<i16>::new(duration, spec);
        pcm.copy_interleaved_ref(audio_buf);
        samples.extend(pcm.samples().iter().map(|&s| f32::from(s) / 32_768.0));
    }

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate_hz,
    })
}

/// Collapses interleaved frames to mono by averaging each frame.
fn downmix_to_mono(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples,
        n => samples
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect(),
    }
}

/// Resamples mono audio by linear interpolation.
///
/// Sufficient for one-shot drum hits; anything fancier would buy
/// nothing audible at this buffer scale.
fn resample_linear(samples: &[f32], source_rate_hz: u32, target_rate_hz: u32) -> Vec<f32> {
    if source_rate_hz == target_rate_hz || samples.is_empty() || source_rate_hz == 0 {
        return samples.to_vec();
    }

    let ratio = f64::from(target_rate_hz) / f64::from(source_rate_hz);
    let target_len = (samples.len() as f64 * ratio).ceil() as usize;

    (0..target_len)
        .map(|i| {
            let source_pos = i as f64 / ratio;
            let index = source_pos.floor() as usize;
            let frac = source_pos.fract() as f32;

            let s0 = samples.get(index).copied().unwrap_or(0.0);
            let s1 = samples.get(index + 1).copied().unwrap_or(s0);
            s0 + (s1 - s0) * frac
        })
        .collect()
}

fn open_file(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            LoadError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io(err)
        }
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            LoadError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io(err)
        }
    })
}
