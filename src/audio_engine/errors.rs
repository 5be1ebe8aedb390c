//! Audio-specific error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading and decoding sample files.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The sample file does not exist.
    #[error("file not found: {}", .path.display())]
    FileNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// Failed to read the sample file.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The file extension maps to no supported decode path.
    #[error("unsupported audio format: {extension:?}")]
    UnsupportedFormat {
        /// Lowercased extension of the rejected file.
        extension: String,
    },

    /// The wave container is structurally invalid.
    #[error("malformed wave container: {0}")]
    MalformedContainer(&'static str),

    /// The wave container holds something other than integer PCM.
    #[error("unsupported wave encoding (format tag {format_tag})")]
    UnsupportedEncoding {
        /// Format tag found in the format chunk.
        format_tag: u16,
    },

    /// The wave container uses a bit depth with no decode path.
    #[error("unsupported wave bit depth ({bits} bits per sample)")]
    UnsupportedBitDepth {
        /// Bits per sample found in the format chunk.
        bits: u16,
    },

    /// Failed to decode the compressed stream.
    #[error("failed to decode compressed audio: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// The compressed stream contains no audio track.
    #[error("compressed stream has no audio track")]
    NoAudioTrack,

    /// The compressed stream is missing sample rate information.
    #[error("compressed stream is missing a sample rate")]
    MissingSampleRate,

    /// The compressed stream is missing channel information.
    #[error("compressed stream is missing channel information")]
    MissingChannels,

    /// The load worker terminated before reporting a result.
    #[error("sample load was abandoned before completion")]
    Aborted,
}

/// Errors that can occur while opening or writing the output stream.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No output device is available on this host.
    #[error("no audio output device available")]
    NoOutputDevice,

    /// Failed to query the device's default configuration.
    #[error("failed to query output device config: {0}")]
    StreamConfig(#[from] cpal::DefaultStreamConfigError),

    /// Failed to build the output stream.
    #[error("failed to build output stream: {0}")]
    StreamBuild(#[from] cpal::BuildStreamError),

    /// Failed to start the output stream.
    #[error("failed to start output stream: {0}")]
    StreamStart(#[from] cpal::PlayStreamError),

    /// Failed to stop the output stream.
    #[error("failed to stop output stream: {0}")]
    StreamStop(#[from] cpal::PauseStreamError),

    /// The device rejected a blocking write.
    #[error("failed to write to output stream: {0}")]
    DeviceWrite(String),
}
