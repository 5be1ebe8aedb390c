//! Audio engine configuration constants and limits.

use std::time::Duration;

/// Fixed output sample rate in Hz.
pub const SAMPLE_RATE_HZ: u32 = 44_100;

/// Fixed number of output channels (mono).
pub const OUTPUT_CHANNELS: u16 = 1;

/// Output buffer sizing multiplier over the platform minimum.
///
/// Absorbs scheduling jitter without adding more latency than necessary.
pub const OUTPUT_BUFFER_MULTIPLIER: u32 = 2;

/// Buffer size in frames used when the platform reports no minimum.
pub const FALLBACK_MIN_BUFFER_FRAMES: u32 = 256;

/// Minimum trigger gain (silence).
pub const GAIN_MIN: f32 = 0.0;

/// Maximum trigger gain (100%).
pub const GAIN_MAX: f32 = 1.0;

/// How long a blocking write sleeps while the device ring is full.
pub const WRITE_POLL_INTERVAL: Duration = Duration::from_micros(500);
