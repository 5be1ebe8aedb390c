//! Output stream management.
//!
//! This module defines the device seam the engine plays through:
//! - [`OutputDevice`]/[`OutputStream`] traits over an open/start/write/
//!   stop lifecycle with a blocking, ordered write
//! - [`CpalOutput`], the production implementation backed by a CPAL
//!   stream draining an SPSC ring from the real-time callback
//! - logger setup for audio operations

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SupportedBufferSize};
use env_logger::{Builder, Env};
use rtrb::{Producer, RingBuffer};
use std::thread;

use crate::audio_engine::constants::{
    FALLBACK_MIN_BUFFER_FRAMES, OUTPUT_BUFFER_MULTIPLIER, WRITE_POLL_INTERVAL,
};
use crate::audio_engine::errors::PlaybackError;

/// Output stream configuration requested by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Sample rate in Hz.
    pub sample_rate_hz: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

/// Live play state of an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// The stream is not consuming data.
    Stopped,
    /// The stream has been started and consumes data.
    Playing,
}

/// A source of output streams.
///
/// The engine owns exactly one device and opens one stream per
/// initialize/release cycle. Tests substitute their own implementation.
pub trait OutputDevice {
    /// Opens a stream for the given configuration.
    fn open(&self, config: &StreamConfig) -> Result<Box<dyn OutputStream>, PlaybackError>;
}

/// An open output stream.
pub trait OutputStream {
    /// Starts consuming data.
    fn start(&mut self) -> Result<(), PlaybackError>;

    /// Writes PCM data, blocking until the device has accepted all of it.
    fn write(&mut self, pcm: &[i16]) -> Result<(), PlaybackError>;

    /// Stops consuming data.
    fn stop(&mut self) -> Result<(), PlaybackError>;

    /// Queries the stream's play state.
    fn play_state(&self) -> PlayState;
}

/// Setup and configure the logger for audio operations
pub(crate) fn setup_logger() {
    // Default to `info`; users can override via `RUST_LOG`, e.g.
    // `RUST_LOG=debug` when troubleshooting.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}

/// The default audio output device, backed by CPAL.
#[derive(Debug, Default)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl OutputDevice for CpalOutput {
    /// Opens a CPAL output stream.
    ///
    /// The stream buffer is sized at twice the platform minimum to
    /// absorb scheduling jitter, and the callback drains a ring buffer
    /// holding two stream buffers' worth of PCM. An empty ring plays
    /// silence.
    fn open(&self, config: &StreamConfig) -> Result<Box<dyn OutputStream>, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoOutputDevice)?;

        let default_config = device.default_output_config()?;
        let min_frames = match default_config.buffer_size() {
            SupportedBufferSize::Range { min, .. } if *min > 0 => *min,
            _ => FALLBACK_MIN_BUFFER_FRAMES,
        };
        let buffer_frames = min_frames * OUTPUT_BUFFER_MULTIPLIER;

        log::info!(
            "Opening output stream ({} ch@{} Hz, {} frame buffer)",
            config.channels,
            config.sample_rate_hz,
            buffer_frames
        );

        let ring_capacity = buffer_frames as usize * usize::from(config.channels) * 2;
        let (producer, mut consumer) = RingBuffer::<i16>::new(ring_capacity);

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate_hz,
            buffer_size: BufferSize::Fixed(buffer_frames),
        };

        // Drive the device in its native format; the ring always holds
        // signed 16-bit PCM.
        let stream = match default_config.sample_format() {
            SampleFormat::I16 => device.build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    for slot in data.iter_mut() {
                        *slot = consumer.pop().unwrap_or(0);
                    }
                },
                |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )?,
            _ => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for slot in data.iter_mut() {
                        *slot = consumer
                            .pop()
                            .map(|sample| f32::from(sample) / 32_768.0)
                            .unwrap_or(0.0);
                    }
                },
                |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )?,
        };

        Ok(Box::new(CpalStream {
            stream,
            producer,
            state: PlayState::Stopped,
        }))
    }
}

/// A CPAL-backed output stream.
///
/// CPAL exposes no play-state query, so the handle tracks the state it
/// drove the device into.
struct CpalStream {
    stream: cpal::Stream,
    producer: Producer<i16>,
    state: PlayState,
}

impl OutputStream for CpalStream {
    fn start(&mut self) -> Result<(), PlaybackError> {
        self.stream.play()?;
        self.state = PlayState::Playing;
        Ok(())
    }

    /// Blocking ring-buffer write.
    ///
    /// Sleeps briefly whenever the ring is full, so backpressure is the
    /// write itself; there is no timeout. Fails if the callback side of
    /// the ring is gone.
    fn write(&mut self, pcm: &[i16]) -> Result<(), PlaybackError> {
        let mut remaining = pcm;
        while !remaining.is_empty() {
            if self.producer.is_abandoned() {
                return Err(PlaybackError::DeviceWrite(
                    "output stream is closed".to_string(),
                ));
            }

            let writable = self.producer.slots().min(remaining.len());
            if writable == 0 {
                thread::sleep(WRITE_POLL_INTERVAL);
                continue;
            }

            if let Ok(chunk) = self.producer.write_chunk_uninit(writable) {
                let written = chunk.fill_from_iter(remaining.iter().copied());
                remaining = &remaining[written..];
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        self.stream.pause()?;
        self.state = PlayState::Stopped;
        Ok(())
    }

    fn play_state(&self) -> PlayState {
        self.state
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory output device capturing everything the engine writes.

    use std::sync::{Arc, Mutex};

    use super::{OutputDevice, OutputStream, PlayState, StreamConfig};
    use crate::audio_engine::errors::PlaybackError;

    pub(crate) struct MockState {
        pub writes: Vec<Vec<i16>>,
        pub play_state: PlayState,
        pub opens: usize,
        pub starts: usize,
        pub stops: usize,
        pub fail_writes: bool,
        pub opened_config: Option<StreamConfig>,
    }

    impl Default for MockState {
        fn default() -> Self {
            Self {
                writes: Vec::new(),
                play_state: PlayState::Stopped,
                opens: 0,
                starts: 0,
                stops: 0,
                fail_writes: false,
                opened_config: None,
            }
        }
    }

    #[derive(Default)]
    pub(crate) struct MockDevice {
        state: Arc<Mutex<MockState>>,
    }

    impl MockDevice {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn state(&self) -> Arc<Mutex<MockState>> {
            Arc::clone(&self.state)
        }
    }

    impl OutputDevice for MockDevice {
        fn open(&self, config: &StreamConfig) -> Result<Box<dyn OutputStream>, PlaybackError> {
            let mut state = self.state.lock().unwrap();
            state.opens += 1;
            state.opened_config = Some(*config);
            Ok(Box::new(MockStream {
                state: Arc::clone(&self.state),
            }))
        }
    }

    struct MockStream {
        state: Arc<Mutex<MockState>>,
    }

    impl OutputStream for MockStream {
        fn start(&mut self) -> Result<(), PlaybackError> {
            let mut state = self.state.lock().unwrap();
            state.starts += 1;
            state.play_state = PlayState::Playing;
            Ok(())
        }

        fn write(&mut self, pcm: &[i16]) -> Result<(), PlaybackError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(PlaybackError::DeviceWrite("mock write failure".to_string()));
            }
            state.writes.push(pcm.to_vec());
            Ok(())
        }

        fn stop(&mut self) -> Result<(), PlaybackError> {
            let mut state = self.state.lock().unwrap();
            state.stops += 1;
            state.play_state = PlayState::Stopped;
            Ok(())
        }

        fn play_state(&self) -> PlayState {
            self.state.lock().unwrap().play_state
        }
    }
}
