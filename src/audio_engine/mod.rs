//! Audio Engine Module
//!
//! This module provides sample loading, mixing, and playback for a pad
//! grid. It is organized into sub-modules, each with a specific
//! responsibility:
//!
//! - [`constants`]: Configuration constants and limits
//! - [`errors`]: Audio-specific error types
//! - [`wav`]: Wave container parsing
//! - [`decoder`]: Audio file loading and decoding
//! - [`registry`]: Decoded sample storage by identifier
//! - [`mixer`]: Mixing and PCM conversion kernel
//! - [`output`]: Output stream management
//!
//! The main [`PadEngine`] struct orchestrates these components behind
//! the public playback interface.

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;

use crate::audio_engine::constants::{GAIN_MAX, GAIN_MIN, OUTPUT_CHANNELS, SAMPLE_RATE_HZ};
use crate::audio_engine::errors::{LoadError, PlaybackError};
use crate::audio_engine::output::{
    CpalOutput, OutputDevice, OutputStream, PlayState, StreamConfig, setup_logger,
};
use crate::audio_engine::registry::SampleRegistry;
use crate::sample::SampleBuffer;

mod constants;
mod decoder;
pub(crate) mod errors;
mod mixer;
pub(crate) mod output;
mod registry;
mod wav;

/// Pending result of a background sample load.
///
/// The worker installs the decoded buffer into the registry before
/// reporting, so a successful result means the sample is triggerable.
pub struct LoadHandle {
    rx: Receiver<Result<(), LoadError>>,
}

impl LoadHandle {
    /// Blocks until the load finishes and returns its result.
    pub fn wait(self) -> Result<(), LoadError> {
        self.rx.recv().unwrap_or(Err(LoadError::Aborted))
    }

    /// Returns the result if the load has finished, without blocking.
    pub fn try_result(&self) -> Option<Result<(), LoadError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LoadError::Aborted)),
        }
    }
}

/// The drum-pad sample engine.
///
/// Owns the sample registry and the output stream. One logical caller
/// drives playback; background load workers only ever touch the
/// registry. The engine starts uninitialized, becomes active on
/// [`initialize`](Self::initialize) (or lazily on the first trigger),
/// and returns to uninitialized on [`release`](Self::release).
pub struct PadEngine {
    device: Box<dyn OutputDevice>,
    stream: Option<Box<dyn OutputStream>>,
    registry: Arc<SampleRegistry>,
}

impl PadEngine {
    /// Creates an engine playing through the default CPAL device.
    pub fn new() -> Self {
        Self::with_device(Box::new(CpalOutput::new()))
    }

    /// Creates an engine playing through the given device.
    pub fn with_device(device: Box<dyn OutputDevice>) -> Self {
        Self {
            device,
            stream: None,
            registry: Arc::new(SampleRegistry::new()),
        }
    }

    /// Opens and starts the output stream.
    ///
    /// Idempotent: calling while already initialized is a no-op. The
    /// stream starts immediately so the first trigger has no cold-start
    /// gap.
    pub fn initialize(&mut self) -> Result<(), PlaybackError> {
        if self.stream.is_some() {
            return Ok(());
        }

        setup_logger();

        let config = StreamConfig {
            sample_rate_hz: SAMPLE_RATE_HZ,
            channels: OUTPUT_CHANNELS,
        };
        let mut stream = self.device.open(&config)?;
        stream.start()?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Loads an audio file into the registry on a background thread.
    ///
    /// Decoding never runs on the trigger path. Triggers issued while
    /// the decode is in flight miss until it completes; a failed load
    /// leaves the registry unchanged. Concurrent loads for the same
    /// identifier race with last-writer-wins.
    pub fn load(&self, id: impl Into<String>, path: impl AsRef<Path>) -> LoadHandle {
        let id = id.into();
        let path = path.as_ref().to_path_buf();
        let registry = Arc::clone(&self.registry);
        let (tx, rx): (Sender<Result<(), LoadError>>, _) = std::sync::mpsc::channel();

        thread::spawn(move || {
            let result = decoder::decode_file(&path, SAMPLE_RATE_HZ);
            let result = match result {
                Ok(buffer) => {
                    log::info!(
                        "Loaded sample {:?} ({} frames, {:.2}s)",
                        id,
                        buffer.len(),
                        buffer.duration_secs()
                    );
                    registry.insert(id, buffer);
                    Ok(())
                }
                Err(err) => {
                    log::error!("Failed to load sample {:?} from {}: {}", id, path.display(), err);
                    Err(err)
                }
            };
            let _ = tx.send(result);
        });

        LoadHandle { rx }
    }

    /// Removes one sample from the registry. No-op for unknown ids.
    pub fn unload(&self, id: &str) {
        self.registry.remove(id);
    }

    /// Removes every sample from the registry.
    pub fn clear_all(&self) {
        self.registry.clear();
    }

    /// Whether a sample is loaded under the identifier.
    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// Plays one sample at the given gain.
    ///
    /// Initializes lazily if needed. A missing sample is non-fatal:
    /// logged and skipped. The stored buffer is never mutated; gain is
    /// applied to a duplicate. The write blocks until the device has
    /// accepted the audio, and write failures propagate without retry.
    pub fn trigger(&mut self, id: &str, gain: f32) -> Result<(), PlaybackError> {
        self.initialize()?;

        let Some(gain) = validate_gain(id, gain) else {
            return Ok(());
        };
        let Some(buffer) = self.registry.get(id) else {
            log::warn!("Sample not found: {:?}", id);
            return Ok(());
        };

        let pcm = if gain == GAIN_MAX {
            mixer::to_pcm(buffer.samples())
        } else {
            mixer::to_pcm(&mixer::apply_gain(buffer.samples(), gain))
        };
        self.write(&pcm)
    }

    /// Plays several samples layered into a single write.
    ///
    /// Missing identifiers are skipped; gains beyond the given slice
    /// default to 1.0. The layered mix is peak-normalized before
    /// conversion so constructive overlap cannot clip. Resolving no
    /// samples at all is a no-op.
    pub fn trigger_many(&mut self, ids: &[&str], gains: &[f32]) -> Result<(), PlaybackError> {
        self.initialize()?;

        let mut resolved: Vec<(SampleBuffer, f32)> = Vec::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            let gain = gains.get(index).copied().unwrap_or(GAIN_MAX);
            let Some(gain) = validate_gain(id, gain) else {
                continue;
            };
            match self.registry.get(id) {
                Some(buffer) => resolved.push((buffer, gain)),
                None => log::warn!("Sample not found, skipping: {:?}", id),
            }
        }

        if resolved.is_empty() {
            return Ok(());
        }

        let mixed = mixer::mix(&resolved);
        self.write(&mixer::to_pcm(&mixed))
    }

    /// Live play state of the output stream.
    ///
    /// Queries the stream handle directly; an uninitialized engine is
    /// not playing.
    pub fn is_playing(&self) -> bool {
        self.stream
            .as_ref()
            .map(|stream| stream.play_state() == PlayState::Playing)
            .unwrap_or(false)
    }

    /// Stops the output stream, clears the registry, and resets to
    /// uninitialized. Safe to call repeatedly and before initialize.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.stop() {
                log::warn!("Failed to stop output stream: {}", err);
            }
        }
        let unloaded = self.registry.len();
        self.registry.clear();
        if unloaded > 0 {
            log::info!("Released engine, unloaded {} samples", unloaded);
        }
    }

    fn write(&mut self, pcm: &[i16]) -> Result<(), PlaybackError> {
        match self.stream.as_mut() {
            Some(stream) => stream.write(pcm),
            // Unreachable after initialize, but never worth a panic.
            None => Ok(()),
        }
    }
}

impl Default for PadEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamps a finite gain into range; rejects non-finite values.
fn validate_gain(id: &str, gain: f32) -> Option<f32> {
    if !gain.is_finite() {
        log::warn!("Ignoring trigger for {:?}: gain is not finite", id);
        return None;
    }
    Some(gain.clamp(GAIN_MIN, GAIN_MAX))
}
