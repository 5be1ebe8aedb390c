mod audio_engine;
mod sample;

pub use audio_engine::errors::{LoadError, PlaybackError};
pub use audio_engine::output::{CpalOutput, OutputDevice, OutputStream, PlayState, StreamConfig};
pub use audio_engine::{LoadHandle, PadEngine};
pub use sample::SampleBuffer;
