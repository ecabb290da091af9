//! Audio capture, decoding and playback
//!
//! This module provides:
//! - Chunk decoding from s16le PCM to normalized amplitude
//! - Capture devices that push chunks into a recording session
//! - WAV file naming and writing via hound
//! - The player interface polled by playback sync
//! - Audible playback through cpal (the `audio-output` feature)

pub mod decoder;

mod capture;
#[cfg(feature = "audio-output")]
mod output;
mod playback;
mod recorder;

pub use capture::{CaptureDevice, ChunkSink, ReaderCapture};
pub(crate) use capture::SinkMessage;
#[cfg(feature = "audio-output")]
pub use output::{read_mono_samples, OutputHandle, OutputPlayer};
pub use playback::{ClockHandle, ClockPlayer, Player, PlayerHandle};
pub use recorder::WavRecorder;
