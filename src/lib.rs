//! Wavenote - a voice recorder that keeps a waveform next to every recording
//!
//! The engine turns raw PCM capture chunks into a bounded amplitude
//! waveform, persists it as a JSON sidecar beside the audio file, and keeps a
//! playback progress ratio in step with an audio player.

pub mod audio;
pub mod error;
pub mod models;
pub mod render;
pub mod session;
pub mod settings;
pub mod state;
pub mod sync;
pub mod waveform;

pub use error::{CaptureError, DecodeError, PlayerError, SessionError, StoreError};
pub use models::{PlaybackState, Recording};
pub use session::{FinishedRecording, RecordingSession};
pub use sync::{PlaybackEvent, PlaybackSync};
pub use waveform::{Waveform, WaveformBuffer, WaveformStore, MAX_POINTS};
