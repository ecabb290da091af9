//! Error types shared across the engine

use std::path::PathBuf;

/// Failure to turn a capture chunk into an amplitude sample
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed chunk: {len} bytes is not a whole number of 16-bit samples")]
    MalformedChunk { len: usize },

    #[error("invalid base64 chunk: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// I/O failure while touching a waveform sidecar or a recording file
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {from:?} to {to:?}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to delete {path:?}: {source}")]
    Delete {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize waveform: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("a recording named {0:?} already exists")]
    AlreadyExists(PathBuf),

    #[error("invalid recording name: {0:?}")]
    InvalidName(String),
}

/// Sidecar contents that could not be parsed as a waveform.
///
/// Never leaves `WaveformStore::load`; the caller sees an empty waveform.
#[derive(Debug, thiserror::Error)]
#[error("malformed waveform sidecar: {0}")]
pub struct SidecarParseError(#[from] serde_json::Error);

/// Failure to load or drive the audio player
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("failed to load {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("playback failed: {0}")]
    Playback(String),
}

/// Failure in a capture device
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture already running")]
    AlreadyRunning,

    #[error("capture not running")]
    NotRunning,

    #[error("capture source already consumed")]
    SourceConsumed,

    #[error("capture I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write captured audio: {0}")]
    Wav(#[from] hound::Error),

    #[error("capture thread panicked")]
    ThreadPanicked,
}

/// Failure in a recording session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The audio itself could not be moved into the recordings directory
    #[error("failed to store recorded audio: {0}")]
    Audio(StoreError),

    #[error("waveform worker failed: {0}")]
    Worker(String),
}
