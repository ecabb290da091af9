//! Waveform buffering and sidecar persistence
//!
//! This module provides:
//! - A bounded buffer for the live waveform during capture
//! - A store that keeps each recording's waveform in a JSON sidecar next
//!   to the audio file, fronted by an in-memory cache

mod buffer;
mod store;

use std::path::{Path, PathBuf};

pub use buffer::WaveformBuffer;
pub use store::WaveformStore;

/// Ordered amplitude samples in `[0.0, 1.0]`, oldest first
pub type Waveform = Vec<f32>;

/// Horizontal resolution of the rendered waveform
pub const MAX_POINTS: usize = 100;

/// Suffix replacing the audio extension in sidecar file names
pub const SIDECAR_SUFFIX: &str = "_wave.json";

/// Sidecar location for an audio file: same directory, stem + `_wave.json`
///
/// `recordings/recording_1.wav` maps to `recordings/recording_1_wave.json`.
pub fn sidecar_path(audio: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    audio.with_file_name(format!("{}{}", stem, SIDECAR_SUFFIX))
}

/// Whether a path names a waveform sidecar rather than audio
pub fn is_sidecar(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(SIDECAR_SUFFIX))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path_replaces_extension() {
        assert_eq!(
            sidecar_path(Path::new("/data/recording_20250101_120000_abcd1234.wav")),
            PathBuf::from("/data/recording_20250101_120000_abcd1234_wave.json")
        );
    }

    #[test]
    fn test_sidecar_path_only_touches_the_extension() {
        assert_eq!(
            sidecar_path(Path::new("notes.wav.backup/take.wav")),
            PathBuf::from("notes.wav.backup/take_wave.json")
        );
    }

    #[test]
    fn test_is_sidecar() {
        assert!(is_sidecar(Path::new("a/take_wave.json")));
        assert!(!is_sidecar(Path::new("a/take.wav")));
    }
}
