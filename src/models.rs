use crate::waveform::Waveform;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Timestamp layout embedded in generated recording names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A stored recording, identified by its audio path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub path: PathBuf,
    pub name: String,
    /// Creation time, when the file name still carries its timestamp
    pub created: Option<DateTime<Utc>>,
}

impl Recording {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let created = parse_created(&name);
        Self {
            path,
            name,
            created,
        }
    }
}

/// Parse `recording_YYYYMMDD_HHMMSS[_suffix]` back into a timestamp
fn parse_created(name: &str) -> Option<DateTime<Utc>> {
    let rest = name.strip_prefix("recording_")?;
    let stamp = rest.get(..15)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Where playback currently stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing {
        recording: PathBuf,
        waveform: Waveform,
    },
    Paused {
        recording: PathBuf,
    },
}

impl PlaybackState {
    /// The recording being played or paused
    pub fn recording(&self) -> Option<&Path> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Playing { recording, .. } => Some(recording),
            PlaybackState::Paused { recording } => Some(recording),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PlaybackState::Idle)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused { .. })
    }
}
