//! Catalog of recordings on disk
//!
//! Audio files and their waveform sidecars always move together: renaming
//! or deleting a recording applies the same change to its sidecar.

use crate::error::StoreError;
use crate::models::Recording;
use crate::state::Storage;
use crate::waveform::{is_sidecar, Waveform, WaveformStore};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recordings in one directory, with their waveforms cached
pub struct RecordingLibrary {
    dir: PathBuf,
    storage: Arc<dyn Storage>,
    store: Arc<WaveformStore>,
}

impl RecordingLibrary {
    pub fn new(dir: impl Into<PathBuf>, storage: Arc<dyn Storage>, store: Arc<WaveformStore>) -> Self {
        Self {
            dir: dir.into(),
            storage,
            store,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(&self) -> &Arc<WaveformStore> {
        &self.store
    }

    /// Scan the directory, reload every sidecar and return recordings newest first
    pub fn list(&self) -> Result<Vec<Recording>, StoreError> {
        if !self.storage.exists(&self.dir) {
            debug!("Recordings directory {:?} does not exist yet", self.dir);
            self.store.reset_cache();
            return Ok(Vec::new());
        }

        let entries = self
            .storage
            .read_dir(&self.dir)
            .map_err(|source| StoreError::ReadDir {
                path: self.dir.clone(),
                source,
            })?;

        self.store.reset_cache();
        let mut recordings: Vec<Recording> = entries
            .into_iter()
            .filter(|path| is_audio(path))
            .map(|path| {
                self.store.load(&path);
                Recording::from_path(path)
            })
            .collect();

        recordings.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.name.cmp(&b.name)));
        Ok(recordings)
    }

    /// Find a recording by display name; names outside the directory never match
    pub fn find(&self, name: &str) -> Option<Recording> {
        if !is_valid_name(name) {
            debug!("Ignoring lookup of invalid recording name {:?}", name);
            return None;
        }
        let path = self.path_for(name);
        if self.storage.exists(&path) {
            Some(Recording::from_path(path))
        } else {
            None
        }
    }

    /// Cached waveform for a recording
    pub fn waveform(&self, recording: &Recording) -> Waveform {
        self.store.cache_lookup(&recording.path)
    }

    /// Rename a recording and its sidecar
    pub fn rename(&self, recording: &Recording, new_name: &str) -> Result<Recording, StoreError> {
        let new_name = new_name.trim();
        if !is_valid_name(new_name) {
            return Err(StoreError::InvalidName(new_name.to_string()));
        }

        let target = self.path_for(new_name);
        if target == recording.path {
            return Ok(recording.clone());
        }
        if self.storage.exists(&target) {
            return Err(StoreError::AlreadyExists(target));
        }

        self.storage
            .move_file(&recording.path, &target)
            .map_err(|source| StoreError::Move {
                from: recording.path.clone(),
                to: target.clone(),
                source,
            })?;
        self.store.rename(&recording.path, &target)?;

        info!("Renamed {:?} to {:?}", recording.name, new_name);
        Ok(Recording::from_path(target))
    }

    /// Delete a recording and its sidecar
    pub fn delete(&self, recording: &Recording) -> Result<(), StoreError> {
        if self.storage.exists(&recording.path) {
            self.storage
                .unlink(&recording.path)
                .map_err(|source| StoreError::Delete {
                    path: recording.path.clone(),
                    source,
                })?;
        }
        self.store.delete(&recording.path)?;

        info!("Deleted {:?}", recording.name);
        Ok(())
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.wav", name))
    }
}

/// A bare file stem that stays inside the recordings directory
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.starts_with('.')
}

fn is_audio(path: &Path) -> bool {
    !is_sidecar(path)
        && path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase() == "wav")
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FsStorage;
    use crate::waveform::sidecar_path;

    fn library(dir: &Path) -> RecordingLibrary {
        let storage: Arc<dyn Storage> = Arc::new(FsStorage::new());
        let store = Arc::new(WaveformStore::new(storage.clone()));
        RecordingLibrary::new(dir, storage, store)
    }

    fn add_recording(dir: &Path, name: &str, waveform: Option<&str>) -> PathBuf {
        let path = dir.join(format!("{}.wav", name));
        std::fs::write(&path, b"RIFF").unwrap();
        if let Some(contents) = waveform {
            std::fs::write(sidecar_path(&path), contents).unwrap();
        }
        path
    }

    #[test]
    fn test_list_rebuilds_cache_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let old = add_recording(dir.path(), "recording_20240101_080000_aaaaaaaa", Some("[0.1,0.2]"));
        let new = add_recording(dir.path(), "recording_20250101_080000_bbbbbbbb", Some("garbage"));
        let renamed = add_recording(dir.path(), "interview", None);
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let library = library(dir.path());
        let recordings = library.list().unwrap();

        let paths: Vec<&Path> = recordings.iter().map(|r| r.path.as_path()).collect();
        assert_eq!(paths, vec![new.as_path(), old.as_path(), renamed.as_path()]);
        assert_eq!(library.store().cached_len(), 3);
        assert_eq!(library.waveform(&recordings[1]), vec![0.1, 0.2]);
        assert!(library.waveform(&recordings[0]).is_empty());
        assert!(library.waveform(&recordings[2]).is_empty());
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let library = library(&dir.path().join("not-yet"));
        assert!(library.list().unwrap().is_empty());
    }

    #[test]
    fn test_rename_moves_audio_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = add_recording(dir.path(), "recording_20250101_080000_aaaaaaaa", Some("[0.7]"));
        let library = library(dir.path());
        library.list().unwrap();
        let recording = Recording::from_path(&path);

        let renamed = library.rename(&recording, "standup").unwrap();

        assert_eq!(renamed.name, "standup");
        assert!(renamed.path.exists());
        assert!(!path.exists());
        assert!(sidecar_path(&renamed.path).exists());
        assert!(!sidecar_path(&path).exists());
        assert_eq!(library.waveform(&renamed), vec![0.7]);
        assert!(library.waveform(&recording).is_empty());
    }

    #[test]
    fn test_rename_rejects_bad_or_taken_names() {
        let dir = tempfile::tempdir().unwrap();
        let a = add_recording(dir.path(), "a", None);
        add_recording(dir.path(), "b", None);
        let library = library(dir.path());
        let recording = Recording::from_path(&a);

        assert!(matches!(
            library.rename(&recording, "b"),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            library.rename(&recording, "../escape"),
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(
            library.rename(&recording, "  "),
            Err(StoreError::InvalidName(_))
        ));
        assert!(a.exists());
    }

    #[test]
    fn test_find_stays_inside_directory() {
        let root = tempfile::tempdir().unwrap();
        let recordings = root.path().join("recordings");
        std::fs::create_dir(&recordings).unwrap();
        let outside = add_recording(root.path(), "precious", None);
        add_recording(&recordings, "take", None);
        let library = library(&recordings);

        assert!(library.find("take").is_some());
        assert!(library.find("../precious").is_none());
        assert!(library.find(&outside.with_extension("").to_string_lossy()).is_none());
        assert!(library.find("").is_none());
        assert!(library.find(".hidden").is_none());
        assert!(outside.exists());
    }

    #[test]
    fn test_delete_removes_both_files_and_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let path = add_recording(dir.path(), "take", Some("[0.3]"));
        let library = library(dir.path());
        library.list().unwrap();
        let recording = Recording::from_path(&path);

        library.delete(&recording).unwrap();
        assert!(!path.exists());
        assert!(!sidecar_path(&path).exists());
        assert!(library.waveform(&recording).is_empty());

        library.delete(&recording).unwrap();
        assert!(library.list().unwrap().is_empty());
    }

    #[test]
    fn test_find_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = add_recording(dir.path(), "memo", None);
        let library = library(dir.path());

        assert_eq!(library.find("memo").map(|r| r.path), Some(path));
        assert!(library.find("other").is_none());
    }
}
