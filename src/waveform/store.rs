//! Sidecar persistence for recording waveforms
//!
//! Every recording `name.wav` may have a `name_wave.json` next to it holding
//! a plain JSON array of amplitudes. The store keeps an in-memory cache keyed
//! by recording path so the player can show a waveform without touching disk.
//!
//! Sidecar writes are not atomic. A crash mid-write leaves a truncated file,
//! which `load` then reports as an empty waveform like any other malformed
//! sidecar, so the loss is silent.

use super::{sidecar_path, Waveform};
use crate::error::{SidecarParseError, StoreError};
use crate::state::Storage;
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Waveform sidecar store with a path-keyed cache
///
/// Cache mutations are serialized through a write lock; lookups share a
/// read lock.
pub struct WaveformStore {
    storage: Arc<dyn Storage>,
    cache: RwLock<HashMap<PathBuf, Waveform>>,
}

impl WaveformStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Write the sidecar for `recording` and cache the waveform
    pub fn save(&self, recording: &Path, waveform: &[f32]) -> Result<(), StoreError> {
        let path = sidecar_path(recording);
        let contents = serde_json::to_string(waveform)?;

        self.storage
            .write_file(&path, &contents)
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        debug!("Saved {} waveform points to {:?}", waveform.len(), path);
        self.write_cache()
            .insert(recording.to_path_buf(), waveform.to_vec());
        Ok(())
    }

    /// Read the sidecar for `recording`, or an empty waveform if there is
    /// none or it cannot be parsed
    pub fn load(&self, recording: &Path) -> Waveform {
        let waveform = self.read_sidecar(recording);
        self.write_cache()
            .insert(recording.to_path_buf(), waveform.clone());
        waveform
    }

    /// Move the sidecar along with a renamed recording
    pub fn rename(&self, old: &Path, new: &Path) -> Result<(), StoreError> {
        let from = sidecar_path(old);
        if !self.storage.exists(&from) {
            return Ok(());
        }

        let to = sidecar_path(new);
        self.storage
            .move_file(&from, &to)
            .map_err(|source| StoreError::Move {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;

        let mut cache = self.write_cache();
        let waveform = cache.remove(old).unwrap_or_default();
        cache.insert(new.to_path_buf(), waveform);
        debug!("Moved waveform sidecar {:?} -> {:?}", from, to);
        Ok(())
    }

    /// Remove the sidecar and cache entry for `recording`
    pub fn delete(&self, recording: &Path) -> Result<(), StoreError> {
        let path = sidecar_path(recording);
        if self.storage.exists(&path) {
            self.storage
                .unlink(&path)
                .map_err(|source| StoreError::Delete {
                    path: path.clone(),
                    source,
                })?;
            debug!("Deleted waveform sidecar {:?}", path);
        }

        self.write_cache().remove(recording);
        Ok(())
    }

    /// Cached waveform for `recording`, empty if nothing is cached
    pub fn cache_lookup(&self, recording: &Path) -> Waveform {
        self.read_cache()
            .get(recording)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of recordings with a cache entry
    pub fn cached_len(&self) -> usize {
        self.read_cache().len()
    }

    /// Drop every cache entry ahead of a rescan
    pub fn reset_cache(&self) {
        self.write_cache().clear();
    }

    fn read_sidecar(&self, recording: &Path) -> Waveform {
        let path = sidecar_path(recording);
        if !self.storage.exists(&path) {
            debug!("No waveform sidecar for {:?}", recording);
            return Waveform::new();
        }

        let contents = match self.storage.read_file(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read waveform sidecar {:?}: {}", path, e);
                return Waveform::new();
            }
        };

        match parse_sidecar(&contents) {
            Ok(waveform) => waveform,
            Err(e) => {
                warn!("Ignoring waveform sidecar {:?}: {}", path, e);
                Waveform::new()
            }
        }
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, Waveform>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, Waveform>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_sidecar(contents: &str) -> Result<Waveform, SidecarParseError> {
    Ok(serde_json::from_str(contents)?)
}
