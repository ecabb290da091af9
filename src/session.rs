//! Recording session: capture to live waveform to persisted sidecar
//!
//! While recording, a worker task owns the waveform buffer and drains the
//! chunk queue fed by the capture device. Stopping finalizes the audio into
//! the recordings directory first and only then writes the waveform, so a
//! failed sidecar never costs the audio.

use crate::audio::{decoder, CaptureDevice, ChunkSink, SinkMessage, WavRecorder};
use crate::error::{SessionError, StoreError};
use crate::models::Recording;
use crate::state::Storage;
use crate::waveform::{Waveform, WaveformBuffer, WaveformStore, MAX_POINTS};
use log::{error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Result of stopping a recording
#[derive(Debug)]
pub struct FinishedRecording {
    pub recording: Recording,
    pub waveform: Waveform,
    /// Set when the audio was kept but its sidecar could not be written
    pub waveform_error: Option<StoreError>,
}

struct ActiveCapture {
    sink: ChunkSink,
    worker: JoinHandle<WaveformBuffer>,
}

/// Drives one capture device at a time
pub struct RecordingSession<C: CaptureDevice> {
    capture: Arc<Mutex<C>>,
    store: Arc<WaveformStore>,
    storage: Arc<dyn Storage>,
    recorder: WavRecorder,
    max_points: usize,
    live: Arc<watch::Sender<Waveform>>,
    active: Option<ActiveCapture>,
}

impl<C: CaptureDevice + 'static> RecordingSession<C> {
    pub fn new(
        capture: C,
        store: Arc<WaveformStore>,
        storage: Arc<dyn Storage>,
        recorder: WavRecorder,
    ) -> Self {
        let (live, _) = watch::channel(Waveform::new());
        Self {
            capture: Arc::new(Mutex::new(capture)),
            store,
            storage,
            recorder,
            max_points: MAX_POINTS,
            live: Arc::new(live),
            active: None,
        }
    }

    /// Bound the live waveform to a different number of points
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Live waveform, updated after every decoded chunk
    pub fn live_waveform(&self) -> watch::Receiver<Waveform> {
        self.live.subscribe()
    }

    /// Lock the capture device; do not hold the guard across `stop`
    pub fn capture(&self) -> MutexGuard<'_, C> {
        self.capture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start capturing. Must be called within a tokio runtime.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyRecording);
        }

        let (sink, receiver) = ChunkSink::channel();
        self.live.send_replace(Waveform::new());
        let buffer = WaveformBuffer::with_capacity(self.max_points);
        let worker = tokio::spawn(run_waveform_worker(receiver, buffer, self.live.clone()));

        if let Err(e) = self.capture().start(sink.clone()) {
            worker.abort();
            return Err(e.into());
        }

        info!("Recording started");
        self.active = Some(ActiveCapture { sink, worker });
        Ok(())
    }

    /// Stop capturing, store the audio and persist its waveform
    pub async fn stop(&mut self) -> Result<FinishedRecording, SessionError> {
        let active = self.active.take().ok_or(SessionError::NotRecording)?;

        // Joining the device can wait on a blocking read
        let capture = self.capture.clone();
        let captured = tokio::task::spawn_blocking(move || {
            capture
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .stop()
        })
        .await
        .map_err(|e| SessionError::Worker(e.to_string()));

        // Every chunk is queued once the device has stopped
        active.sink.finish();
        let buffer = active
            .worker
            .await
            .map_err(|e| SessionError::Worker(e.to_string()))?;
        let temp_path = captured??;
        let waveform = buffer.snapshot();

        let storage = self.storage.clone();
        let store = self.store.clone();
        let target = self.recorder.generate_filename();
        let snapshot = waveform.clone();

        let (path, saved) = tokio::task::spawn_blocking(move || {
            storage
                .move_file(&temp_path, &target)
                .map_err(|source| StoreError::Move {
                    from: temp_path.clone(),
                    to: target.clone(),
                    source,
                })?;
            let saved = store.save(&target, &snapshot);
            Ok::<_, StoreError>((target, saved))
        })
        .await
        .map_err(|e| SessionError::Worker(e.to_string()))?
        .map_err(SessionError::Audio)?;

        let waveform_error = match saved {
            Ok(()) => None,
            Err(e) => {
                error!("Recording kept but waveform was not saved: {}", e);
                Some(e)
            }
        };

        info!(
            "Recording saved to {:?} ({} waveform points)",
            path,
            waveform.len()
        );
        Ok(FinishedRecording {
            recording: Recording::from_path(path),
            waveform,
            waveform_error,
        })
    }
}

/// Owns the live buffer for the duration of one recording
async fn run_waveform_worker(
    mut receiver: mpsc::UnboundedReceiver<SinkMessage>,
    mut buffer: WaveformBuffer,
    live: Arc<watch::Sender<Waveform>>,
) -> WaveformBuffer {
    while let Some(message) = receiver.recv().await {
        match message {
            SinkMessage::Chunk(bytes) => match decoder::decode(&bytes) {
                Ok(amplitude) => {
                    buffer.append(amplitude);
                    live.send_replace(buffer.snapshot());
                }
                Err(e) => warn!("Dropping chunk: {}", e),
            },
            SinkMessage::Finish => break,
        }
    }
    buffer
}
