//! Playback progress synchronization
//!
//! Polls the player on a fixed cadence and turns elapsed time into a
//! progress ratio for the waveform marker. The polling task is always
//! cancelled and awaited before a new one starts, so at most one task ever
//! talks to a player handle.

use crate::audio::{Player, PlayerHandle};
use crate::error::PlayerError;
use crate::models::PlaybackState;
use crate::waveform::Waveform;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started { recording: PathBuf },
    Progress(f32),
    Paused,
    Resumed,
    /// Playback reached the end and the sync returned to idle
    Finished,
    Stopped,
}

/// `elapsed / duration` clamped to `[0.0, 1.0]`; zero for an empty duration
pub fn progress_ratio(elapsed: f64, duration: f64) -> f32 {
    if duration.is_nan() || duration <= 0.0 {
        return 0.0;
    }
    let ratio = (elapsed / duration) as f32;
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

struct SyncInner<H> {
    state: PlaybackState,
    progress: f32,
    display: Waveform,
    handle: Option<H>,
}

impl<H: PlayerHandle> SyncInner<H> {
    fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
            handle.release();
        }
    }
}

struct Poller {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Keeps a progress ratio in step with one player at a time
pub struct PlaybackSync<P: Player> {
    player: P,
    poll_interval: Duration,
    inner: Arc<Mutex<SyncInner<P::Handle>>>,
    events: broadcast::Sender<PlaybackEvent>,
    poller: Option<Poller>,
}

impl<P: Player> PlaybackSync<P> {
    pub fn new(player: P) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            player,
            poll_interval: DEFAULT_POLL_INTERVAL,
            inner: Arc::new(Mutex::new(SyncInner {
                state: PlaybackState::Idle,
                progress: 0.0,
                display: Waveform::new(),
                handle: None,
            })),
            events,
            poller: None,
        }
    }

    /// Set the polling cadence
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state.clone()
    }

    pub fn progress(&self) -> f32 {
        self.lock().progress
    }

    /// Waveform shown while this recording plays
    pub fn display_waveform(&self) -> Waveform {
        self.lock().display.clone()
    }

    /// Whether a polling task is still alive
    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .map(|poller| !poller.task.is_finished())
            .unwrap_or(false)
    }

    /// Play `recording`, replacing whatever was playing before
    pub async fn start(&mut self, recording: &Path, waveform: Waveform) -> Result<(), PlayerError> {
        self.cancel_poller().await;
        {
            let mut inner = self.lock();
            inner.release_handle();
            inner.state = PlaybackState::Idle;
            inner.progress = 0.0;
            inner.display = waveform.clone();
        }

        let mut handle = match self.player.load(recording) {
            Ok(handle) => handle,
            Err(e) => {
                self.lock().display.clear();
                return Err(e);
            }
        };
        if let Err(e) = handle.play() {
            handle.release();
            self.lock().display.clear();
            return Err(e);
        }

        let duration = handle.duration();
        {
            let mut inner = self.lock();
            inner.handle = Some(handle);
            inner.state = PlaybackState::Playing {
                recording: recording.to_path_buf(),
                waveform,
            };
        }
        info!("Playing {:?} ({:.2}s)", recording, duration);
        let _ = self.events.send(PlaybackEvent::Started {
            recording: recording.to_path_buf(),
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_poll_loop(
            self.inner.clone(),
            self.events.clone(),
            duration,
            self.poll_interval,
            shutdown_rx,
        ));
        self.poller = Some(Poller { shutdown, task });
        Ok(())
    }

    /// Pause playback; returns false when nothing was playing
    pub fn pause(&self) -> bool {
        let mut inner = self.lock();
        let PlaybackState::Playing { recording, .. } = &inner.state else {
            return false;
        };
        let recording = recording.clone();
        if let Some(handle) = inner.handle.as_mut() {
            handle.pause();
        }
        inner.state = PlaybackState::Paused { recording };
        drop(inner);

        debug!("Playback paused");
        let _ = self.events.send(PlaybackEvent::Paused);
        true
    }

    /// Resume paused playback; returns false when nothing was paused
    ///
    /// If the player refuses to resume, playback drops back to idle.
    pub fn resume(&self) -> Result<bool, PlayerError> {
        let mut inner = self.lock();
        let PlaybackState::Paused { recording } = &inner.state else {
            return Ok(false);
        };
        let recording = recording.clone();

        let resumed = match inner.handle.as_mut() {
            Some(handle) => handle.play(),
            None => Err(PlayerError::Playback("no player loaded".to_string())),
        };
        if let Err(e) = resumed {
            warn!("Failed to resume {:?}: {}", recording, e);
            inner.release_handle();
            inner.state = PlaybackState::Idle;
            inner.progress = 0.0;
            drop(inner);
            let _ = self.events.send(PlaybackEvent::Stopped);
            return Err(e);
        }

        let waveform = inner.display.clone();
        inner.state = PlaybackState::Playing {
            recording,
            waveform,
        };
        drop(inner);

        debug!("Playback resumed");
        let _ = self.events.send(PlaybackEvent::Resumed);
        Ok(true)
    }

    /// Flip between playing and paused
    pub fn toggle_pause(&self) -> Result<(), PlayerError> {
        if self.state().is_paused() {
            self.resume().map(|_| ())
        } else {
            self.pause();
            Ok(())
        }
    }

    /// Stop playback, cancel polling and release the player
    pub async fn stop(&mut self) {
        self.cancel_poller().await;

        let was_active = {
            let mut inner = self.lock();
            let was_active = !inner.state.is_idle();
            inner.release_handle();
            inner.state = PlaybackState::Idle;
            inner.progress = 0.0;
            inner.display.clear();
            was_active
        };

        if was_active {
            debug!("Playback stopped");
            let _ = self.events.send(PlaybackEvent::Stopped);
        }
    }

    async fn cancel_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            let _ = poller.shutdown.send(true);
            if let Err(e) = poller.task.await {
                warn!("Playback poller ended abnormally: {}", e);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncInner<P::Handle>> {
        lock_inner(&self.inner)
    }
}

impl<P: Player> Drop for PlaybackSync<P> {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            let _ = poller.shutdown.send(true);
            poller.task.abort();
        }
        self.lock().release_handle();
    }
}

fn lock_inner<H>(inner: &Mutex<SyncInner<H>>) -> MutexGuard<'_, SyncInner<H>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_poll_loop<H: PlayerHandle>(
    inner: Arc<Mutex<SyncInner<H>>>,
    events: broadcast::Sender<PlaybackEvent>,
    duration: f64,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                if !poll_once(&inner, &events, duration) {
                    break;
                }
            }
        }
    }
    debug!("Playback poller exited");
}

/// One polling step; returns false once polling should end
fn poll_once<H: PlayerHandle>(
    inner: &Mutex<SyncInner<H>>,
    events: &broadcast::Sender<PlaybackEvent>,
    duration: f64,
) -> bool {
    let mut inner = lock_inner(inner);
    match inner.state {
        PlaybackState::Idle => return false,
        PlaybackState::Paused { .. } => return true,
        PlaybackState::Playing { .. } => {}
    }

    let (elapsed, finished) = match inner.handle.as_ref() {
        Some(handle) => (handle.current_time(), handle.is_finished()),
        None => {
            inner.state = PlaybackState::Idle;
            inner.progress = 0.0;
            return false;
        }
    };

    let progress = progress_ratio(elapsed, duration);
    inner.progress = progress;
    let _ = events.send(PlaybackEvent::Progress(progress));

    if finished {
        inner.release_handle();
        inner.state = PlaybackState::Idle;
        inner.progress = 0.0;
        info!("Playback finished");
        let _ = events.send(PlaybackEvent::Finished);
        return false;
    }
    true
}
