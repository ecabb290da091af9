//! Audio player interface and a silent, clock-driven WAV transport
//!
//! The engine only needs a player that can report elapsed time and total
//! duration. `ClockPlayer` makes no sound: it serves headless runs and tests,
//! while `OutputPlayer` drives the sound card.

use super::recorder::WavRecorder;
use crate::error::PlayerError;
use log::debug;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens audio files for playback
pub trait Player: Send + Sync {
    type Handle: PlayerHandle;

    fn load(&self, path: &Path) -> Result<Self::Handle, PlayerError>;
}

/// One loaded audio file
pub trait PlayerHandle: Send + 'static {
    fn play(&mut self) -> Result<(), PlayerError>;

    fn pause(&mut self);

    fn stop(&mut self);

    /// Release the underlying resources; the handle is unusable afterwards
    fn release(&mut self);

    /// Elapsed playback time in seconds
    fn current_time(&self) -> f64;

    /// Total duration in seconds
    fn duration(&self) -> f64;

    /// Whether playback ran to the end
    fn is_finished(&self) -> bool;
}

/// Player for WAV files that tracks position against the monotonic clock
#[derive(Clone, Copy, Debug, Default)]
pub struct ClockPlayer;

impl ClockPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl Player for ClockPlayer {
    type Handle = ClockHandle;

    fn load(&self, path: &Path) -> Result<ClockHandle, PlayerError> {
        let duration = WavRecorder::duration_of(path).map_err(|e| PlayerError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded {:?} ({:.2}s)", path, duration);
        Ok(ClockHandle::new(duration))
    }
}

/// Transport state for one file loaded by `ClockPlayer`
#[derive(Debug)]
pub struct ClockHandle {
    duration: f64,
    /// Time accumulated before the current run
    elapsed: Duration,
    /// Start of the current run, if playing
    started_at: Option<Instant>,
    released: bool,
}

impl ClockHandle {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            elapsed: Duration::ZERO,
            started_at: None,
            released: false,
        }
    }

    fn position(&self) -> f64 {
        let running = self
            .started_at
            .map(|start| start.elapsed())
            .unwrap_or_default();
        ((self.elapsed + running).as_secs_f64()).min(self.duration)
    }
}

impl PlayerHandle for ClockHandle {
    fn play(&mut self) -> Result<(), PlayerError> {
        if self.released {
            return Err(PlayerError::Playback("player already released".to_string()));
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(start) = self.started_at.take() {
            self.elapsed += start.elapsed();
        }
    }

    fn stop(&mut self) {
        self.started_at = None;
        self.elapsed = Duration::ZERO;
    }

    fn release(&mut self) {
        self.stop();
        self.released = true;
    }

    fn current_time(&self) -> f64 {
        if self.released {
            return 0.0;
        }
        self.position()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_finished(&self) -> bool {
        !self.released && self.position() >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_load_reads_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let recorder = WavRecorder::new(dir.path()).with_sample_rate(1000);
        let mut writer = recorder.create_writer(&path).unwrap();
        for _ in 0..2500 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let handle = ClockPlayer::new().load(&path).unwrap();
        assert_eq!(handle.duration(), 2.5);
        assert_eq!(handle.current_time(), 0.0);
        assert!(!handle.is_finished());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClockPlayer::new().load(&dir.path().join("missing.wav"));
        assert!(matches!(result, Err(PlayerError::Load { .. })));
    }

    #[test]
    fn test_paused_clock_does_not_advance() {
        let mut handle = ClockHandle::new(60.0);
        handle.play().unwrap();
        thread::sleep(Duration::from_millis(10));
        handle.pause();

        let paused_at = handle.current_time();
        assert!(paused_at > 0.0);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(handle.current_time(), paused_at);
    }

    #[test]
    fn test_position_is_capped_at_duration() {
        let mut handle = ClockHandle::new(0.005);
        handle.play().unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.current_time(), 0.005);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_released_handle_refuses_to_play() {
        let mut handle = ClockHandle::new(1.0);
        handle.release();
        assert!(handle.play().is_err());
        assert_eq!(handle.current_time(), 0.0);
        assert!(!handle.is_finished());
    }
}
