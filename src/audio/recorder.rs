//! WAV file naming and writing using hound
//!
//! Recordings are 16-bit PCM mono, the same layout the capture device delivers.

use crate::models::TIMESTAMP_FORMAT;
use hound::{WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// WAV layout and file naming for recordings
#[derive(Clone, Debug)]
pub struct WavRecorder {
    spec: WavSpec,
    recordings_dir: PathBuf,
}

impl WavRecorder {
    /// Create a recorder writing 44.1kHz 16-bit mono into `recordings_dir`
    pub fn new(recordings_dir: impl AsRef<Path>) -> Self {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        Self {
            spec,
            recordings_dir: recordings_dir.as_ref().to_path_buf(),
        }
    }

    /// Set the sample rate
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.spec.sample_rate = rate;
        self
    }

    /// Generate a unique, timestamped path for a new recording
    pub fn generate_filename(&self) -> PathBuf {
        let timestamp = chrono::Utc::now().format(TIMESTAMP_FORMAT);
        let uuid = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        self.recordings_dir
            .join(format!("recording_{}_{}.wav", timestamp, uuid))
    }

    /// Path for in-progress capture, outside the recordings directory
    pub fn temp_path(&self) -> PathBuf {
        std::env::temp_dir().join(format!("wavenote-capture-{}.wav", uuid::Uuid::new_v4()))
    }

    /// Open a WAV writer at `path`
    pub fn create_writer(&self, path: &Path) -> Result<WavWriter<BufWriter<File>>, hound::Error> {
        WavWriter::create(path, self.spec)
    }

    /// Duration of a WAV file in seconds
    pub fn duration_of(path: &Path) -> Result<f64, hound::Error> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        Ok(Self::duration_seconds(reader.duration() as usize, spec.sample_rate))
    }

    /// Get duration of a frame count in seconds
    pub fn duration_seconds(frame_count: usize, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        frame_count as f64 / sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_calculation() {
        assert_eq!(WavRecorder::duration_seconds(44100, 44100), 1.0);
        assert_eq!(WavRecorder::duration_seconds(32000, 16000), 2.0);
        assert_eq!(WavRecorder::duration_seconds(8000, 16000), 0.5);
        assert_eq!(WavRecorder::duration_seconds(8000, 0), 0.0);
    }

    #[test]
    fn test_generated_names_are_timestamped_and_unique() {
        let recorder = WavRecorder::new("/recordings");
        let a = recorder.generate_filename();
        let b = recorder.generate_filename();

        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(Path::new("/recordings")));
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("recording_"));
        assert!(name.ends_with(".wav"));
        assert!(crate::models::Recording::from_path(&a).created.is_some());
    }

    #[test]
    fn test_written_file_reports_duration() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = WavRecorder::new(dir.path()).with_sample_rate(8000);
        let path = dir.path().join("tone.wav");

        let mut writer = recorder.create_writer(&path).unwrap();
        for i in 0..4000 {
            writer.write_sample((i % 100) as i16).unwrap();
        }
        writer.finalize().unwrap();

        assert_eq!(WavRecorder::duration_of(&path).unwrap(), 0.5);
    }
}
