//! Audible WAV playback through the default output device using cpal
//!
//! The whole file is decoded to mono up front. A dedicated thread owns the
//! cpal stream, since streams cannot move between threads on every host.
//! The audio callback pulls samples from a shared transport, and elapsed
//! time is the number of source frames played divided by the file's sample
//! rate.

use super::playback::{Player, PlayerHandle};
use super::recorder::WavRecorder;
use crate::error::PlayerError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{debug, error, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

/// Decode a WAV file into mono samples in `[-1.0, 1.0]` and its sample rate
pub fn read_mono_samples(path: &Path) -> Result<(Vec<f32>, u32), hound::Error> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

/// Playback position shared between the handle and the audio callback
struct Transport {
    samples: Vec<f32>,
    source_rate: u32,
    device_rate: u32,
    /// Device frames written while playing
    frames_played: AtomicU64,
    playing: AtomicBool,
}

impl Transport {
    fn new(samples: Vec<f32>, source_rate: u32, device_rate: u32) -> Self {
        Self {
            samples,
            source_rate,
            device_rate: device_rate.max(1),
            frames_played: AtomicU64::new(0),
            playing: AtomicBool::new(false),
        }
    }

    /// Source frame for the next device frame, nearest-neighbour resampled
    fn source_index(&self) -> usize {
        let played = self.frames_played.load(Ordering::Acquire) as u128;
        (played * self.source_rate as u128 / self.device_rate as u128) as usize
    }

    /// Called from the audio callback once per output frame
    fn next_sample(&self) -> f32 {
        if !self.playing.load(Ordering::Acquire) {
            return 0.0;
        }
        match self.samples.get(self.source_index()) {
            Some(&sample) => {
                self.frames_played.fetch_add(1, Ordering::AcqRel);
                sample
            }
            None => 0.0,
        }
    }

    fn current_time(&self) -> f64 {
        let index = self.source_index().min(self.samples.len());
        WavRecorder::duration_seconds(index, self.source_rate)
    }

    fn is_finished(&self) -> bool {
        self.source_index() >= self.samples.len()
    }

    fn rewind(&self) {
        self.playing.store(false, Ordering::Release);
        self.frames_played.store(0, Ordering::Release);
    }
}

/// Player that sends WAV files to the default output device
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputPlayer;

impl OutputPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl Player for OutputPlayer {
    type Handle = OutputHandle;

    fn load(&self, path: &Path) -> Result<OutputHandle, PlayerError> {
        let load_error = |reason: String| PlayerError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let (samples, source_rate) = read_mono_samples(path).map_err(|e| load_error(e.to_string()))?;
        let duration = WavRecorder::duration_seconds(samples.len(), source_rate);
        let (transport, shutdown, thread) =
            spawn_output_thread(samples, source_rate).map_err(load_error)?;

        debug!(
            "Loaded {:?} for output ({:.2}s at {} Hz, device {} Hz)",
            path, duration, source_rate, transport.device_rate
        );
        Ok(OutputHandle {
            transport,
            duration,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }
}

/// One file open on the output device
pub struct OutputHandle {
    transport: Arc<Transport>,
    duration: f64,
    /// Dropping this ends the stream thread
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl OutputHandle {
    fn is_released(&self) -> bool {
        self.shutdown.is_none()
    }
}

impl PlayerHandle for OutputHandle {
    fn play(&mut self) -> Result<(), PlayerError> {
        if self.is_released() {
            return Err(PlayerError::Playback("player already released".to_string()));
        }
        self.transport.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&mut self) {
        self.transport.playing.store(false, Ordering::Release);
    }

    fn stop(&mut self) {
        self.transport.rewind();
    }

    fn release(&mut self) {
        self.transport.rewind();
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
        }
    }

    fn current_time(&self) -> f64 {
        if self.is_released() {
            return 0.0;
        }
        self.transport.current_time()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_finished(&self) -> bool {
        !self.is_released() && self.transport.is_finished()
    }
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        self.release();
    }
}

type OutputThread = (Arc<Transport>, mpsc::Sender<()>, JoinHandle<()>);

/// Open the output stream on its own thread and wait until it is running
fn spawn_output_thread(samples: Vec<f32>, source_rate: u32) -> Result<OutputThread, String> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<Arc<Transport>, String>>();
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let thread = thread::Builder::new()
        .name("wavenote-output".to_string())
        .spawn(move || match open_stream(samples, source_rate) {
            Ok((stream, transport)) => {
                let _ = ready_tx.send(Ok(transport));
                // Blocks until the handle drops its sender
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("Audio output stream closed");
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        })
        .map_err(|e| format!("Failed to spawn output thread: {}", e))?;

    match ready_rx.recv() {
        Ok(Ok(transport)) => Ok((transport, shutdown_tx, thread)),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread.join();
            Err("Audio output thread exited before the stream opened".to_string())
        }
    }
}

fn open_stream(samples: Vec<f32>, source_rate: u32) -> Result<(Stream, Arc<Transport>), String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "No output device available".to_string())?;
    let supported = device
        .default_output_config()
        .map_err(|e| format!("Failed to get output config: {}", e))?;

    let config: StreamConfig = supported.config();
    let transport = Arc::new(Transport::new(samples, source_rate, config.sample_rate.0));

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, transport.clone())?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, transport.clone())?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, transport.clone())?,
        format => return Err(format!("Unsupported sample format: {:?}", format)),
    };

    stream
        .play()
        .map_err(|e| format!("Failed to start stream: {}", e))?;
    Ok((stream, transport))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    transport: Arc<Transport>,
) -> Result<Stream, String>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // Mono source goes to every output channel
                for frame in data.chunks_mut(channels) {
                    frame.fill(T::from_sample(transport.next_sample()));
                }
            },
            |err| error!("Audio output stream error: {}", err),
            None,
        )
        .map_err(|e| format!("Failed to build stream: {}", e))
}
