//! Wavenote - A voice recorder with live waveforms
//!
//! This is the command-line entry point.

mod cli;
mod tokio_runtime;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Args, Command};
use log::info;
#[cfg(not(feature = "audio-output"))]
use log::warn;
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use wavenote::audio::{ClockPlayer, Player, ReaderCapture, WavRecorder};
#[cfg(feature = "audio-output")]
use wavenote::audio::OutputPlayer;
use wavenote::render;
use wavenote::settings::Settings;
use wavenote::state::{FsStorage, RecordingLibrary, Storage};
use wavenote::{PlaybackEvent, PlaybackSync, Recording, RecordingSession, Waveform, WaveformStore};

/// Everything a command needs, built once from settings
struct App {
    settings: Settings,
    settings_path: PathBuf,
    storage: Arc<dyn Storage>,
    library: RecordingLibrary,
}

impl App {
    fn new(args: &Args) -> Self {
        let settings_path = args.settings.clone().unwrap_or_else(Settings::default_path);
        let mut settings = Settings::load(&settings_path);
        if let Some(dir) = &args.dir {
            settings.recordings_dir = Some(dir.clone());
        }

        let storage: Arc<dyn Storage> = Arc::new(FsStorage::new());
        let store = Arc::new(WaveformStore::new(storage.clone()));
        let library = RecordingLibrary::new(settings.recordings_dir(), storage.clone(), store);
        Self {
            settings,
            settings_path,
            storage,
            library,
        }
    }

    fn find(&self, name: &str) -> Result<Recording> {
        self.library
            .find(name)
            .ok_or_else(|| anyhow!("No recording named {:?} in {:?}", name, self.library.dir()))
    }
}

#[derive(Serialize)]
struct ListEntry {
    #[serde(flatten)]
    recording: Recording,
    waveform_points: usize,
}

fn main() -> Result<()> {
    // Parse command-line arguments and initialize logging
    let args = Args::parse();
    cli::init_logging(&args);

    let ctx = App::new(&args);
    info!("Using recordings directory {:?}", ctx.library.dir());

    match args.command {
        Command::List { json } => list(&ctx, json),
        Command::Record { input, seconds } => record(&ctx, input, seconds),
        Command::Play { name, silent } => play(&ctx, &name, silent),
        Command::Show {
            name,
            width,
            height,
        } => show(&ctx, &name, width, height),
        Command::Rename { name, new_name } => {
            let recording = ctx.find(&name)?;
            let renamed = ctx
                .library
                .rename(&recording, &new_name)
                .with_context(|| format!("Failed to rename {:?}", name))?;
            println!("Renamed {} -> {}", recording.name, renamed.name);
            Ok(())
        }
        Command::Delete { name } => {
            let recording = ctx.find(&name)?;
            ctx.library
                .delete(&recording)
                .with_context(|| format!("Failed to delete {:?}", name))?;
            println!("Deleted {}", recording.name);
            Ok(())
        }
        Command::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&ctx.settings)?);
            if save {
                ctx.settings
                    .save(&ctx.settings_path)
                    .map_err(|e| anyhow!(e))?;
                eprintln!("Saved settings to {:?}", ctx.settings_path);
            }
            Ok(())
        }
    }
}

fn list(ctx: &App, json: bool) -> Result<()> {
    let recordings = ctx.library.list().context("Failed to list recordings")?;

    if json {
        let entries: Vec<ListEntry> = recordings
            .into_iter()
            .map(|recording| ListEntry {
                waveform_points: ctx.library.waveform(&recording).len(),
                recording,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if recordings.is_empty() {
        println!("No recordings in {:?}", ctx.library.dir());
    }
    for recording in &recordings {
        let created = recording
            .created
            .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let waveform = ctx.library.waveform(recording);
        println!(
            "{:<40} {:<20} {}",
            recording.name,
            created,
            render::sparkline(&waveform)
        );
    }
    Ok(())
}

fn record(ctx: &App, input: Option<PathBuf>, seconds: Option<f64>) -> Result<()> {
    let limit = cli::record_limit(seconds).map_err(|e| anyhow!(e))?;

    let source: Box<dyn Read + Send> = match &input {
        Some(path) => Box::new(
            std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?,
        ),
        None => Box::new(io::stdin()),
    };

    let recorder =
        WavRecorder::new(ctx.library.dir()).with_sample_rate(ctx.settings.sample_rate);
    let capture =
        ReaderCapture::new(source, recorder.clone()).with_chunk_bytes(ctx.settings.chunk_bytes);
    let mut session = RecordingSession::new(
        capture,
        ctx.library.store().clone(),
        ctx.storage.clone(),
        recorder,
    )
    .with_max_points(ctx.settings.max_points);

    let finished = tokio_runtime::block_on(async move {
        session.start()?;
        let live = session.live_waveform();
        let deadline = limit.and_then(|limit| Instant::now().checked_add(limit));
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        eprintln!("Recording... (Ctrl-C to stop)");
        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                _ = ticker.tick() => {
                    let waveform = live.borrow().clone();
                    eprint!("\r{}", render::sparkline(&waveform));
                    let _ = io::stderr().flush();

                    if !session.capture().is_running() {
                        break;
                    }
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        break;
                    }
                }
            }
        }
        eprintln!();
        session.stop().await
    })?
    .context("Recording failed")?;

    if let Some(e) = &finished.waveform_error {
        eprintln!("Warning: waveform not saved: {}", e);
    }
    println!(
        "Saved {} ({} waveform points)",
        finished.recording.path.display(),
        finished.waveform.len()
    );
    Ok(())
}

fn play(ctx: &App, name: &str, silent: bool) -> Result<()> {
    let recording = ctx.find(name)?;
    let waveform = ctx.library.store().load(&recording.path);

    if silent {
        return run_playback(ctx, ClockPlayer::new(), recording, waveform);
    }
    play_with_output(ctx, recording, waveform)
}

#[cfg(feature = "audio-output")]
fn play_with_output(ctx: &App, recording: Recording, waveform: Waveform) -> Result<()> {
    run_playback(ctx, OutputPlayer::new(), recording, waveform)
}

#[cfg(not(feature = "audio-output"))]
fn play_with_output(ctx: &App, recording: Recording, waveform: Waveform) -> Result<()> {
    warn!("Built without the audio-output feature, playing silently");
    run_playback(ctx, ClockPlayer::new(), recording, waveform)
}

/// Drive playback of `recording` and draw the progress marker until it ends
fn run_playback<P: Player>(
    ctx: &App,
    player: P,
    recording: Recording,
    waveform: Waveform,
) -> Result<()> {
    let mut sync = PlaybackSync::new(player).with_poll_interval(ctx.settings.poll_interval());

    tokio_runtime::block_on(async move {
        let mut events = sync.subscribe();
        sync.start(&recording.path, waveform.clone())
            .await
            .with_context(|| format!("Failed to play {:?}", recording.name))?;

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    sync.stop().await;
                    break;
                }
                event = events.recv() => match event {
                    Ok(PlaybackEvent::Progress(progress)) => {
                        eprint!(
                            "\r{} {:>3.0}%",
                            render::sparkline_with_marker(&waveform, progress),
                            progress * 100.0
                        );
                        let _ = io::stderr().flush();
                    }
                    Ok(PlaybackEvent::Finished) | Err(RecvError::Closed) => break,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                },
            }
        }
        eprintln!();
        Ok::<_, anyhow::Error>(())
    })?
}

fn show(ctx: &App, name: &str, width: Option<f32>, height: f32) -> Result<()> {
    let recording = ctx.find(name)?;
    let waveform = ctx.library.store().load(&recording.path);

    match width {
        Some(width) => println!("{}", render::wave_path(&waveform, width, height)),
        None => println!("{}", render::sparkline(&waveform)),
    }
    Ok(())
}
