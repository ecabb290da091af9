//! Audio capture devices
//!
//! A capture device pushes raw s16le chunks into a `ChunkSink` while it runs
//! and hands back the path of the finished audio file when stopped.

use super::decoder;
use super::recorder::WavRecorder;
use crate::error::{CaptureError, DecodeError};
use log::{debug, info, warn};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

/// Messages flowing from a capture device to the session worker
#[derive(Debug)]
pub(crate) enum SinkMessage {
    Chunk(Vec<u8>),
    Finish,
}

/// Push side of the chunk queue handed to a capture device
///
/// Sending never blocks, so it is safe to call from real-time audio threads.
#[derive(Clone, Debug)]
pub struct ChunkSink {
    sender: mpsc::UnboundedSender<SinkMessage>,
}

impl ChunkSink {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue a raw PCM chunk; returns false once the session has gone away
    pub fn on_chunk(&self, bytes: &[u8]) -> bool {
        self.sender.send(SinkMessage::Chunk(bytes.to_vec())).is_ok()
    }

    /// Queue a base64-encoded PCM chunk
    pub fn on_base64_chunk(&self, data: &str) -> Result<bool, DecodeError> {
        let bytes = decoder::pcm_from_base64(data)?;
        Ok(self.on_chunk(&bytes))
    }

    pub(crate) fn finish(&self) -> bool {
        self.sender.send(SinkMessage::Finish).is_ok()
    }
}

/// A source of live audio
pub trait CaptureDevice: Send {
    /// Begin delivering chunks to `sink`
    fn start(&mut self, sink: ChunkSink) -> Result<(), CaptureError>;

    /// Stop capturing; every chunk has been pushed by the time this returns.
    /// Returns the path of the recorded audio.
    fn stop(&mut self) -> Result<PathBuf, CaptureError>;
}

/// Capture from any byte stream of raw s16le mono PCM
///
/// Works with stdin piped from `arecord -f S16_LE -c 1 -t raw` as well as
/// plain files. Chunks are also written to a temporary WAV file which becomes
/// the recording on stop.
pub struct ReaderCapture {
    source: Option<Box<dyn Read + Send>>,
    recorder: WavRecorder,
    chunk_bytes: usize,
    is_running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<Result<u64, CaptureError>>>,
    temp_path: Option<PathBuf>,
}

impl ReaderCapture {
    /// Default chunk size: 2048 samples
    pub const DEFAULT_CHUNK_BYTES: usize = 4096;

    pub fn new(source: impl Read + Send + 'static, recorder: WavRecorder) -> Self {
        Self {
            source: Some(Box::new(source)),
            recorder,
            chunk_bytes: Self::DEFAULT_CHUNK_BYTES,
            is_running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            temp_path: None,
        }
    }

    /// Set the chunk size, rounded down to whole samples
    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.chunk_bytes = (bytes - bytes % 2).max(2);
        self
    }

    /// Whether the reader thread is still pulling data
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for ReaderCapture {
    fn start(&mut self, sink: ChunkSink) -> Result<(), CaptureError> {
        if self.thread_handle.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }
        let source = self.source.take().ok_or(CaptureError::SourceConsumed)?;

        let path = self.recorder.temp_path();
        let writer = self.recorder.create_writer(&path)?;
        self.temp_path = Some(path);
        self.is_running.store(true, Ordering::SeqCst);

        let is_running = self.is_running.clone();
        let chunk_bytes = self.chunk_bytes;
        let handle = thread::spawn(move || {
            let result = run_capture_loop(source, writer, &sink, chunk_bytes, &is_running);
            if let Err(e) = &result {
                warn!("Capture loop ended with error: {}", e);
            }
            is_running.store(false, Ordering::SeqCst);
            result
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<PathBuf, CaptureError> {
        let handle = self.thread_handle.take().ok_or(CaptureError::NotRunning)?;
        self.is_running.store(false, Ordering::SeqCst);

        let frames = handle.join().map_err(|_| CaptureError::ThreadPanicked)??;
        let path = self.temp_path.take().ok_or(CaptureError::NotRunning)?;
        info!("Captured {} frames to {:?}", frames, path);
        Ok(path)
    }
}

impl Drop for ReaderCapture {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            let _ = self.stop();
        }
    }
}

/// Pull chunks from `source` until EOF or until asked to stop
fn run_capture_loop(
    mut source: Box<dyn Read + Send>,
    mut writer: hound::WavWriter<io::BufWriter<std::fs::File>>,
    sink: &ChunkSink,
    chunk_bytes: usize,
    is_running: &AtomicBool,
) -> Result<u64, CaptureError> {
    let mut buf = vec![0u8; chunk_bytes];
    let mut frames = 0u64;

    while is_running.load(Ordering::SeqCst) {
        let filled = fill_chunk(&mut source, &mut buf)?;
        let whole = filled - filled % 2;
        if whole < filled {
            debug!("Dropping trailing odd byte at end of capture stream");
        }
        if whole == 0 {
            break;
        }

        for pair in buf[..whole].chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        frames += (whole / 2) as u64;

        if !sink.on_chunk(&buf[..whole]) {
            debug!("Chunk sink closed, stopping capture");
            break;
        }
        if filled < buf.len() {
            break;
        }
    }

    writer.finalize()?;
    Ok(frames)
}

/// Read until `buf` is full or the stream ends
fn fill_chunk(source: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decoder::encode_pcm;
    use base64::Engine as _;
    use std::io::Cursor;
    use std::time::Duration;

    fn wait_until_idle(capture: &ReaderCapture) {
        for _ in 0..500 {
            if !capture.is_running() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("capture never reached end of stream");
    }

    #[test]
    fn test_reader_capture_chunks_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let samples: Vec<i16> = (0..10).map(|i| i * 1000).collect();
        let source = Cursor::new(encode_pcm(&samples));
        let mut capture =
            ReaderCapture::new(source, WavRecorder::new(dir.path())).with_chunk_bytes(8);

        let (sink, mut receiver) = ChunkSink::channel();
        capture.start(sink).unwrap();
        wait_until_idle(&capture);
        let path = capture.stop().unwrap();

        let mut sizes = Vec::new();
        while let Ok(SinkMessage::Chunk(chunk)) = receiver.try_recv() {
            sizes.push(chunk.len());
        }
        assert_eq!(sizes, vec![8, 8, 4]);

        let reader = hound::WavReader::open(&path).unwrap();
        let written: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(written, samples);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_trailing_odd_byte_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = encode_pcm(&[100, 200]);
        bytes.push(0x7f);
        let mut capture = ReaderCapture::new(Cursor::new(bytes), WavRecorder::new(dir.path()));

        let (sink, mut receiver) = ChunkSink::channel();
        capture.start(sink).unwrap();
        wait_until_idle(&capture);
        let path = capture.stop().unwrap();

        match receiver.try_recv() {
            Ok(SinkMessage::Chunk(chunk)) => assert_eq!(chunk.len(), 4),
            other => panic!("unexpected message {:?}", other),
        }
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_start_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut capture =
            ReaderCapture::new(Cursor::new(Vec::new()), WavRecorder::new(dir.path()));
        let (sink, _receiver) = ChunkSink::channel();

        capture.start(sink.clone()).unwrap();
        assert!(matches!(
            capture.start(sink),
            Err(CaptureError::AlreadyRunning)
        ));
        let path = capture.stop().unwrap();
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_stop_without_start_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut capture =
            ReaderCapture::new(Cursor::new(Vec::new()), WavRecorder::new(dir.path()));
        assert!(matches!(capture.stop(), Err(CaptureError::NotRunning)));
    }

    #[test]
    fn test_base64_chunk_is_queued_as_bytes() {
        let (sink, mut receiver) = ChunkSink::channel();
        let text = base64::engine::general_purpose::STANDARD.encode(encode_pcm(&[1, 2]));

        assert!(sink.on_base64_chunk(&text).unwrap());
        match receiver.try_recv() {
            Ok(SinkMessage::Chunk(chunk)) => assert_eq!(chunk, encode_pcm(&[1, 2])),
            other => panic!("unexpected message {:?}", other),
        }
    }
}
