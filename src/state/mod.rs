//! Durable state: file storage and the recordings catalog

mod library;
mod storage;

pub use library::RecordingLibrary;
pub use storage::{FsStorage, Storage};
