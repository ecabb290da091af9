//! Global Tokio runtime for the command-line front end
//!
//! Recording sessions and playback sync spawn their worker and polling tasks
//! on Tokio. The CLI entry point stays synchronous and drives them through
//! this lazily built runtime.

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::Runtime;

static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Initialize the global Tokio runtime. Call this during startup.
pub fn init() -> std::io::Result<()> {
    if TOKIO_RUNTIME.get().is_some() {
        return Ok(());
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("wavenote-worker")
        .enable_all()
        .build()?;
    // A concurrent init may have won; either runtime is equivalent
    let _ = TOKIO_RUNTIME.set(runtime);
    Ok(())
}

/// Run a future to completion on the global runtime
pub fn block_on<F: Future>(future: F) -> std::io::Result<F::Output> {
    init()?;
    match TOKIO_RUNTIME.get() {
        Some(runtime) => Ok(runtime.block_on(future)),
        None => Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "Tokio runtime not initialized",
        )),
    }
}
