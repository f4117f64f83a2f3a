// Command handlers module
pub mod adb;
pub mod sys;
pub mod term;

use anyhow::{Context, Result};

/// Commands are synchronous at the CLI boundary; each one drives the
/// async core through its own runtime.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to build command runtime")
}
