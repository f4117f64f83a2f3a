// Core process integration logic

pub mod adb;
pub mod config;
pub mod process;
pub mod pty;
pub mod shell;
pub mod telemetry;

// Re-export commonly used items
pub use adb::{AdbClient, DeviceInfo};
pub use config::Config;
pub use process::{ProcessResult, ProcessSpec, StreamEvent, StreamingChild};
pub use pty::{PtySessionManager, SessionMode, SessionOptions, SessionSurface};
pub use shell::{ResolvedShell, ShellResolver};
pub use telemetry::{ProcessSample, ResourceSnapshot, TelemetryHandle};
