// procbridge - external process integration for host applications

// Re-export error types
pub mod error;
pub use error::{BridgeError, Result};

// Module declarations
pub mod bridge;
pub mod commands;
pub mod core;
pub mod platform;

// Re-export commonly used types
pub use bridge::Bridge;
pub use core::config::Config;

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
