//! ADB device command runner.
//!
//! Built on the process runner and shell resolver; adds device-domain
//! semantics: locating the adb binary through the SDK discovery chain,
//! enumerating and enriching devices, file transfer, binary-safe
//! screenshot capture and log dumps. Device targeting (`-s <id>`) is
//! centralized in one argument-building step so it cannot drift between
//! call sites.

mod client;
mod devices;
mod locate;

pub use client::AdbClient;
pub use devices::DeviceInfo;
pub use locate::locate_adb;
