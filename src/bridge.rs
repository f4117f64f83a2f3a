//! Top-level handle tying the process integration pieces together.

use std::sync::Arc;

use crate::core::adb::AdbClient;
use crate::core::config::Config;
use crate::core::pty::PtySessionManager;
use crate::core::shell::ShellResolver;
use crate::core::telemetry::TelemetryHandle;

/// Owns the long-lived subsystems: the shell resolver, PTY session
/// manager, telemetry worker and adb client. One instance per host
/// application.
pub struct Bridge {
    resolver: Arc<ShellResolver>,
    sessions: PtySessionManager,
    telemetry: TelemetryHandle,
    adb: AdbClient,
}

impl Bridge {
    pub fn new(config: &Config) -> Self {
        let resolver = Arc::new(ShellResolver::new());
        let sessions = PtySessionManager::new(Arc::clone(&resolver));
        let telemetry = TelemetryHandle::spawn(config);
        let adb = AdbClient::new(config, &resolver);
        Bridge {
            resolver,
            sessions,
            telemetry,
            adb,
        }
    }

    pub fn resolver(&self) -> &Arc<ShellResolver> {
        &self.resolver
    }

    pub fn sessions(&self) -> &PtySessionManager {
        &self.sessions
    }

    pub fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    pub fn adb(&self) -> &AdbClient {
        &self.adb
    }

    /// Tears everything down in order: PTY children first so their exit
    /// watchers can report, then the telemetry worker. Idempotent.
    pub fn shutdown(&self) {
        log::debug!("closing {} PTY session(s)", self.sessions.session_count());
        self.sessions.close_all_sessions();
        self.telemetry.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_empty_and_shuts_down_cleanly() {
        let bridge = Bridge::new(&Config::default());
        assert_eq!(bridge.sessions().session_count(), 0);

        bridge.telemetry().wait_ready().await;
        assert!(bridge.telemetry().is_ready());

        bridge.shutdown();
        bridge.shutdown();

        // After shutdown telemetry degrades instead of erroring.
        let snapshot = bridge.telemetry().get_usage().await;
        assert_eq!(snapshot.cpu_percent, 0.0);
    }
}
