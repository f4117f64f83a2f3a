#![cfg(unix)]

use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use procbridge::core::pty::{
    InitialCommand, PtySessionManager, SessionMode, SessionOptions, SessionSurface,
};
use procbridge::core::shell::ShellResolver;

/// Test double for the owning UI surface: records output per session and
/// reports exits over a channel.
struct RecordingSurface {
    output: Mutex<Vec<u8>>,
    exit_tx: mpsc::Sender<(String, Option<u32>)>,
}

impl RecordingSurface {
    fn new() -> (Arc<Self>, mpsc::Receiver<(String, Option<u32>)>) {
        let (exit_tx, exit_rx) = mpsc::channel();
        (
            Arc::new(Self {
                output: Mutex::new(Vec::new()),
                exit_tx,
            }),
            exit_rx,
        )
    }

    fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output.lock()).into_owned()
    }

    fn wait_for_output(&self, needle: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.output_text().contains(needle) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }
}

impl SessionSurface for RecordingSurface {
    fn on_output(&self, _session_id: &str, data: &[u8]) {
        self.output.lock().extend_from_slice(data);
    }

    fn on_exit(&self, session_id: &str, exit_code: Option<u32>) {
        let _ = self.exit_tx.send((session_id.to_string(), exit_code));
    }
}

fn manager() -> PtySessionManager {
    PtySessionManager::new(Arc::new(ShellResolver::new()))
}

#[tokio::test]
async fn interactive_session_round_trip() {
    let manager = manager();
    let (surface, _exit_rx) = RecordingSurface::new();
    let dyn_surface: Arc<dyn SessionSurface> = surface.clone();

    let options = SessionOptions {
        shell: Some("sh".to_string()),
        ..SessionOptions::new("s1")
    };
    manager.create_session(options, &dyn_surface).await.unwrap();
    assert!(manager.has_session("s1"));

    let wrote = manager
        .write_to_session("s1", b"echo pty-round-trip\n")
        .unwrap();
    assert!(wrote);
    assert!(
        surface.wait_for_output("pty-round-trip", Duration::from_secs(10)),
        "no echoed output, got: {:?}",
        surface.output_text()
    );

    assert!(manager.resize_session("s1", 120, 40));

    manager.close_session("s1");
    assert!(!manager.has_session("s1"));

    // Writes to a closed session are not an error, just a no-op.
    let wrote = manager.write_to_session("s1", b"ignored\n").unwrap();
    assert!(!wrote);
}

#[tokio::test]
async fn one_shot_task_exits_on_its_own_and_reports() {
    let manager = manager();
    let (surface, exit_rx) = RecordingSurface::new();
    let dyn_surface: Arc<dyn SessionSurface> = surface.clone();

    let options = SessionOptions {
        shell: Some("sh".to_string()),
        ..SessionOptions::new("task-1")
            .mode(SessionMode::OneShotTask)
            .initial_command(InitialCommand::new("echo").args(["one shot done"]))
    };
    manager.create_session(options, &dyn_surface).await.unwrap();

    let (id, _code) = exit_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("session did not exit on its own");
    assert_eq!(id, "task-1");
    // The reader thread may still be draining when the exit lands.
    assert!(surface.wait_for_output("one shot done", Duration::from_secs(5)));
    assert!(!manager.has_session("task-1"));
}

#[tokio::test]
async fn reusing_an_id_replaces_the_previous_session() {
    let manager = manager();
    let (surface, _exit_rx) = RecordingSurface::new();
    let dyn_surface: Arc<dyn SessionSurface> = surface.clone();

    let options = SessionOptions {
        shell: Some("sh".to_string()),
        ..SessionOptions::new("dup")
    };
    manager.create_session(options.clone(), &dyn_surface).await.unwrap();
    manager.create_session(options, &dyn_surface).await.unwrap();

    assert_eq!(manager.session_count(), 1);
    assert!(manager.has_session("dup"));

    manager.close_all_sessions();
    assert_eq!(manager.session_count(), 0);
}

#[tokio::test]
async fn replacement_survives_a_lingering_predecessor_exit() {
    let manager = manager();
    let (surface, exit_rx) = RecordingSurface::new();
    let dyn_surface: Arc<dyn SessionSurface> = surface.clone();

    let options = SessionOptions {
        shell: Some("sh".to_string()),
        ..SessionOptions::new("s1")
    };
    manager
        .create_session(options.clone(), &dyn_surface)
        .await
        .unwrap();
    // The first shell ignores the hangup sent on replace and lingers a
    // moment before exiting on its own, so its exit watcher fires after
    // the replacement session is already registered under the same id.
    assert!(manager
        .write_to_session("s1", b"trap '' HUP; sleep 1; exit\n")
        .unwrap());
    std::thread::sleep(Duration::from_millis(300));

    manager.create_session(options, &dyn_surface).await.unwrap();

    // Wait out the old shell and its watcher.
    std::thread::sleep(Duration::from_secs(2));

    assert!(manager.has_session("s1"));
    assert!(manager.write_to_session("s1", b"echo replacement-live\n").unwrap());
    assert!(
        surface.wait_for_output("replacement-live", Duration::from_secs(10)),
        "replacement session stopped responding, got: {:?}",
        surface.output_text()
    );
    assert!(
        exit_rx.try_recv().is_err(),
        "exit reported while the replacement session is still live"
    );

    manager.close_all_sessions();
}

#[tokio::test]
async fn concurrent_writes_reach_their_own_sessions() {
    let manager = Arc::new(manager());
    let (surface, _exit_rx) = RecordingSurface::new();
    let dyn_surface: Arc<dyn SessionSurface> = surface.clone();

    for id in ["w1", "w2"] {
        let options = SessionOptions {
            shell: Some("sh".to_string()),
            ..SessionOptions::new(id)
        };
        manager.create_session(options, &dyn_surface).await.unwrap();
    }

    let writers: Vec<_> = ["w1", "w2"]
        .into_iter()
        .map(|id| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    assert!(manager.write_to_session(id, b"echo burst\n").unwrap());
                }
            })
        })
        .collect();
    // The registry stays responsive while the writes are in flight.
    assert_eq!(manager.session_count(), 2);
    for writer in writers {
        writer.join().unwrap();
    }

    assert!(surface.wait_for_output("burst", Duration::from_secs(10)));
    manager.close_all_sessions();
}

#[tokio::test]
async fn resize_of_unknown_session_is_false() {
    let manager = manager();
    assert!(!manager.resize_session("ghost", 80, 24));
}

#[tokio::test]
async fn dead_surface_forces_the_session_closed() {
    let manager = manager();
    let (surface, _exit_rx) = RecordingSurface::new();
    let dyn_surface: Arc<dyn SessionSurface> = surface.clone();

    let options = SessionOptions {
        shell: Some("sh".to_string()),
        ..SessionOptions::new("orphan")
    };
    manager.create_session(options, &dyn_surface).await.unwrap();
    assert!(manager.has_session("orphan"));

    drop(dyn_surface);
    drop(surface);

    // The next output push finds the surface gone and closes the session.
    let _ = manager.write_to_session("orphan", b"echo still-there\n");
    let deadline = Instant::now() + Duration::from_secs(10);
    while manager.has_session("orphan") && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(!manager.has_session("orphan"));
}
