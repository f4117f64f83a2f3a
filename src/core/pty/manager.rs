use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::Mutex;
use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, MasterPty, PtySize};

use crate::core::shell::ShellResolver;
use crate::error::{BridgeError, Result};

use super::{SessionMode, SessionOptions, SessionSurface};

/// Registry state for one live session. The writer and killer are the only
/// handles the manager retains; the child itself is owned by the exit
/// watcher thread. The writer has its own lock so callers never hold the
/// registry lock across a blocking PTY write.
struct LiveSession {
    generation: u64,
    master: Box<dyn MasterPty + Send>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    mode: SessionMode,
}

type Registry = Arc<Mutex<HashMap<String, LiveSession>>>;

/// Owns every live PTY session.
///
/// The registry is private state: removal from it is the single commit
/// point for teardown, so a concurrent natural exit and an explicit close
/// cannot both fire. Whichever removes the entry first wins and the other
/// becomes a no-op. Entries carry a generation token because ids are
/// reusable: a watcher or reader left over from a replaced session must
/// never tear down the session that took its id.
pub struct PtySessionManager {
    resolver: Arc<ShellResolver>,
    sessions: Registry,
    next_generation: AtomicU64,
}

impl PtySessionManager {
    pub fn new(resolver: Arc<ShellResolver>) -> Self {
        Self {
            resolver,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Create a session bound to `surface`. A live session under the same
    /// id is force-closed first (replace semantics, not an error).
    pub async fn create_session(
        &self,
        options: SessionOptions,
        surface: &Arc<dyn SessionSurface>,
    ) -> Result<()> {
        self.close_session(&options.id);

        let shell = self.resolver.resolve(options.shell.as_deref()).await?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: options.rows,
                cols: options.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| BridgeError::session(format!("openpty failed: {e}")))?;

        let mut cmd = CommandBuilder::new(&shell.executable);
        cmd.args(&shell.invocation_args);
        if let Some(cwd) = &options.cwd {
            cmd.cwd(cwd);
        } else if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }
        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| BridgeError::session(format!("failed to spawn shell: {e}")))?;
        // The slave side must not outlive the spawn or the reader never
        // sees EOF when the child exits.
        drop(pair.slave);

        let mut killer = child.clone_killer();

        let reader = match pair.master.try_clone_reader() {
            Ok(reader) => reader,
            Err(e) => {
                let _ = killer.kill();
                return Err(BridgeError::session(format!(
                    "failed to clone PTY reader: {e}"
                )));
            }
        };
        let writer = match pair.master.take_writer() {
            Ok(writer) => writer,
            Err(e) => {
                let _ = killer.kill();
                return Err(BridgeError::session(format!(
                    "failed to take PTY writer: {e}"
                )));
            }
        };

        // The entry goes into the registry before the initial command is
        // written and before the helper threads start, so every failure
        // from here on funnels through close_session and the child cannot
        // leak.
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let weak_surface: Weak<dyn SessionSurface> = Arc::downgrade(surface);
        self.sessions.lock().insert(
            options.id.clone(),
            LiveSession {
                generation,
                master: pair.master,
                writer: Arc::new(Mutex::new(writer)),
                killer,
                mode: options.mode,
            },
        );

        if let Err(e) = spawn_reader_thread(
            options.id.clone(),
            generation,
            reader,
            weak_surface.clone(),
            Arc::clone(&self.sessions),
        )
        .and_then(|_| {
            spawn_exit_watcher(
                options.id.clone(),
                generation,
                child,
                weak_surface,
                Arc::clone(&self.sessions),
            )
        }) {
            self.close_session(&options.id);
            return Err(BridgeError::session(format!(
                "failed to spawn session thread: {e}"
            )));
        }

        if let Some(command) = &options.initial_command {
            let mut line = shell.command_line(&command.program, &command.args);
            line.push_str(shell.line_ending);
            if options.mode == SessionMode::OneShotTask {
                line.push_str("exit");
                line.push_str(shell.line_ending);
            }
            if let Err(e) = self.write_to_session(&options.id, line.as_bytes()) {
                self.close_session(&options.id);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Forward raw bytes to the session's input. Returns `Ok(false)` for an
    /// unknown id: a late keystroke racing a close is expected, not an
    /// error. Write failures on a live session do propagate.
    pub fn write_to_session(&self, id: &str, data: &[u8]) -> Result<bool> {
        // Clone the writer handle out so the registry stays unlocked while
        // the (potentially blocking) PTY write runs.
        let writer = match self.sessions.lock().get(id) {
            Some(session) => Arc::clone(&session.writer),
            None => return Ok(false),
        };
        let mut writer = writer.lock();
        writer.write_all(data)?;
        writer.flush()?;
        Ok(true)
    }

    /// Best-effort resize. Returns `false` silently for an unknown session
    /// or a failed resize; resize races with close whenever a panel
    /// animates out.
    pub fn resize_session(&self, id: &str, cols: u16, rows: u16) -> bool {
        let sessions = self.sessions.lock();
        match sessions.get(id) {
            Some(session) => session
                .master
                .resize(PtySize {
                    rows,
                    cols,
                    pixel_width: 0,
                    pixel_height: 0,
                })
                .is_ok(),
            None => false,
        }
    }

    /// Terminate the session's process and drop it from the registry.
    /// Idempotent: closing an unknown id is a no-op.
    pub fn close_session(&self, id: &str) {
        let removed = self.sessions.lock().remove(id);
        if let Some(mut session) = removed {
            if let Err(e) = session.killer.kill() {
                // Already-exited children report an error here; nothing to do.
                log::debug!("kill for session {id}: {e}");
            }
        }
    }

    /// Force-close every live session. Used on process-wide shutdown and
    /// when the owning surface is destroyed; safe to call repeatedly.
    pub fn close_all_sessions(&self) {
        let ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        for id in ids {
            self.close_session(&id);
        }
    }

    pub fn has_session(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Live session ids with their modes, for host-side listings.
    pub fn sessions(&self) -> Vec<(String, SessionMode)> {
        self.sessions
            .lock()
            .iter()
            .map(|(id, s)| (id.clone(), s.mode))
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

/// Remove the entry for `id`, but only if it still belongs to `generation`.
/// A mismatch means the id was reused by a newer session; that session is
/// left untouched.
fn remove_if_current(sessions: &Registry, id: &str, generation: u64) -> Option<LiveSession> {
    let mut sessions = sessions.lock();
    if sessions
        .get(id)
        .is_some_and(|session| session.generation == generation)
    {
        sessions.remove(id)
    } else {
        None
    }
}

/// Reads PTY output and pushes it to the surface. A dead surface triggers
/// an implicit close rather than a push into freed UI state.
fn spawn_reader_thread(
    id: String,
    generation: u64,
    mut reader: Box<dyn Read + Send>,
    surface: Weak<dyn SessionSurface>,
    sessions: Registry,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name(format!("pty-read-{id}"))
        .spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match surface.upgrade() {
                        Some(surface) => surface.on_output(&id, &buf[..n]),
                        None => {
                            log::debug!("surface for session {id} is gone, closing");
                            force_close(&sessions, &id, generation);
                            break;
                        }
                    },
                }
            }
        })
        .map(|_| ())
}

/// Waits for the child to exit. If the entry for this generation is still
/// present the exit was natural: remove it and notify the surface. If it
/// is gone, or the id now belongs to a newer session, no event is emitted.
fn spawn_exit_watcher(
    id: String,
    generation: u64,
    mut child: Box<dyn portable_pty::Child + Send + Sync>,
    surface: Weak<dyn SessionSurface>,
    sessions: Registry,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name(format!("pty-wait-{id}"))
        .spawn(move || {
            let exit_code = child.wait().ok().map(|status| status.exit_code());
            let was_live = remove_if_current(&sessions, &id, generation).is_some();
            if was_live {
                if let Some(surface) = surface.upgrade() {
                    surface.on_exit(&id, exit_code);
                }
            }
        })
        .map(|_| ())
}

fn force_close(sessions: &Registry, id: &str, generation: u64) {
    if let Some(mut session) = remove_if_current(sessions, id, generation) {
        let _ = session.killer.kill();
    }
}
