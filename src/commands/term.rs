//! Terminal session command handler.
//!
//! Runs a command inside a real PTY session and relays its output,
//! exercising the same session path a host UI would.

use std::io::Write;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::config::Config;
use crate::core::pty::{
    InitialCommand, PtySessionManager, SessionMode, SessionOptions, SessionSurface,
};
use crate::core::shell::ShellResolver;

/// Relays session output to stdout and reports the exit code back over
/// a channel.
struct ConsoleSurface {
    exit_tx: mpsc::Sender<Option<u32>>,
}

impl SessionSurface for ConsoleSurface {
    fn on_output(&self, _session_id: &str, data: &[u8]) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(data);
        let _ = stdout.flush();
    }

    fn on_exit(&self, _session_id: &str, exit_code: Option<u32>) {
        let _ = self.exit_tx.send(exit_code);
    }
}

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("exec", sub_matches)) => execute_exec(sub_matches),
        _ => {
            println!("Use 'procbridge term --help' for more information.");
            Ok(())
        }
    }
}

fn execute_exec(matches: &ArgMatches) -> Result<()> {
    let mut args: Vec<String> = matches
        .get_many::<String>("command")
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default();
    if args.is_empty() {
        return Err(anyhow!("no command given"));
    }
    let program = args.remove(0);

    let config = Config::load().unwrap_or_default();
    let shell = matches
        .get_one::<String>("shell")
        .cloned()
        .or(config.preferred_shell);

    let rt = super::runtime()?;
    let resolver = Arc::new(ShellResolver::new());
    let manager = Arc::new(PtySessionManager::new(resolver));

    let (exit_tx, exit_rx) = mpsc::channel();
    let interrupt_tx = exit_tx.clone();
    let surface: Arc<dyn SessionSurface> = Arc::new(ConsoleSurface { exit_tx });

    let mut options = SessionOptions::new("cli-exec")
        .mode(SessionMode::OneShotTask)
        .initial_command(InitialCommand::new(program).args(args));
    options.shell = shell;

    rt.block_on(manager.create_session(options, &surface))?;

    let handler_manager = Arc::clone(&manager);
    ctrlc::set_handler(move || {
        println!();
        println!("{}", "Interrupted, closing session...".yellow());
        handler_manager.close_all_sessions();
        // Explicit closes do not emit an exit callback; unblock manually.
        let _ = interrupt_tx.send(None);
    })
    .map_err(|e| anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    // Blocks until the shell exits (the one-shot task injects `exit`)
    // or Ctrl+C closes the session.
    let exit_code = exit_rx.recv().unwrap_or(None);
    manager.close_all_sessions();

    if let Some(code) = exit_code {
        if code != 0 {
            std::process::exit(code as i32);
        }
    }
    Ok(())
}
