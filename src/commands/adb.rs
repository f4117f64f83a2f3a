//! Device command handlers built on the adb client.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::adb::AdbClient;
use crate::core::config::Config;
use crate::core::process::{decode_console, StreamEvent};
use crate::core::shell::ShellResolver;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let resolver = ShellResolver::new();
    let client = AdbClient::new(&config, &resolver);
    let rt = super::runtime()?;

    match matches.subcommand() {
        Some(("devices", sub_matches)) => rt.block_on(execute_devices(&client, sub_matches)),
        Some(("run", sub_matches)) => rt.block_on(execute_run(&client, sub_matches)),
        Some(("push", sub_matches)) => rt.block_on(execute_push(&client, sub_matches)),
        Some(("pull", sub_matches)) => rt.block_on(execute_pull(&client, sub_matches)),
        Some(("screenshot", sub_matches)) => rt.block_on(execute_screenshot(&client, sub_matches)),
        Some(("logcat", sub_matches)) => rt.block_on(execute_logcat(&client, sub_matches)),
        _ => {
            println!("Use 'procbridge adb --help' for more information.");
            Ok(())
        }
    }
}

fn device_of(matches: &ArgMatches) -> Option<&str> {
    matches.get_one::<String>("device").map(String::as_str)
}

async fn execute_devices(client: &AdbClient, matches: &ArgMatches) -> Result<()> {
    let devices = client.list_devices().await?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("{}", "No devices connected.".yellow());
        return Ok(());
    }

    println!("{}", "Connected Devices".bold());
    for device in &devices {
        let state = if device.is_online() {
            device.state.green()
        } else {
            device.state.red()
        };
        let mut details = Vec::new();
        if let Some(model) = &device.model {
            details.push(format!("model: {model}"));
        }
        if let Some(manufacturer) = &device.manufacturer {
            details.push(format!("manufacturer: {manufacturer}"));
        }
        if let Some(version) = &device.android_version {
            details.push(format!("android: {version}"));
        }
        println!("  {} [{}]  {}", device.id.cyan(), state, details.join(", ").dimmed());
    }
    Ok(())
}

async fn execute_run(client: &AdbClient, matches: &ArgMatches) -> Result<()> {
    let args: Vec<String> = matches
        .get_many::<String>("args")
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default();
    if args.is_empty() {
        return Err(anyhow!("no adb arguments given"));
    }

    let result = client.run_user_command(device_of(matches), &args).await?;

    print!("{}", result.stdout_text());
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }
    if !result.success() {
        std::process::exit(result.exit_code.unwrap_or(1));
    }
    Ok(())
}

async fn execute_push(client: &AdbClient, matches: &ArgMatches) -> Result<()> {
    let local = PathBuf::from(require(matches, "local")?);
    let remote = require(matches, "remote")?;
    let summary = client.push_file(device_of(matches), &local, remote).await?;
    println!("{} {}", "Pushed:".green(), summary);
    Ok(())
}

async fn execute_pull(client: &AdbClient, matches: &ArgMatches) -> Result<()> {
    let remote = require(matches, "remote")?;
    let local = PathBuf::from(require(matches, "local")?);
    let summary = client.pull_file(device_of(matches), remote, &local).await?;
    println!("{} {}", "Pulled:".green(), summary);
    Ok(())
}

async fn execute_screenshot(client: &AdbClient, matches: &ArgMatches) -> Result<()> {
    let dest = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("screenshot.png"));
    let written = client.capture_screenshot(device_of(matches), &dest).await?;
    println!("{} {}", "Saved screenshot to".green(), written.display());
    Ok(())
}

async fn execute_logcat(client: &AdbClient, matches: &ArgMatches) -> Result<()> {
    let device = device_of(matches);

    if !matches.get_flag("follow") {
        let lines = matches.get_one::<String>("lines").map(|n| n.parse()).transpose()?;
        let dump = client.dump_logcat(device, lines).await?;
        print!("{dump}");
        return Ok(());
    }

    let mut child = client.stream_logcat(device).await?;
    while let Some(event) = child.next_event().await {
        match event {
            StreamEvent::Stdout(chunk) | StreamEvent::Stderr(chunk) => {
                print!("{}", decode_console(&chunk));
            }
            StreamEvent::Exited { exit_code, .. } => {
                log::debug!("logcat stream ended with {exit_code:?}");
                break;
            }
        }
    }
    Ok(())
}

fn require<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing required argument: {name}"))
}
