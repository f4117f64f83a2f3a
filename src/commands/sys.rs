//! Resource telemetry command handler.

use anyhow::Result;
use clap::ArgMatches;
use colored::*;

use crate::core::config::Config;
use crate::core::telemetry::{ProcessSample, ResourceSnapshot, TelemetryHandle};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("usage", sub_matches)) => execute_usage(sub_matches),
        Some(("processes", sub_matches)) => execute_processes(sub_matches),
        _ => {
            println!("Use 'procbridge sys --help' for more information.");
            Ok(())
        }
    }
}

fn execute_usage(matches: &ArgMatches) -> Result<()> {
    let json_output = matches.get_flag("json");
    let config = Config::load().unwrap_or_default();
    let rt = super::runtime()?;

    let snapshot = rt.block_on(async {
        let telemetry = TelemetryHandle::spawn(&config);
        telemetry.wait_ready().await;
        // The very first CPU sample has no measurement window and reads
        // as zero; take a second one for a meaningful number.
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        let snapshot = telemetry.get_usage().await;
        telemetry.shutdown();
        snapshot
    });

    if json_output {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_usage(&snapshot);
    }
    Ok(())
}

fn print_usage(snapshot: &ResourceSnapshot) {
    println!("{}", "System Resource Usage".bold());
    println!("  CPU:    {:.1}%", snapshot.cpu_percent);
    println!(
        "  Memory: {:.2} / {:.2} GB ({:.1}%)",
        snapshot.memory.used_gb, snapshot.memory.total_gb, snapshot.memory.percent
    );
    println!(
        "  Disk:   {:.2} / {:.2} GB ({:.1}%)",
        snapshot.disk.used_gb, snapshot.disk.total_gb, snapshot.disk.percent
    );
    match &snapshot.gpu {
        Some(gpu) => println!(
            "  GPU:    {:.1}% ({:.2} / {:.2} GB)",
            gpu.percent, gpu.memory_used_gb, gpu.memory_total_gb
        ),
        None => println!("  GPU:    {}", "not available".dimmed()),
    }
}

fn execute_processes(matches: &ArgMatches) -> Result<()> {
    let json_output = matches.get_flag("json");
    let config = Config::load().unwrap_or_default();
    let rt = super::runtime()?;

    let processes = rt.block_on(async {
        let telemetry = TelemetryHandle::spawn(&config);
        telemetry.wait_ready().await;
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        let processes = telemetry.get_processes().await;
        telemetry.shutdown();
        processes
    });

    if json_output {
        println!("{}", serde_json::to_string_pretty(&processes)?);
    } else {
        print_processes(&processes);
    }
    Ok(())
}

fn print_processes(processes: &[ProcessSample]) {
    println!("{}", "Top Processes".bold());
    println!(
        "{:<8} {:<28} {:>10} {:>10} {:>8}",
        "PID".dimmed(),
        "NAME".dimmed(),
        "CPU".dimmed(),
        "MEM (MB)".dimmed(),
        "MEM %".dimmed()
    );
    for proc in processes {
        println!(
            "{:<8} {:<28} {:>10.2} {:>10.1} {:>8.1}",
            proc.pid, proc.name, proc.cpu_metric, proc.memory_mb, proc.memory_percent
        );
    }
}
