use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use procbridge::commands;

fn main() -> Result<()> {
    procbridge::init_logging();

    let matches = Command::new("procbridge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("External process integration: PTY sessions, resource telemetry and device commands")
        .subcommand(
            Command::new("sys")
                .about("Resource telemetry (use 'procbridge sys --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("usage")
                        .about("Show a CPU/memory/disk/GPU usage snapshot")
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("processes")
                        .about("List the top processes by CPU")
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("adb")
                .about("Android device commands (use 'procbridge adb --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("devices")
                        .about("List connected devices")
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("run")
                        .about("Run an arbitrary adb subcommand")
                        .arg(device_arg())
                        .arg(
                            Arg::new("args")
                                .help("Arguments passed to adb as-is")
                                .num_args(1..)
                                .trailing_var_arg(true)
                                .allow_hyphen_values(true)
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("push")
                        .about("Copy a local file to the device")
                        .arg(device_arg())
                        .arg(Arg::new("local").help("Local file path").required(true).index(1))
                        .arg(Arg::new("remote").help("Remote destination path").required(true).index(2)),
                )
                .subcommand(
                    Command::new("pull")
                        .about("Copy a file from the device")
                        .arg(device_arg())
                        .arg(Arg::new("remote").help("Remote file path").required(true).index(1))
                        .arg(Arg::new("local").help("Local destination path").required(true).index(2)),
                )
                .subcommand(
                    Command::new("screenshot")
                        .about("Capture a PNG screenshot from the device")
                        .arg(device_arg())
                        .arg(
                            Arg::new("output")
                                .short('o')
                                .long("output")
                                .value_name("FILE")
                                .help("Output file (defaults to screenshot.png)"),
                        ),
                )
                .subcommand(
                    Command::new("logcat")
                        .about("Dump or follow the device log")
                        .arg(device_arg())
                        .arg(
                            Arg::new("follow")
                                .short('f')
                                .long("follow")
                                .help("Stream the log until interrupted")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("lines")
                                .short('n')
                                .long("lines")
                                .value_name("N")
                                .help("Only dump the most recent N lines"),
                        ),
                ),
        )
        .subcommand(
            Command::new("term")
                .about("PTY terminal sessions (use 'procbridge term --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("exec")
                        .about("Run a command inside a real PTY session")
                        .arg(
                            Arg::new("shell")
                                .long("shell")
                                .value_name("SHELL")
                                .help("Shell to host the command (defaults to the platform chain)"),
                        )
                        .arg(
                            Arg::new("command")
                                .help("Program and arguments to run")
                                .num_args(1..)
                                .trailing_var_arg(true)
                                .allow_hyphen_values(true)
                                .required(true),
                        ),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("sys", sub_matches)) => commands::sys::execute(sub_matches),
        Some(("adb", sub_matches)) => commands::adb::execute(sub_matches),
        Some(("term", sub_matches)) => commands::term::execute(sub_matches),
        _ => {
            println!("Use 'procbridge --help' for more information.");
            Ok(())
        }
    }
}

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Print machine-readable JSON")
        .action(ArgAction::SetTrue)
}

fn device_arg() -> Arg {
    Arg::new("device")
        .short('s')
        .long("device")
        .value_name("ID")
        .help("Target a specific device by id")
}
