//! Binary entrypoint for panelkey: hold the panel's global shortcuts, or
//! inspect their configuration.
use std::{
    io,
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use logging as logshared;
use panelkey_arbiter::SlotAction;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*};

mod error;
/// `status` and `format`.
mod inspect;
#[cfg(target_os = "macos")]
mod run;

use crate::error::Error;

#[derive(Parser, Debug)]
#[command(name = "panelkey", about = "Global shortcuts for a desktop panel", version)]
/// Command-line interface for the `panelkey` binary.
struct Cli {
    /// Optional subcommand; defaults to `run`.
    #[command(subcommand)]
    command: Option<Command>,

    /// Logging controls
    #[command(flatten)]
    log: logshared::LogArgs,

    /// Path to the settings document (defaults to ~/.panelkey/store.json)
    #[arg(long, value_name = "PATH", global = true)]
    store: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Register the configured shortcuts and keep them alive.
    Run {
        /// Fire one action through its trigger after start-up
        /// (toggle-panel|quick-add|toggle-overlay)
        #[arg(long, value_name = "ACTION")]
        fire_test: Option<SlotAction>,
    },
    /// Print permission state and the configured shortcuts.
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the label for a raw key code and Carbon modifier mask.
    Format {
        /// Virtual key code
        key_code: u32,
        /// Carbon modifier mask (cmd=256, shift=512, option=2048, control=4096)
        modifier_mask: u32,
    },
    /// Ask macOS for the Input Monitoring permission.
    RequestPermission,
}

fn main() {
    let cli = Cli::parse();

    let final_spec = cli.log.spec();
    tracing_subscriber::registry()
        .with(logshared::env_filter_from_spec(&final_spec))
        .with(fmt::layer().with_writer(io::stderr).without_time())
        .try_init()
        .ok();

    let store = cli.store.unwrap_or_else(settings::default_store_path);
    let command = cli.command.unwrap_or(Command::Run { fire_test: None });
    if let Err(e) = dispatch(command, &store) {
        error!(error = %e, "fatal");
        eprintln!("panelkey: {e}");
        process::exit(1);
    }
}

/// Execute one subcommand.
fn dispatch(command: Command, store: &Path) -> Result<(), Error> {
    match command {
        Command::Run { fire_test } => run_shortcuts(store, fire_test),
        Command::Status { json } => inspect::status(store, json),
        Command::Format {
            key_code,
            modifier_mask,
        } => {
            println!("{}", inspect::render_format(key_code, modifier_mask));
            Ok(())
        }
        Command::RequestPermission => request_permission(),
    }
}

#[cfg(target_os = "macos")]
fn run_shortcuts(store: &Path, fire_test: Option<SlotAction>) -> Result<(), Error> {
    run::run(store, fire_test)
}

#[cfg(not(target_os = "macos"))]
fn run_shortcuts(_store: &Path, _fire_test: Option<SlotAction>) -> Result<(), Error> {
    Err(Error::UnsupportedPlatform("run"))
}

#[cfg(target_os = "macos")]
fn request_permission() -> Result<(), Error> {
    let granted = permissions::request_input_monitoring();
    println!(
        "Input Monitoring: {}",
        if granted {
            "granted"
        } else {
            "requested (grant it in System Settings, then restart)"
        }
    );
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn request_permission() -> Result<(), Error> {
    Err(Error::UnsupportedPlatform("request-permission"))
}
