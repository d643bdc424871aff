mod config;
mod control;
mod daemon;
mod hud;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::Settings;
use crate::daemon::DaemonError;

/// Overlay daemon showing a 3x3 grid of glyphs, driven over D-Bus
#[derive(Parser)]
#[command(name = "hudd")]
#[command(about = "3x3 glyph HUD overlay daemon")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/hud/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let settings = Settings::load(cli.config.as_deref());

    match daemon::run(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(DaemonError::AlreadyRunning) => {
            eprintln!("Error: HUD already running");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
