// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! shiftlens - schedule screenshot capture bot.
//!
//! This is the binary entry point for the shiftlens service.

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use shiftlens_config::{ShiftlensConfig, load_config, load_config_from_path};
use shiftlens_core::ShiftlensError;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// shiftlens - schedule screenshot capture bot.
#[derive(Parser, Debug)]
#[command(name = "shiftlens", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the capture service: Telegram ingress plus both dispatchers.
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
}

fn load(config_path: Option<&PathBuf>) -> Result<ShiftlensConfig, ShiftlensError> {
    let loaded = match config_path {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    loaded.map_err(|e| ShiftlensError::Config(e.to_string()))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve => match load(cli.config.as_ref()) {
            Ok(config) => serve::run_serve(config).await,
            Err(e) => Err(e),
        },
        Commands::Migrate => match load(cli.config.as_ref()) {
            Ok(config) => serve::run_migrate(config).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
