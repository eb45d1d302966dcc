// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MtcACG - gallery harvester that republishes artwork to a Telegram channel.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod config_cmd;
mod doctor;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MtcACG - gallery harvester for a Telegram channel.
#[derive(Parser, Debug)]
#[command(name = "mtcacg", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pollers and the manual upload bot (default).
    Serve,
    /// Check the ledger, the bot and every enabled source.
    Doctor,
    /// Validate configuration and print the effective values.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => mtcacg_config::load_and_validate_path(path),
        None => mtcacg_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            mtcacg_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Doctor => {
            let failures = doctor::run_doctor(&config).await;
            if failures > 0 {
                std::process::exit(1);
            }
        }
        Commands::Config => match config_cmd::render_effective(&config) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["mtcacg"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());

        let cli = Cli::parse_from(["mtcacg", "doctor", "--config", "/tmp/m.toml"]);
        assert!(matches!(cli.command, Some(Commands::Doctor)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/m.toml")));
    }
}
