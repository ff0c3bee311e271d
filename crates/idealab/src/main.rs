// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IdéaLab - voting and comment service for community ideas.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use idealab_config::{ConfigError, IdeaLabConfig};

/// IdéaLab - voting and comment service for community ideas.
#[derive(Parser, Debug)]
#[command(name = "idealab", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve,
    /// Validate the configuration and print the effective settings.
    CheckConfig,
}

fn load(path: Option<&PathBuf>) -> Result<IdeaLabConfig, Vec<ConfigError>> {
    match path {
        Some(path) => idealab_config::load_and_validate_path(path),
        None => idealab_config::load_and_validate(),
    }
}

/// Effective configuration as TOML, with secrets masked.
fn render_effective(config: &IdeaLabConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.auth.jwt_secret.is_some() {
        shown.auth.jwt_secret = Some("<redacted>".to_string());
    }
    toml::to_string_pretty(&shown)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            idealab_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => match render_effective(&config) {
            Ok(rendered) => {
                println!("idealab: configuration is valid");
                println!("{rendered}");
            }
            Err(e) => {
                eprintln!("error: failed to render configuration: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("idealab: use --help for available commands");
        }
    }
}
