//! Bridge CLI - direct peer-to-peer file transfer over TCP
//!
//! One side listens, the other dials it by IP address and sends a file.
//!
//! ## Quick Start
//!
//! ```bash
//! # On the receiving machine
//! bridge receive -o ~/Downloads
//!
//! # On the sending machine
//! bridge send 192.168.1.20 ./report.pdf
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::Parser;

mod commands;
pub mod ui;

use commands::{Cli, Command, Verbosity};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    match cli.command {
        Command::Send(args) => commands::send::run(args).await,
        Command::Receive(args) => commands::receive::run(args).await,
        Command::Config(args) => commands::config::run(args),
        Command::Completions(args) => {
            commands::completions::run(args);
            Ok(())
        }
    }
}

fn init_logging(verbosity: Verbosity) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
