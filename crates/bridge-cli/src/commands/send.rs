//! Send command implementation.
//!
//! Connects to a receiver by IP address and streams one file to it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;

use bridge_core::connection::{parse_host_address, validate_port};
use bridge_core::file::format_size;
use bridge_core::transfer::Sender;

use super::SendArgs;
use crate::ui;

/// Run the send command.
pub async fn run(args: SendArgs) -> Result<()> {
    let config = super::load_config();
    let addr = resolve_target(&args.host, args.port, config.network.port)?;

    let sender = Sender::new(config.transfer_config());
    super::cancel_on_interrupt(sender.cancel_token());

    let size = tokio::fs::metadata(&args.file).await.ok().map(|m| m.len());
    let interactive = args.flags.interactive();

    if interactive {
        ui::print_header();
        let name = args.file.file_name().map_or_else(
            || args.file.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        match size {
            Some(size) => println!("  Sending {} ({}) to {}", name, format_size(size), addr),
            None => println!("  Sending {} to {}", name, addr),
        }
        println!();
    }

    let (progress_tx, progress_rx) = watch::channel(0.0);
    let progress_handle =
        interactive.then(|| tokio::spawn(ui::display_progress(progress_rx, size)));

    let result = sender.send(addr, &args.file, Arc::new(progress_tx)).await;

    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    match result {
        Ok(summary) => ui::print_summary(&summary, args.flags),
        Err(e) => {
            ui::print_failure(&e, args.flags)?;
            Err(e.into())
        }
    }
}

/// Work out the address to dial from the HOST argument and `--port`.
fn resolve_target(host: &str, port: Option<u16>, default_port: u16) -> Result<SocketAddr> {
    let mut addr = parse_host_address(host, port.unwrap_or(default_port))?;
    if let Some(port) = port {
        validate_port(port)?;
        addr.set_port(port);
    }
    Ok(addr)
}
