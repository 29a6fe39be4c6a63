//! Receive command implementation.
//!
//! Listens on a port and saves whatever file the next sender announces.
//! With `--keep-listening` senders are served one after another until the
//! user interrupts.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;

use bridge_core::config::Config;
use bridge_core::transfer::Receiver;
use bridge_core::Error;

use super::ReceiveArgs;
use crate::ui;

/// Run the receive command.
pub async fn run(args: ReceiveArgs) -> Result<()> {
    let config = super::load_config();
    let output_dir = resolve_output_dir(args.output.clone(), &config);
    let addr = SocketAddr::new(
        config.network.listen_address,
        args.port.unwrap_or(config.network.port),
    );

    let mut receiver = Receiver::bind(addr, &output_dir, config.transfer_config()).await?;
    super::cancel_on_interrupt(receiver.cancel_token());

    let interactive = args.flags.interactive();
    if interactive {
        ui::print_header();
        println!("  Listening on {}", receiver.local_addr()?);
        println!("  Saving to {}", receiver.output_dir().display());
        println!();
        println!("  Press Ctrl-C to stop.");
        println!();
    }

    loop {
        let (progress_tx, progress_rx) = watch::channel(0.0);
        let progress_handle =
            interactive.then(|| tokio::spawn(ui::display_progress(progress_rx, None)));

        let result = receiver.accept(Arc::new(progress_tx)).await;

        if let Some(handle) = progress_handle {
            let _ = handle.await;
        }

        match result {
            Ok(summary) => ui::print_summary(&summary, args.flags)?,
            Err(Error::Cancelled) if args.keep_listening => {
                if interactive {
                    println!("  Stopped listening.");
                }
                return Ok(());
            }
            Err(e) => {
                ui::print_failure(&e, args.flags)?;
                if !args.keep_listening {
                    return Err(e.into());
                }
                tracing::debug!("Waiting for the next sender");
            }
        }

        if !args.keep_listening {
            return Ok(());
        }
    }
}

/// Pick the output directory: `--output`, then the config file, then `.`.
fn resolve_output_dir(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.or_else(|| config.receive.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}
