//! UI utilities for Bridge CLI.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use bridge_core::file::format_size;
use bridge_core::transfer::TransferSummary;
use bridge_core::Error;

use crate::commands::OutputArgs;

/// Print the banner shown at the top of interactive commands.
pub fn print_header() {
    println!();
    println!("Bridge v{}", bridge_core::VERSION);
    println!("{}", "-".repeat(37));
    println!();
}

/// Render progress updates until the session reports completion.
///
/// `total` is the file size when it is known up front (the send side).
pub async fn display_progress(mut rx: watch::Receiver<f64>, total: Option<u64>) {
    let started = Instant::now();
    let mut drawn = false;

    while rx.changed().await.is_ok() {
        let fraction = *rx.borrow_and_update();
        print!("\r  {}    ", format_progress_line(fraction, total, started.elapsed()));
        let _ = io::stdout().flush();
        drawn = true;

        if fraction >= 1.0 {
            break;
        }
    }

    if drawn {
        println!();
    }
}

/// Format one progress line.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_progress_line(fraction: f64, total: Option<u64>, elapsed: Duration) -> String {
    let pct = fraction.clamp(0.0, 1.0) * 100.0;
    match total {
        Some(total) => {
            let done = (total as f64 * fraction.clamp(0.0, 1.0)) as u64;
            let secs = elapsed.as_secs_f64();
            let speed = if secs > 0.0 {
                (done as f64 / secs) as u64
            } else {
                0
            };
            format!(
                "[{:>6.2}%] {} / {} - {}/s",
                pct,
                format_size(done),
                format_size(total),
                format_size(speed)
            )
        }
        None => format!("[{:>6.2}%] {}", pct, format_elapsed(elapsed)),
    }
}

/// Format elapsed time as "M:SS".
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Machine-readable form of a completed session.
pub fn summary_json(summary: &TransferSummary) -> serde_json::Value {
    serde_json::json!({
        "status": "completed",
        "session_id": summary.session_id.to_string(),
        "direction": summary.direction.to_string(),
        "peer": summary.peer.to_string(),
        "file_name": summary.file_name,
        "path": summary.path.display().to_string(),
        "bytes_transferred": summary.bytes_transferred,
        "elapsed_ms": u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
        "throughput_bps": summary.throughput_bps(),
        "completed_at": summary.completed_at.to_rfc3339(),
    })
}

/// Machine-readable form of a failed session.
pub fn failure_json(error: &Error) -> serde_json::Value {
    serde_json::json!({
        "status": if matches!(error, Error::Cancelled) { "cancelled" } else { "failed" },
        "error": error.to_string(),
        "code": error.code(),
        "recoverable": error.is_recoverable(),
    })
}

/// Report a completed session.
pub fn print_summary(summary: &TransferSummary, flags: OutputArgs) -> anyhow::Result<()> {
    if flags.json {
        println!("{}", serde_json::to_string_pretty(&summary_json(summary))?);
    } else if !flags.quiet {
        let finished = summary.completed_at.with_timezone(&chrono::Local);
        println!();
        println!("  Transfer complete!");
        println!(
            "  {} ({}) in {:.1}s, {}/s",
            summary.path.display(),
            format_size(summary.bytes_transferred),
            summary.elapsed.as_secs_f64(),
            format_size(summary.throughput_bps())
        );
        println!("  Finished at {}", finished.format("%H:%M:%S"));
        println!();
    }
    Ok(())
}

/// Report a failed session.
pub fn print_failure(error: &Error, flags: OutputArgs) -> anyhow::Result<()> {
    if flags.json {
        println!("{}", serde_json::to_string_pretty(&failure_json(error))?);
    } else if !flags.quiet {
        eprintln!();
        match error.code() {
            Some(code) => eprintln!("  Transfer failed [{}]: {}", code, error),
            None => eprintln!("  Transfer failed: {}", error),
        }
        if let Some(suggestion) = error.suggestion() {
            eprintln!();
            for line in suggestion.lines() {
                eprintln!("  {}", line.trim());
            }
        }
        eprintln!();
    }
    Ok(())
}
