//! File transfer engine for Bridge.
//!
//! This module handles the actual transfer of a file between two peers:
//!
//! - [`Sender`] dials the receiver, announces the file, and streams it
//! - [`Receiver`] listens, reads the announcement, and writes the file
//!
//! Each call drives exactly one session over one connection and resolves to
//! a [`TransferResult`]. Progress goes to a caller-supplied
//! [`ProgressSink`](crate::progress::ProgressSink).
//!
//! ## Streaming
//!
//! - Default chunk size: 80 KB
//! - One reusable buffer per session, so memory stays bounded
//! - Exactly the announced number of bytes is read or written

pub mod receiver;
pub mod sender;

pub use receiver::{listen, Receiver};
pub use sender::{send_file, Sender};

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::TransferHeader;

/// Terminal outcome of one session.
pub type TransferResult = Result<TransferSummary>;

/// Transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Sending a file
    Send,
    /// Receiving a file
    Receive,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => f.write_str("send"),
            Self::Receive => f.write_str("receive"),
        }
    }
}

/// Configuration for a transfer session.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Chunk size in bytes
    pub chunk_size: usize,
    /// Sender: how long to wait for the connection to open
    pub connect_timeout: Duration,
    /// Receiver: how long to wait for a complete header
    pub header_timeout: Duration,
    /// Enable TCP keep-alive probes
    pub keepalive: bool,
    /// Receiver: delete the partial file when a session fails
    pub remove_partial: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            connect_timeout: crate::DEFAULT_CONNECT_TIMEOUT,
            header_timeout: crate::DEFAULT_HEADER_TIMEOUT,
            keepalive: true,
            remove_partial: false,
        }
    }
}

/// State of one transfer over one connection.
///
/// Owned by the task driving it and dropped when the connection closes.
#[derive(Debug)]
pub struct TransferSession {
    id: Uuid,
    direction: TransferDirection,
    peer: SocketAddr,
    header: TransferHeader,
    bytes_transferred: u64,
    started_at: Instant,
}

impl TransferSession {
    /// Start a session for the given header.
    #[must_use]
    pub fn new(direction: TransferDirection, peer: SocketAddr, header: TransferHeader) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            peer,
            header,
            bytes_transferred: 0,
            started_at: Instant::now(),
        }
    }

    /// The header exchanged at connection start.
    #[must_use]
    pub const fn header(&self) -> &TransferHeader {
        &self.header
    }

    /// Bytes of content moved so far.
    #[must_use]
    pub const fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Bytes of content still to move.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.header.file_size().saturating_sub(self.bytes_transferred)
    }

    /// Size of the next read, bounded by the buffer and what is left.
    fn next_chunk_len(&self, buffer_len: usize) -> usize {
        usize::try_from(self.remaining()).map_or(buffer_len, |r| r.min(buffer_len))
    }

    fn record(&mut self, bytes: usize) {
        self.bytes_transferred += bytes as u64;
    }

    fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "transfer",
            id = %self.id,
            direction = %self.direction,
            peer = %self.peer,
        )
    }

    fn into_summary(self, file_name: String, path: PathBuf) -> TransferSummary {
        TransferSummary {
            session_id: self.id,
            direction: self.direction,
            peer: self.peer,
            file_name,
            path,
            bytes_transferred: self.bytes_transferred,
            elapsed: self.started_at.elapsed(),
            completed_at: Utc::now(),
        }
    }
}

/// Result of a successful session.
#[derive(Debug, Clone)]
pub struct TransferSummary {
    /// Session id
    pub session_id: Uuid,
    /// Which side of the transfer this was
    pub direction: TransferDirection,
    /// Address of the other peer
    pub peer: SocketAddr,
    /// File name as stored locally (sanitized on the receive side)
    pub file_name: String,
    /// Local path that was read or written
    pub path: PathBuf,
    /// Content bytes moved
    pub bytes_transferred: u64,
    /// Wall time from connection to completion
    pub elapsed: Duration,
    /// When the session completed
    pub completed_at: DateTime<Utc>,
}

impl TransferSummary {
    /// Average throughput in bytes per second.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn throughput_bps(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.bytes_transferred as f64 / secs) as u64
        } else {
            0
        }
    }
}

/// Run `fut` unless `token` fires first.
///
/// Cancellation drops `fut`, and with it every socket and file it owns.
async fn with_cancel<F, T>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

fn transfer_failed(source: io::Error) -> Error {
    Error::TransferFailed { source }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(size: u64) -> TransferSession {
        let header = TransferHeader::new("a.bin", size).expect("header");
        TransferSession::new(
            TransferDirection::Send,
            "127.0.0.1:12345".parse().unwrap(),
            header,
        )
    }

    #[test]
    fn test_transfer_config_default() {
        let config = TransferConfig::default();
        assert_eq!(config.chunk_size, 80 * 1024);
        assert!(config.keepalive);
        assert!(!config.remove_partial);
    }

    #[test]
    fn test_session_accounting() {
        let mut session = session(100);
        assert_eq!(session.remaining(), 100);
        assert_eq!(session.next_chunk_len(64), 64);

        session.record(64);
        assert_eq!(session.bytes_transferred(), 64);
        assert_eq!(session.remaining(), 36);
        assert_eq!(session.next_chunk_len(64), 36);

        session.record(36);
        assert_eq!(session.remaining(), 0);
        assert_eq!(session.next_chunk_len(64), 0);
    }

    #[test]
    fn test_session_huge_file_chunking() {
        let session = session(u64::MAX);
        assert_eq!(session.next_chunk_len(81920), 81920);
    }

    #[test]
    fn test_summary_throughput() {
        let mut summary = session(1000).into_summary("a.bin".into(), PathBuf::from("a.bin"));
        summary.bytes_transferred = 1000;
        summary.elapsed = Duration::from_secs(2);
        assert_eq!(summary.throughput_bps(), 500);

        summary.elapsed = Duration::ZERO;
        assert_eq!(summary.throughput_bps(), 0);
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(TransferDirection::Send.to_string(), "send");
        assert_eq!(TransferDirection::Receive.to_string(), "receive");
    }

    #[tokio::test]
    async fn test_with_cancel_prefers_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result = with_cancel(&token, async { Ok(1) }).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_with_cancel_passes_result() {
        let token = CancellationToken::new();
        let result = with_cancel(&token, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
