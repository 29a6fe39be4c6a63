//! Receiving side of a transfer.
//!
//! A [`Receiver`] owns a bound listener and serves one session per
//! [`accept`](Receiver::accept) call. Sessions never overlap: while one is
//! running the listener is not polled, so further senders wait in the kernel
//! backlog until the next `accept`.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{
    transfer_failed, with_cancel, TransferConfig, TransferDirection, TransferResult,
    TransferSession,
};
use crate::connection::configure_tcp_keepalive;
use crate::error::{Error, Result};
use crate::file::{format_size, sanitize_file_name, sanitize_path, FileWriter};
use crate::progress::{ProgressReporter, ProgressSink};
use crate::protocol::read_header_with_timeout;

/// Listens for senders and writes their files into one directory.
#[derive(Debug)]
pub struct Receiver {
    listener: TcpListener,
    output_dir: PathBuf,
    config: TransferConfig,
    cancel: CancellationToken,
}

impl Receiver {
    /// Bind a listener on `addr`.
    ///
    /// `output_dir` is created on first use if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::BindFailed` if the address cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        output_dir: impl Into<PathBuf>,
        config: TransferConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::BindFailed { addr, source })?;

        let local = listener.local_addr().unwrap_or(addr);
        tracing::info!("Listening on {}", local);

        Ok(Self {
            listener,
            output_dir: output_dir.into(),
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Directory received files are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Token that cancels a waiting or running session when fired.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the waiting or running session.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Accept one sender and receive its file.
    ///
    /// Progress goes to `sink`, which always sees exactly one final `1.0`.
    ///
    /// # Errors
    ///
    /// - `Error::MalformedHeader` if the header is invalid, incomplete or late
    /// - `Error::TruncatedStream` if the sender disconnects early
    /// - `Error::TransferFailed` on local or network I/O failure
    /// - `Error::Cancelled` if the cancel token fires
    pub async fn accept(&mut self, sink: Arc<dyn ProgressSink>) -> TransferResult {
        let mut reporter = ProgressReporter::new(sink);

        let result = with_cancel(&self.cancel, self.run(&mut reporter)).await;
        reporter.finish();

        match &result {
            Ok(summary) => tracing::info!(
                "Received {} ({}) from {} in {:.2}s",
                summary.file_name,
                format_size(summary.bytes_transferred),
                summary.peer,
                summary.elapsed.as_secs_f64()
            ),
            Err(e) => tracing::warn!("Receive failed: {}", e),
        }
        result
    }

    async fn run(&self, reporter: &mut ProgressReporter) -> TransferResult {
        let (mut stream, peer) = self.listener.accept().await.map_err(transfer_failed)?;
        tracing::info!("Connection from {}", peer);

        if self.config.keepalive {
            if let Err(e) = configure_tcp_keepalive(&stream) {
                tracing::debug!("Failed to enable TCP keep-alive: {}", e);
            }
        }

        let header = read_header_with_timeout(&mut stream, self.config.header_timeout).await?;

        let file_name = sanitize_file_name(header.file_name()).ok_or_else(|| {
            Error::malformed(format!(
                "file name {:?} has no usable component",
                header.file_name()
            ))
        })?;
        if file_name != header.file_name() {
            tracing::warn!(
                "Sanitized announced file name {:?} to {:?}",
                header.file_name(),
                file_name
            );
        }

        let output_path = sanitize_path(&self.output_dir, Path::new(&file_name)).ok_or_else(|| {
            Error::malformed(format!("file name {file_name:?} escapes the output directory"))
        })?;

        reporter.set_total(header.file_size());
        let session = TransferSession::new(TransferDirection::Receive, peer, header);
        let span = session.span();

        let (session, path) = self
            .receive_file(session, &mut stream, output_path, reporter)
            .instrument(span)
            .await?;

        Ok(session.into_summary(file_name, path))
    }

    async fn receive_file(
        &self,
        mut session: TransferSession,
        stream: &mut TcpStream,
        output_path: PathBuf,
        reporter: &mut ProgressReporter,
    ) -> Result<(TransferSession, PathBuf)> {
        let expected = session.header().file_size();
        tracing::info!(
            "Receiving {} ({}) into {}",
            session.header().file_name(),
            format_size(expected),
            output_path.display()
        );

        let mut writer = FileWriter::create(output_path)
            .await
            .map_err(transfer_failed)?;

        match self
            .copy_content(&mut session, stream, &mut writer, reporter)
            .await
        {
            Ok(()) => {
                let path = writer.finalize().await.map_err(transfer_failed)?;
                Ok((session, path))
            }
            Err(e) => {
                if self.config.remove_partial {
                    writer.discard().await;
                } else {
                    tracing::warn!(
                        "Keeping partial file {} ({} of {} bytes)",
                        writer.output_path.display(),
                        writer.bytes_written,
                        expected
                    );
                }
                Err(e)
            }
        }
    }

    async fn copy_content(
        &self,
        session: &mut TransferSession,
        stream: &mut TcpStream,
        writer: &mut FileWriter,
        reporter: &mut ProgressReporter,
    ) -> Result<()> {
        let truncated = |session: &TransferSession| Error::TruncatedStream {
            received: session.bytes_transferred(),
            expected: session.header().file_size(),
        };

        let mut buffer = vec![0u8; self.config.chunk_size.max(1)];
        while session.remaining() > 0 {
            let len = session.next_chunk_len(buffer.len());
            let n = match stream.read(&mut buffer[..len]).await {
                Ok(0) => return Err(truncated(session)),
                Ok(n) => n,
                Err(e) if is_disconnect(&e) => {
                    tracing::debug!("Connection lost: {}", e);
                    return Err(truncated(session));
                }
                Err(e) => return Err(transfer_failed(e)),
            };

            writer
                .write_chunk(&buffer[..n])
                .await
                .map_err(transfer_failed)?;
            session.record(n);
            reporter.advance(n as u64);
        }

        Ok(())
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

/// Receive one file on `0.0.0.0:port` with the default configuration.
///
/// # Errors
///
/// Returns `Error::BindFailed` if the port cannot be bound, otherwise see
/// [`Receiver::accept`].
pub async fn listen(
    port: u16,
    dest_dir: impl Into<PathBuf>,
    sink: Arc<dyn ProgressSink>,
) -> TransferResult {
    let addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port);
    let mut receiver = Receiver::bind(addr, dest_dir, TransferConfig::default()).await?;
    receiver.accept(sink).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopSink;
    use tempfile::TempDir;

    #[test]
    fn test_is_disconnect() {
        assert!(is_disconnect(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_disconnect(&io::Error::from(io::ErrorKind::UnexpectedEof)));
        assert!(!is_disconnect(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let receiver = Receiver::bind(
            "127.0.0.1:0".parse().unwrap(),
            temp_dir.path(),
            TransferConfig::default(),
        )
        .await
        .expect("bind");

        let addr = receiver.local_addr().expect("local addr");
        assert_ne!(addr.port(), 0);
        assert_eq!(receiver.output_dir(), temp_dir.path());
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let first = Receiver::bind(
            "127.0.0.1:0".parse().unwrap(),
            temp_dir.path(),
            TransferConfig::default(),
        )
        .await
        .expect("bind");
        let addr = first.local_addr().expect("local addr");

        let second = Receiver::bind(addr, temp_dir.path(), TransferConfig::default()).await;
        assert!(matches!(second, Err(Error::BindFailed { .. })));
    }

    #[tokio::test]
    async fn test_accept_cancelled_while_waiting() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let mut receiver = Receiver::bind(
            "127.0.0.1:0".parse().unwrap(),
            temp_dir.path(),
            TransferConfig::default(),
        )
        .await
        .expect("bind");

        receiver.cancel();
        let result = receiver.accept(Arc::new(NoopSink)).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
