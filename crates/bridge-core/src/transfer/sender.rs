//! Sending side of a transfer.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{
    transfer_failed, with_cancel, TransferConfig, TransferDirection, TransferResult,
    TransferSession,
};
use crate::connection::{configure_tcp_keepalive, validate_port};
use crate::error::{Error, Result};
use crate::file::{format_size, SourceFile};
use crate::progress::{ProgressReporter, ProgressSink};
use crate::protocol::{write_header, TransferHeader};

/// Streams one local file to a listening receiver per call.
///
/// The cancel token is shared by every `send` on this sender; once it has
/// fired, further sends fail with `Error::Cancelled` immediately.
#[derive(Debug)]
pub struct Sender {
    config: TransferConfig,
    cancel: CancellationToken,
}

impl Sender {
    /// Create a sender with the given configuration.
    #[must_use]
    pub fn new(config: TransferConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that cancels any in-flight send when fired.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the in-flight send.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Send the file at `path` to the receiver at `addr`.
    ///
    /// The file is opened and its header built before anything touches the
    /// network. Progress goes to `sink`, which always sees exactly one final
    /// `1.0`.
    ///
    /// # Errors
    ///
    /// - `Error::FileNotFound` if `path` is not a readable regular file
    /// - `Error::InvalidInput` if the file name is too long to announce
    /// - `Error::ConnectionFailed` if the receiver cannot be reached
    /// - `Error::TransferFailed` if the connection or the file fails mid-stream
    /// - `Error::Cancelled` if the cancel token fires
    pub async fn send(
        &self,
        addr: SocketAddr,
        path: impl AsRef<Path>,
        sink: Arc<dyn ProgressSink>,
    ) -> TransferResult {
        let path = path.as_ref();
        let mut reporter = ProgressReporter::new(sink);

        let result = with_cancel(&self.cancel, self.run(addr, path, &mut reporter)).await;
        reporter.finish();

        match &result {
            Ok(summary) => tracing::info!(
                "Sent {} ({}) to {} in {:.2}s",
                summary.file_name,
                format_size(summary.bytes_transferred),
                summary.peer,
                summary.elapsed.as_secs_f64()
            ),
            Err(e) => tracing::warn!("Send of {} failed: {}", path.display(), e),
        }
        result
    }

    async fn run(
        &self,
        addr: SocketAddr,
        path: &Path,
        reporter: &mut ProgressReporter,
    ) -> TransferResult {
        let SourceFile {
            mut file,
            name,
            size,
        } = SourceFile::open(path).await?;
        let header = TransferHeader::new(name.clone(), size)?;
        validate_port(addr.port())?;
        reporter.set_total(size);

        let mut stream = self.connect(addr).await?;

        let session = TransferSession::new(TransferDirection::Send, addr, header);
        let span = session.span();
        let session = self
            .stream_file(session, &mut stream, &mut file, reporter)
            .instrument(span)
            .await?;

        Ok(session.into_summary(name, path.to_path_buf()))
    }

    async fn connect(&self, addr: SocketAddr) -> Result<TcpStream> {
        tracing::info!("Connecting to {}", addr);

        let connect_timeout = self.config.connect_timeout;
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionFailed {
                addr,
                source: io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no response within {}s", connect_timeout.as_secs()),
                ),
            })?
            .map_err(|source| Error::ConnectionFailed { addr, source })?;

        if self.config.keepalive {
            if let Err(e) = configure_tcp_keepalive(&stream) {
                tracing::debug!("Failed to enable TCP keep-alive: {}", e);
            }
        }

        Ok(stream)
    }

    async fn stream_file(
        &self,
        mut session: TransferSession,
        stream: &mut TcpStream,
        file: &mut File,
        reporter: &mut ProgressReporter,
    ) -> Result<TransferSession> {
        let expected = session.header().file_size();
        tracing::info!(
            "Sending {} ({})",
            session.header().file_name(),
            format_size(expected)
        );

        write_header(stream, session.header())
            .await
            .map_err(transfer_failed)?;

        let mut buffer = vec![0u8; self.config.chunk_size.max(1)];
        while session.remaining() > 0 {
            let len = session.next_chunk_len(buffer.len());
            let n = file.read(&mut buffer[..len]).await.map_err(transfer_failed)?;
            if n == 0 {
                return Err(transfer_failed(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "file ended after {} of {} bytes",
                        session.bytes_transferred(),
                        expected
                    ),
                )));
            }

            stream
                .write_all(&buffer[..n])
                .await
                .map_err(transfer_failed)?;
            session.record(n);
            reporter.advance(n as u64);
        }

        stream.flush().await.map_err(transfer_failed)?;
        if let Err(e) = stream.shutdown().await {
            tracing::debug!("Write shutdown failed: {}", e);
        }

        tracing::debug!(bytes = session.bytes_transferred(), "All content written");
        Ok(session)
    }
}

/// Send one file with the default configuration.
///
/// # Errors
///
/// See [`Sender::send`].
pub async fn send_file(
    ip: IpAddr,
    port: u16,
    path: impl AsRef<Path>,
    sink: Arc<dyn ProgressSink>,
) -> TransferResult {
    Sender::new(TransferConfig::default())
        .send(SocketAddr::new(ip, port), path, sink)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopSink;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_send_rejects_port_zero() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("a.txt");
        std::fs::write(&path, b"abc").expect("write file");

        let sender = Sender::new(TransferConfig::default());
        let result = sender
            .send("127.0.0.1:0".parse().unwrap(), &path, Arc::new(NoopSink))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_send_missing_file_reported_before_port() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("missing.txt");

        let sender = Sender::new(TransferConfig::default());
        let result = sender
            .send("127.0.0.1:0".parse().unwrap(), &path, Arc::new(NoopSink))
            .await;
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn test_send_cancelled_before_start() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("a.txt");
        std::fs::write(&path, b"abc").expect("write file");

        let sender = Sender::new(TransferConfig::default());
        sender.cancel();
        let result = sender
            .send("127.0.0.1:9".parse().unwrap(), &path, Arc::new(NoopSink))
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_send_shrinking_file_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let drain = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut sink = Vec::new();
            let _ = socket.read_to_end(&mut sink).await;
        });

        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("shrink.bin");
        std::fs::write(&path, vec![7u8; 10]).expect("write file");

        let sender = Sender::new(TransferConfig::default());
        let header = TransferHeader::new("shrink.bin", 20).expect("header");
        let session = TransferSession::new(TransferDirection::Send, addr, header);
        let mut stream = sender.connect(addr).await.expect("connect");
        let mut file = File::open(&path).await.expect("open");
        let mut reporter = ProgressReporter::new(Arc::new(NoopSink));
        reporter.set_total(20);

        let result = sender
            .stream_file(session, &mut stream, &mut file, &mut reporter)
            .await;
        match result {
            Err(Error::TransferFailed { source }) => {
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("Expected TransferFailed, got: {other:?}"),
        }

        drop(stream);
        drain.await.unwrap();
    }
}
