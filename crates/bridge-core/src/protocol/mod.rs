//! Bridge wire protocol.
//!
//! A transfer is a single header followed by the raw file bytes. There is no
//! acknowledgment, checksum, or trailer; integrity relies on TCP.
//!
//! ## Header Format
//!
//! ```text
//! ┌──────────────┬────────────────────┬──────────────┬──────────────────┐
//! │ Name Length  │     File Name      │  File Size   │   File Content   │
//! │   4 bytes    │   N bytes, UTF-8   │   8 bytes    │  File Size bytes │
//! └──────────────┴────────────────────┴──────────────┴──────────────────┘
//! ```
//!
//! - Name Length: `u32`, little-endian
//! - File Size: `u64`, little-endian

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Size of the file name length prefix in bytes
pub const NAME_LENGTH_SIZE: usize = 4;

/// Size of the file size field in bytes
pub const FILE_SIZE_SIZE: usize = 8;

/// Longest file name a peer may announce, in bytes
pub const MAX_FILE_NAME_LEN: u32 = 65535;

/// Metadata announced ahead of the file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferHeader {
    file_name: String,
    file_size: u64,
}

impl TransferHeader {
    /// Create a header for a file.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the UTF-8 name is longer than
    /// [`MAX_FILE_NAME_LEN`] bytes.
    pub fn new(file_name: impl Into<String>, file_size: u64) -> Result<Self> {
        let file_name = file_name.into();
        if file_name.len() > MAX_FILE_NAME_LEN as usize {
            return Err(Error::InvalidInput(format!(
                "file name is {} bytes, limit is {MAX_FILE_NAME_LEN}",
                file_name.len()
            )));
        }
        Ok(Self {
            file_name,
            file_size,
        })
    }

    /// The announced file name, exactly as sent.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The announced file size in bytes.
    #[must_use]
    pub const fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of bytes [`encode`](Self::encode) produces.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        NAME_LENGTH_SIZE + self.file_name.len() + FILE_SIZE_SIZE
    }

    /// Encode the header to bytes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(&self) -> Vec<u8> {
        let name = self.file_name.as_bytes();
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(name);
        buf.extend_from_slice(&self.file_size.to_le_bytes());
        buf
    }
}

/// Write a header to a stream.
///
/// # Errors
///
/// Returns an error if writing fails.
pub async fn write_header<W>(writer: &mut W, header: &TransferHeader) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&header.encode()).await
}

/// Read a header from a stream.
///
/// Consumes exactly [`TransferHeader::encoded_len`] bytes; the file content
/// that follows is left unread.
///
/// # Errors
///
/// Returns `Error::MalformedHeader` if the stream ends early, fails, or
/// announces an unusable file name.
pub async fn read_header<R>(reader: &mut R) -> Result<TransferHeader>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; NAME_LENGTH_SIZE];
    read_field(reader, &mut len_buf, "name length").await?;
    let name_len = u32::from_le_bytes(len_buf);

    if name_len > MAX_FILE_NAME_LEN {
        return Err(Error::malformed(format!(
            "file name length {name_len} exceeds limit of {MAX_FILE_NAME_LEN}"
        )));
    }

    let mut name_buf = vec![0u8; name_len as usize];
    read_field(reader, &mut name_buf, "file name").await?;
    let file_name = String::from_utf8(name_buf)
        .map_err(|e| Error::malformed(format!("file name is not valid UTF-8: {e}")))?;

    let mut size_buf = [0u8; FILE_SIZE_SIZE];
    read_field(reader, &mut size_buf, "file size").await?;
    let file_size = u64::from_le_bytes(size_buf);

    Ok(TransferHeader {
        file_name,
        file_size,
    })
}

/// Read a header from a stream with a timeout.
///
/// # Errors
///
/// Returns `Error::MalformedHeader` with a `TimedOut` cause if the header
/// does not arrive within `duration`, or any error from [`read_header`].
pub async fn read_header_with_timeout<R>(
    reader: &mut R,
    duration: Duration,
) -> Result<TransferHeader>
where
    R: AsyncRead + Unpin,
{
    timeout(duration, read_header(reader))
        .await
        .map_err(|_| Error::MalformedHeader {
            reason: format!("no complete header within {duration:?}"),
            source: Some(io::Error::from(io::ErrorKind::TimedOut)),
        })?
}

async fn read_field<R>(reader: &mut R, buf: &mut [u8], field: &str) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(|e| Error::MalformedHeader {
                reason: format!("failed reading {field}"),
                source: Some(e),
            })?;
        if n == 0 {
            return Err(Error::malformed(format!(
                "connection closed after {filled} of {} bytes of {field}",
                buf.len()
            )));
        }
        filled += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_malformed(result: Result<TransferHeader>) -> String {
        match result {
            Err(Error::MalformedHeader { reason, .. }) => reason,
            other => panic!("Expected MalformedHeader, got: {other:?}"),
        }
    }

    #[test]
    fn test_encode_layout() {
        let header = TransferHeader::new("a.txt", 258).expect("header");
        let encoded = header.encode();

        assert_eq!(encoded.len(), header.encoded_len());
        assert_eq!(&encoded[0..4], &[5, 0, 0, 0]);
        assert_eq!(&encoded[4..9], b"a.txt");
        assert_eq!(&encoded[9..17], &[2, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_counts_utf8_bytes() {
        let header = TransferHeader::new("résumé.pdf", 0).expect("header");
        let encoded = header.encode();

        let len = u32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]);
        assert_eq!(len as usize, "résumé.pdf".len());
        assert_eq!(len, 12);
    }

    #[test]
    fn test_new_rejects_long_name() {
        let name = "x".repeat(MAX_FILE_NAME_LEN as usize + 1);
        let result = TransferHeader::new(name, 1);
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let name = "x".repeat(MAX_FILE_NAME_LEN as usize);
        assert!(TransferHeader::new(name, 1).is_ok());
    }

    #[tokio::test]
    async fn test_read_write_header() {
        let header = TransferHeader::new("report.pdf", 200_000).expect("header");
        let mut buffer = Vec::new();
        write_header(&mut buffer, &header).await.expect("write");
        buffer.extend_from_slice(b"payload");

        let mut cursor = std::io::Cursor::new(buffer);
        let decoded = read_header(&mut cursor).await.expect("read");
        assert_eq!(decoded, header);

        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).await.expect("read rest");
        assert_eq!(rest, b"payload");
    }

    #[tokio::test]
    async fn test_read_header_split_across_reads() {
        let header = TransferHeader::new("split.bin", u64::MAX).expect("header");
        let encoded = header.encode();

        let (mut client, mut server) = tokio::io::duplex(3);
        let writer = tokio::spawn(async move {
            client.write_all(&encoded).await.expect("write");
        });

        let decoded = read_header(&mut server).await.expect("read");
        assert_eq!(decoded.file_name(), "split.bin");
        assert_eq!(decoded.file_size(), u64::MAX);
        writer.await.expect("writer task");
    }

    #[tokio::test]
    async fn test_truncated_length_prefix() {
        let mut cursor = std::io::Cursor::new(vec![5u8, 0]);
        let reason = assert_malformed(read_header(&mut cursor).await);
        assert!(reason.contains("2 of 4"), "unexpected reason: {reason}");
    }

    #[tokio::test]
    async fn test_truncated_name() {
        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"abc");
        let mut cursor = std::io::Cursor::new(bytes);
        let reason = assert_malformed(read_header(&mut cursor).await);
        assert!(reason.contains("file name"));
    }

    #[tokio::test]
    async fn test_truncated_size() {
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.push(b'a');
        bytes.extend_from_slice(&[1, 2, 3]);
        let mut cursor = std::io::Cursor::new(bytes);
        let reason = assert_malformed(read_header(&mut cursor).await);
        assert!(reason.contains("3 of 8"));
    }

    #[tokio::test]
    async fn test_oversized_name_length() {
        let mut cursor = std::io::Cursor::new((MAX_FILE_NAME_LEN + 1).to_le_bytes().to_vec());
        let reason = assert_malformed(read_header(&mut cursor).await);
        assert!(reason.contains("exceeds limit"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_name() {
        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        bytes.extend_from_slice(&0u64.to_le_bytes());
        let mut cursor = std::io::Cursor::new(bytes);
        let reason = assert_malformed(read_header(&mut cursor).await);
        assert!(reason.contains("UTF-8"));
    }

    #[tokio::test]
    async fn test_empty_name_decodes() {
        let mut bytes = 0u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&7u64.to_le_bytes());
        let mut cursor = std::io::Cursor::new(bytes);
        let decoded = read_header(&mut cursor).await.expect("read");
        assert_eq!(decoded.file_name(), "");
        assert_eq!(decoded.file_size(), 7);
    }

    #[tokio::test]
    async fn test_read_header_with_timeout_expires() {
        struct NeverReadyReader;

        impl AsyncRead for NeverReadyReader {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<io::Result<()>> {
                std::task::Poll::Pending
            }
        }

        let mut reader = NeverReadyReader;
        let result = read_header_with_timeout(&mut reader, Duration::from_millis(50)).await;
        match result {
            Err(Error::MalformedHeader {
                reason,
                source: Some(e),
            }) => {
                assert_eq!(e.kind(), io::ErrorKind::TimedOut);
                assert!(reason.contains("50ms"), "reason was {reason:?}");
            }
            other => panic!("Expected timed out MalformedHeader, got: {other:?}"),
        }
    }
}
