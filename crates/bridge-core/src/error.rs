//! Error types for Bridge.
//!
//! Every transfer ends in either a [`TransferSummary`](crate::transfer::TransferSummary)
//! or one of the variants below. Underlying I/O causes are kept as
//! `source` errors so callers can walk the full chain.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// A specialized `Result` type for Bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// Source file missing, not a regular file, or unreadable (E001)
    #[error("file not found: {path}")]
    FileNotFound {
        /// The path that was requested
        path: String,
        /// Why the file could not be used
        #[source]
        source: Option<io::Error>,
    },

    /// Could not connect to the receiver (E002)
    #[error("failed to connect to {addr}: {source}")]
    ConnectionFailed {
        /// Address that was dialed
        addr: SocketAddr,
        /// Underlying network error
        #[source]
        source: io::Error,
    },

    /// Could not listen for incoming transfers (E003)
    #[error("failed to listen on {addr}: {source}")]
    BindFailed {
        /// Address the listener tried to bind
        addr: SocketAddr,
        /// Underlying network error
        #[source]
        source: io::Error,
    },

    /// The transfer header could not be decoded (E004)
    #[error("malformed header: {reason}")]
    MalformedHeader {
        /// What was wrong with the header
        reason: String,
        /// Underlying I/O error, if the header read failed
        #[source]
        source: Option<io::Error>,
    },

    /// The connection ended before the announced size arrived (E005)
    #[error("connection closed after {received} of {expected} bytes")]
    TruncatedStream {
        /// Bytes actually received
        received: u64,
        /// Bytes announced in the header
        expected: u64,
    },

    /// An I/O operation failed mid-transfer (E006)
    #[error("transfer failed: {source}")]
    TransferFailed {
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Transfer was cancelled (E007)
    #[error("transfer cancelled")]
    Cancelled,

    /// Caller supplied an unusable argument
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error outside of a running transfer
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Stable classification of an [`Error`].
///
/// Front ends map these to user-facing messages; the set does not change
/// when the wording of an error does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Source file missing or unreadable
    FileNotFound,
    /// Connect-time network failure
    Connection,
    /// Listener could not be bound
    Bind,
    /// Header could not be decoded
    Protocol,
    /// Peer closed before the announced size
    TruncatedStream,
    /// I/O failure during transfer
    IoFailure,
    /// Cancelled by the caller
    Cancelled,
    /// Bad caller input
    InvalidInput,
    /// Bad configuration
    Config,
}

impl Error {
    /// Shorthand for a header error without an I/O cause.
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            reason: reason.into(),
            source: None,
        }
    }

    /// Returns the stable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::ConnectionFailed { .. } => ErrorKind::Connection,
            Self::BindFailed { .. } => ErrorKind::Bind,
            Self::MalformedHeader { .. } => ErrorKind::Protocol,
            Self::TruncatedStream { .. } => ErrorKind::TruncatedStream,
            Self::TransferFailed { .. } | Self::Io(_) => ErrorKind::IoFailure,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ConfigError(_) | Self::InvalidConfig { .. } => ErrorKind::Config,
        }
    }

    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::FileNotFound { .. } => Some("E001"),
            Self::ConnectionFailed { .. } => Some("E002"),
            Self::BindFailed { .. } => Some("E003"),
            Self::MalformedHeader { .. } => Some("E004"),
            Self::TruncatedStream { .. } => Some("E005"),
            Self::TransferFailed { .. } => Some("E006"),
            Self::Cancelled => Some("E007"),
            _ => None,
        }
    }

    /// Returns whether a fresh attempt might succeed.
    ///
    /// The engine itself never retries; this is a hint for the caller.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::TruncatedStream { .. }
                | Self::TransferFailed { .. }
        )
    }

    /// Returns a helpful suggestion for resolving the error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ConnectionFailed { .. } => Some(
                "Check the IP address and make sure the other side is running:\n\
                   bridge receive",
            ),
            Self::BindFailed { .. } => Some(
                "Another program may be using this port. Try a different one:\n\
                   bridge receive --port 12346",
            ),
            Self::TruncatedStream { .. } => Some(
                "The sender went away before the file was complete.\n\
                 The partial file was kept; ask the sender to try again.",
            ),
            Self::MalformedHeader { .. } => {
                Some("The peer does not appear to speak the Bridge protocol.")
            }
            _ => None,
        }
    }
}
