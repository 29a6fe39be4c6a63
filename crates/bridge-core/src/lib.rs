//! # Bridge Core Library
//!
//! `bridge-core` moves a single file from one host to another over a plain
//! TCP connection. The sender announces the file with a small header and
//! streams its bytes; the receiver writes them into a destination directory.
//!
//! ## Features
//!
//! - **Minimal wire format**: name length, name, size, then raw content
//! - **Bounded memory**: files are streamed in fixed-size chunks
//! - **Safe names**: announced file names are reduced to a single segment
//! - **Progress and cancellation**: pluggable progress sinks, token-based cancel
//!
//! ## Modules
//!
//! - [`config`] - Configuration management
//! - [`connection`] - Address parsing and socket tuning
//! - [`error`] - Error taxonomy
//! - [`mod@file`] - Source files, name sanitization, and file writing
//! - [`progress`] - Progress sinks
//! - [`protocol`] - Header encoding and decoding
//! - [`transfer`] - Sender and receiver
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bridge_core::progress::NoopSink;
//! use bridge_core::transfer::{listen, send_file};
//!
//! // On the receiving host
//! let summary = listen(12345, "downloads", Arc::new(NoopSink)).await?;
//!
//! // On the sending host
//! let summary = send_file("192.168.1.20".parse()?, 12345, "report.pdf", Arc::new(NoopSink)).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

use std::time::Duration;

pub mod config;
pub mod connection;
pub mod error;
pub mod file;
pub mod progress;
pub mod protocol;
pub mod transfer;

pub use error::{Error, ErrorKind, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default TCP port
pub const DEFAULT_PORT: u16 = 12345;

/// Default chunk size for file transfers (80 KB)
pub const DEFAULT_CHUNK_SIZE: usize = 80 * 1024;

/// Default time allowed for the sender to connect
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed for the receiver to read a complete header
pub const DEFAULT_HEADER_TIMEOUT: Duration = Duration::from_secs(30);
