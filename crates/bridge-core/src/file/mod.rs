//! File operations for Bridge.
//!
//! This module handles:
//! - Resolving the file to send
//! - Sanitizing announced file names
//! - Writing received content to disk

use std::path::{Component, Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// A local file opened for sending.
#[derive(Debug)]
pub struct SourceFile {
    /// Open handle, positioned at the start
    pub file: File,
    /// Name announced to the receiver
    pub name: String,
    /// Size in bytes at the time it was opened
    pub size: u64,
}

impl SourceFile {
    /// Open a regular file for sending.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the path does not exist, is not a
    /// regular file, or cannot be opened for reading.
    pub async fn open(path: &Path) -> Result<Self> {
        let not_found = |source: Option<std::io::Error>| Error::FileNotFound {
            path: path.display().to_string(),
            source,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| not_found(Some(e)))?;
        if !metadata.is_file() {
            return Err(not_found(None));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| not_found(None))?;

        let file = File::open(path).await.map_err(|e| not_found(Some(e)))?;

        Ok(Self {
            file,
            name,
            size: metadata.len(),
        })
    }
}

/// Reduce an announced file name to a single safe path segment.
///
/// Both `/` and `\` are treated as separators whatever the platform, and
/// empty, `.` and `..` segments are dropped. The last remaining segment is
/// kept byte for byte, so a name without separators comes back unchanged.
///
/// Returns `None` if nothing usable is left, or if the segment contains a
/// NUL byte (or, on Windows, a `:`).
#[must_use]
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let segment = name
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .last()?;

    if segment.contains('\0') {
        return None;
    }

    // Drive prefixes and alternate data streams.
    #[cfg(windows)]
    if segment.contains(':') {
        return None;
    }

    Some(segment.to_string())
}

/// Sanitize a path to prevent directory traversal attacks.
///
/// # Arguments
///
/// * `base` - Base directory
/// * `relative` - Relative path from base
///
/// # Returns
///
/// The joined path, or None if it would escape `base`.
#[must_use]
pub fn sanitize_path(base: &Path, relative: &Path) -> Option<PathBuf> {
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return None,
        }
    }

    let full_path = base.join(relative);

    if full_path.starts_with(base) {
        Some(full_path)
    } else {
        None
    }
}

/// Format a file size for display.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Writer for received file content.
#[derive(Debug)]
pub struct FileWriter {
    /// Output file path
    pub output_path: PathBuf,
    /// File handle
    file: Option<File>,
    /// Bytes written so far
    pub bytes_written: u64,
}

impl FileWriter {
    /// Create a new file writer, truncating any existing file.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub async fn create(output_path: PathBuf) -> std::io::Result<Self> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = File::create(&output_path).await?;

        Ok(Self {
            output_path,
            file: Some(file),
            bytes_written: 0,
        })
    }

    /// Append a chunk to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_chunk(&mut self, data: &[u8]) -> std::io::Result<()> {
        if let Some(ref mut file) = self.file {
            file.write_all(data).await?;
        }
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush and sync the file to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be synced.
    pub async fn finalize(mut self) -> std::io::Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(self.output_path)
    }

    /// Close the file and remove it from disk.
    pub async fn discard(mut self) {
        self.file = None;
        match tokio::fs::remove_file(&self.output_path).await {
            Ok(()) => tracing::warn!("Removed partial file {}", self.output_path.display()),
            Err(e) => tracing::warn!(
                "Could not remove partial file {}: {}",
                self.output_path.display(),
                e
            ),
        }
    }
}
