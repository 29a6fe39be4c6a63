//! Common test utilities for `Bridge` integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bridge_core::progress::ProgressSink;
use bridge_core::transfer::{Receiver, TransferConfig};

/// Create a temporary directory for test files.
///
/// The directory will be automatically cleaned up when the returned
/// `TempDir` is dropped.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test file with the given content.
pub fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Generate random bytes for testing.
pub fn random_bytes(size: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Assert that two files have identical content.
pub fn assert_files_equal(path1: &Path, path2: &Path) {
    let content1 = std::fs::read(path1).expect("Failed to read first file");
    let content2 = std::fs::read(path2).expect("Failed to read second file");
    assert_eq!(content1, content2, "File contents differ");
}

/// Bind a receiver on an ephemeral loopback port.
pub async fn bind_receiver(output_dir: &Path, config: TransferConfig) -> Receiver {
    Receiver::bind("127.0.0.1:0".parse().unwrap(), output_dir, config)
        .await
        .expect("Failed to bind receiver")
}

/// A sink that records every reported value.
pub fn recording_sink() -> (Arc<dyn ProgressSink>, Arc<Mutex<Vec<f64>>>) {
    let values = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&values);
    let sink: Arc<dyn ProgressSink> = Arc::new(move |f: f64| {
        captured.lock().unwrap().push(f);
    });
    (sink, values)
}

/// Check the progress contract: non-decreasing, in range, one final `1.0`.
#[allow(clippy::float_cmp)]
pub fn assert_progress_contract(values: &[f64]) {
    assert!(!values.is_empty(), "No progress reported");
    assert!(
        values.windows(2).all(|w| w[0] <= w[1]),
        "Progress decreased: {values:?}"
    );
    assert!(
        values.iter().all(|v| (0.0..=1.0).contains(v)),
        "Progress out of range: {values:?}"
    );
    assert_eq!(*values.last().unwrap(), 1.0, "Last value must be 1.0");
    assert_eq!(
        values.iter().filter(|v| **v == 1.0).count(),
        1,
        "Exactly one 1.0 expected: {values:?}"
    );
}

/// Encode a header by hand, independent of the library encoder.
pub fn raw_header(name: &[u8], size: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12 + name.len());
    buf.extend_from_slice(&u32::try_from(name.len()).unwrap().to_le_bytes());
    buf.extend_from_slice(name);
    buf.extend_from_slice(&size.to_le_bytes());
    buf
}
