//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free, concurrency-optimized progress bars

use linya::{Bar, Progress};

/// Progress bar over a byte stream (payload digests, archive writes)
pub struct ByteProgress {
  progress: Progress,
  bar: Bar,
}

impl ByteProgress {
  /// Create a new progress bar spanning `total` bytes
  pub fn new(total: u64, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total as usize, label.into());
    Self { progress, bar }
  }

  /// Advance by the size of the chunk just processed
  pub fn inc(&mut self, bytes: usize) {
    self.progress.inc_and_draw(&self.bar, bytes);
  }
}
