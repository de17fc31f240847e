//! Progress reporting for batch queries.
//!
//! The engine only reports through [`ProgressCallback`]; whether that ends
//! up as a terminal progress bar, log lines, or nothing is up to the
//! caller.

use std::sync::Arc;

/// Receives progress updates from a running batch.
///
/// Updates arrive from rayon worker threads, hence `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Number of coordinates the batch will evaluate.
    fn set_total(&self, total: u64);

    /// `delta` more coordinates have been evaluated.
    fn inc(&self, delta: u64);

    /// The batch is done.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
}

/// Shared [`NullProgress`] for callers that do not display progress.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
