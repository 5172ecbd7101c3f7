//! Progress of the startup classification pass.
//!
//! The pipeline reports one unit per classified link through
//! [`ProgressCallback`]. The `accidents_cli` binary draws a terminal bar for
//! it; library callers and tests get [`NullProgress`].

use std::sync::Arc;

/// Receives link classification progress from the pipeline.
pub trait ProgressCallback: Send + Sync {
    /// Number of links about to be classified.
    fn set_total(&self, total: u64);

    /// `delta` more links are classified.
    fn inc(&self, delta: u64);

    /// Classification is done; `msg` summarises it.
    fn finish(&self, msg: String);
}

/// Discards all progress.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
}

/// The pipeline's default progress sink.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
