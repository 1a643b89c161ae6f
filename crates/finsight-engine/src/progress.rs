//! Run progress reporting
//!
//! Progress callbacks are caller-supplied and run synchronously inside the
//! pipeline; a misbehaving callback must never take the run down with it, so
//! emission guards against panics and logs them instead.

use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::warn;

/// Snapshot of run progress delivered after each stage or parallel group
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    /// Label of the phase or stage that just advanced
    pub current_phase: String,
    /// Wire names of completed stages, in completion order
    pub completed_stages: Vec<String>,
    /// Stage count fixed at run start from the feature flags
    pub total_stages: usize,
    /// `round(completed / total * 100)`
    pub percentage: u32,
}

/// Caller-supplied progress sink
pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Invoke the callback, swallowing any panic it raises
pub(crate) fn emit(callback: Option<&ProgressCallback>, update: &ProgressUpdate) {
    if let Some(callback) = callback {
        if catch_unwind(AssertUnwindSafe(|| callback(update))).is_err() {
            warn!(
                phase = %update.current_phase,
                "progress callback panicked; continuing run"
            );
        }
    }
}
