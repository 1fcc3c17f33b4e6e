//! Stage lifecycle hooks
//!
//! The pipeline reports stage transitions to a [`StageObserver`] alongside
//! the progress events it sends to the caller. The deploy service uses this
//! to keep its deployment records current.

use oneclick_core::domain::stage::Stage;
use std::time::Duration;

use crate::error::PipelineError;

/// Receives stage transitions of one run
///
/// All methods default to doing nothing. Implementations must not block.
pub trait StageObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}

    /// Called for every command output line forwarded during `stage`
    fn line_forwarded(&self, _stage: Stage) {}

    /// `error` is `None` when the stage succeeded
    fn stage_finished(&self, _stage: Stage, _error: Option<&PipelineError>, _elapsed: Duration) {}

    /// Called once with the deployment name or the failure
    fn run_finished(&self, _outcome: Result<&str, &PipelineError>, _elapsed: Duration) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {}
