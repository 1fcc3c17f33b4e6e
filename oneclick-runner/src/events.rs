//! Progress event emission
//!
//! [`EventSink`] is the single path from the pipeline to the caller: status
//! lines, stage labels and the terminal event all go through it, and every
//! stage transition is mirrored to the run's [`StageObserver`].

use oneclick_core::domain::event::ProgressEvent;
use oneclick_core::domain::stage::Stage;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::{PipelineError, Result};
use crate::observer::StageObserver;

pub struct EventSink {
    tx: mpsc::Sender<ProgressEvent>,
    observer: Arc<dyn StageObserver>,
    current: Mutex<Option<Stage>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>, observer: Arc<dyn StageObserver>) -> Self {
        Self {
            tx,
            observer,
            current: Mutex::new(None),
        }
    }

    /// Creates a sink together with the receiving end of its channel
    pub fn channel(
        capacity: usize,
        observer: Arc<dyn StageObserver>,
    ) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx, observer), rx)
    }

    pub fn observer(&self) -> &Arc<dyn StageObserver> {
        &self.observer
    }

    /// Sends a status event
    ///
    /// Fails with [`PipelineError::Cancelled`] once the receiver is gone,
    /// since nobody is left to report to.
    pub async fn status(&self, message: impl Into<String>) -> Result<()> {
        self.send(ProgressEvent::status(message)).await
    }

    /// Forwards one line of command output
    pub async fn line(&self, line: &str) -> Result<()> {
        if let Some(stage) = self.current_stage() {
            self.observer.line_forwarded(stage);
        }
        self.status(line).await
    }

    /// Marks `stage` as current and announces its label
    pub async fn begin(&self, stage: Stage) -> Result<()> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(stage);
        self.observer.stage_started(stage);
        self.status(stage.label()).await
    }

    /// Records the end of `stage`
    pub fn end(&self, stage: Stage, error: Option<&PipelineError>, elapsed: Duration) {
        self.observer.stage_finished(stage, error, elapsed);
    }

    pub fn current_stage(&self) -> Option<Stage> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends the terminal event; a vanished receiver is ignored
    pub async fn finish(&self, event: ProgressEvent) {
        debug_assert!(event.is_terminal());
        let _ = self.tx.send(event).await;
    }

    async fn send(&self, event: ProgressEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| PipelineError::Cancelled)
    }
}
