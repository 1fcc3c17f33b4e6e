//! Deployment registry
//!
//! In-memory, bounded history of deployment runs. Each accepted request gets
//! a [`DeploymentRecord`]; the pipeline keeps it current through a
//! [`RecordObserver`]. When the limit is reached the oldest record is
//! evicted, whether or not it has finished.

use oneclick_core::domain::deployment::{DeploymentRecord, RunStatus, StageRecord};
use oneclick_core::domain::stage::Stage;
use oneclick_core::dto::deployment::DeploymentSummary;
use oneclick_runner::{PipelineError, StageObserver};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

pub struct DeploymentRegistry {
    limit: usize,
    records: RwLock<VecDeque<DeploymentRecord>>,
}

impl DeploymentRegistry {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            records: RwLock::new(VecDeque::new()),
        }
    }

    /// Stores a new pending record and returns its id
    pub fn create(&self, repo_url: &str, team_slug: &str, project_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let record = DeploymentRecord::pending(id, repo_url, team_slug, project_name);

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.push_back(record);
        while records.len() > self.limit {
            if let Some(evicted) = records.pop_front() {
                tracing::debug!("Evicted deployment record {}", evicted.id);
            }
        }

        id
    }

    pub fn get(&self, id: Uuid) -> Option<DeploymentRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Summaries, newest first
    pub fn list(&self) -> Vec<DeploymentSummary> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .map(DeploymentSummary::from)
            .collect()
    }

    /// Observer that writes the progress of run `id` into its record
    pub fn observer(self: &Arc<Self>, id: Uuid) -> Arc<dyn StageObserver> {
        Arc::new(RecordObserver {
            registry: Arc::clone(self),
            id,
        })
    }

    /// Marks run `id` and its unfinished stages as failed
    ///
    /// Used when the run dies without reporting an outcome.
    pub fn mark_failed(&self, id: Uuid, error: &str, elapsed: Duration) {
        self.update(id, |record| {
            let failed = RunStatus::Error {
                error: error.to_string(),
                duration_ms: millis(elapsed),
            };
            for stage in record.stages.iter_mut().filter(|s| !s.status.is_finished()) {
                stage.status = failed.clone();
            }
            if !record.status.is_finished() {
                record.status = failed;
            }
        });
    }

    fn update(&self, id: Uuid, apply: impl FnOnce(&mut DeploymentRecord)) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = records.iter_mut().find(|r| r.id == id) {
            apply(record);
        }
    }
}

/// [`StageObserver`] bound to one record of a [`DeploymentRegistry`]
pub struct RecordObserver {
    registry: Arc<DeploymentRegistry>,
    id: Uuid,
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

impl StageObserver for RecordObserver {
    fn stage_started(&self, stage: Stage) {
        self.registry.update(self.id, |record| {
            record.stages.push(StageRecord {
                stage,
                label: stage.label().to_string(),
                status: RunStatus::Pending,
                log_lines: 0,
            });
        });
    }

    fn line_forwarded(&self, stage: Stage) {
        self.registry.update(self.id, |record| {
            if let Some(current) = record.stages.iter_mut().rev().find(|s| s.stage == stage) {
                current.log_lines += 1;
            }
        });
    }

    fn stage_finished(&self, stage: Stage, error: Option<&PipelineError>, elapsed: Duration) {
        let status = match error {
            None => RunStatus::Success {
                duration_ms: millis(elapsed),
            },
            Some(e) => RunStatus::Error {
                error: e.to_string(),
                duration_ms: millis(elapsed),
            },
        };
        self.registry.update(self.id, |record| {
            if let Some(current) = record.stages.iter_mut().rev().find(|s| s.stage == stage) {
                current.status = status;
            }
        });
    }

    fn run_finished(&self, outcome: Result<&str, &PipelineError>, elapsed: Duration) {
        self.registry.update(self.id, |record| match outcome {
            Ok(name) => {
                record.status = RunStatus::Success {
                    duration_ms: millis(elapsed),
                };
                record.deployment_name = Some(name.to_string());
            }
            Err(e) => {
                record.status = RunStatus::Error {
                    error: e.to_string(),
                    duration_ms: millis(elapsed),
                };
            }
        });
    }
}
