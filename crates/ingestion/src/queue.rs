//! In-process job queue for materialization work
//!
//! Submission returns immediately; a single worker task drains jobs in
//! order. The upload request never blocks on ETL work and never observes
//! its result directly - completion is discovered by polling the dataset.

use crate::processor::materialize_dataset;
use crate::source::RawRow;
use salesforge_common::db::Repository;
use salesforge_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// One unit of materialization work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializeJob {
    pub dataset_id: Uuid,
    pub rows: Vec<RawRow>,
}

/// Handle for submitting materialization jobs
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<MaterializeJob>,
}

impl JobQueue {
    /// Spawn the worker task and return a submission handle.
    ///
    /// Jobs for different datasets are independent; running them off one
    /// worker keeps ETL memory bounded without any cross-dataset locking.
    pub fn start(repo: Repository) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<MaterializeJob>();

        tokio::spawn(async move {
            info!("Materialization worker started");
            while let Some(job) = rx.recv().await {
                materialize_dataset(&repo, job.dataset_id, job.rows).await;
            }
            info!("Materialization worker stopped");
        });

        Self { tx }
    }

    /// Enqueue a job; returns as soon as it is accepted
    pub fn submit(&self, job: MaterializeJob) -> Result<()> {
        self.tx.send(job).map_err(|_| AppError::Internal {
            message: "Materialization worker is not running".to_string(),
        })
    }
}
