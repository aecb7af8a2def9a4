//! Applying plans to a store.
//!
//! [`execute_operations`] runs a plan in order and never stops early.
//! [`SyncWorker`] owns a store on a background task so all resolution for a
//! process happens in one place, one job at a time.

use crate::operations::SyncOperation;
use crate::store::{ModificationResult, TripleStoreManager};
use crate::SyncError;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Results of one execution, index-aligned with the operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub results: Vec<ModificationResult>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.successful).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn all_successful(&self) -> bool {
        self.results.iter().all(|r| r.successful)
    }
}

/// Execute `operations` in order. Store rejections stay in the report as
/// failed results; transport and registry faults are logged and recorded as
/// failed results too.
pub async fn execute_operations<S>(store: &mut S, operations: &[SyncOperation]) -> SyncReport
where
    S: TripleStoreManager + ?Sized,
{
    let mut results = Vec::with_capacity(operations.len());
    for operation in operations {
        tracing::debug!(operation = %operation, "executing");
        let result = match operation.execute(&mut *store).await {
            Ok(result) => {
                if !result.successful {
                    tracing::warn!(
                        operation = %operation,
                        message = %result.message,
                        "operation failed"
                    );
                }
                result
            }
            Err(err) => {
                tracing::error!(operation = %operation, error = %err, "operation aborted");
                ModificationResult::failure(err.to_string())
            }
        };
        results.push(result);
    }
    let report = SyncReport { results };
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "executed operations"
    );
    report
}

// ============================================================================
// Worker
// ============================================================================

struct SyncJob {
    operations: Vec<SyncOperation>,
    reply: oneshot::Sender<SyncReport>,
}

/// Handle to a running [`SyncWorker`]. Cloneable; the worker stops once every
/// handle is dropped.
#[derive(Debug, Clone)]
pub struct SyncWorkerHandle {
    sender: mpsc::Sender<SyncJob>,
}

impl SyncWorkerHandle {
    /// Queue a plan and wait for its report. Jobs run in submission order.
    pub async fn submit(&self, operations: Vec<SyncOperation>) -> Result<SyncReport, SyncError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(SyncJob { operations, reply })
            .await
            .map_err(|_| SyncError::WorkerClosed)?;
        response.await.map_err(|_| SyncError::WorkerClosed)
    }
}

pub struct SyncWorker;

impl SyncWorker {
    pub const DEFAULT_QUEUE: usize = 64;

    /// Move `store` onto a background task. The join handle yields the store
    /// back after the last handle is dropped.
    pub fn spawn<S>(store: S) -> (SyncWorkerHandle, JoinHandle<S>)
    where
        S: TripleStoreManager + 'static,
    {
        Self::spawn_with_capacity(store, Self::DEFAULT_QUEUE)
    }

    pub fn spawn_with_capacity<S>(
        mut store: S,
        capacity: usize,
    ) -> (SyncWorkerHandle, JoinHandle<S>)
    where
        S: TripleStoreManager + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<SyncJob>(capacity.max(1));
        let task = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let report = execute_operations(&mut store, &job.operations).await;
                if job.reply.send(report).is_err() {
                    tracing::debug!("submitter went away before the report was ready");
                }
            }
            tracing::debug!("sync worker stopped");
            store
        });
        (SyncWorkerHandle { sender }, task)
    }
}
