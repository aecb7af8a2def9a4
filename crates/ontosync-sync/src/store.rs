//! Triple-level store contract consumed by operation execution.

use crate::SyncError;
use async_trait::async_trait;
use ontosync_rdf::{ChangeKind, Triple, UriTerm};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one store mutation.
///
/// Store-reported failures are data (`successful == false`), never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationResult {
    pub successful: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
}

impl ModificationResult {
    pub fn success(result_id: Option<String>) -> Self {
        Self {
            successful: true,
            message: String::new(),
            result_id,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            successful: false,
            message: message.into(),
            result_id: None,
        }
    }

    /// Fold the results of a batch into one: successful only if every part
    /// was, with the failure messages joined.
    pub fn merge(results: impl IntoIterator<Item = ModificationResult>) -> Self {
        let mut failures = Vec::new();
        let mut result_id = None;
        for result in results {
            if result.successful {
                result_id = result.result_id.or(result_id);
            } else {
                failures.push(result.message);
            }
        }
        if failures.is_empty() {
            Self::success(result_id)
        } else {
            Self {
                successful: false,
                message: failures.join("; "),
                result_id,
            }
        }
    }
}

impl fmt::Display for ModificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.successful, &self.result_id) {
            (true, Some(id)) => write!(f, "ok ({id})"),
            (true, None) => f.write_str("ok"),
            (false, _) => write!(f, "failed: {}", self.message),
        }
    }
}

#[async_trait]
pub trait TripleStoreManager: Send {
    async fn create_triple(&mut self, triple: &Triple) -> Result<ModificationResult, SyncError>;

    async fn remove_triple(&mut self, triple: &Triple) -> Result<ModificationResult, SyncError>;

    /// Apply every change for `subject` in order. Not a transaction: earlier
    /// changes stay applied when a later one fails.
    async fn batch_update(
        &mut self,
        subject: &UriTerm,
        changes: &[(ChangeKind, Triple)],
    ) -> Result<ModificationResult, SyncError> {
        tracing::debug!(subject = %subject, changes = changes.len(), "applying batch");
        let mut results = Vec::with_capacity(changes.len());
        for (change, triple) in changes {
            let result = match change {
                ChangeKind::Addition => self.create_triple(triple).await?,
                ChangeKind::Removal => self.remove_triple(triple).await?,
            };
            results.push(result);
        }
        Ok(ModificationResult::merge(results))
    }
}
