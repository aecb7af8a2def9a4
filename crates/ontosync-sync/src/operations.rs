//! Executable sync operations.

use crate::store::{ModificationResult, TripleStoreManager};
use crate::SyncError;
use ontosync_rdf::{ChangeKind, Triple, UriTerm};
use serde::{Deserialize, Serialize};
use std::fmt;

/// All changes for one subject, in their original order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub subject: UriTerm,
    pub changes: Vec<(ChangeKind, Triple)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum SyncOperation {
    Addition { triple: Triple },
    Removal { triple: Triple },
    Batch(Batch),
}

impl SyncOperation {
    pub fn addition(triple: Triple) -> Self {
        Self::Addition { triple }
    }

    pub fn removal(triple: Triple) -> Self {
        Self::Removal { triple }
    }

    pub fn from_change(change: ChangeKind, triple: Triple) -> Self {
        match change {
            ChangeKind::Addition => Self::addition(triple),
            ChangeKind::Removal => Self::removal(triple),
        }
    }

    pub fn subject(&self) -> &UriTerm {
        match self {
            Self::Addition { triple } | Self::Removal { triple } => &triple.subject,
            Self::Batch(batch) => &batch.subject,
        }
    }

    /// Number of triples this operation touches.
    pub fn len(&self) -> usize {
        match self {
            Self::Addition { .. } | Self::Removal { .. } => 1,
            Self::Batch(batch) => batch.changes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn execute<S>(&self, store: &mut S) -> Result<ModificationResult, SyncError>
    where
        S: TripleStoreManager + ?Sized,
    {
        match self {
            Self::Addition { triple } => store.create_triple(triple).await,
            Self::Removal { triple } => store.remove_triple(triple).await,
            Self::Batch(batch) => store.batch_update(&batch.subject, &batch.changes).await,
        }
    }

    fn into_changes(self) -> Vec<(ChangeKind, Triple)> {
        match self {
            Self::Addition { triple } => vec![(ChangeKind::Addition, triple)],
            Self::Removal { triple } => vec![(ChangeKind::Removal, triple)],
            Self::Batch(batch) => batch.changes,
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addition { triple } => write!(f, "+ {triple}"),
            Self::Removal { triple } => write!(f, "- {triple}"),
            Self::Batch(batch) => {
                write!(f, "batch {} ({} changes)", batch.subject, batch.changes.len())?;
                for (change, triple) in &batch.changes {
                    let sign = match change {
                        ChangeKind::Addition => '+',
                        ChangeKind::Removal => '-',
                    };
                    write!(f, "\n    {sign} {triple}")?;
                }
                Ok(())
            }
        }
    }
}

/// Group operations into one [`Batch`] per subject.
///
/// Subjects keep the order of their first appearance and each batch keeps the
/// relative order of its changes. Existing batches are merged into the group
/// of their subject.
pub fn optimize(operations: Vec<SyncOperation>) -> Vec<SyncOperation> {
    let mut batches: Vec<Batch> = Vec::new();
    for operation in operations {
        let subject = operation.subject().clone();
        let changes = operation.into_changes();
        match batches.iter_mut().find(|batch| batch.subject == subject) {
            Some(batch) => batch.changes.extend(changes),
            None => batches.push(Batch { subject, changes }),
        }
    }
    batches.into_iter().map(SyncOperation::Batch).collect()
}
