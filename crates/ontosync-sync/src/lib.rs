//! Ontosync: replay ontology changes against a Wikibase-style store.
//!
//! ## Pipeline
//!
//! ```text
//!  old.ttl ─┐
//!           ├─► OntologySynchronizer ──► Vec<SyncOperation> ──► execute_operations / SyncWorker
//!  new.ttl ─┘   (diff → annotate → ops)        (optimize)                  │
//!                                                                         ▼
//!                                              WikibaseAdapter (TripleStoreManager)
//!                                                EntityRegistry ◄──► WikibaseClient
//! ```
//!
//! - [`synchronizer`] plans; it never touches the store.
//! - [`adapter`] applies single triples, resolving identifiers through the
//!   registry with create-on-first-use.
//! - [`executor`] runs plans in order and keeps going after failures.
//! - [`memory`] is a complete in-process store used by tests and the CLI.

pub mod adapter;
pub mod client;
pub mod config;
pub mod executor;
pub mod memory;
pub mod operations;
pub mod store;
pub mod synchronizer;
pub mod values;

pub use adapter::WikibaseAdapter;
pub use client::{ClientError, NewEntity, Statement, StatementValue, WikibaseClient};
pub use config::{MappingConfig, PredicateRole, PredicateVocabulary, SyncConfig};
pub use executor::{execute_operations, SyncReport, SyncWorker, SyncWorkerHandle};
pub use memory::{ClientCall, InMemoryWikibase, StoreSnapshot};
pub use operations::{optimize, Batch, SyncOperation};
pub use store::{ModificationResult, TripleStoreManager};
pub use synchronizer::{FilePlan, OntologyFile, OntologySynchronizer, SyncPlan};

use ontosync_registry::RegistryError;

/// Faults that stop a single store call from completing. Store rejections
/// are not errors; they come back as failed [`ModificationResult`]s.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("store transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("sync worker is no longer running")]
    WorkerClosed,
}
