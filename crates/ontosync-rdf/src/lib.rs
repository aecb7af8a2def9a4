//! RDF side of ontosync.
//!
//! This crate turns two Turtle snapshots of an ontology file into the typed
//! set of triples that were added and removed between them:
//!
//! ```text
//!   old.ttl ──parse──► RdfGraph ──canonicalize──┐
//!                                               ├──► GraphDiff { removals, additions, skipped }
//!   new.ttl ──parse──► RdfGraph ──canonicalize──┘            │
//!                                                            ▼
//!                                           OntologyMetadata::annotate
//! ```
//!
//! - [`graph`]: raw statements as parsed by Sophia, plus blank-node
//!   canonicalization so re-serialized files do not produce spurious changes.
//! - [`term`]: the typed term model and the store datatype table.
//! - [`diff`]: the set difference in both directions.
//! - [`annotate`]: property classification and ranges taken from the snapshots.
//!
//! Everything here is pure and synchronous.

pub mod annotate;
pub mod diff;
pub mod graph;
pub mod term;
pub mod triple;
pub mod vocab;

pub use annotate::OntologyMetadata;
pub use diff::{ChangeKind, GraphDiff, SkippedTriple};
pub use graph::{RdfGraph, RdfLiteral, RdfNode, RdfObject, RdfStatement};
pub use term::{EntityKind, LiteralTerm, StoreDatatype, Term, TermError, UriTerm};
pub use triple::Triple;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RdfError {
    /// The document is not valid Turtle. Fatal for that file only.
    #[error("invalid ontology syntax: {0}")]
    InvalidOntologySyntax(String),

    #[error(transparent)]
    Term(#[from] TermError),
}
