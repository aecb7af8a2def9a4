//! Triple-level delta between two ontology snapshots.

use crate::graph::{RdfGraph, RdfStatement};
use crate::term::TermError;
use crate::triple::Triple;
use crate::RdfError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Addition,
    Removal,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addition => f.write_str("addition"),
            Self::Removal => f.write_str("removal"),
        }
    }
}

/// A changed statement that could not be typed into a [`Triple`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTriple {
    pub change: ChangeKind,
    pub statement: RdfStatement,
    pub reason: TermError,
}

impl fmt::Display for SkippedTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.change, self.statement, self.reason)
    }
}

/// Result of diffing two snapshots.
///
/// `removals` and `additions` are in canonical statement order. The
/// canonicalized snapshots are kept for the annotation pass.
#[derive(Debug, Clone, Default)]
pub struct GraphDiff {
    pub source: RdfGraph,
    pub target: RdfGraph,
    pub removals: Vec<Triple>,
    pub additions: Vec<Triple>,
    pub skipped: Vec<SkippedTriple>,
}

impl GraphDiff {
    /// Parse both Turtle texts and diff them.
    pub fn compute(source_text: &str, target_text: &str) -> Result<Self, RdfError> {
        let source = RdfGraph::parse_turtle(source_text)?;
        let target = RdfGraph::parse_turtle(target_text)?;
        Ok(Self::between(&source, &target))
    }

    pub fn between(source: &RdfGraph, target: &RdfGraph) -> Self {
        let source = source.canonicalize();
        let target = target.canonicalize();

        let mut skipped = Vec::new();
        let removals = type_statements(
            source.difference(&target),
            ChangeKind::Removal,
            &mut skipped,
        );
        let additions = type_statements(
            target.difference(&source),
            ChangeKind::Addition,
            &mut skipped,
        );

        Self {
            source,
            target,
            removals,
            additions,
            skipped,
        }
    }

    /// True when neither snapshot has a statement the other lacks.
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty() && self.skipped.is_empty()
    }
}

fn type_statements<'a>(
    statements: impl Iterator<Item = &'a RdfStatement>,
    change: ChangeKind,
    skipped: &mut Vec<SkippedTriple>,
) -> Vec<Triple> {
    let mut triples = Vec::new();
    for statement in statements {
        match Triple::from_raw(statement) {
            Ok(triple) => triples.push(triple),
            Err(reason) => {
                tracing::warn!(
                    %change,
                    statement = %statement,
                    error = %reason,
                    "skipping changed statement"
                );
                skipped.push(SkippedTriple {
                    change,
                    statement: statement.clone(),
                    reason,
                });
            }
        }
    }
    triples
}
