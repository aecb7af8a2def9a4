//! Ontology synchronizer: two file snapshots in, operation plan out.
//!
//! Pipeline: diff → annotate → build operations → (optionally) batch. No store
//! I/O happens here.

use crate::config::{PredicateRole, PredicateVocabulary, SyncConfig};
use crate::operations::{optimize, SyncOperation};
use ontosync_rdf::{ChangeKind, GraphDiff, OntologyMetadata, RdfError, SkippedTriple, Triple};

/// Operations for one file, plus the changed statements that could not be
/// turned into operations.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub operations: Vec<SyncOperation>,
    pub skipped: Vec<SkippedTriple>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.skipped.is_empty()
    }
}

/// One changed file of a push. Added files have an empty source, removed
/// files an empty target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyFile {
    pub path: String,
    pub source_content: String,
    pub target_content: String,
}

impl OntologyFile {
    pub fn new(
        path: impl Into<String>,
        source_content: impl Into<String>,
        target_content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            source_content: source_content.into(),
            target_content: target_content.into(),
        }
    }
}

/// Planning outcome for one file of a push.
#[derive(Debug)]
pub struct FilePlan {
    pub path: String,
    pub outcome: Result<SyncPlan, RdfError>,
}

#[derive(Debug, Clone)]
pub struct OntologySynchronizer {
    annotate: bool,
    optimize: bool,
    extensions: Vec<String>,
    predicates: PredicateVocabulary,
}

impl Default for OntologySynchronizer {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl OntologySynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            annotate: config.annotate,
            optimize: config.optimize,
            extensions: config.ontology_extensions.clone(),
            predicates: config.predicates.clone(),
        }
    }

    pub fn with_annotation(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    pub fn with_optimization(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// Plan the operations that turn `source` into `target`.
    ///
    /// Removals come before additions unless batching regroups them per subject.
    /// Statement literals without a store datatype are skipped here, like
    /// every other term error.
    pub fn synchronize(&self, source: &str, target: &str) -> Result<SyncPlan, RdfError> {
        let GraphDiff {
            source: source_graph,
            target: target_graph,
            removals,
            additions,
            mut skipped,
        } = GraphDiff::compute(source, target)?;
        let mut removals = self.screen(removals, ChangeKind::Removal, &mut skipped);
        let mut additions = self.screen(additions, ChangeKind::Addition, &mut skipped);

        if self.annotate {
            let metadata = OntologyMetadata::collect([&source_graph, &target_graph]);
            metadata.annotate(&mut removals);
            metadata.annotate(&mut additions);
            tracing::debug!(properties = metadata.property_count(), "annotated changed terms");
        }

        let mut operations: Vec<SyncOperation> = removals
            .into_iter()
            .map(SyncOperation::removal)
            .chain(additions.into_iter().map(SyncOperation::addition))
            .collect();
        if self.optimize {
            operations = optimize(operations);
        }

        Ok(SyncPlan {
            operations,
            skipped,
        })
    }

    /// Plan every ontology file of a push independently. A file that fails to
    /// parse only affects its own entry.
    pub fn synchronize_push(&self, files: &[OntologyFile]) -> Vec<FilePlan> {
        files
            .iter()
            .filter(|file| self.is_ontology_file(&file.path))
            .map(|file| {
                let outcome = self.synchronize(&file.source_content, &file.target_content);
                match &outcome {
                    Ok(plan) => tracing::info!(
                        path = %file.path,
                        operations = plan.operations.len(),
                        skipped = plan.skipped.len(),
                        "planned ontology file"
                    ),
                    Err(err) => tracing::warn!(
                        path = %file.path,
                        error = %err,
                        "skipping ontology file"
                    ),
                }
                FilePlan {
                    path: file.path.clone(),
                    outcome,
                }
            })
            .collect()
    }

    /// Drop statement triples whose literal object has no store datatype.
    /// Label, description and alias literals only use their text.
    fn screen(
        &self,
        triples: Vec<Triple>,
        change: ChangeKind,
        skipped: &mut Vec<SkippedTriple>,
    ) -> Vec<Triple> {
        let mut kept = Vec::with_capacity(triples.len());
        for triple in triples {
            let role = self.predicates.classify(&triple.predicate.identifier);
            let unsupported = match (role, triple.object.as_literal()) {
                (PredicateRole::Statement, Some(literal)) => literal.store_datatype().err(),
                _ => None,
            };
            match unsupported {
                None => kept.push(triple),
                Some(reason) => {
                    tracing::warn!(
                        %change,
                        triple = %triple,
                        error = %reason,
                        "skipping changed statement"
                    );
                    skipped.push(SkippedTriple {
                        change,
                        statement: triple.to_raw(),
                        reason,
                    });
                }
            }
        }
        kept
    }

    fn is_ontology_file(&self, path: &str) -> bool {
        std::path::Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}
