//! Ontology metadata annotation.
//!
//! Runs between diffing and operation building: it looks at both snapshots,
//! decides which IRIs are properties (used as a predicate, typed as an
//! RDF/OWL property, or given an `rdfs:range`), and writes that kind and the
//! declared range onto every [`UriTerm`] of the changed triples.

use crate::graph::{RdfGraph, RdfNode, RdfObject};
use crate::term::{EntityKind, UriTerm};
use crate::triple::Triple;
use crate::vocab::{PROPERTY_CLASSES, RDFS_RANGE, RDF_TYPE};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OntologyMetadata {
    /// Property IRI -> declared range, if any.
    properties: BTreeMap<String, Option<String>>,
}

impl OntologyMetadata {
    /// Collect metadata from the given snapshots. A range declared in a later
    /// graph replaces one from an earlier graph.
    pub fn collect<'a>(graphs: impl IntoIterator<Item = &'a RdfGraph>) -> Self {
        let mut properties: BTreeMap<String, Option<String>> = BTreeMap::new();
        for graph in graphs {
            for statement in graph.iter() {
                properties.entry(statement.predicate.clone()).or_default();

                let RdfNode::Iri(subject) = &statement.subject else {
                    continue;
                };
                let RdfObject::Node(RdfNode::Iri(object)) = &statement.object else {
                    continue;
                };
                if statement.predicate == RDF_TYPE && PROPERTY_CLASSES.contains(&object.as_str()) {
                    properties.entry(subject.clone()).or_default();
                } else if statement.predicate == RDFS_RANGE {
                    properties.insert(subject.clone(), Some(object.clone()));
                }
            }
        }
        Self { properties }
    }

    pub fn is_property(&self, iri: &str) -> bool {
        self.properties.contains_key(iri)
    }

    pub fn range_of(&self, iri: &str) -> Option<&str> {
        self.properties.get(iri).and_then(|range| range.as_deref())
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn annotate_term(&self, term: &mut UriTerm) {
        if let Some(range) = self.properties.get(&term.identifier) {
            term.entity_kind = EntityKind::Property;
            term.property_range = range.clone();
        }
    }

    pub fn annotate(&self, triples: &mut [Triple]) {
        for triple in triples {
            for term in triple.uri_terms_mut() {
                self.annotate_term(term);
            }
        }
    }
}
