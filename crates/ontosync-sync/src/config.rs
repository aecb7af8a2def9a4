//! Synchronization settings.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is a
//! valid configuration.

use anyhow::{Context, Result};
use ontosync_rdf::vocab::{
    RDFS_COMMENT, RDFS_LABEL, SCHEMA_DESCRIPTION, SCHEMA_NAME, SKOS_ALT_LABEL, SKOS_PREF_LABEL,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Language used for labels and descriptions given without a language tag.
    pub default_language: String,
    /// Descriptions longer than this many characters are cut.
    pub description_max_len: usize,
    pub predicates: PredicateVocabulary,
    pub registry_path: PathBuf,
    /// Classify properties and ranges from the snapshots before planning.
    pub annotate: bool,
    /// Group planned operations into one batch per subject.
    pub optimize: bool,
    /// File extensions (without dot) treated as ontology files in a push.
    pub ontology_extensions: Vec<String>,
    pub mapping: Option<MappingConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            description_max_len: 250,
            predicates: PredicateVocabulary::default(),
            registry_path: PathBuf::from("uris.json"),
            annotate: true,
            optimize: false,
            ontology_extensions: vec!["ttl".to_string()],
            mapping: None,
        }
    }
}

impl SyncConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: SyncConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }
}

/// What a predicate means to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateRole {
    Label,
    Description,
    Alias,
    /// Anything else: written as a statement.
    Statement,
}

/// Predicate IRIs that map onto entity metadata instead of statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredicateVocabulary {
    pub labels: BTreeSet<String>,
    pub descriptions: BTreeSet<String>,
    pub aliases: BTreeSet<String>,
}

impl Default for PredicateVocabulary {
    fn default() -> Self {
        let set = |iris: &[&str]| iris.iter().map(|s| s.to_string()).collect();
        Self {
            labels: set(&[RDFS_LABEL, SKOS_PREF_LABEL, SCHEMA_NAME]),
            descriptions: set(&[RDFS_COMMENT, SCHEMA_DESCRIPTION]),
            aliases: set(&[SKOS_ALT_LABEL]),
        }
    }
}

impl PredicateVocabulary {
    /// Labels win over descriptions, descriptions over aliases, if an IRI is
    /// configured in more than one set.
    pub fn classify(&self, predicate: &str) -> PredicateRole {
        if self.labels.contains(predicate) {
            PredicateRole::Label
        } else if self.descriptions.contains(predicate) {
            PredicateRole::Description
        } else if self.aliases.contains(predicate) {
            PredicateRole::Alias
        } else {
            PredicateRole::Statement
        }
    }
}

/// Link every new store entity back to its RDF identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Predicate IRI of the url-typed mapping property.
    pub predicate: String,
    /// Identifiers under these namespaces get no mapping statement.
    #[serde(default)]
    pub skip_namespaces: Vec<String>,
}

impl MappingConfig {
    pub fn applies_to(&self, identifier: &str) -> bool {
        identifier != self.predicate
            && !self
                .skip_namespaces
                .iter()
                .any(|ns| identifier.starts_with(ns.as_str()))
    }
}
