//! Entity registry: RDF identifier → store-entity id.
//!
//! The registry is what makes entity creation happen at most once per RDF
//! identifier. The adapter consults it before creating anything in the store
//! and records every new id right after the store assigns it.
//!
//! Two backends:
//! - [`MemoryRegistry`]: process-local, used in tests and dry runs.
//! - [`JsonFileRegistry`]: loaded once at start-up, rewritten on every `put`.
//!
//! Neither backend makes read-then-create atomic across processes. Run all
//! resolution for a registry file through a single writer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const REGISTRY_FILE_VERSION_V1: &str = "ontosync_registry_v1";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed registry file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported registry file version `{found}` in {path}")]
    Version { path: PathBuf, found: String },
}

/// Identifier → entity-id mapping with durable writes.
pub trait EntityRegistry: Send {
    fn get(&self, identifier: &str) -> Option<String>;

    /// Record a mapping. Durable backends persist before returning.
    fn put(&mut self, identifier: &str, entity_id: &str) -> Result<(), RegistryError>;

    /// Forget every mapping.
    fn reset(&mut self) -> Result<(), RegistryError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All mappings ordered by identifier.
    fn entries(&self) -> Vec<(String, String)>;
}

impl<R: EntityRegistry + ?Sized> EntityRegistry for Box<R> {
    fn get(&self, identifier: &str) -> Option<String> {
        (**self).get(identifier)
    }

    fn put(&mut self, identifier: &str, entity_id: &str) -> Result<(), RegistryError> {
        (**self).put(identifier, entity_id)
    }

    fn reset(&mut self) -> Result<(), RegistryError> {
        (**self).reset()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn entries(&self) -> Vec<(String, String)> {
        (**self).entries()
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    entries: BTreeMap<String, String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<(String, String)> for MemoryRegistry {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl EntityRegistry for MemoryRegistry {
    fn get(&self, identifier: &str) -> Option<String> {
        self.entries.get(identifier).cloned()
    }

    fn put(&mut self, identifier: &str, entity_id: &str) -> Result<(), RegistryError> {
        self.entries
            .insert(identifier.to_string(), entity_id.to_string());
        Ok(())
    }

    fn reset(&mut self) -> Result<(), RegistryError> {
        self.entries.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// ============================================================================
// JSON file
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFileV1 {
    version: String,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Registry backed by a JSON file.
///
/// The whole file is rewritten (temp file + rename) on each `put`/`reset`,
/// so a crash leaves either the old or the new mapping set on disk.
///
/// A mapping whose write failed stays in memory: the store entity exists, so
/// forgetting it would create a duplicate on the next lookup. The next
/// successful write (or [`JsonFileRegistry::flush`]) puts it on disk.
#[derive(Debug)]
pub struct JsonFileRegistry {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    unsaved: bool,
}

impl JsonFileRegistry {
    /// Load the registry at `path`. A missing file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| RegistryError::Io {
                path: path.clone(),
                source,
            })?;
            let file: RegistryFileV1 =
                serde_json::from_str(&text).map_err(|source| RegistryError::Format {
                    path: path.clone(),
                    source,
                })?;
            if file.version != REGISTRY_FILE_VERSION_V1 {
                return Err(RegistryError::Version {
                    path,
                    found: file.version,
                });
            }
            file.entries
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded entity registry");
        Ok(Self {
            path,
            entries,
            unsaved: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether memory holds mappings the file does not.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Retry writing mappings left over from a failed write.
    pub fn flush(&mut self) -> Result<(), RegistryError> {
        if self.unsaved {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<(), RegistryError> {
        self.unsaved = true;
        self.write_file()?;
        self.unsaved = false;
        Ok(())
    }

    fn write_file(&self) -> Result<(), RegistryError> {
        let io_err = |source| RegistryError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = RegistryFileV1 {
            version: REGISTRY_FILE_VERSION_V1.to_string(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| RegistryError::Format {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl EntityRegistry for JsonFileRegistry {
    fn get(&self, identifier: &str) -> Option<String> {
        self.entries.get(identifier).cloned()
    }

    fn put(&mut self, identifier: &str, entity_id: &str) -> Result<(), RegistryError> {
        self.entries.insert(identifier.to_string(), entity_id.to_string());
        self.persist().inspect_err(|err| {
            tracing::warn!(
                path = %self.path.display(),
                identifier,
                entity_id,
                error = %err,
                "registry write failed; mapping kept in memory"
            );
        })
    }

    fn reset(&mut self) -> Result<(), RegistryError> {
        self.entries.clear();
        self.persist()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
