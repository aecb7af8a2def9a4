//! In-process Wikibase.
//!
//! Behaves like a real instance for everything the adapter does: one id
//! counter shared by items and properties (`Q1`, `P2`, `Q3`, ...), optional
//! language validation, labels/descriptions/aliases per language and an
//! ordered claim list per entity. Every call is recorded so tests can assert
//! on the exact sequence of store writes.

use crate::client::{
    ClientError, NewEntity, Statement, StatementValue, WikibaseClient, NOT_RECOGNIZED_LANGUAGE,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ontosync_rdf::{EntityKind, StoreDatatype};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// One recorded client call.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    CreateEntity(NewEntity),
    SetLabel {
        entity: String,
        label: String,
        language: String,
    },
    SetDescription {
        entity: String,
        description: String,
        language: String,
    },
    GetAliases {
        entity: String,
        language: String,
    },
    SetAliases {
        entity: String,
        aliases: Vec<String>,
        language: String,
        append: bool,
    },
    AddStatement {
        entity: String,
        statement: Statement,
    },
    RemoveStatement {
        entity: String,
        statement: Statement,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<StoreDatatype>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl EntityRecord {
    fn new(kind: EntityKind, datatype: Option<StoreDatatype>) -> Self {
        Self {
            kind,
            datatype,
            labels: BTreeMap::new(),
            descriptions: BTreeMap::new(),
            aliases: BTreeMap::new(),
            statements: Vec::new(),
        }
    }

    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels.get(language).map(String::as_str)
    }

    pub fn description(&self, language: &str) -> Option<&str> {
        self.descriptions.get(language).map(String::as_str)
    }
}

/// Serializable store contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub last_id: u64,
    pub entities: BTreeMap<String, EntityRecord>,
}

#[derive(Debug, Default)]
struct State {
    snapshot: StoreSnapshot,
    calls: Vec<ClientCall>,
}

#[derive(Debug, Default)]
pub struct InMemoryWikibase {
    state: Mutex<State>,
    languages: Option<BTreeSet<String>>,
    unavailable: AtomicBool,
}

impl InMemoryWikibase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept these language codes; others are rejected with
    /// `not-recognized-language`.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Mutex::new(State {
                snapshot,
                calls: Vec::new(),
            }),
            ..Self::default()
        }
    }

    /// Load a store file written by [`InMemoryWikibase::save`]. A missing file
    /// is an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read store {}", path.display()))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse store {}", path.display()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write store {}", path.display()))?;
        Ok(())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().snapshot.clone()
    }

    /// Make every call fail with a transport error while `true`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn entity(&self, id: &str) -> Option<EntityRecord> {
        self.state.lock().snapshot.entities.get(id).cloned()
    }

    pub fn entity_count(&self) -> usize {
        self.state.lock().snapshot.entities.len()
    }

    /// Record `call`, then run `apply` on the state unless the store is down.
    fn call<T>(
        &self,
        call: ClientCall,
        apply: impl FnOnce(&mut StoreSnapshot) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("store unavailable".to_string()));
        }
        apply(&mut state.snapshot)
    }

    fn check_language(&self, language: &str) -> Result<(), ClientError> {
        match &self.languages {
            Some(known) if !known.contains(language) => Err(ClientError::rejected(
                NOT_RECOGNIZED_LANGUAGE,
                "The supplied language code was not recognized.",
            )),
            _ => Ok(()),
        }
    }
}

fn entity_mut<'a>(
    snapshot: &'a mut StoreSnapshot,
    id: &str,
) -> Result<&'a mut EntityRecord, ClientError> {
    snapshot.entities.get_mut(id).ok_or_else(|| {
        ClientError::rejected(
            "no-such-entity",
            format!("Could not find an entity with the ID \"{id}\"."),
        )
    })
}

fn set_or_clear(map: &mut BTreeMap<String, String>, text: &str, language: &str) {
    if text.is_empty() {
        map.remove(language);
    } else {
        map.insert(language.to_string(), text.to_string());
    }
}

#[async_trait]
impl WikibaseClient for InMemoryWikibase {
    async fn create_entity(&self, entity: NewEntity) -> Result<String, ClientError> {
        self.call(ClientCall::CreateEntity(entity.clone()), |snapshot| {
            if entity.label.is_some() {
                self.check_language(&entity.language)?;
            }
            if entity.kind == EntityKind::Property && entity.datatype.is_none() {
                return Err(ClientError::rejected(
                    "param-missing",
                    "A property needs a datatype.",
                ));
            }
            snapshot.last_id += 1;
            let prefix = match entity.kind {
                EntityKind::Item => 'Q',
                EntityKind::Property => 'P',
            };
            let id = format!("{prefix}{}", snapshot.last_id);
            let datatype = match entity.kind {
                EntityKind::Item => None,
                EntityKind::Property => entity.datatype,
            };
            let mut record = EntityRecord::new(entity.kind, datatype);
            if let Some(label) = &entity.label {
                record.labels.insert(entity.language.clone(), label.clone());
            }
            snapshot.entities.insert(id.clone(), record);
            Ok(id)
        })
    }

    async fn set_label(
        &self,
        entity_id: &str,
        label: &str,
        language: &str,
    ) -> Result<(), ClientError> {
        let call = ClientCall::SetLabel {
            entity: entity_id.to_string(),
            label: label.to_string(),
            language: language.to_string(),
        };
        self.call(call, |snapshot| {
            self.check_language(language)?;
            let record = entity_mut(snapshot, entity_id)?;
            set_or_clear(&mut record.labels, label, language);
            Ok(())
        })
    }

    async fn set_description(
        &self,
        entity_id: &str,
        description: &str,
        language: &str,
    ) -> Result<(), ClientError> {
        let call = ClientCall::SetDescription {
            entity: entity_id.to_string(),
            description: description.to_string(),
            language: language.to_string(),
        };
        self.call(call, |snapshot| {
            self.check_language(language)?;
            let record = entity_mut(snapshot, entity_id)?;
            set_or_clear(&mut record.descriptions, description, language);
            Ok(())
        })
    }

    async fn aliases(&self, entity_id: &str, language: &str) -> Result<Vec<String>, ClientError> {
        let call = ClientCall::GetAliases {
            entity: entity_id.to_string(),
            language: language.to_string(),
        };
        self.call(call, |snapshot| {
            let record = entity_mut(snapshot, entity_id)?;
            Ok(record.aliases.get(language).cloned().unwrap_or_default())
        })
    }

    async fn set_aliases(
        &self,
        entity_id: &str,
        aliases: &[String],
        language: &str,
        append: bool,
    ) -> Result<(), ClientError> {
        let call = ClientCall::SetAliases {
            entity: entity_id.to_string(),
            aliases: aliases.to_vec(),
            language: language.to_string(),
            append,
        };
        self.call(call, |snapshot| {
            self.check_language(language)?;
            let record = entity_mut(snapshot, entity_id)?;
            let current = record.aliases.entry(language.to_string()).or_default();
            if !append {
                current.clear();
            }
            for alias in aliases {
                if !current.contains(alias) {
                    current.push(alias.clone());
                }
            }
            if current.is_empty() {
                record.aliases.remove(language);
            }
            Ok(())
        })
    }

    async fn add_statement(
        &self,
        entity_id: &str,
        statement: &Statement,
    ) -> Result<(), ClientError> {
        let call = ClientCall::AddStatement {
            entity: entity_id.to_string(),
            statement: statement.clone(),
        };
        self.call(call, |snapshot| {
            if let StatementValue::MonolingualText { language, .. } = &statement.value {
                self.check_language(language)?;
            }
            if !snapshot.entities.contains_key(&statement.property) {
                return Err(ClientError::rejected(
                    "no-such-entity",
                    format!("Could not find a property with the ID \"{}\".", statement.property),
                ));
            }
            let record = entity_mut(snapshot, entity_id)?;
            if !record.statements.contains(statement) {
                record.statements.push(statement.clone());
            }
            Ok(())
        })
    }

    async fn remove_statement(
        &self,
        entity_id: &str,
        statement: &Statement,
    ) -> Result<(), ClientError> {
        let call = ClientCall::RemoveStatement {
            entity: entity_id.to_string(),
            statement: statement.clone(),
        };
        self.call(call, |snapshot| {
            let record = entity_mut(snapshot, entity_id)?;
            let before = record.statements.len();
            record.statements.retain(|existing| existing != statement);
            if record.statements.len() == before {
                return Err(ClientError::rejected(
                    "no-such-claim",
                    format!("Entity {entity_id} has no statement {statement}."),
                ));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str) -> NewEntity {
        NewEntity {
            kind: EntityKind::Item,
            label: Some(label.to_string()),
            language: "en".to_string(),
            datatype: None,
        }
    }

    fn property(label: &str, datatype: StoreDatatype) -> NewEntity {
        NewEntity {
            kind: EntityKind::Property,
            label: Some(label.to_string()),
            language: "en".to_string(),
            datatype: Some(datatype),
        }
    }

    #[tokio::test]
    async fn ids_share_one_counter() {
        let store = InMemoryWikibase::new();
        assert_eq!(store.create_entity(item("Person")).await.unwrap(), "Q1");
        assert_eq!(
            store
                .create_entity(property("livesIn", StoreDatatype::ItemReference))
                .await
                .unwrap(),
            "P2"
        );
        assert_eq!(store.create_entity(item("City")).await.unwrap(), "Q3");
        assert_eq!(store.entity("P2").unwrap().datatype, Some(StoreDatatype::ItemReference));
        assert_eq!(store.entity("Q1").unwrap().label("en"), Some("Person"));
    }

    #[tokio::test]
    async fn unknown_language_is_rejected() {
        let store = InMemoryWikibase::new().with_languages(["en", "es"]);
        let id = store.create_entity(item("labra")).await.unwrap();
        let err = store.set_label(&id, "라브", "invented").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::rejected(
                NOT_RECOGNIZED_LANGUAGE,
                "The supplied language code was not recognized."
            )
        );
        assert_eq!(store.calls().len(), 2, "rejected calls are still recorded");
    }

    #[tokio::test]
    async fn aliases_append_and_replace() {
        let store = InMemoryWikibase::new();
        let id = store.create_entity(item("Person")).await.unwrap();
        store.set_aliases(&id, &["individuo".to_string()], "es", true).await.unwrap();
        store.set_aliases(&id, &["sujeto".to_string()], "es", true).await.unwrap();
        assert_eq!(store.aliases(&id, "es").await.unwrap(), ["individuo", "sujeto"]);

        store.set_aliases(&id, &["sujeto".to_string()], "es", false).await.unwrap();
        assert_eq!(store.aliases(&id, "es").await.unwrap(), ["sujeto"]);
    }

    #[tokio::test]
    async fn statements_are_added_once_and_removed_by_value() {
        let store = InMemoryWikibase::new();
        let q = store.create_entity(item("Person")).await.unwrap();
        let p = store
            .create_entity(property("altName", StoreDatatype::String))
            .await
            .unwrap();
        let statement = Statement::new(
            p,
            StatementValue::String {
                value: "Human".to_string(),
            },
        );
        store.add_statement(&q, &statement).await.unwrap();
        store.add_statement(&q, &statement).await.unwrap();
        assert_eq!(store.entity(&q).unwrap().statements.len(), 1);

        store.remove_statement(&q, &statement).await.unwrap();
        assert!(matches!(
            store.remove_statement(&q, &statement).await,
            Err(ClientError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn unavailable_store_is_a_transport_error() {
        let store = InMemoryWikibase::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.create_entity(item("Person")).await,
            Err(ClientError::Transport(_))
        ));
        store.set_unavailable(false);
        assert_eq!(store.create_entity(item("Person")).await.unwrap(), "Q1");
    }

    #[tokio::test]
    async fn snapshot_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = InMemoryWikibase::new();
        store.create_entity(item("Person")).await.unwrap();
        store.save(&path).unwrap();

        let reloaded = InMemoryWikibase::load(&path).unwrap();
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert_eq!(reloaded.create_entity(item("City")).await.unwrap(), "Q2");
        assert_eq!(InMemoryWikibase::load(dir.path().join("none.json")).unwrap().entity_count(), 0);
    }
}
