//! Store synchronization adapter.
//!
//! [`WikibaseAdapter`] implements [`TripleStoreManager`] on top of a
//! [`WikibaseClient`]. For every triple it:
//!
//! 1. resolves the subject to a store id (creating the entity on first use),
//! 2. routes label / description / alias predicates to entity metadata,
//! 3. otherwise resolves object and predicate and writes a statement.
//!
//! Resolution goes through the [`EntityRegistry`] so each RDF identifier is
//! created at most once for the lifetime of the registry. The read-then-create
//! sequence is not atomic: drive one adapter from one task (see
//! [`crate::SyncWorker`]).

use crate::client::{
    ClientError, NewEntity, Statement, StatementValue, WikibaseClient, NOT_RECOGNIZED_LANGUAGE,
};
use crate::config::{PredicateRole, SyncConfig};
use crate::store::{ModificationResult, TripleStoreManager};
use crate::values::{literal_value, reference_value};
use crate::SyncError;
use async_trait::async_trait;
use ontosync_rdf::{ChangeKind, EntityKind, LiteralTerm, StoreDatatype, Term, Triple, UriTerm};
use ontosync_registry::{EntityRegistry, RegistryError};
use std::fmt;

/// Why applying a triple stopped early.
#[derive(Debug, thiserror::Error)]
enum Abort {
    /// The store refused a write. Reported as a failed result.
    #[error("store rejected the request ({code}): {info}")]
    Rejected { code: String, info: String },

    /// Transport or registry fault. Raised to the caller.
    #[error(transparent)]
    Fault(#[from] SyncError),
}

impl From<ClientError> for Abort {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Rejected { code, info } => Abort::Rejected { code, info },
            ClientError::Transport(message) => Abort::Fault(SyncError::Transport(message)),
        }
    }
}

impl From<RegistryError> for Abort {
    fn from(err: RegistryError) -> Self {
        Abort::Fault(SyncError::Registry(err))
    }
}

enum Resolution {
    Cached(String),
    Created(String),
}

impl Resolution {
    fn into_id(self) -> String {
        match self {
            Resolution::Cached(id) | Resolution::Created(id) => id,
        }
    }
}

pub struct WikibaseAdapter<C, R> {
    client: C,
    registry: R,
    config: SyncConfig,
}

impl<C, R> fmt::Debug for WikibaseAdapter<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WikibaseAdapter")
            .field("default_language", &self.config.default_language)
            .finish_non_exhaustive()
    }
}

impl<C, R> WikibaseAdapter<C, R>
where
    C: WikibaseClient,
    R: EntityRegistry,
{
    pub fn new(client: C, registry: R, config: SyncConfig) -> Self {
        Self {
            client,
            registry,
            config,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn into_parts(self) -> (C, R) {
        (self.client, self.registry)
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn lookup(&self, term: &UriTerm) -> Option<String> {
        term.resolved_id
            .clone()
            .or_else(|| self.registry.get(&term.identifier))
    }

    /// Registry lookup, or create-and-record on a miss. `datatype` overrides
    /// the range-derived datatype when the term is created as a property.
    async fn lookup_or_create(
        &mut self,
        term: &UriTerm,
        datatype: Option<StoreDatatype>,
    ) -> Result<Resolution, Abort> {
        if let Some(id) = self.lookup(term) {
            tracing::debug!(identifier = %term.identifier, entity_id = %id, "registry hit");
            return Ok(Resolution::Cached(id));
        }

        let label = term.infer_label().map(str::to_string);
        if label.is_none() {
            tracing::warn!(
                identifier = %term.identifier,
                "no label could be inferred; creating entity without one"
            );
        }
        let datatype = match term.entity_kind {
            EntityKind::Item => None,
            EntityKind::Property => Some(datatype.unwrap_or_else(|| term.range_datatype())),
        };
        let entity = NewEntity {
            kind: term.entity_kind,
            label,
            language: self.config.default_language.clone(),
            datatype,
        };
        let id = self.client.create_entity(entity).await?;
        if let Err(err) = self.registry.put(&term.identifier, &id) {
            tracing::error!(
                identifier = %term.identifier,
                entity_id = %id,
                error = %err,
                "created store entity but could not record it durably"
            );
            return Err(err.into());
        }
        tracing::info!(
            identifier = %term.identifier,
            entity_id = %id,
            kind = %term.entity_kind,
            "created store entity"
        );
        Ok(Resolution::Created(id))
    }

    /// Resolve a term, attaching the mapping statement to fresh entities.
    async fn resolve(
        &mut self,
        term: &UriTerm,
        datatype: Option<StoreDatatype>,
    ) -> Result<String, Abort> {
        match self.lookup_or_create(term, datatype).await? {
            Resolution::Cached(id) => Ok(id),
            Resolution::Created(id) => {
                self.add_mapping(&id, term).await;
                Ok(id)
            }
        }
    }

    async fn add_mapping(&mut self, entity_id: &str, term: &UriTerm) {
        let Some(mapping) = self.config.mapping.clone() else {
            return;
        };
        if !mapping.applies_to(&term.identifier) {
            return;
        }
        let property = UriTerm::property(mapping.predicate);
        let outcome = match self
            .lookup_or_create(&property, Some(StoreDatatype::Url))
            .await
        {
            Ok(resolution) => {
                let statement = Statement::new(
                    resolution.into_id(),
                    StatementValue::Url {
                        value: term.identifier.clone(),
                    },
                );
                self.client
                    .add_statement(entity_id, &statement)
                    .await
                    .map_err(Abort::from)
            }
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            tracing::warn!(
                identifier = %term.identifier,
                entity_id = %entity_id,
                error = %err,
                "failed to add mapping statement"
            );
        }
    }

    // ------------------------------------------------------------------
    // Application
    // ------------------------------------------------------------------

    async fn apply(
        &mut self,
        triple: &Triple,
        change: ChangeKind,
    ) -> Result<ModificationResult, Abort> {
        let subject_id = self.resolve(&triple.subject, None).await?;

        let role = self.config.predicates.classify(&triple.predicate.identifier);
        if role == PredicateRole::Statement {
            return self.apply_statement(triple, subject_id, change).await;
        }

        let Some(literal) = triple.object.as_literal() else {
            return Ok(ModificationResult::failure(format!(
                "{} expects a literal object, got {}",
                triple.predicate, triple.object
            )));
        };
        let language = literal
            .language()
            .unwrap_or(&self.config.default_language)
            .to_string();

        match (role, change) {
            (PredicateRole::Label, ChangeKind::Addition) => {
                self.client
                    .set_label(&subject_id, literal.content(), &language)
                    .await?;
            }
            (PredicateRole::Label, ChangeKind::Removal) => {
                self.client.set_label(&subject_id, "", &language).await?;
            }
            (PredicateRole::Description, ChangeKind::Addition) => {
                let description: String = literal
                    .content()
                    .chars()
                    .take(self.config.description_max_len)
                    .collect();
                self.client
                    .set_description(&subject_id, &description, &language)
                    .await?;
            }
            (PredicateRole::Description, ChangeKind::Removal) => {
                self.client
                    .set_description(&subject_id, "", &language)
                    .await?;
            }
            (PredicateRole::Alias, ChangeKind::Addition) => {
                self.client
                    .set_aliases(&subject_id, &[literal.content().to_string()], &language, true)
                    .await?;
            }
            (PredicateRole::Alias, ChangeKind::Removal) => {
                return self.remove_alias(subject_id, literal, &language).await;
            }
            (PredicateRole::Statement, _) => {
                return self.apply_statement(triple, subject_id, change).await;
            }
        }
        Ok(ModificationResult::success(Some(subject_id)))
    }

    async fn remove_alias(
        &mut self,
        subject_id: String,
        literal: &LiteralTerm,
        language: &str,
    ) -> Result<ModificationResult, Abort> {
        let current = self.client.aliases(&subject_id, language).await?;
        if !current.iter().any(|alias| alias == literal.content()) {
            let message = format!("Alias {}@{} does not exist", literal.content(), language);
            tracing::warn!(entity_id = %subject_id, "{message}");
            return Ok(ModificationResult::failure(message));
        }
        let remaining: Vec<String> = current
            .into_iter()
            .filter(|alias| alias != literal.content())
            .collect();
        self.client
            .set_aliases(&subject_id, &remaining, language, false)
            .await?;
        Ok(ModificationResult::success(Some(subject_id)))
    }

    async fn apply_statement(
        &mut self,
        triple: &Triple,
        subject_id: String,
        change: ChangeKind,
    ) -> Result<ModificationResult, Abort> {
        let object_datatype = match triple.object.store_datatype() {
            Ok(datatype) => datatype,
            Err(err) => return Ok(ModificationResult::failure(err.to_string())),
        };

        let value = match &triple.object {
            Term::Uri(object) => {
                let object_id = match change {
                    ChangeKind::Addition => self.resolve(object, None).await?,
                    ChangeKind::Removal => match self.lookup(object) {
                        Some(id) => id,
                        None => {
                            let message =
                                format!("{object} has no store entity, nothing to remove");
                            tracing::warn!(triple = %triple, "{message}");
                            return Ok(ModificationResult::failure(message));
                        }
                    },
                };
                reference_value(object_datatype, object_id)
            }
            Term::Literal(literal) => match literal_value(literal, object_datatype) {
                Ok(value) => value,
                Err(err) => return Ok(ModificationResult::failure(err.to_string())),
            },
        };

        let mut predicate = triple.predicate.clone();
        predicate.entity_kind = EntityKind::Property;
        let property_id = self.resolve(&predicate, Some(object_datatype)).await?;

        let statement = Statement::new(property_id, value);
        match change {
            ChangeKind::Addition => self.client.add_statement(&subject_id, &statement).await?,
            ChangeKind::Removal => {
                self.client
                    .remove_statement(&subject_id, &statement)
                    .await?
            }
        }
        tracing::debug!(
            entity_id = %subject_id,
            statement = %statement,
            %change,
            "statement written"
        );
        Ok(ModificationResult::success(Some(subject_id)))
    }

    /// Turn the internal outcome into the public one: rejections become
    /// failed results, faults propagate.
    fn settle(
        &self,
        context: &dyn fmt::Display,
        outcome: Result<ModificationResult, Abort>,
    ) -> Result<ModificationResult, SyncError> {
        match outcome {
            Ok(result) => Ok(result),
            Err(Abort::Rejected { code, info }) => {
                if code == NOT_RECOGNIZED_LANGUAGE {
                    tracing::warn!(triple = %context, "Language was not recognized");
                } else {
                    tracing::warn!(triple = %context, %code, %info, "store rejected write");
                }
                Ok(ModificationResult::failure(info))
            }
            Err(Abort::Fault(err)) => Err(err),
        }
    }
}

#[async_trait]
impl<C, R> TripleStoreManager for WikibaseAdapter<C, R>
where
    C: WikibaseClient,
    R: EntityRegistry,
{
    async fn create_triple(&mut self, triple: &Triple) -> Result<ModificationResult, SyncError> {
        let outcome = self.apply(triple, ChangeKind::Addition).await;
        self.settle(triple, outcome)
    }

    async fn remove_triple(&mut self, triple: &Triple) -> Result<ModificationResult, SyncError> {
        let outcome = self.apply(triple, ChangeKind::Removal).await;
        self.settle(triple, outcome)
    }

    /// Resolves the subject once and reuses the id for every change.
    async fn batch_update(
        &mut self,
        subject: &UriTerm,
        changes: &[(ChangeKind, Triple)],
    ) -> Result<ModificationResult, SyncError> {
        let subject_id = match self.resolve(subject, None).await {
            Ok(id) => id,
            Err(err) => return self.settle(subject, Err(err)),
        };
        let mut results = Vec::with_capacity(changes.len());
        for (change, triple) in changes {
            let mut triple = triple.clone();
            triple.subject.resolved_id = Some(subject_id.clone());
            let outcome = self.apply(&triple, *change).await;
            results.push(self.settle(&triple, outcome)?);
        }
        Ok(ModificationResult::merge(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingConfig;
    use crate::memory::{ClientCall, InMemoryWikibase};
    use ontosync_rdf::vocab::{xsd, GEO_WKT_LITERAL, RDFS_COMMENT, RDFS_LABEL, SKOS_ALT_LABEL};
    use ontosync_registry::MemoryRegistry;
    use std::sync::Arc;

    const EX: &str = "https://example.org/onto#";

    fn ex(local: &str) -> UriTerm {
        UriTerm::new(format!("{EX}{local}"))
    }

    fn adapter(
        store: &Arc<InMemoryWikibase>,
    ) -> WikibaseAdapter<Arc<InMemoryWikibase>, MemoryRegistry> {
        WikibaseAdapter::new(store.clone(), MemoryRegistry::new(), SyncConfig::default())
    }

    fn create(kind: EntityKind, label: &str, datatype: Option<StoreDatatype>) -> ClientCall {
        ClientCall::CreateEntity(NewEntity {
            kind,
            label: Some(label.to_string()),
            language: "en".to_string(),
            datatype,
        })
    }

    fn set_label(entity: &str, label: &str, language: &str) -> ClientCall {
        ClientCall::SetLabel {
            entity: entity.to_string(),
            label: label.to_string(),
            language: language.to_string(),
        }
    }

    fn alias_triple(alias: &str, language: &str) -> Triple {
        Triple::new(
            ex("Person"),
            UriTerm::new(SKOS_ALT_LABEL),
            LiteralTerm::with_language(alias, language),
        )
    }

    #[tokio::test]
    async fn create_triple_resolves_subject_object_then_predicate() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        let triple = Triple::new(ex("Person"), ex("livesIn"), ex("City"));

        let result = adapter.create_triple(&triple).await.unwrap();
        assert_eq!(result, ModificationResult::success(Some("Q1".to_string())));

        let statement = Statement::new("P3", StatementValue::Item { id: "Q2".to_string() });
        assert_eq!(
            store.calls(),
            vec![
                create(EntityKind::Item, "Person", None),
                create(EntityKind::Item, "City", None),
                create(EntityKind::Property, "livesIn", Some(StoreDatatype::ItemReference)),
                ClientCall::AddStatement {
                    entity: "Q1".to_string(),
                    statement
                },
            ]
        );
        assert_eq!(adapter.registry().get(&format!("{EX}livesIn")).as_deref(), Some("P3"));
    }

    #[tokio::test]
    async fn existing_entities_are_not_created_again() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        adapter
            .create_triple(&Triple::new(ex("Person"), ex("livesIn"), ex("City")))
            .await
            .unwrap();
        store.clear_calls();

        adapter
            .create_triple(&Triple::new(ex("Person"), ex("altName"), LiteralTerm::plain("Human")))
            .await
            .unwrap();
        assert_eq!(
            store.calls(),
            vec![
                create(EntityKind::Property, "altName", Some(StoreDatatype::String)),
                ClientCall::AddStatement {
                    entity: "Q1".to_string(),
                    statement: Statement::new(
                        "P4",
                        StatementValue::String {
                            value: "Human".to_string()
                        }
                    ),
                },
            ]
        );
    }

    #[tokio::test]
    async fn label_predicates_set_labels_after_inferred_label() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        adapter
            .create_triple(&Triple::new(
                ex("labra"),
                UriTerm::new(RDFS_LABEL),
                LiteralTerm::with_language("Jose Emilio Labra Gayo", "en"),
            ))
            .await
            .unwrap();
        adapter
            .create_triple(&Triple::new(
                ex("labra"),
                UriTerm::new(ontosync_rdf::vocab::SCHEMA_NAME),
                LiteralTerm::with_language("라브라", "ko"),
            ))
            .await
            .unwrap();
        adapter
            .create_triple(&Triple::new(
                ex("labra"),
                UriTerm::new(RDFS_LABEL),
                LiteralTerm::plain("José Emilio Labra Gayo"),
            ))
            .await
            .unwrap();

        assert_eq!(
            store.calls(),
            vec![
                create(EntityKind::Item, "labra", None),
                set_label("Q1", "Jose Emilio Labra Gayo", "en"),
                set_label("Q1", "라브라", "ko"),
                set_label("Q1", "José Emilio Labra Gayo", "en"),
            ]
        );
        assert_eq!(store.entity("Q1").unwrap().label("ko"), Some("라브라"));
    }

    #[tokio::test]
    async fn entity_without_inferable_label_is_still_created() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        let triple = Triple::new(
            UriTerm::new("exampletest"),
            UriTerm::new(RDFS_LABEL),
            LiteralTerm::with_language("a test", "en"),
        );
        assert!(adapter.create_triple(&triple).await.unwrap().successful);
        assert_eq!(
            store.calls(),
            vec![
                ClientCall::CreateEntity(NewEntity {
                    kind: EntityKind::Item,
                    label: None,
                    language: "en".to_string(),
                    datatype: None,
                }),
                set_label("Q1", "a test", "en"),
            ]
        );
    }

    #[tokio::test]
    async fn long_descriptions_are_truncated() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        let long = "Una persona".repeat(500);
        let triple = Triple::new(
            ex("Person"),
            UriTerm::new(RDFS_COMMENT),
            LiteralTerm::with_language(long.clone(), "es"),
        );
        adapter.create_triple(&triple).await.unwrap();
        let stored = store.entity("Q1").unwrap();
        let description = stored.description("es").unwrap();
        assert_eq!(description.chars().count(), 250);
        assert_eq!(description, &long[..250]);

        adapter.remove_triple(&triple).await.unwrap();
        assert_eq!(store.entity("Q1").unwrap().description("es"), None);
    }

    #[tokio::test]
    async fn aliases_append_and_remove() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        adapter.create_triple(&alias_triple("individuo", "es")).await.unwrap();
        adapter.create_triple(&alias_triple("sujeto", "es")).await.unwrap();
        let removed = adapter.remove_triple(&alias_triple("individuo", "es")).await.unwrap();
        assert!(removed.successful);

        let calls = store.calls();
        assert_eq!(
            calls[calls.len() - 2..],
            [
                ClientCall::GetAliases {
                    entity: "Q1".to_string(),
                    language: "es".to_string()
                },
                ClientCall::SetAliases {
                    entity: "Q1".to_string(),
                    aliases: vec!["sujeto".to_string()],
                    language: "es".to_string(),
                    append: false
                },
            ]
        );
        assert_eq!(store.entity("Q1").unwrap().aliases["es"], ["sujeto"]);
    }

    #[tokio::test]
    async fn removing_missing_alias_is_reported_without_writing() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        let result = adapter.remove_triple(&alias_triple("individuo", "es")).await.unwrap();

        assert!(!result.successful);
        assert_eq!(result.message, "Alias individuo@es does not exist");
        assert!(!store
            .calls()
            .iter()
            .any(|call| matches!(call, ClientCall::SetAliases { .. })));
    }

    #[tokio::test]
    async fn unknown_language_becomes_failed_result() {
        let store = Arc::new(InMemoryWikibase::new().with_languages(["en", "es", "ko"]));
        let mut adapter = adapter(&store);
        let result = adapter
            .create_triple(&Triple::new(
                ex("labra"),
                UriTerm::new(RDFS_LABEL),
                LiteralTerm::with_language("라브", "invented"),
            ))
            .await
            .unwrap();
        assert!(!result.successful);
        assert_eq!(result.message, "The supplied language code was not recognized.");
    }

    #[tokio::test]
    async fn remove_statement_does_not_create_object() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        let result = adapter
            .remove_triple(&Triple::new(ex("Person"), ex("livesIn"), ex("City")))
            .await
            .unwrap();
        assert!(!result.successful);
        assert_eq!(store.entity_count(), 1, "only the subject is created");
        assert!(adapter.registry().get(&format!("{EX}City")).is_none());
    }

    #[tokio::test]
    async fn added_then_removed_statement_round_trips() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        let triple = Triple::new(ex("Person"), ex("livesIn"), ex("City"));
        adapter.create_triple(&triple).await.unwrap();
        let removed = adapter.remove_triple(&triple).await.unwrap();
        assert!(removed.successful, "{}", removed.message);
        assert!(store.entity("Q1").unwrap().statements.is_empty());
        assert_eq!(store.entity_count(), 3);
    }

    #[tokio::test]
    async fn typed_literals_become_typed_statements() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        adapter
            .create_triple(&Triple::new(
                ex("Person"),
                ex("livesIn"),
                LiteralTerm::typed("Point(12.34 2.43)", GEO_WKT_LITERAL),
            ))
            .await
            .unwrap();
        assert_eq!(
            store.entity("P2").unwrap().datatype,
            Some(StoreDatatype::GlobeCoordinate)
        );

        let bad = adapter
            .create_triple(&Triple::new(
                ex("Person"),
                ex("age"),
                LiteralTerm::typed("old", xsd("integer")),
            ))
            .await
            .unwrap();
        assert!(!bad.successful);
        assert!(adapter.registry().get(&format!("{EX}age")).is_none());

        let unsupported = adapter
            .create_triple(&Triple::new(
                ex("Person"),
                ex("alive"),
                LiteralTerm::typed("true", xsd("boolean")),
            ))
            .await
            .unwrap();
        assert!(!unsupported.successful);
    }

    #[tokio::test]
    async fn property_subject_uses_its_range() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        let subject = UriTerm::property(format!("{EX}test"))
            .with_range(ontosync_rdf::vocab::RDF_PROPERTY);
        adapter
            .create_triple(&Triple::new(
                subject,
                UriTerm::new(RDFS_LABEL),
                LiteralTerm::plain("test"),
            ))
            .await
            .unwrap();
        assert_eq!(
            store.calls()[0],
            create(EntityKind::Property, "test", Some(StoreDatatype::PropertyReference))
        );
    }

    #[tokio::test]
    async fn mapping_statements_skip_configured_namespaces() {
        let store = Arc::new(InMemoryWikibase::new());
        let config = SyncConfig {
            mapping: Some(MappingConfig {
                predicate: format!("{EX}sameAs"),
                skip_namespaces: vec!["https://example.org/hercules/asio#".to_string()],
            }),
            ..SyncConfig::default()
        };
        let mut adapter = WikibaseAdapter::new(store.clone(), MemoryRegistry::new(), config);

        adapter
            .create_triple(&Triple::new(
                ex("Person"),
                UriTerm::new(RDFS_COMMENT),
                LiteralTerm::with_language("A person", "en"),
            ))
            .await
            .unwrap();
        let person = store.entity("Q1").unwrap();
        assert_eq!(
            person.statements,
            vec![Statement::new(
                "P2",
                StatementValue::Url {
                    value: format!("{EX}Person")
                }
            )]
        );
        assert_eq!(store.entity("P2").unwrap().datatype, Some(StoreDatatype::Url));

        adapter
            .create_triple(&Triple::new(
                UriTerm::new("https://example.org/hercules/asio#authors"),
                UriTerm::new(RDFS_COMMENT),
                LiteralTerm::with_language("Publication authored by a person.", "en"),
            ))
            .await
            .unwrap();
        assert!(store.entity("Q3").unwrap().statements.is_empty());
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let store = Arc::new(InMemoryWikibase::new());
        store.set_unavailable(true);
        let mut adapter = adapter(&store);
        let err = adapter
            .create_triple(&Triple::new(ex("Person"), ex("livesIn"), ex("City")))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        assert!(adapter.registry().is_empty());
    }

    #[tokio::test]
    async fn batch_resolves_subject_once() {
        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = adapter(&store);
        let changes = vec![
            (ChangeKind::Addition, alias_triple("individual", "en")),
            (ChangeKind::Addition, alias_triple("individuo", "es")),
            (ChangeKind::Removal, alias_triple("nadie", "es")),
        ];
        let result = adapter.batch_update(&ex("Person"), &changes).await.unwrap();
        assert!(!result.successful);
        assert_eq!(result.message, "Alias nadie@es does not exist");
        assert_eq!(result.result_id.as_deref(), Some("Q1"));
        assert_eq!(store.entity_count(), 1);
    }

    #[tokio::test]
    async fn unrecorded_entity_is_not_created_again() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("state");
        std::fs::write(&blocker, "").unwrap();
        let registry =
            ontosync_registry::JsonFileRegistry::open(blocker.join("uris.json")).unwrap();

        let store = Arc::new(InMemoryWikibase::new());
        let mut adapter = WikibaseAdapter::new(store.clone(), registry, SyncConfig::default());
        let label = Triple::new(
            ex("Person"),
            UriTerm::new(RDFS_LABEL),
            LiteralTerm::with_language("Person", "en"),
        );

        let err = adapter.create_triple(&label).await.unwrap_err();
        assert!(matches!(err, SyncError::Registry(_)));
        for _ in 0..2 {
            assert!(adapter.create_triple(&label).await.unwrap().successful);
        }

        let creations = store
            .calls()
            .iter()
            .filter(|call| matches!(call, ClientCall::CreateEntity(_)))
            .count();
        assert_eq!(creations, 1);
        assert_eq!(store.entity_count(), 1);
        assert!(adapter.registry().has_unsaved_changes());
    }
}
