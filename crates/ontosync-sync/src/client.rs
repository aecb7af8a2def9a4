//! Store client contract.
//!
//! [`WikibaseClient`] is the narrow set of writes the adapter needs from a
//! Wikibase-style store. A store-reported refusal is
//! [`ClientError::Rejected`]; anything that prevented the request from being
//! answered is [`ClientError::Transport`].

use async_trait::async_trait;
use ontosync_rdf::{EntityKind, StoreDatatype};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Error code a Wikibase returns for an unknown language code.
pub const NOT_RECOGNIZED_LANGUAGE: &str = "not-recognized-language";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("store rejected the request ({code}): {info}")]
    Rejected { code: String, info: String },

    #[error("store transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn rejected(code: impl Into<String>, info: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            info: info.into(),
        }
    }
}

/// Request to create an item or property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntity {
    pub kind: EntityKind,
    pub label: Option<String>,
    pub language: String,
    /// Required for properties, ignored for items.
    pub datatype: Option<StoreDatatype>,
}

/// Statement value, one variant per store value kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StatementValue {
    Item { id: String },
    Property { id: String },
    String { value: String },
    MonolingualText { text: String, language: String },
    Quantity {
        /// Signed decimal amount, e.g. `+12` or `-3.5`.
        amount: String,
        lower_bound: Option<i64>,
        upper_bound: Option<i64>,
    },
    Time {
        /// `+YYYY-MM-DDThh:mm:ssZ`
        time: String,
        precision: u8,
    },
    GlobeCoordinate {
        latitude: f64,
        longitude: f64,
        precision: f64,
    },
    Url { value: String },
}

impl fmt::Display for StatementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item { id } | Self::Property { id } => f.write_str(id),
            Self::String { value } | Self::Url { value } => write!(f, "{value:?}"),
            Self::MonolingualText { text, language } => write!(f, "{text:?}@{language}"),
            Self::Quantity { amount, .. } => f.write_str(amount),
            Self::Time { time, precision } => write!(f, "{time}/{precision}"),
            Self::GlobeCoordinate {
                latitude,
                longitude,
                ..
            } => write!(f, "Point({latitude} {longitude})"),
        }
    }
}

/// A claim: property id plus value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub property: String,
    pub value: StatementValue,
}

impl Statement {
    pub fn new(property: impl Into<String>, value: StatementValue) -> Self {
        Self {
            property: property.into(),
            value,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.property, self.value)
    }
}

#[async_trait]
pub trait WikibaseClient: Send + Sync {
    /// Create an entity and return its store-assigned id.
    async fn create_entity(&self, entity: NewEntity) -> Result<String, ClientError>;

    /// An empty `label` removes the label in that language.
    async fn set_label(&self, entity_id: &str, label: &str, language: &str)
        -> Result<(), ClientError>;

    /// An empty `description` removes the description in that language.
    async fn set_description(
        &self,
        entity_id: &str,
        description: &str,
        language: &str,
    ) -> Result<(), ClientError>;

    async fn aliases(&self, entity_id: &str, language: &str) -> Result<Vec<String>, ClientError>;

    /// With `append`, add to the existing aliases; otherwise replace them.
    async fn set_aliases(
        &self,
        entity_id: &str,
        aliases: &[String],
        language: &str,
        append: bool,
    ) -> Result<(), ClientError>;

    async fn add_statement(&self, entity_id: &str, statement: &Statement)
        -> Result<(), ClientError>;

    async fn remove_statement(
        &self,
        entity_id: &str,
        statement: &Statement,
    ) -> Result<(), ClientError>;
}

#[async_trait]
impl<C: WikibaseClient + ?Sized> WikibaseClient for Arc<C> {
    async fn create_entity(&self, entity: NewEntity) -> Result<String, ClientError> {
        (**self).create_entity(entity).await
    }

    async fn set_label(
        &self,
        entity_id: &str,
        label: &str,
        language: &str,
    ) -> Result<(), ClientError> {
        (**self).set_label(entity_id, label, language).await
    }

    async fn set_description(
        &self,
        entity_id: &str,
        description: &str,
        language: &str,
    ) -> Result<(), ClientError> {
        (**self).set_description(entity_id, description, language).await
    }

    async fn aliases(&self, entity_id: &str, language: &str) -> Result<Vec<String>, ClientError> {
        (**self).aliases(entity_id, language).await
    }

    async fn set_aliases(
        &self,
        entity_id: &str,
        aliases: &[String],
        language: &str,
        append: bool,
    ) -> Result<(), ClientError> {
        (**self).set_aliases(entity_id, aliases, language, append).await
    }

    async fn add_statement(
        &self,
        entity_id: &str,
        statement: &Statement,
    ) -> Result<(), ClientError> {
        (**self).add_statement(entity_id, statement).await
    }

    async fn remove_statement(
        &self,
        entity_id: &str,
        statement: &Statement,
    ) -> Result<(), ClientError> {
        (**self).remove_statement(entity_id, statement).await
    }
}
