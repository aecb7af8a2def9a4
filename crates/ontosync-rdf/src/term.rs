//! Typed RDF terms and their mapping onto store value kinds.
//!
//! Every position of a [`crate::Triple`] is a [`Term`]: either a [`UriTerm`]
//! (a resource that becomes a store entity) or a [`LiteralTerm`] (a value).
//! [`Term::store_datatype`] decides which kind of store value a term turns
//! into; it is a pure table lookup keyed by datatype IRI or entity kind.

use crate::graph::{RdfNode, RdfObject};
use crate::vocab::{
    GEO_WKT_LITERAL, RDFS_LITERAL, RDF_LANG_STRING, RDF_PROPERTY, XSD_NS, XSD_STRING,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermError {
    /// The raw term has a kind the store cannot represent (e.g. blank nodes).
    #[error("unsupported term kind: {0}")]
    UnsupportedTermKind(String),

    /// A literal datatype with no entry in the datatype table.
    #[error("unsupported datatype: <{0}>")]
    UnsupportedDatatype(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

// ============================================================================
// Store value kinds
// ============================================================================

/// Store-side value kind of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreDatatype {
    ItemReference,
    PropertyReference,
    String,
    MonolingualText,
    Quantity {
        lower_bound: Option<i64>,
        upper_bound: Option<i64>,
    },
    Time,
    GlobeCoordinate,
    Url,
}

impl StoreDatatype {
    pub const QUANTITY: StoreDatatype = StoreDatatype::Quantity {
        lower_bound: None,
        upper_bound: None,
    };

    /// Name of the datatype in the Wikibase API (`wikibase-item`, `quantity`, ...).
    pub fn wikibase_name(&self) -> &'static str {
        match self {
            Self::ItemReference => "wikibase-item",
            Self::PropertyReference => "wikibase-property",
            Self::String => "string",
            Self::MonolingualText => "monolingualtext",
            Self::Quantity { .. } => "quantity",
            Self::Time => "time",
            Self::GlobeCoordinate => "globe-coordinate",
            Self::Url => "url",
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::ItemReference | Self::PropertyReference)
    }
}

impl fmt::Display for StoreDatatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ItemReference => "item-reference",
            Self::PropertyReference => "property-reference",
            Self::String => "string",
            Self::MonolingualText => "monolingual-text",
            Self::Quantity { .. } => "quantity",
            Self::Time => "time",
            Self::GlobeCoordinate => "globe-coordinate",
            Self::Url => "url",
        };
        f.write_str(name)
    }
}

/// Datatype table for typed literals.
///
/// Returns `None` for datatypes the store has no value kind for.
pub fn datatype_for_literal_type(datatype_iri: &str) -> Option<StoreDatatype> {
    if datatype_iri == GEO_WKT_LITERAL {
        return Some(StoreDatatype::GlobeCoordinate);
    }
    let local = datatype_iri.strip_prefix(XSD_NS)?;
    let datatype = match local {
        "decimal" | "double" | "float" | "int" | "integer" | "long" | "short" | "byte"
        | "unsignedInt" | "unsignedLong" | "unsignedShort" | "unsignedByte" => {
            StoreDatatype::QUANTITY
        }
        "positiveInteger" => StoreDatatype::Quantity {
            lower_bound: Some(1),
            upper_bound: None,
        },
        "nonNegativeInteger" => StoreDatatype::Quantity {
            lower_bound: Some(0),
            upper_bound: None,
        },
        "negativeInteger" | "nonPositiveInteger" => StoreDatatype::Quantity {
            lower_bound: None,
            upper_bound: Some(0),
        },
        "date" | "dateTime" | "time" => StoreDatatype::Time,
        "string" | "token" | "normalizedString" => StoreDatatype::String,
        "anyURI" => StoreDatatype::Url,
        _ => return None,
    };
    Some(datatype)
}

/// Datatype a property gets when it is created from its declared range.
pub fn datatype_for_range(range_iri: Option<&str>) -> StoreDatatype {
    match range_iri {
        Some(RDFS_LITERAL) => StoreDatatype::String,
        Some(RDF_LANG_STRING) => StoreDatatype::MonolingualText,
        Some(RDF_PROPERTY) => StoreDatatype::PropertyReference,
        Some(iri) => datatype_for_literal_type(iri).unwrap_or(StoreDatatype::ItemReference),
        None => StoreDatatype::ItemReference,
    }
}

// ============================================================================
// URI terms
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Item,
    Property,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => f.write_str("item"),
            Self::Property => f.write_str("property"),
        }
    }
}

/// A resource identified by an absolute IRI.
///
/// Equality, ordering and hashing only look at `identifier`; the other fields
/// are annotations filled in later (by the annotation pass or by resolution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UriTerm {
    pub identifier: String,
    #[serde(default)]
    pub entity_kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_range: Option<String>,
}

impl UriTerm {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            entity_kind: EntityKind::Item,
            resolved_id: None,
            property_range: None,
        }
    }

    pub fn property(identifier: impl Into<String>) -> Self {
        Self {
            entity_kind: EntityKind::Property,
            ..Self::new(identifier)
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.property_range = Some(range.into());
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_property(&self) -> bool {
        self.entity_kind == EntityKind::Property
    }

    pub fn store_datatype(&self) -> StoreDatatype {
        match self.entity_kind {
            EntityKind::Item => StoreDatatype::ItemReference,
            EntityKind::Property => StoreDatatype::PropertyReference,
        }
    }

    /// Datatype to create this term with when it becomes a store property.
    pub fn range_datatype(&self) -> StoreDatatype {
        datatype_for_range(self.property_range.as_deref())
    }

    /// Default human-readable label: the fragment after the last `#`, or the
    /// last `/` segment when there is no fragment.
    pub fn infer_label(&self) -> Option<&str> {
        let id = self.identifier.as_str();
        let candidate = match id.rsplit_once('#') {
            Some((_, fragment)) => fragment,
            None => id.rsplit_once('/')?.1,
        };
        if candidate.is_empty() {
            None
        } else {
            Some(candidate)
        }
    }
}

impl PartialEq for UriTerm {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for UriTerm {}

impl Hash for UriTerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl PartialOrd for UriTerm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UriTerm {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identifier.cmp(&other.identifier)
    }
}

impl fmt::Display for UriTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.identifier)
    }
}

// ============================================================================
// Literal terms
// ============================================================================

/// A literal value. At most one of `datatype` and `language` is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LiteralTerm {
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl LiteralTerm {
    pub fn new(
        content: impl Into<String>,
        datatype: Option<String>,
        language: Option<String>,
    ) -> Result<Self, TermError> {
        if datatype.is_some() && language.is_some() {
            return Err(TermError::InvalidArgument(
                "a literal cannot have both a datatype and a language tag".to_string(),
            ));
        }
        // Plain and xsd:string literals denote the same value.
        let datatype = datatype.filter(|dt| dt != XSD_STRING);
        Ok(Self {
            content: content.into(),
            datatype,
            language,
        })
    }

    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn with_language(content: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn typed(content: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype: String = datatype.into();
        Self {
            content: content.into(),
            datatype: (datatype != XSD_STRING).then_some(datatype),
            language: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn store_datatype(&self) -> Result<StoreDatatype, TermError> {
        if self.language.is_some() {
            return Ok(StoreDatatype::MonolingualText);
        }
        match &self.datatype {
            Some(dt) => datatype_for_literal_type(dt)
                .ok_or_else(|| TermError::UnsupportedDatatype(dt.clone())),
            None => Ok(StoreDatatype::String),
        }
    }
}

impl fmt::Display for LiteralTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.content.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                other => write!(f, "{other}")?,
            }
        }
        f.write_str("\"")?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")?;
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{dt}>")?;
        }
        Ok(())
    }
}

// ============================================================================
// Terms
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Term {
    Uri(UriTerm),
    Literal(LiteralTerm),
}

impl Term {
    /// Convert a parsed graph term. Blank nodes are rejected.
    pub fn from_raw(raw: &RdfObject) -> Result<Self, TermError> {
        match raw {
            RdfObject::Node(node) => uri_from_node(node).map(Term::Uri),
            RdfObject::Literal(lit) => LiteralTerm::new(
                lit.lexical.clone(),
                lit.datatype.clone(),
                lit.language.clone(),
            )
            .map(Term::Literal),
        }
    }

    pub fn store_datatype(&self) -> Result<StoreDatatype, TermError> {
        match self {
            Term::Uri(uri) => Ok(uri.store_datatype()),
            Term::Literal(lit) => lit.store_datatype(),
        }
    }

    pub fn as_uri(&self) -> Option<&UriTerm> {
        match self {
            Term::Uri(uri) => Some(uri),
            Term::Literal(_) => None,
        }
    }

    pub fn as_uri_mut(&mut self) -> Option<&mut UriTerm> {
        match self {
            Term::Uri(uri) => Some(uri),
            Term::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&LiteralTerm> {
        match self {
            Term::Literal(lit) => Some(lit),
            Term::Uri(_) => None,
        }
    }
}

impl From<UriTerm> for Term {
    fn from(value: UriTerm) -> Self {
        Term::Uri(value)
    }
}

impl From<LiteralTerm> for Term {
    fn from(value: LiteralTerm) -> Self {
        Term::Literal(value)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Uri(uri) => uri.fmt(f),
            Term::Literal(lit) => lit.fmt(f),
        }
    }
}

pub(crate) fn uri_from_node(node: &RdfNode) -> Result<UriTerm, TermError> {
    match node {
        RdfNode::Iri(iri) => Ok(UriTerm::new(iri.clone())),
        RdfNode::BlankNode(label) => Err(TermError::UnsupportedTermKind(format!(
            "blank node _:{label}"
        ))),
    }
}
