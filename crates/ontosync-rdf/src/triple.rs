use crate::graph::{RdfLiteral, RdfNode, RdfObject, RdfStatement};
use crate::term::{uri_from_node, Term, TermError, UriTerm};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed `(subject, predicate, object)` fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: UriTerm,
    pub predicate: UriTerm,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: UriTerm, predicate: UriTerm, object: impl Into<Term>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }

    /// Type a parsed statement. Fails on blank nodes and on conflicting literals.
    pub fn from_raw(statement: &RdfStatement) -> Result<Self, TermError> {
        Ok(Self {
            subject: uri_from_node(&statement.subject)?,
            predicate: UriTerm::new(statement.predicate.clone()),
            object: Term::from_raw(&statement.object)?,
        })
    }

    /// The raw statement this triple denotes.
    pub fn to_raw(&self) -> RdfStatement {
        let object = match &self.object {
            Term::Uri(uri) => RdfObject::Node(RdfNode::Iri(uri.identifier.clone())),
            Term::Literal(lit) => RdfObject::Literal(RdfLiteral {
                lexical: lit.content().to_string(),
                datatype: lit.datatype().map(str::to_string),
                language: lit.language().map(str::to_string),
            }),
        };
        RdfStatement {
            subject: RdfNode::Iri(self.subject.identifier.clone()),
            predicate: self.predicate.identifier.clone(),
            object,
        }
    }

    /// Every URI term of the triple, in subject/predicate/object order.
    pub fn uri_terms_mut(&mut self) -> impl Iterator<Item = &mut UriTerm> {
        [Some(&mut self.subject), Some(&mut self.predicate), self.object.as_uri_mut()]
            .into_iter()
            .flatten()
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}
