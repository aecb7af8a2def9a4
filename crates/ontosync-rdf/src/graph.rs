//! Raw RDF graphs: Turtle parsing and blank-node canonicalization.
//!
//! The raw model keeps exactly what the parser produced (including blank
//! nodes) so that two snapshots can be compared as sets of statements.
//! Typing into [`crate::Term`]s happens after diffing.
//!
//! Canonicalization relabels blank nodes from the structure around them:
//!
//! 1. every blank node starts with the same colour;
//! 2. each round rehashes a node's colour together with the sorted
//!    descriptions of the statements it takes part in (IRIs and literals
//!    verbatim, other blank nodes by their current colour);
//! 3. rounds stop once the number of distinct colours stops growing;
//! 4. if a colour is still shared, every member of the smallest shared class
//!    is marked in turn and refined again, recursively. Each branch ends in a
//!    fully distinguished labelling; the smallest relabelled statement set
//!    over all branches is the canonical form.
//!
//! A branch whose leftmost leaf equals the first branch's leftmost leaf is
//! the image of the first branch under an automorphism and is not explored
//! further. Identical blank nodes therefore cost one descent each.

use crate::RdfError;
use sha2::{Digest, Sha256};
use sophia::api::prelude::*;
use sophia::api::term::TermKind;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

type Colour = [u8; 32];
type Colouring<'a> = BTreeMap<&'a str, Colour>;
type Incidence<'a> = BTreeMap<&'a str, Vec<&'a RdfStatement>>;

pub const CANONICAL_BNODE_PREFIX: &str = "c14n-";

// ============================================================================
// Raw term model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfNode {
    Iri(String),
    BlankNode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RdfLiteral {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfObject {
    Node(RdfNode),
    Literal(RdfLiteral),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RdfStatement {
    pub subject: RdfNode,
    pub predicate: String,
    pub object: RdfObject,
}

impl RdfStatement {
    pub fn blank_nodes(&self) -> impl Iterator<Item = &str> {
        let subject = match &self.subject {
            RdfNode::BlankNode(b) => Some(b.as_str()),
            RdfNode::Iri(_) => None,
        };
        let object = match &self.object {
            RdfObject::Node(RdfNode::BlankNode(b)) => Some(b.as_str()),
            _ => None,
        };
        subject.into_iter().chain(object)
    }
}

impl fmt::Display for RdfNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfNode::Iri(iri) => write!(f, "<{iri}>"),
            RdfNode::BlankNode(label) => write!(f, "_:{label}"),
        }
    }
}

impl fmt::Display for RdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfObject::Node(node) => node.fmt(f),
            RdfObject::Literal(lit) => {
                write!(f, "{:?}", lit.lexical)?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")?;
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{dt}>")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for RdfStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct ParseSinkError {
    message: String,
}

fn node_from_term<T: Term>(term: T) -> Result<RdfNode, ParseSinkError> {
    match term.kind() {
        TermKind::Iri => term
            .iri()
            .map(|iri| RdfNode::Iri(iri.as_str().to_string()))
            .ok_or_else(|| ParseSinkError {
                message: "IRI term without an IRI".to_string(),
            }),
        TermKind::BlankNode => term
            .bnode_id()
            .map(|id| RdfNode::BlankNode(id.as_str().to_string()))
            .ok_or_else(|| ParseSinkError {
                message: "blank node term without an id".to_string(),
            }),
        other => Err(ParseSinkError {
            message: format!("unexpected {other:?} term in node position"),
        }),
    }
}

fn object_from_term<T: Term>(term: T) -> Result<RdfObject, ParseSinkError> {
    if !matches!(term.kind(), TermKind::Literal) {
        return node_from_term(term).map(RdfObject::Node);
    }
    let lexical = term
        .lexical_form()
        .map(|lex| lex.to_string())
        .unwrap_or_default();
    let language = term.language_tag().map(|tag| tag.as_str().to_string());
    // Language-tagged literals imply rdf:langString; plain literals imply xsd:string.
    let datatype = match &language {
        Some(_) => None,
        None => term
            .datatype()
            .map(|dt| dt.as_str().to_string())
            .filter(|dt| dt != crate::vocab::XSD_STRING),
    };
    Ok(RdfObject::Literal(RdfLiteral {
        lexical,
        datatype,
        language,
    }))
}

// ============================================================================
// Graph
// ============================================================================

/// A set of raw statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RdfGraph {
    statements: BTreeSet<RdfStatement>,
}

impl RdfGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a Turtle document. An empty document is an empty graph.
    pub fn parse_turtle(text: &str) -> Result<Self, RdfError> {
        let mut statements = BTreeSet::new();
        let reader = std::io::BufReader::new(std::io::Cursor::new(text.as_bytes()));
        let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
        parser
            .try_for_each_triple(|t| -> Result<(), ParseSinkError> {
                let subject = node_from_term(t.s())?;
                let RdfNode::Iri(predicate) = node_from_term(t.p())? else {
                    return Err(ParseSinkError {
                        message: "blank node in predicate position".to_string(),
                    });
                };
                let object = object_from_term(t.o())?;
                statements.insert(RdfStatement {
                    subject,
                    predicate,
                    object,
                });
                Ok(())
            })
            .map_err(|e| RdfError::InvalidOntologySyntax(e.to_string()))?;
        Ok(Self { statements })
    }

    pub fn insert(&mut self, statement: RdfStatement) -> bool {
        self.statements.insert(statement)
    }

    pub fn contains(&self, statement: &RdfStatement) -> bool {
        self.statements.contains(statement)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RdfStatement> {
        self.statements.iter()
    }

    /// Statements in `self` that are not in `other`, in canonical order.
    pub fn difference<'a>(
        &'a self,
        other: &'a RdfGraph,
    ) -> impl Iterator<Item = &'a RdfStatement> {
        self.statements.difference(&other.statements)
    }

    pub fn blank_nodes(&self) -> BTreeSet<&str> {
        self.statements
            .iter()
            .flat_map(RdfStatement::blank_nodes)
            .collect()
    }

    /// Relabel blank nodes so that isomorphic graphs become equal.
    pub fn canonicalize(&self) -> RdfGraph {
        let blank_nodes = self.blank_nodes();
        if blank_nodes.is_empty() {
            return self.clone();
        }

        let mut incident: Incidence<'_> = BTreeMap::new();
        for statement in &self.statements {
            for bnode in statement.blank_nodes() {
                incident.entry(bnode).or_default().push(statement);
            }
        }

        let seed = digest(&[b"bnode"]);
        let colours: Colouring<'_> = blank_nodes.iter().map(|b| (*b, seed)).collect();

        let mut search = Search {
            statements: &self.statements,
            incident,
            best: None,
        };
        let colours = refine(&search.incident, colours);
        search.explore(colours);

        match search.best {
            Some(statements) => RdfGraph { statements },
            None => self.clone(),
        }
    }
}

impl FromIterator<RdfStatement> for RdfGraph {
    fn from_iter<I: IntoIterator<Item = RdfStatement>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Canonicalization helpers
// ============================================================================

fn digest(parts: &[&[u8]]) -> Colour {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn canonical_label(colour: &Colour) -> String {
    format!("{CANONICAL_BNODE_PREFIX}{}", hex(&colour[..16]))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn distinct(colours: &BTreeMap<&str, Colour>) -> usize {
    colours.values().collect::<BTreeSet<_>>().len()
}

/// Refine until the partition stops splitting.
fn refine<'a>(incident: &Incidence<'a>, mut colours: Colouring<'a>) -> Colouring<'a> {
    let mut classes = distinct(&colours);
    loop {
        let next: BTreeMap<&str, Colour> = colours
            .iter()
            .map(|(bnode, colour)| {
                let mut signature: Vec<String> = incident
                    .get(bnode)
                    .map(|statements| {
                        statements
                            .iter()
                            .map(|s| describe(s, bnode, &colours))
                            .collect()
                    })
                    .unwrap_or_default();
                signature.sort();
                let joined = signature.join("\n");
                (*bnode, digest(&[colour, joined.as_bytes()]))
            })
            .collect();
        let next_classes = distinct(&next);
        colours = next;
        if next_classes <= classes {
            return colours;
        }
        classes = next_classes;
    }
}

fn describe(statement: &RdfStatement, me: &str, colours: &BTreeMap<&str, Colour>) -> String {
    let node = |n: &RdfNode| match n {
        RdfNode::Iri(iri) => format!("<{iri}>"),
        RdfNode::BlankNode(b) if b == me => "@self".to_string(),
        RdfNode::BlankNode(b) => format!("_:{}", hex(&colours[b.as_str()])),
    };
    let object = match &statement.object {
        RdfObject::Node(n) => node(n),
        literal => literal.to_string(),
    };
    format!(
        "{} <{}> {}",
        node(&statement.subject),
        statement.predicate,
        object
    )
}

/// The smallest colour class with more than one member, if any. Classes of
/// equal size are ordered by colour, never by blank-node label.
fn smallest_tie<'a>(colours: &Colouring<'a>) -> Option<(Colour, Vec<&'a str>)> {
    let mut classes: BTreeMap<Colour, Vec<&'a str>> = BTreeMap::new();
    for (bnode, colour) in colours {
        classes.entry(*colour).or_default().push(*bnode);
    }
    classes
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .min_by_key(|(_, members)| members.len())
}

fn relabel_all(
    statements: &BTreeSet<RdfStatement>,
    labels: &BTreeMap<&str, String>,
) -> BTreeSet<RdfStatement> {
    let relabel = |node: &RdfNode| match node {
        RdfNode::BlankNode(b) => match labels.get(b.as_str()) {
            Some(label) => RdfNode::BlankNode(label.clone()),
            None => node.clone(),
        },
        iri => iri.clone(),
    };
    statements
        .iter()
        .map(|s| RdfStatement {
            subject: relabel(&s.subject),
            predicate: s.predicate.clone(),
            object: match &s.object {
                RdfObject::Node(node) => RdfObject::Node(relabel(node)),
                literal => literal.clone(),
            },
        })
        .collect()
}

/// Branch-and-refine search for the smallest relabelled statement set.
struct Search<'a> {
    statements: &'a BTreeSet<RdfStatement>,
    incident: Incidence<'a>,
    best: Option<BTreeSet<RdfStatement>>,
}

impl<'a> Search<'a> {
    /// Visit every distinct leaf below `colours`. Returns the graph of the
    /// leftmost leaf, the one [`Search::descend`] reaches.
    fn explore(&mut self, colours: Colouring<'a>) -> BTreeSet<RdfStatement> {
        let Some((colour, members)) = smallest_tie(&colours) else {
            return self.visit_leaf(&colours);
        };
        let marked = digest(&[&colour, b"tie"]);
        let Some((&first, rest)) = members.split_first() else {
            return self.visit_leaf(&colours);
        };

        let first_branch = self.individualize(&colours, first, marked);
        let leftmost = self.explore(first_branch);
        for &member in rest {
            let branch = self.individualize(&colours, member, marked);
            // Equal leftmost leaves mean an automorphism maps the first branch
            // onto this one, so its leaves have all been seen.
            if self.descend(branch.clone()) != leftmost {
                self.explore(branch);
            }
        }
        leftmost
    }

    /// Follow the first member of each tie down to a single leaf.
    fn descend(&mut self, mut colours: Colouring<'a>) -> BTreeSet<RdfStatement> {
        while let Some((colour, members)) = smallest_tie(&colours) {
            let Some(&first) = members.first() else {
                break;
            };
            let marked = digest(&[&colour, b"tie"]);
            colours = self.individualize(&colours, first, marked);
        }
        self.visit_leaf(&colours)
    }

    fn individualize(
        &self,
        colours: &Colouring<'a>,
        member: &'a str,
        marked: Colour,
    ) -> Colouring<'a> {
        let mut branch = colours.clone();
        branch.insert(member, marked);
        refine(&self.incident, branch)
    }

    fn visit_leaf(&mut self, colours: &Colouring<'a>) -> BTreeSet<RdfStatement> {
        let labels: BTreeMap<&str, String> = colours
            .iter()
            .map(|(bnode, colour)| (*bnode, canonical_label(colour)))
            .collect();
        let statements = relabel_all(self.statements, &labels);
        if self.best.as_ref().map_or(true, |best| statements < *best) {
            self.best = Some(statements.clone());
        }
        statements
    }
}
