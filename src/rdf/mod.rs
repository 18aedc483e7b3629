//! RDF plumbing around the oxigraph data model.

pub mod canon;
pub mod jsonld;
pub mod list;
pub mod trig;
pub mod vocab;

use oxigraph::model::{
    BlankNode, Dataset, GraphName, GraphNameRef, Literal, NamedNode, NamedNodeRef, Quad, Subject,
    SubjectRef, Term, TermRef, Triple,
};

use crate::error::{ContextError, Result};

/// Parse an IRI, reporting failures as input validation errors.
pub fn named_node(iri: &str) -> Result<NamedNode> {
    NamedNode::new(iri).map_err(|e| ContextError::InvalidIri {
        iri: iri.to_string(),
        reason: e.to_string(),
    })
}

/// An `xsd:dateTime` literal for the given instant.
pub fn date_time_literal(timestamp: jiff::Timestamp) -> Literal {
    Literal::new_typed_literal(timestamp.to_string(), vocab::xsd::DATE_TIME)
}

/// All quads whose graph name is `graph`.
pub fn quads_in_graph<'a>(dataset: &Dataset, graph: impl Into<GraphNameRef<'a>>) -> Vec<Quad> {
    dataset
        .quads_for_graph_name(graph)
        .map(|q| q.into_owned())
        .collect()
}

/// Objects of `subject predicate ?o` in `graph`, or in any graph when `graph`
/// is `None`.
pub fn objects<'a>(
    dataset: &Dataset,
    subject: impl Into<SubjectRef<'a>>,
    predicate: NamedNodeRef<'_>,
    graph: Option<GraphNameRef<'_>>,
) -> Vec<Term> {
    dataset
        .quads_for_subject(subject)
        .filter(|q| q.predicate == predicate)
        .filter(|q| graph.is_none_or(|g| q.graph_name == g))
        .map(|q| q.object.into_owned())
        .collect()
}

/// Subjects of `?s predicate object` across every graph, with the graph they
/// were found in.
pub fn subjects_with<'a>(
    dataset: &Dataset,
    predicate: NamedNodeRef<'_>,
    object: impl Into<TermRef<'a>>,
) -> Vec<(Subject, GraphName)> {
    dataset
        .quads_for_object(object)
        .filter(|q| q.predicate == predicate)
        .map(|q| (q.subject.into_owned(), q.graph_name.into_owned()))
        .collect()
}

/// Every distinct graph name appearing in `dataset`, default graph excluded.
pub fn graph_names(dataset: &Dataset) -> Vec<GraphName> {
    let mut names: Vec<GraphName> = Vec::new();
    for quad in dataset.iter() {
        if quad.graph_name.is_default_graph() {
            continue;
        }
        let name = quad.graph_name.into_owned();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Put `triples` into `graph`.
pub fn in_graph(triples: Vec<Triple>, graph: &BlankNode) -> impl Iterator<Item = Quad> + '_ {
    triples.into_iter().map(move |t| t.in_graph(graph.clone()))
}

/// The term used to reference a graph from metadata.
pub fn graph_term(graph: &GraphName) -> Option<Term> {
    match graph {
        GraphName::NamedNode(node) => Some(node.clone().into()),
        GraphName::BlankNode(node) => Some(node.clone().into()),
        GraphName::DefaultGraph => None,
    }
}

/// The graph a metadata term points at.
pub fn term_graph(term: &Term) -> Option<GraphName> {
    match term {
        Term::NamedNode(node) => Some(node.clone().into()),
        Term::BlankNode(node) => Some(node.clone().into()),
        _ => None,
    }
}
