use oxigraph::model::{BlankNode, Dataset, GraphNameRef, Subject, SubjectRef, Term, Triple};

use super::objects;
use super::vocab::rdf;
use crate::error::{ContextError, Result};

/// Build an RDF list holding `items`. Returns `None` as head for an empty list.
pub fn create_list(items: &[Term]) -> (Option<BlankNode>, Vec<Triple>) {
    let mut triples = Vec::with_capacity(items.len() * 2);
    let mut head = None;
    let mut rest: Term = rdf::NIL.into_owned().into();

    for item in items.iter().rev() {
        let node = BlankNode::default();
        triples.push(Triple::new(node.clone(), rdf::REST, rest));
        triples.push(Triple::new(node.clone(), rdf::FIRST, item.clone()));
        rest = node.clone().into();
        head = Some(node);
    }

    (head, triples)
}

/// Collect the members of the list starting at `head`.
pub fn unpack_list<'a>(
    dataset: &Dataset,
    head: impl Into<SubjectRef<'a>>,
    graph: Option<GraphNameRef<'_>>,
) -> Result<Vec<Term>> {
    let mut items = Vec::new();
    let head: SubjectRef<'a> = head.into();
    let mut node: Subject = head.into_owned();
    loop {
        let first = objects(dataset, node.as_ref(), rdf::FIRST, graph);
        let rest = objects(dataset, node.as_ref(), rdf::REST, graph);
        let ([first], [rest]) = (first.as_slice(), rest.as_slice()) else {
            return Err(ContextError::Parse {
                content_type: "rdf list".to_string(),
                reason: format!("malformed list at {node}"),
            });
        };
        items.push(first.clone());
        match rest {
            Term::NamedNode(nil) if nil.as_ref() == rdf::NIL => return Ok(items),
            Term::BlankNode(next) => node = next.clone().into(),
            Term::NamedNode(next) => node = next.clone().into(),
            _ => {
                return Err(ContextError::Parse {
                    content_type: "rdf list".to_string(),
                    reason: format!("list rest of {node} is a literal"),
                });
            }
        }
        if items.len() > dataset.len() {
            return Err(ContextError::Parse {
                content_type: "rdf list".to_string(),
                reason: "cyclic list".to_string(),
            });
        }
    }
}
