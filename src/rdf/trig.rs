//! TriG rendering of context associations, and parsing of every accepted RDF
//! syntax.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{BlankNode, BlankNodeRef, Dataset, GraphNameRef, Quad, SubjectRef, Term};

use super::jsonld;
use super::vocab::{PREFIXES, rdf};
use crate::error::{ContextError, Result};

pub const TRIG: &str = "application/trig";

/// Media types accepted as RDF input.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    TRIG,
    "application/n-quads",
    "text/turtle",
    "application/n-triples",
    "text/n3",
    jsonld::CONTENT_TYPE,
    "application/rdf+xml",
];

pub fn is_accepted(content_type: &str) -> bool {
    ACCEPTED_CONTENT_TYPES.contains(&content_type)
}

/// Parse `body` as `content_type`, resolving relative IRIs against `base`.
///
/// Blank node labels are replaced by fresh identifiers so that documents
/// loaded separately never share blank nodes.
pub fn parse_document(body: &str, content_type: &str, base: &str) -> Result<Vec<Quad>> {
    if content_type == jsonld::CONTENT_TYPE {
        return jsonld::to_quads(body, base);
    }
    let format = RdfFormat::from_media_type(content_type)
        .filter(|_| is_accepted(content_type))
        .ok_or_else(|| ContextError::UnsupportedContentType {
            url: base.to_string(),
            content_type: content_type.to_string(),
        })?;
    let parse_error = |reason: String| ContextError::Parse {
        content_type: content_type.to_string(),
        reason,
    };

    let mut parser = RdfParser::from_format(format).rename_blank_nodes();
    if !base.is_empty() {
        parser = parser
            .with_base_iri(base)
            .map_err(|e| parse_error(e.to_string()))?;
    }
    parser
        .for_reader(body.as_bytes())
        .map(|quad| quad.map_err(|e| parse_error(e.to_string())))
        .collect()
}

/// Render `dataset` as TriG.
///
/// With `beautify_lists`, well-formed RDF lists are written as `( … )`
/// collections instead of `rdf:first`/`rdf:rest` chains.
pub fn serialize_trig(dataset: &Dataset, beautify_lists: bool) -> Result<String> {
    if dataset.is_empty() {
        return Ok(String::new());
    }
    let lists = if beautify_lists {
        Lists::collect(dataset)
    } else {
        Lists::default()
    };

    let mut quads: Vec<Quad> = dataset
        .iter()
        .map(|q| q.into_owned())
        .filter(|q| !lists.withheld.contains(q))
        .collect();
    quads.sort_by(compare_quads);

    let mut serializer = RdfSerializer::from_format(RdfFormat::TriG);
    for (prefix, namespace) in PREFIXES {
        serializer = serializer
            .with_prefix(*prefix, *namespace)
            .map_err(internal)?;
    }
    let mut writer = serializer.for_writer(Vec::new());
    for quad in &quads {
        writer.serialize_quad(quad).map_err(internal)?;
    }
    let bytes = writer.finish().map_err(internal)?;
    let mut trig = String::from_utf8(bytes).map_err(internal)?;

    for (head, items) in &lists.items {
        if lists.nested.contains(head) {
            continue;
        }
        let mut rendered = String::new();
        write_collection(&mut rendered, items, &lists);
        trig = replace_token(&trig, &format!("_:{}", head.as_str()), &rendered);
    }
    Ok(layout(&trig))
}

fn internal(e: impl std::fmt::Display) -> ContextError {
    ContextError::Internal(format!("trig output: {e}"))
}

/// Default graph first, then graphs, subjects and predicates in lexical order.
fn compare_quads(a: &Quad, b: &Quad) -> Ordering {
    let graph_key = |q: &Quad| (!q.graph_name.is_default_graph(), q.graph_name.to_string());
    graph_key(a)
        .cmp(&graph_key(b))
        .then_with(|| a.subject.to_string().cmp(&b.subject.to_string()))
        .then_with(|| (a.predicate != rdf::TYPE).cmp(&(b.predicate != rdf::TYPE)))
        .then_with(|| a.predicate.as_str().cmp(b.predicate.as_str()))
        .then_with(|| a.object.to_string().cmp(&b.object.to_string()))
}

/// A blank line after the prefix block; no trailing newline.
fn layout(trig: &str) -> String {
    let mut result = String::with_capacity(trig.len() + 1);
    let mut in_prelude = true;
    for line in trig.lines() {
        if in_prelude && !line.starts_with('@') {
            in_prelude = false;
            result.push('\n');
        }
        result.push_str(line);
        result.push('\n');
    }
    result.trim_end().to_string()
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Replace `token` where it is not immediately followed by another name
/// character.
fn replace_token(text: &str, token: &str, replacement: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(position) = rest.find(token) {
        let after = &rest[position + token.len()..];
        result.push_str(&rest[..position]);
        if after.starts_with(is_name_char) {
            result.push_str(token);
        } else {
            result.push_str(replacement);
        }
        rest = after;
    }
    result.push_str(rest);
    result
}

/// Collection members in N-Triples term syntax, nested lists expanded.
fn write_collection(out: &mut String, items: &[Term], lists: &Lists) {
    out.push('(');
    for item in items {
        out.push(' ');
        match item {
            Term::BlankNode(node) if lists.nested.contains(node) => match lists.items.get(node) {
                Some(nested) => write_collection(out, nested, lists),
                None => out.push_str(&item.to_string()),
            },
            _ => out.push_str(&item.to_string()),
        }
    }
    out.push_str(" )");
}

/// Lists eligible for collection syntax: blank node chains whose nodes carry
/// nothing but `rdf:first`/`rdf:rest` and are referenced exactly once.
#[derive(Default)]
struct Lists {
    items: HashMap<BlankNode, Vec<Term>>,
    /// Heads that are themselves members of another collected list.
    nested: HashSet<BlankNode>,
    withheld: HashSet<Quad>,
}

impl Lists {
    fn collect(dataset: &Dataset) -> Lists {
        let mut lists = Lists::default();
        for quad in dataset.iter() {
            if quad.predicate != rdf::FIRST {
                continue;
            }
            let SubjectRef::BlankNode(head) = quad.subject else {
                continue;
            };
            if lists.items.contains_key(&head.into_owned()) {
                continue;
            }
            if dataset.quads_for_object(head).any(|q| q.predicate == rdf::REST) {
                continue;
            }
            if let Some((items, quads)) = walk_list(dataset, head, quad.graph_name) {
                lists.withheld.extend(quads);
                lists.items.insert(head.into_owned(), items);
            }
        }

        let heads: Vec<BlankNode> = lists.items.keys().cloned().collect();
        for head in heads {
            let is_member = dataset
                .quads_for_object(head.as_ref())
                .any(|q| q.predicate == rdf::FIRST && lists.withheld.contains(&q.into_owned()));
            if is_member {
                lists.nested.insert(head);
            }
        }
        lists
    }
}

fn walk_list(
    dataset: &Dataset,
    head: BlankNodeRef<'_>,
    graph: GraphNameRef<'_>,
) -> Option<(Vec<Term>, Vec<Quad>)> {
    let mut node = head.into_owned();
    let mut items = Vec::new();
    let mut quads = Vec::new();
    loop {
        if dataset.quads_for_object(node.as_ref()).count() != 1 {
            return None;
        }
        let statements: Vec<Quad> = dataset
            .quads_for_subject(node.as_ref())
            .map(|q| q.into_owned())
            .collect();
        let [a, b] = statements.as_slice() else {
            return None;
        };
        let (first, rest) = match (a.predicate.as_ref(), b.predicate.as_ref()) {
            (p, r) if p == rdf::FIRST && r == rdf::REST => (a, b),
            (r, p) if p == rdf::FIRST && r == rdf::REST => (b, a),
            _ => return None,
        };
        if first.graph_name.as_ref() != graph || rest.graph_name.as_ref() != graph {
            return None;
        }
        items.push(first.object.clone());
        let next = rest.object.clone();
        quads.push(first.clone());
        quads.push(rest.clone());
        match next {
            Term::NamedNode(nil) if nil == rdf::NIL => return Some((items, quads)),
            Term::BlankNode(next) if quads.len() <= dataset.len() => node = next,
            _ => return None,
        }
    }
}
