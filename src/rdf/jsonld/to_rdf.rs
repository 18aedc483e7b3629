use std::collections::HashMap;

use anyhow::{Context as AnyhowContext, Result, bail};
use oxigraph::model::{
    BlankNode, GraphName, Literal, NamedNode, NamedNodeRef, Quad, Subject, Term as RdfTerm,
};
use serde_json::{Map, Number, Value as JsonValue};

use super::context::{Context, TermDefinition};
use super::term::Term;
use crate::rdf::list::create_list;
use crate::rdf::vocab::{rdf, xsd};

type JsonObject = Map<String, JsonValue>;

/// Converts a compacted JSON-LD document straight to quads, expanding keys
/// and values against the active context on the way down.
pub(crate) struct ToRdf {
    blank_nodes: HashMap<String, BlankNode>,
    quads: Vec<Quad>,
}

impl ToRdf {
    pub(crate) fn new() -> ToRdf {
        ToRdf {
            blank_nodes: HashMap::new(),
            quads: Vec::new(),
        }
    }

    pub(crate) fn document(mut self, document: &JsonValue, base: &str) -> Result<Vec<Quad>> {
        let context = Context::new(Some(base));
        self.top_level(document, &context)?;
        Ok(self.quads)
    }

    fn top_level(&mut self, value: &JsonValue, context: &Context) -> Result<()> {
        match value {
            JsonValue::Array(items) => {
                for item in items {
                    self.top_level(item, context)?;
                }
            }
            JsonValue::Object(object) => {
                let context = scoped(object, context)?;
                // an object holding only @context and @graph is a plain container
                if is_graph_container(object, &context) {
                    if let Some(graph) = keyword_entry(object, &context, "@graph") {
                        for item in flatten(graph, &context) {
                            self.top_level(item, &context)?;
                        }
                    }
                } else {
                    self.node(object, &context, &GraphName::DefaultGraph)?;
                }
            }
            _ => bail!("top-level JSON-LD value must be an object or an array"),
        }
        Ok(())
    }

    fn node(&mut self, object: &JsonObject, context: &Context, graph: &GraphName) -> Result<Subject> {
        let context = scoped(object, context)?;
        let subject = match keyword_entry(object, &context, "@id") {
            Some(id) => {
                let id = id.as_str().context("@id must be a string")?;
                self.subject(id, &context)?
            }
            None => BlankNode::default().into(),
        };
        let subject_term: RdfTerm = subject.clone().into();

        for (key, value) in object {
            let Some(expanded) = context.expand_iri(key, false, true) else {
                continue;
            };
            match expanded {
                Term::Keyword(keyword) => match &*keyword {
                    "@type" => {
                        for item in flatten(value, &context) {
                            let item = item.as_str().context("@type values must be strings")?;
                            if let Some(class) = self.reference(item, &context, true) {
                                self.push(subject.clone(), rdf::TYPE, class, graph);
                            }
                        }
                    }
                    "@graph" => {
                        let name = match &subject {
                            Subject::NamedNode(node) => GraphName::from(node.clone()),
                            Subject::BlankNode(node) => GraphName::from(node.clone()),
                            #[allow(unreachable_patterns)]
                            _ => bail!("quoted triples cannot name a graph"),
                        };
                        for item in flatten(value, &context) {
                            let item = item.as_object().context("@graph entries must be node objects")?;
                            self.node(item, &context, &name)?;
                        }
                    }
                    "@reverse" => {
                        let reverse = value.as_object().context("@reverse must be an object")?;
                        for (property, values) in reverse {
                            let Some(predicate) = self.predicate(&context, property) else {
                                continue;
                            };
                            for item in flatten(values, &context) {
                                let item = item
                                    .as_object()
                                    .context("@reverse values must be node objects")?;
                                let reverse_subject = self.node(item, &context, graph)?;
                                self.push(reverse_subject, predicate.as_ref(), subject_term.clone(), graph);
                            }
                        }
                    }
                    "@value" | "@list" | "@set" => {
                        bail!("{keyword} cannot appear in a node object")
                    }
                    _ => {}
                },
                Term::Iri(_) => {
                    let Some(predicate) = self.predicate(&context, key) else {
                        continue;
                    };
                    let definition = context.get_term(key);
                    if definition.is_some_and(|d| d.reverse) {
                        for item in flatten(value, &context) {
                            let item = item
                                .as_object()
                                .context("reverse property values must be node objects")?;
                            let reverse_subject = self.node(item, &context, graph)?;
                            self.push(reverse_subject, predicate.as_ref(), subject_term.clone(), graph);
                        }
                        continue;
                    }

                    let objects = if definition.is_some_and(|d| d.list) && !is_list_object(value, &context) {
                        vec![self.list(value, definition, &context, graph)?]
                    } else {
                        let mut objects = Vec::new();
                        for item in flatten(value, &context) {
                            if let Some(object) = self.object(item, definition, &context, graph)? {
                                objects.push(object);
                            }
                        }
                        objects
                    };
                    for object in objects {
                        self.push(subject.clone(), predicate.as_ref(), object, graph);
                    }
                }
            }
        }

        Ok(subject)
    }

    fn object(
        &mut self,
        value: &JsonValue,
        definition: Option<&TermDefinition>,
        context: &Context,
        graph: &GraphName,
    ) -> Result<Option<RdfTerm>> {
        let type_mapping = definition.and_then(|d| d.type_mapping.as_deref());
        Ok(match value {
            JsonValue::Null => None,
            JsonValue::Bool(flag) => Some(native_literal(&flag.to_string(), xsd::BOOLEAN, type_mapping).into()),
            JsonValue::Number(number) => Some(number_literal(number, type_mapping).into()),
            JsonValue::String(string) => match type_mapping {
                Some("@id") => self.reference(string, context, false),
                Some("@vocab") => self.reference(string, context, true),
                Some(datatype) => {
                    let datatype = NamedNode::new(datatype)?;
                    Some(Literal::new_typed_literal(string, datatype).into())
                }
                None => {
                    let language = match definition.and_then(|d| d.language.as_ref()) {
                        Some(language) => language.as_deref(),
                        None => context.language.as_deref(),
                    };
                    Some(string_literal(string, language).into())
                }
            },
            JsonValue::Array(_) => bail!("nested arrays are not allowed"),
            JsonValue::Object(object) => {
                let context = scoped(object, context)?;
                if keyword_entry(object, &context, "@value").is_some() {
                    self.value_object(object, &context)?.map(Into::into)
                } else if let Some(list) = keyword_entry(object, &context, "@list") {
                    Some(self.list(list, definition, &context, graph)?)
                } else {
                    Some(self.node(object, &context, graph)?.into())
                }
            }
        })
    }

    fn value_object(&mut self, object: &JsonObject, context: &Context) -> Result<Option<Literal>> {
        let datatype = match keyword_entry(object, context, "@type") {
            Some(datatype) => {
                let datatype = datatype.as_str().context("@type of a value must be a string")?;
                match self.reference(datatype, context, true) {
                    Some(RdfTerm::NamedNode(node)) => Some(node),
                    _ => bail!("invalid typed value datatype {datatype}"),
                }
            }
            None => None,
        };
        let language = match keyword_entry(object, context, "@language") {
            Some(JsonValue::String(language)) => Some(language.to_lowercase()),
            Some(JsonValue::Null) | None => None,
            Some(value) => bail!("invalid language-tagged string language {value}"),
        };
        if datatype.is_some() && language.is_some() {
            bail!("a value cannot carry both @type and @language");
        }

        let value = keyword_entry(object, context, "@value").unwrap_or(&JsonValue::Null);
        let type_mapping = datatype.as_ref().map(NamedNode::as_str);
        Ok(match value {
            JsonValue::Null => None,
            JsonValue::String(string) => Some(match datatype {
                Some(datatype) => Literal::new_typed_literal(string, datatype),
                None => string_literal(string, language.as_deref()),
            }),
            JsonValue::Bool(flag) => Some(native_literal(&flag.to_string(), xsd::BOOLEAN, type_mapping)),
            JsonValue::Number(number) => Some(number_literal(number, type_mapping)),
            _ => bail!("invalid value object value {value}"),
        })
    }

    fn list(
        &mut self,
        value: &JsonValue,
        definition: Option<&TermDefinition>,
        context: &Context,
        graph: &GraphName,
    ) -> Result<RdfTerm> {
        let mut items = Vec::new();
        for item in flatten(value, context) {
            if let Some(term) = self.object(item, definition, context, graph)? {
                items.push(term);
            }
        }
        let (head, triples) = create_list(&items);
        self.quads
            .extend(triples.into_iter().map(|t| t.in_graph(graph.clone())));
        Ok(match head {
            Some(head) => head.into(),
            None => rdf::NIL.into_owned().into(),
        })
    }

    fn subject(&mut self, id: &str, context: &Context) -> Result<Subject> {
        match self.reference(id, context, false) {
            Some(RdfTerm::NamedNode(node)) => Ok(node.into()),
            Some(RdfTerm::BlankNode(node)) => Ok(node.into()),
            _ => bail!("invalid @id {id}"),
        }
    }

    fn predicate(&self, context: &Context, key: &str) -> Option<NamedNode> {
        match context.expand_iri(key, false, true)? {
            Term::Iri(iri) if !iri.starts_with("_:") => NamedNode::new(iri.into_owned()).ok(),
            _ => None,
        }
    }

    /// Node reference: a blank node label or an IRI. Values that do not
    /// expand to an absolute IRI are dropped.
    fn reference(&mut self, value: &str, context: &Context, vocab: bool) -> Option<RdfTerm> {
        if let Some(label) = value.strip_prefix("_:") {
            let node = self
                .blank_nodes
                .entry(label.to_owned())
                .or_insert_with(BlankNode::default);
            return Some(node.clone().into());
        }
        match context.expand_iri(value, true, vocab)? {
            Term::Iri(iri) => NamedNode::new(iri.into_owned()).ok().map(Into::into),
            Term::Keyword(_) => None,
        }
    }

    fn push(&mut self, subject: Subject, predicate: NamedNodeRef<'_>, object: RdfTerm, graph: &GraphName) {
        self.quads
            .push(Quad::new(subject, predicate, object, graph.clone()));
    }
}

fn scoped(object: &JsonObject, context: &Context) -> Result<Context> {
    match object.get("@context") {
        Some(local) => context.process(local),
        None => Ok(context.clone()),
    }
}

/// Entry of `object` whose key expands to `keyword`, aliases included.
fn keyword_entry<'a>(object: &'a JsonObject, context: &Context, keyword: &str) -> Option<&'a JsonValue> {
    object.iter().find_map(|(key, value)| {
        match context.expand_iri(key, false, true) {
            Some(Term::Keyword(expanded)) if expanded == keyword => Some(value),
            _ => None,
        }
    })
}

fn is_graph_container(object: &JsonObject, context: &Context) -> bool {
    keyword_entry(object, context, "@graph").is_some()
        && object.keys().all(|key| {
            matches!(
                context.expand_iri(key, false, true),
                Some(Term::Keyword(keyword)) if keyword == "@graph" || keyword == "@context"
            )
        })
}

fn is_list_object(value: &JsonValue, context: &Context) -> bool {
    value
        .as_object()
        .is_some_and(|object| keyword_entry(object, context, "@list").is_some())
}

/// Arrays and `@set` objects contribute their members directly.
fn flatten<'a>(value: &'a JsonValue, context: &Context) -> Vec<&'a JsonValue> {
    match value {
        JsonValue::Array(items) => items.iter().flat_map(|item| flatten(item, context)).collect(),
        JsonValue::Object(object) => match keyword_entry(object, context, "@set") {
            Some(set) => flatten(set, context),
            None => vec![value],
        },
        _ => vec![value],
    }
}

fn string_literal(value: &str, language: Option<&str>) -> Literal {
    language
        .and_then(|language| Literal::new_language_tagged_literal(value, language).ok())
        .unwrap_or_else(|| Literal::new_simple_literal(value))
}

fn native_literal(lexical: &str, default: NamedNodeRef<'_>, type_mapping: Option<&str>) -> Literal {
    match type_mapping.and_then(|t| NamedNode::new(t).ok()) {
        Some(datatype) => Literal::new_typed_literal(lexical, datatype),
        None => Literal::new_typed_literal(lexical, default),
    }
}

/// Integers stay `xsd:integer`; anything with a fractional part (or too
/// large for the integer form) becomes a canonical `xsd:double`.
fn number_literal(number: &Number, type_mapping: Option<&str>) -> Literal {
    let as_double = type_mapping == Some(xsd::DOUBLE.as_str());
    if !as_double && (number.is_i64() || number.is_u64()) {
        return native_literal(&number.to_string(), xsd::INTEGER, type_mapping);
    }
    let value = number.as_f64().unwrap_or_default();
    if !as_double && value.fract() == 0.0 && value.abs() < 1e21 {
        return native_literal(&format!("{value:.0}"), xsd::INTEGER, type_mapping);
    }
    native_literal(&canonical_double(value), xsd::DOUBLE, type_mapping)
}

fn canonical_double(value: f64) -> String {
    let formatted = format!("{value:E}");
    match formatted.split_once('E') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => format!("{mantissa}.0E{exponent}"),
        _ => formatted,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use oxigraph::model::{GraphName, Literal, NamedNode, Quad, Subject, Term};
    use serde_json::json;

    use super::{ToRdf, canonical_double};
    use crate::rdf::vocab::{rdf, xsd};

    const BASE: &str = "https://example.org/data/doc";

    fn convert(document: serde_json::Value) -> Result<Vec<Quad>> {
        ToRdf::new().document(&document, BASE)
    }

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(value)
    }

    fn has(quads: &[Quad], subject: &NamedNode, predicate: &str, object: impl Into<Term>) -> bool {
        let object = object.into();
        quads.iter().any(|q| {
            q.subject == Subject::from(subject.clone())
                && q.predicate.as_str() == predicate
                && q.object == object
        })
    }

    #[test]
    fn node_with_coerced_values() -> Result<()> {
        let quads = convert(json!({
            "@context": {
                "ex": "https://example.org/ns#",
                "id": "@id",
                "type": "@type",
                "knows": { "@id": "ex:knows", "@type": "@id" },
                "born": { "@id": "ex:born", "@type": "http://www.w3.org/2001/XMLSchema#date" },
                "name": { "@id": "ex:name", "@language": "en" }
            },
            "id": "alice",
            "type": "ex:Person",
            "knows": ["bob", "https://example.com/carol"],
            "born": "1990-01-01",
            "name": "Alice",
            "ex:age": 42,
            "ex:height": 1.75,
            "ex:active": true,
            "unmapped": "dropped"
        }))?;

        let alice = iri("https://example.org/data/alice");
        assert!(has(&quads, &alice, rdf::TYPE.as_str(), iri("https://example.org/ns#Person")));
        assert!(has(&quads, &alice, "https://example.org/ns#knows", iri("https://example.org/data/bob")));
        assert!(has(&quads, &alice, "https://example.org/ns#knows", iri("https://example.com/carol")));
        assert!(has(
            &quads,
            &alice,
            "https://example.org/ns#born",
            Literal::new_typed_literal("1990-01-01", xsd::DATE)
        ));
        assert!(has(
            &quads,
            &alice,
            "https://example.org/ns#name",
            Literal::new_language_tagged_literal_unchecked("Alice", "en")
        ));
        assert!(has(
            &quads,
            &alice,
            "https://example.org/ns#age",
            Literal::new_typed_literal("42", xsd::INTEGER)
        ));
        assert!(has(
            &quads,
            &alice,
            "https://example.org/ns#height",
            Literal::new_typed_literal("1.75E0", xsd::DOUBLE)
        ));
        assert!(has(
            &quads,
            &alice,
            "https://example.org/ns#active",
            Literal::new_typed_literal("true", xsd::BOOLEAN)
        ));
        assert_eq!(quads.len(), 8);
        Ok(())
    }

    #[test]
    fn named_graphs_and_blank_nodes() -> Result<()> {
        let quads = convert(json!({
            "@context": { "@vocab": "https://example.org/ns#" },
            "@graph": [
                {
                    "@id": "_:g",
                    "@graph": [
                        { "@id": "https://example.org/s", "ref": { "@id": "_:shared" } }
                    ]
                },
                { "@id": "_:shared", "label": "shared node" }
            ]
        }))?;

        assert_eq!(quads.len(), 2);
        let in_graph = quads
            .iter()
            .find(|q| q.predicate.as_str() == "https://example.org/ns#ref")
            .unwrap();
        assert!(matches!(in_graph.graph_name, GraphName::BlankNode(_)));
        let labelled = quads
            .iter()
            .find(|q| q.predicate.as_str() == "https://example.org/ns#label")
            .unwrap();
        assert_eq!(labelled.graph_name, GraphName::DefaultGraph);
        assert_eq!(Term::from(labelled.subject.clone()), in_graph.object);
        Ok(())
    }

    #[test]
    fn lists_and_values() -> Result<()> {
        let quads = convert(json!({
            "@context": {
                "ex": "https://example.org/ns#",
                "items": { "@id": "ex:items", "@container": "@list" }
            },
            "@id": "https://example.org/s",
            "items": ["a", "b"],
            "ex:empty": { "@list": [] },
            "ex:typed": { "@value": "5", "@type": "ex:Score" }
        }))?;

        let subject = iri("https://example.org/s");
        assert!(has(&quads, &subject, "https://example.org/ns#empty", rdf::NIL.into_owned()));
        assert!(has(
            &quads,
            &subject,
            "https://example.org/ns#typed",
            Literal::new_typed_literal("5", iri("https://example.org/ns#Score"))
        ));
        let firsts = quads.iter().filter(|q| q.predicate == rdf::FIRST).count();
        assert_eq!(firsts, 2);
        Ok(())
    }

    #[test]
    fn invalid_documents() {
        assert!(convert(json!("just a string")).is_err());
        assert!(convert(json!({ "@context": "https://www.w3.org/ns/activitystreams" })).is_err());
        assert!(convert(json!({ "@id": 5 })).is_err());
    }

    #[test]
    fn double_formatting() {
        assert_eq!(canonical_double(1.75), "1.75E0");
        assert_eq!(canonical_double(1e21), "1.0E21");
    }
}
