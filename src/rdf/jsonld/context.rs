use std::collections::{BTreeMap, HashMap};

use anyhow::{Context as AnyhowContext, Result, bail};
use serde_json::{Map, Value as JsonValue, json};

use super::term::{self, Term};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TermDefinition {
    /// `None` for terms explicitly mapped to null.
    pub(crate) iri: Option<Term>,
    pub(crate) prefix: bool,
    /// `@id`, `@vocab`, or an expanded datatype IRI.
    pub(crate) type_mapping: Option<String>,
    /// `Some(None)` resets the default language for this term.
    pub(crate) language: Option<Option<String>>,
    pub(crate) list: bool,
    pub(crate) reverse: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Context {
    pub(crate) base: Option<String>,
    pub(crate) language: Option<String>,
    pub(crate) vocab: Option<String>,
    pub(crate) terms: BTreeMap<String, TermDefinition>,
    original_base: Option<String>,
}

impl Context {
    pub(crate) fn new(base: Option<&str>) -> Context {
        Context {
            base: base.map(str::to_owned),
            original_base: base.map(str::to_owned),
            ..Context::default()
        }
    }

    pub(crate) fn get_term(&self, term: &str) -> Option<&TermDefinition> {
        self.terms.get(term)
    }

    /// Apply a local context to this active context, following
    /// https://www.w3.org/TR/json-ld11-api/#context-processing-algorithm
    ///
    /// Only embedded contexts are processed. Remote contexts would need a
    /// document loader and are rejected.
    pub(crate) fn process(&self, local_context: &JsonValue) -> Result<Context> {
        // 4.1.2.4 Normalize context to an array
        let contexts = match local_context {
            JsonValue::Array(items) => items.clone(),
            other => vec![other.clone()],
        };

        let mut result = self.clone();
        for context in &contexts {
            match context {
                // 4.1.2.5.1 override
                JsonValue::Null => {
                    result = Context::new(self.original_base.as_deref());
                }
                // 4.1.2.5.2
                JsonValue::String(remote_context) => {
                    bail!("remote context {remote_context} cannot be loaded");
                }
                // 4.1.2.5.4
                JsonValue::Object(definition) => {
                    process_context_definition(definition, &mut result)?;
                }
                // 4.1.2.5.3
                _ => {
                    bail!("invalid local context (not null, string, or map)");
                }
            }
        }

        Ok(result)
    }

    /// IRI expansion against this context, after processing finished.
    ///
    /// Returns `None` for values that expand to nothing (null mappings and
    /// keyword-like strings).
    pub(crate) fn expand_iri(&self, value: &str, document_relative: bool, vocab: bool) -> Option<Term> {
        // 5.2.2.1
        if term::is_keyword(value) {
            return Some(Term::new_keyword(value));
        }
        // 5.2.2.2
        if term::has_keyword_form(value) {
            return None;
        }
        // 5.2.2.5
        if vocab {
            if let Some(definition) = self.get_term(value) {
                return definition.iri.clone();
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            // 5.2.2.6.2
            if prefix == "_" || suffix.starts_with("//") {
                return Some(Term::new_iri(value));
            }
            // 5.2.2.6.4
            if let Some(Some(mapping)) = self.get_term(prefix).map(|d| &d.iri) {
                if let Some(joined) = mapping.join(suffix) {
                    return Some(joined);
                }
            }
            // 5.2.2.6.5 absolute IRI
            return Some(Term::new_iri(value));
        }
        // 5.2.2.7
        if vocab {
            if let Some(vocab) = &self.vocab {
                return Some(Term::new_iri(format!("{vocab}{value}")));
            }
        }
        // 5.2.2.8
        if document_relative {
            if let Some(resolved) = resolve(self.base.as_deref(), value) {
                return Some(Term::new_iri(resolved));
            }
        }
        Some(Term::new_iri(value))
    }
}

fn resolve(base: Option<&str>, value: &str) -> Option<String> {
    let base = reqwest::Url::parse(base?).ok()?;
    base.join(value).ok().map(String::from)
}

fn process_context_definition(context: &Map<String, JsonValue>, active: &mut Context) -> Result<()> {
    let mut state = HashMap::new();

    // 4.1.2.5.5
    match context.get("@version") {
        Some(JsonValue::Number(number)) => {
            if number.as_f64().unwrap_or_default() != 1.1 {
                bail!("invalid @version value {number}");
            }
        }
        Some(value) => {
            bail!("invalid @version value {value}");
        }
        None => {}
    }
    if context.contains_key("@import") {
        bail!("@import requires loading a remote context");
    }

    // 4.1.2.5.7
    match context.get("@base") {
        Some(JsonValue::Null) => {
            active.base = None;
        }
        Some(JsonValue::String(value)) => {
            active.base = resolve(active.base.as_deref(), value).or_else(|| Some(value.clone()));
        }
        Some(value) => bail!("invalid base IRI {value}"),
        None => {}
    }
    // 4.1.2.5.8
    match context.get("@vocab") {
        Some(JsonValue::Null) => {
            active.vocab = None;
        }
        Some(JsonValue::String(value)) => {
            let vocab = iri_expand(active, value, context, &mut state, true, true)?
                .context("vocabulary mapping expands to nothing")?;
            if vocab.is_keyword() {
                bail!("invalid vocabulary mapping {value}");
            }
            active.vocab = Some(vocab.as_str().to_owned());
        }
        Some(value) => bail!("invalid vocabulary mapping {value}"),
        None => {}
    }
    // 4.1.2.5.9
    match context.get("@language") {
        Some(JsonValue::Null) => {
            active.language = None;
        }
        Some(JsonValue::String(lang)) => {
            active.language = Some(lang.to_lowercase());
        }
        Some(value) => bail!("invalid default language {value}"),
        None => {}
    }
    // skip @direction and @propagate

    // 4.1.2.5.13
    for (key, value) in context {
        if [
            "@base",
            "@direction",
            "@import",
            "@language",
            "@propagate",
            "@protected",
            "@version",
            "@vocab",
        ]
        .contains(&key.as_str())
        {
            continue;
        }
        create_term_definition(active, context, key, value, &mut state)?;
    }

    Ok(())
}

/// Where a term stands while one local context is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Pending,
    Done,
}

fn create_term_definition(
    active: &mut Context,
    context: &Map<String, JsonValue>,
    term: &str,
    value: &JsonValue,
    state: &mut HashMap<String, Progress>,
) -> Result<()> {
    // 4.2.2.1
    match state.get(term) {
        Some(Progress::Done) => return Ok(()),
        Some(Progress::Pending) => bail!("term {term} is defined in terms of itself"),
        _ => {}
    }
    // 4.2.2.2
    if term.is_empty() {
        bail!("invalid term definition (empty string)");
    }
    state.insert(term.to_owned(), Progress::Pending);

    // 4.2.2.5
    if term::is_keyword(term) {
        bail!("keyword redefinition error");
    }
    if term::has_keyword_form(term) {
        state.insert(term.to_owned(), Progress::Done);
        return Ok(());
    }
    // 4.2.2.6
    active.terms.remove(term);

    let (value, simple_term) = match value {
        // 4.2.2.7
        JsonValue::Null => (json!({ "@id": null }), false),
        // 4.2.2.8
        JsonValue::String(string) => (json!({ "@id": string }), true),
        // 4.2.2.9
        JsonValue::Object(_) => (value.clone(), false),
        _ => bail!("invalid term definition error"),
    };
    let value = value
        .as_object()
        .context("term definition should be a JSON object")?;

    // 4.2.2.11
    let mut definition = TermDefinition::default();

    // 4.2.2.12
    match value.get("@type") {
        Some(JsonValue::String(type_mapping)) => {
            let expanded = iri_expand(active, type_mapping, context, state, false, true)?
                .context("type mapping expands to nothing")?;
            match &expanded {
                Term::Keyword(keyword) if keyword == "@id" || keyword == "@vocab" => {}
                Term::Keyword(keyword) => bail!("invalid type mapping {keyword}"),
                Term::Iri(iri) if !iri.contains(':') => bail!("invalid type mapping {iri}"),
                Term::Iri(_) => {}
            }
            definition.type_mapping = Some(expanded.as_str().to_owned());
        }
        Some(value) => bail!("invalid type mapping {value}"),
        None => {}
    }

    // 4.2.2.13
    if let Some(reverse) = value.get("@reverse") {
        if value.contains_key("@id") {
            bail!("invalid reverse property (has @id)");
        }
        let reverse = reverse
            .as_str()
            .context("invalid IRI mapping (@reverse is not a string)")?;
        let expanded = iri_expand(active, reverse, context, state, false, true)?
            .context("reverse property expands to nothing")?;
        if !expanded.as_str().contains(':') {
            bail!("invalid IRI mapping (reverse property {reverse})");
        }
        definition.iri = Some(expanded);
        definition.reverse = true;
        active.terms.insert(term.to_owned(), definition);
        state.insert(term.to_owned(), Progress::Done);
        return Ok(());
    }

    match value.get("@id") {
        // 4.2.2.14.1
        Some(JsonValue::Null) => {}
        Some(JsonValue::String(id)) if id != term => {
            // 4.2.2.14.2.2
            if term::has_keyword_form(id) && !term::is_keyword(id) {
                state.insert(term.to_owned(), Progress::Done);
                return Ok(());
            }
            // 4.2.2.14.2.3
            let mapping = iri_expand(active, id, context, state, false, true)?
                .context("invalid IRI mapping (expands to nothing)")?;
            if mapping == term::CONTEXT {
                bail!("invalid keyword alias error (@context cannot be aliased)");
            }
            if !mapping.is_keyword() && !mapping.as_str().contains(':') {
                bail!("invalid IRI mapping ({id} is not absolute)");
            }
            // 4.2.2.14.2.4
            if term.contains(':') || term.contains('/') {
                // 4.2.2.14.2.4.1
                state.insert(term.to_owned(), Progress::Done);
                // 4.2.2.14.2.4.2
                if Some(&mapping) != iri_expand(active, term, context, state, false, true)?.as_ref() {
                    bail!("invalid IRI mapping (term mismatch)");
                }
            // 4.2.2.14.2.5
            } else if simple_term {
                definition.prefix = [':', '/', '?', '#', '[', ']', '@']
                    .iter()
                    .any(|delim| mapping.as_str().ends_with(*delim));
            }
            definition.iri = Some(mapping);
        }
        Some(JsonValue::String(_)) | None => {
            // 4.2.2.15
            if let Some((term_prefix, suffix)) = term.split_once(':') {
                if term_prefix != "_" && !suffix.starts_with("//") {
                    // 4.2.2.15.1
                    if let Some(prefix_value) = context.get(term_prefix) {
                        create_term_definition(active, context, term_prefix, prefix_value, state)?;
                    }
                }
                // 4.2.2.15.2
                definition.iri = match active.get_term(term_prefix).and_then(|d| d.iri.as_ref()) {
                    Some(prefix) if term_prefix != "_" => prefix.join(suffix),
                    // 4.2.2.15.3
                    _ => Some(Term::new_iri(term)),
                };
            // 4.2.2.16
            } else if term.contains('/') {
                definition.iri = iri_expand(active, term, context, state, false, true)?;
            // 4.2.2.17
            } else if term == "@type" {
                definition.iri = Some(term::TYPE);
            // 4.2.2.18
            } else if let Some(vocab) = &active.vocab {
                definition.iri = Some(Term::new_iri(format!("{vocab}{term}")));
            } else {
                bail!("invalid IRI mapping (no vocabulary mapping for {term})");
            }
        }
        // 4.2.2.14.2.1
        Some(_) => bail!("invalid IRI mapping error (entry is not a string)"),
    }

    // 4.2.2.19
    match value.get("@container") {
        Some(container) => {
            let containers: Vec<&JsonValue> = match container {
                JsonValue::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for container in containers {
                match container.as_str() {
                    Some("@list") => definition.list = true,
                    Some("@set" | "@index" | "@language" | "@graph" | "@id" | "@type") => {}
                    _ => bail!("invalid container mapping {container}"),
                }
            }
        }
        None => {}
    }

    // 4.2.2.22
    match value.get("@language") {
        Some(JsonValue::Null) => definition.language = Some(None),
        Some(JsonValue::String(lang)) => definition.language = Some(Some(lang.to_lowercase())),
        Some(value) => bail!("invalid language mapping {value}"),
        None => {}
    }

    // 4.2.2.25
    match value.get("@prefix") {
        Some(JsonValue::Bool(is_prefix)) => {
            definition.prefix = *is_prefix;
            if definition.prefix && definition.iri.as_ref().is_some_and(Term::is_keyword) {
                bail!("invalid term definition (keyword as prefix)");
            }
        }
        Some(_) => {
            bail!("invalid @prefix value")
        }
        _ => {}
    }

    for entry in value.keys() {
        if ![
            "@id",
            "@reverse",
            "@container",
            "@context",
            "@direction",
            "@index",
            "@language",
            "@nest",
            "@prefix",
            "@protected",
            "@type",
        ]
        .contains(&entry.as_str())
        {
            bail!("invalid term definition (unknown keyword {entry})");
        }
    }

    active.terms.insert(term.to_owned(), definition);
    state.insert(term.to_owned(), Progress::Done);

    Ok(())
}

/// IRI expansion while a local context is still being processed: terms the
/// value depends on are defined first.
fn iri_expand(
    active_context: &mut Context,
    value: &str,
    local_context: &Map<String, JsonValue>,
    state: &mut HashMap<String, Progress>,
    document_relative: bool,
    vocab: bool,
) -> Result<Option<Term>> {
    // 5.2.2.3
    if let Some(entry_value) = local_context.get(value) {
        if state.get(value) != Some(&Progress::Done) {
            create_term_definition(active_context, local_context, value, entry_value, state)?;
        }
    }
    // 5.2.2.6.3
    if let Some((prefix, _)) = value.split_once(':') {
        if let Some(prefix_value) = local_context.get(prefix) {
            if state.get(prefix) != Some(&Progress::Done) {
                create_term_definition(active_context, local_context, prefix, prefix_value, state)?;
            }
        }
    }
    Ok(active_context.expand_iri(value, document_relative, vocab))
}
