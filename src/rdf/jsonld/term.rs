use std::borrow::Cow;

/// Keywords recognised by the expansion algorithm, kept sorted for lookup.
const KEYWORDS: &[&str] = &[
    "@base", "@container", "@context", "@direction", "@graph", "@id", "@import",
    "@included", "@index", "@json", "@language", "@list", "@nest", "@none", "@prefix",
    "@propagate", "@protected", "@reverse", "@set", "@type", "@value", "@version", "@vocab",
];

/// What a JSON-LD key or value expands to: an IRI (possibly a blank node
/// label or a relative reference that could not be resolved) or a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Term {
    Iri(Cow<'static, str>),
    Keyword(Cow<'static, str>),
}

pub(crate) const CONTEXT: Term = Term::Keyword(Cow::Borrowed("@context"));
pub(crate) const TYPE: Term = Term::Keyword(Cow::Borrowed("@type"));

impl Term {
    pub(crate) fn new_iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into().into())
    }

    pub(crate) fn new_keyword(keyword: &str) -> Self {
        Self::Keyword(String::from(keyword).into())
    }

    pub(crate) fn as_str(&self) -> &str {
        let (Self::Iri(text) | Self::Keyword(text)) = self;
        text
    }

    pub(crate) fn is_keyword(&self) -> bool {
        matches!(self, Self::Keyword(_))
    }

    /// Compact IRI expansion; keywords never act as prefixes.
    pub(crate) fn join(&self, suffix: &str) -> Option<Self> {
        let Self::Iri(prefix) = self else {
            return None;
        };
        Some(Self::new_iri([prefix.as_ref(), suffix].concat()))
    }
}

pub(crate) fn is_keyword(value: &str) -> bool {
    KEYWORDS.binary_search(&value).is_ok()
}

/// `@` followed only by ASCII letters. Such values are reserved and get
/// dropped during expansion unless they are real keywords.
pub(crate) fn has_keyword_form(value: &str) -> bool {
    match value.strip_prefix('@') {
        Some(rest) if !rest.is_empty() => rest.bytes().all(|b| b.is_ascii_alphabetic()),
        _ => false,
    }
}
