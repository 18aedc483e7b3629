//! Just enough JSON-LD to read context association documents published as
//! `application/ld+json`.
//!
//! Only embedded contexts are supported; there is no document loader.

use oxigraph::model::Quad;
use serde_json::Value as JsonValue;

use crate::error::{ContextError, Result};

use self::to_rdf::ToRdf;

mod context;
mod term;
mod to_rdf;

pub const CONTENT_TYPE: &str = "application/ld+json";

/// Deserialize a JSON-LD document to quads, resolving relative IRIs against
/// `base`.
pub fn to_quads(document: &str, base: &str) -> Result<Vec<Quad>> {
    let parse_error = |reason: String| ContextError::Parse {
        content_type: CONTENT_TYPE.to_string(),
        reason,
    };
    let document: JsonValue =
        serde_json::from_str(document).map_err(|e| parse_error(e.to_string()))?;
    ToRdf::new()
        .document(&document, base)
        .map_err(|e| parse_error(format!("{e:#}")))
}
