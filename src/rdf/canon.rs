//! RDF Dataset Canonicalization (RDFC-1.0) and graph hashing.
//!
//! Canonical labels come from `rdf-canon` with SHA-256 as the internal hash.
//! The graph hash is the SHA-512 of the sorted canonical N-Quads document.
//!
//! Hash N-Degree Quads is exponential on highly symmetric inputs, so its
//! invocations are bounded. Inputs that exhaust the budget are rejected
//! rather than retried.

use oxigraph::model::Quad;
use rdf_canon::{CanonicalizationError, CanonicalizationOptions, canonicalize_quads_with};
use sha2::{Digest, Sha256, Sha512};

use crate::error::{ContextError, Result};

const WORK_BUDGET: usize = 100_000;

impl From<CanonicalizationError> for ContextError {
    fn from(e: CanonicalizationError) -> ContextError {
        ContextError::Canonicalization(e.to_string())
    }
}

/// Canonical N-Quads for `quads`, independent of input order and blank node
/// labels.
pub fn canonicalize(quads: &[Quad]) -> Result<String> {
    let options = CanonicalizationOptions {
        hndq_call_limit: Some(WORK_BUDGET),
    };
    Ok(canonicalize_quads_with::<Sha256>(quads, &options)?)
}

/// Lowercase hex SHA-512 of the canonical form of `quads`.
pub fn hash_quads(quads: &[Quad]) -> Result<String> {
    let canonical = canonicalize(quads)?;
    Ok(format!("{:x}", Sha512::digest(canonical.as_bytes())))
}
