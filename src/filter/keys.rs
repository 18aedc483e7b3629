use std::collections::HashMap;
use std::fmt;

use oxigraph::model::{Dataset, Term};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ContextError, Result};
use crate::rdf::term_graph;
use crate::signature::{self, CryptoSuite, find_proofs};
use crate::source::RdfSource;

/// Where the public key of an issuer is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocation {
    /// URL or file path of a JWK document.
    Remote(String),
    Inline(String),
}

impl KeyLocation {
    /// Inline JWK when `value` is a JSON object, a location otherwise.
    pub fn parse(value: &str) -> KeyLocation {
        let trimmed = value.trim();
        if trimmed.starts_with('{') {
            KeyLocation::Inline(trimmed.to_string())
        } else {
            KeyLocation::Remote(trimmed.to_string())
        }
    }
}

/// Public keys of trusted issuers, by webId. Fixed once built.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    keys: HashMap<String, KeyLocation>,
}

impl KeyRegistry {
    pub fn new(entries: impl IntoIterator<Item = (String, KeyLocation)>) -> KeyRegistry {
        KeyRegistry {
            keys: entries.into_iter().collect(),
        }
    }

    /// Every configured identity that has a public key.
    pub fn from_config(config: &Config) -> KeyRegistry {
        KeyRegistry::new(config.identities.iter().filter_map(|identity| {
            let key = identity.public_key.as_deref()?;
            Some((identity.web_id.clone(), KeyLocation::parse(key)))
        }))
    }

    pub fn location(&self, issuer: &str) -> Option<&KeyLocation> {
        self.keys.get(issuer)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Import the public key of `issuer`. `None` for unknown issuers.
    pub async fn public_key<C: CryptoSuite>(
        &self,
        suite: &C,
        issuer: &str,
        source: &impl RdfSource,
    ) -> Result<Option<C::PublicKey>> {
        let jwk = match self.location(issuer) {
            None => return Ok(None),
            Some(KeyLocation::Inline(jwk)) => jwk.clone(),
            Some(KeyLocation::Remote(url)) => source.load_text(url).await?,
        };
        suite.import_public_key(&jwk).map(Some)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    /// The proof does not match the graph contents.
    Invalid,
    /// No public key is registered for the issuer.
    UnknownIssuer,
    Error(String),
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Verified => write!(f, "verified"),
            VerificationStatus::Invalid => write!(f, "invalid"),
            VerificationStatus::UnknownIssuer => write!(f, "unknown issuer"),
            VerificationStatus::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// Outcome of checking one proof found in a source.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRecord {
    /// Index of the source the proof was found in.
    pub source: usize,
    pub issuer: Term,
    pub target: Term,
    pub status: VerificationStatus,
}

impl VerificationRecord {
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }
}

/// Check every proof in `dataset` against the registered keys.
pub async fn verify_proofs<C: CryptoSuite>(
    suite: &C,
    keys: &KeyRegistry,
    source: &impl RdfSource,
    index: usize,
    dataset: &Dataset,
) -> Vec<VerificationRecord> {
    let mut records = Vec::new();
    for proof in find_proofs(dataset) {
        let status = match check(suite, keys, source, dataset, &proof).await {
            Ok(status) => status,
            Err(e) => VerificationStatus::Error(e.to_string()),
        };
        if status == VerificationStatus::Verified {
            debug!(target: "filter", "proof by {} over {} verified", proof.issuer, proof.target);
        } else {
            warn!(target: "filter", "proof by {} over {}: {status}", proof.issuer, proof.target);
        }
        records.push(VerificationRecord {
            source: index,
            issuer: proof.issuer,
            target: proof.target,
            status,
        });
    }
    records
}

async fn check<C: CryptoSuite>(
    suite: &C,
    keys: &KeyRegistry,
    source: &impl RdfSource,
    dataset: &Dataset,
    proof: &signature::ProofRecord,
) -> Result<VerificationStatus> {
    let Term::NamedNode(issuer) = &proof.issuer else {
        return Ok(VerificationStatus::UnknownIssuer);
    };
    let Some(key) = keys.public_key(suite, issuer.as_str(), source).await? else {
        return Ok(VerificationStatus::UnknownIssuer);
    };
    let target = term_graph(&proof.target)
        .ok_or_else(|| ContextError::MissingTargetGraph(proof.target.to_string()))?;
    let valid = signature::verify(suite, dataset, target.as_ref(), &proof.proof_value, &key)?;
    Ok(if valid {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Invalid
    })
}
