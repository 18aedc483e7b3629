//! Integrity proofs over graph contents.
//!
//! A proof signs the digest of the canonical form of one graph. Proofs are
//! stored as `sig:DataIntegrityProof` nodes in metadata graphs, pointing at
//! the signed graph through `sig:target`.

mod suite;

use std::sync::Arc;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use jiff::Timestamp;
use oxigraph::model::{
    BlankNode, Dataset, GraphName, GraphNameRef, Literal, NamedNode, Quad, Subject, Term, Triple,
};
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::error::{ContextError, Result};
use crate::rdf::vocab::{rdf, sig};
use crate::rdf::{date_time_literal, named_node, objects, quads_in_graph, subjects_with};

pub use self::suite::{CryptoSuite, EcdsaP384, KeyPair, generate_key_pair};

pub const PROOF_PURPOSE: &str = "assertionMethod";
pub const CANONICALIZATION_METHOD: &str = "c14n";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Key material and identity used to sign graphs.
pub struct SignatureOptions<C: CryptoSuite = EcdsaP384> {
    pub suite: Arc<C>,
    pub private_key: C::PrivateKey,
    /// WebID of the signing agent.
    pub issuer: NamedNode,
    /// Where verifiers find the public key.
    pub verification_method: NamedNode,
    pub timeout: Duration,
}

impl<C: CryptoSuite> Clone for SignatureOptions<C> {
    fn clone(&self) -> Self {
        SignatureOptions {
            suite: self.suite.clone(),
            private_key: self.private_key.clone(),
            issuer: self.issuer.clone(),
            verification_method: self.verification_method.clone(),
            timeout: self.timeout,
        }
    }
}

impl<C: CryptoSuite> SignatureOptions<C> {
    pub fn new(
        suite: C,
        private_key: C::PrivateKey,
        issuer: &str,
        verification_method: &str,
    ) -> Result<SignatureOptions<C>> {
        Ok(SignatureOptions {
            suite: Arc::new(suite),
            private_key,
            issuer: named_node(issuer)?,
            verification_method: named_node(verification_method)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Import the private key from JWK text.
    pub fn from_jwk(
        suite: C,
        private_jwk: &str,
        issuer: &str,
        verification_method: &str,
    ) -> Result<SignatureOptions<C>> {
        let private_key = suite.import_private_key(private_jwk)?;
        SignatureOptions::new(suite, private_key, issuer, verification_method)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> SignatureOptions<C> {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureInfo {
    pub issuer: NamedNode,
    pub proof_value: String,
    pub verification_method: NamedNode,
    pub cryptosuite: String,
    /// The signed graph.
    pub target: Term,
    pub hash_method: String,
    pub canonicalization_method: Option<String>,
    pub created: Timestamp,
}

/// A proof found in a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofRecord {
    pub proof: Subject,
    pub issuer: Term,
    pub target: Term,
    pub proof_value: String,
    pub verification_method: Option<Term>,
    /// Graph holding the proof triples.
    pub graph: GraphName,
}

/// RDF encoding of a proof. Returns the proof node and its triples.
pub fn build_proof_triples(info: &SignatureInfo) -> (BlankNode, Vec<Triple>) {
    let proof = BlankNode::default();
    let manipulation = BlankNode::default();
    let mut triples = vec![
        Triple::new(proof.clone(), rdf::TYPE, sig::DATA_INTEGRITY_PROOF.into_owned()),
        Triple::new(proof.clone(), sig::CREATED, date_time_literal(info.created)),
        Triple::new(proof.clone(), sig::ISSUER, info.issuer.clone()),
        Triple::new(
            proof.clone(),
            sig::CRYPTOSUITE,
            Literal::new_simple_literal(&info.cryptosuite),
        ),
        Triple::new(
            proof.clone(),
            sig::VERIFICATION_METHOD,
            info.verification_method.clone(),
        ),
        Triple::new(
            proof.clone(),
            sig::PROOF_PURPOSE,
            Literal::new_simple_literal(PROOF_PURPOSE),
        ),
        Triple::new(
            proof.clone(),
            sig::PROOF_VALUE,
            Literal::new_simple_literal(&info.proof_value),
        ),
        Triple::new(proof.clone(), sig::TARGET, info.target.clone()),
        Triple::new(proof.clone(), sig::CONTENT_MANIPULATION, manipulation.clone()),
        Triple::new(
            manipulation.clone(),
            sig::HASH_METHOD,
            Literal::new_simple_literal(&info.hash_method),
        ),
    ];
    if let Some(method) = &info.canonicalization_method {
        triples.push(Triple::new(
            manipulation,
            sig::CANONICALIZATION_METHOD,
            Literal::new_simple_literal(method),
        ));
    }
    (proof, triples)
}

/// Base64 proof value over the digest of `quads`.
pub fn sign_quads<C: CryptoSuite>(suite: &C, key: &C::PrivateKey, quads: &[Quad]) -> Result<String> {
    let digest = suite.digest(quads)?;
    let signature = suite.sign(key, digest.as_bytes())?;
    Ok(Base64::encode_string(&signature))
}

/// Sign the contents of graph `target`, giving up after the configured
/// timeout.
pub async fn sign_graph<C: CryptoSuite>(
    dataset: &Dataset,
    target: GraphNameRef<'_>,
    options: &SignatureOptions<C>,
) -> Result<SignatureInfo> {
    let target_term: Term = match target {
        GraphNameRef::NamedNode(node) => node.into_owned().into(),
        GraphNameRef::BlankNode(node) => node.into_owned().into(),
        GraphNameRef::DefaultGraph => return Err(ContextError::InvalidSignatureTarget),
    };
    debug!(target: "signature", "generating signature for graph {target}");

    let quads = quads_in_graph(dataset, target);
    let suite = options.suite.clone();
    let key = options.private_key.clone();
    let signing = spawn_blocking(move || sign_quads(&*suite, &key, &quads));
    let proof_value = match tokio::time::timeout(options.timeout, signing).await {
        Ok(Ok(result)) => result?,
        Ok(Err(error)) => return Err(ContextError::Internal(error.to_string())),
        Err(_) => return Err(ContextError::SignatureTimeout(target.to_string())),
    };

    Ok(SignatureInfo {
        issuer: options.issuer.clone(),
        proof_value,
        verification_method: options.verification_method.clone(),
        cryptosuite: C::NAME.to_string(),
        target: target_term,
        hash_method: C::HASH_METHOD.to_string(),
        canonicalization_method: Some(CANONICALIZATION_METHOD.to_string()),
        created: Timestamp::now(),
    })
}

/// Check `proof_value` against the current contents of graph `target`.
///
/// Mismatches and undecodable proof values yield `false`; only a target
/// graph without quads is an error.
pub fn verify<C: CryptoSuite>(
    suite: &C,
    dataset: &Dataset,
    target: GraphNameRef<'_>,
    proof_value: &str,
    public_key: &C::PublicKey,
) -> Result<bool> {
    let quads = quads_in_graph(dataset, target);
    if quads.is_empty() {
        return Err(ContextError::MissingTargetGraph(target.to_string()));
    }
    let Ok(signature) = Base64::decode_vec(proof_value) else {
        return Ok(false);
    };
    let digest = suite.digest(&quads)?;
    Ok(suite.verify(public_key, digest.as_bytes(), &signature))
}

/// Every complete proof in `dataset`, whichever graph holds it.
pub fn find_proofs(dataset: &Dataset) -> Vec<ProofRecord> {
    let mut proofs = Vec::new();
    for (proof, graph) in subjects_with(dataset, rdf::TYPE, sig::DATA_INTEGRITY_PROOF) {
        let in_graph = Some(graph.as_ref());
        let issuer = objects(dataset, &proof, sig::ISSUER, in_graph);
        let target = objects(dataset, &proof, sig::TARGET, in_graph);
        let proof_value = objects(dataset, &proof, sig::PROOF_VALUE, in_graph);
        let verification_method = objects(dataset, &proof, sig::VERIFICATION_METHOD, in_graph);
        let (Some(issuer), Some(target), Some(Term::Literal(proof_value))) =
            (issuer.first(), target.first(), proof_value.first())
        else {
            debug!(target: "signature", "skipping incomplete proof {proof}");
            continue;
        };
        proofs.push(ProofRecord {
            issuer: issuer.clone(),
            target: target.clone(),
            proof_value: proof_value.value().to_string(),
            verification_method: verification_method.first().cloned(),
            proof,
            graph,
        });
    }
    proofs
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;
    use std::time::Duration;

    use anyhow::Result;
    use oxigraph::model::{BlankNode, Dataset, GraphName, Literal, NamedNode, Quad, Subject, Term};
    use secrecy::ExposeSecret;

    use super::{
        CryptoSuite, EcdsaP384, SignatureOptions, build_proof_triples, find_proofs, generate_key_pair,
        sign_graph, verify,
    };
    use crate::error::{ContextError, ErrorKind, Result as ContextResult};
    use crate::rdf::vocab::sig;

    const ISSUER: &str = "https://pod.example/profile/card#me";
    const KEY_URL: &str = "https://pod.example/keys/public";

    fn data(graph: &BlankNode) -> Dataset {
        let mut dataset = Dataset::new();
        for (subject, value) in [("a", "one"), ("b", "two")] {
            dataset.insert(&Quad::new(
                NamedNode::new_unchecked(format!("https://example.org/{subject}")),
                NamedNode::new_unchecked("https://example.org/value"),
                Literal::new_simple_literal(value),
                graph.clone(),
            ));
        }
        dataset.insert(&Quad::new(
            BlankNode::default(),
            NamedNode::new_unchecked("https://example.org/value"),
            Literal::new_simple_literal("blank"),
            graph.clone(),
        ));
        dataset
    }

    fn options() -> Result<(SignatureOptions, <EcdsaP384 as CryptoSuite>::PublicKey)> {
        let pair = generate_key_pair();
        let options = SignatureOptions::from_jwk(
            EcdsaP384,
            pair.private_jwk.expose_secret(),
            ISSUER,
            KEY_URL,
        )?;
        let public = EcdsaP384.import_public_key(&pair.public_jwk)?;
        Ok((options, public))
    }

    #[tokio::test]
    async fn sign_then_verify() -> Result<()> {
        let graph = BlankNode::default();
        let dataset = data(&graph);
        let (options, public) = options()?;

        let info = sign_graph(&dataset, graph.as_ref().into(), &options).await?;
        assert_eq!(info.cryptosuite, "ECDSA");
        assert_eq!(info.hash_method, "SHA-512");
        assert_eq!(info.canonicalization_method.as_deref(), Some("c14n"));
        assert_eq!(info.target, Term::from(graph.clone()));
        assert!(verify(&EcdsaP384, &dataset, graph.as_ref().into(), &info.proof_value, &public)?);

        let (_, stranger) = self::options()?;
        assert!(!verify(&EcdsaP384, &dataset, graph.as_ref().into(), &info.proof_value, &stranger)?);
        assert!(!verify(&EcdsaP384, &dataset, graph.as_ref().into(), "not base64!", &public)?);
        Ok(())
    }

    #[tokio::test]
    async fn mutation_breaks_the_proof() -> Result<()> {
        let graph = BlankNode::default();
        let mut dataset = data(&graph);
        let (options, public) = options()?;
        let info = sign_graph(&dataset, graph.as_ref().into(), &options).await?;

        dataset.insert(&Quad::new(
            NamedNode::new_unchecked("https://example.org/c"),
            NamedNode::new_unchecked("https://example.org/value"),
            Literal::new_simple_literal("three"),
            graph.clone(),
        ));
        assert!(!verify(&EcdsaP384, &dataset, graph.as_ref().into(), &info.proof_value, &public)?);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_targets() -> Result<()> {
        let graph = BlankNode::default();
        let dataset = data(&graph);
        let (options, public) = options()?;

        let error = sign_graph(&dataset, GraphName::DefaultGraph.as_ref(), &options)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidSignatureTarget);

        let missing = BlankNode::default();
        let error = verify(&EcdsaP384, &dataset, missing.as_ref().into(), "AAAA", &public).unwrap_err();
        assert!(matches!(error, ContextError::MissingTargetGraph(_)));
        Ok(())
    }

    /// Wraps the real suite but takes far longer than any timeout to sign.
    struct StalledSuite;

    impl CryptoSuite for StalledSuite {
        type PrivateKey = <EcdsaP384 as CryptoSuite>::PrivateKey;
        type PublicKey = <EcdsaP384 as CryptoSuite>::PublicKey;
        const NAME: &'static str = "ECDSA";
        const HASH_METHOD: &'static str = "SHA-512";

        fn import_private_key(&self, jwk: &str) -> ContextResult<Self::PrivateKey> {
            EcdsaP384.import_private_key(jwk)
        }
        fn import_public_key(&self, jwk: &str) -> ContextResult<Self::PublicKey> {
            EcdsaP384.import_public_key(jwk)
        }
        fn sign(&self, key: &Self::PrivateKey, message: &[u8]) -> ContextResult<Vec<u8>> {
            sleep(Duration::from_millis(500));
            EcdsaP384.sign(key, message)
        }
        fn verify(&self, key: &Self::PublicKey, message: &[u8], signature: &[u8]) -> bool {
            EcdsaP384.verify(key, message, signature)
        }
    }

    #[tokio::test]
    async fn signing_times_out() -> Result<()> {
        let graph = BlankNode::default();
        let dataset = data(&graph);
        let pair = generate_key_pair();
        let options = SignatureOptions::from_jwk(
            StalledSuite,
            pair.private_jwk.expose_secret(),
            ISSUER,
            KEY_URL,
        )?
        .with_timeout(Duration::from_millis(20));

        let error = sign_graph(&dataset, graph.as_ref().into(), &options)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::SignatureTimeout);
        Ok(())
    }

    #[tokio::test]
    async fn proof_triples_round_trip() -> Result<()> {
        let graph = BlankNode::default();
        let mut dataset = data(&graph);
        let (options, public) = options()?;
        let info = sign_graph(&dataset, graph.as_ref().into(), &options).await?;

        let (proof, triples) = build_proof_triples(&info);
        assert_eq!(triples.len(), 11);
        let metadata = BlankNode::default();
        for triple in triples {
            dataset.insert(&triple.in_graph(metadata.clone()));
        }

        let proofs = find_proofs(&dataset);
        assert_eq!(proofs.len(), 1);
        let record = &proofs[0];
        assert_eq!(record.proof, Subject::from(proof));
        assert_eq!(record.issuer, Term::from(NamedNode::new_unchecked(ISSUER)));
        assert_eq!(record.target, Term::from(graph.clone()));
        assert_eq!(record.graph, GraphName::from(metadata));
        assert_eq!(
            record.verification_method,
            Some(Term::from(NamedNode::new_unchecked(KEY_URL)))
        );
        assert!(verify(&EcdsaP384, &dataset, graph.as_ref().into(), &record.proof_value, &public)?);

        let without_canonicalization = super::SignatureInfo {
            canonicalization_method: None,
            ..info
        };
        let (_, triples) = build_proof_triples(&without_canonicalization);
        assert_eq!(triples.len(), 10);
        assert!(triples.iter().all(|t| t.predicate != sig::CANONICALIZATION_METHOD));
        Ok(())
    }
}
