use anyhow::Result;
use oxigraph::model::{Literal, NamedNode, SubjectRef, Term, TermRef};
use secrecy::ExposeSecret;

use super::{ContextFilter, FilterSpec, KeyLocation, KeyRegistry, VerificationStatus};
use crate::builder::{Builder, ProvenanceOptions};
use crate::error::ErrorKind;
use crate::policy::PolicyOptions;
use crate::rdf::trig::{TRIG, serialize_trig};
use crate::signature::{EcdsaP384, KeyPair, SignatureOptions, generate_key_pair};
use crate::source::{MemorySource, RdfSource};

const ALICE: &str = "https://pod.example/alice/profile#me";
const BOB: &str = "https://pod.example/bob/profile#me";

const FIRST: &str = "https://pod.example/alice/association";
const SECOND: &str = "https://pod.example/bob/association";

fn documents() -> MemorySource {
    MemorySource::new()
        .with(
            "https://example.org/doc1",
            "text/turtle",
            "<https://example.org/alice> <https://example.org/knows> <https://example.org/bob> .",
        )
        .with(
            "https://example.org/doc2",
            "application/n-triples",
            "<https://example.org/carol> <https://example.org/age> \"31\" .",
        )
}

/// Publish one signed association of `document` into `source`.
async fn associate(
    source: &mut MemorySource,
    url: &str,
    document: &str,
    origin: &str,
    author: &str,
    purpose: &str,
    key: &KeyPair,
) -> Result<()> {
    let options = SignatureOptions::from_jwk(
        EcdsaP384,
        key.private_jwk.expose_secret(),
        author,
        &format!("{author}-key"),
    )?;
    let mut builder = Builder::new(Some(options));
    builder
        .load_rdf(document, false)
        .provenance(ProvenanceOptions::new(Some(origin), Some(author))?)
        .policy(PolicyOptions {
            duration: Some("P1D".to_string()),
            purpose: Some(vec![purpose.to_string()]),
            assigner: Some(author.to_string()),
            ..PolicyOptions::default()
        })
        .sign_data()
        .sign_metadata();
    let dataset = builder.commit(&*source).await?;
    source.insert(url, TRIG, &serialize_trig(&dataset, true)?);
    Ok(())
}

struct Fixture {
    source: MemorySource,
    alice: KeyPair,
    bob: KeyPair,
}

async fn fixture() -> Result<Fixture> {
    let alice = generate_key_pair();
    let bob = generate_key_pair();
    let mut source = documents();
    associate(
        &mut source,
        FIRST,
        "https://example.org/doc1",
        "https://example.org/resource1",
        ALICE,
        "Marketing",
        &alice,
    )
    .await?;
    associate(
        &mut source,
        SECOND,
        "https://example.org/doc2",
        "https://example.org/resource2",
        BOB,
        "PublicBenefit",
        &bob,
    )
    .await?;
    Ok(Fixture { source, alice, bob })
}

fn registry(entries: &[(&str, &KeyPair)]) -> KeyRegistry {
    KeyRegistry::new(entries.iter().map(|(web_id, pair)| {
        (
            web_id.to_string(),
            KeyLocation::Inline(pair.public_jwk.clone()),
        )
    }))
}

fn spec() -> FilterSpec {
    FilterSpec {
        sources: vec![FIRST.to_string(), SECOND.to_string()],
        ..FilterSpec::default()
    }
}

fn knows() -> (NamedNode, NamedNode, NamedNode) {
    (
        NamedNode::new_unchecked("https://example.org/alice"),
        NamedNode::new_unchecked("https://example.org/knows"),
        NamedNode::new_unchecked("https://example.org/bob"),
    )
}

fn has_knows(outcome: &super::FilterOutcome) -> bool {
    let (s, p, o) = knows();
    outcome
        .output
        .iter()
        .any(|q| {
            q.subject == SubjectRef::from(s.as_ref())
                && q.predicate == p.as_ref()
                && q.object == TermRef::from(o.as_ref())
        })
}

fn has_age(outcome: &super::FilterOutcome) -> bool {
    let age = Literal::new_simple_literal("31");
    outcome
        .output
        .iter()
        .any(|q| q.object == Term::from(age.clone()).as_ref())
}

#[tokio::test]
async fn unfiltered_sources() -> Result<()> {
    let fixture = fixture().await?;
    let filter = ContextFilter::new(EcdsaP384, KeyRegistry::default());
    let outcome = filter.run(&spec(), &fixture.source).await?;

    assert!(has_knows(&outcome));
    assert!(has_age(&outcome));
    assert!(outcome.trig.contains("<https://example.org/knows>"));
    // no keys registered: every proof is from an unknown issuer
    assert_eq!(outcome.verifications.len(), 4);
    assert!(
        outcome
            .verifications
            .iter()
            .all(|r| r.status == VerificationStatus::UnknownIssuer)
    );
    Ok(())
}

#[tokio::test]
async fn filter_by_origin_and_purpose() -> Result<()> {
    let fixture = fixture().await?;
    let filter = ContextFilter::new(EcdsaP384, KeyRegistry::default());

    let by_origin = filter
        .run(
            &FilterSpec {
                origin: Some("https://example.org/resource1".to_string()),
                ..spec()
            },
            &fixture.source,
        )
        .await?;
    assert!(has_knows(&by_origin));
    assert!(!has_age(&by_origin));
    assert_eq!(by_origin.output.len(), 1);

    let by_purpose = filter
        .run(
            &FilterSpec {
                purpose: Some("PublicBenefit".to_string()),
                ..spec()
            },
            &fixture.source,
        )
        .await?;
    assert!(!has_knows(&by_purpose));
    assert!(has_age(&by_purpose));

    let mismatch = filter
        .run(
            &FilterSpec {
                purpose: Some("Marketing".to_string()),
                author: Some(BOB.to_string()),
                ..spec()
            },
            &fixture.source,
        )
        .await?;
    assert!(mismatch.output.is_empty());
    Ok(())
}

#[tokio::test]
async fn require_signature_by_author() -> Result<()> {
    let fixture = fixture().await?;
    let keys = registry(&[(ALICE, &fixture.alice), (BOB, &fixture.bob)]);
    let filter = ContextFilter::new(EcdsaP384, keys);
    let outcome = filter
        .run(
            &FilterSpec {
                author: Some(ALICE.to_string()),
                require_signature: true,
                ..spec()
            },
            &fixture.source,
        )
        .await?;

    assert!(outcome.verifications.iter().all(|r| r.is_verified()));
    assert!(has_knows(&outcome));
    assert!(!has_age(&outcome));

    // without an author, any verified issuer will do
    let outcome = filter
        .run(
            &FilterSpec {
                require_signature: true,
                ..spec()
            },
            &fixture.source,
        )
        .await?;
    assert!(has_knows(&outcome));
    assert!(has_age(&outcome));
    Ok(())
}

#[tokio::test]
async fn failed_verification_selects_nothing() -> Result<()> {
    let fixture = fixture().await?;
    let impostor = generate_key_pair();
    let filter = ContextFilter::new(EcdsaP384, registry(&[(ALICE, &impostor)]));
    let outcome = filter
        .run(
            &FilterSpec {
                sources: vec![FIRST.to_string()],
                author: Some(ALICE.to_string()),
                origin: Some("https://example.org/resource1".to_string()),
                purpose: Some("Marketing".to_string()),
                require_signature: true,
            },
            &fixture.source,
        )
        .await?;

    assert!(outcome.output.is_empty());
    assert!(outcome.trig.trim().is_empty());
    assert_eq!(outcome.verifications.len(), 2);
    assert!(
        outcome
            .verifications
            .iter()
            .all(|r| r.status == VerificationStatus::Invalid)
    );
    Ok(())
}

#[tokio::test]
async fn tampered_data_fails_verification() -> Result<()> {
    let fixture = fixture().await?;
    let text = fixture.source.load_text(FIRST).await?;
    let tampered = text.replace("<https://example.org/bob>", "<https://example.org/mallory>");
    assert_ne!(tampered, text);
    let source = fixture.source.clone().with(FIRST, TRIG, &tampered);

    let filter = ContextFilter::new(EcdsaP384, registry(&[(ALICE, &fixture.alice)]));
    let outcome = filter
        .run(
            &FilterSpec {
                sources: vec![FIRST.to_string()],
                author: Some(ALICE.to_string()),
                require_signature: true,
                ..FilterSpec::default()
            },
            &source,
        )
        .await?;
    let statuses: Vec<_> = outcome.verifications.iter().map(|r| &r.status).collect();
    assert!(statuses.contains(&&VerificationStatus::Invalid));
    assert!(statuses.contains(&&VerificationStatus::Verified));
    assert!(outcome.output.is_empty());
    Ok(())
}

#[tokio::test]
async fn tampered_metadata_is_not_trusted() -> Result<()> {
    let fixture = fixture().await?;
    let text = fixture.source.load_text(FIRST).await?;
    let tampered = text
        .replace("dpv:Marketing", "dpv:PublicBenefit")
        .replace("<https://w3id.org/dpv#Marketing>", "<https://w3id.org/dpv#PublicBenefit>");
    assert_ne!(tampered, text);
    let source = fixture.source.clone().with(FIRST, TRIG, &tampered);
    let filter = ContextFilter::new(EcdsaP384, registry(&[(ALICE, &fixture.alice)]));
    let criteria = FilterSpec {
        sources: vec![FIRST.to_string()],
        author: Some(ALICE.to_string()),
        purpose: Some("PublicBenefit".to_string()),
        ..FilterSpec::default()
    };

    // unsigned selection follows the rewritten purpose
    let unchecked = filter.run(&criteria, &source).await?;
    assert!(has_knows(&unchecked));

    let checked = filter
        .run(
            &FilterSpec {
                require_signature: true,
                ..criteria
            },
            &source,
        )
        .await?;
    let statuses: Vec<_> = checked.verifications.iter().map(|r| &r.status).collect();
    assert!(statuses.contains(&&VerificationStatus::Invalid));
    assert!(statuses.contains(&&VerificationStatus::Verified));
    assert!(checked.output.is_empty());
    Ok(())
}

#[tokio::test]
async fn unsigned_metadata_is_not_trusted() -> Result<()> {
    let alice = generate_key_pair();
    let mut source = documents();
    let options = SignatureOptions::from_jwk(
        EcdsaP384,
        alice.private_jwk.expose_secret(),
        ALICE,
        &format!("{ALICE}-key"),
    )?;
    let mut builder = Builder::new(Some(options));
    builder
        .load_rdf("https://example.org/doc1", false)
        .provenance(ProvenanceOptions::new(
            Some("https://example.org/resource1"),
            Some(ALICE),
        )?)
        .sign_data();
    let dataset = builder.commit(&source).await?;
    source.insert(FIRST, TRIG, &serialize_trig(&dataset, false)?);

    let filter = ContextFilter::new(EcdsaP384, registry(&[(ALICE, &alice)]));
    let outcome = filter
        .run(
            &FilterSpec {
                sources: vec![FIRST.to_string()],
                author: Some(ALICE.to_string()),
                require_signature: true,
                ..FilterSpec::default()
            },
            &source,
        )
        .await?;
    // the data proof verifies, but nothing vouches for the metadata holding it
    assert_eq!(outcome.verifications.len(), 1);
    assert!(outcome.verifications[0].is_verified());
    assert!(outcome.output.is_empty());
    Ok(())
}

#[tokio::test]
async fn broken_source_aborts() -> Result<()> {
    let fixture = fixture().await?;
    let source = fixture
        .source
        .with("https://example.org/page", "text/html", "<p>context</p>");
    let filter = ContextFilter::new(EcdsaP384, KeyRegistry::default());
    let error = filter
        .run(
            &FilterSpec {
                sources: vec![FIRST.to_string(), "https://example.org/page".to_string()],
                ..FilterSpec::default()
            },
            &source,
        )
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InputValidation);
    Ok(())
}
