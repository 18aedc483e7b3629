use anyhow::Result;
use oxigraph::model::{Dataset, GraphName, NamedNode, Term};
use secrecy::ExposeSecret;

use super::{Builder, ProvenanceOptions, Step};
use crate::error::ErrorKind;
use crate::policy::PolicyOptions;
use crate::rdf::canon::canonicalize;
use crate::rdf::trig::{TRIG, parse_document, serialize_trig};
use crate::rdf::vocab::{odrl, prov, rdf};
use crate::rdf::{graph_names, objects, subjects_with, term_graph};
use crate::signature::{self, CryptoSuite, EcdsaP384, SignatureOptions, find_proofs, generate_key_pair};
use crate::source::MemorySource;

const ALICE: &str = "https://pod.example/alice/profile#me";
const KEY: &str = "https://pod.example/alice/keys/public";

const PEOPLE: &str = "https://example.org/people";
const PEOPLE_TRIG: &str = r#"
@prefix ex: <https://example.org/> .
ex:g1 { ex:alice ex:knows ex:bob . }
ex:g2 { ex:bob ex:age 42 . }
ex:g1 { ex:alice ex:name "Alice" . }
"#;

const PLAIN: &str = "https://example.org/plain";
const PLAIN_TTL: &str = r#"
@prefix ex: <https://example.org/> .
ex:carol ex:knows ex:dave .
ex:carol ex:list ( ex:a ex:b ) .
"#;

fn source() -> MemorySource {
    MemorySource::new()
        .with(PEOPLE, TRIG, PEOPLE_TRIG)
        .with(PLAIN, "text/turtle", PLAIN_TTL)
        .with("https://example.org/page", "text/html", "<p>hi</p>")
}

fn signing() -> Result<(SignatureOptions, <EcdsaP384 as CryptoSuite>::PublicKey)> {
    let pair = generate_key_pair();
    let options = SignatureOptions::from_jwk(EcdsaP384, pair.private_jwk.expose_secret(), ALICE, KEY)?;
    let public = EcdsaP384.import_public_key(&pair.public_jwk)?;
    Ok((options, public))
}

fn iri(value: &str) -> Term {
    NamedNode::new_unchecked(value).into()
}

fn data_graphs(dataset: &Dataset) -> Vec<GraphName> {
    let mut graphs: Vec<GraphName> = dataset
        .iter()
        .filter(|q| q.predicate == prov::TIMESTAMP)
        .filter_map(|q| term_graph(&q.subject.into_owned().into()))
        .collect();
    graphs.sort_by_key(|g| g.to_string());
    graphs.dedup();
    graphs
}

#[tokio::test]
async fn graph_names_are_renamed_once_per_load() -> Result<()> {
    let mut builder = Builder::<EcdsaP384>::default();
    builder.load_rdf(PEOPLE, true);
    let dataset = builder.commit(&source()).await?;

    let origins = dataset
        .iter()
        .filter(|q| q.predicate == prov::ORIGIN)
        .map(|q| (q.subject.into_owned(), q.object.into_owned()))
        .collect::<Vec<_>>();
    assert_eq!(origins.len(), 2);
    assert_ne!(origins[0].0, origins[1].0);

    for (graph, origin) in &origins {
        let Term::NamedNode(_) = origin else {
            panic!("origin {origin} is not an IRI");
        };
        let oxigraph::model::Subject::BlankNode(graph) = graph else {
            panic!("graph {graph} is not a blank node");
        };
        let expected = if origin == &iri("https://example.org/g1") { 2 } else { 1 };
        assert_eq!(dataset.quads_for_graph_name(graph.as_ref()).count(), expected);
    }
    // no named graph survives the load
    assert!(
        graph_names(&dataset)
            .iter()
            .all(|g| matches!(g, GraphName::BlankNode(_)))
    );
    assert_eq!(graph_names(&dataset).len(), 3);
    Ok(())
}

#[tokio::test]
async fn default_graph_without_origin() -> Result<()> {
    let mut builder = Builder::<EcdsaP384>::default();
    builder.load_rdf(PLAIN, true).load_rdf(PEOPLE, false);
    let dataset = builder.commit(&source()).await?;

    assert!(dataset.iter().all(|q| !q.graph_name.is_default_graph()));
    assert!(dataset.iter().all(|q| q.predicate != prov::ORIGIN));
    assert_eq!(graph_names(&dataset).len(), 3);
    Ok(())
}

#[tokio::test]
async fn session_state() -> Result<()> {
    let mut builder = Builder::<EcdsaP384>::default();
    let error = builder.commit(&source()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Configuration);

    builder.start_session(None)?;
    let error = builder.start_session(None).err().unwrap();
    assert_eq!(error.kind(), ErrorKind::Configuration);
    builder.load_rdf(PLAIN, false);
    builder.commit(&source()).await?;

    // a committed session can be followed by a new one
    assert!(!builder.has_session());
    builder.start_session(None)?;
    assert!(builder.has_session());
    Ok(())
}

#[tokio::test]
async fn steps_without_session_are_dropped() -> Result<()> {
    let mut builder = Builder::<EcdsaP384>::default();
    builder
        .provenance(ProvenanceOptions::default())
        .policy(PolicyOptions::default());
    assert!(!builder.has_session());

    // no signature options: signing steps are not recorded
    builder.start_session(None)?.sign_data().sign_metadata();
    assert!(builder.session.as_ref().unwrap().steps().is_empty());
    Ok(())
}

#[tokio::test]
async fn steps_run_in_order() -> Result<()> {
    let mut builder = Builder::<EcdsaP384>::default();
    builder
        .start_session(None)?
        .policy(PolicyOptions::default())
        .load_rdf(PLAIN, false)
        .policy(PolicyOptions {
            purpose: Some(vec!["Marketing".to_string()]),
            ..PolicyOptions::default()
        })
        .load_rdf(PEOPLE, false);
    assert!(matches!(
        builder.session.as_ref().unwrap().steps()[1],
        Step::LoadRdf { .. }
    ));
    let dataset = builder.commit(&source()).await?;

    // the first policy ran before any data existed, the second one only saw
    // the graph of the first document
    let agreements = subjects_with(&dataset, rdf::TYPE, odrl::AGREEMENT);
    assert_eq!(agreements.len(), 1);
    let (agreement, metadata) = &agreements[0];
    let permission = objects(&dataset, agreement, odrl::PERMISSION, Some(metadata.as_ref()));
    let Some(Term::BlankNode(permission)) = permission.first() else {
        panic!("agreement without permission");
    };
    assert_eq!(objects(&dataset, permission, odrl::TARGET, None).len(), 1);
    Ok(())
}

#[tokio::test]
async fn provenance_keeps_existing_origin() -> Result<()> {
    let mut builder = Builder::<EcdsaP384>::default();
    builder.load_rdf(PEOPLE, true).provenance(ProvenanceOptions::new(
        Some("https://example.org/elsewhere"),
        Some(ALICE),
    )?);
    let dataset = builder.commit(&source()).await?;

    let origins: Vec<_> = dataset
        .iter()
        .filter(|q| q.predicate == prov::ORIGIN)
        .map(|q| q.object.into_owned())
        .collect();
    assert_eq!(origins.len(), 2);
    assert!(!origins.contains(&iri("https://example.org/elsewhere")));
    assert_eq!(
        dataset
            .iter()
            .filter(|q| q.predicate == prov::AUTHOR)
            .count(),
        2
    );
    assert_eq!(data_graphs(&dataset).len(), 2);
    Ok(())
}

#[tokio::test]
async fn signed_session() -> Result<()> {
    let (options, public) = signing()?;
    let mut builder = Builder::new(Some(options));
    builder
        .start_session(None)?
        .load_rdf(PLAIN, false)
        .provenance(ProvenanceOptions::new(
            Some("https://example.org/plain"),
            Some(ALICE),
        )?)
        .sign_data()
        .sign_metadata();
    let dataset = builder.commit(&source()).await?;

    let proofs = find_proofs(&dataset);
    assert_eq!(proofs.len(), 2);
    let data_graph = data_graphs(&dataset).pop().unwrap();

    let mut signed_metadata = None;
    for proof in &proofs {
        assert_eq!(proof.issuer, iri(ALICE));
        let target = term_graph(&proof.target).unwrap();
        assert!(signature::verify(
            &EcdsaP384,
            &dataset,
            target.as_ref(),
            &proof.proof_value,
            &public
        )?);
        if target != data_graph {
            signed_metadata = Some(target);
        }
    }

    // the metadata graph was closed before signing: its own proof lives in
    // a new metadata graph
    let signed_metadata = signed_metadata.unwrap();
    let data_proof = proofs
        .iter()
        .find(|p| term_graph(&p.target) == Some(data_graph.clone()))
        .unwrap();
    assert_eq!(data_proof.graph, signed_metadata);
    let metadata_proof = proofs.iter().find(|p| p.graph != signed_metadata).unwrap();
    assert_ne!(metadata_proof.graph, data_graph);
    Ok(())
}

#[tokio::test]
async fn unsupported_documents_fail_the_commit() -> Result<()> {
    let mut builder = Builder::<EcdsaP384>::default();
    builder.load_rdf("https://example.org/page", false);
    let error = builder.commit(&source()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InputValidation);
    Ok(())
}

#[tokio::test]
async fn committed_store_round_trips() -> Result<()> {
    let (options, _) = signing()?;
    let mut builder = Builder::new(Some(options));
    builder
        .load_rdf(PEOPLE, true)
        .load_rdf(PLAIN, false)
        .provenance(ProvenanceOptions::new(None, Some(ALICE))?)
        .policy(PolicyOptions {
            duration: Some("P7D".to_string()),
            purpose: Some(vec!["Marketing".to_string(), "PublicBenefit".to_string()]),
            assigner: Some(ALICE.to_string()),
            ..PolicyOptions::default()
        })
        .sign_data();
    let dataset = builder.commit(&source()).await?;
    let quads: Vec<_> = dataset.iter().map(|q| q.into_owned()).collect();

    for beautify in [false, true] {
        let text = serialize_trig(&dataset, beautify)?;
        let parsed = parse_document(&text, TRIG, "")?;
        assert_eq!(canonicalize(&parsed)?, canonicalize(&quads)?);
    }
    Ok(())
}

#[tokio::test]
async fn continue_existing_dataset() -> Result<()> {
    let mut builder = Builder::<EcdsaP384>::default();
    builder.load_rdf(PLAIN, false);
    let first = builder.commit(&source()).await?;
    let before = first.len();

    builder
        .start_session(Some(first))?
        .load_rdf(PEOPLE, false)
        .provenance(ProvenanceOptions::new(None, Some(ALICE))?);
    let second = builder.commit(&source()).await?;

    // provenance only covers graphs of the running session
    assert_eq!(
        second
            .iter()
            .filter(|q| q.predicate == prov::AUTHOR)
            .count(),
        2
    );
    assert!(second.len() > before);
    Ok(())
}
