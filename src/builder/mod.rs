//! Sessions that turn RDF documents into context associations.
//!
//! Builder methods only record steps. Nothing is fetched, signed or written
//! until [`Builder::commit`] runs the steps, strictly in the order they were
//! added, over one [`FocusStore`]. Later steps see every graph produced by
//! earlier ones.

mod focus;

use std::collections::HashMap;

use jiff::Timestamp;
use oxigraph::model::{BlankNode, Dataset, GraphName, NamedNode, Quad, Term, Triple};
use tracing::{debug, error, info, warn};

use crate::error::{ContextError, Result};
use crate::policy::{PolicyOptions, create_policy};
use crate::rdf::vocab::prov;
use crate::rdf::{date_time_literal, named_node};
use crate::signature::{
    CryptoSuite, EcdsaP384, SignatureOptions, build_proof_triples, sign_graph,
};
use crate::source::RdfSource;

pub use self::focus::FocusStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvenanceOptions {
    pub origin: Option<NamedNode>,
    pub author: Option<NamedNode>,
}

impl ProvenanceOptions {
    pub fn new(origin: Option<&str>, author: Option<&str>) -> Result<ProvenanceOptions> {
        Ok(ProvenanceOptions {
            origin: origin.map(named_node).transpose()?,
            author: author.map(named_node).transpose()?,
        })
    }
}

/// One unit of work in a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Load a document into fresh blank node graphs. With
    /// `graph_names_as_origin`, each named graph of the document is recorded
    /// as the origin of the graph replacing it.
    LoadRdf {
        url: String,
        graph_names_as_origin: bool,
    },
    Policy(PolicyOptions),
    Provenance(ProvenanceOptions),
    SignData,
    SignMetadata,
}

/// The steps recorded since a session was opened.
#[derive(Debug, Default)]
pub struct Session {
    dataset: Option<Dataset>,
    steps: Vec<Step>,
}

impl Session {
    pub fn new(dataset: Option<Dataset>) -> Session {
        Session {
            dataset,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run every step in order and return the resulting dataset.
    pub async fn commit<C: CryptoSuite>(
        self,
        source: &impl RdfSource,
        signature: Option<&SignatureOptions<C>>,
    ) -> Result<Dataset> {
        let mut store = match self.dataset {
            Some(dataset) => FocusStore::over(dataset),
            None => FocusStore::new(),
        };
        for (index, step) in self.steps.into_iter().enumerate() {
            debug!(target: "builder", "step {index}: {step:?}");
            match step {
                Step::LoadRdf {
                    url,
                    graph_names_as_origin,
                } => load_rdf(&mut store, source, &url, graph_names_as_origin).await?,
                Step::Policy(options) => add_policy(&mut store, &options),
                Step::Provenance(options) => add_provenance(&mut store, &options),
                Step::SignData => match signature {
                    Some(signature) => sign_data(&mut store, signature).await,
                    None => error!(target: "builder", "no signature options, data not signed"),
                },
                Step::SignMetadata => match signature {
                    Some(signature) => sign_metadata(&mut store, signature).await,
                    None => error!(target: "builder", "no signature options, metadata not signed"),
                },
            }
        }
        Ok(store.into_dataset())
    }
}

/// Collects steps into sessions and commits them.
pub struct Builder<C: CryptoSuite = EcdsaP384> {
    session: Option<Session>,
    signature: Option<SignatureOptions<C>>,
}

impl<C: CryptoSuite> Default for Builder<C> {
    fn default() -> Self {
        Builder {
            session: None,
            signature: None,
        }
    }
}

impl<C: CryptoSuite> Builder<C> {
    pub fn new(signature: Option<SignatureOptions<C>>) -> Builder<C> {
        Builder {
            session: None,
            signature,
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session, optionally continuing an existing dataset.
    pub fn start_session(&mut self, dataset: Option<Dataset>) -> Result<&mut Self> {
        if self.session.is_some() {
            return Err(ContextError::SessionAlreadyOpen);
        }
        self.session = Some(Session::new(dataset));
        Ok(self)
    }

    /// Load the RDF document at `url`. Opens a session when none is open.
    pub fn load_rdf(&mut self, url: &str, graph_names_as_origin: bool) -> &mut Self {
        let session = self.session.get_or_insert_with(|| {
            info!(target: "builder", "no session found, starting a new one");
            Session::default()
        });
        session.push(Step::LoadRdf {
            url: url.to_string(),
            graph_names_as_origin,
        });
        self
    }

    /// Attach one policy covering every data graph loaded so far.
    pub fn policy(&mut self, options: PolicyOptions) -> &mut Self {
        self.push(Step::Policy(options), "set a policy over")
    }

    pub fn provenance(&mut self, options: ProvenanceOptions) -> &mut Self {
        self.push(Step::Provenance(options), "add provenance over")
    }

    /// Sign every data graph loaded so far.
    pub fn sign_data(&mut self) -> &mut Self {
        if self.signature.is_none() {
            error!(target: "builder", "cannot sign data without signature options");
            return self;
        }
        self.push(Step::SignData, "sign")
    }

    /// Close the open metadata graph and sign it.
    pub fn sign_metadata(&mut self) -> &mut Self {
        if self.signature.is_none() {
            error!(target: "builder", "cannot sign metadata without signature options");
            return self;
        }
        self.push(Step::SignMetadata, "sign")
    }

    /// Run the open session and close it.
    pub async fn commit(&mut self, source: &impl RdfSource) -> Result<Dataset> {
        let session = self.session.take().ok_or(ContextError::EmptySession)?;
        let steps = session.steps().len();
        let dataset = session.commit(source, self.signature.as_ref()).await?;
        info!(target: "builder", "committed {steps} steps, {} quads", dataset.len());
        Ok(dataset)
    }

    fn push(&mut self, step: Step, action: &str) -> &mut Self {
        match &mut self.session {
            Some(session) => session.push(step),
            None => info!(target: "builder", "no session found, nothing to {action}"),
        }
        self
    }
}

async fn load_rdf(
    store: &mut FocusStore,
    source: &impl RdfSource,
    url: &str,
    graph_names_as_origin: bool,
) -> Result<()> {
    let loaded = source.load_quads(url).await?;
    let mut renamed: HashMap<GraphName, BlankNode> = HashMap::new();
    let mut origins = Vec::new();
    let mut quads = Vec::with_capacity(loaded.len());

    for quad in loaded {
        let graph = match renamed.get(&quad.graph_name) {
            Some(graph) => graph.clone(),
            None => {
                let graph = BlankNode::default();
                if let (GraphName::NamedNode(name), true) = (&quad.graph_name, graph_names_as_origin) {
                    origins.push(Triple::new(graph.clone(), prov::ORIGIN, name.clone()));
                }
                renamed.insert(quad.graph_name.clone(), graph.clone());
                graph
            }
        };
        quads.push(Quad::new(quad.subject, quad.predicate, quad.object, graph));
    }

    if !origins.is_empty() {
        store.add_metadata_triples(origins);
    }
    store.add_quads(quads);
    debug!(target: "builder", "loaded {url} into {} graphs", renamed.len());
    Ok(())
}

fn targets(store: &FocusStore) -> Vec<Term> {
    store
        .data_graphs()
        .iter()
        .map(|graph| graph.clone().into())
        .collect()
}

fn add_policy(store: &mut FocusStore, options: &PolicyOptions) {
    if store.data_graphs().is_empty() {
        warn!(target: "builder", "cannot create a policy when no data is present");
        return;
    }
    match create_policy(&targets(store), options) {
        Ok(policy) => {
            store.add_metadata_triples(policy.triples);
        }
        Err(e) => warn!(target: "builder", "policy skipped: {e}"),
    }
}

fn add_provenance(store: &mut FocusStore, options: &ProvenanceOptions) {
    if store.data_graphs().is_empty() {
        warn!(target: "builder", "cannot add provenance without first adding data");
        return;
    }
    let timestamp = date_time_literal(Timestamp::now());
    for graph in store.data_graphs().to_vec() {
        let mut triples = vec![Triple::new(graph.clone(), prov::TIMESTAMP, timestamp.clone())];
        if let Some(origin) = &options.origin {
            let known = store
                .dataset()
                .quads_for_subject(graph.as_ref())
                .any(|q| q.predicate == prov::ORIGIN);
            if !known {
                triples.push(Triple::new(graph.clone(), prov::ORIGIN, origin.clone()));
            }
        }
        if let Some(author) = &options.author {
            triples.push(Triple::new(graph.clone(), prov::AUTHOR, author.clone()));
        }
        store.add_metadata_triples(triples);
    }
}

async fn sign_data<C: CryptoSuite>(store: &mut FocusStore, signature: &SignatureOptions<C>) {
    if store.data_graphs().is_empty() {
        warn!(target: "builder", "cannot create a signature when no data is added first");
        return;
    }
    for graph in store.data_graphs().to_vec() {
        match sign_graph(store.dataset(), graph.as_ref().into(), signature).await {
            Ok(info) => {
                let (_, triples) = build_proof_triples(&info);
                store.add_metadata_triples(triples);
            }
            Err(e) => warn!(target: "builder", "signature for graph {graph} skipped: {e}"),
        }
    }
}

async fn sign_metadata<C: CryptoSuite>(store: &mut FocusStore, signature: &SignatureOptions<C>) {
    let Some(graph) = store.close_metadata_graph() else {
        warn!(target: "builder", "cannot sign metadata when no metadata is added first");
        return;
    };
    match sign_graph(store.dataset(), graph.as_ref().into(), signature).await {
        Ok(info) => {
            let (_, triples) = build_proof_triples(&info);
            store.add_metadata_triples(triples);
        }
        Err(e) => warn!(target: "builder", "signature for metadata graph {graph} skipped: {e}"),
    }
}

#[cfg(test)]
mod tests;
