//! Selecting data from context associations by their metadata.
//!
//! Every source is loaded into its own dataset and all proofs in it are
//! checked. When signatures are required, only graphs that are themselves
//! the target of a verified proof stay queryable: a data graph needs its
//! data proof and the metadata graph describing it needs its own. The
//! generated CONSTRUCT query then runs over each source.

mod keys;
mod query;

use std::collections::HashSet;

use oxigraph::model::{Dataset, GraphName, Term, Triple};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use tokio::task::spawn_blocking;
use tracing::{debug, info};

use crate::error::{ContextError, Result};
use crate::rdf::graph_term;
use crate::rdf::trig::serialize_trig;
use crate::signature::{CryptoSuite, EcdsaP384};
use crate::source::RdfSource;

pub use self::keys::{
    KeyLocation, KeyRegistry, VerificationRecord, VerificationStatus, verify_proofs,
};
pub use self::query::generate_query;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub sources: Vec<String>,
    pub origin: Option<String>,
    /// WebID of the author.
    pub author: Option<String>,
    /// Purpose IRI or short DPV name.
    pub purpose: Option<String>,
    pub require_signature: bool,
}

#[derive(Debug)]
pub struct FilterOutcome {
    pub query: String,
    pub verifications: Vec<VerificationRecord>,
    pub output: Dataset,
    pub trig: String,
}

pub struct ContextFilter<C: CryptoSuite = EcdsaP384> {
    suite: C,
    keys: KeyRegistry,
}

impl<C: CryptoSuite> ContextFilter<C> {
    pub fn new(suite: C, keys: KeyRegistry) -> ContextFilter<C> {
        ContextFilter { suite, keys }
    }

    pub async fn run(&self, spec: &FilterSpec, source: &impl RdfSource) -> Result<FilterOutcome> {
        let query = generate_query(spec)?;

        let mut datasets = Vec::with_capacity(spec.sources.len());
        for url in spec.sources.iter().filter(|url| !url.is_empty()) {
            let quads = source.load_quads(url).await?;
            debug!(target: "filter", "loaded {} quads from {url}", quads.len());
            datasets.push(quads.iter().collect::<Dataset>());
        }

        let mut verifications = Vec::new();
        for (index, dataset) in datasets.iter().enumerate() {
            verifications
                .extend(verify_proofs(&self.suite, &self.keys, source, index, dataset).await);
        }

        if spec.require_signature {
            datasets = datasets
                .into_iter()
                .enumerate()
                .map(|(index, dataset)| {
                    let admitted = admitted_graphs(&verifications, index, spec.author.as_deref());
                    restrict(&dataset, &admitted)
                })
                .collect();
        }

        let mut output = Dataset::new();
        for dataset in datasets {
            for triple in evaluate(dataset, query.clone()).await? {
                output.insert(&triple.in_graph(GraphName::DefaultGraph));
            }
        }
        info!(
            target: "filter",
            "{} sources, {} proofs checked, {} triples selected",
            spec.sources.len(),
            verifications.len(),
            output.len()
        );

        let trig = serialize_trig(&output, false)?;
        Ok(FilterOutcome {
            query,
            verifications,
            output,
            trig,
        })
    }
}

/// Targets of verified proofs in source `index`, issued by `author` when
/// one is given.
fn admitted_graphs(
    verifications: &[VerificationRecord],
    index: usize,
    author: Option<&str>,
) -> HashSet<Term> {
    verifications
        .iter()
        .filter(|record| record.source == index && record.is_verified())
        .filter(|record| match (&record.issuer, author) {
            (_, None) => true,
            (Term::NamedNode(issuer), Some(author)) => issuer.as_str() == author,
            _ => false,
        })
        .map(|record| record.target.clone())
        .collect()
}

/// Only the admitted graphs. Metadata counts as signed only when its own
/// graph carries a verified proof, so a tampered metadata graph drops out
/// even when the data graph it describes still verifies.
pub(crate) fn restrict(dataset: &Dataset, admitted: &HashSet<Term>) -> Dataset {
    dataset
        .iter()
        .filter(|quad| {
            graph_term(&quad.graph_name.into_owned()).is_some_and(|graph| admitted.contains(&graph))
        })
        .collect()
}

async fn evaluate(dataset: Dataset, query: String) -> Result<Vec<Triple>> {
    let evaluation = spawn_blocking(move || {
        let store = Store::new().map_err(|e| ContextError::Query(e.to_string()))?;
        for quad in dataset.iter() {
            store
                .insert(quad)
                .map_err(|e| ContextError::Query(e.to_string()))?;
        }
        let QueryResults::Graph(triples) = store
            .query(query.as_str())
            .map_err(|e| ContextError::Query(e.to_string()))?
        else {
            return Err(ContextError::Query("expected a graph result".to_string()));
        };
        triples
            .map(|triple| triple.map_err(|e| ContextError::Query(e.to_string())))
            .collect::<Result<Vec<_>>>()
    });
    evaluation
        .await
        .map_err(|e| ContextError::Internal(e.to_string()))?
}

#[cfg(test)]
mod tests;
