//! Context associations: RDF data wrapped in blank node graphs, described by
//! provenance, usage policies and integrity proofs held in separate metadata
//! graphs.

pub mod builder;
pub mod config;
pub mod error;
pub mod filter;
pub mod policy;
pub mod rdf;
pub mod resources;
pub mod signature;
pub mod source;

pub use crate::error::{ContextError, ErrorKind, Result};
