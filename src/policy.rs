//! ODRL usage policies over data graphs.
//!
//! A policy is one `odrl:Agreement` granting `odrl:use` and `odrl:read` on
//! every target graph, optionally bounded in time and restricted to a set
//! of purposes.

use jiff::tz::TimeZone;
use jiff::{Span, Timestamp};
use oxigraph::model::{BlankNode, Literal, NamedNode, Term, Triple};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ContextError, Result};
use crate::rdf::list::create_list;
use crate::rdf::named_node;
use crate::rdf::vocab::{dpv, oac, odrl, rdf, xsd};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOptions {
    /// ISO 8601 duration, counted from the moment the policy is created.
    pub duration: Option<String>,
    /// Purpose IRIs or short DPV names.
    pub purpose: Option<Vec<String>>,
    pub assigner: Option<String>,
    pub assignee: Option<String>,
}

impl PolicyOptions {
    pub fn is_empty(&self) -> bool {
        self.duration.is_none()
            && self.purpose.is_none()
            && self.assigner.is_none()
            && self.assignee.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Policy {
    /// The agreement node.
    pub subject: BlankNode,
    pub uid: NamedNode,
    pub triples: Vec<Triple>,
}

/// Absolute end of a policy that lasts `duration` from `start`.
pub fn expiry(start: Timestamp, duration: &str) -> Result<Timestamp> {
    let span: Span = duration
        .parse()
        .map_err(|e| ContextError::InvalidPolicy(format!("duration {duration:?}: {e}")))?;
    let end = start
        .to_zoned(TimeZone::UTC)
        .checked_add(span)
        .map_err(|e| ContextError::InvalidPolicy(format!("duration {duration:?}: {e}")))?;
    Ok(end.timestamp())
}

fn policy_iri(value: &str) -> Result<NamedNode> {
    named_node(value).map_err(|e| ContextError::InvalidPolicy(e.to_string()))
}

fn constraint(
    triples: &mut Vec<Triple>,
    left: oxigraph::model::NamedNodeRef<'_>,
    operator: oxigraph::model::NamedNodeRef<'_>,
    right: impl Into<Term>,
) -> BlankNode {
    let node = BlankNode::default();
    triples.push(Triple::new(node.clone(), rdf::TYPE, odrl::CONSTRAINT_CLASS.into_owned()));
    triples.push(Triple::new(node.clone(), odrl::LEFT_OPERAND, left.into_owned()));
    triples.push(Triple::new(node.clone(), odrl::OPERATOR, operator.into_owned()));
    triples.push(Triple::new(node.clone(), odrl::RIGHT_OPERAND, right));
    node
}

fn purpose_constraint(triples: &mut Vec<Triple>, purposes: &[NamedNode]) -> Option<BlankNode> {
    match purposes {
        [] => None,
        [purpose] => Some(constraint(triples, oac::PURPOSE, odrl::EQ, purpose.clone())),
        _ => {
            let members: Vec<Term> = purposes
                .iter()
                .map(|purpose| constraint(triples, oac::PURPOSE, odrl::EQ, purpose.clone()).into())
                .collect();
            let (head, list) = create_list(&members);
            triples.extend(list);
            let node = BlankNode::default();
            if let Some(head) = head {
                triples.push(Triple::new(node.clone(), odrl::OR, head));
            }
            Some(node)
        }
    }
}

/// Build a policy granting use of `targets`.
pub fn create_policy(targets: &[Term], options: &PolicyOptions) -> Result<Policy> {
    create_policy_at(Timestamp::now(), targets, options)
}

pub(crate) fn create_policy_at(
    now: Timestamp,
    targets: &[Term],
    options: &PolicyOptions,
) -> Result<Policy> {
    if targets.is_empty() && options.purpose.as_ref().is_some_and(|p| p.is_empty()) {
        return Err(ContextError::InvalidPolicy(
            "no targets and an empty purpose list".to_string(),
        ));
    }
    let purposes = options
        .purpose
        .iter()
        .flatten()
        .map(|name| policy_iri(&dpv::resolve(name)))
        .collect::<Result<Vec<_>>>()?;
    let assigner = options.assigner.as_deref().map(policy_iri).transpose()?;
    let assignee = options.assignee.as_deref().map(policy_iri).transpose()?;

    let mut triples = Vec::new();
    let mut constraints = Vec::new();

    if let Some(duration) = &options.duration {
        let end = expiry(now, duration)?;
        let end = Literal::new_typed_literal(end.to_string(), xsd::DATE_TIME);
        constraints.push(constraint(&mut triples, odrl::DATE_TIME, odrl::LT, end));
    }
    constraints.extend(purpose_constraint(&mut triples, &purposes));

    let permission = BlankNode::default();
    for target in targets {
        triples.push(Triple::new(permission.clone(), odrl::TARGET, target.clone()));
    }
    triples.push(Triple::new(permission.clone(), odrl::ACTION, odrl::USE.into_owned()));
    triples.push(Triple::new(permission.clone(), odrl::ACTION, odrl::READ.into_owned()));
    if let Some(assigner) = assigner {
        triples.push(Triple::new(permission.clone(), odrl::ASSIGNER, assigner));
    }
    if let Some(assignee) = assignee {
        triples.push(Triple::new(permission.clone(), odrl::ASSIGNEE, assignee));
    }

    match constraints.as_slice() {
        [] => {}
        [single] => {
            triples.push(Triple::new(permission.clone(), odrl::CONSTRAINT, single.clone()));
        }
        _ => {
            let members: Vec<Term> = constraints.iter().cloned().map(Term::from).collect();
            let (head, list) = create_list(&members);
            triples.extend(list);
            let and = BlankNode::default();
            if let Some(head) = head {
                triples.push(Triple::new(and.clone(), odrl::AND, head));
            }
            triples.push(Triple::new(permission.clone(), odrl::CONSTRAINT, and));
        }
    }

    let agreement = BlankNode::default();
    let uid = policy_iri(&format!("urn:policy:{}", Uuid::new_v4()))?;
    triples.push(Triple::new(agreement.clone(), rdf::TYPE, odrl::AGREEMENT.into_owned()));
    triples.push(Triple::new(agreement.clone(), odrl::UID, uid.clone()));
    triples.push(Triple::new(agreement.clone(), odrl::PERMISSION, permission));
    debug!(target: "policy", "created policy {uid} over {} graphs", targets.len());

    Ok(Policy {
        subject: agreement,
        uid,
        triples,
    })
}
