//! Fixed vocabularies shared with other context association implementations.
//!
//! None of these are configurable: documents produced here must be readable
//! by any implementation of the scheme.

use oxigraph::model::NamedNodeRef;

pub use oxigraph::model::vocab::{rdf, xsd};

pub const POLICY_NS: &str = "https://example.org/policy#";
pub const SIGNATURE_NS: &str = "https://example.org/signature#";
pub const PROVENANCE_NS: &str = "https://example.org/provenance#";
pub const ODRL_NS: &str = "http://www.w3.org/ns/odrl/2/";
pub const DPV_NS: &str = "https://w3id.org/dpv#";
pub const OAC_NS: &str = "https://w3id.org/oac#";
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// Prefixes used when rendering TriG and generated queries.
pub const PREFIXES: &[(&str, &str)] = &[
    ("rdf", RDF_NS),
    ("xsd", XSD_NS),
    ("odrl", ODRL_NS),
    ("dpv", DPV_NS),
    ("oac", OAC_NS),
    ("pol", POLICY_NS),
    ("sig", SIGNATURE_NS),
    ("prov", PROVENANCE_NS),
];

pub mod prov {
    use super::NamedNodeRef;

    pub const AUTHOR: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/provenance#author");
    pub const ORIGIN: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/provenance#origin");
    pub const TIMESTAMP: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/provenance#timestamp");
}

pub mod sig {
    use super::NamedNodeRef;

    pub const DATA_INTEGRITY_PROOF: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#DataIntegrityProof");
    pub const CREATED: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#created");
    pub const ISSUER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#issuer");
    pub const CRYPTOSUITE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#cryptosuite");
    pub const VERIFICATION_METHOD: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#verificationMethod");
    pub const PROOF_PURPOSE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#proofPurpose");
    pub const PROOF_VALUE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#proofValue");
    pub const CONTENT_MANIPULATION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#contentManipulation");
    pub const TARGET: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#target");
    pub const HASH_METHOD: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#hashMethod");
    pub const CANONICALIZATION_METHOD: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://example.org/signature#canonicalizationMethod");
}

pub mod odrl {
    use super::NamedNodeRef;

    pub const AGREEMENT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/Agreement");
    pub const CONSTRAINT_CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/Constraint");
    pub const UID: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/uid");
    pub const PERMISSION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/permission");
    pub const TARGET: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/target");
    pub const ACTION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/action");
    pub const USE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/use");
    pub const READ: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/read");
    pub const ASSIGNER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/assigner");
    pub const ASSIGNEE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/assignee");
    pub const CONSTRAINT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/constraint");
    pub const LEFT_OPERAND: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/leftOperand");
    pub const OPERATOR: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/operator");
    pub const RIGHT_OPERAND: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/rightOperand");
    pub const DATE_TIME: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/dateTime");
    pub const LT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/lt");
    pub const EQ: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/eq");
    pub const AND: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/and");
    pub const OR: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/odrl/2/or");
}

pub mod oac {
    use super::NamedNodeRef;

    pub const PURPOSE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/oac#Purpose");
}

pub mod dpv {
    use super::NamedNodeRef;

    pub const PURPOSE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/dpv#Purpose");
    pub const PERSONALISATION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/dpv#Personalisation");
    pub const SERVICE_PROVISION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/dpv#ServiceProvision");
    pub const MARKETING: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/dpv#Marketing");
    pub const PUBLIC_BENEFIT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/dpv#PublicBenefit");

    /// Resolve a short purpose name (`Marketing`, `dpv:Marketing`) or pass a
    /// full IRI through unchanged.
    pub fn resolve(name: &str) -> String {
        let local = name.strip_prefix("dpv:").unwrap_or(name);
        for purpose in [
            PURPOSE,
            PERSONALISATION,
            SERVICE_PROVISION,
            MARKETING,
            PUBLIC_BENEFIT,
        ] {
            if purpose.as_str().ends_with(&format!("#{local}")) {
                return purpose.as_str().to_string();
            }
        }
        // US spelling
        if local == "Personalization" {
            return PERSONALISATION.as_str().to_string();
        }
        name.to_string()
    }
}
