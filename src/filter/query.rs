use crate::error::Result;
use crate::rdf::named_node;
use crate::rdf::vocab::{PREFIXES, dpv};

use super::FilterSpec;

/// Steps from a permission to any constraint it holds, through `odrl:and`
/// and `odrl:or` lists.
const CONSTRAINT_PATH: &str = "odrl:constraint/(odrl:and|odrl:or|rdf:first|rdf:rest)*";

/// The CONSTRUCT query selecting every data graph that matches `spec`.
///
/// Each criterion adds its own patterns to the metadata graph block; with no
/// criteria the query returns all triples in named graphs.
pub fn generate_query(spec: &FilterSpec) -> Result<String> {
    let origin = spec.origin.as_deref().map(named_node).transpose()?;
    let author = spec.author.as_deref().map(named_node).transpose()?;
    let purpose = spec
        .purpose
        .as_deref()
        .map(|p| named_node(&dpv::resolve(p)))
        .transpose()?;

    let mut metadata = String::new();
    if let Some(origin) = &origin {
        metadata.push_str(&format!("        ?dataGraph prov:origin {origin} .\n"));
    }
    if let Some(author) = &author {
        metadata.push_str(&format!("        ?dataGraph prov:author {author} .\n"));
    }
    if let Some(purpose) = &purpose {
        metadata.push_str("        ?policy a odrl:Agreement ;\n");
        metadata.push_str("            odrl:permission ?permission .\n");
        metadata.push_str("        ?permission odrl:target ?dataGraph ;\n");
        if let Some(author) = &author {
            metadata.push_str(&format!("            odrl:assigner {author} ;\n"));
        }
        metadata.push_str(&format!("            {CONSTRAINT_PATH} ?purposeConstraint .\n"));
        metadata.push_str("        ?purposeConstraint odrl:leftOperand oac:Purpose ;\n");
        metadata.push_str("            odrl:operator odrl:eq ;\n");
        metadata.push_str(&format!("            odrl:rightOperand {purpose} .\n"));
    }
    if spec.require_signature {
        metadata.push_str("        ?proof a sig:DataIntegrityProof ;\n");
        match &author {
            Some(author) => {
                metadata.push_str("            sig:target ?dataGraph ;\n");
                metadata.push_str(&format!("            sig:issuer {author} .\n"));
            }
            None => metadata.push_str("            sig:target ?dataGraph .\n"),
        }
    }

    let mut query = String::new();
    for (prefix, namespace) in PREFIXES {
        query.push_str(&format!("PREFIX {prefix}: <{namespace}>\n"));
    }
    query.push_str("CONSTRUCT { ?s ?p ?o . } WHERE {\n");
    if !metadata.is_empty() {
        query.push_str("    GRAPH ?metadataGraph {\n");
        query.push_str(&metadata);
        query.push_str("    }\n");
    }
    query.push_str("    GRAPH ?dataGraph { ?s ?p ?o . }\n}\n");
    Ok(query)
}
