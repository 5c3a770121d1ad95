//! Read-only manifest document model.
//!
//! A manifest is an XML document declaring its own identity plus dependency
//! references. Package manifests group references under
//! `package/update/{package,component,driver}`; assembly manifests list them
//! under `dependency/dependentAssembly`. The XML namespace is derived from
//! the root element of each document and never shared between documents.

use crate::identity::Identity;
use crate::types::ArtifactKind;
use thiserror::Error;

/// Magic prefix of a packed (delta-compressed) manifest.
pub const PACKED_MANIFEST_MAGIC: [u8; 4] = *b"DCM\x01";

/// Whether the raw file content is a packed manifest needing external
/// decompression before XML parsing.
pub fn is_packed_manifest(bytes: &[u8]) -> bool {
    bytes.starts_with(&PACKED_MANIFEST_MAGIC)
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("failed to parse manifest XML: {0}")]
    ParseXml(#[from] roxmltree::Error),
    #[error("manifest declares no assemblyIdentity element")]
    MissingIdentity,
    #[error("assemblyIdentity element is missing the name attribute")]
    MissingName,
}

/// A dependency reference found in a manifest, tagged with the role it was
/// referenced under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub identity: Identity,
}

/// A parsed manifest: self-declared identity plus dependency references in
/// document order.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub identity: Identity,
    pub references: Vec<ArtifactRef>,
}

/// Parse manifest bytes. Strips a UTF-8 BOM if present; packed content must
/// be decoded before calling this.
pub fn parse_manifest_bytes(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    let bytes = bytes
        .strip_prefix(b"\xEF\xBB\xBF".as_slice())
        .unwrap_or(bytes);
    parse_manifest_str(std::str::from_utf8(bytes)?)
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    let doc = roxmltree::Document::parse(input)?;
    let root = doc.root_element();
    let ns = root.tag_name().namespace();

    let identity_node = element_children(root, ns, "assemblyIdentity")
        .into_iter()
        .next()
        .ok_or(ManifestError::MissingIdentity)?;
    let identity = identity_from_node(identity_node)?;

    let mut references = Vec::new();

    // package/update/{package,component,driver}/assemblyIdentity
    for pkg in element_children(root, ns, "package") {
        for update in element_children(pkg, ns, "update") {
            for (tag, kind) in [
                ("package", ArtifactKind::Package),
                ("component", ArtifactKind::Component),
                ("driver", ArtifactKind::Driver),
            ] {
                for entry in element_children(update, ns, tag) {
                    for node in element_children(entry, ns, "assemblyIdentity") {
                        references.push(ArtifactRef {
                            kind,
                            identity: identity_from_node(node)?,
                        });
                    }
                }
            }
        }
    }

    // dependency/dependentAssembly/assemblyIdentity
    for dep in element_children(root, ns, "dependency") {
        for dependent in element_children(dep, ns, "dependentAssembly") {
            for node in element_children(dependent, ns, "assemblyIdentity") {
                references.push(ArtifactRef {
                    kind: ArtifactKind::Assembly,
                    identity: identity_from_node(node)?,
                });
            }
        }
    }

    Ok(Manifest {
        identity,
        references,
    })
}

fn element_children<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    ns: Option<&str>,
    name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    node.children()
        .filter(|c| {
            c.is_element() && c.tag_name().name() == name && c.tag_name().namespace() == ns
        })
        .collect()
}

fn identity_from_node(node: roxmltree::Node<'_, '_>) -> Result<Identity, ManifestError> {
    let attr = |key: &str| node.attribute(key).map(str::to_owned);

    Ok(Identity {
        name: attr("name").ok_or(ManifestError::MissingName)?,
        language: attr("language"),
        version: attr("version"),
        public_key_token: attr("publicKeyToken"),
        processor_architecture: attr("processorArchitecture"),
        version_scope: attr("versionScope"),
        assembly_type: attr("type"),
    })
}
