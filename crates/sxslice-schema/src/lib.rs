//! Artifact identities, store naming, and manifest parsing for sxslice.
//!
//! This crate defines the schema layer: the `Identity` value object read from
//! manifest XML, the deterministic servicing-store naming scheme
//! (`package_name`, `assembly_name` and the pseudo-key hash behind it),
//! identity verification (`Identity::verify_against`), and the read-only
//! `Manifest` document model with its dependency references.

pub mod identity;
pub mod manifest;
pub mod naming;
pub mod types;

pub use identity::{Identity, IdentityMismatch};
pub use manifest::{
    is_packed_manifest, parse_manifest_bytes, parse_manifest_str, ArtifactRef, Manifest,
    ManifestError, PACKED_MANIFEST_MAGIC,
};
pub use naming::{
    assembly_name, generate_pseudo_key, generate_sxs_name, hash_data, package_name,
    NormalizedIdentity,
};
pub use types::{ArtifactKind, AssemblyName, PackageName};
