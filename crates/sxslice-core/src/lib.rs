//! Extraction engine for sxslice.
//!
//! This crate ties the schema layer into the `Resolver` — the recursive
//! dependency walker that copies referenced artifacts from a source store
//! into a destination directory, verifying each manifest's identity against
//! the reference that named it. Packed manifests are routed through the
//! `DeltaDecoder` capability so the platform-specific delta format stays out
//! of the resolver core.

pub mod decoder;
pub mod resolver;

pub use decoder::{CommandDecoder, DecodeError, DeltaDecoder, UnsupportedDecoder};
pub use resolver::{ExtractReport, Resolver};

use std::path::PathBuf;
use thiserror::Error;

/// Hard failures of a resolution run.
///
/// Soft conditions (unresolvable identity, artifact missing at the source,
/// missing optional companion) never surface here; they are logged and
/// processing continues. Everything below aborts the run, leaving the
/// destination partially populated with no rollback.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: sxslice_schema::ManifestError,
    },
    #[error("failed to unpack manifest {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("identity mismatch in {artifact}: {source}")]
    IdentityMismatch {
        artifact: String,
        #[source]
        source: sxslice_schema::IdentityMismatch,
    },
    #[error("dependency cycle detected at {artifact}")]
    Cycle { artifact: String },
    #[error("root manifest {} does not have the .mum extension", path.display())]
    NotAPackage { path: PathBuf },
    #[error("root catalog {} does not exist", path.display())]
    MissingRootCatalog { path: PathBuf },
}
