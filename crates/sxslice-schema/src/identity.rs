//! Artifact identity value objects and reference verification.

use crate::types::ArtifactKind;
use thiserror::Error;

/// The attribute set that names an artifact in the servicing store.
///
/// Read from `assemblyIdentity` elements. Immutable once parsed; everything
/// but `name` is optional, and the meaning of an absent value depends on
/// context (naming treats `neutral`, empty, and absent differently from
/// verification — see [`crate::naming`] and [`Identity::verify_against`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    /// The `language` attribute; culture in naming terms.
    pub language: Option<String>,
    pub version: Option<String>,
    pub public_key_token: Option<String>,
    pub processor_architecture: Option<String>,
    pub version_scope: Option<String>,
    /// The `type` attribute.
    pub assembly_type: Option<String>,
}

/// A single field disagreement between a reference and the manifest it named.
///
/// Signals a corrupt or tampered store; always a hard failure.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("key {field} expected {expected:?}, got {actual:?}")]
pub struct IdentityMismatch {
    pub field: &'static str,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl Identity {
    /// An identity with only the required `name` attribute set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: None,
            version: None,
            public_key_token: None,
            processor_architecture: None,
            version_scope: None,
            assembly_type: None,
        }
    }

    /// Verify a manifest's self-declared identity against this reference.
    ///
    /// String fields compare case-insensitively. For `language` and
    /// `processorArchitecture`, `neutral` and the empty string are folded to
    /// absent before comparing. Non-package artifacts additionally compare
    /// `versionScope` and `type`.
    pub fn verify_against(
        &self,
        declared: &Identity,
        kind: ArtifactKind,
    ) -> Result<(), IdentityMismatch> {
        let mut checks: Vec<(&'static str, Option<String>, Option<String>)> = vec![
            (
                "name",
                lowered(Some(self.name.as_str())),
                lowered(Some(declared.name.as_str())),
            ),
            (
                "language",
                fold_neutral(self.language.as_deref()),
                fold_neutral(declared.language.as_deref()),
            ),
            (
                "version",
                lowered(self.version.as_deref()),
                lowered(declared.version.as_deref()),
            ),
            (
                "publicKeyToken",
                lowered(self.public_key_token.as_deref()),
                lowered(declared.public_key_token.as_deref()),
            ),
            (
                "processorArchitecture",
                fold_neutral(self.processor_architecture.as_deref()),
                fold_neutral(declared.processor_architecture.as_deref()),
            ),
        ];

        if !kind.is_package() {
            checks.push((
                "versionScope",
                lowered(self.version_scope.as_deref()),
                lowered(declared.version_scope.as_deref()),
            ));
            checks.push((
                "type",
                lowered(self.assembly_type.as_deref()),
                lowered(declared.assembly_type.as_deref()),
            ));
        }

        for (field, expected, actual) in checks {
            if expected != actual {
                return Err(IdentityMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }

        Ok(())
    }
}

fn lowered(value: Option<&str>) -> Option<String> {
    value.map(str::to_lowercase)
}

/// Lower-case, then treat `neutral` and the empty string as absent.
fn fold_neutral(value: Option<&str>) -> Option<String> {
    match lowered(value) {
        Some(s) if s.is_empty() || s == "neutral" => None,
        other => other,
    }
}
