//! Newtype wrappers for computed on-disk artifact names.
//!
//! Both newtypes serialize/deserialize as plain strings so reports stay
//! readable as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<std::path::Path> for $name {
            fn as_ref(&self) -> &std::path::Path {
                std::path::Path::new(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Five-field `~`-joined package name, the stem of a `.mum`/`.cat` pair.
    PackageName
);

string_newtype!(
    /// Hashed store name of a non-package artifact, the stem of a
    /// `.manifest` file and its optional payload directory.
    AssemblyName
);

/// The role under which an artifact was referenced.
///
/// Packages are named and verified differently from the other three; once
/// named, components, drivers and plain assemblies are processed uniformly
/// and the kind only labels log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Package,
    Component,
    Driver,
    Assembly,
}

impl ArtifactKind {
    pub fn is_package(self) -> bool {
        matches!(self, Self::Package)
    }

    /// Log label, capitalized the way operators expect to read it.
    pub fn label(self) -> &'static str {
        match self {
            Self::Package => "Package",
            Self::Component => "Component",
            Self::Driver => "Driver",
            Self::Assembly => "Assembly",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_display_and_as_ref() {
        let n = PackageName::new("Foo~abc~~~1.0");
        assert_eq!(n.to_string(), "Foo~abc~~~1.0");
        assert_eq!(n.as_str(), "Foo~abc~~~1.0");
        assert_eq!(AsRef::<str>::as_ref(&n), "Foo~abc~~~1.0");
    }

    #[test]
    fn assembly_name_serde_roundtrip() {
        let n = AssemblyName::new("amd64_foo_abc_1.0_none_0123456789abcdef");
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, "\"amd64_foo_abc_1.0_none_0123456789abcdef\"");
        let back: AssemblyName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn assembly_name_as_path_joins() {
        let n = AssemblyName::new("x86_bar_tok_none_fedcba9876543210");
        let p = std::path::Path::new("/dest").join(&n);
        assert_eq!(p, std::path::PathBuf::from(format!("/dest/{n}")));
    }

    #[test]
    fn package_name_into_inner() {
        let n = PackageName::new("pkg");
        assert_eq!(n.into_inner(), "pkg");
    }

    #[test]
    fn kind_labels() {
        assert_eq!(ArtifactKind::Package.label(), "Package");
        assert_eq!(ArtifactKind::Driver.to_string(), "Driver");
        assert!(ArtifactKind::Package.is_package());
        assert!(!ArtifactKind::Component.is_package());
    }
}
