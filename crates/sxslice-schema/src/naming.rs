//! Deterministic servicing-store naming.
//!
//! Packages are named by plain field concatenation; every other artifact kind
//! carries a hashed name ending in a 64-bit pseudo-key. The pseudo-key
//! algorithm reproduces the store's own naming bit-for-bit: any deviation
//! makes extraction silently fail to find real files on disk.

use crate::identity::Identity;
use crate::types::{AssemblyName, PackageName};

/// Per-character multiplier of the accumulator fold.
const HASH_STEP: u32 = 65599;

/// Combination constants for merging the four 32-bit accumulators.
const HASH_C1: u64 = 0x01E5_FFFF_FD27;
const HASH_C2: u64 = 0xFFFF_FFDC_0000_0051;
const HASH_C3: u64 = 0x0001_FFFF_FFF7;

/// Fold constant for chaining attribute hashes into the pseudo-key.
const KEY_FOLD: u64 = 0x0001_FFFF_FFF7;

/// Characters removed from the `name` field before length trimming.
const NAME_STRIP: &[char] = &[
    '(', ')', '\\', '/', ' ', '+', '*', '!', '@', '#', '$', '%', '^', '&', '[', ']',
];

/// Hash a string into 64 bits.
///
/// The input is lower-cased, then each character feeds one of four 32-bit
/// accumulators round-robin (character `i` goes to accumulator `i % 4`).
/// All arithmetic wraps; overflow is part of the algorithm.
pub fn hash_data(input: &str) -> u64 {
    let mut acc = [0u32; 4];
    for (i, ch) in input.to_lowercase().chars().enumerate() {
        let slot = i % 4;
        acc[slot] = acc[slot].wrapping_mul(HASH_STEP).wrapping_add(u32::from(ch));
    }

    u64::from(acc[0])
        .wrapping_mul(HASH_C1)
        .wrapping_add(u64::from(acc[1]).wrapping_mul(HASH_C2))
        .wrapping_add(u64::from(acc[2]).wrapping_mul(HASH_C3))
        .wrapping_add(u64::from(acc[3]))
}

/// Identity attributes after store normalization, ready for hashing.
///
/// `culture` is always materialized (`none` stands in for neutral, empty, or
/// absent); other absent fields stay absent. Built via
/// [`from_identity`](Self::from_identity), which reports wildcard-culture
/// identities as unresolvable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    pub name: String,
    pub culture: String,
    pub version: Option<String>,
    pub public_key_token: Option<String>,
    pub processor_architecture: Option<String>,
    pub version_scope: Option<String>,
    pub assembly_type: Option<String>,
}

impl NormalizedIdentity {
    /// Normalize an identity for naming, or `None` if it is unresolvable
    /// (wildcard culture). Unresolvable is not an error: callers treat it
    /// as "nothing to do".
    pub fn from_identity(identity: &Identity) -> Option<Self> {
        let culture = match identity.language.as_deref() {
            Some("*") => return None,
            Some(v) if v.is_empty() || v == "neutral" => "none".to_owned(),
            Some(v) => v.to_owned(),
            None => "none".to_owned(),
        };

        let processor_architecture = identity.processor_architecture.as_deref().map(|v| {
            if v.is_empty() || v == "neutral" {
                "none".to_owned()
            } else {
                v.to_owned()
            }
        });

        Some(Self {
            name: identity.name.clone(),
            culture,
            version: identity.version.clone(),
            public_key_token: identity.public_key_token.clone(),
            processor_architecture,
            version_scope: identity.version_scope.clone(),
            assembly_type: identity.assembly_type.clone(),
        })
    }
}

/// Compute the 16-digit hex pseudo-key of a normalized identity.
///
/// Fields fold in a fixed order; `version` is skipped entirely in winners
/// mode, and any field holding the literal `none` contributes nothing.
pub fn generate_pseudo_key(identity: &NormalizedIdentity, winners: bool) -> String {
    let version = if winners {
        None
    } else {
        identity.version.as_deref()
    };

    let fields: [(&str, Option<&str>); 7] = [
        ("name", Some(identity.name.as_str())),
        ("culture", Some(identity.culture.as_str())),
        ("type", identity.assembly_type.as_deref()),
        ("version", version),
        ("publicKeyToken", identity.public_key_token.as_deref()),
        (
            "processorArchitecture",
            identity.processor_architecture.as_deref(),
        ),
        ("versionScope", identity.version_scope.as_deref()),
    ];

    let mut key = 0u64;
    for (attr, value) in fields {
        let Some(value) = value else { continue };
        if value == "none" {
            continue;
        }
        key = hash_data(value)
            .wrapping_add(KEY_FOLD.wrapping_mul(hash_data(attr)))
            .wrapping_add(KEY_FOLD.wrapping_mul(key));
    }

    format!("{key:016x}")
}

/// Assemble the full on-disk name of a non-package artifact.
pub fn generate_sxs_name(identity: &NormalizedIdentity, winners: bool) -> AssemblyName {
    let pseudo_key = generate_pseudo_key(identity, winners);

    let stripped: String = identity
        .name
        .chars()
        .filter(|c| !NAME_STRIP.contains(c))
        .collect();
    let name = trim_middle(&stripped, 40, 19);
    let culture = trim_middle(&identity.culture, 8, 3);

    let mut parts: Vec<&str> = Vec::with_capacity(6);
    if let Some(arch) = identity.processor_architecture.as_deref() {
        parts.push(arch);
    }
    parts.push(&name);
    if let Some(token) = identity.public_key_token.as_deref() {
        parts.push(token);
    }
    if !winners {
        if let Some(version) = identity.version.as_deref() {
            parts.push(version);
        }
    }
    parts.push(&culture);
    parts.push(&pseudo_key);

    AssemblyName::new(parts.join("_").to_lowercase())
}

/// Name a non-package artifact, or `None` for an unresolvable identity.
pub fn assembly_name(identity: &Identity) -> Option<AssemblyName> {
    NormalizedIdentity::from_identity(identity).map(|n| generate_sxs_name(&n, false))
}

/// Name a package: `name~publicKeyToken~arch~lang~version`, with `neutral`
/// architecture and language rendered as empty segments. No hashing.
pub fn package_name(identity: &Identity) -> PackageName {
    let arch = match identity.processor_architecture.as_deref() {
        Some("neutral") | None => "",
        Some(v) => v,
    };
    let lang = match identity.language.as_deref() {
        Some("neutral") | None => "",
        Some(v) => v,
    };

    PackageName::new(format!(
        "{}~{}~{}~{}~{}",
        identity.name,
        identity.public_key_token.as_deref().unwrap_or(""),
        arch,
        lang,
        identity.version.as_deref().unwrap_or(""),
    ))
}

/// Keep `keep` characters from each end when the input exceeds `max`.
fn trim_middle(s: &str, max: usize, keep: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max {
        return s.to_owned();
    }
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{head}..{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> Identity {
        Identity::new(name)
    }

    #[test]
    fn hash_of_empty_string_is_zero() {
        assert_eq!(hash_data(""), 0);
    }

    #[test]
    fn hash_is_case_insensitive() {
        assert_eq!(hash_data("Microsoft-Windows"), hash_data("microsoft-windows"));
    }

    #[test]
    fn hash_single_char_feeds_first_accumulator() {
        // one character lands in acc[0], which is scaled by the first constant
        assert_eq!(hash_data("a"), u64::from(b'a').wrapping_mul(0x01E5_FFFF_FD27));
    }

    #[test]
    fn hash_round_robin_distributes_characters() {
        // "aaaa" puts one 'a' in each accumulator; "aa" only in the first two
        assert_ne!(hash_data("aaaa"), hash_data("aa"));
    }

    #[test]
    fn pseudo_key_is_deterministic() {
        let norm = NormalizedIdentity::from_identity(&Identity {
            language: Some("en-US".to_owned()),
            version: Some("10.0.19041.1".to_owned()),
            public_key_token: Some("31bf3856ad364e35".to_owned()),
            processor_architecture: Some("amd64".to_owned()),
            ..identity("Microsoft-Windows-Widget")
        })
        .unwrap();

        assert_eq!(
            generate_pseudo_key(&norm, false),
            generate_pseudo_key(&norm, false)
        );
    }

    #[test]
    fn pseudo_key_of_all_none_identity_is_zero() {
        let norm = NormalizedIdentity {
            name: "none".to_owned(),
            culture: "none".to_owned(),
            version: None,
            public_key_token: None,
            processor_architecture: None,
            version_scope: None,
            assembly_type: None,
        };
        assert_eq!(generate_pseudo_key(&norm, false), "0000000000000000");
    }

    #[test]
    fn winners_mode_skips_version() {
        let norm = NormalizedIdentity::from_identity(&Identity {
            version: Some("1.0.0.0".to_owned()),
            ..identity("Foo")
        })
        .unwrap();
        let without_version = NormalizedIdentity::from_identity(&identity("Foo")).unwrap();

        assert_eq!(
            generate_pseudo_key(&norm, true),
            generate_pseudo_key(&without_version, false)
        );
        assert_ne!(
            generate_pseudo_key(&norm, true),
            generate_pseudo_key(&norm, false)
        );
    }

    #[test]
    fn long_name_is_trimmed_to_forty_chars() {
        let long = "a".repeat(45);
        let norm = NormalizedIdentity::from_identity(&identity(&long)).unwrap();
        let name = generate_sxs_name(&norm, false);

        let expected = format!("{}..{}", "a".repeat(19), "a".repeat(19));
        assert_eq!(expected.len(), 40);
        assert!(name.as_str().contains(&expected));
        assert!(!name.as_str().contains(&"a".repeat(21)));
    }

    #[test]
    fn name_at_threshold_is_untouched() {
        let exact = "b".repeat(40);
        let norm = NormalizedIdentity::from_identity(&identity(&exact)).unwrap();
        assert!(generate_sxs_name(&norm, false).as_str().contains(&exact));
    }

    #[test]
    fn long_culture_is_trimmed_to_eight_chars() {
        let norm = NormalizedIdentity::from_identity(&Identity {
            language: Some("b".repeat(10)),
            ..identity("Foo")
        })
        .unwrap();
        let name = generate_sxs_name(&norm, false);
        assert!(name.as_str().contains("bbb..bbb"));
        assert!(!name.as_str().contains(&"b".repeat(9)));
    }

    #[test]
    fn culture_at_threshold_is_untouched() {
        let norm = NormalizedIdentity::from_identity(&Identity {
            language: Some("c".repeat(8)),
            ..identity("Foo")
        })
        .unwrap();
        assert!(generate_sxs_name(&norm, false)
            .as_str()
            .contains(&"c".repeat(8)));
    }

    #[test]
    fn special_characters_are_stripped_from_name() {
        let norm = NormalizedIdentity::from_identity(&identity("Fo o(b)a[r]+*!@#")).unwrap();
        let name = generate_sxs_name(&norm, false);
        assert!(name.as_str().contains("foobar"));
    }

    #[test]
    fn sxs_name_is_lowercase_and_underscore_joined() {
        let norm = NormalizedIdentity::from_identity(&Identity {
            language: Some("neutral".to_owned()),
            version: Some("6.1.7601.17514".to_owned()),
            public_key_token: Some("31BF3856AD364E35".to_owned()),
            processor_architecture: Some("AMD64".to_owned()),
            ..identity("Microsoft-Windows-Shell")
        })
        .unwrap();
        let name = generate_sxs_name(&norm, false).into_inner();

        assert_eq!(name, name.to_lowercase());
        let segments: Vec<&str> = name.split('_').collect();
        assert_eq!(segments.len(), 6);
        assert_eq!(segments[0], "amd64");
        assert_eq!(segments[1], "microsoft-windows-shell");
        assert_eq!(segments[2], "31bf3856ad364e35");
        assert_eq!(segments[3], "6.1.7601.17514");
        assert_eq!(segments[4], "none");
        assert_eq!(segments[5].len(), 16);
    }

    #[test]
    fn wildcard_culture_is_unresolvable() {
        let id = Identity {
            language: Some("*".to_owned()),
            ..identity("Foo")
        };
        assert!(NormalizedIdentity::from_identity(&id).is_none());
        assert!(assembly_name(&id).is_none());
    }

    #[test]
    fn empty_and_neutral_culture_normalize_to_none() {
        for lang in [None, Some(String::new()), Some("neutral".to_owned())] {
            let norm = NormalizedIdentity::from_identity(&Identity {
                language: lang,
                ..identity("Foo")
            })
            .unwrap();
            assert_eq!(norm.culture, "none");
        }
    }

    #[test]
    fn absent_architecture_stays_absent() {
        let norm = NormalizedIdentity::from_identity(&identity("Foo")).unwrap();
        assert_eq!(norm.processor_architecture, None);

        let neutral = NormalizedIdentity::from_identity(&Identity {
            processor_architecture: Some("neutral".to_owned()),
            ..identity("Foo")
        })
        .unwrap();
        assert_eq!(neutral.processor_architecture.as_deref(), Some("none"));
    }

    #[test]
    fn package_name_concatenates_five_fields() {
        let id = Identity {
            language: Some("en-US".to_owned()),
            version: Some("1.2.3.4".to_owned()),
            public_key_token: Some("31bf3856ad364e35".to_owned()),
            processor_architecture: Some("amd64".to_owned()),
            ..identity("Foo-Package")
        };
        assert_eq!(
            package_name(&id).as_str(),
            "Foo-Package~31bf3856ad364e35~amd64~en-US~1.2.3.4"
        );
    }

    #[test]
    fn package_name_renders_neutral_as_empty_segments() {
        let id = Identity {
            language: Some("neutral".to_owned()),
            version: Some("1.0.0.0".to_owned()),
            public_key_token: Some("31bf3856ad364e35".to_owned()),
            processor_architecture: Some("neutral".to_owned()),
            ..identity("Foo")
        };
        assert_eq!(package_name(&id).as_str(), "Foo~31bf3856ad364e35~~~1.0.0.0");
    }

    #[test]
    fn package_name_allows_null_version() {
        let id = Identity {
            public_key_token: Some("tok".to_owned()),
            ..identity("Foo")
        };
        assert_eq!(package_name(&id).as_str(), "Foo~tok~~~");
    }
}
