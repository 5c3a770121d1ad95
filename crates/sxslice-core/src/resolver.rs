//! Recursive dependency resolver.
//!
//! Walks the manifest graph depth-first from a root package, computing each
//! referenced artifact's on-disk name, copying its files from the source
//! store into the destination, verifying the copied manifest's self-declared
//! identity against the reference that named it, and recursing into its own
//! references. Single-threaded and synchronous; every I/O operation is
//! attempted exactly once.

use crate::decoder::DeltaDecoder;
use crate::ResolveError;
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use sxslice_schema::{
    assembly_name, is_packed_manifest, package_name, parse_manifest_bytes, ArtifactKind, Identity,
    Manifest,
};
use tracing::{debug, info, warn};

/// Per-run resolution state of one artifact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveState {
    /// Files copied, manifest not yet fully processed. Seeing this again
    /// within one run means the dependency graph loops back on itself.
    InProgress,
    /// Fully processed, or established as not needing processing
    /// (already present in the destination, or missing at the source).
    Done,
}

/// Outcome summary of a resolution run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractReport {
    /// Packages copied during this run (the root is not counted).
    pub packages_copied: usize,
    /// Components, drivers and assemblies copied during this run.
    pub assemblies_copied: usize,
    /// References skipped because their artifact was already extracted.
    pub skipped_existing: usize,
    /// Names of referenced artifacts absent from the source store.
    pub missing_sources: Vec<String>,
}

/// Recursive extraction engine for one source/destination pair.
///
/// Holds the per-run resolution map; [`extract`](Self::extract) consumes the
/// resolver so state cannot leak between runs.
pub struct Resolver {
    destination: PathBuf,
    decoder: Box<dyn DeltaDecoder>,
    states: HashMap<String, ResolveState>,
    report: ExtractReport,
}

impl Resolver {
    pub fn new(destination: impl Into<PathBuf>, decoder: Box<dyn DeltaDecoder>) -> Self {
        Self {
            destination: destination.into(),
            decoder,
            states: HashMap::new(),
            report: ExtractReport::default(),
        }
    }

    /// Resolve the graph rooted at `root_mum` and copy every reachable
    /// artifact into the destination.
    ///
    /// The root must carry the `.mum` extension and its `.cat` catalog must
    /// exist alongside it; the root itself is trusted as given (no identity
    /// verification). The destination directory is created if absent. On a
    /// hard failure the destination is left partially populated.
    pub fn extract(mut self, root_mum: &Path) -> Result<ExtractReport, ResolveError> {
        let root = root_mum.canonicalize()?;

        if root.extension().and_then(OsStr::to_str) != Some("mum") {
            return Err(ResolveError::NotAPackage { path: root });
        }
        let Some(stem) = root.file_stem().and_then(OsStr::to_str).map(str::to_owned) else {
            return Err(ResolveError::NotAPackage { path: root });
        };

        let source_dir = root.parent().unwrap_or(Path::new(".")).to_path_buf();
        let source_cat = source_dir.join(format!("{stem}.cat"));
        if !source_cat.exists() {
            return Err(ResolveError::MissingRootCatalog { path: source_cat });
        }

        fs::create_dir_all(&self.destination)?;

        info!("Root package: {stem}");
        let dest_mum = self.destination.join(format!("{stem}.mum"));
        fs::copy(&root, &dest_mum)?;
        fs::copy(&source_cat, self.destination.join(format!("{stem}.cat")))?;

        let manifest = self.load_manifest(&dest_mum)?;
        self.recurse(&manifest, &source_dir)?;

        Ok(self.report)
    }

    /// Dispatch each reference of a parsed manifest to its processing path.
    ///
    /// Components, drivers and plain assemblies resolve identically once
    /// named; the kind only labels log output.
    fn recurse(&mut self, manifest: &Manifest, source_dir: &Path) -> Result<(), ResolveError> {
        for reference in &manifest.references {
            match reference.kind {
                ArtifactKind::Package => self.process_package(&reference.identity, source_dir)?,
                kind => self.process_assembly(kind, &reference.identity, source_dir)?,
            }
        }
        Ok(())
    }

    fn process_package(
        &mut self,
        identity: &Identity,
        source_dir: &Path,
    ) -> Result<(), ResolveError> {
        let name = package_name(identity);
        info!("Package: {name}");

        match self.states.get(name.as_str()) {
            Some(ResolveState::Done) => {
                self.report.skipped_existing += 1;
                return Ok(());
            }
            Some(ResolveState::InProgress) => {
                return Err(ResolveError::Cycle {
                    artifact: name.into_inner(),
                });
            }
            None => {}
        }

        let mum = format!("{name}.mum");
        let cat = format!("{name}.cat");
        let source_mum = source_dir.join(&mum);
        let source_cat = source_dir.join(&cat);
        let dest_mum = self.destination.join(&mum);
        let dest_cat = self.destination.join(&cat);

        // output from a prior run counts as done; never re-copy or re-parse
        if dest_mum.exists() && (dest_cat.exists() || !source_cat.exists()) {
            self.states.insert(name.to_string(), ResolveState::Done);
            self.report.skipped_existing += 1;
            return Ok(());
        }

        if !source_mum.exists() {
            warn!("Package {mum} does not exist");
            self.states.insert(name.to_string(), ResolveState::Done);
            self.report.missing_sources.push(name.into_inner());
            return Ok(());
        }

        self.states
            .insert(name.to_string(), ResolveState::InProgress);

        fs::copy(&source_mum, &dest_mum)?;
        if source_cat.exists() {
            fs::copy(&source_cat, &dest_cat)?;
        } else {
            warn!("Catalog {cat} does not exist");
        }
        self.report.packages_copied += 1;

        let manifest = self.load_manifest(&dest_mum)?;
        identity
            .verify_against(&manifest.identity, ArtifactKind::Package)
            .map_err(|e| ResolveError::IdentityMismatch {
                artifact: name.to_string(),
                source: e,
            })?;
        self.recurse(&manifest, source_dir)?;

        self.states.insert(name.into_inner(), ResolveState::Done);
        Ok(())
    }

    fn process_assembly(
        &mut self,
        kind: ArtifactKind,
        identity: &Identity,
        source_dir: &Path,
    ) -> Result<(), ResolveError> {
        let Some(name) = assembly_name(identity) else {
            // wildcard culture: nothing to copy, nothing to recurse into
            debug!("{kind} {} is unresolvable, skipping", identity.name);
            return Ok(());
        };
        info!("{kind}: {name}");

        match self.states.get(name.as_str()) {
            Some(ResolveState::Done) => {
                self.report.skipped_existing += 1;
                return Ok(());
            }
            Some(ResolveState::InProgress) => {
                return Err(ResolveError::Cycle {
                    artifact: name.into_inner(),
                });
            }
            None => {}
        }

        let manifest_file = format!("{name}.manifest");
        let source_manifest = source_dir.join(&manifest_file);
        let source_payload = source_dir.join(name.as_str());
        let dest_manifest = self.destination.join(&manifest_file);
        let dest_payload = self.destination.join(name.as_str());

        if dest_manifest.exists() && (dest_payload.exists() || !source_payload.exists()) {
            self.states.insert(name.to_string(), ResolveState::Done);
            self.report.skipped_existing += 1;
            return Ok(());
        }

        if !source_manifest.exists() {
            warn!("{kind} {manifest_file} does not exist");
            self.states.insert(name.to_string(), ResolveState::Done);
            self.report.missing_sources.push(name.into_inner());
            return Ok(());
        }

        self.states
            .insert(name.to_string(), ResolveState::InProgress);

        fs::copy(&source_manifest, &dest_manifest)?;
        if source_payload.is_dir() {
            copy_dir_all(&source_payload, &dest_payload)?;
        } else {
            warn!("{kind} {name} has no payload directory");
        }
        self.report.assemblies_copied += 1;

        let manifest = self.load_manifest(&dest_manifest)?;
        identity
            .verify_against(&manifest.identity, kind)
            .map_err(|e| ResolveError::IdentityMismatch {
                artifact: name.to_string(),
                source: e,
            })?;
        self.recurse(&manifest, source_dir)?;

        self.states.insert(name.into_inner(), ResolveState::Done);
        Ok(())
    }

    /// Read a manifest file, routing packed content through the decoder.
    ///
    /// Decoded bytes live only for this parse; nothing is left behind on any
    /// exit path.
    fn load_manifest(&self, file: &Path) -> Result<Manifest, ResolveError> {
        let bytes = fs::read(file)?;

        let bytes = if is_packed_manifest(&bytes) {
            debug!("Unpacking {}", file.display());
            self.decoder
                .decode(file)
                .map_err(|e| ResolveError::Decode {
                    path: file.to_path_buf(),
                    source: e,
                })?
        } else {
            bytes
        };

        parse_manifest_bytes(&bytes).map_err(|e| ResolveError::Manifest {
            path: file.to_path_buf(),
            source: e,
        })
    }
}

fn copy_dir_all(source: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_dir_all_copies_nested_trees() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.dll"), b"a").unwrap();
        fs::write(src.join("nested/b.dll"), b"b").unwrap();

        let dest = dir.path().join("dest");
        copy_dir_all(&src, &dest).unwrap();

        assert_eq!(fs::read(dest.join("a.dll")).unwrap(), b"a");
        assert_eq!(fs::read(dest.join("nested/b.dll")).unwrap(), b"b");
    }

    #[test]
    fn report_serializes_as_json() {
        let report = ExtractReport {
            packages_copied: 2,
            assemblies_copied: 3,
            skipped_existing: 1,
            missing_sources: vec!["gone".to_owned()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["packages_copied"], 2);
        assert_eq!(json["missing_sources"][0], "gone");
    }
}
