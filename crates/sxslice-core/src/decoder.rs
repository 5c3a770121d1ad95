//! Delta-decoder capability for packed manifests.
//!
//! The packed container (magic `DCM\x01` plus a delta blob against a fixed
//! reference template) is a platform-specific binary format. The resolver
//! only recognizes it and hands the file to a [`DeltaDecoder`]; what sits
//! behind that trait is configuration.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no delta decoder is configured; cannot unpack packed manifests")]
    Unavailable,
    #[error("failed to run decoder {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoder {} exited with {status}", program.display())]
    Failed {
        program: PathBuf,
        status: std::process::ExitStatus,
    },
    #[error("failed to read decoder output: {0}")]
    Output(#[source] std::io::Error),
}

/// Produces plain manifest XML from a packed manifest file.
pub trait DeltaDecoder {
    fn decode(&self, packed: &Path) -> Result<Vec<u8>, DecodeError>;
}

/// Decoder used when none is configured.
///
/// Fails on first use; a store without packed manifests never reaches it.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedDecoder;

impl DeltaDecoder for UnsupportedDecoder {
    fn decode(&self, _packed: &Path) -> Result<Vec<u8>, DecodeError> {
        Err(DecodeError::Unavailable)
    }
}

/// Adapter around an external decoder executable, invoked as
/// `<program> <packed> <output> [template]`.
///
/// Delta decoding applies the blob against a fixed reference template; the
/// template path is appended when configured. The output file is a scoped
/// temporary; its bytes are returned and the file is removed when decode
/// returns, on every path.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    program: PathBuf,
    template: Option<PathBuf>,
}

impl CommandDecoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            template: None,
        }
    }

    /// Pass a reference template path to the decoder as a trailing argument.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }
}

impl DeltaDecoder for CommandDecoder {
    fn decode(&self, packed: &Path) -> Result<Vec<u8>, DecodeError> {
        let output = tempfile::NamedTempFile::new().map_err(DecodeError::Output)?;

        let mut command = Command::new(&self.program);
        command.arg(packed).arg(output.path());
        if let Some(template) = &self.template {
            command.arg(template);
        }

        let status = command.status().map_err(|e| DecodeError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        if !status.success() {
            return Err(DecodeError::Failed {
                program: self.program.clone(),
                status,
            });
        }

        std::fs::read(output.path()).map_err(DecodeError::Output)
    }
}
