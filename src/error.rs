//! Error types for dirq.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A filesystem operation failed for a reason other than a lost claim
    /// race. The affected file is left wherever the failure found it.
    #[error("i/o failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller-supplied processor failed. The claimed file stays in
    /// `working/` — there is no rollback of the claim.
    #[error("processor failed on {}: {source}", .file.display())]
    Processor {
        file: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
