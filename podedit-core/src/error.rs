//! Error types for podedit-core.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// All errors that can arise while resolving or transferring a remote file.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The `<pod>:<path>` argument was missing a separator or one of its halves.
    #[error("invalid or missing pod and path: '{input}'")]
    InvalidReference { input: String },

    /// The scratch directory (or file inside it) could not be prepared.
    #[error("failed to prepare scratch directory under {path}: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The copy tool could not be started at all.
    #[error("failed to launch `{command}`: {source}")]
    TransferLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The copy tool ran but reported failure.
    #[error("`{command}` failed ({status}): {stderr}")]
    TransferFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The copy tool reported success but left nothing at the scratch path.
    #[error("`{command}` succeeded but produced no file at {path}")]
    TransferIncomplete { command: String, path: PathBuf },

    /// The scratch directory could not be removed.
    #[error("failed to remove scratch directory {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    /// True for every variant raised by a copy-tool run.
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            RemoteError::TransferLaunch { .. }
                | RemoteError::TransferFailed { .. }
                | RemoteError::TransferIncomplete { .. }
        )
    }
}

pub(crate) fn setup_err(path: impl Into<PathBuf>, source: std::io::Error) -> RemoteError {
    RemoteError::Setup {
        path: path.into(),
        source,
    }
}
