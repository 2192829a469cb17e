use std::path::PathBuf;

use thiserror::Error;

use podedit_core::RemoteError;

/// Error surface for the edit session: editor, watcher and sync loop.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("failed to launch editor `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("cannot watch {path}: file does not exist")]
    WatchTargetMissing { path: PathBuf },

    #[error("watcher {0} stream closed while the editor was running")]
    WatchStreamClosed(&'static str),

    #[error("error stopping editor: {0}")]
    Terminate(#[source] std::io::Error),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("{0} task join failure")]
    Join(&'static str, #[source] tokio::task::JoinError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sync session already terminated")]
    AlreadyTerminated,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SessionError {
    SessionError::Io {
        path: path.into(),
        source,
    }
}
