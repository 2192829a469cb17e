//! podedit core library — remote references, copy-tool invocations and the
//! scratch-file handle.
//!
//! - [`types`] — parsed inputs and settings
//! - [`error`] — [`RemoteError`]
//! - [`remote`] — [`RemoteFile`]: fetch / push / close

pub mod error;
pub mod remote;
pub mod types;

pub use error::RemoteError;
pub use remote::{CopyInvocation, Direction, RemoteFile};
pub use types::{split_pod_and_path, CopyTool, EditorCommand, RemoteRef};
