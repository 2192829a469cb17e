//! Scratch-file handle backed by an external copy command.
//!
//! A [`RemoteFile`] owns a fresh temporary directory holding exactly one
//! file, the local copy of the remote path. [`RemoteFile::fetch`] copies
//! remote → local, [`RemoteFile::push`] copies local → remote. Both build a
//! [`CopyInvocation`] so callers that need to run the copy off-thread can
//! take an owned command with them.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

use crate::error::{setup_err, RemoteError};
use crate::types::{CopyTool, RemoteRef};

/// Prefix of the scratch directory created under the temp root.
pub const SCRATCH_PREFIX: &str = "kubectl_editfile";

/// Scratch file name used when the remote path has no usable final component.
pub const FALLBACK_FILE_NAME: &str = "edit";

/// Local name for the scratch copy of `remote`.
///
/// The copy tool reads any argument containing `:` as `<pod>:<path>`, so the
/// separator never appears in the local name.
pub fn scratch_file_name(remote: &RemoteRef) -> String {
    remote
        .file_name()
        .map(|name| name.replace(':', "_"))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_owned())
}

// ---------------------------------------------------------------------------
// Copy invocation
// ---------------------------------------------------------------------------

/// Which way a copy moves bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Download => f.write_str("download"),
            Direction::Upload => f.write_str("upload"),
        }
    }
}

/// A fully-built copy-tool command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyInvocation {
    pub direction: Direction,
    pub binary: PathBuf,
    pub args: Vec<OsString>,
    local: PathBuf,
}

impl CopyInvocation {
    /// Run the copy to completion.
    ///
    /// Output is captured rather than inherited so the copy never draws over
    /// the editor. Standard input is closed for the same reason.
    pub fn run(&self) -> Result<(), RemoteError> {
        let command = self.to_string();
        tracing::info!(direction = %self.direction, command = %command, "running copy");

        let output = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| RemoteError::TransferLaunch {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RemoteError::TransferFailed {
                command,
                status: output.status,
                stderr,
            });
        }

        for (stream, bytes) in [("stdout", &output.stdout), ("stderr", &output.stderr)] {
            let text = String::from_utf8_lossy(bytes);
            let text = text.trim();
            if !text.is_empty() {
                tracing::debug!(stream, output = %text, "copy tool output");
            }
        }

        if self.direction == Direction::Download && !self.local.is_file() {
            return Err(RemoteError::TransferIncomplete {
                command,
                path: self.local.clone(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for CopyInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Remote file handle
// ---------------------------------------------------------------------------

/// Owner of the scratch copy of one remote file.
///
/// The scratch directory is removed by [`RemoteFile::close`], or on drop if
/// `close` is never reached.
#[derive(Debug)]
pub struct RemoteFile {
    tool: CopyTool,
    remote: RemoteRef,
    scratch: TempDir,
    local: PathBuf,
}

impl RemoteFile {
    /// Create the scratch directory in the system temp directory.
    pub fn create(tool: CopyTool, remote: RemoteRef) -> Result<Self, RemoteError> {
        Self::create_in(tool, remote, None)
    }

    /// Create the scratch directory under `root`, or the system temp
    /// directory when `root` is `None`.
    pub fn create_in(
        tool: CopyTool,
        remote: RemoteRef,
        root: Option<&Path>,
    ) -> Result<Self, RemoteError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let scratch = match root {
            Some(root) => builder.tempdir_in(root).map_err(|e| setup_err(root, e))?,
            None => builder
                .tempdir()
                .map_err(|e| setup_err(std::env::temp_dir(), e))?,
        };

        let local = scratch.path().join(scratch_file_name(&remote));
        tracing::debug!(
            remote = %remote,
            local = %local.display(),
            "allocated scratch file",
        );

        Ok(Self {
            tool,
            remote,
            scratch,
            local,
        })
    }

    pub fn remote(&self) -> &RemoteRef {
        &self.remote
    }

    /// The scratch file the editor and watcher are pointed at.
    pub fn local_path(&self) -> &Path {
        &self.local
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// `<binary> cp [-n ns] [-c ctr] <pod>:<path> <local>`
    pub fn fetch_invocation(&self) -> CopyInvocation {
        self.invocation(Direction::Download)
    }

    /// `<binary> cp [-n ns] [-c ctr] <local> <pod>:<path>`
    pub fn push_invocation(&self) -> CopyInvocation {
        self.invocation(Direction::Upload)
    }

    /// Copy the remote file over the scratch file.
    pub fn fetch(&self) -> Result<(), RemoteError> {
        self.fetch_invocation().run()
    }

    /// Copy the scratch file back to the remote path.
    pub fn push(&self) -> Result<(), RemoteError> {
        self.push_invocation().run()
    }

    /// Remove the scratch directory and everything in it.
    pub fn close(self) -> Result<(), RemoteError> {
        let path = self.scratch.path().to_path_buf();
        self.scratch
            .close()
            .map_err(|source| RemoteError::Cleanup { path, source })
    }

    fn invocation(&self, direction: Direction) -> CopyInvocation {
        let remote = OsString::from(self.remote.to_string());
        let local = self.local.clone().into_os_string();
        let (src, dst) = match direction {
            Direction::Download => (remote, local),
            Direction::Upload => (local, remote),
        };

        let mut args: Vec<OsString> = self.tool.base_args().into_iter().map(Into::into).collect();
        args.push(src);
        args.push(dst);

        CopyInvocation {
            direction,
            binary: self.tool.binary.clone(),
            args,
            local: self.local.clone(),
        }
    }
}
