//! kubectl-editfile — edit a file inside a pod with your local editor.
//!
//! # Usage
//!
//! ```text
//! kubectl editfile [-n namespace] [-c container] <pod>:<path>
//! ```
//!
//! The file is copied to a local scratch directory, `$EDITOR` is opened on
//! it, and every save is copied back with `kubectl cp` until the editor exits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use podedit_core::types::{DEFAULT_COPY_BINARY, DEFAULT_EDITOR};
use podedit_core::{CopyTool, EditorCommand, RemoteRef};
use podedit_session::SessionConfig;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "kubectl-editfile",
    version,
    about = "Edit a remote file, uploaded on save.",
    override_usage = "kubectl editfile [-n namespace] [-c container] <pod>:<path>",
    long_about = None,
)]
struct Cli {
    /// Remote file as `<pod>:<path>`.
    #[arg(value_name = "POD:PATH")]
    target: RemoteRef,

    /// Path to the kubectl binary.
    #[arg(long = "kubectl", value_name = "BIN", default_value = DEFAULT_COPY_BINARY)]
    kubectl: PathBuf,

    /// If present, the namespace scope for this CLI request.
    #[arg(short = 'n', long)]
    namespace: Option<String>,

    /// Container name. If omitted, the first container in the pod will be chosen.
    #[arg(short = 'c', long)]
    container: Option<String>,

    /// Editor command; the scratch file is passed as its last argument.
    #[arg(long, env = "EDITOR", default_value = DEFAULT_EDITOR, hide_env_values = true)]
    editor: String,

    /// Directory to create the scratch directory in (defaults to the system temp dir).
    #[arg(long, value_name = "DIR")]
    scratch_root: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> SessionConfig {
        SessionConfig {
            target: self.target,
            copy_tool: CopyTool::new(
                self.kubectl,
                self.namespace.unwrap_or_default(),
                self.container.unwrap_or_default(),
            ),
            editor: EditorCommand::parse(&self.editor),
            scratch_root: self.scratch_root,
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let target = cli.target.to_string();
    let report = podedit_session::start_blocking(cli.into_config())
        .with_context(|| format!("editing {target} failed"))?;
    tracing::info!(
        target = %target,
        uploads = report.uploads,
        editor = %report.editor_exit,
        "edit session finished",
    );
    Ok(())
}
