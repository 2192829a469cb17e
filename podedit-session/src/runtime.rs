use std::path::{Path, PathBuf};

use podedit_core::{CopyTool, EditorCommand, RemoteFile, RemoteRef};

use crate::editor::EditorProcess;
use crate::error::{io_err, SessionError};
use crate::sync_loop::{stop_editor, EditorHandle, SessionReport, SyncSession};
use crate::watcher::{ChangeWatcher, WatchStreams};

/// Everything one edit session needs, resolved up front.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub target: RemoteRef,
    pub copy_tool: CopyTool,
    pub editor: EditorCommand,
    /// Where the scratch directory is created; the system temp dir if `None`.
    pub scratch_root: Option<PathBuf>,
}

impl SessionConfig {
    pub fn new(target: RemoteRef) -> Self {
        Self {
            target,
            copy_tool: CopyTool::default(),
            editor: EditorCommand::default(),
            scratch_root: None,
        }
    }
}

/// Run an edit session on a fresh runtime and block until it ends.
pub fn start_blocking(config: SessionConfig) -> Result<SessionReport, SessionError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Fetch, edit, upload on save. The scratch directory is removed on every
/// exit path; a cleanup failure is logged and never replaces the session's
/// own result.
pub async fn run(config: SessionConfig) -> Result<SessionReport, SessionError> {
    let mut remote = RemoteFile::create_in(
        config.copy_tool.clone(),
        config.target.clone(),
        config.scratch_root.as_deref(),
    )?;

    let result = edit(&mut remote, &config.editor).await;

    let scratch = remote.scratch_dir().to_path_buf();
    match remote.close() {
        Ok(()) => tracing::debug!(path = %scratch.display(), "removed scratch directory"),
        Err(err) => tracing::warn!(error = %err, "scratch cleanup failed"),
    }
    result
}

async fn edit(
    remote: &mut RemoteFile,
    editor: &EditorCommand,
) -> Result<SessionReport, SessionError> {
    let fetch = remote.fetch_invocation();
    tokio::task::spawn_blocking(move || fetch.run())
        .await
        .map_err(|err| SessionError::Join("download", err))??;
    tracing::info!(remote = %remote.remote(), local = %remote.local_path().display(), "fetched");

    let mut editor = EditorProcess::spawn(editor, remote.local_path())?;

    let (watcher, streams) = watch_or_stop(&mut editor, remote.local_path()).await?;
    let result = SyncSession::new(&mut *remote, editor, streams).run().await;

    if let Err(err) = watcher.close() {
        tracing::warn!(error = %err, "failed to stop watcher");
    }
    result
}

/// Register the watch on a file the editor already has open. The editor is
/// stopped if registration fails.
async fn watch_or_stop<E: EditorHandle>(
    editor: &mut E,
    path: &Path,
) -> Result<(ChangeWatcher, WatchStreams), SessionError> {
    match ChangeWatcher::watch(path) {
        Ok(watch) => Ok(watch),
        Err(err) => {
            stop_editor(editor).await;
            Err(err)
        }
    }
}

/// Install the stderr `fmt` subscriber; `RUST_LOG` overrides the `info`
/// default. Safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    // `sh -c` keeps the scratch path out of `sleep`'s arguments.
    fn long_running_editor() -> EditorCommand {
        EditorCommand {
            program: "sh".to_string(),
            args: vec!["-c".into(), "exec sleep 30".into(), "editor".into()],
        }
    }

    #[tokio::test]
    async fn failed_watch_stops_the_running_editor() {
        let root = tempfile::TempDir::new().expect("scratch root");
        let remote = RemoteFile::create_in(
            CopyTool::default(),
            RemoteRef::parse("web-0:/srv/app.yaml").expect("parse"),
            Some(root.path()),
        )
        .expect("create");
        // Never fetched, so the scratch file does not exist.
        let mut editor =
            EditorProcess::spawn(&long_running_editor(), remote.local_path()).expect("spawn");

        let err = match watch_or_stop(&mut editor, remote.local_path()).await {
            Ok(_) => panic!("watch on a missing file should fail"),
            Err(err) => err,
        };
        assert!(
            matches!(err, SessionError::WatchTargetMissing { .. }),
            "got: {err}"
        );

        let exit = tokio::time::timeout(Duration::from_secs(5), editor.wait_exit())
            .await
            .expect("editor should have been killed");
        assert_eq!(exit.code, None, "killed by signal");

        remote.close().expect("close");
        assert_eq!(std::fs::read_dir(root.path()).expect("read").count(), 0);
    }

    #[tokio::test]
    async fn successful_watch_leaves_the_editor_running() {
        let root = tempfile::TempDir::new().expect("scratch root");
        let file = root.path().join("app.yaml");
        std::fs::write(&file, "replicas: 1\n").expect("seed");
        let mut editor = EditorProcess::spawn(&long_running_editor(), &file).expect("spawn");

        let (watcher, _streams) = watch_or_stop(&mut editor, &file).await.expect("watch");
        assert!(!editor.has_exited());

        editor.terminate().await.expect("terminate");
        watcher.close().expect("close watcher");
    }
}
