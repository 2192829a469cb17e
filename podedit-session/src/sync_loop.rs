//! The coordinating loop of an edit session.
//!
//! One task races three sources: editor exit, watcher errors and write
//! events. Exactly one event is handled per iteration. Uploads run inline,
//! so the loop cannot pick up the next event until the current upload has
//! finished and there is never more than one upload in flight.
//!
//! ```text
//! RUNNING --editor exit--------------------------> SHUTTING_DOWN -> TERMINATED (Ok)
//! RUNNING --write, push ok-----------------------> RUNNING
//! RUNNING --push failed / watcher error----------> SHUTTING_DOWN -> TERMINATED (Err)
//!             (editor terminated unless it already exited)
//! ```

use std::future::Future;

use podedit_core::RemoteFile;

use crate::editor::EditorExit;
use crate::error::SessionError;
use crate::watcher::{WatchStreams, WriteEvent};

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Sends the scratch file to its remote location.
pub trait Uploader {
    fn push(&mut self) -> impl Future<Output = Result<(), SessionError>>;
}

impl<U: Uploader + ?Sized> Uploader for &mut U {
    fn push(&mut self) -> impl Future<Output = Result<(), SessionError>> {
        (**self).push()
    }
}

impl Uploader for RemoteFile {
    async fn push(&mut self) -> Result<(), SessionError> {
        let invocation = self.push_invocation();
        tokio::task::spawn_blocking(move || invocation.run())
            .await
            .map_err(|err| SessionError::Join("upload", err))??;
        Ok(())
    }
}

/// Control over the running editor.
pub trait EditorHandle {
    /// Resolves once the editor has exited. Cancel-safe: the loop drops this
    /// future whenever another source wins the race.
    fn wait_exit(&mut self) -> impl Future<Output = EditorExit>;

    /// Whether the editor is already known to have exited. Never blocks.
    fn has_exited(&mut self) -> bool;

    /// Forcefully stop the editor. Only valid while it is still running.
    fn terminate(&mut self) -> impl Future<Output = Result<(), SessionError>>;
}

/// Best-effort editor shutdown on a fatal path. Failures are logged only.
pub(crate) async fn stop_editor<E: EditorHandle>(editor: &mut E) {
    if editor.has_exited() {
        return;
    }
    if let Err(err) = editor.terminate().await {
        tracing::warn!(error = %err, "error stopping editor");
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ShuttingDown,
    Terminated,
}

/// Summary of a session that ended because the editor exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub uploads: usize,
    pub editor_exit: EditorExit,
}

enum LoopEvent {
    EditorExited(EditorExit),
    Changed(WriteEvent),
    Failed(SessionError),
}

/// Runtime state of one edit session.
pub struct SyncSession<U, E> {
    uploader: U,
    editor: E,
    streams: WatchStreams,
    state: LoopState,
    uploads: usize,
}

impl<U: Uploader, E: EditorHandle> SyncSession<U, E> {
    pub fn new(uploader: U, editor: E, streams: WatchStreams) -> Self {
        Self {
            uploader,
            editor,
            streams,
            state: LoopState::Running,
            uploads: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn uploads(&self) -> usize {
        self.uploads
    }

    /// Drive the session until the editor exits (`Ok`) or a fatal error
    /// stops it (`Err`, editor terminated first).
    pub async fn run(&mut self) -> Result<SessionReport, SessionError> {
        if self.state != LoopState::Running {
            return Err(SessionError::AlreadyTerminated);
        }

        loop {
            let event = tokio::select! {
                biased;
                exit = self.editor.wait_exit() => LoopEvent::EditorExited(exit),
                error = self.streams.errors.recv() => match error {
                    Some(err) => LoopEvent::Failed(SessionError::Watch(err)),
                    None => LoopEvent::Failed(SessionError::WatchStreamClosed("error")),
                },
                change = self.streams.changes.recv() => match change {
                    Some(change) => LoopEvent::Changed(change),
                    None => LoopEvent::Failed(SessionError::WatchStreamClosed("change")),
                },
            };

            match event {
                LoopEvent::EditorExited(editor_exit) => {
                    self.transition(LoopState::ShuttingDown);
                    tracing::info!(
                        editor = %editor_exit,
                        uploads = self.uploads,
                        "shutting down",
                    );
                    self.transition(LoopState::Terminated);
                    return Ok(SessionReport {
                        uploads: self.uploads,
                        editor_exit,
                    });
                }
                LoopEvent::Changed(change) => {
                    tracing::debug!(path = %change.path.display(), kind = ?change.kind, "write observed");
                    if let Err(err) = self.uploader.push().await {
                        return Err(self.abort(err).await);
                    }
                    self.uploads += 1;
                    tracing::info!(uploads = self.uploads, "saved to remote");
                }
                LoopEvent::Failed(err) => return Err(self.abort(err).await),
            }
        }
    }

    async fn abort(&mut self, err: SessionError) -> SessionError {
        self.transition(LoopState::ShuttingDown);
        tracing::debug!(error = %err, "stopping edit session");
        stop_editor(&mut self.editor).await;
        self.transition(LoopState::Terminated);
        err
    }

    fn transition(&mut self, next: LoopState) {
        tracing::debug!(from = ?self.state, to = ?next, "sync loop state");
        self.state = next;
    }
}
