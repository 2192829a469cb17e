//! Editor process supervision.
//!
//! The child is owned by a dedicated waiter task that blocks only on the
//! process. It forwards a single exit notification over a oneshot channel and
//! services kill requests sent to it, so the sync loop never touches the
//! `Child` directly.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};

use podedit_core::EditorCommand;

use crate::error::SessionError;
use crate::sync_loop::EditorHandle;

type KillRequest = oneshot::Sender<io::Result<()>>;

/// How the editor finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorExit {
    /// `None` when killed by a signal or when the status was lost.
    pub code: Option<i32>,
}

impl EditorExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn from_wait(result: io::Result<ExitStatus>) -> Self {
        match result {
            Ok(status) => Self {
                code: status.code(),
            },
            Err(err) => {
                tracing::warn!(error = %err, "failed to collect editor exit status");
                Self { code: None }
            }
        }
    }
}

impl fmt::Display for EditorExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("no exit code"),
        }
    }
}

/// A running editor attached to this process's terminal.
#[derive(Debug)]
pub struct EditorProcess {
    pid: Option<u32>,
    exit_rx: oneshot::Receiver<io::Result<ExitStatus>>,
    kill_tx: mpsc::Sender<KillRequest>,
    exit: Option<EditorExit>,
}

impl EditorProcess {
    /// Launch `editor` on `file` and return immediately.
    ///
    /// Must be called from inside a tokio runtime: the waiter is spawned on it.
    pub fn spawn(editor: &EditorCommand, file: &Path) -> Result<Self, SessionError> {
        let child = Command::new(&editor.program)
            .args(&editor.args)
            .arg(file)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SessionError::Launch {
                program: editor.to_string(),
                source,
            })?;

        let pid = child.id();
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = mpsc::channel(1);
        tokio::spawn(wait_for_exit(child, kill_rx, exit_tx));

        tracing::debug!(
            pid = ?pid,
            editor = %editor,
            file = %file.display(),
            "editor started",
        );

        Ok(Self {
            pid,
            exit_rx,
            kill_tx,
            exit: None,
        })
    }
}

impl EditorHandle for EditorProcess {
    async fn wait_exit(&mut self) -> EditorExit {
        if let Some(exit) = self.exit {
            return exit;
        }
        let exit = match (&mut self.exit_rx).await {
            Ok(result) => EditorExit::from_wait(result),
            Err(_) => EditorExit { code: None },
        };
        self.exit = Some(exit);
        exit
    }

    fn has_exited(&mut self) -> bool {
        if self.exit.is_some() {
            return true;
        }
        match self.exit_rx.try_recv() {
            Ok(result) => {
                self.exit = Some(EditorExit::from_wait(result));
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Closed) => {
                self.exit = Some(EditorExit { code: None });
                true
            }
        }
    }

    async fn terminate(&mut self) -> Result<(), SessionError> {
        tracing::info!(pid = ?self.pid, "terminating editor");
        let (respond_to, response) = oneshot::channel();
        self.kill_tx
            .send(respond_to)
            .await
            .map_err(|_| SessionError::ChannelClosed("editor kill queue"))?;
        response
            .await
            .map_err(|_| SessionError::ChannelClosed("editor kill response"))?
            .map_err(SessionError::Terminate)
    }
}

async fn wait_for_exit(
    mut child: Child,
    mut kill_rx: mpsc::Receiver<KillRequest>,
    exit_tx: oneshot::Sender<io::Result<ExitStatus>>,
) {
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(respond_to) = kill_rx.recv() => {
                let _ = respond_to.send(child.start_kill());
            }
        }
    };
    let _ = exit_tx.send(status);
}
