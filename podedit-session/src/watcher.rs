//! Write notifications for the scratch file.
//!
//! The scratch file's parent directory is watched rather than the file
//! itself: editors that save by writing a temp file and renaming it over the
//! original would otherwise drop the watch on the first save. Events are
//! filtered down to the scratch file's name before they reach the loop.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::SessionError;

/// One write-class change to the scratch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

/// The two independent sequences a watch produces.
#[derive(Debug)]
pub struct WatchStreams {
    pub changes: mpsc::UnboundedReceiver<WriteEvent>,
    pub errors: mpsc::UnboundedReceiver<notify::Error>,
}

impl WatchStreams {
    /// Streams fed by hand, plus the senders that feed them.
    pub fn channel() -> (
        Self,
        mpsc::UnboundedSender<WriteEvent>,
        mpsc::UnboundedSender<notify::Error>,
    ) {
        let (change_tx, changes) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();
        (Self { changes, errors }, change_tx, error_tx)
    }
}

/// Keeps the OS watch alive; dropping it (or [`ChangeWatcher::close`]) ends
/// both streams.
pub struct ChangeWatcher {
    watcher: RecommendedWatcher,
    dir: PathBuf,
}

impl ChangeWatcher {
    /// Start watching `path`, which must be an existing file.
    pub fn watch(path: &Path) -> Result<(Self, WatchStreams), SessionError> {
        if !path.is_file() {
            return Err(SessionError::WatchTargetMissing {
                path: path.to_path_buf(),
            });
        }
        let (name, dir) = match (path.file_name(), path.parent()) {
            (Some(name), Some(dir)) => (name.to_os_string(), dir.to_path_buf()),
            _ => {
                return Err(SessionError::WatchTargetMissing {
                    path: path.to_path_buf(),
                })
            }
        };

        let (streams, change_tx, error_tx) = WatchStreams::channel();
        let mut watcher = recommended_watcher(move |event: notify::Result<Event>| match event {
            Ok(event) => match write_event_for(&event, &name) {
                Some(write) => {
                    let _ = change_tx.send(write);
                }
                None => tracing::trace!(kind = ?event.kind, paths = ?event.paths, "ignored watch event"),
            },
            Err(err) => {
                let _ = error_tx.send(err);
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(dir = %dir.display(), file = %path.display(), "watching scratch file");

        Ok((Self { watcher, dir }, streams))
    }

    /// Stop watching and release the OS handle.
    pub fn close(mut self) -> Result<(), SessionError> {
        self.watcher.unwatch(&self.dir)?;
        Ok(())
    }
}

fn write_event_for(event: &Event, name: &OsStr) -> Option<WriteEvent> {
    let candidate = match event.kind {
        // Both old and new paths are reported; only the destination counts.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event.paths.last(),
        ref kind if is_write_kind(kind) => event
            .paths
            .iter()
            .find(|path| path.file_name() == Some(name)),
        _ => None,
    }?;

    if candidate.file_name() != Some(name) {
        return None;
    }
    Some(WriteEvent {
        path: candidate.clone(),
        kind: event.kind,
    })
}

fn is_write_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    )
}
