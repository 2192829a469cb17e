//! Edit-session runtime: editor supervisor + change watcher + sync loop.

mod error;
pub mod editor;
mod runtime;
pub mod sync_loop;
pub mod watcher;

pub use editor::{EditorExit, EditorProcess};
pub use error::SessionError;
pub use runtime::{init_tracing, run, start_blocking, SessionConfig};
pub use sync_loop::{EditorHandle, LoopState, SessionReport, SyncSession, Uploader};
pub use watcher::{ChangeWatcher, WatchStreams, WriteEvent};
