//! Parsed inputs for an edit session.
//!
//! Nothing here touches the filesystem or spawns processes; these are plain
//! values built once from the command line and the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::RemoteError;

/// Default name of the copy binary.
pub const DEFAULT_COPY_BINARY: &str = "kubectl";

/// Editor launched when `EDITOR` is unset or blank.
pub const DEFAULT_EDITOR: &str = "nano";

// ---------------------------------------------------------------------------
// Remote reference
// ---------------------------------------------------------------------------

/// Split `<pod>:<path>` on the first `:`.
///
/// Returns two empty strings when there is no separator at all; callers must
/// treat an empty half as invalid.
pub fn split_pod_and_path(s: &str) -> (&str, &str) {
    match s.split_once(':') {
        Some((pod, path)) => (pod, path),
        None => ("", ""),
    }
}

/// Location of the file being edited: a pod (or node) and a path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteRef {
    pod: String,
    path: String,
}

impl RemoteRef {
    /// Parse `<pod>:<path>`. The pod may not contain `:`, the path may.
    pub fn parse(input: &str) -> Result<Self, RemoteError> {
        let (pod, path) = split_pod_and_path(input);
        if pod.is_empty() || path.is_empty() {
            return Err(RemoteError::InvalidReference {
                input: input.to_owned(),
            });
        }
        Ok(Self {
            pod: pod.to_owned(),
            path: path.to_owned(),
        })
    }

    pub fn pod(&self) -> &str {
        &self.pod
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final component of the remote path, if it has a usable one. It may
    /// still contain `:`.
    pub fn file_name(&self) -> Option<&str> {
        self.path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
    }
}

impl fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pod, self.path)
    }
}

impl FromStr for RemoteRef {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Copy tool
// ---------------------------------------------------------------------------

/// The external binary used to move bytes, plus its selector flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTool {
    pub binary: PathBuf,
    pub namespace: Option<String>,
    pub container: Option<String>,
}

impl CopyTool {
    /// Build from raw flag values; empty selectors are dropped.
    pub fn new(
        binary: impl Into<PathBuf>,
        namespace: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            namespace: non_empty(namespace.into()),
            container: non_empty(container.into()),
        }
    }

    /// `cp [-n <namespace>] [-c <container>]`
    pub fn base_args(&self) -> Vec<String> {
        let mut args = vec!["cp".to_string()];
        if let Some(namespace) = &self.namespace {
            args.push("-n".to_string());
            args.push(namespace.clone());
        }
        if let Some(container) = &self.container {
            args.push("-c".to_string());
            args.push(container.clone());
        }
        args
    }
}

impl Default for CopyTool {
    fn default() -> Self {
        Self::new(DEFAULT_COPY_BINARY, "", "")
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

// ---------------------------------------------------------------------------
// Editor command
// ---------------------------------------------------------------------------

/// Program and leading arguments of the user's editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EditorCommand {
    /// Split an `EDITOR`-style value on whitespace. Blank input falls back to
    /// [`DEFAULT_EDITOR`].
    pub fn parse(value: &str) -> Self {
        let mut words = value.split_whitespace().map(str::to_owned);
        match words.next() {
            Some(program) => Self {
                program,
                args: words.collect(),
            },
            None => Self {
                program: DEFAULT_EDITOR.to_owned(),
                args: Vec::new(),
            },
        }
    }
}

impl Default for EditorCommand {
    fn default() -> Self {
        Self::parse(DEFAULT_EDITOR)
    }
}

impl fmt::Display for EditorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_colons_in_path() {
        assert_eq!(
            split_pod_and_path("web-0:/etc/app:v2.conf"),
            ("web-0", "/etc/app:v2.conf")
        );
    }

    #[test]
    fn split_without_separator_yields_empty_halves() {
        assert_eq!(split_pod_and_path("podname"), ("", ""));
    }

    #[test]
    fn file_name_ignores_trailing_slash() {
        let remote = RemoteRef::parse("web-0:/etc/nginx/").expect("parse");
        assert_eq!(remote.file_name(), None);
        let remote = RemoteRef::parse("web-0:/etc/nginx/nginx.conf").expect("parse");
        assert_eq!(remote.file_name(), Some("nginx.conf"));
    }

    #[test]
    fn blank_editor_falls_back_to_default() {
        assert_eq!(EditorCommand::parse("   ").program, DEFAULT_EDITOR);
    }

    #[test]
    fn editor_keeps_leading_arguments() {
        let editor = EditorCommand::parse("code --wait");
        assert_eq!(editor.program, "code");
        assert_eq!(editor.args, vec!["--wait".to_string()]);
        assert_eq!(editor.to_string(), "code --wait");
    }
}
