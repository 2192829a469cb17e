//! End-to-end session runs with shell-script stand-ins for the copy tool and
//! the editor. Every test checks that the scratch directory is gone afterwards.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use podedit_core::{CopyTool, EditorCommand, RemoteError, RemoteRef};
use podedit_session::{run, SessionConfig, SessionError};

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

/// Copy tool that serves `remote.txt` and stores uploads in `uploaded.txt`.
/// Uploads exit with `upload_code`.
fn copy_tool(dir: &Path, upload_code: i32) -> PathBuf {
    let body = format!(
        r#"src=""
dst=""
for arg; do
  src="$dst"
  dst="$arg"
done
case "$dst" in
  web-0:*)
    if [ {upload_code} -ne 0 ]; then echo "error: connection refused" >&2; exit {upload_code}; fi
    cat "$src" > "{dir}/uploaded.txt" ;;
  *) cat "{dir}/remote.txt" > "$dst" ;;
esac
"#,
        dir = dir.display(),
    );
    script(dir, "fake-kubectl", &body)
}

struct Fixture {
    tools: TempDir,
    scratch_root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let tools = TempDir::new().expect("tools");
        tools.child("remote.txt").write_str("replicas: 1\n").expect("seed");
        Self {
            tools,
            scratch_root: TempDir::new().expect("scratch root"),
        }
    }

    fn config(&self, binary: PathBuf, editor: EditorCommand) -> SessionConfig {
        let mut config =
            SessionConfig::new(RemoteRef::parse("web-0:/srv/app.yaml").expect("parse"));
        config.copy_tool = CopyTool::new(binary, "", "");
        config.editor = editor;
        config.scratch_root = Some(self.scratch_root.path().to_path_buf());
        config
    }

    fn editor(&self, body: &str) -> EditorCommand {
        let path = script(self.tools.path(), "fake-editor", body);
        EditorCommand::parse(&path.display().to_string())
    }

    fn assert_scratch_removed(&self) {
        let leftovers: Vec<_> = fs::read_dir(self.scratch_root.path())
            .expect("read scratch root")
            .collect();
        assert!(leftovers.is_empty(), "scratch left behind: {leftovers:?}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn save_is_uploaded_then_session_ends_with_editor() {
    let fx = Fixture::new();
    let uploaded = fx.tools.path().join("uploaded.txt");
    // Save by write-and-rename, then wait for the upload to land before quitting.
    let editor = fx.editor(&format!(
        r#"sleep 0.5
printf 'replicas: 3\n' > "$1.swp"
mv "$1.swp" "$1"
i=0
until grep -q 'replicas: 3' "{uploaded}" 2>/dev/null || [ $i -ge 100 ]; do sleep 0.1; i=$((i+1)); done
"#,
        uploaded = uploaded.display(),
    ));
    let config = fx.config(copy_tool(fx.tools.path(), 0), editor);

    let report = tokio::time::timeout(Duration::from_secs(30), run(config))
        .await
        .expect("session finished")
        .expect("session ok");

    assert!(report.uploads >= 1, "got {report:?}");
    assert!(report.editor_exit.success());
    fx.tools.child("uploaded.txt").assert("replicas: 3\n");
    fx.assert_scratch_removed();
}

#[tokio::test(flavor = "multi_thread")]
async fn editor_sees_the_fetched_contents() {
    let fx = Fixture::new();
    let seen = fx.tools.path().join("seen.txt");
    let editor = fx.editor(&format!(r#"cp "$1" "{}""#, seen.display()));
    let config = fx.config(copy_tool(fx.tools.path(), 0), editor);

    let report = run(config).await.expect("session ok");

    assert_eq!(report.uploads, 0);
    fx.tools.child("seen.txt").assert("replicas: 1\n");
    fx.tools.child("uploaded.txt").assert(predicates::path::missing());
    fx.assert_scratch_removed();
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_upload_kills_editor_and_cleans_up() {
    let fx = Fixture::new();
    let editor = fx.editor("sleep 0.5\necho changed >> \"$1\"\nexec sleep 60\n");
    let config = fx.config(copy_tool(fx.tools.path(), 7), editor);

    let err = tokio::time::timeout(Duration::from_secs(30), run(config))
        .await
        .expect("editor should have been terminated")
        .unwrap_err();

    match err {
        SessionError::Remote(RemoteError::TransferFailed { stderr, .. }) => {
            assert_eq!(stderr, "error: connection refused");
        }
        other => panic!("unexpected error: {other}"),
    }
    fx.assert_scratch_removed();
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_fetch_never_starts_the_editor() {
    let fx = Fixture::new();
    let marker = fx.tools.path().join("editor-ran");
    let editor = fx.editor(&format!("touch \"{}\"\n", marker.display()));
    let binary = script(fx.tools.path(), "broken-kubectl", "echo 'pod not found' >&2\nexit 1\n");
    let config = fx.config(binary, editor);

    let err = run(config).await.unwrap_err();

    assert!(
        matches!(err, SessionError::Remote(ref e) if e.is_transfer()),
        "got: {err}"
    );
    assert!(!marker.exists(), "editor must not start after a failed fetch");
    fx.assert_scratch_removed();
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_editor_is_a_launch_error() {
    let fx = Fixture::new();
    let config = fx.config(
        copy_tool(fx.tools.path(), 0),
        EditorCommand::parse("/nonexistent/podedit-editor --wait"),
    );

    let err = run(config).await.unwrap_err();

    assert!(matches!(err, SessionError::Launch { .. }), "got: {err}");
    assert!(err.to_string().contains("/nonexistent/podedit-editor --wait"));
    fx.assert_scratch_removed();
}
