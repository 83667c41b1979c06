//! Environment provenance captured when a note is created
//!
//! Both probes are best-effort: a missing `git` binary, a directory outside
//! any working tree, or an unreadable executable path yield empty values and
//! a `debug` event, never an error.

use std::path::Path;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Version-control state of the working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    /// Name of the repository (basename of the working-tree root).
    pub repo_name: String,
    /// Checked-out branch, `HEAD` when detached.
    pub branch: String,
    /// Abbreviated commit hash.
    pub commit: String,
}

impl GitInfo {
    /// Probe `dir` with `git rev-parse`.
    ///
    /// Returns `None` when `dir` is not inside a git working tree, the
    /// repository has no commits yet, or git is not installed.
    #[must_use]
    pub fn probe(dir: &Path) -> Option<Self> {
        let toplevel = git(dir, &["rev-parse", "--show-toplevel"])?;
        let repo_name = Path::new(&toplevel)
            .file_name()
            .map_or_else(|| toplevel.clone(), |n| n.to_string_lossy().into_owned());
        let branch = git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let commit = git(dir, &["rev-parse", "--short", "HEAD"])?;

        Some(Self {
            repo_name,
            branch,
            commit,
        })
    }
}

fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| debug!(error = %e, "git not available"))
        .ok()?;

    if !output.status.success() {
        debug!(dir = %dir.display(), ?args, "git probe not applicable");
        return None;
    }

    let out = String::from_utf8(output.stdout).ok()?;
    let out = out.trim();
    (!out.is_empty()).then(|| out.to_string())
}

/// Runtime provenance stamped onto a fresh note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    /// Path of the executable that created the note.
    pub python_path: String,
    /// Git state of the working directory, if any.
    pub git: Option<GitInfo>,
}

impl Provenance {
    /// Probe the running process and its current directory.
    #[must_use]
    pub fn detect() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::detect_in(&dir),
            Err(e) => {
                debug!(error = %e, "current directory unavailable");
                Self {
                    python_path: executable_path(),
                    git: None,
                }
            }
        }
    }

    /// Probe the running process, taking git state from `dir`.
    #[must_use]
    pub fn detect_in(dir: &Path) -> Self {
        Self {
            python_path: executable_path(),
            git: GitInfo::probe(dir),
        }
    }
}

fn executable_path() -> String {
    std::env::current_exe()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|e| {
            debug!(error = %e, "executable path unavailable");
            String::new()
        })
}

/// Read stored git state. `{}`, `null` and malformed mappings mean absent.
pub(crate) fn git_from_value(value: &Value) -> Option<GitInfo> {
    match value {
        Value::Object(map) if !map.is_empty() => serde_json::from_value(value.clone())
            .map_err(|e| debug!(error = %e, "stored git state not readable"))
            .ok(),
        _ => None,
    }
}
