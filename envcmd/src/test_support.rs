//! Test-only helpers: in-memory console sinks, rule builders, and scratch
//! directories with predictable base names.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::rule::{Rule, TriggerKind};

/// Cloneable in-memory sink; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::other("shared buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sequential rule with a single `true` command.
pub fn rule(kind: TriggerKind, target: &str) -> Rule {
    rule_with_commands(kind, target, &["true"])
}

/// Sequential rule with explicit commands.
pub fn rule_with_commands(kind: TriggerKind, target: &str, commands: &[&str]) -> Rule {
    Rule {
        kind,
        target: target.to_string(),
        is_async: false,
        commands: commands.iter().map(|c| c.to_string()).collect(),
    }
}

/// Create `<tempdir>/<name>` so the working directory has a known base name.
pub fn named_dir(name: &str) -> Result<(TempDir, PathBuf)> {
    let temp = tempfile::tempdir().context("create tempdir")?;
    let dir = temp.path().join(name);
    std::fs::create_dir(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok((temp, dir))
}

/// Create `<tempdir>/<name>` as a git repository with `branch` checked out
/// and one empty commit, so `HEAD` resolves.
pub fn git_repo(name: &str, branch: &str) -> Result<(TempDir, PathBuf)> {
    let (temp, dir) = named_dir(name)?;
    git(&dir, &["init", "-q"])?;
    git(&dir, &["checkout", "-q", "-b", branch])?;
    git(
        &dir,
        &[
            "-c",
            "user.name=envcmd",
            "-c",
            "user.email=envcmd@example.com",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "-q",
            "--allow-empty",
            "-m",
            "init",
        ],
    )?;
    Ok((temp, dir))
}

fn git(dir: &Path, args: &[&str]) -> Result<()> {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !status.success() {
        return Err(anyhow!("git {} failed: {status}", args.join(" ")));
    }
    Ok(())
}
