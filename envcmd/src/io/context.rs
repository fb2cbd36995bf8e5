//! Resolution of the execution context (directory name and git branch).
//!
//! Failure policy: by default an attribute that cannot be resolved is logged
//! once and left unresolved, so rules of that kind never match. In strict mode
//! the first failure aborts the run before any rule is processed.

use std::env;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use crate::core::matcher::ExecutionContext;
use crate::io::git::Git;

/// What to do when the directory or branch cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPolicy {
    /// Log a warning and treat the attribute as never matching.
    Lenient,
    /// Abort with an error.
    Strict,
}

/// Resolve the context for the process working directory.
pub fn resolve_current_context(policy: ContextPolicy) -> Result<ExecutionContext> {
    let workdir = settle(
        env::current_dir().context("reading directory"),
        policy,
        "directory",
    )?;
    match workdir {
        Some(workdir) => resolve_context(&workdir, policy),
        None => Ok(ExecutionContext::default()),
    }
}

/// Resolve the context for `workdir`.
pub fn resolve_context(workdir: &Path, policy: ContextPolicy) -> Result<ExecutionContext> {
    let directory = settle(
        directory_name(workdir).context("reading directory"),
        policy,
        "directory",
    )?;
    let branch = settle(
        Git::new(workdir)
            .current_branch()
            .context("reading branch (may not be within a repository)"),
        policy,
        "branch",
    )?;

    debug!(?directory, ?branch, "execution context resolved");
    Ok(ExecutionContext::new(directory, branch))
}

/// Base name of `path`.
pub fn directory_name(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("{} has no base name", path.display()))?;
    Ok(name.to_string_lossy().into_owned())
}

fn settle<T>(result: Result<T>, policy: ContextPolicy, attribute: &str) -> Result<Option<T>> {
    match (result, policy) {
        (Ok(value), _) => Ok(Some(value)),
        (Err(err), ContextPolicy::Strict) => Err(err),
        (Err(err), ContextPolicy::Lenient) => {
            warn!(attribute, "{err:#}; rules on this attribute will not match");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{git_repo, named_dir};

    #[test]
    fn directory_name_is_base_name() {
        assert_eq!(directory_name(Path::new("/home/me/myapp")).expect("name"), "myapp");
        assert_eq!(directory_name(Path::new("relative/dir")).expect("name"), "dir");
    }

    #[test]
    fn root_has_no_directory_name() {
        assert!(directory_name(Path::new("/")).is_err());
    }

    #[test]
    fn resolves_directory_and_branch_in_repository() {
        let (_temp, repo) = git_repo("myapp", "develop").expect("repo");
        let ctx = resolve_context(&repo, ContextPolicy::Strict).expect("context");
        assert_eq!(ctx.directory.as_deref(), Some("myapp"));
        assert_eq!(ctx.branch.as_deref(), Some("develop"));
    }

    #[test]
    fn lenient_leaves_branch_unresolved_outside_repository() {
        let (_temp, dir) = named_dir("myapp").expect("dir");
        let ctx = resolve_context(&dir, ContextPolicy::Lenient).expect("context");
        assert_eq!(ctx.directory.as_deref(), Some("myapp"));
        assert_eq!(ctx.branch, None);
    }

    #[test]
    fn strict_aborts_outside_repository() {
        let (_temp, dir) = named_dir("myapp").expect("dir");
        let err = resolve_context(&dir, ContextPolicy::Strict).expect_err("strict");
        assert!(format!("{err:#}").contains("reading branch"), "{err:#}");
    }
}
