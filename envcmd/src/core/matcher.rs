//! Trigger matching against the resolved execution context.

use crate::core::rule::{Rule, TriggerKind};

/// Read-only snapshot of the context rules are matched against.
///
/// Resolved once at startup. An attribute that could not be resolved is
/// `None` and never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub directory: Option<String>,
    pub branch: Option<String>,
}

impl ExecutionContext {
    pub fn new(directory: Option<String>, branch: Option<String>) -> Self {
        Self { directory, branch }
    }

    fn value_for(&self, kind: TriggerKind) -> Option<&str> {
        match kind {
            TriggerKind::Directory => self.directory.as_deref(),
            TriggerKind::Branch => self.branch.as_deref(),
        }
    }
}

/// True if the context value for the rule's kind equals its target, ignoring case.
pub fn can_run(rule: &Rule, context: &ExecutionContext) -> bool {
    context
        .value_for(rule.kind)
        .is_some_and(|value| eq_ignore_case(value, &rule.target))
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}
