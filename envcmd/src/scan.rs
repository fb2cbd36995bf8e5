//! Environment scanning: filter prefixed variables, decode, match, execute.
//!
//! Variables are processed one at a time in the order given; a rule runs to
//! completion (including all of its async commands) before the next variable
//! is considered.

use std::borrow::Cow;
use std::env;
use std::ffi::OsString;
use std::fmt;

use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use crate::core::matcher::{ExecutionContext, can_run};
use crate::core::rule::Rule;
use crate::io::console::Console;
use crate::io::process::Completion;
use crate::schedule::run_rule;

/// Variable name prefix marking a candidate rule.
pub const DEFAULT_PREFIX: &str = "EVC_";

/// Counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Variables carrying the prefix.
    pub candidates: usize,
    /// Candidates rejected by the decoder.
    pub invalid: usize,
    /// Rules whose trigger matched and were executed.
    pub matched: usize,
    pub commands_run: usize,
    pub commands_failed: usize,
}

/// Outcome of decoding and matching one candidate, without executing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub variable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(rule) = &self.rule else {
            let err = self.error.as_deref().unwrap_or("undecodable");
            return write!(f, "{}: error: {}", self.variable, err);
        };
        let mode = if rule.is_async { "async" } else { "sequential" };
        let state = if self.matched { "matches" } else { "no match" };
        write!(
            f,
            "{}: {} {:?} ({mode}, {state})",
            self.variable, rule.kind, rule.target
        )?;
        for (index, command) in rule.commands.iter().enumerate() {
            write!(f, "\n  [{index}] {command:?}")?;
        }
        Ok(())
    }
}

/// Prefixed variables of the process environment, in environment order.
pub fn env_vars(prefix: &str) -> Vec<(String, String)> {
    candidate_vars(env::vars_os(), prefix)
}

/// Keep variables whose name starts with `prefix`, decoding both name and
/// value lossily. Non UTF-8 candidates are kept and logged at `warn`.
fn candidate_vars<I>(vars: I, prefix: &str) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            let name = key.to_string_lossy();
            if !name.starts_with(prefix) {
                return None;
            }
            let value_text = value.to_string_lossy();
            if matches!(name, Cow::Owned(_)) || matches!(value_text, Cow::Owned(_)) {
                warn!(variable = %name, "variable is not valid UTF-8, decoding lossily");
            }
            Some((name.into_owned(), value_text.into_owned()))
        })
        .collect()
}

/// Decode and match every candidate in `vars`, executing matching rules.
#[instrument(skip_all, fields(prefix = %prefix))]
pub fn run_scan<I>(
    vars: I,
    prefix: &str,
    context: &ExecutionContext,
    console: &Console,
) -> ScanSummary
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut summary = ScanSummary::default();
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(prefix) else {
            continue;
        };
        summary.candidates += 1;

        let rule = match Rule::decode(stripped, &value) {
            Ok(rule) => rule,
            Err(err) => {
                error!(variable = %key, "{err}");
                summary.invalid += 1;
                continue;
            }
        };

        if !can_run(&rule, context) {
            debug!(
                variable = %key,
                kind = ?rule.kind,
                target = %rule.target,
                "rule does not match"
            );
            continue;
        }

        summary.matched += 1;
        let completions = run_rule(&rule, console);
        summary.commands_run += completions.len();
        summary.commands_failed += completions
            .iter()
            .filter(|c| **c == Completion::Failed)
            .count();
    }

    debug!(?summary, "scan finished");
    summary
}

/// Decode and match every candidate in `vars` without running anything.
pub fn list_rules<I>(vars: I, prefix: &str, context: &ExecutionContext) -> Vec<Listing>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            let stripped = key.strip_prefix(prefix)?;
            let listing = match Rule::decode(stripped, &value) {
                Ok(rule) => Listing {
                    matched: can_run(&rule, context),
                    rule: Some(rule),
                    variable: key,
                    error: None,
                },
                Err(err) => Listing {
                    error: Some(err.to_string()),
                    variable: key,
                    rule: None,
                    matched: false,
                },
            };
            Some(listing)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rule::TriggerKind;
    use crate::test_support::SharedBuffer;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(Some("myapp".to_string()), Some("main".to_string()))
    }

    fn scan(pairs: &[(&str, &str)]) -> (ScanSummary, String) {
        let buffer = SharedBuffer::default();
        let console = Console::new(buffer.clone(), false);
        let summary = run_scan(vars(pairs), DEFAULT_PREFIX, &context(), &console);
        (summary, buffer.contents())
    }

    #[test]
    fn matching_directory_rule_runs() {
        let (summary, out) = scan(&[("EVC_DIR_myapp", "echo hi"), ("EVC_DIR_other", "echo no")]);
        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.matched, 1);
        assert!(out.contains("[0] hi\n"), "{out}");
        assert!(!out.contains("no"), "{out}");
    }

    #[test]
    fn unprefixed_variables_are_ignored() {
        let (summary, out) = scan(&[
            ("PATH", "/bin"),
            ("XEVC_DIR_myapp", "echo x"),
            ("evc_DIR_myapp", "echo y"),
        ]);
        assert_eq!(summary, ScanSummary::default());
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_rules_do_not_stop_the_scan() {
        let (summary, out) = scan(&[
            ("EVC_FOO_myapp", "echo bad"),
            ("EVC_DIR_", "echo empty"),
            ("EVC_BRA_MAIN", "echo branch"),
        ]);
        assert_eq!(summary.candidates, 3);
        assert_eq!(summary.invalid, 2);
        assert_eq!(summary.matched, 1);
        assert!(out.contains("[0] branch\n"));
    }

    #[test]
    fn failed_commands_are_counted_and_scan_continues() {
        let (summary, out) = scan(&[
            ("EVC_DIR_myapp", "exit 2,echo sibling"),
            ("EVC_ASYNC_BRA_main", "echo later"),
        ]);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.commands_run, 3);
        assert_eq!(summary.commands_failed, 1);
        assert!(out.contains("[1] sibling\n"));
        assert!(out.contains("[0] later\n"));
    }

    #[test]
    fn rules_run_in_variable_order() {
        let (_, out) = scan(&[("EVC_DIR_myapp", "echo first"), ("EVC_BRA_main", "echo second")]);
        let first = out.find("first\n").expect("first");
        let second = out.find("second\n").expect("second");
        assert!(first < second);
    }

    #[test]
    fn candidates_keep_prefixed_non_utf8_values() {
        use std::os::unix::ffi::OsStringExt;

        let os_vars = vec![
            (OsString::from("HOME"), OsString::from("/root")),
            (
                OsString::from("EVC_DIR_myapp"),
                OsString::from_vec(b"echo caf\xe9".to_vec()),
            ),
            (OsString::from("EVC_BRA_main"), OsString::from("echo ok")),
        ];
        let candidates = candidate_vars(os_vars, DEFAULT_PREFIX);
        assert_eq!(
            candidates,
            vec![
                ("EVC_DIR_myapp".to_string(), "echo caf\u{fffd}".to_string()),
                ("EVC_BRA_main".to_string(), "echo ok".to_string()),
            ]
        );
    }

    #[test]
    fn custom_prefix() {
        let buffer = SharedBuffer::default();
        let console = Console::new(buffer.clone(), false);
        let summary = run_scan(
            vars(&[("EC_DIR_myapp", "echo custom")]),
            "EC_",
            &context(),
            &console,
        );
        assert_eq!(summary.matched, 1);
        assert!(buffer.contents().contains("[0] custom\n"));
    }

    #[test]
    fn list_reports_rules_and_errors_without_running() {
        let listings = list_rules(
            vars(&[
                ("EVC_ASYNC_DIR_MyApp", "touch should-not-exist,b"),
                ("EVC_BRA_dev", "x"),
                ("EVC_NOPE", "x"),
                ("HOME", "/root"),
            ]),
            DEFAULT_PREFIX,
            &context(),
        );
        assert_eq!(listings.len(), 3);

        let first = listings[0].rule.as_ref().expect("rule");
        assert_eq!(first.kind, TriggerKind::Directory);
        assert!(first.is_async);
        assert_eq!(first.commands.len(), 2);
        assert!(listings[0].matched);

        assert!(!listings[1].matched);
        assert!(listings[2].rule.is_none());
        assert!(listings[2].error.as_deref().is_some_and(|e| e.contains("invalid kind")));
    }

    #[test]
    fn listing_display() {
        let listings = list_rules(
            vars(&[("EVC_ASYNC_BRA_main", "a, b"), ("EVC_DIR_", "x")]),
            DEFAULT_PREFIX,
            &context(),
        );
        assert_eq!(
            listings[0].to_string(),
            "EVC_ASYNC_BRA_main: branch \"main\" (async, matches)\n  [0] \"a\"\n  [1] \" b\""
        );
        assert_eq!(
            listings[1].to_string(),
            "EVC_DIR_: error: invalid target for 'DIR_' (target must not be empty)"
        );
    }

    #[test]
    fn listing_serializes_to_json() {
        let listings = list_rules(vars(&[("EVC_DIR_myapp", "a,b")]), DEFAULT_PREFIX, &context());
        let json = serde_json::to_value(&listings).expect("json");
        assert_eq!(
            json,
            serde_json::json!([{
                "variable": "EVC_DIR_myapp",
                "rule": {
                    "kind": "directory",
                    "target": "myapp",
                    "is_async": false,
                    "commands": ["a", "b"]
                },
                "matched": true
            }])
        );
    }
}
