//! Rule decoding from environment variable key/value pairs.
//!
//! Key grammar (after the tool prefix is stripped):
//!
//! ```text
//! [ASYNC_]<DIR|BRA>_<TARGET>
//! ```
//!
//! The value is a comma-separated list of shell commands. Neither the target
//! nor the commands are trimmed.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

const ASYNC_TOKEN: &str = "ASYNC_";
const DIR_TOKEN: &str = "DIR_";
const BRA_TOKEN: &str = "BRA_";
const COMMAND_DELIM: char = ',';

/// Which context attribute a rule is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Base name of the current working directory.
    Directory,
    /// Current git branch.
    Branch,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => f.write_str("directory"),
            Self::Branch => f.write_str("branch"),
        }
    }
}

/// A decoded directive: when to fire and what to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub kind: TriggerKind,
    /// Compared case-insensitively; preserved verbatim (never trimmed).
    pub target: String,
    /// Run all commands concurrently and join, instead of one at a time.
    pub is_async: bool,
    /// Raw shell commands in list order. Always at least one element.
    pub commands: Vec<String>,
}

/// Reasons a key cannot be decoded into a [`Rule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid kind for '{key}' (expected [ASYNC_]DIR_ or [ASYNC_]BRA_)")]
    InvalidKind { key: String },
    #[error("invalid target for '{key}' (target must not be empty)")]
    InvalidTarget { key: String },
}

impl Rule {
    /// Decode a prefix-stripped key and its raw value.
    pub fn decode(key: &str, value: &str) -> Result<Self, DecodeError> {
        let mut tokens = KeyTokens::new(key);

        let is_async = tokens.eat(ASYNC_TOKEN);
        let kind = if tokens.eat(DIR_TOKEN) {
            TriggerKind::Directory
        } else if tokens.eat(BRA_TOKEN) {
            TriggerKind::Branch
        } else {
            return Err(DecodeError::InvalidKind {
                key: key.to_string(),
            });
        };

        let target = tokens.rest();
        if target.is_empty() {
            return Err(DecodeError::InvalidTarget {
                key: key.to_string(),
            });
        }

        Ok(Self {
            kind,
            target: target.to_string(),
            is_async,
            commands: split_commands(value),
        })
    }
}

/// Split a raw value into commands on `,` only. Empty segments are kept.
pub fn split_commands(value: &str) -> Vec<String> {
    value.split(COMMAND_DELIM).map(str::to_string).collect()
}

/// Forward-only cursor over a key, consuming literal tokens.
struct KeyTokens<'a> {
    rest: &'a str,
}

impl<'a> KeyTokens<'a> {
    fn new(key: &'a str) -> Self {
        Self { rest: key }
    }

    /// Consume `token` if the remaining input starts with it.
    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn rest(&self) -> &'a str {
        self.rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_directory_rule() {
        let rule = Rule::decode("DIR_myapp", "echo hi").expect("decode");
        assert_eq!(rule.kind, TriggerKind::Directory);
        assert_eq!(rule.target, "myapp");
        assert!(!rule.is_async);
        assert_eq!(rule.commands, vec!["echo hi"]);
    }

    #[test]
    fn decodes_async_branch_rule() {
        let rule = Rule::decode("ASYNC_BRA_main", "a,b").expect("decode");
        assert_eq!(rule.kind, TriggerKind::Branch);
        assert_eq!(rule.target, "main");
        assert!(rule.is_async);
        assert_eq!(rule.commands, vec!["a", "b"]);
    }

    #[test]
    fn target_keeps_case_underscores_and_whitespace() {
        let rule = Rule::decode("BRA_ Feature_Login ", "x").expect("decode");
        assert_eq!(rule.target, " Feature_Login ");

        let rule = Rule::decode("DIR_DIR_", "x").expect("decode");
        assert_eq!(rule.kind, TriggerKind::Directory);
        assert_eq!(rule.target, "DIR_");
    }

    #[test]
    fn async_token_only_consumed_once() {
        let rule = Rule::decode("ASYNC_DIR_ASYNC_x", "x").expect("decode");
        assert!(rule.is_async);
        assert_eq!(rule.target, "ASYNC_x");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        for key in ["FOO_bar", "dir_lower", "DIR", "ASYNC_", "ASYNC_FOO_x", "ASYN_DIR_x", ""] {
            let err = Rule::decode(key, "echo").expect_err(key);
            assert_eq!(
                err,
                DecodeError::InvalidKind {
                    key: key.to_string()
                }
            );
        }
    }

    #[test]
    fn empty_target_is_rejected() {
        for key in ["DIR_", "BRA_", "ASYNC_DIR_", "ASYNC_BRA_"] {
            let err = Rule::decode(key, "echo").expect_err(key);
            assert!(matches!(err, DecodeError::InvalidTarget { .. }), "{key}");
        }
    }

    #[test]
    fn split_keeps_empty_segments_and_whitespace() {
        assert_eq!(split_commands("a,b,,c"), vec!["a", "b", "", "c"]);
        assert_eq!(split_commands(""), vec![""]);
        assert_eq!(split_commands(" echo a , echo b"), vec![" echo a ", " echo b"]);
        assert_eq!(split_commands("a,"), vec!["a", ""]);
    }

    #[test]
    fn error_message_names_key() {
        let err = Rule::decode("NOPE_x", "").expect_err("invalid");
        assert!(err.to_string().contains("'NOPE_x'"));
    }
}
