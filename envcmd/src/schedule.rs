//! Executes a matched rule's command list, sequentially or fanned out.

use std::thread;

use tracing::{error, info, instrument, warn};

use crate::core::rule::Rule;
use crate::io::console::Console;
use crate::io::process::{Completion, execute};

/// Run every command of `rule` and return their completions in list order.
///
/// Async rules spawn one scoped thread per command and join all of them
/// before returning; a failing command never cancels its siblings.
#[instrument(
    skip_all,
    fields(target = %rule.target, is_async = rule.is_async, commands = rule.commands.len())
)]
pub fn run_rule(rule: &Rule, console: &Console) -> Vec<Completion> {
    info!("[+] {}", rule.target);
    let completions = if rule.is_async {
        run_concurrent(&rule.commands, console)
    } else {
        run_sequential(&rule.commands, console)
    };

    let failed = completions
        .iter()
        .filter(|c| **c == Completion::Failed)
        .count();
    if failed > 0 {
        warn!(failed, "rule finished with failed commands");
    }
    info!("[-] {}", rule.target);
    completions
}

fn run_sequential(commands: &[String], console: &Console) -> Vec<Completion> {
    commands
        .iter()
        .enumerate()
        .map(|(index, command)| execute(index, command, console))
        .collect()
}

fn run_concurrent(commands: &[String], console: &Console) -> Vec<Completion> {
    run_concurrent_with(commands, console, |index| {
        thread::Builder::new().name(format!("envcmd-cmd-{index}"))
    })
}

/// Fan out one thread per command, built by `builder`.
///
/// A thread that cannot be created marks its slot failed; the remaining
/// commands still run and are joined.
fn run_concurrent_with(
    commands: &[String],
    console: &Console,
    builder: impl Fn(usize) -> thread::Builder,
) -> Vec<Completion> {
    thread::scope(|scope| {
        let handles: Vec<_> = commands
            .iter()
            .enumerate()
            .map(|(index, command)| {
                let spawned =
                    builder(index).spawn_scoped(scope, move || execute(index, command, console));
                if let Err(err) = &spawned {
                    error!(index, err = %err, "unable to start thread for '{command}'");
                }
                spawned.ok()
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.map(|h| h.join()) {
                Some(Ok(completion)) => completion,
                Some(Err(_)) => {
                    warn!("command thread panicked");
                    Completion::Failed
                }
                None => Completion::Failed,
            })
            .collect()
    })
}
