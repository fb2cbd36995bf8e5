//! Running one shell command with stdout and stderr merged into a single stream.
//!
//! Both child streams are attached to the write end of one pipe, so lines
//! arrive in the order the child wrote them. Some tools (docker compose, for
//! one) log informational output to stderr, which must not be dropped.
//! Children read stdin from the null device; concurrent commands would
//! otherwise compete for the terminal.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::io::console::Console;

/// POSIX shell used to interpret command strings.
pub const SHELL: &str = "sh";

/// Final state of one command slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    Failed,
}

/// Per-command failures. None of them are fatal to the scan.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("connecting to '{command}' output: {source}")]
    Pipe { command: String, source: io::Error },
    #[error("unable to start '{command}': {source}")]
    Spawn { command: String, source: io::Error },
    #[error("reading from '{command}': {source}")]
    Read { command: String, source: io::Error },
    #[error("awaiting completion for '{command}': {source}")]
    Wait { command: String, source: io::Error },
    #[error("'{command}' exited with {status}")]
    Exit { command: String, status: ExitStatus },
}

/// Run `command` through the shell, streaming each output line to `console`
/// tagged with `index`.
///
/// Never fails: errors are logged and reported as [`Completion::Failed`].
pub fn execute(index: usize, command: &str, console: &Console) -> Completion {
    execute_with(SHELL, index, command, console)
}

#[instrument(skip_all, fields(index = index, command = %command))]
fn execute_with(shell: &str, index: usize, command: &str, console: &Console) -> Completion {
    console.started(command);
    match run_streaming(shell, index, command, console) {
        Ok(completion) => {
            debug!(?completion, "command finished");
            completion
        }
        Err(err) => {
            error!("{err}");
            Completion::Failed
        }
    }
}

fn run_streaming(
    shell: &str,
    index: usize,
    command: &str,
    console: &Console,
) -> Result<Completion, ExecError> {
    let pipe_err = |source: io::Error| ExecError::Pipe {
        command: command.to_string(),
        source,
    };
    let (reader, writer) = io::pipe().map_err(pipe_err)?;
    let stderr_writer = writer.try_clone().map_err(pipe_err)?;

    debug!(shell, "spawning child process");
    let mut child = {
        let mut cmd = Command::new(shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer);
        // `cmd` owns the parent's copies of the write end; they must be closed
        // before reading or the reader never sees EOF.
        cmd.spawn().map_err(|source| ExecError::Spawn {
            command: command.to_string(),
            source,
        })?
    };

    let mut completion = Completion::Succeeded;
    if let Err(source) = drain_lines(reader, |line| console.line(index, line)) {
        let err = ExecError::Read {
            command: command.to_string(),
            source,
        };
        error!("{err}");
        completion = Completion::Failed;
    }

    let waited = child.wait();
    console.finished(command);
    let status = waited.map_err(|source| ExecError::Wait {
        command: command.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(ExecError::Exit {
            command: command.to_string(),
            status,
        });
    }
    Ok(completion)
}

/// Read `reader` to EOF, calling `emit` once per line without its `\n`.
///
/// A trailing segment without a newline is emitted as a line. Invalid UTF-8 is
/// replaced lossily. `Interrupted` reads are retried by `read_until`; any other
/// error ends the drain, since a failed pipe read cannot be resumed.
fn drain_lines<R: Read>(reader: R, mut emit: impl FnMut(&str)) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(());
        }
        let line = buf.strip_suffix(b"\n").unwrap_or(&buf);
        emit(&String::from_utf8_lossy(line));
    }
}
