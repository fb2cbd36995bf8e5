//! Console output multiplexer shared by concurrently running commands.
//!
//! Every line is written with a single `write_all` while holding the sink
//! lock, so output from two commands never interleaves within a line.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Rotating index colors: bright blue, bright magenta, bright cyan.
pub const PALETTE: [&str; 3] = ["\x1b[1;94m", "\x1b[1;95m", "\x1b[1;96m"];
const MUTED: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Line-atomic writer that prefixes output with a colored command index.
pub struct Console {
    sink: Mutex<Box<dyn Write + Send>>,
    colored: bool,
}

impl Console {
    pub fn new(sink: impl Write + Send + 'static, colored: bool) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
            colored,
        }
    }

    pub fn stdout(colored: bool) -> Self {
        Self::new(io::stdout(), colored)
    }

    /// Prefix for `index`. Indices equal modulo the palette size share a color.
    pub fn prefix(&self, index: usize) -> String {
        if self.colored {
            let color = PALETTE[index % PALETTE.len()];
            format!("[{color}{index}{RESET}] ")
        } else {
            format!("[{index}] ")
        }
    }

    /// Emit one output line attributed to command `index`.
    pub fn line(&self, index: usize, text: &str) {
        let line = format!("{}{}\n", self.prefix(index), text);
        self.write_line(&line);
    }

    /// Muted marker emitted before a command starts.
    pub fn started(&self, command: &str) {
        self.marker('+', command);
    }

    /// Muted marker emitted after a command's process has exited.
    pub fn finished(&self, command: &str) {
        self.marker('-', command);
    }

    /// Unprefixed line, used for the banner and listings.
    pub fn plain(&self, text: &str) {
        self.write_line(&format!("{text}\n"));
    }

    fn marker(&self, sign: char, command: &str) {
        let line = if self.colored {
            format!("{MUTED}{sign} {command}{RESET}\n")
        } else {
            format!("{sign} {command}\n")
        };
        self.write_line(&line);
    }

    fn write_line(&self, line: &str) {
        let mut sink = self.lock();
        if let Err(err) = sink.write_all(line.as_bytes()).and_then(|()| sink.flush()) {
            warn!(err = %err, "failed to write console output");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
