//! Context-triggered command runner.
//!
//! Scans `EVC_*` environment variables and runs the commands of every rule
//! whose directory or branch trigger matches the current context.

use std::env;
use std::io::{self, IsTerminal};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use envcmd::core::matcher::ExecutionContext;
use envcmd::exit_codes;
use envcmd::io::console::Console;
use envcmd::io::context::{ContextPolicy, resolve_current_context};
use envcmd::logging;
use envcmd::scan::{DEFAULT_PREFIX, env_vars, list_rules, run_scan};

#[derive(Parser)]
#[command(
    name = "envcmd",
    version,
    about = "Run commands from EVC_* environment variables when the directory or git branch matches"
)]
struct Cli {
    /// Environment variable prefix marking a rule.
    #[arg(long, env = "ENVCMD_PREFIX", default_value = DEFAULT_PREFIX, global = true)]
    prefix: String,

    /// When to color command indices and markers.
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,

    /// Abort if the directory or git branch cannot be resolved, instead of
    /// treating rules of that kind as non-matching.
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every matching rule (default).
    Run {
        /// Do not print the version banner after the scan.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show how each candidate variable decodes and whether it matches, without running it.
    List {
        /// Print a JSON array instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorMode {
    /// Color when stdout is a terminal and `NO_COLOR` is unset.
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn enabled(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => io::stdout().is_terminal() && env::var_os("NO_COLOR").is_none(),
        }
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            error!("{err:#}");
            exit_codes::FATAL
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.prefix.is_empty() {
        bail!("--prefix must not be empty");
    }

    let policy = if cli.strict {
        ContextPolicy::Strict
    } else {
        ContextPolicy::Lenient
    };
    let context = resolve_current_context(policy).context("resolve execution context")?;
    let console = Console::stdout(cli.color.enabled());

    match cli.command.unwrap_or(Command::Run { quiet: false }) {
        Command::Run { quiet } => cmd_run(&cli.prefix, &context, &console, quiet),
        Command::List { json } => cmd_list(&cli.prefix, &context, &console, json),
    }
}

fn cmd_run(
    prefix: &str,
    context: &ExecutionContext,
    console: &Console,
    quiet: bool,
) -> Result<()> {
    let summary = run_scan(env_vars(prefix), prefix, context, console);
    info!(
        candidates = summary.candidates,
        invalid = summary.invalid,
        matched = summary.matched,
        commands_failed = summary.commands_failed,
        "scan complete"
    );
    if !quiet {
        console.plain("");
        console.plain(&format!("envcmd@{}", env!("CARGO_PKG_VERSION")));
    }
    Ok(())
}

fn cmd_list(
    prefix: &str,
    context: &ExecutionContext,
    console: &Console,
    json: bool,
) -> Result<()> {
    let listings = list_rules(env_vars(prefix), prefix, context);
    if json {
        let payload = serde_json::to_string_pretty(&listings).context("serialize listings")?;
        console.plain(&payload);
        return Ok(());
    }
    for listing in &listings {
        console.plain(&listing.to_string());
    }
    Ok(())
}
