//! Command-line interface for procshell.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Program and arguments to run.
    pub command: Vec<String>,
    /// Working directory for the command.
    pub working_dir: Option<PathBuf>,
    /// Environment overrides, in the order given.
    pub env: Vec<(String, String)>,
    /// Exit with the child's status instead of reporting a failure.
    pub allow_error: bool,
    /// Start the child in a new process group.
    pub new_process_group: bool,
    /// Do not forward output live.
    pub quiet: bool,
    /// Print a JSON report instead of forwarding output.
    pub json: bool,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
///
/// The first positional argument starts the command; it and everything
/// after it are passed through untouched.
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('C') | Long("cwd") => {
                result.working_dir = Some(parser.value()?.parse()?);
            }
            Short('e') | Long("env") => {
                let value: String = parser.value()?.parse()?;
                result.env.push(parse_env(&value)?);
            }
            Long("allow-error") => {
                result.allow_error = true;
            }
            Long("new-process-group") => {
                result.new_process_group = true;
            }
            Short('q') | Long("quiet") => {
                result.quiet = true;
            }
            Long("json") => {
                result.json = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                result.command.push(val.string()?);
                for rest in parser.raw_args()? {
                    let rest = rest.into_string().map_err(|v| {
                        ArgsError::InvalidValue("command", v.to_string_lossy().into_owned())
                    })?;
                    result.command.push(rest);
                }
                break;
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

fn parse_env(value: &str) -> Result<(String, String), ArgsError> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(ArgsError::InvalidValue("env", value.to_string())),
    }
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"procshell {version}
Run a command, capture its output and report its exit status

USAGE:
    procshell [OPTIONS] [--] <COMMAND> [ARGS...]

OPTIONS:
    -C, --cwd <DIR>         Working directory for the command
    -e, --env <KEY=VALUE>   Set an environment variable (repeatable)
        --allow-error       Do not treat a non-zero exit status as an error
        --new-process-group Run the command in its own process group
    -q, --quiet             Do not forward output while the command runs
        --json              Print a JSON report of the result
    -c, --config <FILE>     Path to configuration file (JSON)
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    PROCSHELL_CWD                Default working directory (overrides config)
    PROCSHELL_NEW_PROCESS_GROUP  Default for --new-process-group (true/false)
    PROCSHELL_LOG_LEVEL          Log level (overrides config)
    RUST_LOG                     Alternative log level setting

EXAMPLES:
    # Run a command, streaming its output
    procshell echo hello

    # Capture a failing command as JSON
    procshell --json --allow-error -- sh -c 'echo out; exit 3'

    # Run in another directory with an extra variable
    procshell -C /tmp -e MODE=test -- make check
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("procshell {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// No command was given.
    MissingCommand,
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::MissingCommand => write!(f, "no command given"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
