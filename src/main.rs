//! procshell binary entry point.

use std::process::ExitCode;

use procshell::cli::{self, ArgsError};
use procshell::config::Config;
use procshell::execution::ResultReport;
use procshell::{logging, Command, ExecutionResult, OutputSinks, ShellError};
use tracing::{debug, error, info};

/// Exit code used when the command could not be started.
const SPAWN_FAILURE_EXIT: u8 = 127;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'procshell --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }
    if args.command.is_empty() {
        eprintln!("error: {}", ArgsError::MissingCommand);
        return ExitCode::from(2);
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::try_init_with(config.log_filter()).ok();
    debug!("procshell v{}", env!("CARGO_PKG_VERSION"));

    let command = Command::new(args.command.clone()).allow_error(args.allow_error);
    let sinks = if config.tee_output() {
        OutputSinks::new()
            .stdout(std::io::stdout())
            .stderr(std::io::stderr())
    } else {
        OutputSinks::new()
    };

    let shell = config.to_shell();
    match shell.run_async_with(command, sinks).await {
        Ok(result) => finish(&config, &result),
        Err(ShellError::CommandFailed(result)) => {
            error!(status = result.status(), "command failed");
            if !config.tee_output() {
                eprint!("{}", result.to_error());
            }
            finish(&config, &result)
        }
        Err(e) if e.is_spawn_error() => {
            eprintln!("error: {}", e);
            ExitCode::from(SPAWN_FAILURE_EXIT)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn finish(config: &Config, result: &ExecutionResult) -> ExitCode {
    if config.output.json {
        match serde_json::to_string_pretty(&ResultReport::from(result)) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    info!(status = result.status(), "command finished");
    exit_code(result.status())
}

/// Map a child status onto our own exit code; signals become 1.
fn exit_code(status: i32) -> ExitCode {
    u8::try_from(status).map(ExitCode::from).unwrap_or(ExitCode::FAILURE)
}
