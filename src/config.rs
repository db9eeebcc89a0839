//! Configuration management for procshell.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::shell::LocalShell;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Process spawning defaults.
    pub shell: ShellSection,
    /// Output handling.
    pub output: OutputSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Defaults applied to every spawned command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSection {
    /// Working directory for commands that do not set one.
    pub cwd: Option<PathBuf>,
    /// Environment overrides merged over the inherited environment.
    pub env: HashMap<String, String>,
    /// Start children in their own process group.
    pub new_process_group: bool,
}

/// Output handling section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Forward child output to the terminal while it runs.
    pub tee: bool,
    /// Print a JSON report of the result.
    pub json: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            tee: true,
            json: false,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup (for testing).
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cwd) = lookup("PROCSHELL_CWD").filter(|v| !v.is_empty()) {
            self.shell.cwd = Some(PathBuf::from(cwd));
        }

        if let Some(value) = lookup("PROCSHELL_NEW_PROCESS_GROUP") {
            self.shell.new_process_group = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv(
                        "PROCSHELL_NEW_PROCESS_GROUP",
                        value,
                    ))
                }
            };
        }

        if let Some(level) = lookup("PROCSHELL_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref dir) = args.working_dir {
            self.shell.cwd = Some(dir.clone());
        }

        for (key, value) in &args.env {
            self.shell.env.insert(key.clone(), value.clone());
        }

        if args.new_process_group {
            self.shell.new_process_group = true;
        }

        if args.quiet {
            self.output.tee = false;
        }

        if args.json {
            self.output.json = true;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Config::default();

        // Load from config file if specified
        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        // Apply environment variable overrides
        config.apply_env()?;

        // Apply CLI argument overrides (highest priority)
        config.apply_args(args);

        Ok(config)
    }

    /// Build a local shell carrying these defaults.
    pub fn to_shell(&self) -> LocalShell {
        let mut shell = LocalShell::new()
            .with_env(self.shell.env.clone())
            .with_new_process_group(self.shell.new_process_group);
        if let Some(ref cwd) = self.shell.cwd {
            shell = shell.with_working_dir(cwd);
        }
        shell
    }

    /// Whether output should be forwarded live.
    pub fn tee_output(&self) -> bool {
        self.output.tee && !self.output.json
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Environment variable with an unusable value.
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidEnv(name, value) => write!(f, "invalid value for {}: '{}'", name, value),
        }
    }
}

impl std::error::Error for ConfigError {}
