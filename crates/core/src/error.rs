//! Error handling with codes, context and recovery suggestions
//!
//! Every failure surfaced to the operator carries:
//! - A stable error code for scripting against
//! - A human-readable message
//! - Optional context and a recovery suggestion

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General errors (1xxx)
    Unknown = 1000,
    Internal = 1001,
    NotImplemented = 1002,

    // IO errors (2xxx)
    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,
    InvalidPath = 2003,

    // Project configuration errors (3xxx)
    ConfigError = 3000,
    NotAProject = 3001,
    ConfigParseError = 3002,
    InvalidConfigValue = 3003,

    // Environment errors (4xxx)
    EnvError = 4000,
    CondaNotFound = 4001,
    EnvNotActive = 4002,

    // Process errors (5xxx)
    ProcessError = 5000,
    CommandNotFound = 5001,
    CommandFailed = 5002,

    // Linker errors (6xxx)
    LinkError = 6000,
    PatternNotFound = 6001,
    NoPackagesFound = 6002,

    // Platform build errors (7xxx)
    PlatformError = 7000,
    GradleError = 7001,
    XcodeError = 7002,
    NdkError = 7003,

    // Dev server errors (8xxx)
    ServerError = 8000,
    WatcherError = 8001,
    BindError = 8002,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            1 => "General",
            2 => "IO",
            3 => "Configuration",
            4 => "Environment",
            5 => "Process",
            6 => "Linker",
            7 => "Platform",
            8 => "Server",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Main error type with rich context
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context
    pub context: Option<String>,
    /// Recovery suggestion
    pub suggestion: Option<String>,
    /// Source error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {}", ctx)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IoError, message)
    }

    pub fn file_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::FileNotFound,
            format!("File not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Check that the file exists and you have read permissions")
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn not_a_project(dir: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::NotAProject,
            format!("{} is not a pynative project root", dir.as_ref().display()),
        )
        .with_suggestion(
            "Run this command from a directory containing an environment.yml \
             with an android or ios section, or create one with `pynative create app`",
        )
    }

    pub fn env(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EnvError, message)
    }

    pub fn env_not_active(command: &str) -> Self {
        Self::new(
            ErrorCode::EnvNotActive,
            format!("`pynative {}` must be run inside an app environment", command),
        )
        .with_suggestion("Activate it with `conda activate <app-name>` and retry")
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProcessError, message)
    }

    pub fn command_not_found(cmd: &str) -> Self {
        Self::new(
            ErrorCode::CommandNotFound,
            format!("Command not found: {}", cmd),
        )
        .with_suggestion(format!("Install {} and ensure it's in your PATH", cmd))
    }

    pub fn link(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::LinkError, message)
    }

    pub fn platform(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PlatformError, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerError, message)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const ENV_ERROR: i32 = 4;
    pub const LINK_ERROR: i32 = 5;
    pub const COMMAND_NOT_FOUND: i32 = 127;
}

// Implement From for common error types

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(
            ErrorCode::ConfigParseError,
            format!("JSON parse error: {}", err),
        )
        .with_source(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::new(
            ErrorCode::ConfigParseError,
            format!("YAML parse error: {}", err),
        )
        .with_source(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::new(ErrorCode::Internal, format!("Regex error: {}", err)).with_source(err)
    }
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::new(
            ErrorCode::InvalidConfigValue,
            format!("Invalid glob pattern: {}", err),
        )
        .with_source(err)
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::FileNotFound.to_string(), "E2001");
        assert_eq!(ErrorCode::EnvNotActive.to_string(), "E4002");
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::IoError.category(), "IO");
        assert_eq!(ErrorCode::GradleError.category(), "Platform");
        assert_eq!(ErrorCode::WatcherError.category(), "Server");
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::file_not_found("/path/to/file").with_context("While loading project");

        assert_eq!(err.code, ErrorCode::FileNotFound);
        assert!(err.context.is_some());
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn test_not_a_project_mentions_environment_file() {
        let err = Error::not_a_project("/tmp/elsewhere");
        assert!(err.suggestion.as_deref().unwrap().contains("environment.yml"));
    }

    #[test]
    fn test_io_error_conversion_maps_kind() {
        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = not_found.into();
        assert_eq!(err.code, ErrorCode::FileNotFound);
    }
}
