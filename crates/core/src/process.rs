//! Process execution utilities
//!
//! Unified interface for shelling out to the external build tools
//! (conda, gradle, adb, xcodebuild, ndk-build):
//! - Captured output for short queries
//! - Streamed output for long builds
//! - Directory and environment context
//! - Piped producer/consumer pairs

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Result of a captured command execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Exit code of the command
    pub exit_code: i32,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandResult {
    /// Create from std::process::Output
    pub fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Get combined output (stdout + stderr)
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Options shared by the exec helpers below
#[derive(Debug, Default, Clone)]
pub struct ExecOptions {
    /// Working directory for the child process
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl ExecOptions {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(dir.into()),
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

fn build_command(program: &str, args: &[&str], opts: &ExecOptions) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = &opts.cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in &opts.env {
        cmd.env(key, value);
    }
    cmd
}

/// Run a command and capture output
pub fn run_command(program: &str, args: &[&str]) -> Result<CommandResult> {
    run_command_with(program, args, &ExecOptions::default())
}

/// Run a command in a specific directory and capture output
pub fn run_command_in_dir(program: &str, args: &[&str], dir: &Path) -> Result<CommandResult> {
    run_command_with(program, args, &ExecOptions::in_dir(dir))
}

/// Run a command with full options and capture output
pub fn run_command_with(program: &str, args: &[&str], opts: &ExecOptions) -> Result<CommandResult> {
    let output = build_command(program, args, opts)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::process(format!("Failed to execute {}: {}", program, e)))?;

    Ok(CommandResult::from_output(output))
}

/// Run a command with output streamed to the terminal (for long builds)
pub fn run_streaming(program: &str, args: &[&str], opts: &ExecOptions) -> Result<i32> {
    tracing::debug!(program, ?args, "running");
    let status = build_command(program, args, opts)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| Error::process(format!("Failed to execute {}: {}", program, e)))?;

    Ok(status.code().unwrap_or(-1))
}

/// Run a command streaming output, turning a non-zero exit into an error
pub fn run_streaming_checked(program: &str, args: &[&str], opts: &ExecOptions) -> Result<()> {
    let code = run_streaming(program, args, opts)?;
    if code != 0 {
        return Err(Error::new(
            crate::error::ErrorCode::CommandFailed,
            format!("{} exited with status {}", program, code),
        ));
    }
    Ok(())
}

/// Pipe one command's stdout into another, streaming the consumer's output.
///
/// Used for `adb logcat | ndk-stack -sym <dir>`.
pub fn run_piped(
    producer: &str,
    producer_args: &[&str],
    consumer: &str,
    consumer_args: &[&str],
) -> Result<i32> {
    let mut upstream = Command::new(producer)
        .args(producer_args)
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| Error::process(format!("Failed to execute {}: {}", producer, e)))?;

    let upstream_out = upstream
        .stdout
        .take()
        .ok_or_else(|| Error::process(format!("No stdout from {}", producer)))?;

    let status = Command::new(consumer)
        .args(consumer_args)
        .stdin(Stdio::from(upstream_out))
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| Error::process(format!("Failed to execute {}: {}", consumer, e)))?;

    let _ = upstream.kill();
    let _ = upstream.wait();

    Ok(status.code().unwrap_or(-1))
}

/// Check if a command exists in PATH
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Get the path to a command
pub fn which_command(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists_echo() {
        assert!(command_exists("echo"));
    }

    #[test]
    fn test_command_exists_nonexistent() {
        assert!(!command_exists("nonexistent_command_12345"));
    }

    #[test]
    fn test_run_command_echo() {
        let result = run_command("echo", &["hello"]).unwrap();
        assert!(result.success);
        assert!(result.stdout.contains("hello"));
    }

    #[test]
    fn test_run_command_with_env() {
        let opts = ExecOptions::default().with_env("PYNATIVE_TEST_VAR", "42");
        let result = run_command_with("sh", &["-c", "echo $PYNATIVE_TEST_VAR"], &opts).unwrap();
        assert!(result.stdout.contains("42"));
    }

    #[test]
    fn test_run_command_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_command_in_dir("pwd", &[], dir.path()).unwrap();
        assert!(result.success);
    }

    #[test]
    fn test_run_piped() {
        let code = run_piped("echo", &["piped"], "cat", &[]).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_command_result_combined_output() {
        let result = CommandResult {
            success: true,
            exit_code: 0,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert!(result.combined_output().contains("out"));
        assert!(result.combined_output().contains("err"));
    }
}
