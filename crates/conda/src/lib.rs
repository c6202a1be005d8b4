//! Conda environment and package management for pynative
//!
//! This crate wraps the conda executable for:
//! - Executable discovery across conventional install locations
//! - Environment queries (`conda info --json`, active env checks)
//! - Package operations (install, uninstall, list, env update)
//! - Recipe operations (`conda build`, `conda skeleton pypi`)

pub mod detect;
pub mod error;

pub use detect::find_conda;
pub use error::{CondaError, Result};

use pynative_core::process::{self, ExecOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment names that count as "no app environment active"
const BASE_ENVS: [&str; 2] = ["base", "root"];

/// Parsed subset of `conda info --json`
#[derive(Debug, Clone, Deserialize)]
pub struct CondaInfo {
    /// Name of the currently activated environment
    pub active_prefix_name: Option<String>,
    /// Conda's own version string
    pub conda_version: Option<String>,
    /// Path of the currently activated environment
    pub active_prefix: Option<PathBuf>,
}

impl CondaInfo {
    /// Parse the JSON printed by `conda info --json`
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// True when a non-base environment is activated
    pub fn in_app_env(&self) -> bool {
        match self.active_prefix_name.as_deref() {
            Some(name) => !BASE_ENVS.contains(&name),
            None => false,
        }
    }
}

/// Whether the calling shell has a non-base conda env activated.
///
/// Reads `CONDA_DEFAULT_ENV` rather than spawning conda so precondition
/// checks stay cheap.
pub fn in_app_env() -> bool {
    match std::env::var("CONDA_DEFAULT_ENV") {
        Ok(name) => !name.is_empty() && !BASE_ENVS.contains(&name.as_str()),
        Err(_) => false,
    }
}

/// Handle to a located conda executable
#[derive(Debug, Clone)]
pub struct Conda {
    exe: PathBuf,
}

impl Conda {
    /// Locate conda on this machine
    pub fn discover() -> Result<Self> {
        Ok(Self { exe: find_conda()? })
    }

    /// Use a known conda executable (tests, unusual installs)
    pub fn from_path(exe: PathBuf) -> Self {
        Self { exe }
    }

    fn exe(&self) -> &str {
        self.exe.to_str().unwrap_or("conda")
    }

    fn checked(&self, args: &[&str], opts: &ExecOptions) -> Result<()> {
        let code = process::run_streaming(self.exe(), args, opts)?;
        if code != 0 {
            return Err(CondaError::CommandFailed {
                command: args.first().copied().unwrap_or("").to_string(),
                status: code,
            });
        }
        Ok(())
    }

    /// Query environment state
    pub fn info(&self) -> Result<CondaInfo> {
        let result = process::run_command(self.exe(), &["info", "--json"])?;
        if !result.success {
            return Err(CondaError::InvalidInfo(result.stderr));
        }
        CondaInfo::parse(&result.stdout)
    }

    /// `conda list`, streamed to the terminal
    pub fn list(&self) -> Result<()> {
        self.checked(&["list"], &ExecOptions::default())
    }

    /// Find the installed version of a package, if present
    pub fn package_version(&self, package: &str) -> Result<Option<String>> {
        let result = process::run_command(self.exe(), &["list"])?;
        if !result.success {
            return Err(CondaError::CommandFailed {
                command: "list".to_string(),
                status: result.exit_code,
            });
        }
        for line in result.stdout.lines() {
            if line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            if fields.next() == Some(package) {
                return Ok(fields.next().map(String::from));
            }
        }
        Ok(None)
    }

    /// `conda install -y <packages>`
    pub fn install(&self, packages: &[String]) -> Result<()> {
        let mut args = vec!["install", "-y"];
        args.extend(packages.iter().map(String::as_str));
        self.checked(&args, &ExecOptions::default())
    }

    /// `conda uninstall -y <packages>`
    pub fn uninstall(&self, packages: &[String]) -> Result<()> {
        let mut args = vec!["uninstall", "-y"];
        args.extend(packages.iter().map(String::as_str));
        self.checked(&args, &ExecOptions::default())
    }

    /// `conda env update -f <file> --prune`
    pub fn env_update(&self, file: &Path) -> Result<()> {
        let file = file.to_string_lossy().into_owned();
        self.checked(
            &["env", "update", "-f", file.as_str(), "--prune"],
            &ExecOptions::default(),
        )
    }

    /// `conda build <recipe> [args...]`, optionally with extra env vars
    pub fn build(&self, recipe: &str, extra: &[String], env: &[(&str, &str)]) -> Result<()> {
        let mut args = vec!["build", recipe];
        args.extend(extra.iter().map(String::as_str));
        let mut opts = ExecOptions::default();
        for (key, value) in env {
            opts = opts.with_env(*key, *value);
        }
        self.checked(&args, &opts)
    }

    /// `conda skeleton pypi <package>` in the given directory
    pub fn skeleton_pypi(&self, package: &str, dir: &Path) -> Result<()> {
        self.checked(&["skeleton", "pypi", package], &ExecOptions::in_dir(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_parse() {
        let json = r#"{
            "active_prefix_name": "myapp",
            "active_prefix": "/home/dev/miniconda3/envs/myapp",
            "conda_version": "24.1.2",
            "channels": ["conda-forge"]
        }"#;
        let info = CondaInfo::parse(json).unwrap();
        assert!(info.in_app_env());
        assert_eq!(info.conda_version.as_deref(), Some("24.1.2"));
    }

    #[test]
    fn test_info_base_env_is_not_app_env() {
        let json = r#"{"active_prefix_name": "base"}"#;
        let info = CondaInfo::parse(json).unwrap();
        assert!(!info.in_app_env());
    }

    #[test]
    fn test_info_missing_prefix_is_not_app_env() {
        let info = CondaInfo::parse("{}").unwrap();
        assert!(!info.in_app_env());
    }
}
