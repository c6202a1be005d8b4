//! Project configuration
//!
//! A directory is a project root when it contains an `environment.yml` whose
//! document carries an `android` or `ios` section. The same file doubles as
//! the conda environment file, so unknown keys (channels, dependencies, ...)
//! are ignored when deserializing.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const PROJECT_FILE: &str = "environment.yml";

fn default_sources() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_targets() -> Vec<String> {
    vec!["arm64-v8a".to_string(), "armeabi-v7a".to_string()]
}

fn default_watch_extensions() -> Vec<String> {
    vec![".py".to_string()]
}

/// Android build settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AndroidEnv {
    /// Path to the NDK install, `~` expanded at load time
    pub ndk: Option<String>,
    /// ABIs to build for
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
    /// Directory containing the jni sources (defaults derived from the prefix)
    pub jni_dir: Option<String>,
    /// Directory ndk-build drops per-ABI libraries into
    pub ndk_build_dir: Option<String>,
    /// Staging directory for the python bundle
    pub python_build_dir: Option<String>,
    /// Root of the per-target runtime prefix
    pub conda_prefix: Option<String>,
    /// Library/file glob patterns excluded from bundles, merged with the
    /// project-wide list during normalization
    #[serde(default)]
    pub excluded: Vec<String>,
}

/// iOS build settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IosEnv {
    /// Staging directory for the python bundle
    pub python_build_dir: Option<String>,
    /// Root of the per-target runtime prefix
    pub conda_prefix: Option<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
}

/// Dev server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DevEnv {
    /// File extensions (with leading dot) that trigger a reload
    #[serde(default = "default_watch_extensions")]
    pub watch_extensions: Vec<String>,
    /// Debounce window in milliseconds
    #[serde(default = "DevEnv::default_reload_delay_ms")]
    pub reload_delay_ms: u64,
}

impl DevEnv {
    fn default_reload_delay_ms() -> u64 {
        1000
    }
}

impl Default for DevEnv {
    fn default() -> Self {
        Self {
            watch_extensions: default_watch_extensions(),
            reload_delay_ms: Self::default_reload_delay_ms(),
        }
    }
}

/// Parsed project configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Project (and conda env) name
    pub name: Option<String>,
    /// Reverse-DNS application id
    pub bundle_id: Option<String>,
    /// App source directories included in bundles and watched by the server
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    /// Glob patterns excluded from every platform bundle
    #[serde(default)]
    pub excluded: Vec<String>,
    /// Android section (presence marks the project as targeting android)
    pub android: Option<AndroidEnv>,
    /// iOS section
    pub ios: Option<IosEnv>,
    /// Dev server section
    #[serde(default)]
    pub dev: DevEnv,
}

/// A project rooted at a directory, with normalized configuration
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory containing the project file
    pub root: PathBuf,
    /// Parsed and normalized configuration
    pub config: ProjectConfig,
}

impl Project {
    /// Check whether `dir` looks like a project root without fully loading it
    pub fn is_project_root(dir: &Path) -> bool {
        let path = dir.join(PROJECT_FILE);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return false;
        };
        match serde_yaml::from_str::<serde_yaml::Value>(&content) {
            Ok(doc) => doc.get("android").is_some() || doc.get("ios").is_some(),
            Err(e) => {
                tracing::warn!("Could not parse {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Load and normalize the project at `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        if !Self::is_project_root(dir) {
            return Err(Error::not_a_project(dir));
        }
        let path = dir.join(PROJECT_FILE);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::config(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut config: ProjectConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {}", path.display(), e)))?;

        let root = dir
            .canonicalize()
            .unwrap_or_else(|_| dir.to_path_buf());
        normalize(&mut config, &root);

        Ok(Self { root, config })
    }

    /// The android section, or an error for android-only commands
    pub fn android(&self) -> Result<&AndroidEnv> {
        self.config
            .android
            .as_ref()
            .ok_or_else(|| Error::config("environment.yml has no android section"))
    }

    /// The ios section, or an error for ios-only commands
    pub fn ios(&self) -> Result<&IosEnv> {
        self.config
            .ios
            .as_ref()
            .ok_or_else(|| Error::config("environment.yml has no ios section"))
    }

    /// The application bundle id, required by run/link commands
    pub fn bundle_id(&self) -> Result<&str> {
        self.config
            .bundle_id
            .as_deref()
            .ok_or_else(|| Error::config("environment.yml has no bundle_id"))
    }

    /// Path to the main application source file generated by `create`
    pub fn android_dir(&self) -> PathBuf {
        self.root.join("android")
    }

    pub fn ios_dir(&self) -> PathBuf {
        self.root.join("ios")
    }
}

/// Fill in derived defaults and merge shared exclusions into each platform
fn normalize(config: &mut ProjectConfig, root: &Path) {
    let shared = config.excluded.clone();
    let build_dir = root.join("build/python");
    let prefix = std::env::var("CONDA_PREFIX")
        .map(PathBuf::from)
        .unwrap_or_else(|_| root.join("venv"));

    if let Some(android) = config.android.as_mut() {
        if let Some(ndk) = android.ndk.as_mut() {
            *ndk = shellexpand::tilde(ndk).into_owned();
        }
        fill_common(
            &mut android.python_build_dir,
            &mut android.conda_prefix,
            &mut android.excluded,
            &build_dir,
            &prefix,
            &shared,
        );
    }
    if let Some(ios) = config.ios.as_mut() {
        fill_common(
            &mut ios.python_build_dir,
            &mut ios.conda_prefix,
            &mut ios.excluded,
            &build_dir,
            &prefix,
            &shared,
        );
    }
}

fn fill_common(
    python_build_dir: &mut Option<String>,
    conda_prefix: &mut Option<String>,
    excluded: &mut Vec<String>,
    build_dir: &Path,
    prefix: &Path,
    shared: &[String],
) {
    if python_build_dir.is_none() {
        *python_build_dir = Some(build_dir.to_string_lossy().into_owned());
    } else if let Some(dir) = python_build_dir.as_mut() {
        *dir = shellexpand::tilde(dir).into_owned();
    }
    if conda_prefix.is_none() {
        *conda_prefix = Some(prefix.to_string_lossy().into_owned());
    } else if let Some(dir) = conda_prefix.as_mut() {
        *dir = shellexpand::tilde(dir).into_owned();
    }
    excluded.extend(shared.iter().cloned());
}

impl AndroidEnv {
    pub fn python_build_dir(&self) -> PathBuf {
        PathBuf::from(self.python_build_dir.as_deref().unwrap_or("build/python"))
    }

    pub fn conda_prefix(&self) -> PathBuf {
        PathBuf::from(self.conda_prefix.as_deref().unwrap_or("venv"))
    }
}

impl IosEnv {
    pub fn python_build_dir(&self) -> PathBuf {
        PathBuf::from(self.python_build_dir.as_deref().unwrap_or("build/python"))
    }

    pub fn conda_prefix(&self) -> PathBuf {
        PathBuf::from(self.conda_prefix.as_deref().unwrap_or("venv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name: demo
bundle_id: com.example.demo
channels:
  - conda-forge
dependencies:
  - android-python=3.10
excluded:
  - "*.pyc"
android:
  ndk: ~/Android/Sdk/ndk/26.1.10909125
  targets:
    - arm64-v8a
  excluded:
    - "libssl*"
ios:
  excluded: []
"#;

    fn write_project(dir: &Path, yaml: &str) {
        std::fs::write(dir.join(PROJECT_FILE), yaml).unwrap();
    }

    #[test]
    fn test_detects_project_root() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), SAMPLE);
        assert!(Project::is_project_root(dir.path()));
    }

    #[test]
    fn test_rejects_plain_conda_env_file() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), "name: demo\ndependencies:\n  - python\n");
        assert!(!Project::is_project_root(dir.path()));
    }

    #[test]
    fn test_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!Project::is_project_root(dir.path()));
    }

    #[test]
    fn test_load_merges_shared_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), SAMPLE);
        let project = Project::load(dir.path()).unwrap();

        let android = project.android().unwrap();
        assert!(android.excluded.iter().any(|p| p == "libssl*"));
        assert!(android.excluded.iter().any(|p| p == "*.pyc"));

        let ios = project.ios().unwrap();
        assert!(ios.excluded.iter().any(|p| p == "*.pyc"));
    }

    #[test]
    fn test_load_fills_build_dir_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), SAMPLE);
        let project = Project::load(dir.path()).unwrap();

        let android = project.android().unwrap();
        assert!(android.python_build_dir().ends_with("build/python"));
        assert_eq!(project.bundle_id().unwrap(), "com.example.demo");
    }

    #[test]
    fn test_load_expands_ndk_tilde() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), SAMPLE);
        let project = Project::load(dir.path()).unwrap();

        let ndk = project.android().unwrap().ndk.clone().unwrap();
        assert!(!ndk.starts_with('~'));
    }

    #[test]
    fn test_dev_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), SAMPLE);
        let project = Project::load(dir.path()).unwrap();

        assert_eq!(project.config.dev.watch_extensions, vec![".py"]);
        assert_eq!(project.config.dev.reload_delay_ms, 1000);
    }

    #[test]
    fn test_load_errors_outside_project() {
        let dir = tempfile::tempdir().unwrap();
        let err = Project::load(dir.path()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotAProject);
    }
}
