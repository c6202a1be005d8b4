//! Gradle build system integration
//!
//! Builds run through the project's own gradle wrapper with output streamed
//! to the terminal.

use pynative_core::error::{Error, ErrorCode, Result};
use pynative_core::process::{run_streaming, ExecOptions};
use std::path::Path;

/// Name of the gradle wrapper script for this platform
pub fn wrapper() -> &'static str {
    if cfg!(windows) {
        "gradlew.bat"
    } else {
        "./gradlew"
    }
}

/// Run a gradle task, streaming output, with extra pass-through args
pub fn run_task(project_dir: &Path, task: &str, extra: &[String]) -> Result<()> {
    #[cfg(unix)]
    {
        // Template archives tend to drop the execute bit on the wrapper.
        use std::os::unix::fs::PermissionsExt;
        let gradlew = project_dir.join("gradlew");
        if gradlew.exists() {
            let _ = std::fs::set_permissions(&gradlew, std::fs::Permissions::from_mode(0o755));
        }
    }

    let mut args = vec![task];
    args.extend(extra.iter().map(String::as_str));

    let code = run_streaming(wrapper(), &args, &ExecOptions::in_dir(project_dir))?;
    if code != 0 {
        return Err(Error::new(
            ErrorCode::GradleError,
            format!("gradle {} failed with status {}", task, code),
        ));
    }
    Ok(())
}

/// Build the debug APK
pub fn assemble_debug(project_dir: &Path, extra: &[String]) -> Result<()> {
    run_task(project_dir, "assembleDebug", extra)
}

/// Build the release APK
pub fn assemble_release(project_dir: &Path, extra: &[String]) -> Result<()> {
    run_task(project_dir, "assembleRelease", extra)
}

/// Build and install the debug APK onto the connected device
pub fn install_debug(project_dir: &Path, extra: &[String]) -> Result<()> {
    run_task(project_dir, "installDebug", extra)
}

/// Clean build artifacts
pub fn clean(project_dir: &Path) -> Result<()> {
    run_task(project_dir, "clean", &[])
}

/// Path of the unsigned release APK produced by `assembleRelease`
pub fn release_apk(project_dir: &Path) -> std::path::PathBuf {
    project_dir.join("app/build/outputs/apk/app-release-unsigned.apk")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_name() {
        assert!(!wrapper().is_empty());
    }

    #[test]
    fn test_release_apk_path() {
        let apk = release_apk(Path::new("android"));
        assert!(apk.ends_with("app/build/outputs/apk/app-release-unsigned.apk"));
    }
}
