//! xcodebuild integration
//!
//! Builds run against the CocoaPods-generated workspace in the project's
//! `ios/` directory; the scheme is derived from the workspace name.

use pynative_core::error::{Error, ErrorCode, Result};
use pynative_core::process::{command_exists, run_command, run_streaming, ExecOptions};
use std::path::{Path, PathBuf};

/// Check if xcodebuild is available
pub fn is_available() -> bool {
    command_exists("xcodebuild")
}

/// Get the Xcode version line
pub fn version() -> Result<String> {
    let result = run_command("xcodebuild", &["-version"])?;
    Ok(result.stdout.lines().next().unwrap_or("Unknown").to_string())
}

/// Locate the CocoaPods workspace in the ios directory
pub fn find_workspace(ios_dir: &Path) -> Result<PathBuf> {
    let pattern = ios_dir.join("*.xcworkspace");
    let mut matches = glob::glob(&pattern.to_string_lossy())?;
    matches
        .next()
        .and_then(|m| m.ok())
        .ok_or_else(|| {
            Error::new(
                ErrorCode::XcodeError,
                format!("No xcworkspace found in {}", ios_dir.display()),
            )
            .with_suggestion("Run `pod install` in the ios directory first")
        })
}

/// Scheme name derived from the workspace file name
pub fn scheme_for(workspace: &Path) -> String {
    workspace
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn xcodebuild(ios_dir: &Path, args: &[&str]) -> Result<()> {
    let code = run_streaming("xcrun", args, &ExecOptions::in_dir(ios_dir))?;
    if code != 0 {
        return Err(Error::new(
            ErrorCode::XcodeError,
            format!("xcodebuild failed with status {}", code),
        ));
    }
    Ok(())
}

/// Build the app into the given derived-data directory
pub fn build(ios_dir: &Path, release: bool, derived_data: &str) -> Result<()> {
    let workspace = find_workspace(ios_dir)?;
    let scheme = scheme_for(&workspace);
    let workspace_name = workspace
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    xcodebuild(
        ios_dir,
        &[
            "xcodebuild",
            "-scheme",
            &scheme,
            "-workspace",
            &workspace_name,
            "-configuration",
            if release { "Release" } else { "Debug" },
            "-allowProvisioningUpdates",
            "-derivedDataPath",
            derived_data,
        ],
    )
}

/// Clean the workspace build artifacts
pub fn clean(ios_dir: &Path) -> Result<()> {
    let workspace = find_workspace(ios_dir)?;
    let scheme = scheme_for(&workspace);
    let workspace_name = workspace
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    xcodebuild(
        ios_dir,
        &[
            "xcodebuild",
            "clean",
            "-scheme",
            &scheme,
            "-workspace",
            &workspace_name,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_for() {
        assert_eq!(scheme_for(Path::new("ios/Demo.xcworkspace")), "Demo");
        assert_eq!(scheme_for(Path::new("My.App.xcworkspace")), "My.App");
    }

    #[test]
    fn test_find_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Demo.xcworkspace")).unwrap();
        let found = find_workspace(dir.path()).unwrap();
        assert!(found.ends_with("Demo.xcworkspace"));
    }

    #[test]
    fn test_find_workspace_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_workspace(dir.path()).unwrap_err();
        assert!(err.suggestion.as_deref().unwrap().contains("pod install"));
    }
}
