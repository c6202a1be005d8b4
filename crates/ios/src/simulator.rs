//! iOS simulator management via simctl

use pynative_core::error::{Error, ErrorCode, Result};
use pynative_core::process::{run_streaming, ExecOptions};

fn simctl(args: &[&str]) -> Result<()> {
    let mut full = vec!["simctl"];
    full.extend(args);
    let code = run_streaming("xcrun", &full, &ExecOptions::default())?;
    if code != 0 {
        return Err(Error::new(
            ErrorCode::XcodeError,
            format!("simctl {} failed with status {}", args.first().unwrap_or(&""), code),
        ));
    }
    Ok(())
}

/// Install an app bundle onto the booted simulator
pub fn install_booted(app_path: &str) -> Result<()> {
    simctl(&["install", "booted", app_path])
}

/// Launch an app on the booted simulator
pub fn launch_booted(bundle_id: &str) -> Result<()> {
    simctl(&["launch", "booted", bundle_id])
}
