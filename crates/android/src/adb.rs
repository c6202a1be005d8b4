//! adb device management
//!
//! Wraps the adb commands the run/debug workflow needs: device listing,
//! install, activity launch, log streaming, and reverse port forwarding for
//! the dev server.

use pynative_core::error::Result;
use pynative_core::process::{
    command_exists, run_command, run_streaming, run_streaming_checked, CommandResult, ExecOptions,
};

/// Check if adb is available
pub fn is_available() -> bool {
    command_exists("adb")
}

/// Serial numbers of connected devices and emulators
pub fn devices() -> Result<Vec<String>> {
    let result = run_command("adb", &["devices"])?;
    Ok(result
        .stdout
        .lines()
        .skip(1) // column header
        .filter(|l| l.contains("\tdevice") || l.ends_with("device"))
        .filter_map(|l| l.split_whitespace().next())
        .map(String::from)
        .collect())
}

/// True when at least one device is attached and authorized
pub fn has_device() -> bool {
    devices().map(|d| !d.is_empty()).unwrap_or(false)
}

/// Install an APK onto the connected device
pub fn install_apk(apk_path: &str) -> Result<()> {
    run_streaming_checked("adb", &["install", "-r", apk_path], &ExecOptions::default())
}

/// Launch the app's main activity
pub fn launch_activity(bundle_id: &str) -> Result<()> {
    let component = format!("{}/{}.MainActivity", bundle_id, bundle_id);
    run_streaming_checked(
        "adb",
        &["shell", "am", "start", "-n", &component],
        &ExecOptions::default(),
    )
}

/// Reverse-forward a TCP port from the device to this machine.
///
/// Lets a USB-attached device reach the dev server without shared wifi.
/// Callers treat failures as benign (no device attached yet).
pub fn reverse(port: u16) -> Result<CommandResult> {
    let spec = format!("tcp:{}", port);
    run_command("adb", &["reverse", &spec, &spec])
}

/// Block until a device is attached
pub fn wait_for_device() -> Result<i32> {
    run_streaming("adb", &["wait-for-device"], &ExecOptions::default())
}

/// Stream logcat until the device goes away; returns the exit code
pub fn logcat() -> Result<i32> {
    run_streaming("adb", &["logcat"], &ExecOptions::default())
}
