//! Android emulator management

use pynative_core::error::{Error, Result};
use pynative_core::process::{command_exists, run_command};
use std::process::{Command, Stdio};

/// Check if the emulator command is available
pub fn is_available() -> bool {
    command_exists("emulator")
}

/// List available AVDs (Android Virtual Devices)
pub fn list_avds() -> Result<Vec<String>> {
    let result = run_command("emulator", &["-list-avds"])?;
    Ok(result
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// Boot an AVD in the background and return immediately.
///
/// The emulator process outlives this tool; gradle's install step waits for
/// the device to come up.
pub fn boot_detached(avd_name: &str) -> Result<()> {
    Command::new("emulator")
        .args(["-avd", avd_name])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::process(format!("Failed to start emulator: {}", e)))?;
    Ok(())
}

/// Boot the first available AVD, for `run-android` with no device attached
pub fn boot_first_available() -> Result<String> {
    let avds = list_avds()?;
    let avd = avds
        .first()
        .ok_or_else(|| {
            Error::platform("No AVDs configured")
                .with_suggestion("Create one in Android Studio's Device Manager")
        })?
        .clone();
    boot_detached(&avd)?;
    Ok(avd)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_avd_listing_trims_blank_lines() {
        let stdout = "Pixel_7_API_34\n\nMedium_Phone_API_35\n";
        let parsed: Vec<&str> = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(parsed, vec!["Pixel_7_API_34", "Medium_Phone_API_35"]);
    }
}
