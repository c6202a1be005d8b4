//! Android build/run commands

use pynative_android::{adb, emulator, gradle, ndk};
use pynative_cli::output::{format_duration, Status};
use pynative_conda::Conda;
use pynative_core::config::Project;
use pynative_core::error::exit_codes;
use std::time::Instant;

/// `build-android`
pub fn build(project: &Project, release: bool, extra: &[String]) -> i32 {
    let dir = project.android_dir();
    let started = Instant::now();
    Status::info(&format!(
        "Building {} APK...",
        if release { "release" } else { "debug" }
    ));

    let result = if release {
        gradle::assemble_release(&dir, extra)
    } else {
        gradle::assemble_debug(&dir, extra)
    };
    match result {
        Ok(()) => {
            Status::success(&format!(
                "Build succeeded in {}",
                format_duration(started.elapsed())
            ));
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&e.to_string());
            exit_codes::FAILURE
        }
    }
}

/// `clean-android`
pub fn clean(project: &Project) -> i32 {
    match gradle::clean(&project.android_dir()) {
        Ok(()) => {
            Status::success("Cleaned android project");
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&e.to_string());
            exit_codes::FAILURE
        }
    }
}

/// `run-android` — build, install on a device (booting an emulator if none
/// is attached), and launch the main activity
pub fn run(project: &Project, release: bool, extra: &[String]) -> i32 {
    match run_inner(project, release, extra) {
        Ok(()) => {
            Status::success("App started");
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&e.to_string());
            exit_codes::FAILURE
        }
    }
}

fn run_inner(project: &Project, release: bool, extra: &[String]) -> pynative_core::Result<()> {
    let dir = project.android_dir();
    let bundle_id = project.bundle_id()?;

    if !adb::has_device() {
        let avd = emulator::boot_first_available()?;
        Status::info(&format!("Booting emulator {}...", avd));
    }

    if release {
        gradle::assemble_release(&dir, extra)?;
        let apk = gradle::release_apk(&dir);
        adb::install_apk(&apk.to_string_lossy())?;
    } else {
        gradle::install_debug(&dir, extra)?;
    }

    adb::launch_activity(bundle_id)
}

/// `ndk-build`
pub fn ndk_build(project: &Project) -> i32 {
    match ndk_build_inner(project) {
        Ok(()) => {
            Status::success("Native libraries built");
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&format!("{:#}", e));
            exit_codes::FAILURE
        }
    }
}

/// Shared with `bundle-assets`, which runs the ndk build before packing
pub fn ndk_build_inner(project: &Project) -> anyhow::Result<()> {
    let android = project.android()?;

    let conda = Conda::discover()?;
    let version = conda.package_version("android-python")?.ok_or_else(|| {
        anyhow::anyhow!("android-python is not installed in this env (run `pynative install`)")
    })?;
    Status::info(&format!("Building native libraries for python {}", version));

    ndk::build(android, &version)?;
    let copied = ndk::collect_libraries(android)?;
    Status::info(&format!("Collected {} shared libraries", copied));
    Ok(())
}

/// `ndk-stack`
pub fn ndk_stack(project: &Project, abi: &str) -> i32 {
    let android = match project.android() {
        Ok(env) => env,
        Err(e) => {
            Status::error(&e.to_string());
            return exit_codes::CONFIG_ERROR;
        }
    };
    match ndk::symbolize_crashes(android, abi) {
        Ok(code) => code,
        Err(e) => {
            Status::error(&e.to_string());
            exit_codes::FAILURE
        }
    }
}

/// `logcat` — stream the device log, reattaching across reconnects
pub fn logcat() -> i32 {
    if !adb::is_available() {
        Status::error(&pynative_core::Error::command_not_found("adb").to_string());
        return exit_codes::COMMAND_NOT_FOUND;
    }
    loop {
        if let Err(e) = adb::wait_for_device() {
            Status::error(&e.to_string());
            return exit_codes::FAILURE;
        }
        match adb::logcat() {
            // Device dropped; wait for it to come back.
            Ok(_) => Status::info("Device disconnected, waiting..."),
            Err(e) => {
                Status::error(&e.to_string());
                return exit_codes::FAILURE;
            }
        }
    }
}
