//! `doctor` — report the external tools pynative depends on

use pynative_android::{adb, emulator};
use pynative_cli::output::Status;
use pynative_core::config::Project;
use pynative_core::error::exit_codes;
use pynative_core::process::command_exists;
use std::path::Path;

pub fn run(project: Option<&Project>) -> i32 {
    println!("Environment Check");
    println!();

    match pynative_conda::find_conda() {
        Ok(path) => Status::success(&format!("conda: {}", path.display())),
        Err(_) => Status::error("conda: not found"),
    }

    if command_exists("python") {
        Status::success("python: installed");
    } else {
        Status::warning("python: not found");
    }

    if adb::is_available() {
        Status::success("adb: installed");
    } else {
        Status::error("adb: not found");
    }

    if emulator::is_available() {
        Status::success("emulator: installed");
    } else {
        Status::warning("emulator: not found");
    }

    if pynative_ios::xcode::is_available() {
        match pynative_ios::xcode::version() {
            Ok(version) => Status::success(&format!("xcodebuild: {}", version)),
            Err(_) => Status::success("xcodebuild: installed"),
        }
    } else {
        Status::warning("xcodebuild: not found (ios builds need a mac)");
    }

    if let Some(project) = project {
        if project.android_dir().join("gradlew").is_file() {
            Status::success("gradle wrapper: present");
        } else {
            Status::warning("gradle wrapper: missing from android/");
        }
        match project.android().ok().and_then(|a| a.ndk.clone()) {
            Some(ndk) if Path::new(&ndk).is_dir() => Status::success(&format!("ndk: {}", ndk)),
            Some(ndk) => Status::warning(&format!("ndk: {} does not exist", ndk)),
            None => Status::warning("ndk: not configured in environment.yml"),
        }
    }

    exit_codes::SUCCESS
}
