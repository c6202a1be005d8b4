//! iOS build/run commands

use pynative_cli::output::Status;
use pynative_core::config::Project;
use pynative_core::error::exit_codes;
use pynative_ios::{simulator, xcode};

/// `build-ios`
pub fn build(project: &Project, release: bool) -> i32 {
    match xcode::build(&project.ios_dir(), release, "build") {
        Ok(()) => {
            Status::success("iOS build succeeded");
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&e.to_string());
            exit_codes::FAILURE
        }
    }
}

/// `clean-ios`
pub fn clean(project: &Project) -> i32 {
    match xcode::clean(&project.ios_dir()) {
        Ok(()) => {
            Status::success("Cleaned ios project");
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&e.to_string());
            exit_codes::FAILURE
        }
    }
}

/// `run-ios` — build, then launch on the booted simulator
pub fn run(project: &Project, release: bool) -> i32 {
    match run_inner(project, release) {
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

fn run_inner(project: &Project, release: bool) -> pynative_core::Result<()> {
    xcode::build(&project.ios_dir(), release, "run")?;
    simulator::launch_booted(project.bundle_id()?)
}
