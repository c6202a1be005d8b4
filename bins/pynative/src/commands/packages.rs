//! `install`, `uninstall`, `list` — package operations against the app env

use pynative_cli::output::Status;
use pynative_conda::Conda;
use pynative_core::config::{Project, PROJECT_FILE};
use pynative_core::error::exit_codes;
use std::path::Path;

fn discover_conda() -> Option<Conda> {
    match Conda::discover() {
        Ok(conda) => Some(conda),
        Err(e) => {
            Status::error(&e.to_string());
            None
        }
    }
}

/// Install packages (or sync from environment.yml), then link everything
pub fn install(packages: &[String], project: Option<&Project>) -> i32 {
    let Some(conda) = discover_conda() else {
        return exit_codes::FAILURE;
    };

    let result = if packages.is_empty() {
        Status::info("Updating env from environment.yml...");
        conda.env_update(Path::new(PROJECT_FILE))
    } else {
        conda.install(packages)
    };
    if let Err(e) = result {
        Status::error(&format!("Install failed: {}", e));
        return exit_codes::FAILURE;
    }
    Status::success("Packages installed");

    match project {
        Some(project) => super::link::link(project, &[]),
        None => {
            Status::info("Not inside a project; skipping link");
            exit_codes::SUCCESS
        }
    }
}

/// Unlink packages from the generated projects, then uninstall them
pub fn uninstall(packages: &[String], project: Option<&Project>) -> i32 {
    if let Some(project) = project {
        let code = super::link::unlink(project, packages);
        if code != exit_codes::SUCCESS {
            return code;
        }
    }

    let Some(conda) = discover_conda() else {
        return exit_codes::FAILURE;
    };
    match conda.uninstall(packages) {
        Ok(()) => {
            Status::success("Packages removed");
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&format!("Uninstall failed: {}", e));
            exit_codes::FAILURE
        }
    }
}

/// `conda list` passthrough
pub fn list() -> i32 {
    let Some(conda) = discover_conda() else {
        return exit_codes::FAILURE;
    };
    match conda.list() {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            Status::error(&e.to_string());
            exit_codes::FAILURE
        }
    }
}
