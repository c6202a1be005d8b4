//! `start` — run the hot-reload dev server

use pynative_cli::output::Status;
use pynative_core::config::{DevEnv, Project};
use pynative_core::error::exit_codes;
use pynative_server::{DevServerConfig, ServerMode};
use std::time::Duration;

pub fn start(project: Option<&Project>, port: u16, remote_debugging: bool) -> i32 {
    let mode = if remote_debugging {
        ServerMode::Forwarding
    } else {
        ServerMode::Normal
    };

    // Inside a project the configured source dir and watch settings apply;
    // anywhere else the conventional src/ layout is assumed.
    let (source_root, dev) = match project {
        Some(project) => {
            let source = project
                .config
                .sources
                .first()
                .map(String::as_str)
                .unwrap_or("src");
            (project.root.join(source), project.config.dev.clone())
        }
        None => {
            let cwd = match std::env::current_dir() {
                Ok(cwd) => cwd,
                Err(e) => {
                    Status::error(&format!("Cannot determine working directory: {}", e));
                    return exit_codes::FAILURE;
                }
            };
            (cwd.join("src"), DevEnv::default())
        }
    };

    let config = DevServerConfig {
        port,
        mode,
        source_root,
        reload_delay: Duration::from_millis(dev.reload_delay_ms),
        watch_extensions: dev.watch_extensions,
        adb_reverse: true,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            Status::error(&format!("Failed to start runtime: {}", e));
            return exit_codes::FAILURE;
        }
    };

    match runtime.block_on(pynative_server::serve(config)) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            Status::error(&e.to_string());
            exit_codes::FAILURE
        }
    }
}
