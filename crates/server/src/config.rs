//! Dev server configuration

use std::path::PathBuf;
use std::time::Duration;

/// Operating mode, fixed at server start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Watch sources and push reload payloads; client messages are logged
    Normal,
    /// Relay every message verbatim to all other connected peers
    Forwarding,
}

/// Settings for one server run
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// TCP port to listen on
    pub port: u16,
    /// Normal or forwarding mode
    pub mode: ServerMode,
    /// Directory whose changes are pushed (paths in payloads are relative
    /// to it)
    pub source_root: PathBuf,
    /// Debounce window after the most recent qualifying change
    pub reload_delay: Duration,
    /// Extensions (with leading dot) that qualify for a reload
    pub watch_extensions: Vec<String>,
    /// Periodically re-issue `adb reverse` while no client is attached
    pub adb_reverse: bool,
}

impl DevServerConfig {
    /// Defaults matching the `start` command
    pub fn new(source_root: PathBuf) -> Self {
        Self {
            port: 8888,
            mode: ServerMode::Normal,
            source_root,
            reload_delay: Duration::from_millis(1000),
            watch_extensions: vec![".py".to_string()],
            adb_reverse: true,
        }
    }
}
