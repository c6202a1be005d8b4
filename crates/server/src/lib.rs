//! Hot-reload dev server for pynative apps
//!
//! Watches the project's source tree, debounces bursts of file changes, and
//! pushes changed file contents to attached app instances as JSON over a
//! WebSocket. A forwarding mode turns the server into a transparent relay
//! between remote peers (a debugger and a device) instead.
//!
//! Structure:
//! - [`session`] — the single-task state machine owning clients, the
//!   pending-change set, and the debounce counter
//! - [`watcher`] — notify subscription marshaling changes onto the session
//! - [`http`] — the axum routes and per-connection socket tasks
//! - [`protocol`] — the reload message format

#![warn(missing_docs)]

pub mod config;
pub mod http;
pub mod protocol;
pub mod session;
pub mod watcher;

pub use config::{DevServerConfig, ServerMode};
pub use http::serve;
pub use protocol::ServerMessage;
pub use session::{DevSession, Event};
