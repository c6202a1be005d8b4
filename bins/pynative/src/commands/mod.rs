//! Command implementations
//!
//! Each module exposes functions that do the work for one or more
//! subcommands and return a process exit code. Preconditions (project root,
//! active env) are already checked by the dispatcher.

pub mod android;
pub mod bundle;
pub mod create;
pub mod doctor;
pub mod ios;
pub mod link;
pub mod packages;
pub mod recipe;
pub mod server;
