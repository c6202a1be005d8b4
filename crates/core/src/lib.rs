//! Core utilities for the pynative toolchain
//!
//! Shared functionality used across the platform-specific crates:
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **Process execution**: captured, streamed, and piped command execution
//! - **Project configuration**: the `environment.yml` project model
//! - **Transactional patching**: multi-file edits with rollback-on-error
//! - **Filesystem helpers**: tree copy, glob pruning, extension scans

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod fsutil;
pub mod patch;
pub mod process;

pub use error::{Error, ErrorCode, Result, ResultExt};
