//! Android-specific tools for pynative
//!
//! This crate provides:
//! - Gradle build system integration
//! - adb device management and log streaming
//! - Emulator management
//! - ndk-build orchestration (makefile patching, library collection)
//! - The project linker that wires packages into generated android projects

#![warn(missing_docs)]

pub mod abi;
pub mod adb;
pub mod emulator;
pub mod gradle;
pub mod linker;
pub mod ndk;
