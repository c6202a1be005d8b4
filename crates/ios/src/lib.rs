//! iOS-specific tools for pynative
//!
//! Wrappers for the xcodebuild and simctl workflows the CLI drives.

#![warn(missing_docs)]

pub mod simulator;
pub mod xcode;

use std::path::Path;

/// True if the directory carries a CocoaPods Podfile
pub fn has_podfile(dir: &Path) -> bool {
    dir.join("Podfile").is_file()
}
