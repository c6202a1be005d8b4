//! ndk-build orchestration
//!
//! The runtime ships its jni sources inside the per-target prefix. Building
//! them for the project's ABI set means rewriting two makefile variables,
//! running the NDK's ndk-build, and collecting the produced shared objects
//! next to any prebuilt python modules.

use once_cell::sync::Lazy;
use pynative_core::config::AndroidEnv;
use pynative_core::error::{Error, ErrorCode, Result};
use pynative_core::fsutil;
use pynative_core::patch::FileTransaction;
use pynative_core::process::{run_piped, run_streaming, ExecOptions};
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::abi::abi_to_arch;

static APP_ABI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^APP_ABI\s*:=\s*.+$").unwrap());
static PY_LIB_VER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^PY_LIB_VER\s*:=\s*.+$").unwrap());

/// Directory inside the prefix holding the runtime's android project sources
pub fn runtime_src_dir(conda_prefix: &Path) -> PathBuf {
    conda_prefix.join("android/pynative/src/main")
}

/// Path of the ndk-build entry point inside an NDK install
pub fn ndk_build_script(ndk: &Path) -> PathBuf {
    ndk.join(if cfg!(windows) { "ndk-build.cmd" } else { "ndk-build" })
}

/// Path of the ndk-stack tool inside an NDK install
pub fn ndk_stack_script(ndk: &Path) -> PathBuf {
    ndk.join(if cfg!(windows) { "ndk-stack.cmd" } else { "ndk-stack" })
}

/// Reduce a full python version to the `major.minor` the makefiles expect
pub fn short_py_version(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Rewrite the `APP_ABI := ...` line to the configured ABI set
pub fn patch_app_abi(content: &str, abis: &[String]) -> String {
    let replacement = format!("APP_ABI := {}", abis.join(" "));
    rewrite_line(content, &APP_ABI_RE, &replacement)
}

/// Rewrite the `PY_LIB_VER := ...` line to the installed python version
pub fn patch_python_version(content: &str, version: &str) -> String {
    let replacement = format!("PY_LIB_VER := {}", version);
    rewrite_line(content, &PY_LIB_VER_RE, &replacement)
}

fn rewrite_line(content: &str, pattern: &Regex, replacement: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in content.lines() {
        if pattern.is_match(line) {
            lines.push(replacement.to_string());
        } else {
            lines.push(line.to_string());
        }
    }
    lines.join("\n")
}

fn ndk_dir(env: &AndroidEnv) -> Result<PathBuf> {
    env.ndk
        .as_deref()
        .map(PathBuf::from)
        .ok_or_else(|| {
            Error::new(ErrorCode::NdkError, "android.ndk is not set in environment.yml")
                .with_suggestion("Add the NDK install path to the android section")
        })
}

fn jni_dir(env: &AndroidEnv) -> PathBuf {
    env.jni_dir
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| runtime_src_dir(&env.conda_prefix()).join("jni"))
}

fn libs_dir(env: &AndroidEnv) -> PathBuf {
    env.ndk_build_dir
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| runtime_src_dir(&env.conda_prefix()).join("libs"))
}

/// Patch the makefiles and run ndk-build in the runtime's jni directory.
///
/// The makefile edits revert if ndk-build fails, so a broken build does not
/// leave the prefix half-configured.
pub fn build(env: &AndroidEnv, python_version: &str) -> Result<()> {
    let ndk = ndk_dir(env)?;
    let jni = jni_dir(env);
    let version = short_py_version(python_version);

    FileTransaction::run(|tx| {
        let app_mk = jni.join("Application.mk");
        let patched = patch_app_abi(&tx.read(&app_mk)?, &env.targets);
        tx.write(&app_mk, &patched)?;

        let android_mk = jni.join("Android.mk");
        let patched = patch_python_version(&tx.read(&android_mk)?, &version);
        tx.write(&android_mk, &patched)?;

        let script = ndk_build_script(&ndk);
        let code = run_streaming(
            &script.to_string_lossy(),
            &[],
            &ExecOptions::in_dir(&jni),
        )?;
        if code != 0 {
            return Err(Error::new(
                ErrorCode::NdkError,
                format!("ndk-build failed with status {}", code),
            ));
        }
        Ok(())
    })
}

/// Copy each ABI's compiled python modules into the ndk libs directory.
///
/// Returns the number of libraries copied.
pub fn collect_libraries(env: &AndroidEnv) -> Result<usize> {
    let prefix = env.conda_prefix();
    let libs = libs_dir(env);
    let mut copied = 0;

    for abi in &env.targets {
        let arch = abi_to_arch(abi).ok_or_else(|| {
            Error::new(
                ErrorCode::InvalidConfigValue,
                format!("Unknown android target: {}", abi),
            )
        })?;
        let src_dir = prefix.join("android").join(arch).join("lib");
        let dst_dir = libs.join(abi);
        std::fs::create_dir_all(&dst_dir)?;

        for lib in fsutil::files_with_extension(&src_dir, "so") {
            let name = lib
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if fsutil::matches_any(&name, &env.excluded) {
                tracing::debug!("skipping excluded library {}", name);
                continue;
            }
            std::fs::copy(&lib, dst_dir.join(&name))?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Pipe `adb logcat` through ndk-stack with the per-ABI symbol directory
pub fn symbolize_crashes(env: &AndroidEnv, abi: &str) -> Result<i32> {
    let ndk = ndk_dir(env)?;
    let sym = runtime_src_dir(&env.conda_prefix())
        .join("obj/local")
        .join(abi);
    let stack = ndk_stack_script(&ndk).to_string_lossy().into_owned();
    let sym = sym.to_string_lossy().into_owned();
    run_piped("adb", &["logcat"], &stack, &["-sym", sym.as_str()])
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_MK: &str = "APP_PLATFORM := android-21\nAPP_ABI := armeabi-v7a\nAPP_STL := c++_shared\n";
    const ANDROID_MK: &str = "LOCAL_PATH := $(call my-dir)\nPY_LIB_VER := 2.7\ninclude $(BUILD_SHARED_LIBRARY)\n";

    #[test]
    fn test_patch_app_abi() {
        let abis = vec!["arm64-v8a".to_string(), "x86_64".to_string()];
        let patched = patch_app_abi(APP_MK, &abis);
        assert!(patched.contains("APP_ABI := arm64-v8a x86_64"));
        assert!(!patched.contains("APP_ABI := armeabi-v7a"));
        assert!(patched.contains("APP_STL := c++_shared"));
    }

    #[test]
    fn test_patch_python_version() {
        let patched = patch_python_version(ANDROID_MK, "3.10");
        assert!(patched.contains("PY_LIB_VER := 3.10"));
        assert!(!patched.contains("2.7"));
    }

    #[test]
    fn test_patch_leaves_unrelated_assignments() {
        let patched = patch_app_abi("MY_APP_ABI := keep\n", &["x86".to_string()]);
        assert!(patched.contains("MY_APP_ABI := keep"));
    }

    #[test]
    fn test_short_py_version() {
        assert_eq!(short_py_version("3.10.6"), "3.10");
        assert_eq!(short_py_version("3.11"), "3.11");
    }

    #[test]
    fn test_ndk_script_names() {
        let script = ndk_build_script(Path::new("/opt/ndk"));
        assert!(script.to_string_lossy().contains("ndk-build"));
    }
}
