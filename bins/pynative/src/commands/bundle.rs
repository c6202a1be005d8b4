//! `bundle-assets` — stage python and app sources into a platform bundle
//!
//! The gradle and xcode builds consume what this command produces: a
//! `python.tar.gz` under the android assets, or a staged source tree under
//! `ios/assets/python`.

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use pynative_android::abi::abi_to_arch;
use pynative_cli::output::Status;
use pynative_core::config::Project;
use pynative_core::error::exit_codes;
use pynative_core::fsutil;
use pynative_core::process::{run_streaming_checked, ExecOptions};
use std::path::Path;

const TARGETS: [&str; 3] = ["android", "iphoneos", "iphonesimulator"];
const BUNDLE_NAME: &str = "python.tar.gz";

pub fn run(project: &Project, target: &str, release: bool, no_compile: bool) -> i32 {
    if !TARGETS.contains(&target) {
        Status::error(&format!(
            "Target must be one of: {} (got '{}')",
            TARGETS.join(", "),
            target
        ));
        return exit_codes::VALIDATION_ERROR;
    }
    match bundle(project, target, release, no_compile) {
        Ok(()) => {
            Status::success("Python bundled successfully!");
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&format!("{:#}", e));
            exit_codes::FAILURE
        }
    }
}

fn bundle(project: &Project, target: &str, release: bool, no_compile: bool) -> Result<()> {
    let (python_src, build_dir, excluded) = if target == "android" {
        // Native libraries first; gradle packs them from the runtime prefix.
        super::android::ndk_build_inner(project)?;

        let env = project.android()?;
        let abi = env
            .targets
            .first()
            .context("android.targets is empty in environment.yml")?;
        let arch = abi_to_arch(abi)
            .with_context(|| format!("Unknown android target: {}", abi))?;
        let prefix = env.conda_prefix();
        (
            prefix.join("android").join(arch).join("python"),
            env.python_build_dir(),
            env.excluded.clone(),
        )
    } else {
        let env = project.ios()?;
        let prefix = env.conda_prefix();
        collect_dylibs(project, &prefix.join(target).join("lib"), &env.excluded)?;
        (
            prefix.join(target).join("python"),
            env.python_build_dir(),
            env.excluded.clone(),
        )
    };

    let staging = build_dir.join("build");
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    std::fs::create_dir_all(&staging)?;

    fsutil::copy_tree(&python_src, &staging.join("python")).with_context(|| {
        format!(
            "No python build at {} (install the runtime packages first)",
            python_src.display()
        )
    })?;
    for source in &project.config.sources {
        fsutil::copy_tree(&project.root.join(source), &staging)
            .with_context(|| format!("copying app sources from {}", source))?;
    }

    if !no_compile {
        compile_sources(&staging)?;
    }

    Status::info("Removing excluded files...");
    let mut prune = excluded;
    prune.push("*.dist-info".to_string());
    prune.push("*.egg-info".to_string());
    fsutil::remove_matching(&staging, &prune)?;

    let archive = build_dir.join(BUNDLE_NAME);
    if archive.exists() {
        std::fs::remove_file(&archive)?;
    }
    Status::info("Creating python bundle...");
    create_archive(&staging, &archive, release)?;

    if target == "android" {
        let dest = project
            .android_dir()
            .join("app/src/main/assets/python")
            .join(BUNDLE_NAME);
        fsutil::copy_tree(&archive, &dest)?;
    } else {
        fsutil::copy_tree(&staging, &project.ios_dir().join("assets/python"))?;
    }
    Ok(())
}

/// Copy the runtime dylibs next to the ios project
fn collect_dylibs(project: &Project, lib_dir: &Path, excluded: &[String]) -> Result<()> {
    let dest = project.ios_dir().join("Libs");
    if dest.exists() {
        std::fs::remove_dir_all(&dest)?;
    }
    std::fs::create_dir_all(&dest)?;

    for dylib in fsutil::files_with_extension(lib_dir, "dylib") {
        let name = dylib
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if fsutil::matches_any(&name, excluded) {
            continue;
        }
        std::fs::copy(&dylib, dest.join(&name))?;
    }
    Ok(())
}

/// Byte-compile the staged sources and drop the shadowed .py files
fn compile_sources(staging: &Path) -> Result<()> {
    Status::info("Compiling py to pyc...");
    run_streaming_checked(
        "python",
        &["-m", "compileall", "-b", "-q", "."],
        &ExecOptions::in_dir(staging),
    )
    .context("byte-compiling sources")?;

    for py in fsutil::files_with_extension(staging, "py") {
        if py.with_extension("pyc").exists() {
            std::fs::remove_file(&py)?;
        }
    }
    Ok(())
}

/// Pack the staging tree into a gzipped tarball
fn create_archive(staging: &Path, archive: &Path, release: bool) -> Result<()> {
    let level = if release {
        Compression::best()
    } else {
        Compression::default()
    };
    let file = std::fs::File::create(archive)?;
    let encoder = GzEncoder::new(file, level);
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", staging)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("build");
        std::fs::create_dir_all(staging.join("python")).unwrap();
        std::fs::write(staging.join("main.py"), "print('hi')").unwrap();
        std::fs::write(staging.join("python/site.py"), "x = 1").unwrap();

        let archive = dir.path().join(BUNDLE_NAME);
        create_archive(&staging, &archive, false).unwrap();
        assert!(archive.exists());

        let file = std::fs::File::open(&archive).unwrap();
        let decoder = flate2::read::GzDecoder::new(file);
        let mut tar = tar::Archive::new(decoder);
        let names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.ends_with("main.py")));
        assert!(names.iter().any(|n| n.ends_with("site.py")));
    }
}
