//! `link` / `unlink` — wire packages into the generated platform projects

use pynative_android::linker::{self, LinkReport, PACKAGE_DIR};
use pynative_cli::output::Status;
use pynative_core::config::Project;
use pynative_core::error::exit_codes;

const IOS_TARGETS: [&str; 2] = ["iphoneos", "iphonesimulator"];

/// Link named packages, or everything installed when `names` is empty
pub fn link(project: &Project, names: &[String]) -> i32 {
    apply(project, names, Action::Link)
}

/// Unlink named packages
pub fn unlink(project: &Project, names: &[String]) -> i32 {
    apply(project, names, Action::Unlink)
}

#[derive(Clone, Copy)]
enum Action {
    Link,
    Unlink,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Link => "linked",
            Action::Unlink => "unlinked",
        }
    }
}

fn apply(project: &Project, names: &[String], action: Action) -> i32 {
    let names = if names.is_empty() {
        match installed_packages(project) {
            Ok(names) => names,
            Err(e) => {
                Status::error(&e.to_string());
                return exit_codes::FAILURE;
            }
        }
    } else {
        names.to_vec()
    };
    if names.is_empty() {
        Status::info("No packages to link");
        return exit_codes::SUCCESS;
    }

    let bundle_id = match project.bundle_id() {
        Ok(id) => id.to_string(),
        Err(e) => {
            Status::error(&e.to_string());
            return exit_codes::CONFIG_ERROR;
        }
    };

    for name in &names {
        if let Err(e) = apply_one(project, &bundle_id, name, action) {
            Status::error(&format!(
                "[Android] {} failed to {}. Reverted: {}",
                name,
                action.verb(),
                e
            ));
            return exit_codes::LINK_ERROR;
        }
    }
    exit_codes::SUCCESS
}

fn apply_one(
    project: &Project,
    bundle_id: &str,
    name: &str,
    action: Action,
) -> pynative_core::Result<()> {
    let android_pkg = project.root.join(PACKAGE_DIR).join("android").join(name);
    if android_pkg.join("build.gradle").is_file() {
        Status::info(&format!("[Android] {}ing {}", verb_stem(action), name));
        let report = match action {
            Action::Link => linker::link(&project.root, bundle_id, name)?,
            Action::Unlink => linker::unlink(&project.root, bundle_id, name)?,
        };
        describe(name, &report, action);
    }

    for target in IOS_TARGETS {
        let pkg_dir = project.root.join(PACKAGE_DIR).join(target).join(name);
        if pynative_ios::has_podfile(&pkg_dir) {
            Status::warning(&format!(
                "[iOS] {}: Podfile packages are not supported yet",
                name
            ));
        }
    }
    Ok(())
}

fn verb_stem(action: Action) -> &'static str {
    match action {
        Action::Link => "link",
        Action::Unlink => "unlink",
    }
}

fn describe(name: &str, report: &LinkReport, action: Action) {
    if report.no_packages() {
        Status::warning(&format!("[Android] {}: no bridge packages found", name));
        return;
    }
    if report.changed() {
        Status::success(&format!("[Android] {} {} successfully", name, action.verb()));
    } else {
        Status::info(&format!("[Android] {} was already {}", name, action.verb()));
    }
}

/// Every installed package with an android project under venv/
fn installed_packages(project: &Project) -> pynative_core::Result<Vec<String>> {
    let android_dir = project.root.join(PACKAGE_DIR).join("android");
    let mut names = Vec::new();
    if !android_dir.is_dir() {
        return Ok(names);
    }
    for entry in std::fs::read_dir(&android_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.join("build.gradle").is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
