//! Android project linker
//!
//! Wires an installed package into a generated android project by editing
//! three files:
//!
//! 1. `android/settings.gradle` gains an `include ':<pkg>'` plus a projectDir
//!    entry pointing into the package install dir.
//! 2. `android/app/build.gradle` gains an `api project(':<pkg>')` dependency.
//! 3. `MainApplication.java` gains an import and a `new <Cls>()` entry for
//!    every bridge class the package ships.
//!
//! All edits run inside a [`FileTransaction`]; any failure restores every
//! touched file before the error propagates.

use once_cell::sync::Lazy;
use pynative_core::error::{Error, ErrorCode, Result};
use pynative_core::patch::FileTransaction;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory (relative to the project root) packages are installed under
pub const PACKAGE_DIR: &str = "venv";

/// Marker interface implemented by java bridge packages
const BRIDGE_INTERFACE: &str = "implements PythonPackage";

static IMPORT_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^import\s+[\w.]+;$").unwrap());
static ENTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^new \w+Package\(\)$").unwrap());
static ENTRY_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^new \w+Package\(\),$").unwrap());
static DEPENDENCIES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^dependencies\s*\{").unwrap());

/// Outcome of a link or unlink pass over one package
#[derive(Debug, Default)]
pub struct LinkReport {
    /// Bridge classes discovered in the package
    pub classes: Vec<String>,
    /// Whether settings.gradle changed
    pub settings_changed: bool,
    /// Whether app/build.gradle changed
    pub build_changed: bool,
    /// Whether MainApplication.java changed
    pub app_changed: bool,
}

impl LinkReport {
    /// True when the package contained no bridge classes at all
    pub fn no_packages(&self) -> bool {
        self.classes.is_empty()
    }

    /// True when any file was edited
    pub fn changed(&self) -> bool {
        self.settings_changed || self.build_changed || self.app_changed
    }
}

/// Path of the generated application class for a bundle id
pub fn main_application_path(project_root: &Path, bundle_id: &str) -> PathBuf {
    let mut path = project_root.join("android/app/src/main/java");
    for part in bundle_id.split('.') {
        path.push(part);
    }
    path.join("MainApplication.java")
}

/// Find fully-qualified bridge class names shipped by a package.
///
/// Scans `<package>/src/main/java` for `*Package.java` files that implement
/// the bridge interface.
pub fn find_bridge_packages(package_android_dir: &Path) -> Result<Vec<String>> {
    let java_root = package_android_dir.join("src/main/java");
    let mut classes = Vec::new();
    if !java_root.is_dir() {
        return Ok(classes);
    }
    for entry in WalkDir::new(&java_root) {
        let entry = entry.map_err(|e| Error::io(e.to_string()))?;
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !name.ends_with("Package.java") {
            continue;
        }
        let source = std::fs::read_to_string(path)?;
        if !source.contains(BRIDGE_INTERFACE) {
            continue;
        }
        let rel = path
            .strip_prefix(&java_root)
            .map_err(|e| Error::io(e.to_string()))?;
        let qualified = rel
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(".");
        classes.push(qualified);
    }
    classes.sort();
    Ok(classes)
}

/// Returns true if settings.gradle already includes the package
pub fn is_settings_linked(source: &str, pkg: &str) -> bool {
    let pattern = format!(r#"include\s*['"]:{}['"]"#, regex::escape(pkg));
    let re = Regex::new(&pattern).expect("static pattern");
    source.lines().any(|line| re.is_match(line))
}

/// Returns true if app/build.gradle already depends on the package
pub fn is_build_linked(source: &str, pkg: &str) -> bool {
    let pattern = format!(
        r#"(api|implementation|compile)\s+project\(['"]:{}['"]\)"#,
        regex::escape(pkg)
    );
    let re = Regex::new(&pattern).expect("static pattern");
    source.lines().any(|line| re.is_match(line))
}

fn settings_lines(pkg: &str) -> [String; 2] {
    [
        format!("include ':{}'", pkg),
        format!(
            "project(':{pkg}').projectDir = new File(rootProject.projectDir, '../{dir}/android/{pkg}')",
            pkg = pkg,
            dir = PACKAGE_DIR,
        ),
    ]
}

fn link_settings(source: &str, pkg: &str) -> Option<String> {
    if is_settings_linked(source, pkg) {
        return None;
    }
    let mut lines: Vec<String> = source.lines().map(String::from).collect();
    lines.push(String::new());
    lines.extend(settings_lines(pkg));
    Some(lines.join("\n"))
}

fn unlink_settings(source: &str, pkg: &str) -> Option<String> {
    if !is_settings_linked(source, pkg) {
        return None;
    }
    let removed = settings_lines(pkg);
    let lines: Vec<&str> = source
        .lines()
        .filter(|line| !removed.iter().any(|r| r == line.trim()))
        .collect();
    Some(lines.join("\n"))
}

fn link_build(source: &str, pkg: &str) -> Result<Option<String>> {
    if is_build_linked(source, pkg) {
        return Ok(None);
    }
    let mut lines: Vec<String> = source.lines().map(String::from).collect();

    // Insertion point: the line closing the dependencies block.
    let mut in_block = false;
    let mut insert_at = None;
    for (i, line) in lines.iter().enumerate() {
        if DEPENDENCIES_RE.is_match(line.trim_start()) {
            in_block = true;
            continue;
        }
        if in_block && line.contains('}') {
            insert_at = Some(i);
            break;
        }
    }
    let i = insert_at.ok_or_else(|| {
        Error::new(
            ErrorCode::PatternNotFound,
            format!("No dependencies block found to link {} into app/build.gradle", pkg),
        )
    })?;
    lines.insert(i, format!("    api project(':{}')", pkg));
    Ok(Some(lines.join("\n")))
}

fn unlink_build(source: &str, pkg: &str) -> Option<String> {
    if !is_build_linked(source, pkg) {
        return None;
    }
    let removed = [
        format!("api project(':{}')", pkg),
        format!("implementation project(':{}')", pkg),
        format!("compile project(':{}')", pkg),
    ];
    let lines: Vec<&str> = source
        .lines()
        .filter(|line| !removed.iter().any(|r| r == line.trim()))
        .collect();
    Some(lines.join("\n"))
}

fn class_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

fn link_main_application(source: &str, classes: &[String]) -> Result<Option<String>> {
    let mut lines: Vec<String> = source.lines().map(String::from).collect();
    let mut changed = false;

    for class in classes {
        if source.contains(class.as_str()) {
            continue;
        }

        // Import goes after the last existing import.
        let last_import = lines
            .iter()
            .rposition(|line| IMPORT_LINE_RE.is_match(line.trim()));
        let at = last_import.map(|i| i + 1).unwrap_or(0);
        lines.insert(at, format!("import {};", class));

        // Extend the package list: the entry without a trailing comma is the
        // last one.
        let last_entry = lines
            .iter()
            .rposition(|line| ENTRY_RE.is_match(line.trim()))
            .ok_or_else(|| {
                Error::new(
                    ErrorCode::PatternNotFound,
                    format!("Could not find the package list entry to add {}", class),
                )
            })?;
        let indent: String = lines[last_entry]
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();
        lines[last_entry].push(',');
        lines.insert(
            last_entry + 1,
            format!("{}new {}()", indent, class_name(class)),
        );
        changed = true;
    }

    Ok(changed.then(|| lines.join("\n")))
}

fn unlink_main_application(source: &str, classes: &[String]) -> Option<String> {
    let mut lines: Vec<String> = source.lines().map(String::from).collect();
    let mut changed = false;

    for class in classes {
        if !source.contains(class.as_str()) {
            continue;
        }
        let name = class_name(class);
        let removed = [
            format!("import {};", class),
            format!("new {}()", name),
            format!("new {}(),", name),
        ];
        lines.retain(|line| !removed.iter().any(|r| r == line.trim()));
        changed = true;
    }
    if !changed {
        return None;
    }

    // If the removed entry was the last one, the new last entry still carries
    // a trailing comma.
    let has_terminal = lines.iter().any(|line| ENTRY_RE.is_match(line.trim()));
    if !has_terminal {
        if let Some(i) = lines
            .iter()
            .rposition(|line| ENTRY_COMMA_RE.is_match(line.trim()))
        {
            if let Some(at) = lines[i].rfind(',') {
                lines[i].truncate(at);
            }
        }
    }

    Some(lines.join("\n"))
}

/// Link a package into the android project at `project_root`
pub fn link(project_root: &Path, bundle_id: &str, pkg: &str) -> Result<LinkReport> {
    let package_android_dir = project_root.join(PACKAGE_DIR).join("android").join(pkg);
    let classes = find_bridge_packages(&package_android_dir)?;
    if classes.is_empty() {
        return Ok(LinkReport::default());
    }

    let settings_path = project_root.join("android/settings.gradle");
    let build_path = project_root.join("android/app/build.gradle");
    let app_path = main_application_path(project_root, bundle_id);

    FileTransaction::run(|tx| {
        let mut report = LinkReport {
            classes: classes.clone(),
            ..LinkReport::default()
        };

        let settings = tx.read(&settings_path)?;
        if let Some(patched) = link_settings(&settings, pkg) {
            tx.write(&settings_path, &patched)?;
            report.settings_changed = true;
        }

        let build = tx.read(&build_path)?;
        if let Some(patched) = link_build(&build, pkg)? {
            tx.write(&build_path, &patched)?;
            report.build_changed = true;
        }

        let app = tx.read(&app_path)?;
        if let Some(patched) = link_main_application(&app, &classes)? {
            tx.write(&app_path, &patched)?;
            report.app_changed = true;
        }

        Ok(report)
    })
}

/// Remove a previously linked package from the android project
pub fn unlink(project_root: &Path, bundle_id: &str, pkg: &str) -> Result<LinkReport> {
    let package_android_dir = project_root.join(PACKAGE_DIR).join("android").join(pkg);
    let classes = find_bridge_packages(&package_android_dir)?;
    if classes.is_empty() {
        return Ok(LinkReport::default());
    }

    let settings_path = project_root.join("android/settings.gradle");
    let build_path = project_root.join("android/app/build.gradle");
    let app_path = main_application_path(project_root, bundle_id);

    FileTransaction::run(|tx| {
        let mut report = LinkReport {
            classes: classes.clone(),
            ..LinkReport::default()
        };

        let settings = tx.read(&settings_path)?;
        if let Some(patched) = unlink_settings(&settings, pkg) {
            tx.write(&settings_path, &patched)?;
            report.settings_changed = true;
        }

        let build = tx.read(&build_path)?;
        if let Some(patched) = unlink_build(&build, pkg) {
            tx.write(&build_path, &patched)?;
            report.build_changed = true;
        }

        let app = tx.read(&app_path)?;
        if let Some(patched) = unlink_main_application(&app, &classes) {
            tx.write(&app_path, &patched)?;
            report.app_changed = true;
        }

        Ok(report)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = "rootProject.name = 'demo'\ninclude ':app'\n";

    const BUILD: &str = r#"apply plugin: 'com.android.application'

dependencies {
    implementation fileTree(dir: 'libs', include: ['*.jar'])
    api project(':runtime')
}
"#;

    const MAIN_APP: &str = r#"package com.example.demo;

import java.util.Arrays;
import java.util.List;
import io.pynative.PythonApplication;
import io.pynative.RuntimePackage;

public class MainApplication extends PythonApplication {
    @Override
    public List getPackages() {
        return Arrays.asList(
                new RuntimePackage()
        );
    }
}
"#;

    const BRIDGE_CLASS: &str = r#"package com.example.charts;

import io.pynative.PythonPackage;

public class ChartsPackage implements PythonPackage {
}
"#;

    fn make_project(dir: &Path) {
        let android = dir.join("android");
        std::fs::create_dir_all(android.join("app")).unwrap();
        std::fs::write(android.join("settings.gradle"), SETTINGS).unwrap();
        std::fs::write(android.join("app/build.gradle"), BUILD).unwrap();

        let app_java = main_application_path(dir, "com.example.demo");
        std::fs::create_dir_all(app_java.parent().unwrap()).unwrap();
        std::fs::write(&app_java, MAIN_APP).unwrap();

        let pkg_java = dir.join("venv/android/charts/src/main/java/com/example/charts");
        std::fs::create_dir_all(&pkg_java).unwrap();
        std::fs::write(pkg_java.join("ChartsPackage.java"), BRIDGE_CLASS).unwrap();
    }

    #[test]
    fn test_is_settings_linked() {
        assert!(is_settings_linked("include ':charts'", "charts"));
        assert!(is_settings_linked("include \":charts\"", "charts"));
        assert!(!is_settings_linked("include ':chartsx'", "charts"));
    }

    #[test]
    fn test_is_build_linked_all_configurations() {
        assert!(is_build_linked("    api project(':charts')", "charts"));
        assert!(is_build_linked("    compile project(':charts')", "charts"));
        assert!(!is_build_linked("    api project(':other')", "charts"));
    }

    #[test]
    fn test_find_bridge_packages() {
        let dir = tempfile::tempdir().unwrap();
        make_project(dir.path());
        let classes =
            find_bridge_packages(&dir.path().join("venv/android/charts")).unwrap();
        assert_eq!(classes, vec!["com.example.charts.ChartsPackage"]);
    }

    #[test]
    fn test_link_edits_all_three_files() {
        let dir = tempfile::tempdir().unwrap();
        make_project(dir.path());

        let report = link(dir.path(), "com.example.demo", "charts").unwrap();
        assert!(report.settings_changed);
        assert!(report.build_changed);
        assert!(report.app_changed);

        let settings =
            std::fs::read_to_string(dir.path().join("android/settings.gradle")).unwrap();
        assert!(settings.contains("include ':charts'"));
        assert!(settings.contains("../venv/android/charts"));

        let build = std::fs::read_to_string(dir.path().join("android/app/build.gradle")).unwrap();
        assert!(build.contains("api project(':charts')"));
        // Inserted inside the dependencies block, before its closing brace.
        let dep_pos = build.find("dependencies {").unwrap();
        let link_pos = build.find("api project(':charts')").unwrap();
        let close_pos = build[dep_pos..].find('}').unwrap() + dep_pos;
        assert!(dep_pos < link_pos && link_pos < close_pos);

        let app = std::fs::read_to_string(main_application_path(
            dir.path(),
            "com.example.demo",
        ))
        .unwrap();
        assert!(app.contains("import com.example.charts.ChartsPackage;"));
        assert!(app.contains("new RuntimePackage(),"));
        assert!(app.contains("new ChartsPackage()"));
    }

    #[test]
    fn test_link_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        make_project(dir.path());

        link(dir.path(), "com.example.demo", "charts").unwrap();
        let first =
            std::fs::read_to_string(dir.path().join("android/settings.gradle")).unwrap();

        let report = link(dir.path(), "com.example.demo", "charts").unwrap();
        assert!(!report.changed());
        let second =
            std::fs::read_to_string(dir.path().join("android/settings.gradle")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unlink_restores_original_texture() {
        let dir = tempfile::tempdir().unwrap();
        make_project(dir.path());

        link(dir.path(), "com.example.demo", "charts").unwrap();
        let report = unlink(dir.path(), "com.example.demo", "charts").unwrap();
        assert!(report.changed());

        let app = std::fs::read_to_string(main_application_path(
            dir.path(),
            "com.example.demo",
        ))
        .unwrap();
        assert!(!app.contains("ChartsPackage"));
        // Last remaining entry loses its comma again.
        assert!(app.contains("new RuntimePackage()"));
        assert!(!app.contains("new RuntimePackage(),"));

        let build = std::fs::read_to_string(dir.path().join("android/app/build.gradle")).unwrap();
        assert!(!build.contains(":charts"));
    }

    #[test]
    fn test_link_without_dependencies_block_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        make_project(dir.path());
        let build_path = dir.path().join("android/app/build.gradle");
        std::fs::write(&build_path, "apply plugin: 'com.android.application'\n").unwrap();

        let err = link(dir.path(), "com.example.demo", "charts").unwrap_err();
        assert_eq!(err.code, ErrorCode::PatternNotFound);

        // settings.gradle was patched before the failure and must be restored.
        let settings =
            std::fs::read_to_string(dir.path().join("android/settings.gradle")).unwrap();
        assert_eq!(settings, SETTINGS);
    }

    #[test]
    fn test_link_without_bridge_classes_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        make_project(dir.path());
        std::fs::remove_dir_all(dir.path().join("venv/android/charts/src")).unwrap();

        let report = link(dir.path(), "com.example.demo", "charts").unwrap();
        assert!(report.no_packages());
        assert!(!report.changed());
    }
}
