//! `build-recipe` / `make-pip-recipe` — conda recipe operations
//!
//! `make-pip-recipe` turns a `conda skeleton pypi` recipe into a noarch
//! recipe that installs the package into every mobile target prefix instead
//! of building native code (the compilers are forced to /bin/false so any
//! compiled dependency fails loudly).

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use pynative_cli::output::Status;
use pynative_conda::Conda;
use pynative_core::error::exit_codes;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::path::Path;

/// Requirements satisfied by the runtime itself, never wrapped
const EXCLUDED_REQS: [&str; 4] = ["python", "cython", "setuptools", "pip"];

/// Per-target site-packages prefixes the install script writes into
const INSTALL_TARGETS: [&str; 6] = [
    "android/arm",
    "android/arm64",
    "android/x86",
    "android/x86_64",
    "iphoneos",
    "iphonesimulator",
];

static VERSION_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[<>=]").unwrap());

/// `build-recipe`: alias to conda build
pub fn build(recipe: &str, extra: &[String]) -> i32 {
    let conda = match Conda::discover() {
        Ok(conda) => conda,
        Err(e) => {
            Status::error(&e.to_string());
            return exit_codes::FAILURE;
        }
    };

    // pip recipes must not compile anything.
    let env: &[(&str, &str)] = if recipe.starts_with("pip-") {
        &[("CC", "/bin/false"), ("CXX", "/bin/false")]
    } else {
        &[]
    };
    match conda.build(recipe, extra, env) {
        Ok(()) => {
            Status::success(&format!("Built {} successfully!", recipe));
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&e.to_string());
            exit_codes::FAILURE
        }
    }
}

/// `make-pip-recipe`
pub fn make_pip_recipe(package: &str, recursive: bool, force: bool, croot: Option<&str>) -> i32 {
    let conda = match Conda::discover() {
        Ok(conda) => conda,
        Err(e) => {
            Status::error(&e.to_string());
            return exit_codes::FAILURE;
        }
    };
    let mut built = HashSet::new();
    match generate(&conda, package, recursive, force, croot, &mut built) {
        Ok(()) => {
            Status::success("Recipes made successfully!");
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&format!("{:#}", e));
            exit_codes::FAILURE
        }
    }
}

fn generate(
    conda: &Conda,
    package: &str,
    recursive: bool,
    force: bool,
    croot: Option<&str>,
    built: &mut HashSet<String>,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let before = dir_entries(&cwd)?;

    conda.skeleton_pypi(package, &cwd)?;
    built.insert(package.to_string());

    // The skeleton names its output dir after the package; diff the
    // directory so renamed/normalized names are still picked up.
    let after = dir_entries(&cwd)?;
    for fresh in after.difference(&before) {
        let dst = format!("pip-{}", fresh);
        let dst_path = cwd.join(&dst);
        if force && dst_path.exists() {
            std::fs::remove_dir_all(&dst_path)?;
        }
        std::fs::rename(cwd.join(fresh), &dst_path)?;

        let meta_path = dst_path.join("meta.yaml");
        let text = std::fs::read_to_string(&meta_path)
            .with_context(|| format!("reading {}", meta_path.display()))?;
        let (rewritten, requires) = rewrite_meta(&text)?;
        std::fs::write(&meta_path, rewritten)?;

        if recursive {
            let mut deps: Vec<String> = requires.iter().map(|r| strip_version(r)).collect();
            deps.sort();
            deps.dedup();
            for dep in deps {
                if EXCLUDED_REQS.contains(&dep.as_str()) || built.contains(&dep) {
                    continue;
                }
                if force || !cwd.join(format!("pip-{}", dep)).exists() {
                    generate(conda, &dep, recursive, force, croot, built)?;
                }
            }
        }

        let mut extra = Vec::new();
        if let Some(croot) = croot {
            extra.push(format!("--croot={}", croot));
        }
        conda.build(&dst, &extra, &[("CC", "/bin/false"), ("CXX", "/bin/false")])?;
        Status::success(&format!("Built {} successfully!", dst));
    }

    Ok(())
}

fn dir_entries(dir: &Path) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn strip_version(req: &str) -> String {
    VERSION_SPLIT
        .split(req)
        .next()
        .unwrap_or(req)
        .trim()
        .to_string()
}

fn ensure_mapping<'a>(root: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    if root.get(key).and_then(Value::as_mapping).is_none() {
        root.insert(Value::from(key), Value::Mapping(Mapping::new()));
    }
    root.get_mut(key)
        .and_then(Value::as_mapping_mut)
        .expect("mapping inserted above")
}

/// Rewrite a skeleton meta.yaml into a cross-target pip recipe.
///
/// The leading jinja `{% ... %}` lines are carried over untouched; the YAML
/// body below them is parsed, transformed, and re-serialized. Returns the
/// new file contents plus the raw requirement entries for recursion.
pub(crate) fn rewrite_meta(text: &str) -> Result<(String, Vec<String>)> {
    let lines: Vec<&str> = text.lines().collect();
    let jinja_count = lines
        .iter()
        .filter(|l| l.trim_start().starts_with("{%"))
        .count();
    let head = &lines[..jinja_count];
    let tail = lines[jinja_count..].join("\n");

    let mut doc: Value = serde_yaml::from_str(&tail).context("parsing meta.yaml body")?;
    let root = doc
        .as_mapping_mut()
        .context("meta.yaml body is not a mapping")?;

    // pip- prefix keeps the wrapped recipe from shadowing a native one.
    if let Some(pkg) = root.get_mut("package").and_then(Value::as_mapping_mut) {
        if let Some(Value::String(name)) = pkg.get_mut("name") {
            *name = format!("pip-{}", name);
        }
    }

    let summary = root
        .get("about")
        .and_then(|a| a.get("summary"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let about = ensure_mapping(root, "about");
    about.insert(
        Value::from("summary"),
        Value::from(format!(
            "{} Built for Android and iOS apps using pynative.",
            summary
        )),
    );

    let script = root
        .get("build")
        .and_then(|b| b.get("script"))
        .and_then(Value::as_str)
        .map(|s| s.replace("{{ PYTHON }}", "python"));
    let build = ensure_mapping(root, "build");
    build.insert(Value::from("noarch"), Value::Bool(true));
    let mut script_lines = vec![
        "export CC=/bin/false".to_string(),
        "export CXX=/bin/false".to_string(),
    ];
    if let Some(script) = script {
        for target in INSTALL_TARGETS {
            script_lines.push(format!(
                "{} --no-compile --target=$PREFIX/{}/python/site-packages",
                script, target
            ));
        }
    }
    build.insert(
        Value::from("script"),
        Value::Sequence(script_lines.into_iter().map(Value::from).collect()),
    );

    let mut requires = Vec::new();
    if let Some(reqs) = root.get_mut("requirements").and_then(Value::as_mapping_mut) {
        let stages: Vec<Value> = reqs.keys().cloned().collect();
        for stage in stages {
            let entries: Vec<String> = reqs
                .get(&stage)
                .and_then(Value::as_sequence)
                .map(|seq| {
                    seq.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            requires.extend(entries.iter().cloned());

            let renamed: Vec<Value> = entries
                .iter()
                .filter(|r| !EXCLUDED_REQS.contains(&strip_version(r).as_str()))
                .map(|r| Value::from(format!("pip-{}", r)))
                .collect();
            if renamed.is_empty() {
                reqs.remove(&stage);
            } else {
                reqs.insert(stage, Value::Sequence(renamed));
            }
        }
    }

    // Tests would try to import against the host python.
    root.remove("test");

    let body = serde_yaml::to_string(&doc)?;
    let mut out = head.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&body);
    Ok((out, requires))
}
