//! `create` — render an embedded project template

use anyhow::{bail, Context, Result};
use handlebars::Handlebars;
use include_dir::{include_dir, Dir, File};
use pynative_cli::output::Status;
use pynative_core::error::exit_codes;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

static TEMPLATES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Path segments in templates replaced from the render context
const PATH_VARS: [(&str, &str); 3] = [
    ("__bundle_path__", "bundle_path"),
    ("__project_module__", "project_module"),
    ("__class_name__", "class_name"),
];

pub fn run(what: &str, name: &str, bundle_id: Option<&str>, force: bool) -> i32 {
    match scaffold(what, name, bundle_id, force) {
        Ok(count) => {
            Status::success(&format!(
                "{} '{}' created successfully ({} files)",
                capitalize(what),
                name,
                count
            ));
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&format!("{:#}", e));
            exit_codes::FAILURE
        }
    }
}

fn scaffold(what: &str, name: &str, bundle_id: Option<&str>, force: bool) -> Result<usize> {
    let template = TEMPLATES.get_dir(what).with_context(|| {
        let available: Vec<_> = TEMPLATES
            .dirs()
            .map(|d| d.path().to_string_lossy().into_owned())
            .collect();
        format!(
            "Unknown template '{}' (available: {})",
            what,
            available.join(", ")
        )
    })?;

    let dest = std::env::current_dir()?.join(name);
    if dest.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            dest.display()
        );
    }

    let context = render_context(name, bundle_id);
    let mut hb = Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);

    let mut count = 0;
    for file in collect_files(template) {
        let rel = file
            .path()
            .strip_prefix(what)
            .context("template path outside its root")?;
        let target = dest.join(rewrite_path(rel, &context));
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match file.contents_utf8() {
            Some(text) => {
                let rendered = hb
                    .render_template(text, &context)
                    .with_context(|| format!("rendering {}", rel.display()))?;
                std::fs::write(&target, rendered)?;
            }
            None => std::fs::write(&target, file.contents())?,
        }
        count += 1;
    }

    Ok(count)
}

fn render_context(name: &str, bundle_id: Option<&str>) -> BTreeMap<String, String> {
    let module = name.replace('-', "_").to_lowercase();
    let bundle = bundle_id
        .map(String::from)
        .unwrap_or_else(|| format!("com.example.{}", module));
    let (ndk, ndk_version) = detect_ndk();

    let mut ctx = BTreeMap::new();
    ctx.insert("project_name".to_string(), name.to_string());
    ctx.insert("project_module".to_string(), module);
    ctx.insert("class_name".to_string(), class_name(name));
    ctx.insert("bundle_path".to_string(), bundle.replace('.', "/"));
    ctx.insert("bundle_id".to_string(), bundle);
    ctx.insert(
        "user_home".to_string(),
        dirs::home_dir()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    ctx.insert("android_ndk".to_string(), ndk);
    ctx.insert("android_ndk_version".to_string(), ndk_version);
    ctx
}

/// Newest NDK under the default SDK location, as (path, version)
fn detect_ndk() -> (String, String) {
    let Some(root) = dirs::home_dir().map(|h| h.join("Android/Sdk/ndk")) else {
        return (String::new(), String::new());
    };
    let mut versions: Vec<PathBuf> = std::fs::read_dir(&root)
        .map(|entries| entries.flatten().map(|e| e.path()).collect())
        .unwrap_or_default();
    versions.sort();
    match versions.last() {
        Some(newest) => (
            newest.to_string_lossy().into_owned(),
            newest
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
        None => (root.to_string_lossy().into_owned(), String::new()),
    }
}

fn collect_files<'a>(dir: &'a Dir<'a>) -> Vec<&'a File<'a>> {
    let mut files: Vec<&File> = dir.files().collect();
    for sub in dir.dirs() {
        files.extend(collect_files(sub));
    }
    files
}

fn rewrite_path(rel: &Path, context: &BTreeMap<String, String>) -> PathBuf {
    let mut path = rel.to_string_lossy().into_owned();
    for (segment, key) in PATH_VARS {
        if let Some(value) = context.get(key) {
            path = path.replace(segment, value);
        }
    }
    PathBuf::from(path)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// CamelCase a project name: `bar-charts` -> `BarCharts`
fn class_name(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}
