// src/qml.rs

//! Static QML import analysis
//!
//! From-source QML deployment copies only the framework QML modules an
//! application actually imports. The scanner walks the application
//! source tree for `.qml` files, extracts `import Mod.Ule` statements,
//! resolves them to module directories under the framework QML root
//! and follows imports transitively through the resolved modules
//! (their own `.qml` files and `qmldir` `depends` entries), returning
//! the minimal module directory set.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Collect `import` / `depends` module names from one QML or qmldir file
fn imports_in_file(path: &Path, import_re: &Regex) -> Vec<String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!("cannot read {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    import_re
        .captures_iter(&contents)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Module names imported anywhere under a directory
fn imports_in_tree(dir: &Path, import_re: &Regex) -> Vec<String> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.ends_with(".qml") || name == "qmldir" {
            found.extend(imports_in_file(entry.path(), import_re));
        }
    }
    found
}

/// Resolve an import name to its module directory under the QML root.
/// `App.Controls` maps to `<root>/App/Controls`.
fn module_dir(qml_root: &Path, import: &str) -> Option<PathBuf> {
    let relative: PathBuf = import.split('.').collect();
    let dir = qml_root.join(relative);
    dir.is_dir().then_some(dir)
}

/// Find the minimal set of framework QML module directories imported
/// by an application source tree.
pub fn scan(qml_root: &Path, source_dir: &Path) -> Result<Vec<PathBuf>> {
    if !qml_root.is_dir() {
        return Err(Error::NotFound(format!(
            "QML root {} does not exist",
            qml_root.display()
        )));
    }
    if !source_dir.is_dir() {
        return Err(Error::NotFound(format!(
            "QML source directory {} does not exist",
            source_dir.display()
        )));
    }

    // `import App.Controls`, `import App.Controls 2.15`, and qmldir
    // `depends App.Controls` lines all name a module
    let import_re = Regex::new(r"(?m)^\s*(?:import|depends)\s+([A-Za-z_][\w.]*)")
        .expect("import pattern is valid");

    let mut resolved: BTreeSet<PathBuf> = BTreeSet::new();
    let mut pending: Vec<String> = imports_in_tree(source_dir, &import_re);

    while let Some(import) = pending.pop() {
        let Some(dir) = module_dir(qml_root, &import) else {
            debug!("import {} has no module directory under the QML root", import);
            continue;
        };
        if !resolved.insert(dir.clone()) {
            continue;
        }
        // Modules can pull in further modules
        pending.extend(imports_in_tree(&dir, &import_re));
    }

    if resolved.is_empty() {
        warn!(
            "no framework QML modules found for {}",
            source_dir.display()
        );
    }

    Ok(resolved.into_iter().collect())
}
