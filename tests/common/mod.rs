// tests/common/mod.rs

//! Shared fixtures for the pipeline integration tests.
//!
//! Builds a miniature framework toolchain tree and application on
//! disk, plus a table-driven stand-in for the binary scanner so the
//! pipeline can run without real ELF/PE files.

use shipkit::config::{DeployConfig, DeployOptions, FrameworkDirs, PackageConfig, PackageLayout};
use shipkit::scanner::{DependencyScanner, LibPriority, LibRecord, Platform};
use shipkit::Result;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Scanner stand-in resolving by file name from a fixed table
pub struct StubScanner {
    table: HashMap<String, Vec<LibRecord>>,
}

impl StubScanner {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Register the dependency records returned for any path whose
    /// file name matches `name`
    pub fn add(&mut self, name: &str, records: Vec<LibRecord>) {
        self.table.insert(name.to_string(), records);
    }
}

impl DependencyScanner for StubScanner {
    fn scan(&self, path: &Path) -> Result<Vec<LibRecord>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(self.table.get(&name).cloned().unwrap_or_default())
    }
}

/// Convenience record constructor
pub fn record(name: &str, path: &Path, priority: LibPriority) -> LibRecord {
    LibRecord {
        name: name.to_string(),
        path: path.to_path_buf(),
        platform: Platform::Unix,
        priority,
    }
}

/// Write a file, creating parent directories as needed
pub fn write_file(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Lay out a miniature framework toolchain under `root`:
/// libraries, two plugin subsystems, a QML tree with two modules,
/// translations (with a web-runtime locale bundle), resources and the
/// web-runtime helper process.
pub fn fake_framework(root: &Path) -> FrameworkDirs {
    let libs = root.join("lib");
    for lib in [
        "libQtCore.so.6",
        "libQtGui.so.6",
        "libQtSql.so.6",
        "libQtQml.so.6",
        "libQtWebEngineCore.so.6",
    ] {
        write_file(&libs.join(lib), b"framework library");
    }

    write_file(
        &root.join("plugins/platforms/libqxcb.so"),
        b"platform plugin",
    );
    write_file(
        &root.join("plugins/platforms/libqxcb.so.debug"),
        b"debug symbols",
    );
    write_file(
        &root.join("plugins/sqldrivers/libqsqlite.so"),
        b"sql plugin",
    );

    write_file(
        &root.join("qml/App/Controls/qmldir"),
        b"module App.Controls\nplugin controlsplugin\n",
    );
    write_file(
        &root.join("qml/App/Controls/libcontrolsplugin.so"),
        b"qml plugin",
    );
    write_file(
        &root.join("qml/App/Charts/qmldir"),
        b"module App.Charts\nplugin chartsplugin\n",
    );
    write_file(
        &root.join("qml/App/Charts/libchartsplugin.so"),
        b"qml plugin",
    );

    for tr in ["qtbase_de.qm", "qtbase_fr.qm", "qtdeclarative_de.qm", "qtwebengine_de.qm"] {
        write_file(&root.join("translations").join(tr), b"catalog");
    }
    write_file(
        &root.join("translations/qtwebengine_locales/en-US.pak"),
        b"locale",
    );

    write_file(&root.join("resources/icudtl.dat"), b"resource");
    write_file(&root.join("libexec/QtWebEngineProcess"), b"helper");

    FrameworkDirs {
        bins: root.join("bin"),
        libs,
        plugins: root.join("plugins"),
        qml: root.join("qml"),
        translations: root.join("translations"),
        resources: root.join("resources"),
        libexecs: root.join("libexec"),
    }
}

/// One-package configuration over a fake framework, hermetic ledger
/// store, stripping disabled so no external tools run
pub fn test_config(base: &Path, framework: FrameworkDirs, target: &Path) -> DeployConfig {
    let mut packages = BTreeMap::new();
    packages.insert(
        String::new(),
        PackageConfig {
            targets: vec![target.to_path_buf()],
            layout: PackageLayout::default(),
        },
    );

    DeployConfig {
        output_root: base.join("out"),
        packages,
        framework,
        options: DeployOptions {
            strip_binaries: false,
            ..Default::default()
        },
        scan_depth: 8,
        ignore: Vec::new(),
        extra_lib_paths: Vec::new(),
        ledger_dir: Some(base.join("ledger-store")),
    }
}

/// Sorted relative paths of every file under `root`
pub fn tree_snapshot(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !root.exists() {
        return files;
    }
    for entry in walkdir_all(root) {
        if entry.is_file() {
            files.push(entry.strip_prefix(root).unwrap().to_path_buf());
        }
    }
    files.sort();
    files
}

fn walkdir_all(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            out.push(path);
        }
    }
    out
}
