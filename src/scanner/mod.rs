// src/scanner/mod.rs

//! Binary dependency scanning
//!
//! [`BinaryScanner`] parses a binary with goblin, extracts its direct
//! shared-library dependencies (ELF `DT_NEEDED` entries, PE import
//! table) and resolves them against the framework, extra and system
//! search paths. Resolution recurses into resolved records up to the
//! configured depth limit and returns the transitive closure as a flat
//! record list.
//!
//! The scanner is behind the [`DependencyScanner`] trait so the
//! pipeline can be exercised with table-driven stand-ins in tests.

use crate::config::{DeployConfig, FrameworkDirs};
use crate::error::{Error, Result};
use crate::ignore::IgnoreRuleSet;
use goblin::Object;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Platform family a dependency record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Unix,
    Windows,
    Unknown,
}

/// Classification of one resolved dependency
///
/// Consumed via exhaustive matching; `System` records are bundled only
/// when system-bundling is enabled, everything else is always bundled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibPriority {
    /// Application-private library (next to the target or on an extra path)
    Application,
    /// Framework toolchain library
    Framework,
    /// Framework plugin binary
    Plugin,
    /// Base-OS-provided library
    System,
}

impl fmt::Display for LibPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application => write!(f, "application"),
            Self::Framework => write!(f, "framework"),
            Self::Plugin => write!(f, "plugin"),
            Self::System => write!(f, "system"),
        }
    }
}

/// One resolved dependency record, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibRecord {
    /// Dependency name as recorded in the binary (e.g. `libssl.so.3`)
    pub name: String,
    /// Resolved absolute path
    pub path: PathBuf,
    /// Platform family of the containing binary
    pub platform: Platform,
    /// Classification used for bundling policy
    pub priority: LibPriority,
}

/// Seam between the pipeline and the binary-format scanner
pub trait DependencyScanner {
    /// Resolve the transitive dependency closure of one binary.
    ///
    /// The returned sequence is finite and may be empty; partial
    /// results with unresolvable entries skipped are acceptable.
    fn scan(&self, path: &Path) -> Result<Vec<LibRecord>>;
}

/// File-type admission rule at extraction time: `.dll`, `.exe`, empty
/// suffix, or any suffix containing `so` is scannable.
pub fn is_scannable(path: &Path) -> bool {
    let suffix = crate::filesystem::complete_suffix(path);
    suffix.is_empty() || suffix == "dll" || suffix == "exe" || suffix.contains("so")
}

/// Default system library directories on the Unix family
#[cfg(unix)]
fn system_lib_dirs() -> Vec<PathBuf> {
    [
        "/lib",
        "/lib64",
        "/usr/lib",
        "/usr/lib64",
        "/usr/lib/x86_64-linux-gnu",
        "/usr/local/lib",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(not(unix))]
fn system_lib_dirs() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect())
        .unwrap_or_default()
}

/// goblin-backed scanner resolving against configured search paths
pub struct BinaryScanner {
    framework: FrameworkDirs,
    extra_paths: Vec<PathBuf>,
    system_paths: Vec<PathBuf>,
    ignore: IgnoreRuleSet,
    depth_limit: usize,
}

impl BinaryScanner {
    /// Build a scanner from the deployment configuration
    pub fn new(config: &DeployConfig) -> Self {
        Self {
            framework: config.framework.clone(),
            extra_paths: config.extra_lib_paths.clone(),
            system_paths: system_lib_dirs(),
            ignore: IgnoreRuleSet::new(&config.ignore),
            depth_limit: config.scan_depth,
        }
    }

    /// Extract the direct dependency names of one binary
    fn direct_deps(&self, path: &Path) -> Result<(Vec<String>, Platform)> {
        let buffer = fs::read(path)
            .map_err(|e| Error::ScanError(format!("cannot read {}: {}", path.display(), e)))?;

        match Object::parse(&buffer) {
            Ok(Object::Elf(elf)) => {
                let deps = elf.libraries.iter().map(|l| l.to_string()).collect();
                Ok((deps, Platform::Unix))
            }
            Ok(Object::PE(pe)) => {
                let deps = pe.libraries.iter().map(|l| l.to_string()).collect();
                Ok((deps, Platform::Windows))
            }
            Ok(_) => Err(Error::ScanError(format!(
                "{}: unsupported binary format",
                path.display()
            ))),
            Err(e) => Err(Error::ScanError(format!(
                "{}: parse failed: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Resolve a dependency name against the search paths.
    ///
    /// Order matters: the directory of the requesting binary wins (app
    /// private libraries), then the framework library directory, then
    /// extra paths, then the system directories.
    fn resolve_name(&self, name: &str, origin_dir: &Path) -> Option<PathBuf> {
        let mut candidates: Vec<&Path> = vec![origin_dir, &self.framework.libs];
        candidates.extend(self.extra_paths.iter().map(|p| p.as_path()));
        candidates.extend(self.system_paths.iter().map(|p| p.as_path()));

        for dir in candidates {
            if dir.as_os_str().is_empty() {
                continue;
            }
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Classify a resolved path by the directory it lives in
    fn classify(&self, path: &Path, origin_dir: &Path) -> LibPriority {
        if !self.framework.plugins.as_os_str().is_empty()
            && path.starts_with(&self.framework.plugins)
        {
            return LibPriority::Plugin;
        }
        if self.framework.contains(path) {
            return LibPriority::Framework;
        }
        if path.starts_with(origin_dir)
            || self.extra_paths.iter().any(|dir| path.starts_with(dir))
        {
            return LibPriority::Application;
        }
        LibPriority::System
    }
}

impl DependencyScanner for BinaryScanner {
    fn scan(&self, path: &Path) -> Result<Vec<LibRecord>> {
        let origin_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut records = Vec::new();
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut work: Vec<(PathBuf, usize)> = vec![(path.to_path_buf(), 0)];

        while let Some((current, depth)) = work.pop() {
            if depth >= self.depth_limit {
                debug!(
                    "depth limit {} reached at {}",
                    self.depth_limit,
                    current.display()
                );
                continue;
            }

            let (deps, platform) = match self.direct_deps(&current) {
                Ok(parsed) => parsed,
                Err(e) if depth == 0 => return Err(e),
                Err(e) => {
                    // Transitive members that fail to parse yield partial data
                    debug!("skipping unreadable dependency: {}", e);
                    continue;
                }
            };

            for name in deps {
                if self.ignore.matches(Path::new(&name)) {
                    debug!("{} excluded by ignore rule", name);
                    continue;
                }

                let Some(resolved) = self.resolve_name(&name, &origin_dir) else {
                    warn!("cannot resolve dependency {} of {}", name, current.display());
                    continue;
                };

                if !visited.insert(resolved.clone()) {
                    continue;
                }

                let priority = self.classify(&resolved, &origin_dir);
                records.push(LibRecord {
                    name: name.clone(),
                    path: resolved.clone(),
                    platform,
                    priority,
                });

                work.push((resolved, depth + 1));
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scanner_with(framework_libs: &Path, extra: &[PathBuf]) -> BinaryScanner {
        BinaryScanner {
            framework: FrameworkDirs {
                libs: framework_libs.to_path_buf(),
                plugins: framework_libs.parent().unwrap().join("plugins"),
                ..Default::default()
            },
            extra_paths: extra.to_vec(),
            system_paths: vec![],
            ignore: IgnoreRuleSet::default(),
            depth_limit: 4,
        }
    }

    #[test]
    fn test_is_scannable_extensions() {
        assert!(is_scannable(Path::new("/bin/app")));
        assert!(is_scannable(Path::new("app.exe")));
        assert!(is_scannable(Path::new("libfoo.dll")));
        assert!(is_scannable(Path::new("libfoo.so")));
        assert!(is_scannable(Path::new("libfoo.so.6")));
        assert!(!is_scannable(Path::new("readme.txt")));
        assert!(!is_scannable(Path::new("image.png")));
    }

    #[test]
    fn test_resolve_prefers_origin_dir() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("app");
        let fw_libs = temp.path().join("fw/lib");
        std::fs::create_dir_all(&origin).unwrap();
        std::fs::create_dir_all(&fw_libs).unwrap();
        std::fs::write(origin.join("libdup.so"), b"a").unwrap();
        std::fs::write(fw_libs.join("libdup.so"), b"b").unwrap();

        let scanner = scanner_with(&fw_libs, &[]);
        let resolved = scanner.resolve_name("libdup.so", &origin).unwrap();
        assert_eq!(resolved, origin.join("libdup.so"));
    }

    #[test]
    fn test_resolve_falls_back_to_framework() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("app");
        let fw_libs = temp.path().join("fw/lib");
        std::fs::create_dir_all(&origin).unwrap();
        std::fs::create_dir_all(&fw_libs).unwrap();
        std::fs::write(fw_libs.join("libAppCore.so.6"), b"x").unwrap();

        let scanner = scanner_with(&fw_libs, &[]);
        let resolved = scanner.resolve_name("libAppCore.so.6", &origin).unwrap();
        assert_eq!(resolved, fw_libs.join("libAppCore.so.6"));
        assert!(scanner.resolve_name("libmissing.so", &origin).is_none());
    }

    #[test]
    fn test_classify_by_location() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("app");
        let fw_libs = temp.path().join("fw/lib");
        let fw_plugins = temp.path().join("fw/plugins");
        let extra = temp.path().join("extra");
        std::fs::create_dir_all(&origin).unwrap();
        std::fs::create_dir_all(&fw_libs).unwrap();
        std::fs::create_dir_all(&fw_plugins).unwrap();
        std::fs::create_dir_all(&extra).unwrap();

        let scanner = scanner_with(&fw_libs, &[extra.clone()]);
        assert_eq!(
            scanner.classify(&fw_libs.join("libAppCore.so"), &origin),
            LibPriority::Framework
        );
        assert_eq!(
            scanner.classify(&fw_plugins.join("platforms/libqxcb.so"), &origin),
            LibPriority::Plugin
        );
        assert_eq!(
            scanner.classify(&origin.join("libpriv.so"), &origin),
            LibPriority::Application
        );
        assert_eq!(
            scanner.classify(&extra.join("libvendor.so"), &origin),
            LibPriority::Application
        );
        assert_eq!(
            scanner.classify(Path::new("/usr/lib/libc.so.6"), &origin),
            LibPriority::System
        );
    }

    #[test]
    fn test_scan_rejects_non_binary() {
        let temp = TempDir::new().unwrap();
        let fw_libs = temp.path().join("fw/lib");
        std::fs::create_dir_all(&fw_libs).unwrap();
        let bogus = temp.path().join("notabinary");
        std::fs::write(&bogus, b"just some text, not a binary").unwrap();

        let scanner = scanner_with(&fw_libs, &[]);
        assert!(scanner.scan(&bogus).is_err());
    }
}
