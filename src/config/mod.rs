// src/config/mod.rs

//! Deployment configuration types
//!
//! A deployment is described by one [`DeployConfig`]: the output root,
//! the framework toolchain directories, a set of named packages (each
//! with its own targets and output layout) and the option toggles. The
//! config is deserializable from TOML and is passed explicitly into
//! pipeline construction; there is no ambient global state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed output subpaths of one package, relative to the package root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageLayout {
    /// Main binaries and launcher scripts
    pub bin: PathBuf,
    /// Bundled shared libraries
    pub lib: PathBuf,
    /// Framework plugin directories
    pub plugins: PathBuf,
    /// QML module tree
    pub qml: PathBuf,
    /// Translation catalogs
    pub translations: PathBuf,
    /// Framework resource files
    pub resources: PathBuf,
}

impl Default for PackageLayout {
    fn default() -> Self {
        Self {
            bin: PathBuf::from("bin"),
            lib: PathBuf::from("lib"),
            plugins: PathBuf::from("plugins"),
            qml: PathBuf::from("qml"),
            translations: PathBuf::from("translations"),
            resources: PathBuf::from("resources"),
        }
    }
}

impl PackageLayout {
    pub fn bin_dir(&self, package_root: &Path) -> PathBuf {
        package_root.join(&self.bin)
    }

    pub fn lib_dir(&self, package_root: &Path) -> PathBuf {
        package_root.join(&self.lib)
    }

    pub fn plugins_dir(&self, package_root: &Path) -> PathBuf {
        package_root.join(&self.plugins)
    }

    pub fn qml_dir(&self, package_root: &Path) -> PathBuf {
        package_root.join(&self.qml)
    }

    pub fn translations_dir(&self, package_root: &Path) -> PathBuf {
        package_root.join(&self.translations)
    }

    pub fn resources_dir(&self, package_root: &Path) -> PathBuf {
        package_root.join(&self.resources)
    }
}

/// One named package: a logical output root grouping targets that
/// share a distribution layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Main binaries to deploy into this package
    #[serde(default)]
    pub targets: Vec<PathBuf>,

    /// Output layout, defaulting to bin/lib/plugins/qml/translations/resources
    #[serde(default)]
    pub layout: PackageLayout,
}

/// Framework toolchain directories used for classification and as the
/// source of plugins, QML modules, translations and runtime helpers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkDirs {
    /// Framework tool binaries
    pub bins: PathBuf,
    /// Framework shared libraries
    pub libs: PathBuf,
    /// Plugin catalog root
    pub plugins: PathBuf,
    /// QML module tree root
    pub qml: PathBuf,
    /// Translation catalog directory
    pub translations: PathBuf,
    /// Resource files (web-runtime payload and friends)
    pub resources: PathBuf,
    /// Helper-process binaries (libexec)
    pub libexecs: PathBuf,
}

impl FrameworkDirs {
    /// True when the path lives under any of the framework directories
    pub fn contains(&self, path: &Path) -> bool {
        [
            &self.bins,
            &self.libs,
            &self.plugins,
            &self.qml,
            &self.translations,
            &self.resources,
            &self.libexecs,
        ]
        .into_iter()
        .any(|dir| !dir.as_os_str().is_empty() && path.starts_with(dir))
    }
}

/// Option toggles controlling the pipeline stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployOptions {
    /// Enable QML extraction (stage 3)
    pub deploy_qml: bool,
    /// Application QML source tree; enables from-source import analysis
    pub qml_source_dir: Option<PathBuf>,
    /// Copy the entire framework QML tree instead of the imported subset
    pub all_qml: bool,
    /// Also bundle libraries classified as system-provided
    pub bundle_system_libs: bool,
    /// Strip debug symbols from bundled binaries
    pub strip_binaries: bool,
    /// Replace same-named files already present in the output
    pub overwrite_existing: bool,
    /// Remove previously deployed files before this run
    pub clear_before_deploy: bool,
    /// Delete the whole output root instead of only ledgered files
    pub force_clear: bool,
    /// Re-scan copied plugins for all libraries, not only framework ones
    pub bundle_non_framework_plugins: bool,
    /// Extra plugins to bundle: absolute paths, or names resolved
    /// against the framework plugin root
    pub extra_plugins: Vec<String>,
    /// Skip translation deployment (stage 6)
    pub no_translations: bool,
    /// Substring identifying framework-named libraries; limits the
    /// re-scan of copied plugins when non-framework bundling is off
    pub framework_lib_filter: String,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            deploy_qml: false,
            qml_source_dir: None,
            all_qml: false,
            bundle_system_libs: false,
            strip_binaries: true,
            overwrite_existing: true,
            clear_before_deploy: false,
            force_clear: false,
            bundle_non_framework_plugins: false,
            extra_plugins: Vec::new(),
            no_translations: false,
            framework_lib_filter: "Qt".to_string(),
        }
    }
}

fn default_scan_depth() -> usize {
    8
}

/// Complete configuration for one deployment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Root directory receiving every package
    pub output_root: PathBuf,

    /// Packages keyed by name. The empty name is the default package
    /// and resolves to the output root itself.
    #[serde(default)]
    pub packages: BTreeMap<String, PackageConfig>,

    /// Framework toolchain directories
    #[serde(default)]
    pub framework: FrameworkDirs,

    /// Stage toggles
    #[serde(default)]
    pub options: DeployOptions,

    /// Recursion limit for transitive dependency resolution
    #[serde(default = "default_scan_depth")]
    pub scan_depth: usize,

    /// Glob patterns excluding dependencies and files from the kit
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Additional library search paths consulted by the scanner
    #[serde(default)]
    pub extra_lib_paths: Vec<PathBuf>,

    /// Override for the ledger store directory; the per-user data
    /// directory is used when unset
    #[serde(default)]
    pub ledger_dir: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::new(),
            packages: BTreeMap::new(),
            framework: FrameworkDirs::default(),
            options: DeployOptions::default(),
            scan_depth: default_scan_depth(),
            ignore: Vec::new(),
            extra_lib_paths: Vec::new(),
            ledger_dir: None,
        }
    }
}

impl DeployConfig {
    /// Load a configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Root directory of one package
    pub fn package_root(&self, name: &str) -> PathBuf {
        if name.is_empty() {
            self.output_root.clone()
        } else {
            self.output_root.join(name)
        }
    }

    /// Fail fast on configurations the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.output_root.as_os_str().is_empty() {
            return Err(Error::Config("output_root is not set".to_string()));
        }
        if self.packages.is_empty() {
            return Err(Error::Config("no packages configured".to_string()));
        }
        if self.packages.values().all(|p| p.targets.is_empty()) {
            return Err(Error::Config(
                "no targets configured in any package".to_string(),
            ));
        }
        Ok(())
    }
}
