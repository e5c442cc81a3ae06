// src/plugins.rs

//! Framework plugin catalog
//!
//! Plugins live in subsystem directories under the framework plugin
//! root (`platforms/`, `sqldrivers/`, ...). Each subsystem is enabled
//! by one framework module bit; scanning the catalog returns the
//! subsystem directories whose bit is present in a package's
//! accumulated bitmask, so a package never ships plugin subsystems it
//! cannot load.

use crate::error::{Error, Result};
use crate::modules::{Module, ModuleSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Catalog table: plugin subsystem directory name -> enabling module
const PLUGIN_TABLE: &[(&str, Module)] = &[
    ("platforms", Module::Gui),
    ("platformthemes", Module::Gui),
    ("platforminputcontexts", Module::Gui),
    ("imageformats", Module::Gui),
    ("iconengines", Module::Gui),
    ("xcbglintegrations", Module::Gui),
    ("generic", Module::Gui),
    ("styles", Module::Widgets),
    ("sqldrivers", Module::Sql),
    ("audio", Module::Multimedia),
    ("mediaservice", Module::Multimedia),
    ("playlistformats", Module::Multimedia),
    ("multimedia", Module::Multimedia),
    ("position", Module::Positioning),
    ("sensors", Module::Sensors),
    ("printsupport", Module::PrintSupport),
    ("bearer", Module::Network),
    ("tls", Module::Network),
    ("networkinformation", Module::Network),
    ("scenegraph", Module::Declarative),
    ("qmltooling", Module::Declarative),
];

/// Module bit that enables a plugin subsystem directory, if catalogued
pub fn required_module(dir_name: &str) -> Option<Module> {
    PLUGIN_TABLE
        .iter()
        .find(|(name, _)| *name == dir_name)
        .map(|(_, module)| *module)
}

/// Enumerate the plugin subsystem directories enabled by a package's
/// module bitmask. Subsystems absent from the catalog, and subsystems
/// whose module bit is missing, are skipped entirely.
pub fn scan(plugins_root: &Path, modules: ModuleSet) -> Result<Vec<PathBuf>> {
    if !plugins_root.is_dir() {
        return Err(Error::NotFound(format!(
            "plugin root {} does not exist",
            plugins_root.display()
        )));
    }

    let mut enabled = Vec::new();
    for entry in fs::read_dir(plugins_root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        match required_module(&name) {
            Some(module) if modules.contains(module) => enabled.push(entry.path()),
            Some(module) => {
                debug!("plugin subsystem {} skipped: {} not used", name, module);
            }
            None => {
                debug!("plugin subsystem {} not in catalog", name);
            }
        }
    }

    enabled.sort();
    Ok(enabled)
}
