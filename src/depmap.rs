// src/depmap.rs

//! Per-package dependency map
//!
//! One [`DependencyMap`] accumulates the resolved dependency closure of
//! a package: the `needed` set is always bundled, the `system` set only
//! when system-bundling is enabled, and the module bitmask records
//! which framework features the package uses. The map only grows
//! within a run; a path lives in at most one of the two sets.

use crate::modules::ModuleSet;
use crate::scanner::{LibPriority, LibRecord};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Resolved dependencies of one package, split by bundling policy
#[derive(Debug, Default, Clone)]
pub struct DependencyMap {
    needed: HashSet<PathBuf>,
    system: HashSet<PathBuf>,
    modules: ModuleSet,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a library that is always bundled. Idempotent; also feeds
    /// framework module detection from the file name.
    pub fn add_needed(&mut self, path: &Path) {
        if self.system.contains(path) {
            return;
        }
        if self.needed.insert(path.to_path_buf())
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
        {
            self.modules.merge(ModuleSet::detect(name));
        }
    }

    /// Record an OS-provided library, bundled only on request. Idempotent.
    pub fn add_system(&mut self, path: &Path) {
        if self.needed.contains(path) {
            return;
        }
        self.system.insert(path.to_path_buf());
    }

    pub fn contains_needed(&self, path: &Path) -> bool {
        self.needed.contains(path)
    }

    pub fn contains_system(&self, path: &Path) -> bool {
        self.system.contains(path)
    }

    /// Classify one scanner record into the map.
    ///
    /// System records are tracked only when `bundle_system` is set;
    /// every other priority is needed and always bundled. Ignore
    /// filtering happens before this point.
    pub fn admit(&mut self, record: &LibRecord, bundle_system: bool) {
        match record.priority {
            LibPriority::System => {
                if bundle_system && !self.contains_system(&record.path) {
                    self.add_system(&record.path);
                }
            }
            LibPriority::Application | LibPriority::Framework | LibPriority::Plugin => {
                if !self.contains_needed(&record.path) {
                    self.add_needed(&record.path);
                }
            }
        }
    }

    /// Libraries bundled unconditionally
    pub fn needed(&self) -> &HashSet<PathBuf> {
        &self.needed
    }

    /// Libraries bundled only when system-bundling is enabled
    pub fn system(&self) -> &HashSet<PathBuf> {
        &self.system
    }

    /// Accumulated framework feature bits
    pub fn modules(&self) -> ModuleSet {
        self.modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::Module;
    use crate::scanner::Platform;

    fn record(name: &str, path: &str, priority: LibPriority) -> LibRecord {
        LibRecord {
            name: name.to_string(),
            path: PathBuf::from(path),
            platform: Platform::Unix,
            priority,
        }
    }

    #[test]
    fn test_add_needed_is_idempotent() {
        let mut map = DependencyMap::new();
        map.add_needed(Path::new("/opt/lib/libfoo.so"));
        map.add_needed(Path::new("/opt/lib/libfoo.so"));
        assert_eq!(map.needed().len(), 1);
    }

    #[test]
    fn test_sets_stay_disjoint() {
        let mut map = DependencyMap::new();
        map.add_needed(Path::new("/opt/lib/libfoo.so"));
        map.add_system(Path::new("/opt/lib/libfoo.so"));
        assert!(map.contains_needed(Path::new("/opt/lib/libfoo.so")));
        assert!(!map.contains_system(Path::new("/opt/lib/libfoo.so")));

        map.add_system(Path::new("/usr/lib/libc.so.6"));
        map.add_needed(Path::new("/usr/lib/libc.so.6"));
        assert!(map.contains_system(Path::new("/usr/lib/libc.so.6")));
        assert!(!map.contains_needed(Path::new("/usr/lib/libc.so.6")));
    }

    #[test]
    fn test_admit_system_respects_toggle() {
        let mut map = DependencyMap::new();
        let libc = record("libc.so.6", "/usr/lib/libc.so.6", LibPriority::System);

        map.admit(&libc, false);
        assert!(map.system().is_empty());

        map.admit(&libc, true);
        assert!(map.contains_system(Path::new("/usr/lib/libc.so.6")));
        assert!(map.needed().is_empty());
    }

    #[test]
    fn test_admit_non_system_is_needed() {
        let mut map = DependencyMap::new();
        for priority in [
            LibPriority::Application,
            LibPriority::Framework,
            LibPriority::Plugin,
        ] {
            map.admit(&record("libx.so", "/opt/libx.so", priority), false);
        }
        assert_eq!(map.needed().len(), 1);
    }

    #[test]
    fn test_needed_feeds_module_bits() {
        let mut map = DependencyMap::new();
        map.add_needed(Path::new("/opt/fw/lib/libAppWebEngineCore.so.6"));
        assert!(map.modules().contains(Module::WebEngine));
    }

    #[test]
    fn test_system_does_not_feed_module_bits() {
        let mut map = DependencyMap::new();
        map.add_system(Path::new("/usr/lib/libAppNetwork.so.6"));
        assert!(map.modules().is_empty());
    }
}
