// src/modules.rs

//! Framework module detection and feature bitmask
//!
//! Every framework library a package links against maps to a module bit
//! (Gui, Network, Sql, ...). Bits accumulated while resolving targets
//! drive the later pipeline stages: plugin subsystems whose bit is
//! absent are skipped, translations are selected per module, and the
//! web-runtime stage only runs when [`Module::WebEngine`] was seen.
//!
//! Detection is data-driven: library base-names are matched against a
//! substring table, so versioned names (`libAppWebEngineCore.so.6`,
//! `AppNetwork6.dll`) resolve to the same bit.

use std::fmt;

/// One framework feature module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum Module {
    Core = 1 << 0,
    Gui = 1 << 1,
    Widgets = 1 << 2,
    Network = 1 << 3,
    Sql = 1 << 4,
    Multimedia = 1 << 5,
    Positioning = 1 << 6,
    Sensors = 1 << 7,
    WebSockets = 1 << 8,
    WebChannel = 1 << 9,
    Declarative = 1 << 10,
    Svg = 1 << 11,
    PrintSupport = 1 << 12,
    /// Web runtime: embedded browser engine with an out-of-process helper
    WebEngine = 1 << 13,
}

impl Module {
    /// Human-readable module name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Gui => "gui",
            Self::Widgets => "widgets",
            Self::Network => "network",
            Self::Sql => "sql",
            Self::Multimedia => "multimedia",
            Self::Positioning => "positioning",
            Self::Sensors => "sensors",
            Self::WebSockets => "websockets",
            Self::WebChannel => "webchannel",
            Self::Declarative => "declarative",
            Self::Svg => "svg",
            Self::PrintSupport => "printsupport",
            Self::WebEngine => "webengine",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Substring table mapping library base-names to module bits.
///
/// Longer, more specific substrings come first so that e.g. a
/// WebEngineWidgets library does not stop at the Widgets entry.
const MODULE_TABLE: &[(&str, Module)] = &[
    ("WebEngine", Module::WebEngine),
    ("WebSockets", Module::WebSockets),
    ("WebChannel", Module::WebChannel),
    ("PrintSupport", Module::PrintSupport),
    ("Positioning", Module::Positioning),
    ("Multimedia", Module::Multimedia),
    ("Sensors", Module::Sensors),
    ("Widgets", Module::Widgets),
    ("Network", Module::Network),
    ("Quick", Module::Declarative),
    ("Qml", Module::Declarative),
    ("Sql", Module::Sql),
    ("Svg", Module::Svg),
    ("Gui", Module::Gui),
    ("Core", Module::Core),
];

/// OR-accumulated set of framework module bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleSet(u64);

impl ModuleSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single module bit
    pub fn insert(&mut self, module: Module) {
        self.0 |= module as u64;
    }

    /// Check whether a module bit is present
    pub fn contains(&self, module: Module) -> bool {
        self.0 & module as u64 != 0
    }

    /// Merge another set into this one
    pub fn merge(&mut self, other: ModuleSet) {
        self.0 |= other.0;
    }

    /// True if no bits are set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Detect module bits from a library or plugin file name.
    ///
    /// Matches every table entry, not just the first: a name like
    /// `libAppWebEngineWidgets.so` carries both the WebEngine and the
    /// Widgets bit.
    pub fn detect(name: &str) -> Self {
        let mut set = Self::new();
        for (needle, module) in MODULE_TABLE {
            if name.contains(needle) {
                set.insert(*module);
            }
        }
        set
    }

    /// Raw bit value, for diagnostics
    pub fn bits(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (_, module) in MODULE_TABLE {
            if self.contains(*module) {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{}", module)?;
                first = false;
            }
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_single_module() {
        let set = ModuleSet::detect("libAppNetwork.so.6");
        assert!(set.contains(Module::Network));
        assert!(!set.contains(Module::Sql));
    }

    #[test]
    fn test_detect_compound_name() {
        let set = ModuleSet::detect("libAppWebEngineWidgets.so.6.2.0");
        assert!(set.contains(Module::WebEngine));
        assert!(set.contains(Module::Widgets));
    }

    #[test]
    fn test_detect_windows_name() {
        let set = ModuleSet::detect("AppSql6.dll");
        assert!(set.contains(Module::Sql));
    }

    #[test]
    fn test_detect_unrelated_name() {
        let set = ModuleSet::detect("libssl.so.3");
        assert!(set.is_empty());
    }

    #[test]
    fn test_merge_accumulates() {
        let mut set = ModuleSet::detect("libAppGui.so");
        set.merge(ModuleSet::detect("libAppQuick.so"));
        assert!(set.contains(Module::Gui));
        assert!(set.contains(Module::Declarative));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = ModuleSet::new();
        set.insert(Module::Core);
        let bits = set.bits();
        set.insert(Module::Core);
        assert_eq!(set.bits(), bits);
    }

    #[test]
    fn test_display_lists_modules() {
        let mut set = ModuleSet::new();
        set.insert(Module::Network);
        set.insert(Module::WebEngine);
        let rendered = set.to_string();
        assert!(rendered.contains("network"));
        assert!(rendered.contains("webengine"));
    }
}
