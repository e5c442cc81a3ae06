// src/translations.rs

//! Library-to-translation mapping
//!
//! Translation catalogs in the framework tree are named by stem
//! (`appbase_de.qm`, `appdeclarative_fr.qm`, ...). Which stems a
//! package needs is derived from its bundled library names through a
//! lookup table. The table is injectable so distributions with custom
//! catalog layouts can supply their own mapping; the built-in default
//! covers the standard framework modules.

use std::collections::BTreeSet;

/// Mapping from library-name substrings to translation stems
#[derive(Debug, Clone)]
pub struct TranslationTable {
    entries: Vec<(String, Vec<String>)>,
}

impl Default for TranslationTable {
    /// Built-in table for the standard framework modules. The base
    /// catalog covers the core/gui/widgets/network family; feature
    /// modules have their own catalogs.
    fn default() -> Self {
        let entries = [
            ("Core", vec!["qtbase"]),
            ("Gui", vec!["qtbase"]),
            ("Widgets", vec!["qtbase"]),
            ("Network", vec!["qtbase"]),
            ("PrintSupport", vec!["qtbase"]),
            ("Sql", vec!["qtbase"]),
            ("Qml", vec!["qtdeclarative"]),
            ("Quick", vec!["qtdeclarative"]),
            ("Multimedia", vec!["qtmultimedia"]),
            ("WebSockets", vec!["qtwebsockets"]),
            ("WebEngine", vec!["qtwebengine"]),
            ("Positioning", vec!["qtlocation"]),
            ("SerialPort", vec!["qtserialport"]),
        ];
        Self {
            entries: entries
                .into_iter()
                .map(|(needle, stems)| {
                    (
                        needle.to_string(),
                        stems.into_iter().map(str::to_string).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl TranslationTable {
    /// Build a custom table from (library substring, stems) pairs
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Self {
        Self { entries }
    }

    /// Derive the translation stems required by a set of bundled
    /// library names. Unknown libraries contribute nothing.
    pub fn stems_for<'a>(&self, lib_names: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut stems = BTreeSet::new();
        for name in lib_names {
            for (needle, mapped) in &self.entries {
                if name.contains(needle.as_str()) {
                    stems.extend(mapped.iter().cloned());
                }
            }
        }
        stems
    }
}
