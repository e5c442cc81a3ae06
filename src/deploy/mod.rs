// src/deploy/mod.rs

//! The extraction pipeline
//!
//! [`Deployer`] turns configured targets into a populated distribution
//! kit through nine strictly ordered stages per package:
//!
//! 1. clear stale output (soft or forced)
//! 2. copy targets and resolve their dependency closures
//! 3. QML modules (from-source subset or the full tree)
//! 4. framework plugins selected by the accumulated module bitmask
//! 5. library placement and symbol stripping
//! 6. translations derived from the bundled library set
//! 7. the web-runtime helper process and resources
//! 8. the platform runtime redistributable
//! 9. launcher scripts
//!
//! Later stages key off state produced by earlier ones, most notably
//! the module bitmask, so the in-package order is mandatory. Stages
//! 3, 4, 6, 7 and 8 are best-effort: failures are logged and skipped,
//! the run always completes. The deployment ledger is merged from its
//! store before stage 1 and persisted after stage 9.

use crate::config::DeployConfig;
use crate::depmap::DependencyMap;
use crate::error::{Error, Result};
use crate::filesystem::{DeployLedger, FilePlacer};
use crate::ignore::IgnoreRuleSet;
use crate::metafile;
use crate::modules::Module;
use crate::plugins;
use crate::qml;
use crate::scanner::{is_scannable, DependencyScanner};
use crate::tools;
use crate::translations::TranslationTable;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Exclude suffixes for mirrored plugin directories
const PLUGIN_EXCLUDES: &[&str] = &[".so.debug", "d.dll"];

/// Exclude suffixes for the mirrored QML tree
const QML_EXCLUDES: &[&str] = &[".so.debug", "d.dll", ".pdb"];

/// Web-runtime helper process binary inside the framework libexec dir
#[cfg(not(windows))]
const WEB_RUNTIME_HELPER: &str = "QtWebEngineProcess";
#[cfg(windows)]
const WEB_RUNTIME_HELPER: &str = "QtWebEngineProcess.exe";

/// Locale bundle directory inside the framework translations dir
const WEB_RUNTIME_LOCALES: &str = "qtwebengine_locales";

/// Classify one binary's scanner records into a package map.
///
/// A free function so stages holding a mutable map borrow can still
/// reach the scanner. Records failing the mask or an ignore rule never
/// enter the map; a scan failure leaves partial data with a logged
/// diagnostic.
fn extract_into(
    scanner: &dyn DependencyScanner,
    ignore: &IgnoreRuleSet,
    bundle_system: bool,
    map: &mut DependencyMap,
    file: &Path,
    mask: Option<&str>,
) {
    if !is_scannable(file) {
        debug!("{} has an unsupported suffix, not scanned", file.display());
        return;
    }

    info!("resolving dependencies of {}", file.display());
    let records = match scanner.scan(file) {
        Ok(records) => records,
        Err(e) => {
            warn!("scan of {} failed: {}", file.display(), e);
            return;
        }
    };

    for record in records {
        if let Some(mask) = mask
            && !record.name.contains(mask)
        {
            continue;
        }
        if ignore.matches(Path::new(&record.name)) || ignore.matches(&record.path) {
            debug!("{} excluded by ignore rule", record.name);
            continue;
        }
        map.admit(&record, bundle_system);
    }
}

/// Nine-stage deployment pipeline over one configuration
pub struct Deployer<'a> {
    config: &'a DeployConfig,
    scanner: &'a dyn DependencyScanner,
    placer: FilePlacer,
    ignore: IgnoreRuleSet,
    maps: BTreeMap<String, DependencyMap>,
    translations: TranslationTable,
}

impl<'a> Deployer<'a> {
    /// Build a pipeline. Fails fast on configurations without
    /// resolvable packages or targets.
    pub fn new(config: &'a DeployConfig, scanner: &'a dyn DependencyScanner) -> Result<Self> {
        config.validate()?;

        let ledger = match &config.ledger_dir {
            Some(dir) => DeployLedger::with_store_dir(dir.clone()),
            None => DeployLedger::new(),
        };
        let ignore = IgnoreRuleSet::new(&config.ignore);
        let placer = FilePlacer::new(
            config.output_root.clone(),
            config.options.overwrite_existing,
            ignore.clone(),
            ledger,
        );

        Ok(Self {
            config,
            scanner,
            placer,
            ignore,
            maps: BTreeMap::new(),
            translations: TranslationTable::default(),
        })
    }

    /// Replace the library-to-translation lookup table
    pub fn with_translation_table(mut self, table: TranslationTable) -> Self {
        self.translations = table;
        self
    }

    /// Resolved dependency map of one package, once stage 2 has run
    pub fn dependency_map(&self, package: &str) -> Option<&DependencyMap> {
        self.maps.get(package)
    }

    /// The deployment ledger backing this pipeline
    pub fn ledger(&self) -> &DeployLedger {
        self.placer.ledger()
    }

    /// Mask limiting plugin re-scans to framework-named libraries,
    /// unless non-framework bundling was requested
    fn plugin_scan_mask(&self) -> Option<&'a str> {
        let config = self.config;
        if config.options.bundle_non_framework_plugins {
            None
        } else {
            Some(config.options.framework_lib_filter.as_str())
        }
    }

    /// Run the whole pipeline
    pub fn deploy(&mut self) -> Result<()> {
        let config = self.config;
        info!("deployment started");

        self.placer.ledger_mut().load(&config.output_root)?;

        // Stage 1: clear
        self.clear_stage();

        // Stage 2: binary extraction
        self.extract_all_targets();

        // Stage 3: QML
        if config.options.deploy_qml {
            if let Err(e) = self.extract_qml() {
                error!("QML not extracted: {}", e);
            }
        }

        // Stage 4: plugins
        self.extract_plugins();

        // Stage 5: placement and stripping
        self.place_files();

        // Stage 6: translations
        if !config.options.no_translations {
            self.copy_translations();
        }

        // Stage 7: web runtime
        self.extract_web_runtime();

        // Stage 8: platform redistributable
        self.deploy_redistributable();

        // Stage 9: launcher metafiles
        if let Err(e) = metafile::create_launchers(config, &mut self.placer) {
            warn!("launcher generation failed: {}", e);
        }

        self.placer.ledger().save(&config.output_root)?;

        info!("deployment done");
        Ok(())
    }

    /// Tear down a previous deployment without running the pipeline
    pub fn clean(&mut self, force: bool) -> Result<()> {
        let config = self.config;
        self.placer.ledger_mut().load(&config.output_root)?;
        self.placer.clear(&config.output_root, force)?;
        self.placer.ledger().save(&config.output_root)
    }

    /// Stage 1: remove stale output when requested
    fn clear_stage(&mut self) {
        let config = self.config;
        if !(config.options.clear_before_deploy || config.options.force_clear) {
            return;
        }
        if let Err(e) = self
            .placer
            .clear(&config.output_root, config.options.force_clear)
        {
            warn!("clear failed: {}", e);
        }
    }

    /// Stage 2: copy every target into its package and resolve its
    /// dependency closure into the package map
    fn extract_all_targets(&mut self) {
        let config = self.config;
        for (name, package) in &config.packages {
            self.maps.insert(name.clone(), DependencyMap::new());
            let package_root = config.package_root(name);
            let bin_dir = package.layout.bin_dir(&package_root);

            for target in &package.targets {
                if let Err(e) = self.placer.smart_copy(target, &bin_dir, None) {
                    warn!("target {} not copied: {}", target.display(), e);
                }

                extract_into(
                    self.scanner,
                    &self.ignore,
                    config.options.bundle_system_libs,
                    self.maps.get_mut(name).expect("map was just inserted"),
                    target,
                    None,
                );
            }
        }
    }

    /// Stage 3: copy QML modules and feed copied binaries back into
    /// extraction
    fn extract_qml(&mut self) -> Result<()> {
        let config = self.config;
        let qml_root = &config.framework.qml;
        if !qml_root.is_dir() {
            return Err(Error::NotFound(format!(
                "framework QML tree {} does not exist",
                qml_root.display()
            )));
        }

        let allowlist: Option<Vec<String>> = if let Some(source) = &config.options.qml_source_dir {
            let modules = qml::scan(qml_root, source)?;
            info!("{} QML modules required by source imports", modules.len());
            Some(
                modules
                    .iter()
                    .map(|dir| dir.to_string_lossy().to_string())
                    .collect(),
            )
        } else if config.options.all_qml {
            None
        } else {
            return Err(Error::Config(
                "deploy_qml is set but neither qml_source_dir nor all_qml is given".to_string(),
            ));
        };

        let mask = self.plugin_scan_mask();
        for (name, package) in &config.packages {
            let package_root = config.package_root(name);
            let qml_out = package.layout.qml_dir(&package_root);

            let mut copied = Vec::new();
            self.placer.copy_folder(
                qml_root,
                &qml_out,
                QML_EXCLUDES,
                Some(&mut copied),
                allowlist.as_deref(),
            )?;

            for item in &copied {
                if is_scannable(item) {
                    extract_into(
                        self.scanner,
                        &self.ignore,
                        config.options.bundle_system_libs,
                        self.maps.get_mut(name).expect("stage 2 filled the maps"),
                        item,
                        mask,
                    );
                }
            }
        }

        Ok(())
    }

    /// Copy one plugin directory and extract the dependencies of every
    /// binary it brought along
    fn copy_plugin(&mut self, plugin_dir: &Path, package_name: &str) -> Result<()> {
        let config = self.config;
        let package = &config.packages[package_name];
        let package_root = config.package_root(package_name);
        let dest = package
            .layout
            .plugins_dir(&package_root)
            .join(plugin_dir.file_name().unwrap_or_default());

        let mut copied = Vec::new();
        self.placer
            .copy_folder(plugin_dir, &dest, PLUGIN_EXCLUDES, Some(&mut copied), None)?;

        let mask = self.plugin_scan_mask();
        for item in &copied {
            if is_scannable(item) {
                extract_into(
                    self.scanner,
                    &self.ignore,
                    config.options.bundle_system_libs,
                    self.maps
                        .get_mut(package_name)
                        .expect("stage 2 filled the maps"),
                    item,
                    mask,
                );
            }
        }
        Ok(())
    }

    /// Stage 4: catalog plugins selected by the module bitmask, then
    /// user-specified extra plugins
    fn extract_plugins(&mut self) {
        let config = self.config;
        for name in config.packages.keys() {
            let modules = self
                .maps
                .get(name)
                .map(|map| map.modules())
                .unwrap_or_default();

            match plugins::scan(&config.framework.plugins, modules) {
                Ok(enabled) => {
                    for plugin_dir in enabled {
                        if let Err(e) = self.copy_plugin(&plugin_dir, name) {
                            warn!("plugin {} not copied: {}", plugin_dir.display(), e);
                        }
                    }
                }
                Err(e) => warn!("plugin catalog not scanned: {}", e),
            }

            self.copy_extra_plugins(name);
        }
    }

    /// User-specified extra plugins: a path, or a name resolved
    /// against the framework plugin root
    fn copy_extra_plugins(&mut self, package_name: &str) {
        let config = self.config;
        for extra in &config.options.extra_plugins {
            let candidate = {
                let as_path = PathBuf::from(extra);
                if as_path.exists() {
                    as_path
                } else {
                    config.framework.plugins.join(extra)
                }
            };

            if candidate.is_dir() {
                if let Err(e) = self.copy_plugin(&candidate, package_name) {
                    warn!("extra plugin {} not copied: {}", candidate.display(), e);
                }
            } else if candidate.is_file() {
                let package = &config.packages[package_name];
                let package_root = config.package_root(package_name);
                let dest = package.layout.plugins_dir(&package_root);
                let mask = self.plugin_scan_mask();

                match self.placer.copy_file(&candidate, &dest, None) {
                    Ok(_) => {
                        extract_into(
                            self.scanner,
                            &self.ignore,
                            config.options.bundle_system_libs,
                            self.maps
                                .get_mut(package_name)
                                .expect("stage 2 filled the maps"),
                            &candidate,
                            mask,
                        );
                    }
                    Err(e) => warn!("extra plugin {} not copied: {}", candidate.display(), e),
                }
            } else {
                warn!("extra plugin {} not found", extra);
            }
        }
    }

    /// Stage 5: place every resolved library and strip the package tree
    fn place_files(&mut self) {
        let config = self.config;
        for (name, package) in &config.packages {
            let Some(map) = self.maps.get(name) else {
                continue;
            };
            let package_root = config.package_root(name);
            let lib_dir = package.layout.lib_dir(&package_root);

            let mut to_place: Vec<PathBuf> = map.needed().iter().cloned().collect();
            if config.options.bundle_system_libs {
                to_place.extend(map.system().iter().cloned());
            }
            to_place.sort();

            for file in &to_place {
                if let Err(e) = self.placer.smart_copy(file, &lib_dir, None) {
                    warn!("{} not copied: {}", file.display(), e);
                }
            }

            if config.options.strip_binaries
                && let Err(e) = self.placer.strip(&package_root)
            {
                warn!("strip failed: {}", e);
            }
        }
    }

    /// Stage 6: translations for the bundled library set
    fn copy_translations(&mut self) {
        let config = self.config;
        let tr_root = &config.framework.translations;

        for (name, package) in &config.packages {
            let Some(map) = self.maps.get(name) else {
                continue;
            };

            let lib_names: Vec<String> = map
                .needed()
                .iter()
                .filter_map(|path| path.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .collect();
            let stems = self
                .translations
                .stems_for(lib_names.iter().map(String::as_str));
            if stems.is_empty() {
                debug!("package {:?} needs no translations", name);
                continue;
            }

            if !tr_root.is_dir() {
                warn!("translation directory {} does not exist", tr_root.display());
                return;
            }

            let package_root = config.package_root(name);
            let tr_out = package.layout.translations_dir(&package_root);

            let entries = match std::fs::read_dir(tr_root) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("cannot list {}: {}", tr_root.display(), e);
                    return;
                }
            };
            for entry in entries.flatten() {
                if !entry.path().is_file() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy().to_string();
                if stems.iter().any(|stem| file_name.contains(stem.as_str()))
                    && let Err(e) = self.placer.copy_file(&entry.path(), &tr_out, None)
                {
                    warn!("translation {} not copied: {}", file_name, e);
                }
            }

            if map.modules().contains(Module::WebEngine) {
                let locales = tr_root.join(WEB_RUNTIME_LOCALES);
                if let Err(e) = self.placer.copy_folder(
                    &locales,
                    &tr_out.join(WEB_RUNTIME_LOCALES),
                    &[],
                    None,
                    None,
                ) {
                    warn!("web-runtime locales not copied: {}", e);
                }
            }
        }
    }

    /// Stage 7: helper process and resources for web-runtime packages
    fn extract_web_runtime(&mut self) {
        let config = self.config;
        for (name, package) in &config.packages {
            let uses_web_runtime = self
                .maps
                .get(name)
                .is_some_and(|map| map.modules().contains(Module::WebEngine));
            if !uses_web_runtime {
                continue;
            }

            info!("deploying web runtime for package {:?}", name);
            let package_root = config.package_root(name);
            let helper = config.framework.libexecs.join(WEB_RUNTIME_HELPER);
            let bin_dir = package.layout.bin_dir(&package_root);

            if let Err(e) = self.placer.copy_file(&helper, &bin_dir, None) {
                warn!("web-runtime helper not copied: {}", e);
            }

            let res_out = package.layout.resources_dir(&package_root);
            if let Err(e) =
                self.placer
                    .copy_folder(&config.framework.resources, &res_out, &[], None, None)
            {
                warn!("web-runtime resources not copied: {}", e);
            }
        }
    }

    /// Stage 8: platform runtime redistributable, when one ships with
    /// the framework toolchain
    fn deploy_redistributable(&mut self) {
        let config = self.config;
        match tools::find_redistributable(&config.framework.bins) {
            Some(installer) => {
                if let Err(e) = self.placer.copy_file(&installer, &config.output_root, None) {
                    warn!("redistributable not copied: {}", e);
                }
            }
            None => debug!("no runtime redistributable found"),
        }
    }
}
