// src/lib.rs

//! Shipkit, a deployment kit builder
//!
//! Shipkit packages a built application into a self-contained
//! distribution kit: it resolves every transitive runtime dependency of
//! one or more binaries (shared libraries, plugins, QML modules,
//! translations, platform runtime redistributables) and places them
//! into a per-package output layout, optionally stripping debug
//! symbols.
//!
//! # Architecture
//!
//! - Explicit configuration: one [`config::DeployConfig`] value threaded
//!   through pipeline construction, no ambient state
//! - Nine ordered stages per package, driven by [`deploy::Deployer`]
//! - A persistent per-output-root ledger of every placed file, enabling
//!   incremental cleanup and full teardown
//! - Best-effort auxiliary stages: a failed plugin or translation never
//!   aborts the run

pub mod config;
pub mod deploy;
pub mod depmap;
mod error;
pub mod filesystem;
pub mod ignore;
pub mod metafile;
pub mod modules;
pub mod plugins;
pub mod qml;
pub mod scanner;
pub mod tools;
pub mod translations;

pub use config::{DeployConfig, DeployOptions, FrameworkDirs, PackageConfig, PackageLayout};
pub use deploy::Deployer;
pub use depmap::DependencyMap;
pub use error::{Error, Result};
pub use filesystem::{DeployLedger, FilePlacer};
pub use ignore::IgnoreRuleSet;
pub use modules::{Module, ModuleSet};
pub use scanner::{BinaryScanner, DependencyScanner, LibPriority, LibRecord, Platform};
pub use tools::{ToolOutcome, run_tool};
pub use translations::TranslationTable;
