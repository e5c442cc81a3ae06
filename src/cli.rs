// src/cli.rs

//! CLI definitions for the shipkit deployment tool
//!
//! Command-line flags map onto the deployment configuration toggles;
//! a TOML config file can carry the same settings, with flags taking
//! precedence.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shipkit")]
#[command(version)]
#[command(about = "Bundle applications with their runtime dependencies", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a distribution kit for one or more binaries
    Deploy {
        /// TOML configuration file describing the deployment
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Target binary to deploy (repeatable; default package)
        #[arg(short, long = "bin")]
        bins: Vec<PathBuf>,

        /// Output root receiving the kit
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Framework toolchain root (bin/lib/plugins/qml/translations
        /// subdirectories are derived from it)
        #[arg(long)]
        framework_root: Option<PathBuf>,

        /// Application QML source tree; enables from-source QML analysis
        #[arg(long)]
        qml_dir: Option<PathBuf>,

        /// Deploy the entire framework QML tree
        #[arg(long)]
        all_qml: bool,

        /// Also bundle OS-provided libraries
        #[arg(long)]
        system_libs: bool,

        /// Keep debug symbols in bundled binaries
        #[arg(long)]
        no_strip: bool,

        /// Keep existing files in the output instead of replacing them
        #[arg(long)]
        no_overwrite: bool,

        /// Remove previously deployed files before this run
        #[arg(long)]
        clear: bool,

        /// Delete the whole output root before this run
        #[arg(long)]
        force_clear: bool,

        /// Re-scan copied plugins for all libraries, not only
        /// framework-named ones
        #[arg(long)]
        all_plugin_libs: bool,

        /// Extra plugin to bundle: a path, or a name under the plugin
        /// root (repeatable)
        #[arg(long = "extra-plugin")]
        extra_plugins: Vec<String>,

        /// Glob pattern excluding matching dependencies (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,

        /// Skip translation deployment
        #[arg(long)]
        no_translations: bool,

        /// Additional library search path (repeatable)
        #[arg(long = "lib-path")]
        lib_paths: Vec<PathBuf>,

        /// Recursion limit for transitive dependency resolution
        #[arg(long)]
        recursion_depth: Option<usize>,
    },

    /// Remove a previous deployment from an output root
    Clean {
        /// TOML configuration file describing the deployment
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output root to clean
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delete the whole root instead of only ledgered files
        #[arg(long)]
        force: bool,
    },
}
