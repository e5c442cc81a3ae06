// src/main.rs

use anyhow::Result;
use clap::Parser;
use shipkit::Deployer;
use shipkit::config::{DeployConfig, FrameworkDirs, PackageConfig};
use shipkit::scanner::BinaryScanner;
use std::path::{Path, PathBuf};
use tracing::info;

mod cli;

use cli::{Cli, Commands};

/// Derive the framework directory set from a single toolchain root
fn framework_from_root(root: &Path) -> FrameworkDirs {
    FrameworkDirs {
        bins: root.join("bin"),
        libs: root.join("lib"),
        plugins: root.join("plugins"),
        qml: root.join("qml"),
        translations: root.join("translations"),
        resources: root.join("resources"),
        libexecs: root.join("libexec"),
    }
}

/// Config file when given, defaults otherwise (flags fill the rest)
fn base_config(config: Option<PathBuf>) -> Result<DeployConfig> {
    match config {
        Some(path) => Ok(DeployConfig::load(&path)?),
        None => Ok(DeployConfig::default()),
    }
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy {
            config,
            bins,
            output,
            framework_root,
            qml_dir,
            all_qml,
            system_libs,
            no_strip,
            no_overwrite,
            clear,
            force_clear,
            all_plugin_libs,
            extra_plugins,
            ignore,
            no_translations,
            lib_paths,
            recursion_depth,
        } => {
            let mut cfg = base_config(config)?;

            if let Some(output) = output {
                cfg.output_root = output;
            }
            if !bins.is_empty() {
                cfg.packages
                    .entry(String::new())
                    .or_insert_with(PackageConfig::default)
                    .targets
                    .extend(bins);
            }
            if let Some(root) = framework_root {
                cfg.framework = framework_from_root(&root);
            }
            if qml_dir.is_some() || all_qml {
                cfg.options.deploy_qml = true;
            }
            if let Some(dir) = qml_dir {
                cfg.options.qml_source_dir = Some(dir);
            }
            if all_qml {
                cfg.options.all_qml = true;
            }
            if system_libs {
                cfg.options.bundle_system_libs = true;
            }
            if no_strip {
                cfg.options.strip_binaries = false;
            }
            if no_overwrite {
                cfg.options.overwrite_existing = false;
            }
            if clear {
                cfg.options.clear_before_deploy = true;
            }
            if force_clear {
                cfg.options.force_clear = true;
            }
            if all_plugin_libs {
                cfg.options.bundle_non_framework_plugins = true;
            }
            cfg.options.extra_plugins.extend(extra_plugins);
            cfg.ignore.extend(ignore);
            if no_translations {
                cfg.options.no_translations = true;
            }
            cfg.extra_lib_paths.extend(lib_paths);
            if let Some(depth) = recursion_depth {
                cfg.scan_depth = depth;
            }

            let scanner = BinaryScanner::new(&cfg);
            let mut deployer = Deployer::new(&cfg, &scanner)?;
            deployer.deploy()?;

            println!(
                "Deployed {} package(s) to {}",
                cfg.packages.len(),
                cfg.output_root.display()
            );
            Ok(())
        }
        Commands::Clean {
            config,
            output,
            force,
        } => {
            let mut cfg = base_config(config)?;
            if let Some(output) = output {
                cfg.output_root = output;
            }
            if cfg.output_root.as_os_str().is_empty() {
                anyhow::bail!("no output root given; pass --output or --config");
            }

            info!("cleaning {}", cfg.output_root.display());

            // Teardown needs no packages, so drive the placement
            // engine directly instead of constructing a pipeline
            let ledger = match &cfg.ledger_dir {
                Some(dir) => shipkit::DeployLedger::with_store_dir(dir.clone()),
                None => shipkit::DeployLedger::new(),
            };
            let mut placer = shipkit::FilePlacer::new(
                cfg.output_root.clone(),
                cfg.options.overwrite_existing,
                shipkit::IgnoreRuleSet::new(&cfg.ignore),
                ledger,
            );
            placer.ledger_mut().load(&cfg.output_root)?;
            placer.clear(&cfg.output_root, force)?;
            placer.ledger().save(&cfg.output_root)?;

            println!("Cleaned {}", cfg.output_root.display());
            Ok(())
        }
    }
}
