// src/metafile.rs

//! Launcher script generation
//!
//! The finished tree gets one launcher per target, placed at the
//! package root. Launchers export the library/plugin/QML environment
//! relative to their own location and exec the binary, so the kit runs
//! from any checkout location. Scripts are written through the placer,
//! which ledgers them and sets the executable bit.

use crate::config::{DeployConfig, PackageLayout};
use crate::error::Result;
use crate::filesystem::FilePlacer;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// POSIX launcher for one target
fn launcher_script_unix(target_name: &str, layout: &PackageLayout) -> String {
    format!(
        "#!/bin/sh\n\
         BASE_DIR=$(dirname \"$(readlink -f \"$0\")\")\n\
         export LD_LIBRARY_PATH=\"$BASE_DIR/{lib}\":$LD_LIBRARY_PATH\n\
         export QT_PLUGIN_PATH=\"$BASE_DIR/{plugins}\":$QT_PLUGIN_PATH\n\
         export QML_IMPORT_PATH=\"$BASE_DIR/{qml}\":$QML_IMPORT_PATH\n\
         export QML2_IMPORT_PATH=\"$BASE_DIR/{qml}\":$QML2_IMPORT_PATH\n\
         \"$BASE_DIR/{bin}/{name}\" \"$@\"\n",
        lib = layout.lib.display(),
        plugins = layout.plugins.display(),
        qml = layout.qml.display(),
        bin = layout.bin.display(),
        name = target_name,
    )
}

/// Batch launcher for one target
fn launcher_script_windows(target_name: &str, layout: &PackageLayout) -> String {
    format!(
        "@echo off\r\n\
         set BASE_DIR=%~dp0\r\n\
         set PATH=%BASE_DIR%{lib};%PATH%\r\n\
         set QT_PLUGIN_PATH=%BASE_DIR%{plugins};%QT_PLUGIN_PATH%\r\n\
         set QML_IMPORT_PATH=%BASE_DIR%{qml};%QML_IMPORT_PATH%\r\n\
         \"%BASE_DIR%{bin}\\{name}.exe\" %*\r\n",
        lib = layout.lib.display(),
        plugins = layout.plugins.display(),
        qml = layout.qml.display(),
        bin = layout.bin.display(),
        name = target_name,
    )
}

/// Write launcher scripts for every target of every package
pub fn create_launchers(config: &DeployConfig, placer: &mut FilePlacer) -> Result<()> {
    let staging = tempfile::tempdir()?;

    for (package_name, package) in &config.packages {
        let package_root = config.package_root(package_name);

        for target in &package.targets {
            let Some(stem) = target.file_stem().and_then(|s| s.to_str()) else {
                warn!("target {} has no usable file name", target.display());
                continue;
            };

            let (file_name, contents) = if cfg!(windows) {
                (
                    format!("{}.bat", stem),
                    launcher_script_windows(stem, &package.layout),
                )
            } else {
                (
                    format!("{}.sh", stem),
                    launcher_script_unix(stem, &package.layout),
                )
            };

            let staged = staging.path().join(&file_name);
            fs::write(&staged, contents)?;

            if let Err(e) = placer.copy_file(&staged, &package_root, None) {
                warn!("launcher {} not written: {}", file_name, e);
                continue;
            }
            info!("created launcher {}", package_root.join(&file_name).display());
        }
    }

    Ok(())
}

/// Launcher file name for a target on this host, for callers that need
/// to reference the script after generation
pub fn launcher_name(target: &Path) -> Option<String> {
    let stem = target.file_stem()?.to_str()?;
    Some(if cfg!(windows) {
        format!("{}.bat", stem)
    } else {
        format!("{}.sh", stem)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_launcher_references_layout() {
        let script = launcher_script_unix("app", &PackageLayout::default());
        assert!(script.starts_with("#!/bin/sh"));
        assert!(script.contains("LD_LIBRARY_PATH=\"$BASE_DIR/lib\""));
        assert!(script.contains("\"$BASE_DIR/bin/app\" \"$@\""));
    }

    #[test]
    fn test_windows_launcher_references_layout() {
        let script = launcher_script_windows("app", &PackageLayout::default());
        assert!(script.starts_with("@echo off"));
        assert!(script.contains("app.exe"));
    }

    #[test]
    fn test_launcher_name_strips_extension() {
        let name = launcher_name(Path::new("/build/app.exe")).unwrap();
        assert!(name == "app.sh" || name == "app.bat");
    }
}
