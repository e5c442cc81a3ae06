// src/filesystem/placer.rs

//! Idempotent file placement engine
//!
//! [`FilePlacer`] performs every write the pipeline makes to an output
//! root: single-file copy/move with a native-then-byte-stream fallback,
//! smart copy (move when the source already lives inside the output
//! root), recursive tree mirroring with exclude suffixes and ignore
//! rules, symbol stripping, and incremental or forced teardown.
//!
//! Every successful placement is registered in the deployment ledger
//! before the call returns, so a soft clear can later remove exactly
//! what a run placed and nothing else.

use super::ledger::DeployLedger;
use super::path::is_library_file;
#[cfg(unix)]
use super::path::wants_exec_bit;
use crate::error::{Error, Result};
use crate::ignore::IgnoreRuleSet;
use crate::tools;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Placement engine bound to one output root
#[derive(Debug)]
pub struct FilePlacer {
    ledger: DeployLedger,
    output_root: PathBuf,
    overwrite: bool,
    ignore: IgnoreRuleSet,
}

impl FilePlacer {
    pub fn new(
        output_root: PathBuf,
        overwrite: bool,
        ignore: IgnoreRuleSet,
        ledger: DeployLedger,
    ) -> Self {
        Self {
            ledger,
            output_root,
            overwrite,
            ignore,
        }
    }

    pub fn ledger(&self) -> &DeployLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DeployLedger {
        &mut self.ledger
    }

    /// Create a directory (and missing ancestors) on demand, recording
    /// every newly created level in the ledger so soft clears can
    /// remove them once empty.
    fn init_dir(&mut self, dir: &Path) -> Result<()> {
        if dir.exists() {
            return Ok(());
        }

        let mut missing = vec![dir.to_path_buf()];
        let mut cursor = dir.to_path_buf();
        while let Some(parent) = cursor.parent() {
            if parent.exists() || parent.as_os_str().is_empty() {
                break;
            }
            missing.push(parent.to_path_buf());
            cursor = parent.to_path_buf();
        }

        fs::create_dir_all(dir)?;
        for created in missing {
            self.ledger.add(&created);
        }
        Ok(())
    }

    /// Register a successful placement: ledger entry plus
    /// executable-bit normalization for suffix-less, `.run` and `.sh`
    /// files on the Unix family.
    fn register(&mut self, path: &Path) {
        self.ledger.add(path);

        #[cfg(unix)]
        if path.is_file() && wants_exec_bit(path) {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o755)) {
                warn!("cannot set permissions on {}: {}", path.display(), e);
            }
        }
    }

    /// Raw byte-stream copy, the fallback when the native operation
    /// fails (cross-device moves, exotic filesystems)
    fn byte_copy(source: &Path, dest: &Path) -> Result<()> {
        let mut reader = fs::File::open(source)
            .map_err(|e| Error::IoError(format!("cannot open {}: {}", source.display(), e)))?;
        let mut writer = fs::File::create(dest)
            .map_err(|e| Error::IoError(format!("cannot create {}: {}", dest.display(), e)))?;
        io::copy(&mut reader, &mut writer)
            .map_err(|e| Error::IoError(format!("cannot write {}: {}", dest.display(), e)))?;

        if !dest.exists() {
            return Err(Error::IoError(format!(
                "{} was not created; check access to the target directory",
                dest.display()
            )));
        }
        Ok(())
    }

    /// Copy or move one file into a destination directory.
    ///
    /// Returns Ok(true) when the file was placed (or already present
    /// with overwriting disabled), Ok(false) when an allowlist skipped
    /// it. Both placement strategies failing is an error.
    fn file_action(
        &mut self,
        source: &Path,
        dest_dir: &Path,
        allowlist: Option<&[String]>,
        is_move: bool,
    ) -> Result<bool> {
        if let Some(allow) = allowlist {
            let haystack = source.to_string_lossy();
            if !allow.iter().any(|entry| haystack.contains(entry.as_str())) {
                debug!(
                    "skip {}: {} not on allowlist",
                    if is_move { "move" } else { "copy" },
                    source.display()
                );
                return Ok(false);
            }
        }

        let name = source
            .file_name()
            .ok_or_else(|| Error::IoError(format!("{} has no file name", source.display())))?;
        let dest = dest_dir.join(name);

        self.init_dir(dest_dir)?;

        let same = std::path::absolute(source)
            .and_then(|s| std::path::absolute(&dest).map(|d| s == d))
            .unwrap_or(false);
        if same {
            return Ok(true);
        }

        if dest.exists() {
            if self.overwrite {
                self.remove_file(&dest)?;
            } else {
                debug!("{} already exists, overwriting disabled", dest.display());
                return Ok(true);
            }
        }

        info!(
            "{} {} -> {}",
            if is_move { "move" } else { "copy" },
            source.display(),
            dest_dir.display()
        );

        let primary = if is_move {
            fs::rename(source, &dest)
        } else {
            fs::copy(source, &dest).map(|_| ())
        };

        if let Err(e) = primary {
            warn!(
                "native operation failed for {} ({}); falling back to byte copy",
                source.display(),
                e
            );
            Self::byte_copy(source, &dest)?;
            if is_move && let Err(e) = fs::remove_file(source) {
                warn!("cannot remove moved source {}: {}", source.display(), e);
            }
        }

        self.register(&dest);
        Ok(true)
    }

    /// Copy one file into a destination directory
    pub fn copy_file(
        &mut self,
        source: &Path,
        dest_dir: &Path,
        allowlist: Option<&[String]>,
    ) -> Result<bool> {
        self.file_action(source, dest_dir, allowlist, false)
    }

    /// Move one file into a destination directory
    pub fn move_file(
        &mut self,
        source: &Path,
        dest_dir: &Path,
        allowlist: Option<&[String]>,
    ) -> Result<bool> {
        self.file_action(source, dest_dir, allowlist, true)
    }

    /// Prefer a move when the source already lives inside the output
    /// root (re-deploys would otherwise leave stray duplicates); fall
    /// back to a plain copy.
    pub fn smart_copy(
        &mut self,
        source: &Path,
        dest_dir: &Path,
        allowlist: Option<&[String]>,
    ) -> Result<bool> {
        if source.starts_with(&self.output_root) {
            match self.move_file(source, dest_dir, allowlist) {
                Ok(placed) => return Ok(placed),
                Err(e) => {
                    warn!("{} not moved ({}); trying copy", source.display(), e);
                }
            }
        }
        self.copy_file(source, dest_dir, allowlist)
    }

    /// Recursively mirror a tree.
    ///
    /// Files whose name contains an exclude suffix, or which match an
    /// ignore rule, are skipped. Per-file failures are logged and the
    /// walk continues. Destination paths of copied leaves are appended
    /// to `copied` so callers can feed them back into extraction.
    pub fn copy_folder(
        &mut self,
        from: &Path,
        to: &Path,
        excludes: &[&str],
        mut copied: Option<&mut Vec<PathBuf>>,
        allowlist: Option<&[String]>,
    ) -> Result<()> {
        if !from.is_dir() {
            return Err(Error::NotFound(format!(
                "{} does not exist or is not a directory",
                from.display()
            )));
        }

        for entry in fs::read_dir(from)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                self.copy_folder(
                    &path,
                    &to.join(entry.file_name()),
                    excludes,
                    copied.as_deref_mut(),
                    allowlist,
                )?;
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(suffix) = excludes.iter().find(|s| name.contains(**s)) {
                debug!("{} excluded by suffix {}", path.display(), suffix);
                continue;
            }
            if self.ignore.matches(&path) {
                debug!("{} excluded by ignore rule", path.display());
                continue;
            }

            match self.copy_file(&path, to, allowlist) {
                Ok(true) => {
                    if let Some(list) = copied.as_deref_mut() {
                        list.push(to.join(entry.file_name()));
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("{} not copied: {}", path.display(), e);
                }
            }
        }

        Ok(())
    }

    /// Strip debug symbols from every dynamic library under a tree,
    /// visiting directory contents before the directory itself so each
    /// entry is handled exactly once. Tool failures are logged and
    /// skipped; on Windows hosts stripping is a no-op success.
    pub fn strip(&self, root: &Path) -> Result<()> {
        if cfg!(windows) {
            return Ok(());
        }

        if !root.exists() {
            return Err(Error::NotFound(format!("{} does not exist", root.display())));
        }

        for entry in walkdir::WalkDir::new(root).contents_first(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("strip walk error: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_library_file(entry.path()) {
                continue;
            }
            if let Err(e) = tools::strip_binary(entry.path()) {
                warn!("{}", e);
            }
        }

        Ok(())
    }

    /// Remove stale output.
    ///
    /// Force mode deletes the whole root (falling back to ledgered
    /// removal when that fails). Soft mode removes only ledgered files,
    /// largest first, then ledgered directories that ended up empty;
    /// content the ledger does not know about is preserved. The
    /// in-memory ledger is reset afterwards.
    pub fn clear(&mut self, root: &Path, force: bool) -> Result<()> {
        info!("clearing previous deployment data under {}", root.display());

        if force {
            match fs::remove_dir_all(root) {
                Ok(()) => {
                    self.ledger.reset();
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.ledger.reset();
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "cannot remove {} recursively ({}); removing ledgered files instead",
                        root.display(),
                        e
                    );
                }
            }
        }

        let mut files: Vec<(u64, PathBuf)> = Vec::new();
        let mut dirs: Vec<PathBuf> = Vec::new();
        for path in self.ledger.files() {
            match fs::metadata(path) {
                Ok(meta) if meta.is_file() => files.push((meta.len(), path.clone())),
                Ok(meta) if meta.is_dir() => dirs.push(path.clone()),
                _ => {}
            }
        }

        // Largest files go first; ties break on the path for stable logs
        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        for (_, path) in files {
            if self.remove_file(&path).is_ok() {
                info!("removed deployed file {}", path.display());
            }
        }

        // Deepest directories first so nested empties collapse upwards
        dirs.sort_by(|a, b| b.components().count().cmp(&a.components().count()));
        for dir in dirs {
            let empty = fs::read_dir(&dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if empty && fs::remove_dir(&dir).is_ok() {
                info!("removed empty directory {}", dir.display());
            }
        }

        self.ledger.reset();
        Ok(())
    }

    /// Remove one file, warning when the removal fails
    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| {
            warn!("cannot remove {}: {}", path.display(), e);
            Error::IoError(format!("cannot remove {}: {}", path.display(), e))
        })
    }
}
