// src/filesystem/ledger.rs

//! Persistent record of deployed files
//!
//! The ledger tracks every file a run has placed under an output root.
//! It is loaded (merged, never replaced) at run start, appended on
//! every successful placement and persisted at run end, so repeated
//! runs against the same root always know every file ever placed
//! there. Soft clears and teardown are driven from it.
//!
//! Store format: one file per output root, named by the SHA-256 of the
//! absolute root path. Each line is `{crc32_hex}|{json}`; reading stops
//! at the first corrupted record so a torn write only loses the tail.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One record in a ledger store file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum LedgerRecord {
    /// Store header identifying the output root
    Root { root: PathBuf, saved_at: DateTime<Utc> },
    /// One placed file or created directory
    Placed { path: PathBuf },
}

/// Default store location under the user data directory
fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("shipkit")
        .join("ledgers")
}

/// Ledger of every path placed under an output root
#[derive(Debug)]
pub struct DeployLedger {
    files: HashSet<PathBuf>,
    store_dir: PathBuf,
}

impl Default for DeployLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployLedger {
    /// Ledger backed by the default per-user store
    pub fn new() -> Self {
        Self::with_store_dir(default_store_dir())
    }

    /// Ledger backed by an explicit store directory
    pub fn with_store_dir(store_dir: PathBuf) -> Self {
        Self {
            files: HashSet::new(),
            store_dir,
        }
    }

    /// Store file path for one output root
    fn store_path(&self, root: &Path) -> PathBuf {
        let absolute = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        let digest = Sha256::digest(absolute.to_string_lossy().as_bytes());
        let mut name = String::with_capacity(64);
        for byte in digest {
            name.push_str(&format!("{:02x}", byte));
        }
        self.store_dir.join(format!("{}.ledger", name))
    }

    /// Record one placed path. Returns true when it was not known yet.
    pub fn add(&mut self, path: &Path) -> bool {
        self.files.insert(path.to_path_buf())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.files.remove(path)
    }

    /// All known paths, unordered
    pub fn files(&self) -> &HashSet<PathBuf> {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Forget everything placed so far (after a clear)
    pub fn reset(&mut self) {
        self.files.clear();
    }

    /// Merge the persisted store for this root into the in-memory set.
    /// A missing store is not an error; the root was never deployed to.
    pub fn load(&mut self, root: &Path) -> Result<()> {
        let store = self.store_path(root);
        let file = match File::open(&store) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no ledger store for {}", root.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(file);
        let mut merged = 0usize;

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.is_empty() {
                continue;
            }

            let Some((crc_hex, json)) = line.split_once('|') else {
                warn!("malformed ledger line {}: missing delimiter", line_num + 1);
                continue;
            };

            let expected_crc = u32::from_str_radix(crc_hex, 16).map_err(|_| {
                Error::IoError(format!("invalid CRC32 at ledger line {}", line_num + 1))
            })?;
            let actual_crc = crc32fast::hash(json.as_bytes());
            if expected_crc != actual_crc {
                warn!(
                    "ledger CRC mismatch at line {}: expected {:08x}, got {:08x}",
                    line_num + 1,
                    expected_crc,
                    actual_crc
                );
                // Stop reading at first corrupted record
                break;
            }

            let record: LedgerRecord = serde_json::from_str(json).map_err(|e| {
                Error::IoError(format!("bad ledger record at line {}: {}", line_num + 1, e))
            })?;

            if let LedgerRecord::Placed { path } = record {
                if self.files.insert(path) {
                    merged += 1;
                }
            }
        }

        debug!("merged {} ledgered paths for {}", merged, root.display());
        Ok(())
    }

    /// Persist the in-memory set for this root, atomically replacing
    /// any previous store.
    pub fn save(&self, root: &Path) -> Result<()> {
        fs::create_dir_all(&self.store_dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.store_dir)?;
        let mut write_record = |record: &LedgerRecord| -> Result<()> {
            let json = serde_json::to_string(record)
                .map_err(|e| Error::IoError(format!("cannot serialize ledger record: {}", e)))?;
            let crc = crc32fast::hash(json.as_bytes());
            writeln!(temp, "{:08x}|{}", crc, json)?;
            Ok(())
        };

        write_record(&LedgerRecord::Root {
            root: root.to_path_buf(),
            saved_at: Utc::now(),
        })?;

        // Sorted so identical sets serialize identically
        let mut paths: Vec<&PathBuf> = self.files.iter().collect();
        paths.sort();
        for path in paths {
            write_record(&LedgerRecord::Placed { path: path.clone() })?;
        }

        temp.flush()?;
        temp.persist(self.store_path(root))
            .map_err(|e| Error::IoError(format!("cannot persist ledger store: {}", e)))?;

        Ok(())
    }
}
