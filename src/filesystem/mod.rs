// src/filesystem/mod.rs

//! Filesystem operations for shipkit
//!
//! This module provides:
//! - The file placement engine with copy/move fallback and teardown
//! - The deployment ledger recording every file placed under a root
//! - Path classification helpers shared across the pipeline

mod ledger;
mod path;
mod placer;

pub use ledger::DeployLedger;
pub use path::{complete_suffix, is_library_file, wants_exec_bit};
pub use placer::FilePlacer;
