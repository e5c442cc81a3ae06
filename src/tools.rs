// src/tools.rs

//! Bounded external tool invocation
//!
//! Every subprocess the kit builder spawns (symbol stripping, installer
//! lookup helpers) runs with a nullified stdin and a hard timeout. A
//! timeout kills the child and is reported in the structured
//! [`ToolOutcome`]; callers treat it like any other tool failure:
//! logged and skipped, never fatal and never retried.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Default timeout for external tool invocation (60 seconds)
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Structured result of one tool run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Exit code, when the process exited on its own
    pub status: Option<i32>,
    /// True when the run was killed after the timeout elapsed
    pub timed_out: bool,
}

impl ToolOutcome {
    /// The tool ran to completion with a zero exit code
    pub fn success(&self) -> bool {
        !self.timed_out && self.status == Some(0)
    }
}

/// Run one external tool to completion with a bounded timeout.
///
/// Spawn failure (tool missing, not executable) is an error; a non-zero
/// exit or a timeout is reported in the outcome, not as an error.
pub fn run_tool(program: &Path, args: &[&str], timeout: Duration) -> Result<ToolOutcome> {
    debug!("running {} {:?}", program.display(), args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null()) // prevent stdin hangs
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::Tool(format!("cannot spawn {}: {}", program.display(), e)))?;

    match child.wait_timeout(timeout)? {
        Some(status) => Ok(ToolOutcome {
            status: status.code(),
            timed_out: false,
        }),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            warn!(
                "{} timed out after {} seconds",
                program.display(),
                timeout.as_secs()
            );
            Ok(ToolOutcome {
                status: None,
                timed_out: true,
            })
        }
    }
}

/// Strip debug symbols from one binary via the host `strip` tool
pub fn strip_binary(path: &Path) -> Result<()> {
    let strip = which::which("strip")
        .map_err(|_| Error::Tool("strip tool not found on this host".to_string()))?;

    let outcome = run_tool(&strip, &[&path.to_string_lossy()], DEFAULT_TOOL_TIMEOUT)?;
    if !outcome.success() {
        return Err(Error::Tool(format!(
            "strip failed on {} (status {:?}, timed out: {})",
            path.display(),
            outcome.status,
            outcome.timed_out
        )));
    }
    Ok(())
}

/// Locate a platform runtime-redistributable installer near the
/// framework binary directory. Absence is expected on most hosts.
pub fn find_redistributable(framework_bins: &Path) -> Option<PathBuf> {
    let mut candidates = vec![framework_bins.to_path_buf()];
    if let Some(parent) = framework_bins.parent() {
        candidates.push(parent.to_path_buf());
        candidates.push(parent.join("redist"));
    }

    for dir in candidates {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
            if (name.starts_with("vc_redist") || name.starts_with("vcredist"))
                && name.ends_with(".exe")
                && entry.path().is_file()
            {
                return Some(entry.path());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_outcome_success() {
        let ok = ToolOutcome {
            status: Some(0),
            timed_out: false,
        };
        let failed = ToolOutcome {
            status: Some(1),
            timed_out: false,
        };
        let hung = ToolOutcome {
            status: None,
            timed_out: true,
        };
        assert!(ok.success());
        assert!(!failed.success());
        assert!(!hung.success());
    }

    #[test]
    fn test_missing_tool_is_an_error() {
        let result = run_tool(
            Path::new("/nonexistent/shipkit-test-tool"),
            &[],
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }

    #[test]
    #[cfg(unix)]
    fn test_run_tool_captures_exit_code() {
        let outcome = run_tool(Path::new("/bin/sh"), &["-c", "exit 3"], DEFAULT_TOOL_TIMEOUT)
            .unwrap();
        assert_eq!(outcome.status, Some(3));
        assert!(!outcome.timed_out);
    }

    #[test]
    #[cfg(unix)]
    fn test_run_tool_times_out() {
        let outcome = run_tool(
            Path::new("/bin/sh"),
            &["-c", "sleep 5"],
            Duration::from_millis(100),
        )
        .unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.status, None);
    }

    #[test]
    fn test_find_redistributable() {
        let temp = TempDir::new().unwrap();
        let bins = temp.path().join("bin");
        std::fs::create_dir_all(&bins).unwrap();
        assert!(find_redistributable(&bins).is_none());

        std::fs::write(temp.path().join("vc_redist.x64.exe"), b"installer").unwrap();
        let found = find_redistributable(&bins).unwrap();
        assert_eq!(found, temp.path().join("vc_redist.x64.exe"));
    }
}
