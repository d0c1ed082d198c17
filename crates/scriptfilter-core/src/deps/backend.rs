//! Installer backends.
//!
//! A backend knows how to put one requirement into a target directory and how
//! to tell whether it is already there. [`PipBackend`] shells out to
//! `python3 -m pip install --target`.

use super::manifest::{normalize_name, Requirement};
use crate::error::Error;
use scriptfilter_util::text::{tail_lines, truncate};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Interpreter used when none is configured.
pub const DEFAULT_PYTHON: &str = "python3";

/// Number of trailing stderr lines kept in an install error.
const ERROR_TAIL_LINES: usize = 8;
/// Byte cap on the stderr excerpt kept in an install error.
const ERROR_MAX_BYTES: usize = 1024;

/// Installs requirements into a target directory.
pub trait InstallBackend {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Install `requirement` into `target`.
    ///
    /// # Errors
    /// Returns an error if the installer cannot be started or reports failure.
    fn install(&self, target: &Path, requirement: &Requirement) -> Result<(), Error>;

    /// Whether `requirement` is already present in `target`.
    fn is_present(&self, target: &Path, requirement: &Requirement) -> bool;
}

/// Backend driving `pip` through a Python interpreter.
#[derive(Debug, Clone)]
pub struct PipBackend {
    program: String,
}

impl Default for PipBackend {
    fn default() -> Self {
        Self::new(DEFAULT_PYTHON)
    }
}

impl PipBackend {
    /// Use `program` (a name looked up on `PATH`, or a path) as the interpreter.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn resolve_program(&self) -> Result<PathBuf, Error> {
        which::which(&self.program).map_err(|source| Error::InstallerNotFound {
            program: self.program.clone(),
            source,
        })
    }
}

impl InstallBackend for PipBackend {
    fn name(&self) -> &str {
        "pip"
    }

    fn install(&self, target: &Path, requirement: &Requirement) -> Result<(), Error> {
        let program = self.resolve_program()?;
        let spec = requirement.spec();

        let output = Command::new(&program)
            .args([
                "-m",
                "pip",
                "install",
                "--disable-pip-version-check",
                "--no-input",
                "--quiet",
                "--upgrade",
                "--target",
            ])
            .arg(target)
            .arg(&spec)
            .output()
            .map_err(|e| Error::Install {
                package: requirement.name.clone(),
                message: format!("failed to run {}: {e}", program.display()),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!(target: "scriptfilter::pip", "{line}");
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let excerpt = tail_lines(&stderr, ERROR_TAIL_LINES);
        let status = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |code| code.to_string());
        let message = if excerpt.is_empty() {
            format!("pip exited with status {status}")
        } else {
            format!(
                "pip exited with status {status}: {}",
                truncate(&excerpt, ERROR_MAX_BYTES)
            )
        };

        Err(Error::Install {
            package: spec,
            message,
        })
    }

    fn is_present(&self, target: &Path, requirement: &Requirement) -> bool {
        dist_info_present(target, &requirement.normalized_name())
    }
}

/// Whether `target` holds a `<name>-<version>.dist-info` directory for `normalized`.
fn dist_info_present(target: &Path, normalized: &str) -> bool {
    let Ok(entries) = fs::read_dir(target) else {
        return false;
    };

    entries.flatten().any(|entry| {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            return false;
        };
        let Some(stem) = name.strip_suffix(".dist-info") else {
            return false;
        };
        // Distribution name is everything before the version separator
        let dist = stem.split_once('-').map_or(stem, |(dist, _)| dist);
        entry.path().is_dir() && normalize_name(dist) == normalized
    })
}
