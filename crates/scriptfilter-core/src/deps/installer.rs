//! Dependency bootstrap.
//!
//! [`DependencyInstaller::ensure`] makes every requirement in the manifest
//! available in the project-local dependency directory. Progress is recorded in
//! an install stamp next to the packages so later runs can skip all work when
//! nothing changed:
//!
//! ```text
//! src/libs/.scriptfilter-stamp.json
//! {
//!   "schema_version": 1,
//!   "manifest_hash": "<blake3 of requirements.txt>",
//!   "packages": { "aiohttp": "aiohttp==3.8.4" }
//! }
//! ```
//!
//! `manifest_hash` is only written once every requirement is installed, so a
//! run killed halfway re-checks on the next start.

use super::backend::{InstallBackend, PipBackend};
use super::manifest::Manifest;
use super::resolved::ResolvedDependencies;
use crate::config::Config;
use crate::error::Error;
use crate::paths::stamp_file;
use crate::version::SCHEMA_VERSION;
use scriptfilter_util::fs::{atomic_write, read_if_exists};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Record of what is installed in a dependency directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallStamp {
    pub schema_version: u32,
    /// Hash of the manifest that was fully installed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_hash: Option<String>,
    /// Normalized name → installed requirement spec.
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
}

impl InstallStamp {
    fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            ..Self::default()
        }
    }

    /// Read the stamp in `package_dir`. Missing, unreadable or corrupt stamps are `None`.
    #[must_use]
    pub fn read(package_dir: &Path) -> Option<Self> {
        let path = stamp_file(package_dir);
        let bytes = match read_if_exists(&path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "install stamp unreadable, re-checking dependencies");
                return None;
            }
        };
        match serde_json::from_slice::<Self>(&bytes) {
            Ok(stamp) if stamp.schema_version == SCHEMA_VERSION => Some(stamp),
            Ok(stamp) => {
                warn!(
                    path = %path.display(),
                    found = stamp.schema_version,
                    expected = SCHEMA_VERSION,
                    "install stamp schema mismatch, re-checking dependencies"
                );
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "install stamp is corrupt, re-checking dependencies");
                None
            }
        }
    }

    fn write(&self, package_dir: &Path) -> Result<(), Error> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        atomic_write(&stamp_file(package_dir), text.as_bytes())?;
        Ok(())
    }
}

/// Installs the manifest's requirements into the dependency directory.
pub struct DependencyInstaller {
    manifest_path: PathBuf,
    package_dir: PathBuf,
    backend: Box<dyn InstallBackend>,
}

impl std::fmt::Debug for DependencyInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyInstaller")
            .field("manifest_path", &self.manifest_path)
            .field("package_dir", &self.package_dir)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl DependencyInstaller {
    /// Installer using the default pip backend.
    #[must_use]
    pub fn new(manifest_path: PathBuf, package_dir: PathBuf) -> Self {
        Self::with_backend(manifest_path, package_dir, Box::new(PipBackend::default()))
    }

    #[must_use]
    pub fn with_backend(
        manifest_path: PathBuf,
        package_dir: PathBuf,
        backend: Box<dyn InstallBackend>,
    ) -> Self {
        Self {
            manifest_path,
            package_dir,
            backend,
        }
    }

    /// Installer for the locations in `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.manifest_path(), config.package_dir.clone())
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    #[must_use]
    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    /// Parse the manifest, if there is one.
    pub fn manifest(&self) -> Result<Option<Manifest>, Error> {
        Manifest::load(&self.manifest_path)
    }

    /// Make every declared requirement available.
    ///
    /// A missing manifest means no dependencies. When the manifest hash matches
    /// the stamp and every package is present, no backend call is made.
    ///
    /// # Errors
    /// Returns the first manifest or install failure. Packages installed before
    /// the failure stay recorded in the stamp.
    pub fn ensure(&self) -> Result<ResolvedDependencies, Error> {
        let Some(manifest) = self.manifest()? else {
            debug!(path = %self.manifest_path.display(), "no dependency manifest");
            return Ok(ResolvedDependencies::none(self.package_dir.clone()));
        };

        let stamp = InstallStamp::read(&self.package_dir);
        let declared: BTreeMap<String, String> = manifest
            .iter()
            .map(|req| (req.normalized_name(), req.spec()))
            .collect();

        if manifest.is_empty() {
            debug!(path = %manifest.path.display(), "dependency manifest is empty");
            return Ok(ResolvedDependencies::new(self.package_dir.clone(), declared, 0));
        }

        let hash_matches = stamp
            .as_ref()
            .and_then(|s| s.manifest_hash.as_deref())
            .is_some_and(|hash| hash == manifest.content_hash);
        if hash_matches
            && manifest
                .iter()
                .all(|req| self.backend.is_present(&self.package_dir, req))
        {
            debug!(packages = manifest.len(), "dependencies up to date");
            return Ok(ResolvedDependencies::new(self.package_dir.clone(), declared, 0));
        }

        let mut next = stamp.unwrap_or_else(InstallStamp::new);
        // Requirements dropped from the manifest are forgotten, not uninstalled
        next.packages.retain(|name, _| declared.contains_key(name));
        next.manifest_hash = None;

        let mut installed = 0;
        for req in manifest.iter() {
            let name = req.normalized_name();
            let spec = req.spec();
            let unchanged = next.packages.get(&name) == Some(&spec);
            if unchanged && self.backend.is_present(&self.package_dir, req) {
                debug!(package = %spec, "dependency present");
                continue;
            }

            if !self.package_dir.exists() {
                fs::create_dir_all(&self.package_dir)?;
            }

            info!(package = %spec, backend = self.backend.name(), "installing dependency");
            self.backend.install(&self.package_dir, req)?;
            installed += 1;

            next.packages.insert(name, spec);
            next.write(&self.package_dir)?;
        }

        next.manifest_hash = Some(manifest.content_hash.clone());
        next.write(&self.package_dir)?;
        if installed > 0 {
            info!(installed, dir = %self.package_dir.display(), "dependencies installed");
        }

        Ok(ResolvedDependencies::new(
            self.package_dir.clone(),
            declared,
            installed,
        ))
    }
}
