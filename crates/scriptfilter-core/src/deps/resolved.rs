use super::manifest::normalize_name;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Where the declared dependencies live once bootstrap succeeded.
///
/// Handlers use this to run helper programs against the installed packages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDependencies {
    dir: PathBuf,
    /// Normalized name → requirement spec, in name order.
    packages: BTreeMap<String, String>,
    /// Number of packages installed by this run.
    installed: usize,
}

impl ResolvedDependencies {
    #[must_use]
    pub fn new(dir: PathBuf, packages: BTreeMap<String, String>, installed: usize) -> Self {
        Self {
            dir,
            packages,
            installed,
        }
    }

    /// Nothing declared: no manifest, or an empty one.
    #[must_use]
    pub fn none(dir: PathBuf) -> Self {
        Self::new(dir, BTreeMap::new(), 0)
    }

    /// The dependency directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn packages(&self) -> impl Iterator<Item = (&str, &str)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// How many packages this run had to install (0 on the fast path).
    #[must_use]
    pub fn installed(&self) -> usize {
        self.installed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Directory of an importable top-level package or module named `name`.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let module = normalize_name(name).replace('-', "_");
        let package = self.dir.join(&module);
        if package.is_dir() {
            return Some(package);
        }
        let file = self.dir.join(format!("{module}.py"));
        file.is_file().then_some(file)
    }

    /// Value for `PYTHONPATH`: the dependency directory ahead of any inherited entries.
    #[must_use]
    pub fn search_path(&self) -> OsString {
        prepend_path(&self.dir, std::env::var_os("PYTHONPATH"))
    }

    /// Console scripts installed alongside the packages.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.dir.join("bin")
    }

    /// A command for `program` that sees the installed dependencies.
    #[must_use]
    pub fn command(&self, program: impl AsRef<std::ffi::OsStr>) -> Command {
        let mut cmd = Command::new(program);
        cmd.env("PYTHONPATH", self.search_path());
        let bin_dir = self.bin_dir();
        if bin_dir.is_dir() {
            cmd.env("PATH", prepend_path(&bin_dir, std::env::var_os("PATH")));
        }
        cmd
    }
}

fn prepend_path(first: &Path, existing: Option<OsString>) -> OsString {
    let mut dirs = vec![first.to_path_buf()];
    if let Some(existing) = existing {
        dirs.extend(std::env::split_paths(&existing).filter(|p| p != first));
    }
    // Only fails when an entry contains the separator itself
    std::env::join_paths(&dirs).unwrap_or_else(|_| first.as_os_str().to_os_string())
}
