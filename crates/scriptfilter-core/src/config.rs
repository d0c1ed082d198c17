use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides the dependency directory (relative to the workflow root or absolute).
pub const PACKAGE_DIR_ENV: &str = "SCRIPTFILTER_PACKAGE_DIR";
/// Overrides the manifest path.
pub const MANIFEST_ENV: &str = "SCRIPTFILTER_MANIFEST";
/// Overrides the directory holding the response cache.
pub const DATA_DIR_ENV: &str = "SCRIPTFILTER_DATA_DIR";
/// Enables the response cache (`1`, `true`, `yes`, `on`).
pub const CACHE_ENV: &str = "SCRIPTFILTER_CACHE";
/// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
pub const VERBOSE_ENV: &str = "SCRIPTFILTER_VERBOSE";
/// Emit JSON log lines on stderr.
pub const JSON_LOGS_ENV: &str = "SCRIPTFILTER_JSON_LOGS";
/// Set to `1` by the launcher while its workflow debugger is open.
pub const LAUNCHER_DEBUG_ENV: &str = "alfred_debug";
/// Bundle identifier the launcher exports for the running workflow.
pub const LAUNCHER_BUNDLE_ID_ENV: &str = "alfred_workflow_bundleid";

/// Default dependency directory, relative to the workflow root.
pub const DEFAULT_PACKAGE_DIR: &str = "src/libs";
/// Manifest file name, looked up next to the dependency directory.
pub const MANIFEST_FILE_NAME: &str = "requirements.txt";
/// Default data directory, relative to the workflow root.
pub const DEFAULT_DATA_DIR: &str = "db";

/// Runtime configuration for one workflow invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workflow root directory; relative paths below are resolved against it.
    pub root: PathBuf,

    /// Project-local directory dependencies are installed into.
    pub package_dir: PathBuf,

    /// Explicit manifest path. `None` means `<package_dir>/../requirements.txt`.
    pub manifest: Option<PathBuf>,

    /// Directory holding the response cache file.
    pub data_dir: PathBuf,

    /// Whether the response cache is enabled for this run.
    pub cache: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Bundle identifier of the workflow, when the launcher provides one.
    pub bundle_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

impl Config {
    /// Create a config rooted at `root` with default locations.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            package_dir: root.join(DEFAULT_PACKAGE_DIR),
            data_dir: root.join(DEFAULT_DATA_DIR),
            root,
            manifest: None,
            cache: false,
            verbosity: 0,
            json_logs: false,
            bundle_id: None,
        }
    }

    /// Create a config rooted at `root`, then apply environment overrides.
    #[must_use]
    pub fn from_env(root: PathBuf) -> Self {
        let mut config = Self::new(root);

        if let Some(dir) = env_value(PACKAGE_DIR_ENV) {
            config = config.with_package_dir(dir);
        }
        if let Some(manifest) = env_value(MANIFEST_ENV) {
            config = config.with_manifest(manifest);
        }
        if let Some(dir) = env_value(DATA_DIR_ENV) {
            config = config.with_data_dir(dir);
        }
        if let Some(cache) = env_value(CACHE_ENV) {
            config.cache = parse_flag(&cache);
        }
        if let Some(json) = env_value(JSON_LOGS_ENV) {
            config.json_logs = parse_flag(&json);
        }
        if let Some(level) = env_value(VERBOSE_ENV).and_then(|v| v.parse::<u8>().ok()) {
            config.verbosity = level;
        }
        if env_value(LAUNCHER_DEBUG_ENV).is_some_and(|v| parse_flag(&v)) {
            config.verbosity = config.verbosity.max(1);
        }
        config.bundle_id = env_value(LAUNCHER_BUNDLE_ID_ENV);

        config
    }

    /// Set the dependency directory. Relative paths are resolved against the root.
    #[must_use]
    pub fn with_package_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.package_dir = self.root.join(dir);
        self
    }

    /// Set an explicit manifest path. Relative paths are resolved against the root.
    #[must_use]
    pub fn with_manifest(mut self, path: impl AsRef<Path>) -> Self {
        self.manifest = Some(self.root.join(path));
        self
    }

    /// Set the data directory. Relative paths are resolved against the root.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = self.root.join(dir);
        self
    }

    /// Enable or disable the response cache.
    #[must_use]
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// The manifest path in effect.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        if let Some(manifest) = &self.manifest {
            return manifest.clone();
        }
        self.package_dir
            .parent()
            .unwrap_or(&self.root)
            .join(MANIFEST_FILE_NAME)
    }

    /// Path of the response cache file.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        crate::paths::cache_file(&self.data_dir)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
