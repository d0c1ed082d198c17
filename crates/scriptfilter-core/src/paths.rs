use std::path::{Path, PathBuf};

/// Marker file the launcher keeps at the root of every workflow.
pub const WORKFLOW_MARKER: &str = "info.plist";

/// File name of the response cache inside the data directory.
pub const CACHE_FILE_NAME: &str = "results.json";

/// File name of the install stamp inside the dependency directory.
pub const STAMP_FILE_NAME: &str = ".scriptfilter-stamp.json";

/// Find the workflow root by walking up from `cwd` looking for `info.plist` or `.git`.
///
/// Returns the first directory containing either marker, or `None` if neither is found.
#[must_use]
pub fn project_root(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        if current.join(WORKFLOW_MARKER).exists() || current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Path of the response cache file for a data directory.
#[must_use]
pub fn cache_file(data_dir: &Path) -> PathBuf {
    data_dir.join(CACHE_FILE_NAME)
}

/// Path of the install stamp for a dependency directory.
#[must_use]
pub fn stamp_file(package_dir: &Path) -> PathBuf {
    package_dir.join(STAMP_FILE_NAME)
}
