use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version of the on-disk response cache and install stamp.
/// Bump this when changing formats that would break compatibility.
pub const SCHEMA_VERSION: u32 = 1;

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("scriptfilter {VERSION}");

    if let Some(hash) = option_env!("SCRIPTFILTER_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    let _ = write!(s, " [schema v{SCHEMA_VERSION}]");
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_contains_version() {
        let vs = version_string();
        assert!(vs.starts_with("scriptfilter "));
        assert!(vs.contains(VERSION));
        assert!(vs.ends_with(&format!("[schema v{SCHEMA_VERSION}]")));
    }

    #[test]
    fn test_schema_version_positive() {
        const { assert!(SCHEMA_VERSION > 0) };
    }
}
