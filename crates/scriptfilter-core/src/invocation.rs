//! The query context handed over by the launcher.

use std::ffi::OsStr;

/// Explicit page cursor. When set, trailing `+` characters stay part of the query.
pub const PAGE_ENV: &str = "SCRIPTFILTER_PAGE";

/// Character appended to the query to request the next page.
///
/// Every trailing marker counts, so a query that really ends in `+` (`"c++"`)
/// reads as `"c"`, page 2. Set [`PAGE_ENV`] to keep such a query intact.
pub const PAGE_MARKER: char = '+';

/// Query and pagination cursor for one invocation.
///
/// The launcher passes the query as the first argument. Trailing `+`
/// characters request later pages: `"rust++"` is query `"rust"`, page 2.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    bare_query: String,
    query: String,
    page: u32,
}

impl Invocation {
    /// Build from a raw launcher query.
    #[must_use]
    pub fn new(bare_query: impl Into<String>) -> Self {
        let bare_query = bare_query.into();
        let query = bare_query.trim_end_matches(PAGE_MARKER).to_string();
        let markers = bare_query.len() - query.len();
        Self {
            page: u32::try_from(markers).unwrap_or(u32::MAX),
            query,
            bare_query,
        }
    }

    /// Replace the parsed page with an explicit cursor.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Build from process arguments (program name first) and [`PAGE_ENV`].
    /// Arguments that are not valid UTF-8 are converted lossily.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let bare_query = args
            .into_iter()
            .nth(1)
            .map(|arg| arg.as_ref().to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::env::var(PAGE_ENV).ok().and_then(|v| v.trim().parse().ok()) {
            Some(page) => Self::literal(bare_query, page),
            None => Self::new(bare_query),
        }
    }

    /// Query taken verbatim, with an explicit page.
    #[must_use]
    pub fn literal(query: impl Into<String>, page: u32) -> Self {
        let query = query.into();
        Self {
            bare_query: query.clone(),
            query,
            page,
        }
    }

    /// Build from the current process.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_args(std::env::args_os())
    }

    /// The query exactly as the launcher passed it.
    #[must_use]
    pub fn bare_query(&self) -> &str {
        &self.bare_query
    }

    /// The query without page markers.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Zero-based page index; 0 is the first page.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }
}
