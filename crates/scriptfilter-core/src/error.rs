use std::path::PathBuf;
use thiserror::Error;

/// Boxed error type accepted from user handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable error codes, one per failure class.
///
/// Codes appear in the diagnostic log and in the subtitle of the error item the
/// launcher shows, so they are part of the user-visible contract.
pub mod codes {
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const JSON_ERROR: &str = "JSON_ERROR";
    pub const MANIFEST_READ_FAILED: &str = "MANIFEST_READ_FAILED";
    pub const MANIFEST_INVALID: &str = "MANIFEST_INVALID";
    pub const DEPS_INSTALL_FAILED: &str = "DEPS_INSTALL_FAILED";
    pub const DEPS_INSTALLER_NOT_FOUND: &str = "DEPS_INSTALLER_NOT_FOUND";
    pub const CACHE_WRITE_FAILED: &str = "CACHE_WRITE_FAILED";
    pub const CACHE_DISABLED: &str = "CACHE_DISABLED";
    pub const ITEM_TITLE_EMPTY: &str = "ITEM_TITLE_EMPTY";
    pub const WORKFLOW_ERROR: &str = "WORKFLOW_ERROR";
    pub const HANDLER_FAILED: &str = "HANDLER_FAILED";
    pub const HANDLER_PANICKED: &str = "HANDLER_PANICKED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Core error type for scriptfilter operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest {}:{line}: {message}", .path.display())]
    Manifest {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to install {package}: {message}")]
    Install { package: String, message: String },

    #[error("Installer program '{program}' not found: {source}")]
    InstallerNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("Failed to write response cache at {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Response caching is not enabled for this run")]
    CacheDisabled,

    #[error("Result title must not be empty")]
    EmptyTitle,

    /// A failure the handler wants shown to the user with its own wording.
    #[error("{title}")]
    Workflow { title: String, subtitle: String },

    #[error("{0}")]
    Handler(#[source] BoxError),

    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Wrap any error raised inside a handler.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// A user-facing failure rendered as an item with exactly this title and subtitle.
    pub fn workflow(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self::Workflow {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }

    /// Stable code for this failure class.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => codes::IO_ERROR,
            Self::Json(_) => codes::JSON_ERROR,
            Self::ManifestRead { .. } => codes::MANIFEST_READ_FAILED,
            Self::Manifest { .. } => codes::MANIFEST_INVALID,
            Self::Install { .. } => codes::DEPS_INSTALL_FAILED,
            Self::InstallerNotFound { .. } => codes::DEPS_INSTALLER_NOT_FOUND,
            Self::CacheWrite { .. } => codes::CACHE_WRITE_FAILED,
            Self::CacheDisabled => codes::CACHE_DISABLED,
            Self::EmptyTitle => codes::ITEM_TITLE_EMPTY,
            Self::Workflow { .. } => codes::WORKFLOW_ERROR,
            Self::Handler(_) => codes::HANDLER_FAILED,
            Self::Panic(_) => codes::HANDLER_PANICKED,
            Self::Other(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Whether this failure came from dependency bootstrap rather than the handler.
    #[must_use]
    pub fn is_dependency_error(&self) -> bool {
        matches!(
            self,
            Self::ManifestRead { .. }
                | Self::Manifest { .. }
                | Self::Install { .. }
                | Self::InstallerNotFound { .. }
        )
    }

    /// The error and all of its sources, outermost first, one per line.
    #[must_use]
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let text = err.to_string();
            // thiserror variants often repeat their source in the message
            if !out.ends_with(&text) {
                out.push_str("\ncaused by: ");
                out.push_str(&text);
            }
            source = err.source();
        }
        out
    }
}

impl From<BoxError> for Error {
    fn from(err: BoxError) -> Self {
        Self::Handler(err)
    }
}
