//! Project-local dependency bootstrap.
//!
//! Provides utilities for:
//! - Parsing the line-oriented dependency manifest (`requirements.txt` style)
//! - Checking which declared packages are present in the dependency directory
//! - Installing the missing ones through an [`InstallBackend`]
//! - Handing the resolved locations to the handler ([`ResolvedDependencies`])
//!
//! Dependencies always go into the workflow's own directory, never a shared
//! location, so two workflows never fight over versions of the same package.

pub mod backend;
pub mod installer;
pub mod manifest;
pub mod resolved;

pub use backend::{InstallBackend, PipBackend, DEFAULT_PYTHON};
pub use installer::{DependencyInstaller, InstallStamp};
pub use manifest::{normalize_name, Manifest, Requirement};
pub use resolved::ResolvedDependencies;
