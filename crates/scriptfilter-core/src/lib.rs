#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Runtime for launcher "Script Filter" workflows.
//!
//! A workflow binary calls [`WorkflowClient::run`] with an async handler. The
//! handler reads the query, adds [`ResultItem`]s and returns; the runtime takes
//! care of dependency bootstrap, the optional response cache, logging to stderr
//! and writing the JSON document the launcher expects on stdout.

pub mod cache;
pub mod client;
pub mod config;
pub mod deps;
pub mod error;
pub mod invocation;
pub mod item;
pub mod logging;
pub mod paths;
pub mod response;
pub mod version;

pub use cache::{CacheKey, ResponseCache};
pub use client::{HandlerFuture, Outcome, Runner, Source, WorkflowClient};
pub use config::Config;
pub use deps::{DependencyInstaller, ResolvedDependencies};
pub use error::Error;
pub use invocation::Invocation;
pub use item::{BuiltinIcon, Icon, IconKind, ResultItem};
pub use response::{ResponseBuilder, ResponseDocument};
pub use version::VERSION;
