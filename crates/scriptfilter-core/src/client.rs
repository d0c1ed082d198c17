//! Orchestration of one Script Filter invocation.
//!
//! A run moves through fixed steps and never goes back:
//!
//! 1. dependency bootstrap ([`DependencyInstaller::ensure`])
//! 2. cache probe, when caching is enabled; a hit skips the handler
//! 3. the user handler, which fills the [`ResponseBuilder`]
//! 4. cache store, if the handler called [`WorkflowClient::cache_response`]
//! 5. emit: one JSON document and a newline on stdout
//!
//! A failure in step 1 or 3 (including a panic) replaces the partial results
//! with a single non-actionable error item, so the launcher always receives a
//! valid document.

use crate::cache::{CacheKey, ResponseCache};
use crate::config::Config;
use crate::deps::{DependencyInstaller, ResolvedDependencies};
use crate::error::{codes, Error};
use crate::invocation::Invocation;
use crate::item::{BuiltinIcon, ResultItem};
use crate::logging::{self, WORKFLOW_TARGET};
use crate::paths::project_root;
use crate::response::{ResponseBuilder, ResponseDocument};
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use scriptfilter_util::hash::short_hash;
use std::any::Any;
use std::fmt::Display;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Future returned by a workflow handler.
pub type HandlerFuture<'a> = LocalBoxFuture<'a, Result<(), Error>>;

/// Title used when an error has no message of its own.
const FALLBACK_ERROR_TITLE: &str = "Workflow failed";

/// Per-invocation state handed to the user handler.
#[derive(Debug)]
pub struct WorkflowClient {
    config: Config,
    invocation: Invocation,
    builder: ResponseBuilder,
    cache: Option<ResponseCache>,
    dependencies: ResolvedDependencies,
    cache_requested: bool,
}

impl WorkflowClient {
    /// Run `handler` for the current process and write the result to stdout.
    ///
    /// Reads the query from the command line, finds the workflow root from the
    /// working directory and applies environment configuration. Logging goes
    /// to stderr.
    ///
    /// ```no_run
    /// use futures::FutureExt;
    /// use scriptfilter_core::{ResultItem, WorkflowClient};
    ///
    /// fn main() -> std::process::ExitCode {
    ///     WorkflowClient::run(|client| {
    ///         async move {
    ///             let title = format!("You typed {}", client.query());
    ///             client.add_result(ResultItem::new(title)?);
    ///             Ok(())
    ///         }
    ///         .boxed_local()
    ///     })
    /// }
    /// ```
    pub fn run<F>(handler: F) -> ExitCode
    where
        F: for<'a> FnOnce(&'a mut WorkflowClient) -> HandlerFuture<'a>,
    {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let root = project_root(&cwd).unwrap_or(cwd);
        let config = Config::from_env(root);
        logging::init(config.verbosity, config.json_logs);

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        Runner::new(config, Invocation::from_env())
            .run(handler, &mut out)
            .exit_code()
    }

    fn new(config: Config, invocation: Invocation, dependencies: ResolvedDependencies) -> Self {
        let cache = config
            .cache
            .then(|| ResponseCache::new(config.cache_path()));
        Self {
            config,
            invocation,
            builder: ResponseBuilder::new(),
            cache,
            dependencies,
            cache_requested: false,
        }
    }

    /// The query without page markers.
    #[must_use]
    pub fn query(&self) -> &str {
        self.invocation.query()
    }

    /// The query exactly as the launcher passed it.
    #[must_use]
    pub fn bare_query(&self) -> &str {
        self.invocation.bare_query()
    }

    /// Zero-based page index.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.invocation.page()
    }

    #[must_use]
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write a diagnostic line to stderr. Never touches the result document.
    pub fn log(&self, message: impl Display) {
        debug!(target: WORKFLOW_TARGET, query = %self.invocation.query(), "{message}");
    }

    pub fn add_result(&mut self, item: ResultItem) {
        self.builder.add_result(item);
    }

    /// Insert at `index`; indexes past the end append.
    pub fn insert_result(&mut self, index: usize, item: ResultItem) {
        self.builder.insert_result(index, item);
    }

    /// Results accumulated so far.
    #[must_use]
    pub fn results(&self) -> &ResponseBuilder {
        &self.builder
    }

    /// Installed dependencies for this run.
    #[must_use]
    pub fn dependencies(&self) -> &ResolvedDependencies {
        &self.dependencies
    }

    /// Location of an installed top-level module, see [`ResolvedDependencies::resolve`].
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.dependencies.resolve(name)
    }

    /// Whether the response cache is enabled for this run.
    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Key results are cached under.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.invocation.query(), self.invocation.page())
    }

    /// Persist the current results under the current query and page.
    ///
    /// The store is durable when this returns. Results added afterwards are
    /// stored again once the handler finishes successfully.
    ///
    /// # Errors
    /// [`Error::CacheDisabled`] if caching is off for this run, or
    /// [`Error::CacheWrite`] if the cache file cannot be written.
    pub fn cache_response(&mut self) -> Result<(), Error> {
        let key = self.cache_key();
        let document = self.builder.document();
        let Some(cache) = self.cache.as_mut() else {
            return Err(Error::CacheDisabled);
        };
        cache.store(key, document)?;
        self.cache_requested = true;
        Ok(())
    }

    /// Replace the current results with the cached document for this query and
    /// page. Returns whether there was one.
    pub fn load_cached_response(&mut self) -> bool {
        let key = self.cache_key();
        let Some(cache) = self.cache.as_mut() else {
            return false;
        };
        match cache.load(&key) {
            Some(document) => {
                self.builder.replace(document);
                true
            }
            None => false,
        }
    }

    fn store_requested(&mut self) -> Result<(), Error> {
        if !self.cache_requested {
            return Ok(());
        }
        let key = self.cache_key();
        let document = self.builder.document();
        match self.cache.as_mut() {
            Some(cache) => cache.store(key, document),
            None => Ok(()),
        }
    }
}

/// Where the emitted document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Handler,
    Cache,
    Error,
}

/// Result of one run.
#[derive(Debug)]
pub struct Outcome {
    /// The document that was (or should have been) written.
    pub document: ResponseDocument,
    pub source: Source,
    /// The failure that produced an error document, or a failed write.
    pub error: Option<Error>,
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Drives the invocation steps with explicit inputs.
///
/// [`WorkflowClient::run`] builds one from the process environment; tests and
/// tools build one directly.
#[derive(Debug)]
pub struct Runner {
    config: Config,
    invocation: Invocation,
    installer: DependencyInstaller,
}

impl Runner {
    #[must_use]
    pub fn new(config: Config, invocation: Invocation) -> Self {
        let installer = DependencyInstaller::from_config(&config);
        Self {
            config,
            invocation,
            installer,
        }
    }

    /// Use a specific installer instead of the one derived from the config.
    #[must_use]
    pub fn with_installer(mut self, installer: DependencyInstaller) -> Self {
        self.installer = installer;
        self
    }

    /// Run to completion on a current-thread runtime and write the document to `out`.
    pub fn run<F, W>(self, handler: F, out: &mut W) -> Outcome
    where
        F: for<'a> FnOnce(&'a mut WorkflowClient) -> HandlerFuture<'a>,
        W: Write,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build();

        let mut outcome = match runtime {
            Ok(runtime) => runtime.block_on(self.execute(handler)),
            Err(e) => fail(Error::Io(e)),
        };

        if let Err(e) = emit(&outcome.document, out) {
            error!(code = e.code(), error = %e, "failed to write results");
            outcome.error.get_or_insert(e);
        }
        outcome
    }

    /// Run every step except emit.
    pub async fn execute<F>(self, handler: F) -> Outcome
    where
        F: for<'a> FnOnce(&'a mut WorkflowClient) -> HandlerFuture<'a>,
    {
        debug!(
            query = %self.invocation.query(),
            page = self.invocation.page(),
            root = %self.config.root.display(),
            bundle_id = self.config.bundle_id.as_deref().unwrap_or("-"),
            "workflow invocation"
        );

        let dependencies = match self.installer.ensure() {
            Ok(deps) => deps,
            Err(e) => return fail(e),
        };

        let mut client = WorkflowClient::new(self.config, self.invocation, dependencies);

        if client.cache_enabled() && client.load_cached_response() {
            info!(query = %client.query(), page = client.page(), "serving cached results");
            return Outcome {
                document: client.builder.document(),
                source: Source::Cache,
                error: None,
            };
        }

        // The handler itself may panic before it returns a future
        let borrowed = &mut client;
        let handler_future = future::lazy(move |_| handler(borrowed)).flatten();
        let result = AssertUnwindSafe(handler_future)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(Error::Panic(panic_message(payload.as_ref()))));
        if let Err(e) = result {
            return fail(e);
        }

        if let Err(e) = client.store_requested() {
            // Results are still good; only the cache is stale
            warn!(code = e.code(), error = %e, "failed to cache results");
        }

        Outcome {
            document: client.builder.document(),
            source: Source::Handler,
            error: None,
        }
    }
}

fn fail(err: Error) -> Outcome {
    let trace = trace_id(&err);
    error!(code = err.code(), trace = %trace, error = %err.chain(), "workflow failed");
    Outcome {
        document: error_document(&err, &trace),
        source: Source::Error,
        error: Some(err),
    }
}

/// The single item shown in place of results after a failure.
#[must_use]
pub fn error_document(err: &Error, trace: &str) -> ResponseDocument {
    let (title, subtitle) = match err {
        Error::Workflow { title, subtitle } => (title.clone(), subtitle.clone()),
        _ => (
            err.to_string(),
            format!("{}: {} [trace {trace}]", err.code(), hint(err)),
        ),
    };

    let item = ResultItem::new(title)
        .or_else(|_| ResultItem::new(FALLBACK_ERROR_TITLE))
        .map(|item| {
            item.with_subtitle(subtitle)
                .with_arg(err.chain())
                .with_valid(false)
                .with_icon(BuiltinIcon::Error)
        });

    match item {
        Ok(item) => ResponseDocument::single(item),
        Err(_) => ResponseDocument::default(),
    }
}

fn hint(err: &Error) -> &'static str {
    match err.code() {
        codes::DEPS_INSTALLER_NOT_FOUND => "install Python 3 and make sure it is on PATH",
        codes::MANIFEST_INVALID | codes::MANIFEST_READ_FAILED => "fix the dependency manifest",
        codes::DEPS_INSTALL_FAILED => "check the package name and network access",
        _ => "open the workflow debugger for details",
    }
}

/// Short identifier tying an error item to its log line.
fn trace_id(err: &Error) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seed = format!("{}:{}:{nanos}:{}", err.code(), std::process::id(), err.chain());
    short_hash(seed.as_bytes())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn emit<W: Write>(document: &ResponseDocument, out: &mut W) -> Result<(), Error> {
    let json = document.to_json()?;
    out.write_all(json.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
