//! End-to-end runs of the invocation pipeline with an in-memory stdout.

use futures::FutureExt;
use scriptfilter_core::deps::{InstallBackend, Requirement};
use scriptfilter_core::error::codes;
use scriptfilter_core::{
    Config, DependencyInstaller, Error, HandlerFuture, Invocation, Outcome, ResponseDocument,
    ResultItem, Runner, Source, WorkflowClient,
};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tempfile::{tempdir, TempDir};

/// Backend that never touches the network; fails for packages named in `broken`.
#[derive(Clone, Default)]
struct StubBackend {
    installs: Rc<RefCell<Vec<String>>>,
    broken: Vec<String>,
}

impl InstallBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn install(&self, target: &Path, req: &Requirement) -> Result<(), Error> {
        self.installs.borrow_mut().push(req.spec());
        if self.broken.contains(&req.name) {
            return Err(Error::Install {
                package: req.spec(),
                message: "ERROR: No matching distribution found".to_string(),
            });
        }
        fs::create_dir_all(target.join(req.normalized_name().replace('-', "_")))?;
        fs::create_dir_all(target.join(format!("{}-0.0.0.dist-info", req.name)))?;
        Ok(())
    }

    fn is_present(&self, target: &Path, req: &Requirement) -> bool {
        target.join(format!("{}-0.0.0.dist-info", req.name)).is_dir()
    }
}

struct Workflow {
    dir: TempDir,
    backend: StubBackend,
    cache: bool,
}

impl Workflow {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("info.plist"), "").unwrap();
        Self {
            dir,
            backend: StubBackend::default(),
            cache: false,
        }
    }

    fn with_manifest(self, text: &str) -> Self {
        fs::create_dir_all(self.dir.path().join("src")).unwrap();
        fs::write(self.dir.path().join("src/requirements.txt"), text).unwrap();
        self
    }

    fn run<F>(&self, query: &str, handler: F) -> (Outcome, String)
    where
        F: for<'a> FnOnce(&'a mut WorkflowClient) -> HandlerFuture<'a>,
    {
        let config = Config::new(self.dir.path().to_path_buf()).with_cache(self.cache);
        let installer = DependencyInstaller::with_backend(
            config.manifest_path(),
            config.package_dir.clone(),
            Box::new(self.backend.clone()),
        );
        let mut out = Vec::new();
        let outcome = Runner::new(config, Invocation::new(query))
            .with_installer(installer)
            .run(handler, &mut out);
        (outcome, String::from_utf8(out).unwrap())
    }
}

fn encode(client: &mut WorkflowClient) -> HandlerFuture<'_> {
    async move {
        let encoded: String = url::form_urlencoded::byte_serialize(client.query().as_bytes()).collect();
        client.log(format!("encoded to {encoded}"));
        client.add_result(
            ResultItem::new("Encoded")?
                .with_subtitle(encoded.clone())
                .with_arg(encoded),
        );
        Ok(())
    }
    .boxed_local()
}

#[test]
fn test_encode_hello_world() {
    let wf = Workflow::new();
    let (outcome, out) = wf.run("Hello World", encode);

    assert!(outcome.is_success());
    assert_eq!(outcome.source, Source::Handler);
    assert_eq!(out.lines().count(), 1);

    let document = ResponseDocument::from_json(out.trim_end()).unwrap();
    assert_eq!(document.len(), 1);
    assert_eq!(document.items[0].arg(), "Hello+World");
    assert!(document.items[0].is_valid());
}

#[test]
fn test_cached_response_reused() {
    let mut wf = Workflow::new();
    wf.cache = true;
    let calls = Rc::new(Cell::new(0));

    let first_calls = Rc::clone(&calls);
    let (first, first_out) = wf.run("abc", move |client| {
        async move {
            first_calls.set(first_calls.get() + 1);
            client.add_result(ResultItem::new("computed once")?.with_uid("abc-1"));
            client.cache_response()?;
            Ok(())
        }
        .boxed_local()
    });
    assert_eq!(first.source, Source::Handler);

    let second_calls = Rc::clone(&calls);
    let (second, second_out) = wf.run("abc", move |client| {
        async move {
            second_calls.set(second_calls.get() + 1);
            client.add_result(ResultItem::new("computed again")?);
            Ok(())
        }
        .boxed_local()
    });

    assert_eq!(second.source, Source::Cache);
    assert_eq!(first_out, second_out);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_cache_not_shared_across_queries_or_pages() {
    let mut wf = Workflow::new();
    wf.cache = true;

    for query in ["abc", "abc+"] {
        wf.run(query, |client| {
            async move {
                let title = format!("page {}", client.page());
                client.add_result(ResultItem::new(title)?);
                client.cache_response()?;
                Ok(())
            }
            .boxed_local()
        });
    }

    let (outcome, _) = wf.run("abd", |client| {
        async move {
            client.add_result(ResultItem::new("fresh")?);
            Ok(())
        }
        .boxed_local()
    });
    assert_eq!(outcome.source, Source::Handler);

    let (page_one, out) = wf.run("abc+", |_| async { Ok(()) }.boxed_local());
    assert_eq!(page_one.source, Source::Cache);
    assert!(out.contains("page 1"));
}

#[test]
fn test_no_cache_without_opt_in() {
    let mut wf = Workflow::new();
    wf.cache = true;
    wf.run("abc", encode);

    assert!(!wf.dir.path().join("db/results.json").exists());
}

#[test]
fn test_bad_dependency_yields_single_error_item() {
    let mut wf = Workflow::new().with_manifest("six\nnot-a-real-package==9.9\n");
    wf.backend.broken = vec!["not-a-real-package".to_string()];
    let handler_ran = Rc::new(Cell::new(false));

    let ran = Rc::clone(&handler_ran);
    let (outcome, out) = wf.run("Hello World", move |client| {
        ran.set(true);
        encode(client)
    });

    assert!(!outcome.is_success());
    assert_eq!(outcome.source, Source::Error);
    assert!(!handler_ran.get());
    assert_eq!(
        outcome.error.as_ref().map(Error::code),
        Some(codes::DEPS_INSTALL_FAILED)
    );

    let document = ResponseDocument::from_json(out.trim_end()).unwrap();
    assert_eq!(document.len(), 1);
    let item = &document.items[0];
    assert!(!item.is_valid());
    assert!(item.title().contains("not-a-real-package==9.9"));
    assert!(item.subtitle().unwrap().starts_with("DEPS_INSTALL_FAILED"));
    assert!(item.icon().unwrap().path.ends_with("AlertStopIcon.icns"));
}

#[test]
fn test_dependencies_installed_once_and_exposed() {
    let wf = Workflow::new().with_manifest("ruamel.yaml==0.17.21\n");

    let (outcome, _) = wf.run("x", |client| {
        async move {
            let module = client.resolve("ruamel.yaml");
            let title = format!("resolved: {}", module.is_some());
            client.add_result(ResultItem::new(title)?);
            Ok(())
        }
        .boxed_local()
    });
    assert!(outcome.document.items[0].title().ends_with("true"));

    wf.run("x", |_| async { Ok(()) }.boxed_local());
    assert_eq!(wf.backend.installs.borrow().len(), 1);
}

#[test]
fn test_invalid_manifest_reported() {
    let wf = Workflow::new().with_manifest("-r base.txt\n");
    let (outcome, out) = wf.run("x", encode);

    assert_eq!(
        outcome.error.as_ref().map(Error::code),
        Some(codes::MANIFEST_INVALID)
    );
    assert!(out.contains("\"valid\":false"));
}

#[test]
fn test_async_handler_awaits_before_emit() {
    let wf = Workflow::new();
    let (_, out) = wf.run("slow", |client| {
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            client.add_result(ResultItem::new("after sleep")?);
            Ok(())
        }
        .boxed_local()
    });
    assert!(out.contains("after sleep"));
}

#[test]
fn test_empty_results_are_valid() {
    let wf = Workflow::new();
    let (outcome, out) = wf.run("nothing", |_| async { Ok(()) }.boxed_local());
    assert!(outcome.is_success());
    assert_eq!(out, "{\"items\":[]}\n");
}
