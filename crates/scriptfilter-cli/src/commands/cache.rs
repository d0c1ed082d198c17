use miette::{IntoDiagnostic, Result};
use scriptfilter_core::{CacheKey, Config, ResponseCache};
use serde::Serialize;
use std::process::ExitCode;

#[derive(Serialize)]
struct EntrySummary<'a> {
    query: &'a str,
    page: u32,
    items: usize,
}

/// List cached queries, one per line (or a JSON array with `--json`).
pub fn list(config: &Config, json: bool) -> Result<ExitCode> {
    let mut cache = ResponseCache::new(config.cache_path());
    let summaries: Vec<EntrySummary<'_>> = cache
        .entries()
        .map(|(key, document)| EntrySummary {
            query: &key.query,
            page: key.page,
            items: document.len(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string(&summaries).into_diagnostic()?);
    } else if summaries.is_empty() {
        println!("No cached responses in {}", config.cache_path().display());
    } else {
        for entry in &summaries {
            println!("{:?}\tpage {}\t{} item(s)", entry.query, entry.page, entry.items);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print the cached document for `query` at `page`, exactly as it would be emitted.
pub fn show(config: &Config, query: &str, page: u32) -> Result<ExitCode> {
    let mut cache = ResponseCache::new(config.cache_path());
    match cache.load(&CacheKey::new(query, page)) {
        Some(document) => {
            println!("{}", document.to_json().into_diagnostic()?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("No cached response for {query:?} (page {page})");
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn clear(config: &Config, json: bool) -> Result<ExitCode> {
    let mut cache = ResponseCache::new(config.cache_path());
    let removed = cache.len();
    cache.clear().into_diagnostic()?;

    if json {
        println!("{}", serde_json::json!({ "ok": true, "removed": removed }));
    } else {
        println!("Removed {removed} cached response(s)");
    }
    Ok(ExitCode::SUCCESS)
}
