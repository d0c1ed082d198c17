//! Diagnostic logging.
//!
//! The launcher reads stdout as protocol data and shows stderr in its debugger,
//! so every subscriber installed here writes to stderr.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "SCRIPTFILTER_LOG";

/// Target used by [`crate::WorkflowClient::log`].
pub const WORKFLOW_TARGET: &str = "workflow";

/// Map a verbosity count to a level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
#[must_use]
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn build_filter(verbosity: u8) -> EnvFilter {
    let explicit = std::env::var(LOG_ENV)
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok());
    if let Some(filter) = explicit {
        return filter;
    }

    let level = level_for(verbosity);
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Targets match by prefix: "scriptfilter" covers every crate in the workspace
    for target in ["scriptfilter", WORKFLOW_TARGET] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the global subscriber.
///
/// * `verbosity` - 0 = INFO, 1 = DEBUG, 2+ = TRACE
/// * `json` - emit JSON lines instead of human-readable text
///
/// JSON line format:
/// ```json
/// {"timestamp":"...","level":"DEBUG","fields":{"message":"..."},"target":"workflow"}
/// ```
///
/// Returns `false` if a subscriber was already installed; the existing one is kept.
pub fn init(verbosity: u8, json: bool) -> bool {
    let subscriber = tracing_subscriber::registry().with(build_filter(verbosity));

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .is_ok()
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), Level::INFO);
        assert_eq!(level_for(1), Level::DEBUG);
        assert_eq!(level_for(5), Level::TRACE);
    }

    #[test]
    #[serial]
    fn test_init_is_idempotent() {
        init(0, false);
        assert!(!init(1, true));
    }

    #[test]
    #[serial]
    fn test_explicit_filter_wins() {
        std::env::set_var(LOG_ENV, "scriptfilter_core=trace");
        let filter = build_filter(0);
        std::env::remove_var(LOG_ENV);
        assert!(filter.to_string().contains("scriptfilter_core=trace"));
    }
}
