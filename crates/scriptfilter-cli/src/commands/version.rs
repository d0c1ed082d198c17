use miette::{IntoDiagnostic, Result};
use scriptfilter_core::version::{version_string, SCHEMA_VERSION, VERSION};
use serde::Serialize;
use std::process::ExitCode;

#[derive(Serialize)]
struct VersionInfo {
    version: &'static str,
    schema_version: u32,
}

pub fn run(json: bool) -> Result<ExitCode> {
    if json {
        let info = VersionInfo {
            version: VERSION,
            schema_version: SCHEMA_VERSION,
        };
        println!("{}", serde_json::to_string(&info).into_diagnostic()?);
    } else {
        println!("{}", version_string());
    }
    Ok(ExitCode::SUCCESS)
}
