use miette::{IntoDiagnostic, Result};
use scriptfilter_core::deps::{InstallBackend, Manifest, PipBackend};
use scriptfilter_core::{Config, DependencyInstaller};
use serde::Serialize;
use std::process::ExitCode;

#[derive(Serialize)]
struct PackageStatus {
    name: String,
    spec: String,
    present: bool,
}

#[derive(Serialize)]
struct CheckReport {
    manifest: String,
    package_dir: String,
    packages: Vec<PackageStatus>,
}

/// Report which declared packages are present. Exits non-zero if any are missing.
pub fn check(config: &Config, json: bool) -> Result<ExitCode> {
    let manifest_path = config.manifest_path();
    let manifest = Manifest::load(&manifest_path).into_diagnostic()?;
    let backend = PipBackend::default();

    let packages: Vec<PackageStatus> = manifest
        .iter()
        .flat_map(|m| m.iter())
        .map(|req| PackageStatus {
            name: req.normalized_name(),
            spec: req.spec(),
            present: backend.is_present(&config.package_dir, req),
        })
        .collect();
    let all_present = packages.iter().all(|p| p.present);

    if json {
        let report = CheckReport {
            manifest: manifest_path.display().to_string(),
            package_dir: config.package_dir.display().to_string(),
            packages,
        };
        println!("{}", serde_json::to_string(&report).into_diagnostic()?);
    } else if manifest.is_none() {
        println!("No manifest at {} (no dependencies)", manifest_path.display());
    } else {
        for package in &packages {
            let mark = if package.present { "ok" } else { "missing" };
            println!("{mark:>7}  {}", package.spec);
        }
    }

    Ok(if all_present {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Install missing packages, exactly as a workflow run would before its handler.
pub fn install(config: &Config, json: bool) -> Result<ExitCode> {
    let resolved = DependencyInstaller::from_config(config)
        .ensure()
        .into_diagnostic()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "dir": resolved.dir().display().to_string(),
                "declared": resolved.packages().count(),
                "installed": resolved.installed(),
            })
        );
    } else if resolved.is_empty() {
        println!("No dependencies declared");
    } else {
        println!(
            "{} package(s) declared, {} installed into {}",
            resolved.packages().count(),
            resolved.installed(),
            resolved.dir().display()
        );
    }
    Ok(ExitCode::SUCCESS)
}
