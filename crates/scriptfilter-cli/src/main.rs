#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]

mod commands;

use clap::Parser;
use miette::Result;
use scriptfilter_core::paths::project_root;
use scriptfilter_core::{logging, Config};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "scriptfilter")]
#[command(author, version, about = "Develop and inspect Script Filter workflows", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Run the URL-encoding demo workflow and print its Script Filter output
    Encode {
        /// Query as the launcher would pass it (trailing `+` selects later pages)
        query: Option<String>,

        /// Enable the response cache for this run
        #[arg(long)]
        cache: bool,
    },

    /// Inspect or clear the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Check or install the workflow's declared dependencies
    Deps {
        #[command(subcommand)]
        action: DepsAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum CacheAction {
    /// List cached queries
    List,

    /// Print the cached document for a query
    Show {
        query: String,

        /// Page index (0 = first page)
        #[arg(long, default_value_t = 0)]
        page: u32,
    },

    /// Remove every cached response
    Clear,
}

#[derive(clap::Subcommand, Debug)]
enum DepsAction {
    /// Report which declared packages are present
    Check,

    /// Install missing packages into the dependency directory
    Install,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let root = project_root(&cwd).unwrap_or(cwd);

    let env_config = Config::from_env(root);
    let verbosity = cli.verbose.max(env_config.verbosity);
    let config = env_config
        .with_verbosity(verbosity)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);
    tracing::debug!(root = %config.root.display(), "scriptfilter starting");

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Encode { query, cache }) => {
            Ok(commands::encode::run(config, query.unwrap_or_default(), cache))
        }
        Some(Commands::Cache { action }) => match action {
            CacheAction::List => commands::cache::list(&config, cli.json),
            CacheAction::Show { query, page } => commands::cache::show(&config, &query, page),
            CacheAction::Clear => commands::cache::clear(&config, cli.json),
        },
        Some(Commands::Deps { action }) => match action {
            DepsAction::Check => commands::deps::check(&config, cli.json),
            DepsAction::Install => commands::deps::install(&config, cli.json),
        },
    }
}
