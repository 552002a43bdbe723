//! `license-policy` binary.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load config ([`license_policy::config::load_config`]) and install logging.
//! 3. Load the license dataset and the active policy into a
//!    [`PolicyEngine`].
//! 4. Run the requested command and render it ([`report`] or JSON).
//! 5. Exit `0` (ok), `1` (deny verdict or incompatible pair) or `2` (error).

mod cli;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, OutputFormat};
use license_policy::compat::CompatibilityVerdict;
use license_policy::config::{load_config, Config};
use license_policy::license::store::{DataSource, LicenseStore};
use license_policy::policy::{Action, Policy};
use license_policy::{DataError, EngineError, EvaluationRequest, PolicyEngine};

const EXIT_REJECTED: u8 = 1;
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match load_config(&cwd, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, None);
            return report_error(&e, cli.format);
        }
    };
    init_logging(cli.verbose, config.logging.level.as_deref());

    tracing::debug!(cwd = %cwd.display(), "license-policy v{} starting", env!("CARGO_PKG_VERSION"));

    match run(&cli, &config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => report_error(&e, cli.format),
    }
}

/// `RUST_LOG` wins; otherwise `-v` picks the level, then the config file, then `warn`.
fn init_logging(verbose: u8, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new(configured.unwrap_or("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, config: &Config) -> Result<u8> {
    let source = match (&cli.data_dir, &cli.database) {
        (Some(dir), _) => DataSource::Directory(dir.clone()),
        (None, Some(database)) => DataSource::Database(database.clone()),
        (None, None) => config.data_source(),
    };
    let policy_path = cli.policy.as_deref().or(config.policy.path.as_deref());

    let engine = build_engine(&source, policy_path)?;

    match &cli.command {
        Command::Evaluate(args) => {
            let request = EvaluationRequest {
                licenses_found: args.licenses.clone(),
                distribution: args.distribution.clone(),
                context: license_policy::models::LinkContext::from(args.context).to_string(),
                project_type: args.project_type.clone(),
            };
            let result = engine.evaluate(&request)?;
            match cli.format {
                OutputFormat::Text => report::terminal::render_evaluation(&result),
                OutputFormat::Json => print_json(&result)?,
            }
            Ok(if result.decision.action == Action::Deny {
                EXIT_REJECTED
            } else {
                0
            })
        }
        Command::Check(args) => {
            let report =
                engine.check_compatibility(&args.license_a, &args.license_b, args.linking.into())?;
            match cli.format {
                OutputFormat::Text => report::terminal::render_compatibility(&report),
                OutputFormat::Json => print_json(&report)?,
            }
            Ok(if report.verdict == CompatibilityVerdict::Incompatible {
                EXIT_REJECTED
            } else {
                0
            })
        }
        Command::Obligations { licenses } => {
            let records = licenses
                .iter()
                .map(|id| engine.obligations(id))
                .collect::<Result<Vec<_>, _>>()?;
            match cli.format {
                OutputFormat::Text => report::terminal::render_obligations(&records),
                OutputFormat::Json => print_json(&records)?,
            }
            Ok(0)
        }
        Command::Show { license } => {
            let license = engine.license(license)?;
            match cli.format {
                OutputFormat::Text => report::terminal::render_license(license),
                OutputFormat::Json => print_json(license)?,
            }
            Ok(0)
        }
        Command::List => {
            match cli.format {
                OutputFormat::Text => report::terminal::render_list(engine.store().list()),
                OutputFormat::Json => print_json(&engine.store().list().collect::<Vec<_>>())?,
            }
            Ok(0)
        }
        Command::ValidateData => {
            let store = engine.store();
            match cli.format {
                OutputFormat::Text => report::terminal::render_warnings(store.warnings(), store.len()),
                OutputFormat::Json => {
                    #[derive(Serialize)]
                    struct DataReport {
                        licenses: usize,
                        warnings: Vec<String>,
                    }
                    print_json(&DataReport {
                        licenses: store.len(),
                        warnings: store.warnings().iter().map(ToString::to_string).collect(),
                    })?
                }
            }
            Ok(0)
        }
    }
}

fn build_engine(source: &DataSource, policy_path: Option<&Path>) -> Result<PolicyEngine> {
    let store = LicenseStore::load(source)?;
    tracing::info!(licenses = store.len(), "loaded license dataset");

    let default_policy = Policy::embedded_default().context("built-in default policy is invalid")?;
    let engine = PolicyEngine::with_policy_source(store, default_policy, policy_path)?;
    Ok(engine)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print `error` in the requested format and map it to the error exit code.
fn report_error(error: &anyhow::Error, format: OutputFormat) -> ExitCode {
    let kind = if let Some(e) = error.downcast_ref::<EngineError>() {
        e.kind()
    } else if error.downcast_ref::<DataError>().is_some() {
        "data_error"
    } else {
        "error"
    };

    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({ "error": kind, "message": format!("{error:#}") });
            println!("{body:#}");
        }
        OutputFormat::Text => {
            eprintln!("{} [{}] {:#}", "error:".red().bold(), kind, error);
        }
    }
    ExitCode::from(EXIT_ERROR)
}
