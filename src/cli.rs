use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use license_policy::models::{LinkContext, LinkingMode};

#[derive(Parser, Debug)]
#[command(
    name = "license-policy",
    about = "Check license combinations against a distribution policy",
    version
)]
pub struct Cli {
    /// Config file [default: ./.license-policy/config.toml, fallback ~/.config/license-policy/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory of per-license records (overrides config)
    #[arg(long, global = true, value_name = "DIR", conflicts_with = "database")]
    pub data_dir: Option<PathBuf>,

    /// Master license database file (overrides config)
    #[arg(long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Policy file or directory (overrides config)
    #[arg(long, global = true, value_name = "PATH")]
    pub policy: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate licenses against the policy for a distribution scenario
    Evaluate(EvaluateArgs),

    /// Check whether two licenses may be combined
    Check(CheckArgs),

    /// Show the obligations of one or more licenses
    Obligations {
        #[arg(required = true)]
        licenses: Vec<String>,
    },

    /// Show a license record
    Show { license: String },

    /// List every license in the dataset
    List,

    /// Report data-quality warnings for the dataset
    ValidateData,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// License identifiers found in the project
    #[arg(required = true)]
    pub licenses: Vec<String>,

    /// Distribution type (e.g. commercial, mobile, saas, internal, open_source, embedded)
    #[arg(short, long)]
    pub distribution: String,

    /// Linking context
    #[arg(short, long, default_value = "general")]
    pub context: ContextArg,

    /// Project type (e.g. application, library)
    #[arg(long)]
    pub project_type: Option<String>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    pub license_a: String,
    pub license_b: String,

    /// Linking mode
    #[arg(short, long, default_value = "static_linking")]
    pub linking: LinkingArg,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LinkingArg {
    #[value(name = "static_linking", alias = "static")]
    Static,
    #[value(name = "dynamic_linking", alias = "dynamic")]
    Dynamic,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ContextArg {
    #[value(name = "static_linking", alias = "static")]
    Static,
    #[value(name = "dynamic_linking", alias = "dynamic")]
    Dynamic,
    General,
}

impl From<LinkingArg> for LinkingMode {
    fn from(arg: LinkingArg) -> Self {
        match arg {
            LinkingArg::Static => LinkingMode::Static,
            LinkingArg::Dynamic => LinkingMode::Dynamic,
        }
    }
}

impl From<ContextArg> for LinkContext {
    fn from(arg: ContextArg) -> Self {
        match arg {
            ContextArg::Static => LinkContext::Static,
            ContextArg::Dynamic => LinkContext::Dynamic,
            ContextArg::General => LinkContext::General,
        }
    }
}
