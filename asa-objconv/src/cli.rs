use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "asa-objconv")]
#[command(about = "Translate Cisco ASA object definitions into generic_import_export XML")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Translate a configuration file into an export document.
    Convert(ConvertArgs),
    /// Classify objects without assigning keys or writing XML.
    Check(CheckArgs),
    /// List keys held in a registry file.
    Keys(KeysArgs),
    /// Show the element tree of an export document.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Configuration text to translate (`-` reads stdin).
    pub input: PathBuf,
    /// Write the result here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// TOML settings file. Defaults to the embedded settings.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// JSON key registry to load and update. Without it keys live for this run only.
    #[arg(long)]
    pub registry: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Exit non-zero when any object was rejected.
    #[arg(long)]
    pub strict: bool,
    /// Override the `build` root attribute.
    #[arg(long)]
    pub build: Option<u32>,
    /// Override the `update_package_version` root attribute.
    #[arg(long)]
    pub update_package_version: Option<u32>,
    /// Override the first key handed out in an empty namespace.
    #[arg(long)]
    pub db_key_start: Option<u64>,
    /// Write broadcast="false" on subnets.
    #[arg(long)]
    pub no_broadcast: bool,
    /// Number network and service keys from one sequence.
    #[arg(long)]
    pub shared_keys: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Configuration text to check (`-` reads stdin).
    pub input: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct KeysArgs {
    /// Registry file written by `convert --registry`.
    pub registry: PathBuf,
    /// Only list one namespace.
    #[arg(long, value_enum)]
    pub namespace: Option<NamespaceArg>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    #[arg(long, default_value_t = 3)]
    pub depth: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum NamespaceArg {
    Network,
    Service,
}
