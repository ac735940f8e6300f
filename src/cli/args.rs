//! CLI argument definitions using clap derive

use crate::store::HashAlgorithm;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// fodcache - content-addressed fetch cache
///
/// Predicts the store path of a package archive before downloading it and
/// skips the download when the path already exists.
#[derive(Parser, Debug)]
#[command(name = "fodcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FODCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch package archives into the store
    Fetch(FetchArgs),

    /// Print the store path predicted for a name and checksum
    Path(PathArgs),

    /// Print the derivation name for an arbitrary string
    Sanitize(SanitizeArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Locators to fetch (name@npm:1.0.0, @scope/name@npm:1.0.0, name@https://...)
    #[arg(required = true)]
    pub locators: Vec<String>,

    /// Previously recorded checksum (only with a single locator)
    #[arg(long)]
    pub checksum: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for the path command
#[derive(Parser, Debug)]
pub struct PathArgs {
    /// Derivation name (used verbatim)
    pub name: String,

    /// Hex checksum, optionally prefixed with nix.1/
    pub checksum: String,

    /// Hash algorithm of the checksum (defaults to store.hash_algorithm)
    #[arg(long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,

    /// Store directory (defaults to store.root)
    #[arg(long)]
    pub store_root: Option<String>,
}

/// Arguments for the sanitize command
#[derive(Parser, Debug)]
pub struct SanitizeArgs {
    /// Raw string to sanitize
    pub raw: String,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for fetch results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per package
    Plain,
    /// JSON array
    Json,
}

impl ValueEnum for HashAlgorithm {
    fn value_variants<'a>() -> &'a [Self] {
        &[HashAlgorithm::Sha256, HashAlgorithm::Sha512]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}
