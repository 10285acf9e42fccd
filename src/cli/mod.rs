//! Command-line interface for tablesnap
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Subcommands (version, completion, config, get-item)
//! - Output file naming

use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, LogLevel};
use crate::error::{Result, TableSnapError};
use crate::table::Item;

pub mod completion;

/// tablesnap - parallel full-table export into backup sinks
#[derive(Parser, Debug)]
#[command(
    name = "tablesnap",
    version,
    about = "Export a key-value table into a backup file using parallel segmented scans",
    long_about = "Scans every segment of a table concurrently, pages through each segment with
continuation tokens and writes every row, with its primary key projection, to a
JSON Lines backup file."
)]
pub struct CliArgs {
    /// Table to export
    #[arg(short = 't', long, value_name = "TABLE", global = true)]
    pub table: Option<String>,

    /// Region hosting the table
    #[arg(short = 'r', long, value_name = "REGION", global = true)]
    pub region: Option<String>,

    /// Table dump file served by the in-memory backend
    #[arg(short = 's', long, value_name = "FILE", global = true)]
    pub source: Option<PathBuf>,

    /// Fixed number of items per page
    #[arg(short = 'l', long, value_name = "N")]
    pub limit: Option<u32>,

    /// Fraction of provisioned read capacity to use per page (e.g. 0.25)
    #[arg(long, value_name = "FRACTION")]
    pub throughput_percent: Option<f64>,

    /// Number of segments scanned in parallel
    #[arg(long, value_name = "N")]
    pub segments: Option<u32>,

    /// Output file (defaults to <table>-<timestamp>.jsonl)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Stop the remaining segments as soon as one segment fails
    #[arg(long)]
    pub cancel_on_failure: bool,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for tablesnap
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration
        #[arg(long)]
        validate: bool,
    },

    /// Read a single item by primary key
    GetItem {
        /// Primary key in tagged JSON form, e.g. '{"id":{"S":"42"}}'
        #[arg(short = 'k', long, value_name = "JSON")]
        key: String,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        Self::from_args(args)
    }

    /// Build the interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and environment, then apply arguments
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Effective configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        config.apply_env()?;
        Self::apply_args_to_config(&mut config, args);
        Ok(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_export_args(config, args);
        Self::apply_logging_args(config, args);
    }

    /// Apply export-related CLI arguments to configuration
    fn apply_export_args(config: &mut Config, args: &CliArgs) {
        let export = &mut config.export;

        if let Some(table) = &args.table {
            export.table = table.clone();
        }
        if let Some(region) = &args.region {
            export.region = region.clone();
        }
        if let Some(source) = &args.source {
            export.source = Some(source.clone());
        }
        if let Some(output) = &args.output {
            export.output = Some(output.clone());
        }
        if args.limit.is_some() {
            export.page_limit = args.limit;
        }
        if args.throughput_percent.is_some() {
            export.throughput_percent = args.throughput_percent;
        }
        if let Some(segments) = args.segments {
            export.total_segments = segments;
        }
        if args.cancel_on_failure {
            export.cancel_on_failure = true;
        }
        if args.no_progress || args.quiet {
            export.show_progress = false;
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Output file for the export
    ///
    /// Uses the configured path, or `<table>-<timestamp>.jsonl` in the
    /// current directory.
    pub fn output_path(&self) -> PathBuf {
        match &self.config.export.output {
            Some(path) => path.clone(),
            None => PathBuf::from(Self::default_filename(&self.config.export.table)),
        }
    }

    /// Timestamped default output file name
    pub fn default_filename(table: &str) -> String {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        format!("{}-{}.jsonl", table, timestamp)
    }

    /// Parse the `--key` argument of `get-item`
    pub fn parse_key(json: &str) -> Result<Item> {
        let key: Item = serde_json::from_str(json)?;
        if key.is_empty() {
            return Err(TableSnapError::Generic(
                "Key must name at least one attribute".to_string(),
            ));
        }
        Ok(key)
    }

    /// Handle subcommands
    ///
    /// `get-item` needs the table backend and is left to the caller.
    ///
    /// # Returns
    /// * `Result<bool>` - True if subcommand was handled, false to continue
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                self.show_version();
                Ok(true)
            }
            Some(Commands::Completion { shell }) => {
                completion::generate_completion(shell)?;
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            Some(Commands::GetItem { .. }) | None => Ok(false),
        }
    }

    /// Show version information
    fn show_version(&self) {
        println!("tablesnap version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Handle config subcommand
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            match self.config.validate() {
                Ok(_) => println!("✅ Configuration is valid"),
                Err(e) => println!("❌ Configuration validation failed: {}", e),
            }
        }

        if show {
            let path = self.get_config_path();
            println!("Configuration file: {}", path.display());
            println!();
            println!("=== Effective Configuration ===");
            println!();
            println!("{}", self.config.to_toml_string()?);
        }

        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }

    /// Print a one-line description of the run
    pub fn print_banner(&self) {
        if !self.args.quiet {
            let export = &self.config.export;
            println!(
                "Exporting table '{}' ({}) with {} segment(s)",
                export.table, export.region, export.total_segments
            );
        }
    }
}
