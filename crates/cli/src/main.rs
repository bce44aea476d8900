// stockmatch CLI - reconcile product catalogs exported from two platforms

mod exit_codes;
mod key;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "stockmatch")]
#[command(about = "Match catalog records across platforms by SKU, secondary keys and title overlap")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  stockmatch run woo-to-shopify.recon.toml
  stockmatch run woo-to-shopify.recon.toml --json
  stockmatch run images.recon.toml --merged images.merged.csv
  stockmatch run woo-to-shopify.recon.toml --fail-on-unmatched")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to file (overrides output.json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write source rows plus matched candidate columns to CSV (overrides output.merged_csv)
        #[arg(long)]
        merged: Option<PathBuf>,

        /// Exit 62 if any source record is left without a match
        #[arg(long)]
        fail_on_unmatched: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  stockmatch validate woo-to-shopify.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// Show the normalized key (and optionally title tokens) for text
    #[command(after_help = "\
Examples:
  stockmatch key HMH-100 'hmh 100'
  stockmatch key --tokens 'Big Bud Bloom Booster (1 Liter)'
  stockmatch key --filename 'https://cdn.test/coco-bulk-600x600.jpg?v=2'")]
    Key {
        /// Text to normalize
        #[arg(required = true)]
        text: Vec<String>,

        /// Also print title tokens used for fuzzy matching
        #[arg(long)]
        tokens: bool,

        /// Reduce each input to its image filename stem first
        #[arg(long)]
        filename: bool,

        /// Output JSON instead of plain lines
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            merged,
            fail_on_unmatched,
        } => recon::cmd_recon_run(recon::RunArgs {
            config,
            json,
            output,
            merged,
            fail_on_unmatched,
        }),
        Commands::Validate { config } => recon::cmd_recon_validate(config),
        Commands::Key {
            text,
            tokens,
            filename,
            json,
        } => key::cmd_key(text, tokens, filename, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
