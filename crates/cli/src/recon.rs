//! `stockmatch run` / `stockmatch validate`: config-driven catalog reconciliation.

use std::path::{Path, PathBuf};

use stockmatch_recon::config::{RoleConfig, StrategyConfig};
use stockmatch_recon::load::load_file;
use stockmatch_recon::merge::write_merged_csv;
use stockmatch_recon::model::{LoadedRecords, ReconInput, ReconReport};
use stockmatch_recon::{ReconConfig, ReconError};

use crate::exit_codes::{recon_exit_code, EXIT_RECON_RUNTIME, EXIT_RECON_UNMATCHED};
use crate::CliError;

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("column names are case-sensitive; check the header row of the input file".to_string())
            }
            ReconError::InvalidPlan(msg) if msg.contains("must be the last step") => {
                Some("move the fuzzy [[strategy]] to the end of the list".to_string())
            }
            _ => None,
        };
        CliError { code, message: err.to_string(), hint }
    }
}

/// Read and validate a config file.
fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    if !config_path.is_file() {
        return Err(CliError::args(format!("config file not found: {}", config_path.display()))
            .with_hint("input and output paths inside the config are resolved from its directory"));
    }
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        recon_err(EXIT_RECON_RUNTIME, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    Ok(ReconConfig::from_toml(&config_str)?)
}

pub struct RunArgs {
    pub config: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub merged: Option<PathBuf>,
    pub fail_on_unmatched: bool,
}

pub fn cmd_recon_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;

    // Resolve file paths relative to config file's directory
    let base_dir = args.config.parent().unwrap_or_else(|| Path::new("."));

    let input = ReconInput {
        source: load_role(base_dir, "source", &config.source)?,
        candidates: load_role(base_dir, "candidates", &config.candidates)?,
    };

    let report = stockmatch_recon::run(&config, &input)?;

    // JSON report
    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;

    let json_path = args
        .output
        .or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = json_path {
        std::fs::write(path, &json_str).map_err(|e| {
            recon_err(EXIT_RECON_RUNTIME, format!("cannot write {}: {e}", path.display()))
        })?;
        eprintln!("wrote {}", path.display());
    }

    // Merged CSV
    let merged_path = args
        .merged
        .or_else(|| config.output.merged_csv.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = merged_path {
        let file = std::fs::File::create(path).map_err(|e| {
            recon_err(EXIT_RECON_RUNTIME, format!("cannot write {}: {e}", path.display()))
        })?;
        write_merged_csv(file, &input.source, &report.results, &config.output.carry)?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    print_summary(&report);

    let s = &report.summary;
    let missing = s.unmatched + s.invalid;
    if args.fail_on_unmatched && missing > 0 {
        return Err(recon_err(
            EXIT_RECON_UNMATCHED,
            format!("{missing} source record(s) without a match (--fail-on-unmatched)"),
        ));
    }

    Ok(())
}

fn load_role(base_dir: &Path, role: &str, role_config: &RoleConfig) -> Result<LoadedRecords, CliError> {
    let path = base_dir.join(&role_config.file);
    load_file(role, &path, role_config).map_err(|e| match e {
        ReconError::Io(io) => recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {io}", path.display())),
        other => CliError::from(other),
    })
}

/// Human summary to stderr.
fn print_summary(report: &ReconReport) {
    let s = &report.summary;
    eprintln!(
        "recon '{}': {} records, {} matched ({} exact, {} fuzzy), {} unmatched, {} invalid, {:.1}% coverage",
        report.meta.config_name,
        s.total,
        s.matched,
        s.exact,
        s.fuzzy,
        s.unmatched,
        s.invalid,
        s.overall_coverage_percent,
    );

    if !s.counts_by_step.is_empty() {
        let steps: Vec<String> = s
            .counts_by_step
            .iter()
            .map(|(step, n)| format!("{step}={n}"))
            .collect();
        eprintln!("steps: {}", steps.join(", "));
    }

    if let Some(mean) = s.mean_fuzzy_score {
        eprintln!("mean fuzzy score: {mean:.3}");
    }

    if s.shared_candidates > 0 {
        eprintln!("{} candidate(s) matched by more than one source record", s.shared_candidates);
    }

    let collisions: usize = report.index.tables.iter().map(|t| t.collisions).sum();
    if collisions > 0 || report.index.invalid_candidates > 0 {
        eprintln!(
            "index: {} duplicate key(s) resolved, {} candidate(s) without keys",
            collisions, report.index.invalid_candidates,
        );
    }
}

pub fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    let steps: Vec<String> = config
        .strategies
        .iter()
        .map(|s| match s {
            StrategyConfig::Exact { name, .. } => name.clone(),
            StrategyConfig::Fuzzy { name, threshold } => format!("{name} (fuzzy >= {threshold})"),
        })
        .collect();

    eprintln!(
        "valid: recon '{}' with {} step(s): {}",
        config.name,
        steps.len(),
        steps.join(", "),
    );
    Ok(())
}
