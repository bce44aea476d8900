//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | recon            | Catalog reconciliation                   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use stockmatch_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Config file failed to parse or validate (bad TOML, misplaced fuzzy step,
/// unknown key field, carry column not loaded).
pub const EXIT_RECON_INVALID_CONFIG: u8 = 60;

/// Runtime failure: unreadable input, malformed CSV/JSON, missing column,
/// output not writable.
pub const EXIT_RECON_RUNTIME: u8 = 61;

/// Unmatched source records present and `--fail-on-unmatched` was given.
pub const EXIT_RECON_UNMATCHED: u8 = 62;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) | ReconError::InvalidPlan(_) => {
            EXIT_RECON_INVALID_CONFIG
        }
        ReconError::MissingColumn { .. }
        | ReconError::Csv { .. }
        | ReconError::Json { .. }
        | ReconError::Io(_) => EXIT_RECON_RUNTIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_invalid_config() {
        assert_eq!(
            recon_exit_code(&ReconError::ConfigValidation("x".into())),
            EXIT_RECON_INVALID_CONFIG
        );
        assert_eq!(recon_exit_code(&ReconError::InvalidPlan("x".into())), EXIT_RECON_INVALID_CONFIG);
    }

    #[test]
    fn input_errors_map_to_runtime() {
        let err = ReconError::MissingColumn {
            role: "source".into(),
            column: "sku".into(),
        };
        assert_eq!(recon_exit_code(&err), EXIT_RECON_RUNTIME);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(recon_exit_code(&ReconError::Io(io)), EXIT_RECON_RUNTIME);
    }
}
