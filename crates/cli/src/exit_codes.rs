//! CLI Exit Code Registry
//!
//! Single source of truth for the exit codes of `conciliador`.
//! Scheduled jobs and shell scripts branch on these values.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad arguments, bad date range)               |
//! | 3    | Catalog / adapter configuration error                     |
//! | 4    | Input error (unreadable file, missing required column)    |
//! | 5    | System query failed                                       |
//! | 6    | Output could not be written                               |
//! | 7    | Unmatched rows found (only with `--fail-on-unmatched`)    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use conciliador_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options, start after end.
pub const EXIT_USAGE: u8 = 2;

/// Catalog or adapter definition is invalid, or names an unknown
/// store / partner / adapter.
pub const EXIT_CONFIG: u8 = 3;

/// Delivery or system file unreadable, or missing a required column.
pub const EXIT_INPUT: u8 = 4;

/// Backend query failed (database unreachable, SQL error).
pub const EXIT_QUERY: u8 = 5;

/// Report file could not be written.
pub const EXIT_OUTPUT: u8 = 6;

/// Reconciliation finished but left unmatched rows (`--fail-on-unmatched`).
pub const EXIT_UNMATCHED: u8 = 7;

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG,
        ReconError::MissingColumn { .. } => EXIT_INPUT,
        ReconError::InvalidFilter(_) => EXIT_USAGE,
        ReconError::Query(_) => EXIT_QUERY,
        ReconError::Io(_) => EXIT_INPUT,
    }
}
