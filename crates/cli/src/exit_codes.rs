//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: billing scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Domain    | Description                                         |
//! |------|-----------|-----------------------------------------------------|
//! | 0    | Universal | Success                                             |
//! | 1    | Universal | General error (unspecified)                         |
//! | 2    | Universal | CLI usage error (bad args, missing input file)      |
//! | 3    | recon     | Invalid config (TOML parse or validation)           |
//! | 4    | recon     | Runtime error (unreadable input, schema, duplicates)|
//! | 5    | recon     | `--strict`: breaches or identifier mismatches found |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use previa_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, input file not found.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-5)
// =============================================================================

/// Config file failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 3;

/// Run could not complete: unreadable input, missing required column or
/// position, rejected duplicate identifiers, unwritable output.
pub const EXIT_RECON_RUNTIME: u8 = 4;

/// Run completed but `--strict` found SLA breaches or identifier mismatches.
pub const EXIT_RECON_MISMATCH: u8 = 5;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingColumn { .. }
        | ReconError::MissingPosition { .. }
        | ReconError::DuplicateKey { .. }
        | ReconError::Io(_) => EXIT_RECON_RUNTIME,
    }
}
