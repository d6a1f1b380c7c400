//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | ledger           | Storage, config and lookup failures      |
//! | 10-19   | import           | Import outcomes and input problems       |
//! | 20-29   | persistence      | Snapshot upload and restore              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

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
// Ledger (3-9)
// =============================================================================

/// Ledger database cannot be opened or initialised.
pub const EXIT_STORAGE: u8 = 3;

/// Settings file exists but cannot be read or parsed.
pub const EXIT_CONFIG: u8 = 4;

/// Shot or game id does not exist.
pub const EXIT_NOT_FOUND: u8 = 5;

/// Analysis has nothing to report (unknown player, empty selection).
pub const EXIT_NO_DATA: u8 = 6;

// =============================================================================
// Import (10-19)
// =============================================================================

/// Every valid row was already in the ledger. Not a failure; reported
/// distinctly so scripts can tell a no-op re-import from a real one.
pub const EXIT_IMPORT_ALL_DUPLICATES: u8 = 10;

/// No row in the file could be imported (all rejected, or empty file).
pub const EXIT_IMPORT_NOTHING: u8 = 11;

/// Input file unreadable, malformed, or missing required header columns.
pub const EXIT_IMPORT_INPUT: u8 = 12;

// =============================================================================
// Persistence (20-29)
// =============================================================================

/// Change is stored locally but the snapshot could not be written.
pub const EXIT_SNAPSHOT_PENDING: u8 = 20;

/// Snapshot blob could not be decoded.
pub const EXIT_SNAPSHOT_INVALID: u8 = 21;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_STORAGE,
            EXIT_CONFIG,
            EXIT_NOT_FOUND,
            EXIT_NO_DATA,
            EXIT_IMPORT_ALL_DUPLICATES,
            EXIT_IMPORT_NOTHING,
            EXIT_IMPORT_INPUT,
            EXIT_SNAPSHOT_PENDING,
            EXIT_SNAPSHOT_INVALID,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
