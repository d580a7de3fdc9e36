//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! | Code | Meaning                                               |
//! |------|-------------------------------------------------------|
//! | 0    | Success (defects found in the data are not a failure) |
//! | 1    | General error (report serialization)                  |
//! | 2    | Usage error (bad args, unsupported file type)         |
//! | 3    | IO error (cannot read an input or write an artifact)  |
//! | 4    | Input schema error (columns, unparseable numbers)     |
//! | 5    | Config error (TOML parse or validation)               |

use spreadmart_audit::AuditError;
use spreadmart_io::IoError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - a failure that is neither input nor environment,
/// such as a report that does not serialize.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Input file cannot be read or an artifact cannot be written.
pub const EXIT_IO: u8 = 3;

/// Inputs do not share the expected schema, or a cell does not parse.
pub const EXIT_INPUT_SCHEMA: u8 = 4;

/// Audit config does not parse or fails validation.
pub const EXIT_CONFIG: u8 = 5;

pub fn audit_exit_code(err: &AuditError) -> u8 {
    match err {
        AuditError::ConfigParse(_) | AuditError::ConfigValidation(_) => EXIT_CONFIG,
        AuditError::EmptyInput => EXIT_USAGE,
        AuditError::Schema { .. }
        | AuditError::ReservedColumn { .. }
        | AuditError::MissingColumn { .. }
        | AuditError::InvalidNumber { .. } => EXIT_INPUT_SCHEMA,
    }
}

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::UnsupportedFormat(_) => EXIT_USAGE,
        IoError::MissingColumn { .. } | IoError::InvalidAuditLog { .. } => EXIT_INPUT_SCHEMA,
        IoError::Io { .. }
        | IoError::Csv(_)
        | IoError::Spreadsheet { .. }
        | IoError::Xlsx(_)
        | IoError::Zip(_) => EXIT_IO,
        IoError::Json(_) => EXIT_ERROR,
    }
}
