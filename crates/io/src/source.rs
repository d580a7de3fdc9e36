// Branch extract loading by file extension

use std::path::{Path, PathBuf};

use spreadmart_audit::SourceTable;
use tracing::debug;

use crate::error::IoError;

/// File formats a branch extract can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Spreadsheet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            _ => Err(IoError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Read one extract. The table id is the file name.
pub fn read_source(path: &Path) -> Result<SourceTable, IoError> {
    let table = match SourceFormat::from_path(path)? {
        SourceFormat::Csv => crate::csv::read_table(path)?,
        SourceFormat::Tsv => crate::csv::read_tsv(path)?,
        SourceFormat::Spreadsheet => crate::xlsx::read_table(path)?,
    };
    debug!(source = %table.id, rows = table.len(), columns = table.headers.len(), "loaded source");
    Ok(table)
}

/// Read every extract, in the order given.
pub fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceTable>, IoError> {
    paths.iter().map(|p| read_source(p)).collect()
}
