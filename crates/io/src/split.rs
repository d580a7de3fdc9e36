// Split a master extract into per-branch tables

use std::path::{Path, PathBuf};

use spreadmart_audit::SourceTable;
use tracing::debug;

use crate::error::IoError;

/// Branch name used for rows with an empty split value.
pub const UNKNOWN_BRANCH: &str = "UNKNOWN";

/// File name a branch table is written under.
pub fn branch_file_name(branch: &str) -> String {
    let safe: String = branch
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("store_{}.csv", safe)
}

/// Split `table` by the value of `column`, branches in order of first appearance.
/// Every output table keeps the full header row.
pub fn split_by_column(table: &SourceTable, column: &str) -> Result<Vec<SourceTable>, IoError> {
    let idx = table.column_index(column).ok_or_else(|| IoError::MissingColumn {
        table: table.id.clone(),
        column: column.to_string(),
    })?;

    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<Vec<Option<String>>>> =
        std::collections::HashMap::new();

    for row in &table.rows {
        let branch = row
            .get(idx)
            .and_then(|c| c.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_BRANCH)
            .to_string();
        groups
            .entry(branch.clone())
            .or_insert_with(|| {
                order.push(branch);
                Vec::new()
            })
            .push(row.clone());
    }

    let tables: Vec<SourceTable> = order
        .into_iter()
        .filter_map(|branch| {
            groups
                .remove(&branch)
                .map(|rows| SourceTable::new(branch_file_name(&branch), table.headers.clone(), rows))
        })
        .collect();

    debug!(source = %table.id, column, branches = tables.len(), "split extract");
    Ok(tables)
}

/// Write each branch table as CSV into `out_dir`, returning the written paths.
pub fn write_branches(tables: &[SourceTable], out_dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    std::fs::create_dir_all(out_dir).map_err(|e| IoError::io(out_dir, e))?;
    tables
        .iter()
        .map(|table| {
            let path = out_dir.join(&table.id);
            crate::csv::write_table(&path, table)?;
            Ok(path)
        })
        .collect()
}
