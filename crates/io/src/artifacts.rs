// Audit artifact writers: cleaned data, defect subsets, audit log, JSON report

use std::path::{Path, PathBuf};

use spreadmart_audit::model::{AuditLog, AuditResult, DatasetBase, DefectSubset, Field, Schema};
use tracing::{debug, info};

use crate::error::IoError;
use crate::xlsx::{CellKind, SheetData};

pub const CLEANED_ARTIFACT: &str = "Cleaned_Data";
pub const AUDIT_LOG_ARTIFACT: &str = "Audit_Log";
pub const XLSX_REPORT_FILE: &str = "Audit_Report.xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One CSV file per artifact.
    #[default]
    Csv,
    /// One workbook, one sheet per artifact.
    Xlsx,
}

fn column_kinds(schema: &Schema) -> Vec<CellKind> {
    schema
        .columns
        .iter()
        .map(|c| match c.field {
            Field::UnitPrice | Field::Quantity | Field::Total => CellKind::Number,
            _ => CellKind::Text,
        })
        .chain(std::iter::once(CellKind::Text))
        .collect()
}

/// Cleaned-annotated dataset: schema columns, origin, both flags.
pub fn cleaned_sheet(result: &AuditResult) -> SheetData {
    let cleaned = &result.cleaned;
    let mut kinds = column_kinds(&cleaned.schema);
    kinds.push(CellKind::Flag);
    kinds.push(CellKind::Flag);
    SheetData {
        name: CLEANED_ARTIFACT.to_string(),
        headers: cleaned.headers(),
        kinds,
        rows: cleaned.rows(),
    }
}

/// One defect subset with the columns of its base dataset.
pub fn subset_sheet(result: &AuditResult, subset: &DefectSubset) -> SheetData {
    let schema = &result.raw.schema;
    let sentinel = match subset.base {
        DatasetBase::Raw => None,
        DatasetBase::Cleaned => Some(result.cleaned.sentinel.as_str()),
    };
    SheetData {
        name: subset.kind.artifact_name().to_string(),
        headers: schema.headers(),
        kinds: column_kinds(schema),
        rows: result
            .subset_records(subset)
            .into_iter()
            .map(|r| schema.render(r, sentinel))
            .collect(),
    }
}

/// `Issue,Count` table in report order.
pub fn audit_log_sheet(log: &AuditLog) -> SheetData {
    SheetData {
        name: AUDIT_LOG_ARTIFACT.to_string(),
        headers: vec!["Issue".to_string(), "Count".to_string()],
        kinds: vec![CellKind::Text, CellKind::Number],
        rows: log
            .entries()
            .iter()
            .map(|(issue, count)| vec![issue.to_string(), count.to_string()])
            .collect(),
    }
}

/// Every artifact of a run: cleaned data, the three subsets, then the log.
pub fn report_sheets(result: &AuditResult) -> Vec<SheetData> {
    let mut sheets = vec![cleaned_sheet(result)];
    sheets.extend(result.subsets().iter().map(|s| subset_sheet(result, s)));
    sheets.push(audit_log_sheet(&result.log));
    sheets
}

/// Write the run's artifacts into `out_dir`, returning the written paths.
pub fn write_report(result: &AuditResult, out_dir: &Path, format: ReportFormat) -> Result<Vec<PathBuf>, IoError> {
    std::fs::create_dir_all(out_dir).map_err(|e| IoError::io(out_dir, e))?;
    let sheets = report_sheets(result);

    let written = match format {
        ReportFormat::Csv => {
            let mut paths = Vec::with_capacity(sheets.len());
            for sheet in &sheets {
                let path = out_dir.join(format!("{}.csv", sheet.name));
                crate::csv::write_csv(&path, &sheet.headers, &sheet.rows)?;
                debug!(path = %path.display(), rows = sheet.rows.len(), "wrote artifact");
                paths.push(path);
            }
            paths
        }
        ReportFormat::Xlsx => {
            let path = out_dir.join(XLSX_REPORT_FILE);
            crate::xlsx::write_workbook(&path, &sheets)?;
            vec![path]
        }
    };

    info!(out_dir = %out_dir.display(), files = written.len(), "audit artifacts written");
    Ok(written)
}

/// The run summary as pretty JSON.
pub fn json_report(result: &AuditResult) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Read an `Issue,Count` table written by [`write_report`].
pub fn read_audit_log(path: &Path) -> Result<AuditLog, IoError> {
    let table = crate::source::read_source(path)?;
    let count = |issue: &str| -> Result<usize, IoError> {
        (0..table.len())
            .find(|&row| table.cell(row, "Issue").map(str::trim) == Some(issue))
            .and_then(|row| table.cell(row, "Count"))
            .and_then(|c| c.trim().parse::<usize>().ok())
            .ok_or_else(|| IoError::InvalidAuditLog {
                table: table.id.clone(),
                issue: issue.to_string(),
            })
    };
    Ok(AuditLog {
        total_rows: count(AuditLog::TOTAL_ROWS)?,
        duplicate_entries: count(AuditLog::DUPLICATE_ENTRIES)?,
        price_mismatch_products: count(AuditLog::PRICE_MISMATCHES)?,
        missing_values: count(AuditLog::MISSING_VALUES)?,
    })
}

pub fn write_json_report(result: &AuditResult, path: &Path) -> Result<(), IoError> {
    let json = json_report(result)?;
    std::fs::write(path, json).map_err(|e| IoError::io(path, e))
}
