// Excel file import (xlsx, xls, xlsb, ods) and export (xlsx only)
//
// Import: first worksheet only, first row is the header row.
// Export: one worksheet per artifact, header row bold and frozen.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use spreadmart_audit::SourceTable;
use tracing::debug;

use crate::csv::table_id;
use crate::error::IoError;

/// Excel's worksheet name limit.
const MAX_SHEET_NAME: usize = 31;

/// Read the first worksheet of a workbook as a table.
pub fn read_table(path: &Path) -> Result<SourceTable, IoError> {
    let spreadsheet_err = |message: String| IoError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| spreadsheet_err(format!("failed to open: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| spreadsheet_err("workbook contains no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| spreadsheet_err(format!("failed to read sheet '{}': {}", sheet_name, e)))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(row) => row
            .iter()
            .map(|c| cell_text(c).map(|s| s.trim().to_string()).unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };

    let rows: Vec<Vec<Option<String>>> = rows_iter
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(Option::is_some))
        .collect();

    debug!(path = %path.display(), sheet = %sheet_name, rows = rows.len(), "read worksheet");
    Ok(SourceTable::new(table_id(path), headers, rows))
}

/// Text of one cell. Empty cells, empty strings and error cells are `None`.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Some(format!("{}", *n as i64))
            } else {
                Some(format!("{}", n))
            }
        }
        Data::Int(n) => Some(format!("{}", n)),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(_) => None,
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if datetime.time() == chrono::NaiveTime::MIN => {
                Some(datetime.date().format("%Y-%m-%d").to_string())
            }
            Some(datetime) => Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Some(format!("{}", dt.as_f64())),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// How a column's text is written to the worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Text,
    /// Numeric when the text parses, text otherwise (e.g. a missing-value marker).
    Number,
    /// TRUE/FALSE written as a boolean.
    Flag,
}

/// One worksheet's worth of rows.
#[derive(Debug, Clone)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub kinds: Vec<CellKind>,
    pub rows: Vec<Vec<String>>,
}

/// Write each sheet into a single XLSX workbook.
pub fn write_workbook(path: &Path, sheets: &[SheetData]) -> Result<(), IoError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let name: String = sheet.name.chars().take(MAX_SHEET_NAME).collect();
        let worksheet = workbook.add_worksheet().set_name(&name)?;
        write_sheet(worksheet, sheet, &header_format)?;
    }

    workbook.save(path)?;
    debug!(path = %path.display(), sheets = sheets.len(), "wrote workbook");
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &SheetData, header_format: &Format) -> Result<(), IoError> {
    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, header_format)?;
    }
    if !sheet.headers.is_empty() {
        worksheet.set_freeze_panes(1, 0)?;
    }

    for (i, row) in sheet.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, text) in row.iter().enumerate() {
            let c = col as u16;
            let kind = sheet.kinds.get(col).copied().unwrap_or(CellKind::Text);
            match kind {
                CellKind::Number => match spreadmart_audit::ingest::parse_number(text) {
                    Some(n) => {
                        worksheet.write_number(r, c, n)?;
                    }
                    None if text.is_empty() => {}
                    None => {
                        worksheet.write_string(r, c, text)?;
                    }
                },
                CellKind::Flag if text == "TRUE" || text == "FALSE" => {
                    worksheet.write_boolean(r, c, text == "TRUE")?;
                }
                _ => {
                    if !text.is_empty() {
                        worksheet.write_string(r, c, text)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_cells_drop_integral_decimals() {
        assert_eq!(cell_text(&Data::Float(5.0)), Some("5".to_string()));
        assert_eq!(cell_text(&Data::Float(74.69)), Some("74.69".to_string()));
        assert_eq!(cell_text(&Data::Int(7)), Some("7".to_string()));
    }

    #[test]
    fn empty_cells_are_missing() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String(String::new())), None);
        assert_eq!(cell_text(&Data::Bool(true)), Some("TRUE".to_string()));
        assert_eq!(cell_text(&Data::Error(calamine::CellErrorType::NA)), None);
        assert_eq!(cell_text(&Data::Error(calamine::CellErrorType::Div0)), None);
    }

    #[test]
    fn workbook_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let sheet = SheetData {
            name: "Cleaned_Data".into(),
            headers: vec!["Invoice ID".into(), "Total".into(), "Price_Flag".into()],
            kinds: vec![CellKind::Text, CellKind::Number, CellKind::Flag],
            rows: vec![
                vec!["750-67-8428".into(), "548.97".into(), "FALSE".into()],
                vec!["226-31-3081".into(), "MISSING".into(), "TRUE".into()],
                vec!["631-41-3108".into(), "".into(), "FALSE".into()],
            ],
        };
        write_workbook(&path, &[sheet]).unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.id, "report.xlsx");
        assert_eq!(table.headers, vec!["Invoice ID", "Total", "Price_Flag"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, "Total"), Some("548.97"));
        assert_eq!(table.cell(1, "Total"), Some("MISSING"));
        assert_eq!(table.cell(1, "Price_Flag"), Some("TRUE"));
        assert_eq!(table.rows[2][1], None);
        assert_eq!(table.cell(2, "Total"), None);
    }

    #[test]
    fn long_sheet_names_are_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.xlsx");
        let sheet = SheetData {
            name: "A".repeat(40),
            headers: vec!["x".into()],
            kinds: vec![CellKind::Text],
            rows: vec![vec!["1".into()]],
        };
        write_workbook(&path, &[sheet]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_workbook_is_an_error() {
        let err = read_table(Path::new("/nonexistent/book.xlsx")).unwrap_err();
        assert!(matches!(err, IoError::Spreadsheet { .. }));
    }
}
