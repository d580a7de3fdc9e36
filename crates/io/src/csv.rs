// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use spreadmart_audit::SourceTable;

use crate::error::IoError;

/// Read a delimited file with a header row. The table id is the file name.
pub fn read_table(path: &Path) -> Result<SourceTable, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    table_from_str(&table_id(path), &content, delimiter)
}

pub fn read_tsv(path: &Path) -> Result<SourceTable, IoError> {
    let content = read_file_as_utf8(path)?;
    table_from_str(&table_id(path), &content, b'\t')
}

pub(crate) fn table_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as line 1) * field_count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::io(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::io(path, e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Parse delimited text. First record is the header row; empty cells are `None`.
pub fn table_from_str(id: &str, content: &str, delimiter: u8) -> Result<SourceTable, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        // Skip fully blank lines
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(
            record
                .iter()
                .map(|field| if field.is_empty() { None } else { Some(field.to_string()) })
                .collect(),
        );
    }

    Ok(SourceTable::new(id, headers, rows))
}

/// Serialize a header row plus text rows as CSV.
pub fn to_csv_string(headers: &[String], rows: &[Vec<String>]) -> Result<String, IoError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| IoError::io("<csv buffer>", e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_csv(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<(), IoError> {
    let content = to_csv_string(headers, rows)?;
    std::fs::write(path, content).map_err(|e| IoError::io(path, e))
}

/// Write a source table back out, empty cells as empty fields.
pub fn write_table(path: &Path, table: &SourceTable) -> Result<(), IoError> {
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|c| c.clone().unwrap_or_default()).collect())
        .collect();
    write_csv(path, &table.headers, &rows)
}
