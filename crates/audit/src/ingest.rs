use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::config::{AuditConfig, ColumnMapping};
use crate::error::AuditError;
use crate::model::{
    AnnotatedRecord, CleanedDataset, Column, Dataset, Field, Record, Schema, SourceTable,
    ANOMALY_FLAG_COLUMN, PRICE_FLAG_COLUMN,
};

/// Cell texts read as missing, the same set spreadsheet exports and pandas
/// use for "no value".
pub const NULL_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True for an empty cell or one of [`NULL_TOKENS`].
pub fn is_null_token(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || NULL_TOKENS.contains(&text)
}

/// Concatenate branch tables into one dataset, in input order, tagging every
/// row with the id of the table it came from.
///
/// Every table must carry the same column set as the first one (column order
/// may differ; cells are mapped by header). Required columns are validated and
/// numeric cells parsed here, once.
pub fn ingest(sources: &[SourceTable], columns: &ColumnMapping) -> Result<Dataset, AuditError> {
    let first = sources.first().ok_or(AuditError::EmptyInput)?;
    let expected: BTreeSet<&str> = first.headers.iter().map(String::as_str).collect();

    for source in sources {
        check_columns(source, first, &expected)?;
    }

    if expected.contains(columns.origin.as_str()) {
        return Err(AuditError::ReservedColumn {
            source_id: first.id.clone(),
            column: columns.origin.clone(),
        });
    }

    for (header, _) in columns.required() {
        if !expected.contains(header) {
            return Err(AuditError::MissingColumn {
                source_id: first.id.clone(),
                column: header.to_string(),
            });
        }
    }

    let mut schema_columns: Vec<Column> = Vec::with_capacity(first.headers.len());
    for header in &first.headers {
        if schema_columns.iter().any(|c| &c.name == header) {
            continue;
        }
        schema_columns.push(Column {
            name: header.clone(),
            field: columns.field_for(header),
        });
    }
    let schema = Schema {
        columns: schema_columns,
        origin_column: columns.origin.clone(),
    };

    let total: usize = sources.iter().map(SourceTable::len).sum();
    let mut records = Vec::with_capacity(total);
    for source in sources {
        let before = records.len();
        load_source(source, &schema, &mut records)?;
        debug!(source = %source.id, rows = records.len() - before, "ingested source");
    }

    Ok(Dataset { schema, records })
}

fn check_columns(
    source: &SourceTable,
    first: &SourceTable,
    expected: &BTreeSet<&str>,
) -> Result<(), AuditError> {
    let found: BTreeSet<&str> = source.headers.iter().map(String::as_str).collect();
    if &found == expected {
        return Ok(());
    }
    Err(AuditError::Schema {
        source_id: source.id.clone(),
        expected_from: first.id.clone(),
        missing: expected.difference(&found).map(|s| s.to_string()).collect(),
        unexpected: found.difference(expected).map(|s| s.to_string()).collect(),
    })
}

fn load_source(
    source: &SourceTable,
    schema: &Schema,
    out: &mut Vec<Record>,
) -> Result<(), AuditError> {
    // Position of each schema column in this source's header row
    let positions: Vec<Option<usize>> = schema
        .columns
        .iter()
        .map(|c| source.column_index(&c.name))
        .collect();

    for (row_idx, row) in source.rows.iter().enumerate() {
        let mut record = Record {
            origin: source.id.clone(),
            transaction_id: None,
            category: None,
            date: None,
            unit_price: None,
            quantity: None,
            total: None,
            extra: HashMap::new(),
        };

        for (column, pos) in schema.columns.iter().zip(&positions) {
            let cell = pos
                .and_then(|p| row.get(p))
                .and_then(|c| c.as_deref())
                .filter(|c| !is_null_token(c));

            let number = || -> Result<Option<f64>, AuditError> {
                cell.map(|text| {
                    parse_number(text).ok_or_else(|| AuditError::InvalidNumber {
                        source_id: source.id.clone(),
                        row: row_idx + 1,
                        column: column.name.clone(),
                        value: text.to_string(),
                    })
                })
                .transpose()
            };

            match &column.field {
                Field::TransactionId => record.transaction_id = cell.map(str::to_string),
                Field::Category => record.category = cell.map(str::to_string),
                Field::Date => record.date = cell.map(str::to_string),
                Field::UnitPrice => record.unit_price = number()?,
                Field::Quantity => record.quantity = number()?,
                Field::Total => record.total = number()?,
                Field::Origin => {}
                Field::Extra(name) => {
                    record.extra.insert(name.clone(), cell.map(str::to_string));
                }
            }
        }

        out.push(record);
    }

    Ok(())
}

/// Read back a cleaned table written by an earlier run: origin and flag
/// columns are restored, sentinel cells become missing again.
pub fn load_cleaned(table: &SourceTable, config: &AuditConfig) -> Result<CleanedDataset, AuditError> {
    let locate = |column: &str| {
        table.column_index(column).ok_or_else(|| AuditError::MissingColumn {
            source_id: table.id.clone(),
            column: column.to_string(),
        })
    };
    let origin_idx = locate(&config.columns.origin)?;
    let price_idx = locate(PRICE_FLAG_COLUMN)?;
    let anomaly_idx = locate(ANOMALY_FLAG_COLUMN)?;

    let sentinel = config.output.missing_sentinel.as_str();
    let data_cols: Vec<usize> = (0..table.headers.len())
        .filter(|i| ![origin_idx, price_idx, anomaly_idx].contains(i))
        .collect();

    let stripped = SourceTable::new(
        table.id.clone(),
        data_cols.iter().map(|&i| table.headers[i].clone()).collect(),
        table
            .rows
            .iter()
            .map(|row| {
                data_cols
                    .iter()
                    .map(|&i| row.get(i).cloned().flatten().filter(|c| c != sentinel))
                    .collect()
            })
            .collect(),
    );
    let dataset = ingest(std::slice::from_ref(&stripped), &config.columns)?;

    let records = dataset
        .records
        .into_iter()
        .zip(&table.rows)
        .map(|(mut record, row)| {
            if let Some(origin) = cell(row, origin_idx).filter(|o| !o.is_empty()) {
                record.origin = origin.to_string();
            }
            AnnotatedRecord {
                record,
                price_flag: parse_flag(cell(row, price_idx)),
                anomaly_flag: parse_flag(cell(row, anomaly_idx)),
            }
        })
        .collect();

    Ok(CleanedDataset {
        schema: dataset.schema,
        records,
        sentinel: sentinel.to_string(),
    })
}

fn cell(row: &[Option<String>], idx: usize) -> Option<&str> {
    row.get(idx).and_then(|c| c.as_deref())
}

fn parse_flag(cell: Option<&str>) -> bool {
    matches!(
        cell.map(str::trim),
        Some("TRUE") | Some("True") | Some("true") | Some("1")
    )
}

/// Parse a numeric cell. Surrounding whitespace is ignored; NaN and
/// infinities are rejected.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
