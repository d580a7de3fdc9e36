use std::collections::HashMap;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::anomaly::FieldSummary;

/// Column header written for the price flag of a cleaned record.
pub const PRICE_FLAG_COLUMN: &str = "Price_Flag";
/// Column header written for the anomaly flag of a cleaned record.
pub const ANOMALY_FLAG_COLUMN: &str = "Anomaly_Flag";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One raw branch extract as read from disk. `None` cells are empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    pub id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl SourceTable {
    pub fn new(id: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            id: id.into(),
            headers,
            rows,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at (row, column name). Short rows read as empty.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A column of the audited schema, addressed by meaning rather than header text.
///
/// Config files name fields with their snake_case names; anything else is taken
/// as the header of a passthrough column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Field {
    TransactionId,
    Category,
    Date,
    UnitPrice,
    Quantity,
    Total,
    Origin,
    Extra(String),
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        match name.as_str() {
            "transaction_id" => Self::TransactionId,
            "category" => Self::Category,
            "date" => Self::Date,
            "unit_price" => Self::UnitPrice,
            "quantity" => Self::Quantity,
            "total" => Self::Total,
            "origin" => Self::Origin,
            _ => Self::Extra(name),
        }
    }
}

impl From<Field> for String {
    fn from(field: Field) -> Self {
        field.to_string()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransactionId => write!(f, "transaction_id"),
            Self::Category => write!(f, "category"),
            Self::Date => write!(f, "date"),
            Self::UnitPrice => write!(f, "unit_price"),
            Self::Quantity => write!(f, "quantity"),
            Self::Total => write!(f, "total"),
            Self::Origin => write!(f, "origin"),
            Self::Extra(name) => write!(f, "{name}"),
        }
    }
}

/// Numeric fields that can be checked for consistency or scored for anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    UnitPrice,
    Quantity,
    Total,
}

impl From<Measure> for Field {
    fn from(measure: Measure) -> Self {
        match measure {
            Measure::UnitPrice => Field::UnitPrice,
            Measure::Quantity => Field::Quantity,
            Measure::Total => Field::Total,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Field::from(*self).fmt(f)
    }
}

/// Hashable value of one field, used for business keys and group values.
///
/// Numbers compare by exact value. Two missing cells are equal to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyPart {
    Missing,
    Number(OrderedFloat<f64>),
    Text(String),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, ""),
            Self::Number(n) => write!(f, "{}", format_number(n.0)),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Render a number the way spreadsheets show it: integers without decimals.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One transaction row. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub origin: String,
    pub transaction_id: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub unit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub total: Option<f64>,
    pub extra: HashMap<String, Option<String>>,
}

impl Record {
    pub fn measure(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::UnitPrice => self.unit_price,
            Measure::Quantity => self.quantity,
            Measure::Total => self.total,
        }
    }

    pub fn key_part(&self, field: &Field) -> KeyPart {
        let text = |v: &Option<String>| match v {
            Some(s) => KeyPart::Text(s.clone()),
            None => KeyPart::Missing,
        };
        let number = |v: Option<f64>| match v {
            Some(n) => KeyPart::Number(OrderedFloat(n)),
            None => KeyPart::Missing,
        };
        match field {
            Field::TransactionId => text(&self.transaction_id),
            Field::Category => text(&self.category),
            Field::Date => text(&self.date),
            Field::UnitPrice => number(self.unit_price),
            Field::Quantity => number(self.quantity),
            Field::Total => number(self.total),
            Field::Origin => KeyPart::Text(self.origin.clone()),
            Field::Extra(name) => self.extra.get(name).map(text).unwrap_or(KeyPart::Missing),
        }
    }

    pub fn key(&self, fields: &[Field]) -> Vec<KeyPart> {
        fields.iter().map(|f| self.key_part(f)).collect()
    }

    /// Cell text for output, `None` when the cell is missing.
    pub fn cell_text(&self, field: &Field) -> Option<String> {
        match self.key_part(field) {
            KeyPart::Missing => None,
            part => Some(part.to_string()),
        }
    }

    /// Number of missing cells. The origin tag is always present.
    pub fn missing_cells(&self) -> usize {
        let required = [
            self.transaction_id.is_none(),
            self.category.is_none(),
            self.date.is_none(),
            self.unit_price.is_none(),
            self.quantity.is_none(),
            self.total.is_none(),
        ];
        required.iter().filter(|m| **m).count()
            + self.extra.values().filter(|v| v.is_none()).count()
    }
}

/// One column of the unified schema: its header text and what it holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub field: Field,
}

/// Column layout shared by every input, in the first input's header order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub columns: Vec<Column>,
    /// Header under which the origin tag is written.
    pub origin_column: String,
}

impl Schema {
    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.name.clone())
            .chain(std::iter::once(self.origin_column.clone()))
            .collect()
    }

    /// Render a record as one text row (schema columns, then origin).
    pub fn render(&self, record: &Record, sentinel: Option<&str>) -> Vec<String> {
        let fill = |v: Option<String>| match (v, sentinel) {
            (Some(s), _) => s,
            (None, Some(marker)) => marker.to_string(),
            (None, None) => String::new(),
        };
        self.columns
            .iter()
            .map(|c| fill(record.cell_text(&c.field)))
            .chain(std::iter::once(record.origin.clone()))
            .collect()
    }
}

/// The unified, ingested table. Never mutated after ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub schema: Schema,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn missing_cells(&self) -> usize {
        self.records.iter().map(Record::missing_cells).sum()
    }
}

// ---------------------------------------------------------------------------
// Defect subsets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    Duplicates,
    PriceMismatches,
    Anomalies,
}

impl DefectKind {
    /// Artifact name used when the subset is written out.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Self::Duplicates => "Duplicates",
            Self::PriceMismatches => "Price_Mismatches",
            Self::Anomalies => "Suspicious_Transactions",
        }
    }
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicates => write!(f, "duplicates"),
            Self::PriceMismatches => write!(f, "price_mismatches"),
            Self::Anomalies => write!(f, "anomalies"),
        }
    }
}

/// Which dataset a subset's row indices point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetBase {
    Raw,
    Cleaned,
}

/// Filtered view of a dataset: indices into the base, in base order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectSubset {
    pub kind: DefectKind,
    pub base: DatasetBase,
    pub rows: Vec<usize>,
}

impl DefectSubset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records<'a>(&'a self, records: &'a [Record]) -> impl Iterator<Item = &'a Record> + 'a {
        self.rows.iter().filter_map(move |&i| records.get(i))
    }
}

// ---------------------------------------------------------------------------
// Cleaned output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedRecord {
    pub record: Record,
    pub price_flag: bool,
    pub anomaly_flag: bool,
}

/// Deduplicated, annotated dataset. Missing cells render as the sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDataset {
    pub schema: Schema,
    pub records: Vec<AnnotatedRecord>,
    pub sentinel: String,
}

impl CleanedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = self.schema.headers();
        headers.push(PRICE_FLAG_COLUMN.to_string());
        headers.push(ANOMALY_FLAG_COLUMN.to_string());
        headers
    }

    /// Text rows with the sentinel in place of every missing cell.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|r| {
                let mut row = self.schema.render(&r.record, Some(&self.sentinel));
                row.push(flag_text(r.price_flag).to_string());
                row.push(flag_text(r.anomaly_flag).to_string());
                row
            })
            .collect()
    }

    pub fn plain_records(&self) -> Vec<Record> {
        self.records.iter().map(|r| r.record.clone()).collect()
    }

    /// Drop the annotations, giving a dataset that can be audited again.
    pub fn into_dataset(self) -> Dataset {
        Dataset {
            schema: self.schema,
            records: self.records.into_iter().map(|r| r.record).collect(),
        }
    }
}

pub fn flag_text(flag: bool) -> &'static str {
    if flag {
        "TRUE"
    } else {
        "FALSE"
    }
}

// ---------------------------------------------------------------------------
// Audit log + result
// ---------------------------------------------------------------------------

/// Issue counts for one run. Field order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditLog {
    #[serde(rename = "Total Rows")]
    pub total_rows: usize,
    #[serde(rename = "Duplicate Entries")]
    pub duplicate_entries: usize,
    #[serde(rename = "Products with Price Mismatches")]
    pub price_mismatch_products: usize,
    #[serde(rename = "Missing Values")]
    pub missing_values: usize,
}

impl AuditLog {
    pub const TOTAL_ROWS: &'static str = "Total Rows";
    pub const DUPLICATE_ENTRIES: &'static str = "Duplicate Entries";
    pub const PRICE_MISMATCHES: &'static str = "Products with Price Mismatches";
    pub const MISSING_VALUES: &'static str = "Missing Values";

    pub fn entries(&self) -> [(&'static str, usize); 4] {
        [
            (Self::TOTAL_ROWS, self.total_rows),
            (Self::DUPLICATE_ENTRIES, self.duplicate_entries),
            (Self::PRICE_MISMATCHES, self.price_mismatch_products),
            (Self::MISSING_VALUES, self.missing_values),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub sources: Vec<String>,
}

/// Everything one audit run produces.
#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub meta: AuditMeta,
    pub log: AuditLog,
    pub duplicates_removed: usize,
    pub inconsistent_groups: Vec<KeyPart>,
    pub anomaly_fields: Vec<FieldSummary>,
    pub duplicates: DefectSubset,
    pub mismatches: DefectSubset,
    pub anomalies: DefectSubset,
    #[serde(skip)]
    pub raw: Dataset,
    #[serde(skip)]
    pub cleaned: CleanedDataset,
}

impl AuditResult {
    /// Resolve a subset's indices against the dataset it was taken from.
    pub fn subset_records<'a>(&'a self, subset: &'a DefectSubset) -> Vec<&'a Record> {
        match subset.base {
            DatasetBase::Raw => subset.records(&self.raw.records).collect(),
            DatasetBase::Cleaned => subset
                .rows
                .iter()
                .filter_map(|&i| self.cleaned.records.get(i).map(|r| &r.record))
                .collect(),
        }
    }

    pub fn subsets(&self) -> [&DefectSubset; 3] {
        [&self.duplicates, &self.mismatches, &self.anomalies]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            origin: "store_A.csv".into(),
            transaction_id: Some("750-67-8428".into()),
            category: Some("Health and beauty".into()),
            date: None,
            unit_price: Some(74.69),
            quantity: Some(7.0),
            total: None,
            extra: HashMap::from([
                ("City".to_string(), Some("Yangon".to_string())),
                ("Payment".to_string(), None),
            ]),
        }
    }

    #[test]
    fn field_names_round_trip_through_strings() {
        for name in ["transaction_id", "category", "date", "unit_price", "quantity", "total", "origin"] {
            let field = Field::from(name.to_string());
            assert!(!matches!(field, Field::Extra(_)), "{name} should be a known field");
            assert_eq!(field.to_string(), name);
        }
        assert_eq!(Field::from("City".to_string()), Field::Extra("City".into()));
    }

    #[test]
    fn missing_cells_counts_required_and_extra() {
        assert_eq!(record().missing_cells(), 3);
    }

    #[test]
    fn key_parts_treat_missing_as_equal() {
        let a = record();
        let mut b = record();
        b.origin = "store_B.csv".into();
        let key = [Field::TransactionId, Field::Date, Field::Extra("Payment".into())];
        assert_eq!(a.key(&key), b.key(&key));
        assert_ne!(a.key(&[Field::Origin]), b.key(&[Field::Origin]));
    }

    #[test]
    fn number_formatting_drops_integral_decimals() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(74.69), "74.69");
        assert_eq!(KeyPart::Number(OrderedFloat(-3.0)).to_string(), "-3");
    }

    #[test]
    fn schema_render_fills_sentinel() {
        let schema = Schema {
            columns: vec![
                Column { name: "Invoice ID".into(), field: Field::TransactionId },
                Column { name: "Date".into(), field: Field::Date },
                Column { name: "Payment".into(), field: Field::Extra("Payment".into()) },
            ],
            origin_column: "Source_File".into(),
        };
        let row = schema.render(&record(), Some("MISSING"));
        assert_eq!(row, vec!["750-67-8428", "MISSING", "MISSING", "store_A.csv"]);
        let raw = schema.render(&record(), None);
        assert_eq!(raw[1], "");
        assert_eq!(schema.headers().last().map(String::as_str), Some("Source_File"));
    }

    #[test]
    fn audit_log_keeps_report_order() {
        let log = AuditLog {
            total_rows: 30,
            duplicate_entries: 4,
            price_mismatch_products: 1,
            missing_values: 2,
        };
        let names: Vec<_> = log.entries().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["Total Rows", "Duplicate Entries", "Products with Price Mismatches", "Missing Values"]
        );
        assert_eq!(log.entries()[1], ("Duplicate Entries", 4));

        let json = serde_json::to_string(&log).unwrap();
        assert!(json.starts_with("{\"Total Rows\":30,\"Duplicate Entries\":4"));
    }
}
