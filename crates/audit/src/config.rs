use std::collections::HashSet;

use serde::Deserialize;

use crate::error::AuditError;
use crate::model::{Field, Measure};

/// Default standard-score threshold above which a value is an outlier.
pub const DEFAULT_Z_THRESHOLD: f64 = 2.5;
/// Default placeholder written in place of missing cells.
pub const DEFAULT_MISSING_SENTINEL: &str = "MISSING";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Audit run configuration. Every section has defaults matching the
/// supermarket sales extracts, so an empty document is a valid config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub duplicates: DuplicateConfig,
    #[serde(default)]
    pub consistency: ConsistencyConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "Retail audit".into()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            columns: ColumnMapping::default(),
            duplicates: DuplicateConfig::default(),
            consistency: ConsistencyConfig::default(),
            anomaly: AnomalyConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Header text of each required column in the branch extracts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMapping {
    pub transaction_id: String,
    pub category: String,
    pub date: String,
    pub unit_price: String,
    pub quantity: String,
    pub total: String,
    /// Header the origin tag is written under. Reserved: inputs may not carry it.
    pub origin: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            transaction_id: "Invoice ID".into(),
            category: "Product line".into(),
            date: "Date".into(),
            unit_price: "Unit price".into(),
            quantity: "Quantity".into(),
            total: "Total".into(),
            origin: "Source_File".into(),
        }
    }
}

impl ColumnMapping {
    /// Required (header, field) pairs, origin excluded.
    pub fn required(&self) -> [(&str, Field); 6] {
        [
            (self.transaction_id.as_str(), Field::TransactionId),
            (self.category.as_str(), Field::Category),
            (self.date.as_str(), Field::Date),
            (self.unit_price.as_str(), Field::UnitPrice),
            (self.quantity.as_str(), Field::Quantity),
            (self.total.as_str(), Field::Total),
        ]
    }

    /// Field held by a header; unmapped headers are passthrough columns.
    pub fn field_for(&self, header: &str) -> Field {
        self.required()
            .into_iter()
            .find(|(name, _)| *name == header)
            .map(|(_, field)| field)
            .unwrap_or_else(|| Field::Extra(header.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DuplicateConfig {
    /// Business key: fields that identify one transaction.
    pub key: Vec<Field>,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            key: vec![Field::TransactionId, Field::Category, Field::Date],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsistencyConfig {
    pub group_by: Field,
    pub measure: Measure,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            group_by: Field::Category,
            measure: Measure::UnitPrice,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnomalyConfig {
    pub fields: Vec<Measure>,
    pub threshold: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            fields: vec![Measure::Total, Measure::Quantity],
            threshold: DEFAULT_Z_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub missing_sentinel: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            missing_sentinel: DEFAULT_MISSING_SENTINEL.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AuditConfig {
    pub fn from_toml(input: &str) -> Result<Self, AuditError> {
        let config: AuditConfig =
            toml::from_str(input).map_err(|e| AuditError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AuditError> {
        // Column headers must be present and distinct
        let mut seen = HashSet::new();
        let origin = (self.columns.origin.as_str(), Field::Origin);
        for (header, field) in self.columns.required().into_iter().chain(std::iter::once(origin)) {
            if header.trim().is_empty() {
                return Err(AuditError::ConfigValidation(format!(
                    "column for '{field}' must not be empty"
                )));
            }
            if !seen.insert(header) {
                return Err(AuditError::ConfigValidation(format!(
                    "column '{header}' is mapped to more than one field"
                )));
            }
        }

        if self.duplicates.key.is_empty() {
            return Err(AuditError::ConfigValidation(
                "duplicate key needs at least one field".into(),
            ));
        }

        if self.anomaly.fields.is_empty() {
            return Err(AuditError::ConfigValidation(
                "anomaly scoring needs at least one field".into(),
            ));
        }

        if !self.anomaly.threshold.is_finite() || self.anomaly.threshold <= 0.0 {
            return Err(AuditError::ConfigValidation(format!(
                "anomaly threshold must be a positive number, got {}",
                self.anomaly.threshold
            )));
        }

        if self.output.missing_sentinel.is_empty() {
            return Err(AuditError::ConfigValidation(
                "missing_sentinel must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
