//! Standard-score outlier detection.
//!
//! Scores are population z-scores over the whole record set. Every cell ends
//! up in one of three states: a defined score, a missing cell, or a field whose
//! statistic is undefined (fewer than two values, or no spread). Only defined
//! scores can flag a row.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::model::{Measure, Record};

/// Why a field's standard score cannot be computed. Never fatal: the field
/// simply flags no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedStatistic {
    #[error("fewer than two values ({count})")]
    TooFewValues { count: usize },
    #[error("zero standard deviation")]
    ZeroVariance,
}

/// Standard score of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Value(f64),
    Missing,
    Undefined,
}

impl Score {
    pub fn exceeds(&self, threshold: f64) -> bool {
        match self {
            Self::Value(z) => z.abs() > threshold,
            Self::Missing | Self::Undefined => false,
        }
    }
}

/// Population statistics of one scored field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub field: Measure,
    /// Number of non-missing values.
    pub count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undefined: Option<UndefinedStatistic>,
    /// Rows whose score on this field exceeds the threshold.
    pub flagged: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldScores {
    pub summary: FieldSummary,
    pub scores: Vec<Score>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyReport {
    /// One flag per record.
    pub flags: Vec<bool>,
    /// Indices of flagged records, in order.
    pub rows: Vec<usize>,
    pub fields: Vec<FieldSummary>,
}

/// Population mean and standard deviation.
///
/// Values are summed in sorted order so the result does not depend on the
/// order rows arrive in.
pub fn population_stats(values: &[f64]) -> Result<(f64, f64), UndefinedStatistic> {
    if values.len() < 2 {
        return Err(UndefinedStatistic::TooFewValues { count: values.len() });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    if sorted.first() == sorted.last() {
        return Err(UndefinedStatistic::ZeroVariance);
    }

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 || !std_dev.is_finite() {
        return Err(UndefinedStatistic::ZeroVariance);
    }
    Ok((mean, std_dev))
}

/// Score every record on one field.
pub fn score_field(records: &[Record], field: Measure, threshold: f64) -> FieldScores {
    let values: Vec<f64> = records.iter().filter_map(|r| r.measure(field)).collect();
    let count = values.len();

    let scores: Vec<Score>;
    let summary = match population_stats(&values) {
        Ok((mean, std_dev)) => {
            scores = records
                .iter()
                .map(|r| match r.measure(field) {
                    Some(v) => Score::Value((v - mean) / std_dev),
                    None => Score::Missing,
                })
                .collect();
            FieldSummary {
                field,
                count,
                mean: Some(mean),
                std_dev: Some(std_dev),
                undefined: None,
                flagged: scores.iter().filter(|s| s.exceeds(threshold)).count(),
            }
        }
        Err(reason) => {
            warn!(%field, %reason, "standard score undefined, no rows flagged on this field");
            scores = records
                .iter()
                .map(|r| match r.measure(field) {
                    Some(_) => Score::Undefined,
                    None => Score::Missing,
                })
                .collect();
            FieldSummary {
                field,
                count,
                mean: (count > 0).then(|| values.iter().sum::<f64>() / count as f64),
                std_dev: None,
                undefined: Some(reason),
                flagged: 0,
            }
        }
    };

    FieldScores { summary, scores }
}

/// Flag a record when the absolute score of any configured field exceeds the
/// threshold.
pub fn score_anomalies(records: &[Record], fields: &[Measure], threshold: f64) -> AnomalyReport {
    let mut flags = vec![false; records.len()];
    let mut summaries = Vec::with_capacity(fields.len());

    for &field in fields {
        let FieldScores { summary, scores } = score_field(records, field, threshold);
        for (flag, score) in flags.iter_mut().zip(&scores) {
            *flag |= score.exceeds(threshold);
        }
        summaries.push(summary);
    }

    let rows = flags
        .iter()
        .enumerate()
        .filter(|(_, f)| **f)
        .map(|(i, _)| i)
        .collect();

    AnomalyReport {
        flags,
        rows,
        fields: summaries,
    }
}
