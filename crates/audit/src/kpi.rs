use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::model::{AuditLog, CleanedDataset};

pub const DEFAULT_TOP_CATEGORIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginSales {
    pub origin: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySales {
    pub category: String,
    pub total: f64,
}

/// Reconciliation KPIs over a cleaned dataset.
///
/// Every figure describes the cleaned rows. The category split counts
/// categories with price-flagged rows after dedup, so it can be lower than
/// `Products with Price Mismatches` in the audit log, which is taken before
/// dedup: a conflict carried only by a removed duplicate is gone here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    pub total_rows: usize,
    pub price_flagged_rows: usize,
    pub anomaly_rows: usize,
    pub distinct_categories: usize,
    /// Categories with at least one price-flagged cleaned row.
    pub inconsistent_categories: usize,
    pub consistent_categories: usize,
    /// Sum of totals per origin, by origin name.
    pub sales_by_origin: Vec<OriginSales>,
    /// Best-selling categories, highest total first.
    pub top_categories: Vec<CategorySales>,
}

/// Clean vs duplicate row split of a run, for the duplicate distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicateSplit {
    pub clean_rows: usize,
    pub duplicate_rows: usize,
}

impl From<&AuditLog> for DuplicateSplit {
    fn from(log: &AuditLog) -> Self {
        Self {
            clean_rows: log.total_rows.saturating_sub(log.duplicate_entries),
            duplicate_rows: log.duplicate_entries,
        }
    }
}

/// Compute KPIs. Missing totals count as zero sales; rows without a category
/// are left out of category figures.
pub fn compute_kpis(cleaned: &CleanedDataset, top_n: usize) -> KpiReport {
    let mut by_origin: BTreeMap<&str, f64> = BTreeMap::new();
    let mut by_category: HashMap<&str, f64> = HashMap::new();
    let mut flagged_categories: BTreeSet<&str> = BTreeSet::new();

    for annotated in &cleaned.records {
        let record = &annotated.record;
        let total = record.total.unwrap_or(0.0);
        *by_origin.entry(record.origin.as_str()).or_insert(0.0) += total;

        if let Some(category) = record.category.as_deref() {
            *by_category.entry(category).or_insert(0.0) += total;
            if annotated.price_flag {
                flagged_categories.insert(category);
            }
        }
    }

    let distinct_categories = by_category.len();
    let inconsistent_categories = flagged_categories.len();

    let mut top: Vec<CategorySales> = by_category
        .into_iter()
        .map(|(category, total)| CategorySales {
            category: category.to_string(),
            total,
        })
        .collect();
    top.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    top.truncate(top_n);

    KpiReport {
        total_rows: cleaned.len(),
        price_flagged_rows: cleaned.records.iter().filter(|r| r.price_flag).count(),
        anomaly_rows: cleaned.records.iter().filter(|r| r.anomaly_flag).count(),
        distinct_categories,
        inconsistent_categories,
        consistent_categories: distinct_categories - inconsistent_categories,
        sales_by_origin: by_origin
            .into_iter()
            .map(|(origin, total)| OriginSales {
                origin: origin.to_string(),
                total,
            })
            .collect(),
        top_categories: top,
    }
}
