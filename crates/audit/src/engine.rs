use std::collections::HashSet;

use tracing::{debug, info};

use crate::anomaly::score_anomalies;
use crate::config::AuditConfig;
use crate::consistency::check_consistency;
use crate::duplicates::{find_duplicates, first_occurrences};
use crate::error::AuditError;
use crate::ingest::ingest;
use crate::model::{
    AnnotatedRecord, AuditLog, AuditMeta, AuditResult, CleanedDataset, Dataset, DatasetBase,
    DefectKind, DefectSubset, KeyPart, SourceTable,
};

/// Run a full audit over raw branch tables: ingest, detect, clean, annotate.
///
/// All-or-nothing: the first failing stage aborts the run.
pub fn reconcile(sources: &[SourceTable], config: &AuditConfig) -> Result<AuditResult, AuditError> {
    config.validate()?;
    let dataset = ingest(sources, &config.columns)?;
    reconcile_dataset(dataset, config)
}

/// Audit an already-ingested dataset. The dataset is kept unchanged in the
/// result; the cleaned dataset is a new artifact.
pub fn reconcile_dataset(dataset: Dataset, config: &AuditConfig) -> Result<AuditResult, AuditError> {
    config.validate()?;
    let records = &dataset.records;

    // Duplicates (symmetric) on the raw rows
    let duplicate_rows = find_duplicates(records, &config.duplicates.key);
    debug!(rows = duplicate_rows.len(), "duplicate detection");

    // Consistency on the raw rows
    let consistency = check_consistency(
        records,
        &config.consistency.group_by,
        config.consistency.measure,
    );
    debug!(
        groups = consistency.groups_checked,
        inconsistent = consistency.inconsistent_groups.len(),
        "consistency check"
    );

    // Missing cells before any cleaning
    let missing_values = dataset.missing_cells();

    // Keep the first row per business key
    let keep = first_occurrences(records, &config.duplicates.key);
    let cleaned_records: Vec<_> = keep.iter().map(|&i| records[i].clone()).collect();
    let duplicates_removed = records.len() - cleaned_records.len();
    debug!(kept = cleaned_records.len(), removed = duplicates_removed, "deduplicated");

    // Flags are computed over the cleaned rows only
    let cleaned_consistency = check_consistency(
        &cleaned_records,
        &config.consistency.group_by,
        config.consistency.measure,
    );
    let price_flagged: HashSet<usize> = cleaned_consistency.rows.iter().copied().collect();
    let anomalies = score_anomalies(&cleaned_records, &config.anomaly.fields, config.anomaly.threshold);

    let annotated = cleaned_records
        .into_iter()
        .enumerate()
        .map(|(i, record)| AnnotatedRecord {
            record,
            price_flag: price_flagged.contains(&i),
            anomaly_flag: anomalies.flags[i],
        })
        .collect();

    let log = AuditLog {
        total_rows: dataset.len(),
        duplicate_entries: duplicate_rows.len(),
        price_mismatch_products: consistency.inconsistent_groups.len(),
        missing_values,
    };

    let sources = distinct_origins(&dataset);

    info!(
        total_rows = log.total_rows,
        duplicates = log.duplicate_entries,
        price_mismatches = log.price_mismatch_products,
        missing = log.missing_values,
        anomalies = anomalies.rows.len(),
        "audit complete"
    );

    Ok(AuditResult {
        meta: AuditMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            sources,
        },
        log,
        duplicates_removed,
        inconsistent_groups: consistency.inconsistent_groups,
        anomaly_fields: anomalies.fields,
        duplicates: DefectSubset {
            kind: DefectKind::Duplicates,
            base: DatasetBase::Raw,
            rows: duplicate_rows,
        },
        mismatches: DefectSubset {
            kind: DefectKind::PriceMismatches,
            base: DatasetBase::Raw,
            rows: consistency.rows,
        },
        anomalies: DefectSubset {
            kind: DefectKind::Anomalies,
            base: DatasetBase::Cleaned,
            rows: anomalies.rows,
        },
        cleaned: CleanedDataset {
            schema: dataset.schema.clone(),
            records: annotated,
            sentinel: config.output.missing_sentinel.clone(),
        },
        raw: dataset,
    })
}

fn distinct_origins(dataset: &Dataset) -> Vec<String> {
    let mut seen = HashSet::new();
    dataset
        .records
        .iter()
        .filter(|r| seen.insert(r.origin.as_str()))
        .map(|r| r.origin.clone())
        .collect()
}

/// Group values flagged inconsistent, as display text.
pub fn group_labels(groups: &[KeyPart]) -> Vec<String> {
    groups.iter().map(|g| g.to_string()).collect()
}
