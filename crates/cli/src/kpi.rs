//! `spreadmart kpi`: figures over a cleaned dataset.

use std::path::PathBuf;

use serde::Serialize;
use spreadmart_audit::ingest::load_cleaned;
use spreadmart_audit::kpi::{compute_kpis, DuplicateSplit, KpiReport};
use spreadmart_io::artifacts::read_audit_log;
use spreadmart_io::read_source;

use crate::{load_config, CliError};

#[derive(Serialize)]
struct KpiOutput {
    #[serde(flatten)]
    report: KpiReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicate_split: Option<DuplicateSplit>,
}

pub fn cmd_kpi(
    file: PathBuf,
    config_path: Option<PathBuf>,
    log_path: Option<PathBuf>,
    top: usize,
    json_output: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let table = read_source(&file)?;
    let cleaned = load_cleaned(&table, &config)?;

    let duplicate_split = log_path
        .as_deref()
        .map(read_audit_log)
        .transpose()?
        .map(|log| DuplicateSplit::from(&log));

    let output = KpiOutput {
        report: compute_kpis(&cleaned, top),
        duplicate_split,
    };

    if json_output {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        print_kpis(&output);
    }
    Ok(())
}

fn print_kpis(output: &KpiOutput) {
    let r = &output.report;
    println!("rows:               {}", r.total_rows);
    println!("price-flagged rows: {}", r.price_flagged_rows);
    println!("anomaly rows:       {}", r.anomaly_rows);
    println!(
        "categories:         {} ({} consistent, {} inconsistent)",
        r.distinct_categories, r.consistent_categories, r.inconsistent_categories,
    );
    if let Some(split) = output.duplicate_split {
        println!(
            "duplicates:         {} clean rows, {} duplicate rows",
            split.clean_rows, split.duplicate_rows,
        );
    }

    println!();
    println!("sales by origin:");
    let width = r.sales_by_origin.iter().map(|o| o.origin.len()).max().unwrap_or(0);
    for o in &r.sales_by_origin {
        println!("  {:<width$}  {:>12.2}", o.origin, o.total, width = width);
    }

    println!();
    println!("top categories:");
    let width = r.top_categories.iter().map(|c| c.category.len()).max().unwrap_or(0);
    for (i, c) in r.top_categories.iter().enumerate() {
        println!("  {}. {:<width$}  {:>12.2}", i + 1, c.category, c.total, width = width);
    }
}
