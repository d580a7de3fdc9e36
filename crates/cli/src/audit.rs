//! `spreadmart audit` and `spreadmart validate`.

use std::path::PathBuf;

use spreadmart_audit::engine::group_labels;
use spreadmart_audit::AuditResult;
use spreadmart_io::artifacts::json_report;
use spreadmart_io::bundle::BUNDLE_FILE_NAME;
use spreadmart_io::ReportFormat;

use crate::{load_config, CliError};

pub fn cmd_audit(
    files: Vec<PathBuf>,
    config_path: Option<PathBuf>,
    out_dir: PathBuf,
    format: ReportFormat,
    zip: bool,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let sources = spreadmart_io::read_sources(&files)?;
    let result = spreadmart_audit::reconcile(&sources, &config)?;

    let mut written = spreadmart_io::write_report(&result, &out_dir, format)?;
    if zip {
        let zip_path = out_dir.join(BUNDLE_FILE_NAME);
        spreadmart_io::bundle(&written, &zip_path)?;
        written.push(zip_path);
    }
    for path in &written {
        eprintln!("wrote {}", path.display());
    }

    if json_output || output_file.is_some() {
        let json_str = json_report(&result)?;

        if let Some(ref path) = output_file {
            spreadmart_io::write_json_report(&result, path)?;
            eprintln!("wrote {}", path.display());
        }

        if json_output {
            println!("{json_str}");
        }
    }

    print_summary(&result);
    Ok(())
}

/// Human summary to stderr
fn print_summary(result: &AuditResult) {
    let log = &result.log;
    eprintln!(
        "audit '{}': {} source(s), {} rows, {} after removing duplicates",
        result.meta.config_name,
        result.meta.sources.len(),
        log.total_rows,
        result.cleaned.len(),
    );
    eprintln!(
        "  duplicate entries: {} ({} removed)",
        log.duplicate_entries, result.duplicates_removed,
    );
    if result.inconsistent_groups.is_empty() {
        eprintln!("  products with price mismatches: 0");
    } else {
        eprintln!(
            "  products with price mismatches: {} ({})",
            log.price_mismatch_products,
            group_labels(&result.inconsistent_groups).join(", "),
        );
    }
    eprintln!("  missing values: {}", log.missing_values);
    eprintln!("  suspicious transactions: {}", result.anomalies.len());

    for field in &result.anomaly_fields {
        if let Some(reason) = field.undefined {
            eprintln!("  {} not scored: {}", field.field, reason);
        }
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(config_path.as_path()))?;
    let key: Vec<String> = config.duplicates.key.iter().map(ToString::to_string).collect();
    let fields: Vec<String> = config.anomaly.fields.iter().map(ToString::to_string).collect();
    eprintln!(
        "valid: audit '{}' keyed on ({}), {} checked per {}, scoring {} at |z| > {}",
        config.name,
        key.join(", "),
        config.consistency.measure,
        config.consistency.group_by,
        fields.join(", "),
        config.anomaly.threshold,
    );
    Ok(())
}
