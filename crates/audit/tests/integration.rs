use std::collections::{BTreeMap, HashSet};

use spreadmart_audit::config::AuditConfig;
use spreadmart_audit::consistency::distinct_values;
use spreadmart_audit::engine::{reconcile, reconcile_dataset};
use spreadmart_audit::error::AuditError;
use spreadmart_audit::kpi::compute_kpis;
use spreadmart_audit::model::{DatasetBase, Field, KeyPart, Measure, SourceTable};

const HEADERS: [&str; 8] = [
    "Invoice ID", "Branch", "City", "Product line", "Unit price", "Quantity", "Total", "Date",
];

/// One sale row in HEADERS order.
fn sale(id: &str, branch: &str, line: &str, price: f64, qty: f64, date: &str) -> Vec<Option<String>> {
    vec![
        Some(id.to_string()),
        Some(branch.to_string()),
        Some("Yangon".to_string()),
        Some(line.to_string()),
        Some(price.to_string()),
        Some(qty.to_string()),
        Some((price * qty).to_string()),
        Some(date.to_string()),
    ]
}

fn table(id: &str, rows: Vec<Vec<Option<String>>>) -> SourceTable {
    SourceTable::new(id, HEADERS.iter().map(|h| h.to_string()).collect(), rows)
}

/// Ten rows with unique keys and one price per product line.
fn branch(branch: &str) -> Vec<Vec<Option<String>>> {
    let lines = ["Food and beverages", "Sports and travel", "Health and beauty"];
    (0..10)
        .map(|i| {
            let line = lines[i % lines.len()];
            let price = 10.0 + (i % lines.len()) as f64;
            sale(&format!("{branch}-{i}"), branch, line, price, (1 + i % 4) as f64, &format!("1/{}/2019", i + 1))
        })
        .collect()
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn three_branches_with_two_shared_transactions() {
    let a = branch("A");
    let mut b = branch("B");
    let mut c = branch("C");
    // B-0 repeats A-0; C-5 repeats B-5.
    b[0] = a[0].clone();
    c[5] = b[5].clone();

    let sources = vec![table("store_A.xlsx", a), table("store_B.xlsx", b), table("store_C.xlsx", c)];
    let result = reconcile(&sources, &AuditConfig::default()).unwrap();

    assert_eq!(result.raw.len(), 30);
    assert_eq!(result.log.total_rows, 30);
    assert_eq!(result.log.duplicate_entries, 4);
    assert_eq!(result.duplicates.rows, vec![0, 10, 15, 25]);
    assert_eq!(result.duplicates.base, DatasetBase::Raw);
    assert_eq!(result.duplicates_removed, 2);
    assert_eq!(result.cleaned.len(), 28);
    assert_eq!(result.log.price_mismatch_products, 0);
    assert_eq!(result.log.missing_values, 0);

    // First occurrence wins
    let kept: HashSet<_> = result.cleaned.records.iter().map(|r| r.record.origin.clone()).collect();
    assert_eq!(kept.len(), 3);
    let b0 = result
        .cleaned
        .records
        .iter()
        .filter(|r| r.record.transaction_id.as_deref() == Some("A-0"))
        .collect::<Vec<_>>();
    assert_eq!(b0.len(), 1);
    assert_eq!(b0[0].record.origin, "store_A.xlsx");
}

#[test]
fn one_category_with_an_off_price() {
    let mut rows: Vec<_> = (0..5)
        .map(|i| sale(&format!("F{i}"), "A", "Food", 10.0, 1.0, "d"))
        .collect();
    rows.push(sale("F5", "B", "Food", 12.0, 1.0, "d"));
    rows.push(sale("T0", "B", "Toys", 3.0, 1.0, "d"));
    rows.push(sale("T1", "C", "Toys", 3.0, 2.0, "d"));

    let result = reconcile(&[table("all.csv", rows)], &AuditConfig::default()).unwrap();
    assert_eq!(result.log.price_mismatch_products, 1);
    assert_eq!(result.mismatches.len(), 6);
    assert_eq!(result.inconsistent_groups, vec![KeyPart::Text("Food".into())]);

    let mismatched = result.subset_records(&result.mismatches);
    assert!(mismatched.iter().all(|r| r.category.as_deref() == Some("Food")));

    let flagged: Vec<_> = result.cleaned.records.iter().map(|r| r.price_flag).collect();
    assert_eq!(flagged, vec![true, true, true, true, true, true, false, false]);
}

#[test]
fn fifty_sigma_total_is_the_only_anomaly() {
    let mut rows: Vec<_> = (0..40)
        .map(|i| {
            let mut r = sale(&format!("R{i}"), "A", "Food", 10.0, 1.0, "d");
            // Otherwise uniform total; quantity constant.
            r[6] = Some(format!("{}", 100.0 + (i % 2) as f64));
            r
        })
        .collect();
    // Uniform column: std dev 0.5 around 100.5.
    rows[23][6] = Some(format!("{}", 100.5 + 50.0 * 0.5));

    let result = reconcile(&[table("store_A.xlsx", rows)], &AuditConfig::default()).unwrap();
    let flagged: Vec<_> = result
        .cleaned
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.anomaly_flag)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(flagged, vec![23]);
    assert_eq!(result.anomalies.rows, vec![23]);
    assert_eq!(result.anomalies.base, DatasetBase::Cleaned);
    assert_eq!(
        result.subset_records(&result.anomalies)[0].transaction_id.as_deref(),
        Some("R23")
    );
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

#[test]
fn missing_value_count_matches_empty_cells() {
    let mut a = branch("A");
    let mut b = branch("B");
    a[0][1] = None;
    a[3][7] = Some(String::new());
    b[2][2] = None;
    b[9][0] = None;
    b[9][3] = None;

    let result = reconcile(&[table("a", a), table("b", b)], &AuditConfig::default()).unwrap();
    assert_eq!(result.log.missing_values, 5);
}

#[test]
fn spreadsheet_null_markers_count_as_missing() {
    for marker in ["#NA", "#N/A", "NaN", "NA", "N/A", "null"] {
        let mut a = branch("A");
        a[4][6] = Some(marker.to_string());
        let result = reconcile(&[table("store_A.xlsx", a)], &AuditConfig::default())
            .unwrap_or_else(|e| panic!("{marker}: {e}"));
        assert_eq!(result.log.missing_values, 1, "{marker}");
        assert_eq!(result.cleaned.records[4].record.total, None);
        assert_eq!(result.cleaned.rows()[4][6], "MISSING");
    }
}

#[test]
fn missing_values_counted_before_dedup() {
    let mut a = branch("A");
    a[1] = a[0].clone();
    a[0][2] = None;
    a[1][2] = None;
    let result = reconcile(&[table("a", a)], &AuditConfig::default()).unwrap();
    assert_eq!(result.duplicates_removed, 1);
    assert_eq!(result.log.missing_values, 2);
    // The surviving copy renders with the sentinel
    let rows = result.cleaned.rows();
    assert_eq!(rows[0][2], "MISSING");
}

#[test]
fn cleaned_length_is_raw_minus_removed() {
    let a = branch("A");
    let mut b = branch("B");
    b[1] = a[1].clone();
    b[2] = a[1].clone();
    b[3] = a[4].clone();
    let result = reconcile(&[table("a", a), table("b", b)], &AuditConfig::default()).unwrap();
    assert_eq!(result.log.duplicate_entries, 5);
    assert_eq!(result.duplicates_removed, 3);
    assert_eq!(result.cleaned.len(), result.raw.len() - result.duplicates_removed);
    assert!(result.cleaned.len() <= result.raw.len());
}

#[test]
fn reconciling_cleaned_output_is_idempotent() {
    let a = branch("A");
    let mut b = branch("B");
    b[7] = a[7].clone();
    let config = AuditConfig::default();
    let first = reconcile(&[table("a", a), table("b", b)], &config).unwrap();
    assert_eq!(first.log.duplicate_entries, 2);

    let again = reconcile_dataset(first.cleaned.clone().into_dataset(), &config).unwrap();
    assert_eq!(again.log.duplicate_entries, 0);
    assert_eq!(again.duplicates_removed, 0);
    assert_eq!(again.cleaned.len(), first.cleaned.len());
    assert_eq!(again.cleaned.plain_records(), first.cleaned.plain_records());
}

#[test]
fn every_duplicate_has_a_partner() {
    let a = branch("A");
    let mut b = branch("B");
    b[4] = a[2].clone();
    b[8] = a[9].clone();
    let result = reconcile(&[table("a", a), table("b", b)], &AuditConfig::default()).unwrap();
    let key = &AuditConfig::default().duplicates.key;

    for &i in &result.duplicates.rows {
        let k = result.raw.records[i].key(key);
        let partners = result
            .raw
            .records
            .iter()
            .enumerate()
            .filter(|(j, r)| *j != i && r.key(key) == k)
            .count();
        assert!(partners >= 1, "row {i} has no partner");
    }
}

#[test]
fn flagged_categories_have_several_prices() {
    let mut a = branch("A");
    let b = branch("B");
    a[3] = sale("A-3", "A", "Food and beverages", 99.0, 1.0, "x");

    let result = reconcile(&[table("a", a), table("b", b)], &AuditConfig::default()).unwrap();
    let groups = distinct_values(&result.raw.records, &Field::Category, Measure::UnitPrice);
    let flagged: HashSet<_> = result.inconsistent_groups.iter().cloned().collect();
    for (group, prices) in &groups {
        if flagged.contains(group) {
            assert!(prices.len() > 1);
        } else {
            assert_eq!(prices.len(), 1);
        }
    }
    assert_eq!(flagged.len(), 1);
}

#[test]
fn anomaly_flags_ignore_row_order() {
    let mut rows: Vec<_> = (0..25)
        .map(|i| sale(&format!("R{i}"), "A", "Food", 5.0 + (i % 5) as f64, 1.0 + (i % 3) as f64, "d"))
        .collect();
    rows[4] = sale("R4", "A", "Food", 5.0, 40.0, "d");
    rows[11] = sale("R11", "A", "Food", 300.0, 1.0, "d");

    let flags_by_id = |rows: Vec<Vec<Option<String>>>| {
        let result = reconcile(&[table("t", rows)], &AuditConfig::default()).unwrap();
        result
            .cleaned
            .records
            .iter()
            .map(|r| (r.record.transaction_id.clone().unwrap_or_default(), r.anomaly_flag))
            .collect::<BTreeMap<_, _>>()
    };

    let forward = flags_by_id(rows.clone());
    let mut reversed_rows = rows;
    reversed_rows.reverse();
    let reversed = flags_by_id(reversed_rows);

    assert_eq!(forward, reversed);
    assert!(forward["R4"]);
    assert!(forward["R11"]);
}

#[test]
fn anomaly_flags_depend_on_the_whole_population() {
    let mut rows: Vec<_> = (0..30)
        .map(|i| {
            let mut r = sale(&format!("R{i}"), "A", "Food", 10.0, 1.0, "d");
            r[6] = Some(format!("{}", 100 + i % 3));
            r
        })
        .collect();
    rows[5][6] = Some("200".into());

    let before = reconcile(&[table("t", rows.clone())], &AuditConfig::default()).unwrap();
    assert!(before.cleaned.records[5].anomaly_flag);

    // A far larger outlier elsewhere widens the spread; row 5 stops standing out.
    rows[20][6] = Some("100000".into());
    let after = reconcile(&[table("t", rows)], &AuditConfig::default()).unwrap();
    assert!(!after.cleaned.records[5].anomaly_flag);
    assert!(after.cleaned.records[20].anomaly_flag);
}

#[test]
fn kpis_over_reconciled_output() {
    let a = branch("A");
    let b = branch("B");
    let result = reconcile(&[table("store_A.xlsx", a), table("store_B.xlsx", b)], &AuditConfig::default()).unwrap();
    let kpis = compute_kpis(&result.cleaned, 5);
    assert_eq!(kpis.total_rows, 20);
    assert_eq!(kpis.sales_by_origin.len(), 2);
    assert_eq!(kpis.sales_by_origin[0].origin, "store_A.xlsx");
    assert_eq!(kpis.sales_by_origin[0].total, kpis.sales_by_origin[1].total);
    assert_eq!(kpis.distinct_categories, 3);
    assert_eq!(kpis.consistent_categories, 3);
}

// -------------------------------------------------------------------------
// Failures
// -------------------------------------------------------------------------

#[test]
fn schema_mismatch_names_the_offending_source() {
    let a = table("store_A.xlsx", branch("A"));
    let mut b = table("store_B.xlsx", branch("B"));
    b.headers[2] = "Town".into();
    let err = reconcile(&[a, b], &AuditConfig::default()).unwrap_err();
    assert!(matches!(err, AuditError::Schema { .. }));
    assert_eq!(err.source_id(), Some("store_B.xlsx"));
}

#[test]
fn result_serializes_to_json_summary() {
    let result = reconcile(&[table("a", branch("A"))], &AuditConfig::default()).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["log"]["Total Rows"], 10);
    assert_eq!(json["meta"]["sources"][0], "a");
    assert!(json.get("raw").is_none());
    assert_eq!(json["anomalies"]["base"], "cleaned");
}
