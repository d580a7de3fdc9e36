use std::collections::{BTreeMap, BTreeSet, HashSet};

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::model::{Field, KeyPart, Measure, Record};

/// Groups whose measure takes more than one distinct value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    /// Inconsistent group values, sorted.
    pub inconsistent_groups: Vec<KeyPart>,
    /// Indices of every row belonging to an inconsistent group, in row order.
    pub rows: Vec<usize>,
    /// Number of distinct group values seen (missing group excluded).
    pub groups_checked: usize,
}

/// Distinct measure values per group value. Rows with a missing group value
/// belong to no group; missing measure cells are not a value.
pub fn distinct_values(
    records: &[Record],
    group_by: &Field,
    measure: Measure,
) -> BTreeMap<KeyPart, BTreeSet<OrderedFloat<f64>>> {
    let mut groups: BTreeMap<KeyPart, BTreeSet<OrderedFloat<f64>>> = BTreeMap::new();
    for record in records {
        let group = record.key_part(group_by);
        if group == KeyPart::Missing {
            continue;
        }
        let values = groups.entry(group).or_default();
        if let Some(v) = record.measure(measure) {
            values.insert(OrderedFloat(v));
        }
    }
    groups
}

/// Find every group whose measure is not single-valued. Equality is exact:
/// prices differing only by rounding error are reported.
pub fn check_consistency(records: &[Record], group_by: &Field, measure: Measure) -> ConsistencyReport {
    let groups = distinct_values(records, group_by, measure);
    let groups_checked = groups.len();

    let inconsistent_groups: Vec<KeyPart> = groups
        .into_iter()
        .filter(|(_, values)| values.len() > 1)
        .map(|(group, _)| group)
        .collect();

    let flagged: HashSet<&KeyPart> = inconsistent_groups.iter().collect();
    let rows = records
        .iter()
        .enumerate()
        .filter(|(_, r)| flagged.contains(&r.key_part(group_by)))
        .map(|(i, _)| i)
        .collect();

    ConsistencyReport {
        inconsistent_groups,
        rows,
        groups_checked,
    }
}
