use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::model::{Field, KeyPart, Record};

/// Key occurrence counts over a record set, keyed by the business key.
struct KeyCounts {
    keys: Vec<Vec<KeyPart>>,
    counts: HashMap<Vec<KeyPart>, usize>,
}

fn count_keys(records: &[Record], key: &[Field]) -> KeyCounts {
    let keys: Vec<Vec<KeyPart>> = records.iter().map(|r| r.key(key)).collect();
    let mut counts: HashMap<Vec<KeyPart>, usize> = HashMap::with_capacity(keys.len());
    for k in &keys {
        *counts.entry(k.clone()).or_insert(0) += 1;
    }
    KeyCounts { keys, counts }
}

/// Indices of every record whose business key is shared with at least one
/// other record. All colliding rows are returned, not only the later ones,
/// in their original order.
pub fn find_duplicates(records: &[Record], key: &[Field]) -> Vec<usize> {
    let KeyCounts { keys, counts } = count_keys(records, key);
    keys.iter()
        .enumerate()
        .filter(|(_, k)| counts.get(*k).copied().unwrap_or(0) > 1)
        .map(|(i, _)| i)
        .collect()
}

/// Indices of the first record for each distinct business key, in order.
pub fn first_occurrences(records: &[Record], key: &[Field]) -> Vec<usize> {
    let mut seen: HashMap<Vec<KeyPart>, usize> = HashMap::with_capacity(records.len());
    let mut keep = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if let Entry::Vacant(slot) = seen.entry(record.key(key)) {
            slot.insert(i);
            keep.push(i);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn rec(id: &str, category: &str, date: Option<&str>) -> Record {
        Record {
            origin: "t".into(),
            transaction_id: Some(id.into()),
            category: Some(category.into()),
            date: date.map(str::to_string),
            unit_price: Some(1.0),
            quantity: Some(1.0),
            total: Some(1.0),
            extra: HashMap::new(),
        }
    }

    const KEY: &[Field] = &[Field::TransactionId, Field::Category, Field::Date];

    #[test]
    fn flags_every_colliding_row() {
        let rows = vec![
            rec("1", "Food", Some("d1")),
            rec("2", "Food", Some("d1")),
            rec("1", "Food", Some("d1")),
            rec("3", "Toys", Some("d2")),
            rec("1", "Food", Some("d1")),
        ];
        assert_eq!(find_duplicates(&rows, KEY), vec![0, 2, 4]);
        assert_eq!(first_occurrences(&rows, KEY), vec![0, 1, 3]);
    }

    #[test]
    fn any_differing_key_field_makes_rows_distinct() {
        let rows = vec![
            rec("1", "Food", Some("d1")),
            rec("1", "Toys", Some("d1")),
            rec("1", "Food", Some("d2")),
        ];
        assert!(find_duplicates(&rows, KEY).is_empty());
        assert_eq!(first_occurrences(&rows, KEY).len(), 3);
    }

    #[test]
    fn missing_key_cells_collide() {
        let rows = vec![rec("1", "Food", None), rec("1", "Food", None)];
        assert_eq!(find_duplicates(&rows, KEY), vec![0, 1]);
        assert_eq!(first_occurrences(&rows, KEY), vec![0]);
    }

    #[test]
    fn key_is_exact_text() {
        let rows = vec![rec("1", "Food", Some("d1")), rec("1", "Food ", Some("d1"))];
        assert!(find_duplicates(&rows, KEY).is_empty());
    }

    #[test]
    fn non_key_fields_are_ignored() {
        let mut a = rec("1", "Food", Some("d1"));
        let mut b = rec("1", "Food", Some("d1"));
        a.origin = "store_A".into();
        b.origin = "store_B".into();
        b.total = Some(99.0);
        assert_eq!(find_duplicates(&[a, b], KEY), vec![0, 1]);
    }

    #[test]
    fn empty_input() {
        assert!(find_duplicates(&[], KEY).is_empty());
        assert!(first_occurrences(&[], KEY).is_empty());
    }
}
