//! Array-valued metadata expansion (read side).
//!
//! Scalar metadata stores should not carry array values, so an N-element
//! array label `cal` becomes N scalar labels `cal0..cal(N-1)`. One-element
//! arrays just unwrap. Idempotent on already-scalar maps.

use insitu_core::{LabelMap, MetaRecord, Value};

/// Expand every array-valued label of a label map into numbered scalars.
pub fn expand_labels(labels: &LabelMap) -> LabelMap {
    let mut out = LabelMap::new();
    for (key, value) in labels {
        match value {
            Value::Array(items) if items.is_empty() => {}
            Value::Array(items) if items.len() == 1 => {
                out.insert(key.clone(), items[0].clone());
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    out.insert(format!("{key}{i}"), item.clone());
                }
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

/// Expand a record's labels and each of its child label maps.
pub fn expand_record(record: &MetaRecord) -> MetaRecord {
    MetaRecord {
        labels: expand_labels(&record.labels),
        children: record
            .children
            .iter()
            .map(|(name, child)| (name.clone(), expand_labels(child)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, Value)]) -> LabelMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_multi_element_array_expands() {
        let input = labels(&[(
            "cal",
            Value::Array(vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)]),
        )]);
        let out = expand_labels(&input);

        assert!(!out.contains_key("cal"));
        assert_eq!(out["cal0"], Value::Float(1.0));
        assert_eq!(out["cal1"], Value::Float(2.0));
        assert_eq!(out["cal2"], Value::Float(3.0));
    }

    #[test]
    fn test_single_element_unwraps() {
        let input = labels(&[("cal", Value::Array(vec![Value::Float(4.5)]))]);
        let out = expand_labels(&input);
        assert_eq!(out["cal"], Value::Float(4.5));
    }

    #[test]
    fn test_empty_array_dropped() {
        let input = labels(&[("cal", Value::Array(vec![]))]);
        assert!(expand_labels(&input).is_empty());
    }

    #[test]
    fn test_idempotent_on_scalars() {
        let input = labels(&[("units", Value::from("hours")), ("fill", Value::Float(0.0))]);
        let once = expand_labels(&input);
        assert_eq!(once, input);
        assert_eq!(expand_labels(&once), once);
    }

    #[test]
    fn test_recurses_into_children() {
        let mut record = MetaRecord::new();
        record.children.insert(
            "density".to_string(),
            labels(&[("cal", Value::Array(vec![Value::Int(1), Value::Int(2)]))]),
        );
        let out = expand_record(&record);
        let child = &out.children["density"];
        assert_eq!(child["cal0"], Value::Int(1));
        assert_eq!(child["cal1"], Value::Int(2));
    }
}
