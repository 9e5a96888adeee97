//! SPDF ISTP/IACG-style metadata overlay.
//!
//! On write, every variable gains the dependency, display and format labels
//! archives expect; on read, exactly those labels are stripped again so the
//! in-memory metadata stays free of file-format vocabulary.

use chrono::{DateTime, Utc};
use insitu_core::{time, CellShape, DType, InnerIndex, LabelMap, MetaLabels, Value, VarData, VariableSet};

use crate::convert::format_code;
use crate::MetaMap;

/// Labels owned by the overlay. `remove` strips exactly these,
/// case-insensitively.
pub const STANDARD_LABELS: [&str; 17] = [
    "Depend_0",
    "Depend_1",
    "Depend_2",
    "Depend_3",
    "Depend_4",
    "Depend_5",
    "Depend_6",
    "Depend_7",
    "Depend_8",
    "Depend_9",
    "Display_Type",
    "Var_Type",
    "Format",
    "Time_Scale",
    "MonoTon",
    "calendar",
    "Time_Base",
];

const TIME_BASE: &str = "Milliseconds since 1970-1-1 00:00:00";

/// Default metadata for the epoch variable.
///
/// `MonoTon` is present only when the time index is strictly monotonic.
pub fn epoch_record(
    epoch_name: &str,
    labels: &MetaLabels,
    time_index: &[DateTime<Utc>],
) -> LabelMap {
    let mut record = LabelMap::new();
    record.insert(labels.units.clone(), Value::from(TIME_BASE));
    record.insert(labels.name.clone(), Value::from(epoch_name));
    record.insert(labels.notes.clone(), Value::from(TIME_BASE));
    record.insert(labels.desc.clone(), Value::from(TIME_BASE));
    record.insert("calendar".to_string(), Value::from("standard"));
    record.insert("Format".to_string(), Value::from("i8"));
    record.insert("Var_Type".to_string(), Value::from("data"));
    record.insert("Time_Base".to_string(), Value::from(TIME_BASE));
    record.insert("Time_Scale".to_string(), Value::from("UTC"));
    if time::strictly_increasing(time_index) {
        record.insert("MonoTon".to_string(), Value::from("increase"));
    } else if time::strictly_decreasing(time_index) {
        record.insert("MonoTon".to_string(), Value::from("decrease"));
    }
    record
}

/// Decorate an assembled per-variable metadata map with the standard labels.
///
/// Standard labels override caller values; the epoch defaults only fill gaps
/// so callers may still override units or notes on the epoch record. Keys in
/// `mdict` are assumed to already be in their on-file case.
pub fn add(
    mdict: &mut MetaMap,
    vars: &VariableSet,
    time_index: &[DateTime<Utc>],
    epoch_name: &str,
    labels: &MetaLabels,
    case: &dyn Fn(&str) -> String,
) {
    let epoch_entry = mdict.entry(epoch_name.to_string()).or_default();
    for (key, value) in epoch_record(epoch_name, labels, time_index) {
        epoch_entry.entry(key).or_insert(value);
    }

    for (name, data) in vars.iter() {
        let key = case(name);
        match data {
            VarData::Nested(cells) => {
                add_nested(mdict, name, cells, epoch_name, labels, case);
            }
            _ => {
                let entry = mdict.entry(key).or_default();
                entry.insert("Depend_0".to_string(), Value::from(epoch_name));
                entry.insert("Display_Type".to_string(), Value::from("Time Series"));
                entry.insert("Var_Type".to_string(), Value::from("data"));

                let dtype = data.dtype().unwrap_or(DType::Float64);
                let text_max = match data {
                    VarData::Text(v) => v.iter().map(String::len).max().unwrap_or(0),
                    _ => 0,
                };
                entry.insert(
                    "Format".to_string(),
                    Value::from(format_code(dtype, text_max)),
                );

                // Datetime-valued variables are stored like the epoch itself
                if dtype == DType::Time {
                    entry.insert(labels.name.clone(), Value::from(epoch_name));
                    entry.insert(labels.units.clone(), Value::from(TIME_BASE));
                }
            }
        }
    }
}

fn add_nested(
    mdict: &mut MetaMap,
    outer: &str,
    cells: &[insitu_core::Cell],
    epoch_name: &str,
    labels: &MetaLabels,
    case: &dyn Fn(&str) -> String,
) {
    let outer_key = case(outer);
    let first = cells.iter().find(|c| !c.is_empty());

    {
        let entry = mdict.entry(outer_key.clone()).or_default();
        entry.insert("Depend_0".to_string(), Value::from(epoch_name));
        entry.insert("Var_Type".to_string(), Value::from("data"));

        match first.map(|c| &c.index) {
            Some(InnerIndex::Time(_)) => {
                entry.insert("Format".to_string(), Value::from("i8"));
                // The inner index is itself a time axis
                for (key, value) in epoch_record(epoch_name, labels, &[]) {
                    if key != "MonoTon" {
                        entry.entry(key).or_insert(value);
                    }
                }
            }
            Some(InnerIndex::Text(v)) => {
                let text_max = v.iter().map(String::len).max().unwrap_or(0);
                entry.insert(
                    "Format".to_string(),
                    Value::from(format_code(DType::Text, text_max)),
                );
                let index_name = first
                    .and_then(|c| c.index_name.clone())
                    .unwrap_or_else(|| outer.to_string());
                entry
                    .entry(labels.name.clone())
                    .or_insert_with(|| Value::from(index_name));
            }
            _ => {
                entry.insert("Format".to_string(), Value::from("f8"));
                let index_name = first
                    .and_then(|c| c.index_name.clone())
                    .unwrap_or_else(|| outer.to_string());
                entry
                    .entry(labels.name.clone())
                    .or_insert_with(|| Value::from(index_name));
            }
        }
    }

    let flat_names: Vec<String> = match first.map(|c| c.shape()) {
        Some(CellShape::Table) => first
            .map(|c| c.column_names())
            .unwrap_or_default()
            .iter()
            .map(|col| case(&format!("{outer}_{col}")))
            .collect(),
        _ => vec![case(&format!("{outer}_data"))],
    };

    for flat in flat_names {
        let entry = mdict.entry(flat).or_default();
        entry.insert("Depend_0".to_string(), Value::from(epoch_name));
        entry.insert("Depend_1".to_string(), Value::from(outer_key.as_str()));
        entry.insert("Display_Type".to_string(), Value::from("Spectrogram"));
        entry.insert("Var_Type".to_string(), Value::from("data"));
        entry.insert("Format".to_string(), Value::from("f8"));
    }
}

/// Strip the standard labels from every entry of a flat metadata map.
pub fn remove(mdict: &mut MetaMap) {
    for labels in mdict.values_mut() {
        strip(labels);
    }
}

/// Strip the standard labels from a record and its child records.
pub fn remove_record(record: &mut insitu_core::MetaRecord) {
    strip(&mut record.labels);
    for child in record.children.values_mut() {
        strip(child);
    }
}

fn strip(labels: &mut LabelMap) {
    labels.retain(|key, _| {
        !STANDARD_LABELS
            .iter()
            .any(|std| std.eq_ignore_ascii_case(key))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use insitu_core::{MetaRecord, Value};

    fn times(n: usize) -> Vec<DateTime<Utc>> {
        (0..n)
            .map(|i| Utc.with_ymd_and_hms(2014, 5, 1, 0, 0, i as u32).unwrap())
            .collect()
    }

    #[test]
    fn test_epoch_record_monotonic_flag() {
        let labels = MetaLabels::default();
        let increasing = epoch_record("Epoch", &labels, &times(3));
        assert_eq!(increasing["MonoTon"], Value::from("increase"));

        let mut reversed = times(3);
        reversed.reverse();
        let decreasing = epoch_record("Epoch", &labels, &reversed);
        assert_eq!(decreasing["MonoTon"], Value::from("decrease"));

        let unordered = vec![times(1)[0], times(1)[0]];
        let flat = epoch_record("Epoch", &labels, &unordered);
        assert!(!flat.contains_key("MonoTon"));
    }

    #[test]
    fn test_add_decorates_data_variable() {
        let labels = MetaLabels::default();
        let mut vars = VariableSet::new();
        vars.insert("mlt", VarData::Float(vec![1.0, 2.0]));

        let mut mdict = MetaMap::new();
        mdict
            .entry("mlt".to_string())
            .or_default()
            .insert("units".to_string(), Value::from("hours"));

        add(&mut mdict, &vars, &times(2), "Epoch", &labels, &|n| {
            n.to_string()
        });

        let entry = &mdict["mlt"];
        assert_eq!(entry["Depend_0"], Value::from("Epoch"));
        assert_eq!(entry["Display_Type"], Value::from("Time Series"));
        assert_eq!(entry["Var_Type"], Value::from("data"));
        assert_eq!(entry["Format"], Value::from("f8"));
        assert_eq!(entry["units"], Value::from("hours"));
        assert!(mdict.contains_key("Epoch"));
    }

    #[test]
    fn test_remove_is_left_inverse_of_add() {
        let labels = MetaLabels::default();
        let mut vars = VariableSet::new();
        vars.insert("mlt", VarData::Float(vec![1.0, 2.0]));

        let mut original = MetaMap::new();
        original
            .entry("mlt".to_string())
            .or_default()
            .insert("units".to_string(), Value::from("hours"));

        let mut decorated = original.clone();
        add(&mut decorated, &vars, &times(2), "Epoch", &labels, &|n| {
            n.to_string()
        });
        remove(&mut decorated);
        decorated.retain(|_, v| !v.is_empty());
        // The epoch record keeps its non-standard defaults after removal
        decorated.remove("Epoch");

        assert_eq!(decorated, original);
    }

    #[test]
    fn test_strip_is_case_insensitive_and_recurses() {
        let mut record = MetaRecord::from_pairs([
            ("depend_0", Value::from("Epoch")),
            ("DISPLAY_TYPE", Value::from("Time Series")),
            ("units", Value::from("m")),
        ]);
        record.children.insert("density".to_string(), {
            let mut child = LabelMap::new();
            child.insert("Var_Type".to_string(), Value::from("data"));
            child.insert("desc".to_string(), Value::from("plasma density"));
            child
        });

        remove_record(&mut record);
        assert_eq!(record.labels.len(), 1);
        assert!(record.labels.contains_key("units"));
        let child = &record.children["density"];
        assert_eq!(child.len(), 1);
        assert!(child.contains_key("desc"));
    }
}
