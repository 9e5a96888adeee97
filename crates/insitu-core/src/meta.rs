//! Variable metadata records and the in-memory metadata store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::value::Value;

/// Ordered label → value map. Ordering is deterministic so metadata
/// dictionaries can be compared byte-for-byte across files (strict mode).
pub type LabelMap = BTreeMap<String, Value>;

/// Names of the internal metadata vocabulary.
///
/// These are the label strings the rest of the system uses when reading and
/// writing metadata; files may use a different vocabulary, bridged by the
/// codec's translation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaLabels {
    pub units: String,
    pub name: String,
    pub notes: String,
    pub desc: String,
    pub min_val: String,
    pub max_val: String,
    pub fill_val: String,
}

impl Default for MetaLabels {
    fn default() -> Self {
        Self {
            units: "units".to_string(),
            name: "long_name".to_string(),
            notes: "notes".to_string(),
            desc: "desc".to_string(),
            min_val: "value_min".to_string(),
            max_val: "value_max".to_string(),
            fill_val: "fill".to_string(),
        }
    }
}

/// Metadata attached to a single variable.
///
/// Higher-order (nested) variables additionally carry one independent label
/// map per sub-variable in `children`; flat variables leave it empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaRecord {
    /// Variable-level labels.
    pub labels: LabelMap,
    /// Sub-variable label maps, keyed by sub-variable name.
    pub children: BTreeMap<String, LabelMap>,
}

impl MetaRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from label/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Self::new();
        for (k, v) in pairs {
            record.labels.insert(k.into(), v.into());
        }
        record
    }

    pub fn set(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.labels.insert(label.into(), value.into());
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        self.labels.get(label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.children.is_empty()
    }
}

/// The authoritative in-memory metadata source: one record per variable,
/// plus file-level header attributes.
///
/// Variable names are case-preserving but treated as case-insensitively
/// unique; [`MetaStore::var_case_name`] recovers the stored spelling.
#[derive(Debug, Clone, Default)]
pub struct MetaStore {
    records: BTreeMap<String, MetaRecord>,
    /// File-level (global) attributes.
    pub header: LabelMap,
    /// Internal vocabulary used by this store.
    pub labels: MetaLabels,
    immutable: bool,
}

impl MetaStore {
    pub fn new(labels: MetaLabels) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }

    /// Insert or replace a variable's record. Ignored (with a warning) when
    /// the store has been marked immutable.
    pub fn insert(&mut self, var: impl Into<String>, record: MetaRecord) {
        let var = var.into();
        if self.immutable {
            warn!(variable = %var, "metadata store is immutable, dropping update");
            return;
        }
        self.records.insert(var, record);
    }

    pub fn get(&self, var: &str) -> Option<&MetaRecord> {
        self.records.get(var)
    }

    /// Case-insensitive lookup returning the record under its stored name.
    pub fn get_ci(&self, var: &str) -> Option<&MetaRecord> {
        self.var_case_name(var).and_then(|name| {
            let name = name.to_string();
            self.records.get(&name)
        })
    }

    /// Recover the stored (case-preserved) spelling of a variable name.
    pub fn var_case_name(&self, var: &str) -> Option<&str> {
        self.records
            .keys()
            .find(|k| k.eq_ignore_ascii_case(var))
            .map(String::as_str)
    }

    pub fn contains(&self, var: &str) -> bool {
        self.records.contains_key(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetaRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Freeze the store; subsequent inserts are dropped with a warning.
    pub fn set_immutable(&mut self) {
        self.immutable = true;
    }

    pub fn is_mutable(&self) -> bool {
        !self.immutable
    }
}
