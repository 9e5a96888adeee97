//! Label translation between the internal metadata vocabulary and whatever
//! a file (or archive convention) calls the same thing.
//!
//! The write direction is one-to-many: a single internal label may fan out
//! to several redundant file labels. The read direction collapses them back,
//! first value wins, with a warning when the redundant copies disagree.

use std::collections::BTreeMap;

use insitu_core::{LabelMap, MetaLabels};
use tracing::{debug, warn};

/// Internal label → file label(s) mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    to_file: BTreeMap<String, Vec<String>>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default table: the fill label fans out to the three spellings
    /// found in the wild. All other labels pass through untranslated.
    pub fn default_for(labels: &MetaLabels) -> Self {
        let mut table = Self::new();
        table.map(
            &labels.fill_val,
            ["_FillValue", "FillVal", labels.fill_val.as_str()],
        );
        table
    }

    /// Map an internal label to one or more file labels.
    pub fn map<'a>(
        &mut self,
        internal: &str,
        file_labels: impl IntoIterator<Item = &'a str>,
    ) -> &mut Self {
        self.to_file.insert(
            internal.to_string(),
            file_labels.into_iter().map(str::to_string).collect(),
        );
        self
    }

    pub fn is_empty(&self) -> bool {
        self.to_file.is_empty()
    }

    /// Inverse mapping, file label → internal label. When two internal
    /// labels claim the same file label the first claim wins, with a
    /// warning.
    pub fn invert(&self) -> BTreeMap<String, String> {
        let mut from_file = BTreeMap::new();
        for (internal, file_labels) in &self.to_file {
            for file_label in file_labels {
                if let Some(existing) =
                    from_file.insert(file_label.clone(), internal.clone())
                {
                    warn!(
                        file_label = %file_label,
                        kept = %existing,
                        dropped = %internal,
                        "translation table maps one file label to several internal labels"
                    );
                    from_file.insert(file_label.clone(), existing);
                }
            }
        }
        from_file
    }

    /// Translate one variable's labels into file vocabulary. Mapped labels
    /// fan out; unmapped labels pass through. On a file-label collision the
    /// later internal label silently overwrites the earlier one.
    pub fn apply_to_file(&self, labels: &LabelMap) -> LabelMap {
        let mut out = LabelMap::new();
        for (key, value) in labels {
            match self.to_file.get(key) {
                Some(file_labels) => {
                    for file_label in file_labels {
                        out.insert(file_label.clone(), value.clone());
                    }
                }
                None => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        out
    }

    /// Translate one variable's labels from file vocabulary back to the
    /// internal one. When several file labels map to the same internal
    /// label, the first value seen wins; a NaN-aware disagreement among the
    /// redundant copies is logged with both labels and both values.
    pub fn apply_from_file(&self, labels: &LabelMap, varname: &str) -> LabelMap {
        let from_file = self.invert();
        let mut out = LabelMap::new();
        // internal label -> file label that supplied its value
        let mut provenance: BTreeMap<String, String> = BTreeMap::new();

        for (key, value) in labels {
            let Some(internal) = from_file.get(key) else {
                out.insert(key.clone(), value.clone());
                continue;
            };
            match out.get(internal) {
                None => {
                    out.insert(internal.clone(), value.clone());
                    provenance.insert(internal.clone(), key.clone());
                }
                Some(existing) => {
                    if !existing.consistent_with(value) {
                        let first_label = provenance
                            .get(internal)
                            .map(String::as_str)
                            .unwrap_or(internal);
                        warn!(
                            variable = %varname,
                            label = %internal,
                            kept_label = %first_label,
                            kept_value = %existing,
                            ignored_label = %key,
                            ignored_value = %value,
                            "redundant file labels disagree, keeping the first value seen"
                        );
                    }
                }
            }
        }

        for file_label in from_file.keys() {
            if !labels.contains_key(file_label) {
                debug!(
                    variable = %varname,
                    label = %file_label,
                    "translation label not found"
                );
            }
        }

        out
    }
}
