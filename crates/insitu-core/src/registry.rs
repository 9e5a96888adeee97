//! File discovery interface.
//!
//! Multi-file reads take an ordered list of paths; how that list is produced
//! is a data-discovery concern, abstracted behind [`FileRegistry`] so a
//! directory scanner, a database, or a fixed manifest can all feed the codec.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

/// Source of the ordered file list covering a time span.
pub trait FileRegistry {
    /// Earliest timestamp covered, if any file is registered.
    fn start(&self) -> Option<DateTime<Utc>>;

    /// Latest timestamp covered, if any file is registered.
    fn stop(&self) -> Option<DateTime<Utc>>;

    /// Registered paths in ascending time order.
    fn files(&self) -> &[PathBuf];

    /// Apply any pending registrations and removals.
    fn refresh(&mut self);
}

/// A registry backed by an explicit manifest of (timestamp, path) entries.
///
/// Additions and removals queue up and take effect on [`refresh`], so a
/// reader holding the file list sees a stable view between refreshes.
///
/// [`refresh`]: FileRegistry::refresh
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: BTreeMap<DateTime<Utc>, PathBuf>,
    files: Vec<PathBuf>,
    pending_add: Vec<(DateTime<Utc>, PathBuf)>,
    pending_remove: Vec<DateTime<Utc>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry and apply the initial entries immediately.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, PathBuf)>,
    {
        let mut registry = Self::new();
        registry.pending_add.extend(entries);
        registry.refresh();
        registry
    }

    /// Queue a file for registration; visible after the next refresh.
    pub fn queue_add(&mut self, when: DateTime<Utc>, path: impl AsRef<Path>) {
        self.pending_add.push((when, path.as_ref().to_path_buf()));
    }

    /// Queue the entry at `when` for removal; visible after the next refresh.
    pub fn queue_remove(&mut self, when: DateTime<Utc>) {
        self.pending_remove.push(when);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileRegistry for StaticRegistry {
    fn start(&self) -> Option<DateTime<Utc>> {
        self.entries.keys().next().copied()
    }

    fn stop(&self) -> Option<DateTime<Utc>> {
        self.entries.keys().next_back().copied()
    }

    fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn refresh(&mut self) {
        for (when, path) in self.pending_add.drain(..) {
            self.entries.insert(when, path);
        }
        for when in self.pending_remove.drain(..) {
            self.entries.remove(&when);
        }
        self.files = self.entries.values().cloned().collect();
        debug!(files = self.files.len(), "registry refreshed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 5, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_entries_sorted_by_time() {
        let registry = StaticRegistry::from_entries([
            (ts(2), PathBuf::from("b.nc")),
            (ts(1), PathBuf::from("a.nc")),
            (ts(3), PathBuf::from("c.nc")),
        ]);

        let files: Vec<_> = registry.files().iter().map(|p| p.to_path_buf()).collect();
        assert_eq!(
            files,
            vec![PathBuf::from("a.nc"), PathBuf::from("b.nc"), PathBuf::from("c.nc")]
        );
        assert_eq!(registry.start(), Some(ts(1)));
        assert_eq!(registry.stop(), Some(ts(3)));
    }

    #[test]
    fn test_pending_changes_wait_for_refresh() {
        let mut registry = StaticRegistry::from_entries([(ts(1), PathBuf::from("a.nc"))]);
        registry.queue_add(ts(2), "b.nc");
        registry.queue_remove(ts(1));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.files()[0], PathBuf::from("a.nc"));

        registry.refresh();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.files()[0], PathBuf::from("b.nc"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = StaticRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.start().is_none());
        assert!(registry.stop().is_none());
    }
}
