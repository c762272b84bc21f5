//! Cross-packet accumulation of keyed rows.
//!
//! Routines forward structured rows here so that state built up over many
//! packets (item templates, broadcast text, hotfixed rows) survives past the
//! packet that carried it. The store is shared across worker threads; every
//! implementation must tolerate concurrent `put` calls for different keys.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::FieldRecord;

/// Long-lived keyed tables fed by decode routines.
///
/// Writes for the same `(table, key)` replace each other; the last packet
/// decoded against a key wins. Batch decode recombines results in capture
/// order, so "last" follows capture order as well.
pub trait RecordStore: Send + Sync {
    fn put(&self, table: &'static str, key: i64, fields: Vec<FieldRecord>);

    fn remove(&self, table: &'static str, key: i64);
}

/// In-memory [`RecordStore`] backed by ordered maps.
///
/// ```
/// use snifflens_core::{FieldRecord, FieldValue, MemoryStore, RecordStore};
///
/// let store = MemoryStore::new();
/// let row = vec![FieldRecord {
///     name: "Flags".to_string(),
///     path: Vec::new(),
///     value: FieldValue::Uint(3),
/// }];
/// store.put("item", 117, row);
/// assert_eq!(store.table_len("item"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<&'static str, BTreeMap<i64, Vec<FieldRecord>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str, key: i64) -> Option<Vec<FieldRecord>> {
        self.tables.lock().get(table)?.get(&key).cloned()
    }

    pub fn table_len(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, BTreeMap::len)
    }

    /// Names of tables that have received at least one row.
    pub fn table_names(&self) -> Vec<&'static str> {
        self.tables.lock().keys().copied().collect()
    }
}

impl RecordStore for MemoryStore {
    fn put(&self, table: &'static str, key: i64, fields: Vec<FieldRecord>) {
        self.tables.lock().entry(table).or_default().insert(key, fields);
    }

    fn remove(&self, table: &'static str, key: i64) {
        let mut tables = self.tables.lock();
        if let Some(rows) = tables.get_mut(table) {
            rows.remove(&key);
        }
    }
}
