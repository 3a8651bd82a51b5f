//! Table implementations
//!
//! HashMap-based tables, each behind its own RwLock.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use parking_lot::RwLock;

/// Key → value namespace used by `SET`/`GET`
#[derive(Debug, Default)]
pub struct StringTable {
    data: RwLock<HashMap<Bytes, Bytes>>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite (write lock)
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.data.write().insert(key, value);
    }

    /// Look up a key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Sorted copy of every entry
    pub fn snapshot(&self) -> BTreeMap<Bytes, Bytes> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Key → (field → value) namespace used by `HSET`/`HGET`/`HGETALL`
///
/// Field maps are created on first write and never removed.
#[derive(Debug, Default)]
pub struct HashTable {
    data: RwLock<HashMap<Bytes, HashMap<Bytes, Bytes>>>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write field/value pairs in order under one write lock
    ///
    /// A later pair for the same field overrides an earlier one.
    pub fn set_fields<I>(&self, key: Bytes, pairs: I)
    where
        I: IntoIterator<Item = (Bytes, Bytes)>,
    {
        let mut data = self.data.write();
        let fields = data.entry(key).or_default();
        for (field, value) in pairs {
            fields.insert(field, value);
        }
    }

    /// Look up one field (read lock)
    pub fn get_field(&self, key: &[u8], field: &[u8]) -> Option<Bytes> {
        self.data
            .read()
            .get(key)
            .and_then(|fields| fields.get(field))
            .cloned()
    }

    /// Copy out every field/value pair of a hash (read lock)
    ///
    /// Order follows the map's iteration order and is not meaningful.
    pub fn get_all(&self, key: &[u8]) -> Option<Vec<(Bytes, Bytes)>> {
        self.data.read().get(key).map(|fields| {
            fields
                .iter()
                .map(|(f, v)| (f.clone(), v.clone()))
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Sorted copy of every hash
    pub fn snapshot(&self) -> BTreeMap<Bytes, BTreeMap<Bytes, Bytes>> {
        self.data
            .read()
            .iter()
            .map(|(key, fields)| {
                let fields = fields
                    .iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect();
                (key.clone(), fields)
            })
            .collect()
    }
}
