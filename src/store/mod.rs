//! Store Module
//!
//! Process-wide in-memory data set.
//!
//! ## Namespaces
//! - String table: key → value
//! - Hash table: key → (field → value)
//!
//! The namespaces are independent: the same key may exist in both with no
//! relation between the entries. Each table owns its own RwLock, so a write to
//! one never blocks readers of the other. Lock guards never leave this module.

mod table;

use std::collections::BTreeMap;

use bytes::Bytes;

pub use table::{HashTable, StringTable};

/// The in-memory data set
#[derive(Debug, Default)]
pub struct Store {
    strings: StringTable,
    hashes: HashTable,
}

/// Owned, ordered copy of a [`Store`], for equivalence checks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub strings: BTreeMap<Bytes, Bytes>,
    pub hashes: BTreeMap<Bytes, BTreeMap<Bytes, Bytes>>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_string(&self, key: Bytes, value: Bytes) {
        self.strings.set(key, value);
    }

    pub fn get_string(&self, key: &[u8]) -> Option<Bytes> {
        self.strings.get(key)
    }

    /// Create the hash if needed, then write each pair in order
    pub fn hash_set<I>(&self, key: Bytes, pairs: I)
    where
        I: IntoIterator<Item = (Bytes, Bytes)>,
    {
        self.hashes.set_fields(key, pairs);
    }

    pub fn hash_get(&self, key: &[u8], field: &[u8]) -> Option<Bytes> {
        self.hashes.get_field(key, field)
    }

    /// All field/value pairs of a hash, `None` if the hash does not exist
    pub fn hash_get_all(&self, key: &[u8]) -> Option<Vec<(Bytes, Bytes)>> {
        self.hashes.get_all(key)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of keys in the string table
    pub fn string_len(&self) -> usize {
        self.strings.len()
    }

    /// Number of keys in the hash table
    pub fn hash_len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.hashes.is_empty()
    }

    /// Copy both namespaces
    ///
    /// Each table is copied under its own read lock; the two copies are not
    /// taken atomically with respect to each other.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            strings: self.strings.snapshot(),
            hashes: self.hashes.snapshot(),
        }
    }
}
