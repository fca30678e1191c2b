//! Storage backends.
//!
//! The index needs very little from its store: an ordered byte-keyed map
//! with point reads, point writes, an append over a set of keys, and a
//! full scan in key order. [`MemoryStore`] serves tests and ephemeral
//! indexes; [`RocksStore`] (feature `rocks`, on by default) is the
//! persistent backend. No transactional multi-key guarantees are assumed
//! beyond what [`Store::append_batch`] states.

use std::collections::BTreeMap;

use crate::error::Result;

/// Minimal ordered key-value contract required by the index.
pub trait Store: Send {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any existing value.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Append `value` to the existing value of every key, treating absent
    /// keys as empty.
    ///
    /// The default implementation is a read-modify-write per key and can be
    /// interrupted between keys; backends with atomic batches should
    /// override it so all appends land together.
    fn append_batch(&mut self, keys: &[&[u8]], value: &[u8]) -> Result<()> {
        for key in keys {
            let mut slot = self.get(key)?.unwrap_or_default();
            slot.extend_from_slice(value);
            self.put(key, &slot)?;
        }
        Ok(())
    }

    /// Visit every (key, value) pair in byte-lexicographic key order.
    fn scan(&self, visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()>;
}

/// Heap-backed store for tests and ephemeral indexes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn append_batch(&mut self, keys: &[&[u8]], value: &[u8]) -> Result<()> {
        for key in keys {
            self.entries
                .entry(key.to_vec())
                .or_default()
                .extend_from_slice(value);
        }
        Ok(())
    }

    fn scan(&self, visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()> {
        for (key, value) in &self.entries {
            visit(key, value)?;
        }
        Ok(())
    }
}

#[cfg(feature = "rocks")]
mod rocks {
    use std::path::Path;

    use rocksdb::{DB, IteratorMode, MergeOperands, Options, WriteBatch};

    use super::Store;
    use crate::error::{HmSearchError, Result};

    /// RocksDB-backed store. Partition slots are grown through an
    /// associative concat merge operator, so one insert's appends travel
    /// in a single atomic write batch.
    pub struct RocksStore {
        db: DB,
    }

    fn concat_merge(_key: &[u8], existing: Option<&[u8]>, operands: &MergeOperands) -> Option<Vec<u8>> {
        let mut merged = existing.map(<[u8]>::to_vec).unwrap_or_default();
        for operand in operands {
            merged.extend_from_slice(operand);
        }
        Some(merged)
    }

    /// The merge operator must be installed on every open, including
    /// read-only ones, for merged slots to read back correctly.
    fn base_options() -> Options {
        let mut opts = Options::default();
        opts.set_merge_operator_associative("hmsearch.concat", concat_merge);
        opts
    }

    fn io_error(err: &rocksdb::Error) -> HmSearchError {
        HmSearchError::StorageIo(err.to_string())
    }

    impl RocksStore {
        /// Create a fresh store at `path`, failing if anything is already
        /// there.
        pub fn create(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            if path.exists() {
                return Err(HmSearchError::StorageExists(path.display().to_string()));
            }

            let mut opts = base_options();
            opts.create_if_missing(true);
            opts.set_error_if_exists(true);
            let db = DB::open(&opts, path).map_err(|e| io_error(&e))?;
            Ok(Self { db })
        }

        /// Open an existing store read-write.
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            if !path.exists() {
                return Err(HmSearchError::StorageMissing(path.display().to_string()));
            }

            let db = DB::open(&base_options(), path).map_err(|e| io_error(&e))?;
            Ok(Self { db })
        }

        /// Open an existing store read-only; writes through the returned
        /// store fail with a storage error.
        pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            if !path.exists() {
                return Err(HmSearchError::StorageMissing(path.display().to_string()));
            }

            let db = DB::open_for_read_only(&base_options(), path, false).map_err(|e| io_error(&e))?;
            Ok(Self { db })
        }
    }

    impl Store for RocksStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            self.db.get(key).map_err(|e| io_error(&e))
        }

        fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
            self.db.put(key, value).map_err(|e| io_error(&e))
        }

        fn append_batch(&mut self, keys: &[&[u8]], value: &[u8]) -> Result<()> {
            let mut batch = WriteBatch::default();
            for key in keys {
                batch.merge(key, value);
            }
            self.db.write(batch).map_err(|e| io_error(&e))
        }

        fn scan(&self, visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()> {
            for item in self.db.iterator(IteratorMode::Start) {
                let (key, value) = item.map_err(|e| io_error(&e))?;
                visit(&key, &value)?;
            }
            Ok(())
        }
    }
}

#[cfg(feature = "rocks")]
pub use rocks::RocksStore;
