//! The HmSearch index: insert and lookup over partition slots.
//!
//! Only exact partition matches are stored; the 1-variant slots are probed
//! at query time by flipping each partition bit in turn. That trades a
//! factor of (1 + b) in lookup reads for a drastically smaller store and a
//! cheaper insert path.
//!
//! A lookup aggregates every hash found in the probed slots into a
//! candidate map carrying a match counter and the tier (exact or
//! 1-variant) of the first two observations. The validity rule then drops
//! candidates whose hits cannot witness a distance ≤ k, and the survivors
//! go through the exact Hamming filter. The rule rests on the pigeonhole
//! guarantee of the partition count: any pair within distance k agrees
//! exactly in some partition or differs by exactly one bit in some
//! partition.
//!
//! ## References
//!
//! - Zhang, Hua, Wang, Song (2013). "HmSearch: an efficient Hamming
//!   distance query processing algorithm"

use std::collections::HashMap;
use std::io::Write;
#[cfg(feature = "rocks")]
use std::path::Path;

use tracing::{debug, trace};

use crate::distance::hamming_distance;
use crate::error::{HmSearchError, Result};
use crate::hex::format_hexhash;
use crate::key::{
    decode_partition, flip_key_bit, partition_key, PartitionKey, SETTING_HASH_BITS,
    SETTING_MAX_ERROR,
};
use crate::params::IndexParams;
use crate::store::Store;
#[cfg(feature = "rocks")]
use crate::store::RocksStore;

const MATCH_EXACT: u8 = 0;
const MATCH_VARIANT: u8 = 1;

/// A stored hash matching a lookup, with its exact Hamming distance from
/// the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupHit {
    pub hash: Vec<u8>,
    pub distance: u32,
}

/// Per-candidate bookkeeping during a lookup: total slot hits plus the
/// tier of the first two.
#[derive(Debug, Default)]
struct Candidate {
    matches: u32,
    first_match: u8,
    second_match: u8,
}

impl Candidate {
    fn record(&mut self, tier: u8) {
        self.matches += 1;
        if self.matches == 1 {
            self.first_match = tier;
        } else if self.matches == 2 {
            self.second_match = tier;
        }
    }

    /// The HmSearch validity rule. A candidate within distance k must have
    /// been seen either in an exact slot or in enough variant slots; the
    /// threshold differs between odd and even k because the partition
    /// count P = ⌊(k+3)/2⌋ leaves odd k one extra partition of slack.
    fn is_valid(&self, odd_max_error: bool) -> bool {
        if odd_max_error {
            self.matches >= 3
                || (self.matches == 2
                    && (self.first_match == MATCH_EXACT || self.second_match == MATCH_EXACT))
        } else {
            self.matches >= 2 || self.first_match == MATCH_EXACT
        }
    }
}

/// Handle to an open index.
///
/// Created once with [`HmIndex::create`] (which fixes `hash_bits` and
/// `max_error` for the store's lifetime) and opened with [`HmIndex::open`]
/// thereafter. The store-agnostic pair [`HmIndex::init_store`] /
/// [`HmIndex::from_store`] serves custom backends.
pub struct HmIndex {
    store: Option<Box<dyn Store>>,
    params: IndexParams,
}

impl HmIndex {
    /// Create a new index at `path`, write its settings records and close
    /// it. Fails with [`HmSearchError::StorageExists`] if anything is
    /// already at `path`.
    #[cfg(feature = "rocks")]
    pub fn create(path: impl AsRef<Path>, hash_bits: u32, max_error: u32) -> Result<()> {
        let path = path.as_ref();
        let params = IndexParams::new(hash_bits, max_error)?;
        let mut store = RocksStore::create(path)?;
        write_settings(&mut store, &params)?;
        debug!(
            path = %path.display(),
            hash_bits,
            max_error,
            partitions = params.partitions,
            "created index"
        );
        Ok(())
    }

    /// Open the index at `path` read-write.
    #[cfg(feature = "rocks")]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let index = Self::from_store(Box::new(RocksStore::open(path.as_ref())?))?;
        debug!(
            path = %path.as_ref().display(),
            hash_bits = index.params.hash_bits,
            max_error = index.params.max_error,
            "opened index"
        );
        Ok(index)
    }

    /// Open the index at `path` read-only; inserts will fail with a
    /// storage error.
    #[cfg(feature = "rocks")]
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let index = Self::from_store(Box::new(RocksStore::open_read_only(path.as_ref())?))?;
        debug!(
            path = %path.as_ref().display(),
            hash_bits = index.params.hash_bits,
            max_error = index.params.max_error,
            "opened index read-only"
        );
        Ok(index)
    }

    /// Write the settings records for a new index into a freshly created
    /// store. Fails if settings are already present; they are immutable
    /// once written.
    pub fn init_store(store: &mut dyn Store, hash_bits: u32, max_error: u32) -> Result<()> {
        let params = IndexParams::new(hash_bits, max_error)?;
        if store.get(SETTING_HASH_BITS)?.is_some() || store.get(SETTING_MAX_ERROR)?.is_some() {
            return Err(HmSearchError::StorageExists(
                "settings records already present".to_string(),
            ));
        }
        write_settings(store, &params)
    }

    /// Build a handle over an already-open store by reading its settings
    /// records.
    pub fn from_store(store: Box<dyn Store>) -> Result<Self> {
        let hash_bits = read_setting(store.as_ref(), SETTING_HASH_BITS)?;
        let max_error = read_setting(store.as_ref(), SETTING_MAX_ERROR)?;
        let params = IndexParams::new(hash_bits, max_error)
            .map_err(|e| HmSearchError::CorruptSettings(e.to_string()))?;
        Ok(Self {
            store: Some(store),
            params,
        })
    }

    /// Derived index parameters.
    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    /// Hash width in bits.
    pub fn hash_bits(&self) -> u32 {
        self.params.hash_bits
    }

    /// Maximum Hamming distance reported by lookups.
    pub fn max_error(&self) -> u32 {
        self.params.max_error
    }

    /// Add `hash` to the index.
    ///
    /// The hash is appended to one slot per partition; on the default
    /// backend all appends land in a single atomic batch. Repeated inserts
    /// of the same hash append duplicate copies (lookups still report the
    /// hash once).
    pub fn insert(&mut self, hash: &[u8]) -> Result<()> {
        self.check_hash_len(hash)?;
        let params = self.params;

        let keys: Vec<PartitionKey> = (0..params.partitions)
            .map(|i| partition_key(hash, i as u8, &params).0)
            .collect();
        let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();

        self.store_mut()?.append_batch(&key_refs, hash)
    }

    /// Find every stored hash within `max_error` of `query`.
    pub fn lookup(&self, query: &[u8]) -> Result<Vec<LookupHit>> {
        self.lookup_filtered(query, None)
    }

    /// Find every stored hash within `max_distance` of `query`;
    /// `max_distance` caps the reported distance below the index-wide
    /// `max_error`.
    pub fn lookup_within(&self, query: &[u8], max_distance: u32) -> Result<Vec<LookupHit>> {
        self.lookup_filtered(query, Some(max_distance))
    }

    fn lookup_filtered(&self, query: &[u8], max_distance: Option<u32>) -> Result<Vec<LookupHit>> {
        self.check_hash_len(query)?;
        let params = self.params;
        let store = self.store()?;

        let candidates = collect_candidates(store, query, &params)?;

        let odd_max_error = params.max_error % 2 == 1;
        let cap = max_distance.unwrap_or(params.max_error).min(params.max_error);

        let mut hits = Vec::new();
        for (hash, candidate) in &candidates {
            if !candidate.is_valid(odd_max_error) {
                continue;
            }
            let distance = hamming_distance(query, hash);
            if distance <= cap {
                hits.push(LookupHit {
                    hash: hash.clone(),
                    distance,
                });
            }
        }

        trace!(
            candidates = candidates.len(),
            results = hits.len(),
            "lookup complete"
        );
        Ok(hits)
    }

    /// Debug walk: write every partition slot and its member hashes to
    /// `out` in key order.
    pub fn dump(&self, out: &mut dyn Write) -> Result<()> {
        let params = self.params;
        self.store()?.scan(&mut |key, value| {
            let Some((partition, pbits)) = decode_partition(key) else {
                return Ok(());
            };
            writeln!(out, "Partition {} {}", partition, format_hexhash(pbits))
                .map_err(write_error)?;
            for chunk in value.chunks_exact(params.hash_bytes) {
                writeln!(out, "    {}", format_hexhash(chunk)).map_err(write_error)?;
            }
            writeln!(out).map_err(write_error)?;
            Ok(())
        })
    }

    /// Release the store handle. Idempotent; any later operation fails
    /// with [`HmSearchError::Closed`]. Dropping the handle closes it too.
    pub fn close(&mut self) -> Result<()> {
        if self.store.take().is_some() {
            debug!("closed index");
        }
        Ok(())
    }

    fn check_hash_len(&self, hash: &[u8]) -> Result<()> {
        if hash.len() != self.params.hash_bytes {
            return Err(HmSearchError::InvalidHashLength {
                expected: self.params.hash_bytes,
                actual: hash.len(),
            });
        }
        Ok(())
    }

    fn store(&self) -> Result<&dyn Store> {
        self.store.as_deref().ok_or(HmSearchError::Closed)
    }

    fn store_mut(&mut self) -> Result<&mut dyn Store> {
        match self.store.as_mut() {
            Some(store) => Ok(store.as_mut()),
            None => Err(HmSearchError::Closed),
        }
    }
}

/// Probe the exact slot and every 1-variant slot of each partition,
/// aggregating the stored hashes found there.
fn collect_candidates(
    store: &dyn Store,
    query: &[u8],
    params: &IndexParams,
) -> Result<HashMap<Vec<u8>, Candidate>> {
    let mut candidates = HashMap::new();

    for i in 0..params.partitions {
        let partition = i as u8;
        let start = params.partition_start(partition);
        let (mut key, psize) = partition_key(query, partition, params);

        if let Some(value) = store.get(&key)? {
            record_slot(&mut candidates, MATCH_EXACT, &value, params.hash_bytes);
        }

        for pbit in start..start + psize {
            flip_key_bit(&mut key, start, pbit);
            if let Some(value) = store.get(&key)? {
                record_slot(&mut candidates, MATCH_VARIANT, &value, params.hash_bytes);
            }
            flip_key_bit(&mut key, start, pbit);
        }
    }

    Ok(candidates)
}

fn record_slot(
    candidates: &mut HashMap<Vec<u8>, Candidate>,
    tier: u8,
    value: &[u8],
    hash_bytes: usize,
) {
    for chunk in value.chunks_exact(hash_bytes) {
        candidates.entry(chunk.to_vec()).or_default().record(tier);
    }
}

fn write_settings(store: &mut dyn Store, params: &IndexParams) -> Result<()> {
    store.put(SETTING_HASH_BITS, params.hash_bits.to_string().as_bytes())?;
    store.put(SETTING_MAX_ERROR, params.max_error.to_string().as_bytes())
}

fn read_setting(store: &dyn Store, key: &[u8]) -> Result<u32> {
    let name = String::from_utf8_lossy(key).into_owned();
    let raw = store
        .get(key)?
        .ok_or_else(|| HmSearchError::CorruptSettings(format!("missing {name} record")))?;
    let text = std::str::from_utf8(&raw)
        .map_err(|_| HmSearchError::CorruptSettings(format!("{name} is not ASCII decimal")))?;
    let value: u32 = text
        .parse()
        .map_err(|_| HmSearchError::CorruptSettings(format!("{name} is not a decimal integer: {text:?}")))?;
    if value == 0 {
        return Err(HmSearchError::CorruptSettings(format!(
            "{name} must be positive"
        )));
    }
    Ok(value)
}

fn write_error(err: std::io::Error) -> HmSearchError {
    HmSearchError::StorageIo(err.to_string())
}
