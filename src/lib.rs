//! hmsearch: a persistent index for approximate matching of fixed-width
//! binary fingerprints under Hamming distance.
//!
//! Given a corpus of hashes of identical bit-width B, a lookup answers:
//! every stored hash within Hamming distance k of the query, where k is
//! fixed when the index is created. Typical use is near-duplicate
//! detection over perceptual or content hashes.
//!
//! # Algorithm
//!
//! The HmSearch scheme splits each B-bit hash into P = ⌊(k+3)/2⌋
//! partitions of b = ⌈B/P⌉ bits and stores the full hash under one slot
//! key per partition. By pigeonhole, two hashes within distance k agree
//! exactly in at least one partition or differ by exactly one bit in at
//! least one partition, so a lookup only probes the query's P exact slots
//! and their P·b one-bit-flipped neighbors. A validity rule over the
//! per-candidate hit pattern discards candidates that cannot be within k,
//! and an exact table-driven Hamming check filters the rest — sublinear
//! candidate generation with no false negatives.
//!
//! Only exact slots are materialized; the 1-variant neighborhood is
//! enumerated at query time, keeping the store P× the corpus size instead
//! of P·(1+b)×.
//!
//! # Example
//!
//! ```
//! use hmsearch::{HmIndex, MemoryStore};
//!
//! # fn main() -> hmsearch::Result<()> {
//! let mut store = MemoryStore::new();
//! HmIndex::init_store(&mut store, 64, 6)?;
//! let mut index = HmIndex::from_store(Box::new(store))?;
//!
//! let fingerprint = 0xd1ce_5ca1_ab1e_f00d_u64.to_be_bytes();
//! index.insert(&fingerprint)?;
//!
//! let mut probe = fingerprint;
//! probe[0] ^= 0x04; // one bit of noise
//! let hits = index.lookup(&probe)?;
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].hash, fingerprint);
//! assert_eq!(hits[0].distance, 1);
//! # Ok(())
//! # }
//! ```
//!
//! Persistent indexes live in a RocksDB store (feature `rocks`, on by
//! default): [`HmIndex::create`] once, then [`HmIndex::open`] /
//! [`HmIndex::open_read_only`]. Any other ordered byte-keyed store can be
//! plugged in through the [`Store`] trait.
//!
//! # References
//!
//! - Zhang, Hua, Wang, Song (2013). "HmSearch: an efficient Hamming
//!   distance query processing algorithm", SSDBM '13

pub mod distance;
pub mod error;
pub mod hex;
pub mod index;
mod key;
pub mod params;
pub mod store;

pub use distance::hamming_distance;
pub use error::{HmSearchError, Result};
pub use hex::{format_hexhash, parse_hexhash};
pub use index::{HmIndex, LookupHit};
pub use params::IndexParams;
#[cfg(feature = "rocks")]
pub use store::RocksStore;
pub use store::{MemoryStore, Store};
