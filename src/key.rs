//! Partition key codec.
//!
//! Every partition slot is addressed by a byte key on the format
//!
//! ```text
//! byte 0      b'P'
//! byte 1      partition index (capping P at 256 and max_error at 518)
//! bytes 2..   partition bits, positions preserved modulo 8, padding zeroed
//! ```
//!
//! The partition bits are *not* left-aligned: a partition starting at hash
//! bit 3 begins at bit 3 of its first key byte, with bits 0-2 masked to
//! zero. That keeps the extraction branch-free per byte and makes the
//! 1-bit flips of variant enumeration a single XOR. A partition whose bit
//! range is not byte-aligned straddles into the final key byte; otherwise
//! that byte stays zero.
//!
//! Settings keys start with `_`, partition keys with `P`, so the two key
//! spaces never collide.

use smallvec::SmallVec;

use crate::params::IndexParams;

/// Leading tag byte of every partition key.
pub(crate) const PARTITION_PREFIX: u8 = b'P';

/// Settings record holding the hash bit-width as decimal ASCII.
pub(crate) const SETTING_HASH_BITS: &[u8] = b"_hb";

/// Settings record holding the maximum error as decimal ASCII.
pub(crate) const SETTING_MAX_ERROR: &[u8] = b"_me";

/// A partition key; stays inline for every practical hash width.
pub(crate) type PartitionKey = SmallVec<[u8; 16]>;

/// Build the key for `partition` of `hash` and return it together with the
/// number of real hash bits the partition covers (the flip count for
/// variant enumeration).
pub(crate) fn partition_key(hash: &[u8], partition: u8, params: &IndexParams) -> (PartitionKey, usize) {
    let psize = params.partition_size(partition);

    let mut key = PartitionKey::with_capacity(params.partition_key_len());
    key.push(PARTITION_PREFIX);
    key.push(partition);

    let mut bits_left = psize;
    let mut hash_bit = params.partition_start(partition);
    for _ in 0..params.partition_bytes {
        let byte = hash_bit / 8;
        let bit = hash_bit % 8;
        let take = (8 - bit).min(bits_left);
        bits_left -= take;
        hash_bit += take;

        let mask = if take == 0 {
            0
        } else {
            (((1u16 << take) - 1) as u8) << (8 - bit - take)
        };
        key.push(hash.get(byte).copied().unwrap_or(0) & mask);
    }

    (key, psize)
}

/// Flip hash bit `pbit` inside a partition key built for the partition
/// starting at `partition_start`. Applying the same flip twice restores
/// the key.
#[inline]
pub(crate) fn flip_key_bit(key: &mut [u8], partition_start: usize, pbit: usize) {
    let byte = pbit / 8 - partition_start / 8 + 2;
    key[byte] ^= 0x80 >> (pbit % 8);
}

/// Split a partition key into (partition index, partition-bits bytes).
/// Returns `None` for settings keys and anything else that is not a
/// partition key.
pub(crate) fn decode_partition(key: &[u8]) -> Option<(u8, &[u8])> {
    match key {
        [PARTITION_PREFIX, partition, pbits @ ..] => Some((*partition, pbits)),
        _ => None,
    }
}
