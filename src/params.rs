//! Index parameterization.
//!
//! From the pair (hash_bits, max_error) this module derives the partition
//! geometry that the whole index hangs off: the partition count P, the
//! nominal bits per partition b, and the byte length of a partition key.
//! Once written to a store these values are immutable for its lifetime.
//!
//! HmSearch requires P ≥ ⌈(k+1)/2⌉ so that, by pigeonhole, any pair of
//! hashes within distance k agrees exactly in at least one partition or
//! differs by exactly one bit in at least one partition. The slightly
//! larger P = ⌊(k+3)/2⌋ gives the even-k validity rule its simple form.

use crate::error::{HmSearchError, Result};

/// Upper bound on `max_error` imposed by the single partition-index byte
/// in the key layout.
pub const MAX_ERROR_LIMIT: u32 = 518;

/// Derived index parameters, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexParams {
    /// Hash width in bits (B). Always a positive multiple of 8.
    pub hash_bits: u32,
    /// Maximum Hamming distance reported by lookups (k).
    pub max_error: u32,
    /// Hash width in bytes, `hash_bits / 8`.
    pub hash_bytes: usize,
    /// Partition count P = ⌊(k+3)/2⌋.
    pub partitions: u32,
    /// Nominal bits per partition b = ⌈B/P⌉. The final partition may carry
    /// fewer real bits but is padded to b in the key layout.
    pub partition_bits: usize,
    /// Partition-bits bytes in a key, ⌈b/8⌉ plus one reserved trailing byte.
    pub partition_bytes: usize,
}

impl IndexParams {
    /// Validate (hash_bits, max_error) and derive the partition geometry.
    pub fn new(hash_bits: u32, max_error: u32) -> Result<Self> {
        if hash_bits == 0 || hash_bits % 8 != 0 {
            return Err(HmSearchError::InvalidHashBits(hash_bits));
        }
        if max_error == 0 || max_error >= hash_bits || max_error > MAX_ERROR_LIMIT {
            return Err(HmSearchError::InvalidMaxError(max_error));
        }

        let partitions = (max_error + 3) / 2;
        let partition_bits = (hash_bits as usize).div_ceil(partitions as usize);
        let partition_bytes = partition_bits.div_ceil(8) + 1;

        Ok(Self {
            hash_bits,
            max_error,
            hash_bytes: hash_bits as usize / 8,
            partitions,
            partition_bits,
            partition_bytes,
        })
    }

    /// Total byte length of a partition key: tag byte, partition index,
    /// partition bits, reserved byte.
    #[inline]
    pub fn partition_key_len(&self) -> usize {
        self.partition_bytes + 2
    }

    /// First hash bit covered by `partition`.
    #[inline]
    pub(crate) fn partition_start(&self, partition: u8) -> usize {
        partition as usize * self.partition_bits
    }

    /// Number of real hash bits in `partition`; zero for a trailing
    /// partition that starts at or past the end of the hash.
    #[inline]
    pub(crate) fn partition_size(&self, partition: u8) -> usize {
        self.partition_bits
            .min((self.hash_bits as usize).saturating_sub(self.partition_start(partition)))
    }
}
