//! Hash mixing, fingerprints, and load-factor arithmetic shared by the index
//! table and the containers.

use snafu::ensure;

use crate::error::CapacityOverflowSnafu;
use crate::error::TryReserveError;

/// Smallest non-zero bucket count.
pub(crate) const MIN_BUCKET_COUNT: usize = 4;

/// Bucket counts must stay strictly below this so value indices fit in 32
/// bits and the count itself fits in a `usize`.
pub(crate) const MAX_BUCKET_COUNT: usize =
    1 << (if usize::BITS > 32 { 32 } else { usize::BITS - 1 });

/// Lower bound accepted by `set_max_load_factor`.
pub(crate) const MIN_MAX_LOAD_FACTOR: f32 = 0.05;

/// Upper bound accepted by `set_max_load_factor`. At least one bucket always
/// stays empty so probes terminate.
pub(crate) const MAX_MAX_LOAD_FACTOR: f32 = 0.99;

cfg_if::cfg_if! {
    if #[cfg(feature = "density-ninety-seven")] {
        /// Maximum load factor a freshly created container uses.
        pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.97;
    } else if #[cfg(feature = "density-ninety-two")] {
        /// Maximum load factor a freshly created container uses.
        pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.92;
    } else {
        /// Maximum load factor a freshly created container uses.
        pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.875;
    }
}

/// Multiplicative mixing constant (2^64 / golden ratio).
const MIX_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

/// Scrambles a raw hash so that both its low bits (bucket selection) and its
/// top byte (fingerprint) depend on every input bit.
///
/// Computes the full 128-bit product with a fixed odd constant and folds the
/// high half into the low half.
#[inline(always)]
pub(crate) fn mix(hash: u64) -> u64 {
    let r = (hash as u128).wrapping_mul(MIX_MULTIPLIER as u128);
    ((r >> 64) as u64) ^ (r as u64)
}

/// The 8-bit fingerprint stored alongside each occupied slot.
#[inline(always)]
pub(crate) fn hashtag(mixed: u64) -> u8 {
    (mixed >> 56) as u8
}

/// The home bucket of a mixed hash under `mask` (`bucket_count - 1`).
#[inline(always)]
pub(crate) fn home_bucket(mixed: u64, mask: usize) -> usize {
    (mixed as usize) & mask
}

/// Clamps a requested maximum load factor into the supported range. `NaN`
/// selects the default.
#[inline]
pub(crate) fn clamp_max_load_factor(requested: f32) -> f32 {
    if requested.is_nan() {
        DEFAULT_MAX_LOAD_FACTOR
    } else {
        requested.clamp(MIN_MAX_LOAD_FACTOR, MAX_MAX_LOAD_FACTOR)
    }
}

/// Number of elements a table with `bucket_count` buckets may hold.
///
/// Never reaches `bucket_count`, so at least one bucket is empty, and never
/// exceeds the 32-bit value-index range.
#[inline]
pub(crate) fn max_filled(bucket_count: usize, max_load_factor: f32) -> usize {
    if bucket_count == 0 {
        return 0;
    }

    let scaled = (bucket_count as f64 * max_load_factor as f64) as usize;
    scaled
        .min(bucket_count - 1)
        .min(u32::MAX as usize)
}

/// The smallest power-of-two bucket count able to hold `len` elements at
/// `max_load_factor`. Zero elements need zero buckets.
pub(crate) fn bucket_count_for(len: usize, max_load_factor: f32) -> Result<usize, TryReserveError> {
    if len == 0 {
        return Ok(0);
    }

    let mut count = MIN_BUCKET_COUNT;
    while max_filled(count, max_load_factor) < len {
        ensure!(count < MAX_BUCKET_COUNT / 2, CapacityOverflowSnafu);
        count *= 2;
    }

    Ok(count)
}
