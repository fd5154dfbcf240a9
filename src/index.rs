//! The bucket index table.
//!
//! A power-of-two array of 8-byte slots mapping hashes to positions in the
//! value store. Collisions are resolved with robin-hood linear probing and
//! removals use backward-shift deletion, so the table never holds tombstones.
//!
//! Each slot packs its probe distance and the element's fingerprint into one
//! `u32`: the upper 24 bits hold `displacement + 1` and the low 8 bits hold
//! the fingerprint. Zero marks an empty slot. Comparing packed values orders
//! slots first by distance and then by fingerprint, which is the order every
//! probe run is kept in.

use core::fmt::Debug;

use crate::error::TryReserveError;
use crate::hash_policy::clamp_max_load_factor;
use crate::hash_policy::hashtag;
use crate::hash_policy::home_bucket;
use crate::hash_policy::max_filled;
use crate::hash_policy::mix;
use crate::memory::MemoryBackend;
use crate::raw::RawBuf;

/// Increment of the packed distance field for one step of probing.
pub(crate) const DIST_INC: u32 = 1 << 8;

const FINGERPRINT_MASK: u32 = DIST_INC - 1;

#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub(crate) struct Slot {
    dist_fp: u32,
    value_index: u32,
}

const EMPTY: Slot = Slot {
    dist_fp: 0,
    value_index: 0,
};

impl Slot {
    #[inline(always)]
    pub(crate) fn is_empty(self) -> bool {
        self.dist_fp == 0
    }

    /// Steps from the home bucket. Only meaningful for occupied slots.
    #[inline(always)]
    pub(crate) fn displacement(self) -> usize {
        ((self.dist_fp >> 8) - 1) as usize
    }

    #[inline(always)]
    pub(crate) fn fingerprint(self) -> u8 {
        (self.dist_fp & FINGERPRINT_MASK) as u8
    }

    #[inline(always)]
    pub(crate) fn value_index(self) -> usize {
        self.value_index as usize
    }
}

impl Debug for Slot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            f.write_str("..")
        } else {
            write!(
                f,
                "{}@+{}#{:02x}",
                self.value_index,
                self.displacement(),
                self.fingerprint()
            )
        }
    }
}

/// Outcome of probing for a key.
pub(crate) enum Probe {
    /// The key is present at this slot position.
    Found { pos: usize, value_index: usize },
    /// The key is absent; a new slot with `dist_fp` belongs at `pos`.
    Vacant { pos: usize, dist_fp: u32 },
}

pub(crate) struct IndexTable<A: MemoryBackend> {
    slots: RawBuf<Slot, A>,
    bucket_count: usize,
    max_filled: usize,
    max_load_factor: f32,
}

impl<A: MemoryBackend> IndexTable<A> {
    /// An unallocated table with zero buckets.
    pub(crate) fn new_in(alloc: A, max_load_factor: f32) -> Self {
        Self {
            slots: RawBuf::new_in(alloc),
            bucket_count: 0,
            max_filled: 0,
            max_load_factor: clamp_max_load_factor(max_load_factor),
        }
    }

    /// A table with `bucket_count` empty buckets. `bucket_count` must be zero
    /// or a power of two.
    pub(crate) fn try_with_buckets_in(
        bucket_count: usize,
        alloc: A,
        max_load_factor: f32,
    ) -> Result<Self, TryReserveError> {
        debug_assert!(bucket_count == 0 || bucket_count.is_power_of_two());
        let max_load_factor = clamp_max_load_factor(max_load_factor);
        let slots = RawBuf::try_with_capacity_in(bucket_count, alloc)?;
        // SAFETY: The buffer holds `bucket_count` slots and the all-zero bit
        // pattern is `EMPTY`.
        unsafe { core::ptr::write_bytes(slots.as_ptr(), 0, bucket_count) };
        Ok(Self {
            slots,
            bucket_count,
            max_filled: max_filled(bucket_count, max_load_factor),
            max_load_factor,
        })
    }

    #[inline(always)]
    pub(crate) fn allocator(&self) -> &A {
        self.slots.allocator()
    }

    #[inline(always)]
    pub(crate) fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    #[inline(always)]
    pub(crate) fn max_filled(&self) -> usize {
        self.max_filled
    }

    #[inline(always)]
    pub(crate) fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Updates the load factor. Returns the new fill limit; the caller
    /// rebuilds if the current element count exceeds it.
    pub(crate) fn set_max_load_factor(&mut self, max_load_factor: f32) -> usize {
        self.max_load_factor = clamp_max_load_factor(max_load_factor);
        self.max_filled = max_filled(self.bucket_count, self.max_load_factor);
        self.max_filled
    }

    #[inline(always)]
    pub(crate) fn slots(&self) -> &[Slot] {
        // SAFETY: All `bucket_count` slots are initialized at allocation.
        unsafe { core::slice::from_raw_parts(self.slots.as_ptr(), self.bucket_count) }
    }

    #[inline(always)]
    fn slot(&self, pos: usize) -> Slot {
        debug_assert!(pos < self.bucket_count);
        // SAFETY: `pos` is always masked into `0..bucket_count`.
        unsafe { *self.slots.as_ptr().add(pos) }
    }

    #[inline(always)]
    fn slot_mut(&mut self, pos: usize) -> &mut Slot {
        debug_assert!(pos < self.bucket_count);
        // SAFETY: `pos` is always masked into `0..bucket_count`.
        unsafe { &mut *self.slots.as_ptr().add(pos) }
    }

    #[inline(always)]
    fn next(&self, pos: usize) -> usize {
        (pos + 1) & (self.bucket_count - 1)
    }

    /// Packed distance-and-fingerprint at the home bucket, and the home
    /// bucket itself.
    #[inline(always)]
    fn start(&self, hash: u64) -> (u32, usize) {
        let mixed = mix(hash);
        (
            DIST_INC | hashtag(mixed) as u32,
            home_bucket(mixed, self.bucket_count - 1),
        )
    }

    /// Probes for an element with `hash` accepted by `eq`.
    ///
    /// `eq` receives value-store indices and is only called for slots whose
    /// fingerprint and distance match. The table must have at least one
    /// bucket.
    #[inline]
    pub(crate) fn probe(&self, hash: u64, mut eq: impl FnMut(usize) -> bool) -> Probe {
        debug_assert!(self.bucket_count > 0);
        let (mut dist_fp, mut pos) = self.start(hash);
        loop {
            let slot = self.slot(pos);
            if slot.dist_fp == dist_fp {
                if eq(slot.value_index()) {
                    return Probe::Found {
                        pos,
                        value_index: slot.value_index(),
                    };
                }
            } else if dist_fp > slot.dist_fp {
                return Probe::Vacant { pos, dist_fp };
            }
            dist_fp = Self::step(dist_fp);
            pos = self.next(pos);
        }
    }

    /// Looks up an element; `None` when absent or when the table has no
    /// buckets.
    #[inline]
    pub(crate) fn find(&self, hash: u64, eq: impl FnMut(usize) -> bool) -> Option<(usize, usize)> {
        if self.bucket_count == 0 {
            return None;
        }
        match self.probe(hash, eq) {
            Probe::Found { pos, value_index } => Some((pos, value_index)),
            Probe::Vacant { .. } => None,
        }
    }

    #[inline(always)]
    fn step(dist_fp: u32) -> u32 {
        debug_assert!(dist_fp <= u32::MAX - DIST_INC, "probe distance overflow");
        dist_fp + DIST_INC
    }

    /// Inserts a slot for `value_index` at a `Vacant` position, displacing
    /// every resident of the run one step further from home.
    ///
    /// The table must not be full.
    pub(crate) fn insert_at(&mut self, pos: usize, dist_fp: u32, value_index: usize) {
        debug_assert!(value_index <= u32::MAX as usize);
        self.place_and_shift_up(
            Slot {
                dist_fp,
                value_index: value_index as u32,
            },
            pos,
        );
    }

    fn place_and_shift_up(&mut self, mut incoming: Slot, mut pos: usize) {
        while !self.slot(pos).is_empty() {
            incoming = core::mem::replace(self.slot_mut(pos), incoming);
            incoming.dist_fp = Self::step(incoming.dist_fp);
            pos = self.next(pos);
        }
        *self.slot_mut(pos) = incoming;
    }

    /// Empties the slot at `pos` and pulls the rest of its run one step
    /// closer to home.
    pub(crate) fn remove_at(&mut self, mut pos: usize) {
        let mut next = self.next(pos);
        while self.slot(next).dist_fp >= 2 * DIST_INC {
            let moved = self.slot(next);
            *self.slot_mut(pos) = Slot {
                dist_fp: moved.dist_fp - DIST_INC,
                value_index: moved.value_index,
            };
            pos = next;
            next = self.next(next);
        }
        *self.slot_mut(pos) = EMPTY;
    }

    /// Repoints the slot referring to value index `from` (whose element
    /// hashes to `hash`) at value index `to`.
    ///
    /// Used after the last element of the value store moved into a vacated
    /// position. The slot must exist.
    pub(crate) fn relink(&mut self, hash: u64, from: usize, to: usize) {
        let (_, mut pos) = self.start(hash);
        loop {
            let slot = self.slot(pos);
            debug_assert!(!slot.is_empty(), "relinked element missing from index");
            if slot.value_index() == from && !slot.is_empty() {
                break;
            }
            pos = self.next(pos);
        }
        self.slot_mut(pos).value_index = to as u32;
    }

    /// Marks every bucket empty, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        // SAFETY: The buffer holds `bucket_count` slots.
        unsafe { core::ptr::write_bytes(self.slots.as_ptr(), 0, self.bucket_count) };
    }

    /// Builds a fresh table of `bucket_count` buckets indexing `hashes`, one
    /// per value-store position, in order.
    ///
    /// `self` is left untouched, so a failed allocation or a panicking hasher
    /// cannot corrupt the current index.
    pub(crate) fn try_rebuilt(
        &self,
        bucket_count: usize,
        hashes: impl Iterator<Item = u64>,
    ) -> Result<Self, TryReserveError> {
        let alloc = self.allocator().clone();
        let mut table = Self::try_with_buckets_in(bucket_count, alloc, self.max_load_factor)?;
        let mut count = 0;
        for (value_index, hash) in hashes.enumerate() {
            count += 1;
            let (mut dist_fp, mut pos) = table.start(hash);
            while dist_fp < table.slot(pos).dist_fp {
                dist_fp = Self::step(dist_fp);
                pos = table.next(pos);
            }
            table.place_and_shift_up(
                Slot {
                    dist_fp,
                    value_index: value_index as u32,
                },
                pos,
            );
        }
        log::trace!(
            "rebuilt index: {} -> {} buckets for {count} elements",
            self.bucket_count,
            bucket_count
        );
        Ok(table)
    }

    /// Copies the slot array into a new allocation from `alloc`.
    pub(crate) fn try_clone_in(&self, alloc: A) -> Result<Self, TryReserveError> {
        let table = Self::try_with_buckets_in(self.bucket_count, alloc, self.max_load_factor)?;
        // SAFETY: Both buffers hold `bucket_count` slots and do not overlap.
        unsafe {
            core::ptr::copy_nonoverlapping(
                self.slots.as_ptr(),
                table.slots.as_ptr(),
                self.bucket_count,
            );
        }
        Ok(table)
    }
}

impl<A: MemoryBackend> Debug for IndexTable<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexTable")
            .field("bucket_count", &self.bucket_count)
            .field("max_filled", &self.max_filled)
            .field("max_load_factor", &self.max_load_factor)
            .field("slots", &self.slots())
            .finish()
    }
}
