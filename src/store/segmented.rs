//! Chunked value storage with stable element addresses across growth.

use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;

use snafu::OptionExt;

use crate::error::CapacityOverflowSnafu;
use crate::error::TryReserveError;
use crate::memory::Global;
use crate::memory::MemoryBackend;
use crate::raw::RawBuf;
use crate::store::Contiguous;
use crate::store::ValueStore;

/// Target chunk payload in bytes.
const CHUNK_BYTES: usize = 4096;

/// A value store holding elements in fixed-size chunks.
///
/// Each chunk holds a power-of-two number of elements, chosen so a chunk is
/// roughly 4 KiB (at least one element per chunk). Element `i` lives in chunk
/// `i >> CHUNK_BITS` at offset `i & CHUNK_MASK`. Growing appends new chunks
/// and never relocates existing elements, so references obtained before an
/// insert stay valid after it (as far as the borrow checker allows; raw
/// pointers taken from them remain dereferenceable). Removing an element
/// moves the last element into the vacated index.
pub struct Segmented<T, A: MemoryBackend = Global> {
    chunks: Contiguous<RawBuf<T, A>, A>,
    len: usize,
}

impl<T, A: MemoryBackend> Segmented<T, A> {
    const CHUNK_BITS: u32 = {
        let size = core::mem::size_of::<T>();
        if size == 0 {
            12
        } else {
            let per_chunk = CHUNK_BYTES / size;
            if per_chunk <= 1 { 0 } else { per_chunk.ilog2() }
        }
    };

    const CHUNK_LEN: usize = 1 << Self::CHUNK_BITS;

    const CHUNK_MASK: usize = Self::CHUNK_LEN - 1;

    /// Number of elements per chunk.
    pub const fn chunk_len() -> usize {
        Self::CHUNK_LEN
    }

    /// Number of chunks currently allocated.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> *mut T {
        debug_assert!(index < self.capacity());
        // SAFETY: `index < capacity` so the chunk exists and the offset is
        // within it.
        unsafe {
            self.chunks
                .get_unchecked(index >> Self::CHUNK_BITS)
                .as_ptr()
                .add(index & Self::CHUNK_MASK)
        }
    }

    fn drop_elements(&mut self) {
        let len = core::mem::replace(&mut self.len, 0);
        if !core::mem::needs_drop::<T>() {
            return;
        }
        for (chunk_index, chunk) in self.chunks.iter().enumerate() {
            let start = chunk_index << Self::CHUNK_BITS;
            if start >= len {
                break;
            }
            let count = (len - start).min(Self::CHUNK_LEN);
            // SAFETY: The first `count` elements of this chunk were
            // initialized and `len` has already been reset.
            unsafe {
                core::ptr::drop_in_place(core::ptr::slice_from_raw_parts_mut(
                    chunk.as_ptr(),
                    count,
                ));
            }
        }
    }
}

impl<T, A: MemoryBackend> ValueStore<T> for Segmented<T, A> {
    type Backend = A;

    type Iter<'a>
        = Iter<'a, T, A>
    where
        Self: 'a,
        T: 'a;

    type IterMut<'a>
        = IterMut<'a, T, A>
    where
        Self: 'a,
        T: 'a;

    type IntoIter = IntoIter<T, A>;

    fn new_in(alloc: A) -> Self {
        Self {
            chunks: Contiguous::new_in(alloc),
            len: 0,
        }
    }

    #[inline]
    fn allocator(&self) -> &A {
        self.chunks.allocator()
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.chunks.len().saturating_mul(Self::CHUNK_LEN)
    }

    fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        let required = self
            .len
            .checked_add(additional)
            .context(CapacityOverflowSnafu)?;
        if required <= self.capacity() {
            return Ok(());
        }

        let needed_chunks = required.div_ceil(Self::CHUNK_LEN);
        self.chunks.try_reserve(needed_chunks - self.chunks.len())?;
        while self.chunks.len() < needed_chunks {
            let chunk = RawBuf::try_with_capacity_in(Self::CHUNK_LEN, self.allocator().clone())?;
            // SAFETY: Reserved room for every missing chunk above.
            unsafe {
                self.chunks.push_within_capacity(chunk);
            }
        }
        Ok(())
    }

    #[inline]
    unsafe fn push_within_capacity(&mut self, value: T) -> &mut T {
        debug_assert!(self.len < self.capacity());
        let slot = self.slot(self.len);
        // SAFETY: Caller guarantees the slot at `len` exists and is free.
        unsafe {
            slot.write(value);
            self.len += 1;
            &mut *slot
        }
    }

    #[inline(always)]
    unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len);
        // SAFETY: Caller guarantees `index < len`.
        unsafe { &*self.slot(index) }
    }

    #[inline(always)]
    unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len);
        // SAFETY: Caller guarantees `index < len`; `&mut self` makes the
        // reference unique.
        unsafe { &mut *self.slot(index) }
    }

    fn swap_remove(&mut self, index: usize) -> T {
        assert!(
            index < self.len,
            "swap_remove index (is {index}) should be < len (is {})",
            self.len
        );
        let last = self.len - 1;
        let hole = self.slot(index);
        // SAFETY: Both slots are initialized. The removed value is read out
        // before the last element is moved over it, and `len` shrinks so the
        // old last slot is no longer considered initialized.
        unsafe {
            let value = hole.read();
            if index != last {
                core::ptr::copy_nonoverlapping(self.slot(last), hole, 1);
            }
            self.len = last;
            value
        }
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: The old last element was initialized and is no longer
        // tracked.
        Some(unsafe { self.slot(self.len).read() })
    }

    fn clear(&mut self) {
        self.drop_elements();
    }

    fn try_shrink_to_fit(&mut self) -> Result<(), TryReserveError> {
        let keep = self.len.div_ceil(Self::CHUNK_LEN);
        self.chunks.truncate(keep);
        self.chunks.try_shrink_to_fit()
    }

    fn iter(&self) -> Iter<'_, T, A> {
        Iter {
            chunks: self.chunks.as_slice(),
            index: 0,
            len: self.len,
            _marker: PhantomData,
        }
    }

    fn iter_mut(&mut self) -> IterMut<'_, T, A> {
        IterMut {
            chunks: self.chunks.as_slice(),
            index: 0,
            len: self.len,
            _marker: PhantomData,
        }
    }

    fn into_values(self) -> IntoIter<T, A> {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used or dropped again; the chunk table and
        // the initialized prefix move into the iterator.
        let chunks = unsafe { core::ptr::read(&this.chunks) };
        IntoIter {
            chunks,
            index: 0,
            len: this.len,
        }
    }
}

impl<T, A: MemoryBackend> Drop for Segmented<T, A> {
    fn drop(&mut self) {
        self.drop_elements();
    }
}

impl<T: Debug, A: MemoryBackend> Debug for Segmented<T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[inline(always)]
fn chunk_slot<T, A: MemoryBackend>(chunks: &[RawBuf<T, A>], index: usize) -> *mut T {
    let bits = Segmented::<T, A>::CHUNK_BITS;
    let mask = Segmented::<T, A>::CHUNK_MASK;
    // SAFETY: Iterators only pass indices below the store's length, so the
    // chunk exists.
    unsafe { chunks.get_unchecked(index >> bits).as_ptr().add(index & mask) }
}

/// A borrowing iterator over a [`Segmented`] store.
pub struct Iter<'a, T, A: MemoryBackend> {
    chunks: &'a [RawBuf<T, A>],
    index: usize,
    len: usize,
    _marker: PhantomData<&'a T>,
}

impl<T, A: MemoryBackend> Clone for Iter<'_, T, A> {
    fn clone(&self) -> Self {
        Self {
            chunks: self.chunks,
            index: self.index,
            len: self.len,
            _marker: PhantomData,
        }
    }
}

impl<'a, T, A: MemoryBackend> Iterator for Iter<'a, T, A> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        if self.index == self.len {
            return None;
        }
        // SAFETY: `index < len`, so the element is initialized and borrowed
        // for `'a` through the store.
        let value = unsafe { &*chunk_slot(self.chunks, self.index) };
        self.index += 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<T, A: MemoryBackend> ExactSizeIterator for Iter<'_, T, A> {}

impl<T, A: MemoryBackend> FusedIterator for Iter<'_, T, A> {}

/// A mutably borrowing iterator over a [`Segmented`] store.
pub struct IterMut<'a, T, A: MemoryBackend> {
    chunks: &'a [RawBuf<T, A>],
    index: usize,
    len: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, A: MemoryBackend> Iterator for IterMut<'a, T, A> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        if self.index == self.len {
            return None;
        }
        // SAFETY: `index < len` and each index is yielded once, so the
        // references never alias. The store is mutably borrowed for `'a`.
        let value = unsafe { &mut *chunk_slot(self.chunks, self.index) };
        self.index += 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<T, A: MemoryBackend> ExactSizeIterator for IterMut<'_, T, A> {}

impl<T, A: MemoryBackend> FusedIterator for IterMut<'_, T, A> {}

/// An owning iterator over the elements of a [`Segmented`] store.
pub struct IntoIter<T, A: MemoryBackend> {
    chunks: Contiguous<RawBuf<T, A>, A>,
    index: usize,
    len: usize,
}

impl<T, A: MemoryBackend> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.index == self.len {
            return None;
        }
        // SAFETY: Elements in `index..len` are initialized and owned by the
        // iterator; advancing `index` gives up ownership of this one.
        let value = unsafe { chunk_slot(self.chunks.as_slice(), self.index).read() };
        self.index += 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<T, A: MemoryBackend> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: MemoryBackend> FusedIterator for IntoIter<T, A> {}

impl<T, A: MemoryBackend> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        if core::mem::needs_drop::<T>() {
            while self.index < self.len {
                let slot = chunk_slot(self.chunks.as_slice(), self.index);
                self.index += 1;
                // SAFETY: Element is initialized and owned by the iterator.
                unsafe { core::ptr::drop_in_place(slot) };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn chunk_geometry() {
        assert_eq!(Segmented::<u8, Global>::chunk_len(), 4096);
        assert_eq!(Segmented::<u64, Global>::chunk_len(), 512);
        assert_eq!(Segmented::<[u8; 3000], Global>::chunk_len(), 1);
        assert_eq!(Segmented::<[u8; 5000], Global>::chunk_len(), 1);
        assert_eq!(Segmented::<(), Global>::chunk_len(), 4096);
    }

    #[test]
    fn growth_never_moves_elements() {
        let mut store: Segmented<u64> = Segmented::new_in(Global);
        let first = store.push(17) as *const u64;
        let mut addresses = Vec::new();
        for i in 0..5000u64 {
            addresses.push(store.push(i) as *const u64);
        }
        assert!(store.chunk_count() > 1);
        // SAFETY: Elements were never removed, and growth only appends chunks.
        unsafe {
            assert_eq!(*first, 17);
            for (i, ptr) in addresses.iter().enumerate() {
                assert_eq!(**ptr, i as u64);
            }
        }
    }

    #[test]
    fn shrink_releases_unused_chunks() {
        let mut store: Segmented<u64> = Segmented::new_in(Global);
        for i in 0..2000u64 {
            store.push(i);
        }
        assert_eq!(store.chunk_count(), 4);
        while store.len() > 600 {
            store.pop();
        }
        store.try_shrink_to_fit().unwrap();
        assert_eq!(store.chunk_count(), 2);
        assert_eq!(store.iter().copied().sum::<u64>(), (0..600).sum());
    }
}
