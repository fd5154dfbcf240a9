//! Single-buffer value storage.

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
use crate::store::ValueStore;

/// Smallest non-zero capacity a contiguous store allocates.
const MIN_NON_ZERO_CAP: usize = 4;

/// A value store holding every element in one growable buffer.
///
/// Elements can be viewed as a slice in insertion order through
/// [`as_slice`](Contiguous::as_slice). Growing the buffer relocates every
/// element.
pub struct Contiguous<T, A: MemoryBackend = Global> {
    buf: RawBuf<T, A>,
    len: usize,
}

impl<T, A: MemoryBackend> Contiguous<T, A> {
    /// The stored elements in index order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: The first `len` elements are initialized.
        unsafe { core::slice::from_raw_parts(self.buf.as_ptr(), self.len) }
    }

    /// The stored elements in index order, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: The first `len` elements are initialized and uniquely
        // borrowed through `self`.
        unsafe { core::slice::from_raw_parts_mut(self.buf.as_ptr(), self.len) }
    }

    /// Drops every element at index `len` and beyond.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = core::ptr::slice_from_raw_parts_mut(
            // SAFETY: `len < self.len <= capacity`.
            unsafe { self.buf.as_ptr().add(len) },
            self.len - len,
        );
        self.len = len;
        // SAFETY: The tail was initialized and is no longer reachable through
        // `self.len`, so a panicking destructor cannot cause a double drop.
        unsafe { core::ptr::drop_in_place(tail) };
    }
}

impl<T, A: MemoryBackend> ValueStore<T> for Contiguous<T, A> {
    type Backend = A;

    type Iter<'a>
        = core::slice::Iter<'a, T>
    where
        Self: 'a,
        T: 'a;

    type IterMut<'a>
        = core::slice::IterMut<'a, T>
    where
        Self: 'a,
        T: 'a;

    type IntoIter = IntoIter<T, A>;

    fn new_in(alloc: A) -> Self {
        Self {
            buf: RawBuf::new_in(alloc),
            len: 0,
        }
    }

    #[inline]
    fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        let required = self
            .len
            .checked_add(additional)
            .context(CapacityOverflowSnafu)?;
        if required <= self.buf.capacity() {
            return Ok(());
        }

        let new_cap = self
            .buf
            .capacity()
            .saturating_mul(2)
            .max(required)
            .max(MIN_NON_ZERO_CAP);
        self.buf.try_resize_to(self.len, new_cap)
    }

    #[inline]
    unsafe fn push_within_capacity(&mut self, value: T) -> &mut T {
        debug_assert!(self.len < self.buf.capacity());
        // SAFETY: Caller guarantees a free slot at `len`.
        unsafe {
            let slot = self.buf.as_ptr().add(self.len);
            slot.write(value);
            self.len += 1;
            &mut *slot
        }
    }

    #[inline(always)]
    unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len);
        // SAFETY: Caller guarantees `index < len`.
        unsafe { &*self.buf.as_ptr().add(index) }
    }

    #[inline(always)]
    unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len);
        // SAFETY: Caller guarantees `index < len`.
        unsafe { &mut *self.buf.as_ptr().add(index) }
    }

    fn swap_remove(&mut self, index: usize) -> T {
        assert!(
            index < self.len,
            "swap_remove index (is {index}) should be < len (is {})",
            self.len
        );
        let last = self.len - 1;
        // SAFETY: `index` and `last` are in bounds. The removed value is read
        // out before `last` is copied over it, and `len` shrinks so `last` is
        // no longer considered initialized.
        unsafe {
            let base = self.buf.as_ptr();
            let value = base.add(index).read();
            if index != last {
                core::ptr::copy_nonoverlapping(base.add(last), base.add(index), 1);
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
        // SAFETY: The element at the old `len - 1` was initialized and is no
        // longer tracked.
        Some(unsafe { self.buf.as_ptr().add(self.len).read() })
    }

    fn clear(&mut self) {
        self.truncate(0);
    }

    fn try_shrink_to_fit(&mut self) -> Result<(), TryReserveError> {
        if self.buf.capacity() > self.len {
            self.buf.try_resize_to(self.len, self.len)?;
        }
        Ok(())
    }

    #[inline]
    fn iter(&self) -> Self::Iter<'_> {
        self.as_slice().iter()
    }

    #[inline]
    fn iter_mut(&mut self) -> Self::IterMut<'_> {
        self.as_mut_slice().iter_mut()
    }

    fn into_values(self) -> IntoIter<T, A> {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used or dropped again; ownership of the
        // buffer and its initialized prefix moves into the iterator.
        let buf = unsafe { core::ptr::read(&this.buf) };
        IntoIter {
            buf,
            start: 0,
            end: this.len,
            _marker: PhantomData,
        }
    }
}

impl<T, A: MemoryBackend> Drop for Contiguous<T, A> {
    fn drop(&mut self) {
        self.truncate(0);
    }
}

impl<T: Debug, A: MemoryBackend> Debug for Contiguous<T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// An owning iterator over the elements of a [`Contiguous`] store.
pub struct IntoIter<T, A: MemoryBackend> {
    buf: RawBuf<T, A>,
    start: usize,
    end: usize,
    _marker: PhantomData<T>,
}

impl<T, A: MemoryBackend> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        // SAFETY: Elements in `start..end` are initialized and owned by the
        // iterator; advancing `start` gives up ownership of this one.
        let value = unsafe { self.buf.as_ptr().add(self.start).read() };
        self.start += 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.start;
        (remaining, Some(remaining))
    }
}

impl<T, A: MemoryBackend> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: MemoryBackend> FusedIterator for IntoIter<T, A> {}

impl<T, A: MemoryBackend> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        let remaining = core::ptr::slice_from_raw_parts_mut(
            // SAFETY: `start <= end <= capacity`.
            unsafe { self.buf.as_ptr().add(self.start) },
            self.end - self.start,
        );
        self.start = self.end;
        // SAFETY: Elements in the remaining range are initialized and owned
        // by the iterator.
        unsafe { core::ptr::drop_in_place(remaining) };
    }
}
