use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::NonNull;

use snafu::OptionExt;

use crate::error::CapacityOverflowSnafu;
use crate::error::TryReserveError;
use crate::memory::MemoryBackend;

/// An uninitialized, fixed-capacity array of `T` allocated through a memory
/// backend.
///
/// `RawBuf` never tracks which elements are initialized and never drops them;
/// its owner does. Dropping a `RawBuf` only releases the allocation.
pub(crate) struct RawBuf<T, A: MemoryBackend> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

// SAFETY: `RawBuf` owns its allocation exclusively. Thread-safety of the
// contents is governed by `T`, and of allocation by `A`.
unsafe impl<T: Send, A: MemoryBackend + Send> Send for RawBuf<T, A> {}
// SAFETY: Shared access never mutates through `&RawBuf`.
unsafe impl<T: Sync, A: MemoryBackend + Sync> Sync for RawBuf<T, A> {}

impl<T, A: MemoryBackend> RawBuf<T, A> {
    const IS_ZST: bool = core::mem::size_of::<T>() == 0;

    /// An unallocated buffer. Zero-sized types report unbounded capacity.
    pub(crate) fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: if Self::IS_ZST { usize::MAX } else { 0 },
            alloc,
            _marker: PhantomData,
        }
    }

    pub(crate) fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        let mut buf = Self::new_in(alloc);
        if !Self::IS_ZST && capacity > 0 {
            buf.ptr = buf.allocate(capacity)?;
            buf.cap = capacity;
        }
        Ok(buf)
    }

    #[inline(always)]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    #[inline(always)]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Replaces the allocation with one of `new_cap` elements, moving the
    /// first `len` elements over.
    ///
    /// On error nothing has changed. `new_cap` may be smaller than the current
    /// capacity but must be at least `len`.
    pub(crate) fn try_resize_to(
        &mut self,
        len: usize,
        new_cap: usize,
    ) -> Result<(), TryReserveError> {
        debug_assert!(len <= self.cap && len <= new_cap);
        if Self::IS_ZST || new_cap == self.cap {
            return Ok(());
        }

        let new_ptr = if new_cap == 0 {
            NonNull::dangling()
        } else {
            self.allocate(new_cap)?
        };

        // SAFETY: Both buffers hold at least `len` elements, the new buffer is
        // fresh so the ranges cannot overlap, and the first `len` elements of
        // the old buffer are initialized per the caller.
        unsafe {
            core::ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), len);
        }

        let old_ptr = core::mem::replace(&mut self.ptr, new_ptr);
        let old_cap = core::mem::replace(&mut self.cap, new_cap);
        // SAFETY: `old_ptr` was allocated by `self.allocate(old_cap)`.
        unsafe { self.release(old_ptr, old_cap) };
        Ok(())
    }

    fn allocate(&self, capacity: usize) -> Result<NonNull<T>, TryReserveError> {
        let layout = Layout::array::<T>(capacity).ok().context(CapacityOverflowSnafu)?;
        self.alloc.allocate(layout).map(NonNull::cast)
    }

    /// # Safety
    ///
    /// `ptr` must have been produced by `self.allocate(cap)`.
    unsafe fn release(&self, ptr: NonNull<T>, cap: usize) {
        if Self::IS_ZST || cap == 0 {
            return;
        }
        // SAFETY: The layout was valid when `ptr` was allocated.
        unsafe {
            let layout = Layout::array::<T>(cap).unwrap_unchecked();
            self.alloc.deallocate(ptr.cast(), layout);
        }
    }
}

impl<T, A: MemoryBackend> Drop for RawBuf<T, A> {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`cap` always describe our current allocation.
        unsafe { self.release(self.ptr, self.cap) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Global;

    #[test]
    fn zero_sized_types_never_allocate() {
        let buf: RawBuf<(), Global> = RawBuf::try_with_capacity_in(1000, Global).unwrap();
        assert_eq!(buf.capacity(), usize::MAX);
    }

    #[test]
    fn resize_moves_prefix() {
        let mut buf: RawBuf<u64, Global> = RawBuf::try_with_capacity_in(4, Global).unwrap();
        unsafe {
            for i in 0..3 {
                buf.as_ptr().add(i).write(i as u64 * 10);
            }
        }
        buf.try_resize_to(3, 16).unwrap();
        assert_eq!(buf.capacity(), 16);
        unsafe {
            for i in 0..3 {
                assert_eq!(*buf.as_ptr().add(i), i as u64 * 10);
            }
        }
        buf.try_resize_to(3, 3).unwrap();
        assert_eq!(buf.capacity(), 3);
    }

    #[test]
    fn oversized_request_overflows() {
        let result: Result<RawBuf<u64, Global>, _> =
            RawBuf::try_with_capacity_in(usize::MAX, Global);
        assert!(matches!(result, Err(TryReserveError::CapacityOverflow)));
    }
}
