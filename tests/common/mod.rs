#![allow(dead_code)]

use std::alloc::Layout;
use std::cell::Cell;
use std::hash::BuildHasher;
use std::ptr::NonNull;

use dense_hash::TryReserveError;
use dense_hash::memory::GlobalResource;
use dense_hash::memory::MemoryResource;
use siphasher::sip::SipHasher;

/// Deterministic SipHash builder so test failures reproduce.
#[derive(Clone, Default)]
pub struct SipBuilder;

impl BuildHasher for SipBuilder {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210)
    }
}

/// Forwards to the global allocator and counts every call.
#[derive(Default)]
pub struct CountingResource {
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
}

impl CountingResource {
    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.get()
    }

    /// Blocks handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        self.allocations() - self.deallocations()
    }
}

impl MemoryResource for CountingResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError> {
        let ptr = GlobalResource.allocate(layout)?;
        self.allocations.set(self.allocations.get() + 1);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.set(self.deallocations.get() + 1);
        unsafe { GlobalResource.deallocate(ptr, layout) }
    }
}

/// A counting resource that refuses allocations once its budget runs out.
pub struct FailingResource {
    counts: CountingResource,
    budget: Cell<usize>,
}

impl FailingResource {
    pub fn with_budget(budget: usize) -> Self {
        Self {
            counts: CountingResource::default(),
            budget: Cell::new(budget),
        }
    }

    pub fn set_budget(&self, budget: usize) {
        self.budget.set(budget);
    }

    pub fn outstanding(&self) -> usize {
        self.counts.outstanding()
    }
}

impl MemoryResource for FailingResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError> {
        match self.budget.get() {
            0 => Err(TryReserveError::AllocError { layout }),
            n => {
                self.budget.set(n - 1);
                self.counts.allocate(layout)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.counts.deallocate(ptr, layout) }
    }
}
