//! Memory backends for the containers in this crate.
//!
//! Every allocating component (the bucket index table, the contiguous value
//! store, the segmented value store and its chunk table) is constructed with a
//! [`MemoryBackend`] handle and routes all of its allocations through it.
//!
//! Two kinds of backend are provided:
//!
//! - [`Global`], a zero-sized handle onto the global allocator. All `Global`
//!   handles are interchangeable.
//! - [`ResourceRef`], a borrowed handle onto a runtime [`MemoryResource`]. This
//!   selects the backend per container instance rather than per container
//!   type; the borrow guarantees that the resource outlives every container
//!   using it.

use core::alloc::Layout;
use core::fmt::Debug;
use core::ptr::NonNull;

use snafu::OptionExt;

use crate::error::AllocSnafu;
use crate::error::TryReserveError;

/// A handle through which a container obtains and releases memory.
///
/// Handles are cloned into each allocating component of a container. Two
/// handles that compare equal through [`is_equal`] must be able to release
/// each other's allocations; this is what allows a container to hand its
/// storage to another container in O(1).
///
/// [`is_equal`]: MemoryBackend::is_equal
///
/// # Safety
///
/// `allocate` must return memory valid for reads and writes of
/// `layout.size()` bytes at `layout.align()` alignment until it is passed to
/// `deallocate` on this handle or on any handle that `is_equal` reports equal
/// to it (including clones).
pub unsafe trait MemoryBackend: Clone {
    /// Every pair of handles of this type compares equal.
    const ALWAYS_EQUAL: bool = false;

    /// A move-assignment carries the source's handle to the destination, so
    /// storage can always be transferred without reallocation.
    const PROPAGATE_ON_MOVE: bool = false;

    /// Allocates a block for `layout`. `layout` always has a non-zero size.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError>;

    /// Releases a block previously returned by [`allocate`].
    ///
    /// [`allocate`]: MemoryBackend::allocate
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` with the same `layout` on
    /// this handle or one equal to it, and must not have been released yet.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether memory allocated through `other` may be released through
    /// `self`.
    fn is_equal(&self, other: &Self) -> bool;
}

/// Returns `true` when storage owned under `a` can be adopted by a container
/// using `b` without copying.
#[inline]
pub(crate) fn interchangeable<A: MemoryBackend>(a: &A, b: &A) -> bool {
    A::ALWAYS_EQUAL || A::PROPAGATE_ON_MOVE || a.is_equal(b)
}

/// The global allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

// SAFETY: Allocation and deallocation are forwarded to the global allocator,
// which accepts any pointer it produced regardless of the handle used.
unsafe impl MemoryBackend for Global {
    const ALWAYS_EQUAL: bool = true;
    const PROPAGATE_ON_MOVE: bool = true;

    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError> {
        debug_assert!(layout.size() != 0);
        // SAFETY: Callers never request zero-sized layouts.
        let raw = unsafe { alloc::alloc::alloc(layout) };
        NonNull::new(raw).context(AllocSnafu { layout })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
    }

    #[inline]
    fn is_equal(&self, _other: &Self) -> bool {
        true
    }
}

/// A runtime memory resource, selected per container instance through
/// [`ResourceRef`].
///
/// Implementations that wrap another resource (counting, logging, arena) are
/// ordinary decorators; the containers rely only on these three operations.
/// A resource shared between containers on different threads must be
/// internally synchronized.
pub trait MemoryResource {
    /// Allocates a block for `layout`. `layout` always has a non-zero size.
    ///
    /// Exhaustion is reported as [`TryReserveError::AllocError`].
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError>;

    /// Releases a block previously returned by [`allocate`].
    ///
    /// [`allocate`]: MemoryResource::allocate
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this resource (or one
    /// that `is_equal` accepts) with the same `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether blocks allocated by `other` may be released by `self`.
    ///
    /// Defaults to identity.
    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        core::ptr::addr_eq(self as *const Self, other as *const dyn MemoryResource)
    }
}

/// A [`MemoryResource`] backed by the global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalResource;

impl MemoryResource for GlobalResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError> {
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Forwarded contract.
        unsafe { Global.deallocate(ptr, layout) }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        core::ptr::addr_eq(self as *const Self, other as *const dyn MemoryResource)
    }
}

static GLOBAL_RESOURCE: GlobalResource = GlobalResource;

/// A borrowed handle onto a [`MemoryResource`].
///
/// Containers parameterized with `ResourceRef<'r>` cannot outlive the
/// resource. Handles never propagate on move: moving between containers bound
/// to resources that are not [`is_equal`] copies the elements into the
/// destination's resource.
///
/// [`is_equal`]: MemoryResource::is_equal
#[derive(Clone, Copy)]
pub struct ResourceRef<'r> {
    resource: &'r dyn MemoryResource,
}

impl<'r> ResourceRef<'r> {
    /// Creates a handle onto `resource`.
    pub fn new(resource: &'r dyn MemoryResource) -> Self {
        Self { resource }
    }

    /// Returns the resource this handle allocates from.
    pub fn resource(&self) -> &'r dyn MemoryResource {
        self.resource
    }
}

impl Default for ResourceRef<'_> {
    /// A handle onto the process-wide [`GlobalResource`].
    fn default() -> Self {
        Self::new(&GLOBAL_RESOURCE)
    }
}

impl Debug for ResourceRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("ResourceRef")
            .field(&(self.resource as *const dyn MemoryResource as *const ()))
            .finish()
    }
}

impl<'r, R> From<&'r R> for ResourceRef<'r>
where
    R: MemoryResource,
{
    fn from(resource: &'r R) -> Self {
        Self::new(resource)
    }
}

// SAFETY: Every operation is forwarded to the same resource, and the
// resource's own `is_equal` decides interchangeability.
unsafe impl MemoryBackend for ResourceRef<'_> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError> {
        self.resource.allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Forwarded contract.
        unsafe { self.resource.deallocate(ptr, layout) }
    }

    #[inline]
    fn is_equal(&self, other: &Self) -> bool {
        core::ptr::addr_eq(
            self.resource as *const dyn MemoryResource,
            other.resource as *const dyn MemoryResource,
        ) || self.resource.is_equal(other.resource)
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[derive(Default)]
    struct Tally {
        live: Cell<usize>,
        compared: Cell<usize>,
    }

    impl MemoryResource for Tally {
        fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError> {
            self.live.set(self.live.get() + 1);
            GlobalResource.allocate(layout)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.live.set(self.live.get() - 1);
            unsafe { GlobalResource.deallocate(ptr, layout) }
        }

        fn is_equal(&self, other: &dyn MemoryResource) -> bool {
            self.compared.set(self.compared.get() + 1);
            core::ptr::addr_eq(self as *const Self, other as *const dyn MemoryResource)
        }
    }

    #[test]
    fn global_handles_are_equal() {
        assert!(Global.is_equal(&Global));
        assert!(interchangeable(&Global, &Global));
    }

    #[test]
    fn resource_ref_identity_short_circuits() {
        let tally = Tally::default();
        let a = ResourceRef::new(&tally);
        let b = ResourceRef::from(&tally);
        assert!(a.is_equal(&b));
        assert_eq!(tally.compared.get(), 0);
    }

    #[test]
    fn resource_ref_distinct_resources_ask_the_resource() {
        let first = Tally::default();
        let second = Tally::default();
        let a = ResourceRef::new(&first);
        let b = ResourceRef::new(&second);
        assert!(!a.is_equal(&b));
        assert_eq!(first.compared.get(), 1);
        assert_eq!(second.compared.get(), 0);

        assert!(!interchangeable(&a, &b));
        assert_eq!(first.compared.get(), 2);
        assert_eq!(second.compared.get(), 0);
    }

    #[test]
    fn resource_ref_routes_allocations() {
        let tally = Tally::default();
        let handle = ResourceRef::new(&tally);
        let layout = Layout::from_size_align(32, 8).unwrap();
        let block = handle.allocate(layout).unwrap();
        assert_eq!(tally.live.get(), 1);
        unsafe { handle.deallocate(block, layout) };
        assert_eq!(tally.live.get(), 0);
    }

    #[test]
    fn default_resource_ref_uses_global_resource() {
        let a = ResourceRef::default();
        let b = ResourceRef::default();
        assert!(a.is_equal(&b));
    }
}
