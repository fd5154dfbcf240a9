//! Dense value stores.
//!
//! A value store keeps every element of a container in insertion order at
//! indices `0..len`, with no holes. The index table refers to elements only by
//! their position here. Two layouts are provided:
//!
//! - [`Contiguous`] keeps all elements in one growable buffer. Growth may
//!   relocate every element.
//! - [`Segmented`] keeps elements in fixed-size chunks. Growth appends chunks,
//!   so existing elements never move when the store grows. Removing an element
//!   still moves the last element into the vacated position.

use crate::error::TryReserveError;
use crate::error::handle_error;
use crate::memory::MemoryBackend;

pub mod contiguous;
pub mod segmented;

pub use contiguous::Contiguous;
pub use segmented::Segmented;

/// Index-addressed storage for the values of a dense container.
///
/// Implementations are responsible for dropping the elements they hold and
/// for routing every allocation through [`ValueStore::Backend`].
pub trait ValueStore<T>: Sized {
    /// The memory backend this store allocates from.
    type Backend: MemoryBackend;

    /// Borrowing iterator in index order.
    type Iter<'a>: Iterator<Item = &'a T> + ExactSizeIterator
    where
        Self: 'a,
        T: 'a;

    /// Mutably borrowing iterator in index order.
    type IterMut<'a>: Iterator<Item = &'a mut T> + ExactSizeIterator
    where
        Self: 'a,
        T: 'a;

    /// Owning iterator in index order.
    type IntoIter: Iterator<Item = T> + ExactSizeIterator;

    /// Creates an empty store that allocates nothing until the first insert.
    fn new_in(alloc: Self::Backend) -> Self;

    /// The backend this store allocates from.
    fn allocator(&self) -> &Self::Backend;

    /// Number of stored elements.
    fn len(&self) -> usize;

    /// Number of elements the store can hold without allocating.
    fn capacity(&self) -> usize;

    /// Ensures room for `additional` more elements. On error the store is
    /// unchanged.
    fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError>;

    /// Appends `value` at index `len()` and returns a reference to it.
    ///
    /// Grows if needed, treating allocation failure as fatal. Callers that
    /// need failure atomicity reserve first.
    fn push(&mut self, value: T) -> &mut T {
        if self.len() == self.capacity() {
            if let Err(e) = self.try_reserve(1) {
                handle_error(e);
            }
        }
        // SAFETY: Capacity for one more element was ensured above.
        unsafe { self.push_within_capacity(value) }
    }

    /// Appends `value` without checking capacity.
    ///
    /// # Safety
    ///
    /// `len() < capacity()` must hold.
    unsafe fn push_within_capacity(&mut self, value: T) -> &mut T;

    /// Returns the element at `index`.
    fn get(&self, index: usize) -> Option<&T> {
        if index < self.len() {
            // SAFETY: Bounds checked above.
            Some(unsafe { self.get_unchecked(index) })
        } else {
            None
        }
    }

    /// Returns the element at `index` mutably.
    fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len() {
            // SAFETY: Bounds checked above.
            Some(unsafe { self.get_unchecked_mut(index) })
        } else {
            None
        }
    }

    /// # Safety
    ///
    /// `index < len()` must hold.
    unsafe fn get_unchecked(&self, index: usize) -> &T;

    /// # Safety
    ///
    /// `index < len()` must hold.
    unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T;

    /// Removes the element at `index`, moving the last element into its
    /// place.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    fn swap_remove(&mut self, index: usize) -> T;

    /// Removes and returns the last element.
    fn pop(&mut self) -> Option<T>;

    /// Drops every element, keeping the allocation.
    fn clear(&mut self);

    /// Releases storage beyond what the current elements need.
    fn try_shrink_to_fit(&mut self) -> Result<(), TryReserveError>;

    /// Iterates elements in index order.
    fn iter(&self) -> Self::Iter<'_>;

    /// Iterates elements mutably in index order.
    fn iter_mut(&mut self) -> Self::IterMut<'_>;

    /// Consumes the store, yielding elements in index order.
    fn into_values(self) -> Self::IntoIter;

    /// Copies every element, in order, into a new store bound to `alloc`.
    fn try_clone_in(&self, alloc: Self::Backend) -> Result<Self, TryReserveError>
    where
        T: Clone,
    {
        let mut out = Self::new_in(alloc);
        out.try_reserve(self.len())?;
        for value in self.iter() {
            // SAFETY: Reserved `self.len()` slots above.
            unsafe {
                out.push_within_capacity(value.clone());
            }
        }
        Ok(out)
    }
}
