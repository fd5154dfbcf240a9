use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::hash_table;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::memory::Global;
use crate::memory::MemoryBackend;
use crate::store::Contiguous;
use crate::store::ValueStore;

#[inline]
fn equivalent<Q, T>(value: &Q) -> impl Fn(&T) -> bool + '_
where
    T: Borrow<Q>,
    Q: ?Sized + Eq,
{
    move |stored| value == stored.borrow()
}

#[inline]
fn make_hasher<T, S>(hash_builder: &S) -> impl Fn(&T) -> u64 + '_
where
    T: Hash,
    S: BuildHasher,
{
    move |value| hash_builder.hash_one(value)
}

/// A dense hash set with insertion-ordered storage.
///
/// `HashSet<T, S>` stores values of type `T` where `T` implements `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash values. Values live in
/// a dense value store in insertion order, located through the robin-hood
/// index of [`HashTable`].
///
/// `A` selects the [`MemoryBackend`] and `St` the [`ValueStore`], as for
/// [`HashMap`](crate::HashMap).
///
/// # Performance Characteristics
///
/// - **Memory**: 8 bytes of index per bucket, plus the size of `T` per
///   element.
pub struct HashSet<T, S = DefaultHashBuilder, A = Global, St = Contiguous<T, A>>
where
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    table: HashTable<T, A, St>,
    hash_builder: S,
}

impl<T, S, A, St> Clone for HashSet<T, S, A, St>
where
    T: Clone,
    S: Clone,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }

    /// Copy-assignment: `self` keeps its own backend.
    fn clone_from(&mut self, source: &Self) {
        self.table.clone_from(&source.table);
        self.hash_builder.clone_from(&source.hash_builder);
    }
}

impl<T, S, A, St> PartialEq for HashSet<T, S, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, A, St> Eq for HashSet<T, S, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
}

impl<T, S, A, St> Debug for HashSet<T, S, A, St>
where
    T: Debug,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S, A, St> HashSet<T, S, A, St>
where
    S: Default,
    A: MemoryBackend + Default,
    St: ValueStore<T, Backend = A>,
{
    /// Creates an empty set using the default hasher builder and backend.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher_in(S::default(), A::default())
    }

    /// Creates a set able to hold at least `capacity` values without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher_in(capacity, S::default(), A::default())
    }
}

impl<T, S, A, St> HashSet<T, S, A, St>
where
    A: MemoryBackend + Default,
    St: ValueStore<T, Backend = A>,
{
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use dense_hash::HashSet;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut set: HashSet<i32, SimpleHasher> = HashSet::with_hasher(SimpleHasher);
    /// assert!(set.insert(1));
    /// assert!(!set.insert(1));
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_in(hash_builder, A::default())
    }

    /// Creates a set with the given capacity and hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_and_hasher_in(capacity, hash_builder, A::default())
    }
}

impl<T, S, A, St> HashSet<T, S, A, St>
where
    S: Default,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    /// Creates an empty set allocating from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self::with_hasher_in(S::default(), alloc)
    }

    /// Creates a set with the given capacity, allocating from `alloc`.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::with_capacity_and_hasher_in(capacity, S::default(), alloc)
    }
}

impl<T, S, A, St> HashSet<T, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    /// Creates an empty set with the given hasher builder, allocating from
    /// `alloc`.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::new_in(alloc),
            hash_builder,
        }
    }

    /// Creates a set with the given capacity and hasher builder, allocating
    /// from `alloc`.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::with_capacity_in(capacity, alloc),
            hash_builder,
        }
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of values the set can hold before it must grow.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Number of buckets in the index table.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Largest bucket count the index table can address.
    pub fn max_bucket_count(&self) -> usize {
        HashTable::<T, A, St>::max_bucket_count()
    }

    /// `len / bucket_count`, or zero before the first allocation.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// The fraction of buckets that may be filled before the set grows.
    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor()
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// The backend this set allocates from.
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Clears the set, removing all values. Keeps the index allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns the value at position `index` in iteration order.
    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.table.get_index(index)
    }

    /// Returns an iterator over the values in iteration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(3);
    /// set.insert(1);
    /// set.insert(2);
    ///
    /// let values: Vec<_> = set.iter().copied().collect();
    /// assert_eq!(values, [3, 1, 2]);
    /// # }
    /// ```
    pub fn iter(&self) -> Iter<'_, T, St> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all values as an iterator.
    pub fn drain(&mut self) -> Drain<'_, T, St> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Exchanges the contents, hasher builders, and backends of two sets.
    pub fn swap(&mut self, other: &mut Self) {
        self.table.swap(&mut other.table);
        core::mem::swap(&mut self.hash_builder, &mut other.hash_builder);
    }

    /// Move-assignment: transfers every value of `source` into `self`,
    /// leaving `source` empty but usable.
    pub fn move_from(&mut self, source: &mut Self) {
        self.table.move_from(&mut source.table);
        core::mem::swap(&mut self.hash_builder, &mut source.hash_builder);
    }

    /// Fallible form of [`move_from`](Self::move_from).
    pub fn try_move_from(&mut self, source: &mut Self) -> Result<(), TryReserveError> {
        self.table.try_move_from(&mut source.table)?;
        core::mem::swap(&mut self.hash_builder, &mut source.hash_builder);
        Ok(())
    }

    /// Copies the set into new storage allocated from `alloc`.
    pub fn clone_in(&self, alloc: A) -> Self
    where
        T: Clone,
        S: Clone,
    {
        self.try_clone_in(alloc)
            .unwrap_or_else(|e| crate::error::handle_error(e))
    }

    /// Fallible form of [`clone_in`](Self::clone_in).
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, TryReserveError>
    where
        T: Clone,
        S: Clone,
    {
        Ok(Self {
            table: self.table.try_clone_in(alloc)?,
            hash_builder: self.hash_builder.clone(),
        })
    }

    /// Fallible copy-assignment. `self` keeps its backend.
    pub fn try_clone_from(&mut self, source: &Self) -> Result<(), TryReserveError>
    where
        T: Clone,
        S: Clone,
    {
        self.table.try_clone_from(&source.table)?;
        self.hash_builder.clone_from(&source.hash_builder);
        Ok(())
    }

    /// Utilization statistics of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }
}

impl<T, S, A> HashSet<T, S, A, Contiguous<T, A>>
where
    A: MemoryBackend,
{
    /// The values in iteration order, as a slice.
    pub fn as_slice(&self) -> &[T] {
        self.table.as_slice()
    }
}

impl<T, S, A, St> HashSet<T, S, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    /// Reserves capacity for at least `additional` more values.
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, make_hasher::<T, S>(&self.hash_builder));
    }

    /// Fallible form of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table
            .try_reserve(additional, make_hasher::<T, S>(&self.hash_builder))
    }

    /// Rebuilds the index with at least `bucket_count` buckets.
    pub fn rehash(&mut self, bucket_count: usize) {
        self.table
            .rehash(bucket_count, make_hasher::<T, S>(&self.hash_builder));
    }

    /// Shrinks the capacity of the set as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table
            .shrink_to_fit(make_hasher::<T, S>(&self.hash_builder));
    }

    /// Sets the maximum load factor, clamped to `[0.05, 0.99]`.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) {
        self.table
            .set_max_load_factor(max_load_factor, make_hasher::<T, S>(&self.hash_builder));
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An equal value already
    /// in the set is kept and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert!(set.insert(2));
    /// assert!(!set.insert(2));
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        self.try_insert(value)
            .unwrap_or_else(|e| crate::error::handle_error(e))
    }

    /// Fallible form of [`insert`](Self::insert). On error the set is
    /// unchanged.
    pub fn try_insert(&mut self, value: T) -> Result<bool, TryReserveError> {
        let hash = self.hash_builder.hash_one(&value);
        let entry = self.table.try_entry(
            hash,
            equivalent(&value),
            make_hasher::<T, S>(&self.hash_builder),
        )?;
        Ok(match entry {
            TableEntry::Occupied(_) => false,
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        })
    }

    /// Adds a value to the set, replacing the existing equal value, if any.
    /// Returns the replaced value.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = self.hash_builder.hash_one(&value);
        match self.table.entry(
            hash,
            equivalent(&value),
            make_hasher::<T, S>(&self.hash_builder),
        ) {
            TableEntry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns `true` if the set contains a value.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(value).is_some()
    }

    /// Returns a reference to the stored value equal to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(value);
        self.table.find(hash, equivalent(value))
    }

    /// Returns the position of `value` in iteration order.
    pub fn get_index_of<Q>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(value);
        self.table.find_index(hash, equivalent(value))
    }

    /// Returns the stored values equal to `value`: at most one.
    pub fn equal_range<Q>(&self, value: &Q) -> EqualRange<'_, T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        EqualRange {
            inner: self.get(value).into_iter(),
        }
    }

    /// Removes a value from the set. Returns whether it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(2);
    /// assert!(set.remove(&2));
    /// assert!(!set.remove(&2));
    /// # }
    /// ```
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.take(value).is_some()
    }

    /// Removes and returns the stored value equal to `value`.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(value);
        self.table.remove(
            hash,
            equivalent(value),
            make_hasher::<T, S>(&self.hash_builder),
        )
    }

    /// Removes the value at position `index` in iteration order, moving the
    /// last value into its place.
    pub fn swap_remove_index(&mut self, index: usize) -> Option<T> {
        self.table
            .swap_remove_index(index, make_hasher::<T, S>(&self.hash_builder))
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=4).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// # }
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table
            .retain(|v| f(v), make_hasher::<T, S>(&self.hash_builder));
    }

    /// Returns `true` if `self` has no elements in common with `other`.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if `other` contains at least all the elements in
    /// `self`.
    pub fn is_subset(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if `self` contains at least all the elements in
    /// `other`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Visits the values of `self`, then the values of `other` not in
    /// `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let union: Vec<_> = a.union(&b).copied().collect();
    /// assert_eq!(union, [1, 2, 3]);
    /// # }
    /// ```
    pub fn union<'a>(&'a self, other: &'a Self) -> Union<'a, T, S, A, St> {
        Union {
            iter: self.iter(),
            rest: other.difference(self),
        }
    }

    /// Visits the values in both `self` and `other`.
    pub fn intersection<'a>(&'a self, other: &'a Self) -> Intersection<'a, T, S, A, St> {
        let (iter, other) = if self.len() <= other.len() {
            (self.iter(), other)
        } else {
            (other.iter(), self)
        };
        Intersection { iter, other }
    }

    /// Visits the values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a Self) -> Difference<'a, T, S, A, St> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Visits the values in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a Self,
    ) -> SymmetricDifference<'a, T, S, A, St> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }
}

impl<T, S, A, St> Default for HashSet<T, S, A, St>
where
    S: Default,
    A: MemoryBackend + Default,
    St: ValueStore<T, Backend = A>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, A, St> IntoIterator for HashSet<T, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    type Item = T;
    type IntoIter = IntoIter<T, St>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S, A, St> IntoIterator for &'a HashSet<T, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T, St>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S, A, St> FromIterator<T> for HashSet<T, S, A, St>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
    A: MemoryBackend + Default,
    St: ValueStore<T, Backend = A>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T, S, A, St> Extend<T> for HashSet<T, S, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S, A, St> Extend<&'a T> for HashSet<T, S, A, St>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A>,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T, St>
where
    St: ValueStore<T> + 'a,
    T: 'a,
{
    inner: hash_table::Iter<'a, T, St>,
}

impl<'a, T, St> Iterator for Iter<'a, T, St>
where
    St: ValueStore<T> + 'a,
    T: 'a,
{
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T, St> ExactSizeIterator for Iter<'a, T, St>
where
    St: ValueStore<T> + 'a,
    T: 'a,
{
}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T, St>
where
    St: ValueStore<T>,
{
    inner: hash_table::Drain<'a, T, St>,
}

impl<T, St> Iterator for Drain<'_, T, St>
where
    St: ValueStore<T>,
{
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An owning iterator over the values of a `HashSet`.
pub struct IntoIter<T, St>
where
    St: ValueStore<T>,
{
    inner: hash_table::IntoIter<T, St>,
}

impl<T, St> Iterator for IntoIter<T, St>
where
    St: ValueStore<T>,
{
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// The stored values equal to a probe; see [`HashSet::equal_range`].
pub struct EqualRange<'a, T> {
    inner: core::option::IntoIter<&'a T>,
}

impl<'a, T> Iterator for EqualRange<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for EqualRange<'_, T> {}

impl<T> FusedIterator for EqualRange<'_, T> {}

/// An iterator over the union of two sets.
pub struct Union<'a, T, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<T, Backend = A> + 'a,
    T: 'a,
{
    iter: Iter<'a, T, St>,
    rest: Difference<'a, T, S, A, St>,
}

impl<'a, T, S, A, St> Iterator for Union<'a, T, S, A, St>
where
    T: Hash + Eq + 'a,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A> + 'a,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().or_else(|| self.rest.next())
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, T, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<T, Backend = A> + 'a,
    T: 'a,
{
    iter: Iter<'a, T, St>,
    other: &'a HashSet<T, S, A, St>,
}

impl<'a, T, S, A, St> Iterator for Intersection<'a, T, S, A, St>
where
    T: Hash + Eq + 'a,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A> + 'a,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, T, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<T, Backend = A> + 'a,
    T: 'a,
{
    iter: Iter<'a, T, St>,
    other: &'a HashSet<T, S, A, St>,
}

impl<'a, T, S, A, St> Iterator for Difference<'a, T, S, A, St>
where
    T: Hash + Eq + 'a,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A> + 'a,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<T, Backend = A> + 'a,
    T: 'a,
{
    iter: core::iter::Chain<Difference<'a, T, S, A, St>, Difference<'a, T, S, A, St>>,
}

impl<'a, T, S, A, St> Iterator for SymmetricDifference<'a, T, S, A, St>
where
    T: Hash + Eq + 'a,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<T, Backend = A> + 'a,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::store::Segmented;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type Set<T> = HashSet<T, SipHashBuilder>;

    fn set_of(values: &[i32]) -> Set<i32> {
        values.iter().copied().collect()
    }

    fn sorted<'a>(iter: impl Iterator<Item = &'a i32>) -> Vec<i32> {
        let mut out: Vec<i32> = iter.copied().collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn test_new_and_with_hasher() {
        let set: Set<i32> = HashSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(set.bucket_count(), 0);

        let set: Set<i32> = HashSet::with_hasher(SipHashBuilder::default());
        assert!(set.is_empty());
    }

    #[test]
    fn test_with_capacity() {
        let set: Set<i32> = HashSet::with_capacity(100);
        assert!(set.capacity() >= 100);
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set: Set<i32> = HashSet::new();
        assert!(set.insert(1));
        assert!(set.insert(2));
        assert!(!set.insert(1));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&1));
        assert!(set.contains(&2));
        assert!(!set.contains(&3));
    }

    #[test]
    fn test_remove() {
        let mut set = set_of(&[1, 2, 3]);
        assert!(set.remove(&2));
        assert!(!set.remove(&2));
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&2));
        assert_eq!(set.as_slice(), &[1, 3]);
    }

    #[test]
    fn test_take_and_replace() {
        let mut set: Set<String> = HashSet::new();
        set.insert("a".to_string());
        assert_eq!(set.replace("a".to_string()), Some("a".to_string()));
        assert_eq!(set.replace("b".to_string()), None);
        assert_eq!(set.take("a"), Some("a".to_string()));
        assert_eq!(set.take("a"), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_get_and_positions() {
        let mut set: Set<String> = HashSet::new();
        for word in ["x", "y", "z"] {
            set.insert(word.to_string());
        }
        assert_eq!(set.get("y").map(String::as_str), Some("y"));
        assert_eq!(set.get_index_of("z"), Some(2));
        assert_eq!(set.get_index(0).map(String::as_str), Some("x"));
        assert_eq!(set.equal_range("x").len(), 1);
        assert_eq!(set.equal_range("w").len(), 0);

        assert_eq!(set.swap_remove_index(0).as_deref(), Some("x"));
        assert_eq!(set.get_index_of("z"), Some(0));
    }

    #[test]
    fn test_clear() {
        let mut set = set_of(&[1, 2, 3]);
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(&1));
        assert!(set.insert(1));
    }

    #[test]
    fn test_reserve_and_rehash() {
        let mut set: Set<i32> = HashSet::new();
        set.reserve(100);
        assert!(set.capacity() >= 100);
        set.rehash(1024);
        assert_eq!(set.bucket_count(), 1024);
        set.extend(0..10);
        set.shrink_to_fit();
        assert!(set.bucket_count() < 1024);
        set.set_max_load_factor(0.5);
        assert!(set.load_factor() <= 0.5);
        assert_eq!(sorted(set.iter()), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_iter_and_into_iter() {
        let set = set_of(&[5, 1, 4]);
        assert_eq!(set.iter().len(), 3);
        assert_eq!((&set).into_iter().copied().collect::<Vec<_>>(), [5, 1, 4]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), [5, 1, 4]);
    }

    #[test]
    fn test_drain() {
        let mut set = set_of(&[1, 2, 3]);
        let drained: Vec<i32> = set.drain().collect();
        assert_eq!(drained, [1, 2, 3]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_multiple_insertions() {
        let mut set: Set<u32> = HashSet::new();
        for i in 0..5000 {
            assert!(set.insert(i));
        }
        for i in 0..5000 {
            assert!(!set.insert(i));
        }
        assert_eq!(set.len(), 5000);
        for i in (0..5000).step_by(2) {
            assert!(set.remove(&i));
        }
        assert_eq!(set.len(), 2500);
        for i in 0..5000 {
            assert_eq!(set.contains(&i), i % 2 == 1);
        }
    }

    #[test]
    fn test_retain() {
        let mut set = set_of(&[1, 2, 3, 4, 5, 6]);
        set.retain(|&x| x % 3 == 0);
        assert_eq!(sorted(set.iter()), [3, 6]);
    }

    #[test]
    fn test_clone_move_swap() {
        let mut a = set_of(&[1, 2, 3]);
        let copy = a.clone();
        assert_eq!(copy, a);

        let mut b: Set<i32> = HashSet::new();
        b.move_from(&mut a);
        assert!(a.is_empty());
        assert_eq!(b, copy);

        a.insert(9);
        a.swap(&mut b);
        assert_eq!(a, copy);
        assert_eq!(sorted(b.iter()), [9]);

        let mut assigned = set_of(&[7]);
        assigned.clone_from(&copy);
        assert_eq!(assigned, copy);
        assert_eq!(copy.clone_in(Global), copy);
    }

    #[test]
    fn test_is_disjoint() {
        let a = set_of(&[1, 2]);
        let b = set_of(&[3, 4]);
        let c = set_of(&[2, 3]);
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&c));
        assert!(set_of(&[]).is_disjoint(&a));
    }

    #[test]
    fn test_is_subset_and_superset() {
        let a = set_of(&[1, 2]);
        let b = set_of(&[1, 2, 3]);
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(b.is_superset(&a));
        assert!(a.is_subset(&a));
    }

    #[test]
    fn test_set_algebra() {
        let a = set_of(&[1, 2, 3]);
        let b: Set<i32> = {
            let mut b = HashSet::with_hasher(a.hasher().clone());
            b.extend([2, 3, 4]);
            b
        };

        assert_eq!(a.union(&b).copied().collect::<Vec<_>>(), [1, 2, 3, 4]);
        assert_eq!(sorted(a.intersection(&b)), [2, 3]);
        assert_eq!(sorted(a.difference(&b)), [1]);
        assert_eq!(sorted(b.difference(&a)), [4]);
        assert_eq!(sorted(a.symmetric_difference(&b)), [1, 4]);
    }

    #[test]
    fn test_segmented_set() {
        let mut set: HashSet<u64, SipHashBuilder, Global, Segmented<u64>> = HashSet::new();
        set.extend(0..3000u64);
        assert_eq!(set.len(), 3000);
        assert!(set.contains(&2999));
        set.retain(|v| v % 2 == 0);
        assert_eq!(set.len(), 1500);
    }

    #[test]
    fn test_debug_and_default() {
        let set: Set<i32> = Default::default();
        assert_eq!(alloc::format!("{set:?}"), "{}");
        let set = set_of(&[1]);
        assert_eq!(alloc::format!("{set:?}"), "{1}");
    }

    #[test]
    fn test_string_values() {
        let mut set: Set<String> = HashSet::new();
        let words = vec!["hello", "world", "rust"];
        for w in &words {
            set.insert(w.to_string());
        }
        for w in &words {
            assert!(set.contains(*w));
        }
        assert!(!set.contains("missing"));
    }
}
