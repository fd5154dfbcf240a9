use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use snafu::OptionExt;
use snafu::ensure;

use crate::error::CapacityOverflowSnafu;
use crate::error::TryReserveError;
use crate::error::handle_error;
use crate::hash_policy::DEFAULT_MAX_LOAD_FACTOR;
use crate::hash_policy::MAX_BUCKET_COUNT;
use crate::hash_policy::MIN_BUCKET_COUNT;
use crate::hash_policy::bucket_count_for;
use crate::index::IndexTable;
use crate::index::Probe;
use crate::memory::Global;
use crate::memory::MemoryBackend;
use crate::memory::interchangeable;
use crate::store::Contiguous;
use crate::store::ValueStore;

/// Debug statistics for hash table analysis.
///
/// Available under `cfg(test)` or with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Maximum number of elements before the next growth
    pub capacity: usize,
    /// Number of buckets in the index table
    pub bucket_count: usize,
    /// Largest distance of any element from its home bucket
    pub max_displacement: usize,
    /// Mean distance of elements from their home buckets
    pub mean_displacement: f64,
    /// Load factor (populated / bucket_count)
    pub load_factor: f64,
    /// Bytes allocated for index slots
    pub index_bytes: usize,
    /// Bytes allocated for the value store
    pub value_bytes: usize,
    /// Bytes of the value store not holding live elements
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({} buckets, {:.2}% load factor)",
            self.populated,
            self.capacity,
            self.bucket_count,
            self.load_factor * 100.0
        );
        println!(
            "Displacement: max {} mean {:.3}",
            self.max_displacement, self.mean_displacement
        );
        println!(
            "Total Allocated: {} bytes ({} index, {} values)",
            self.index_bytes + self.value_bytes,
            self.index_bytes,
            self.value_bytes
        );
        println!(
            "Memory: {} bytes of value storage unused ({:.02}%)",
            self.wasted_bytes,
            if self.value_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.value_bytes as f64) * 100.0
            }
        );
    }
}

/// A dense hash table using robin-hood probing over an insertion-ordered
/// value store.
///
/// `HashTable<V>` stores values of type `V` contiguously in insertion order
/// and keeps a separate power-of-two index table of 8-byte slots that maps
/// hashes to positions in that store. Like `hashbrown`'s raw table, it never
/// hashes values itself: every operation takes the hash of the sought value
/// and an equality predicate, and operations that may move elements between
/// buckets also take a `hasher` closure used to recompute hashes of stored
/// values.
///
/// ## Layout
///
/// - Iteration walks the value store, so it is as fast as iterating a slice
///   and yields elements in insertion order. Removing an element moves the
///   last element into its position.
/// - Growth rebuilds the index table only; stored values are never rehashed
///   into new positions. With the [`Segmented`](crate::store::Segmented)
///   store they never move at all.
/// - Removal uses backward-shift deletion, so lookups never wade through
///   tombstones.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use dense_hash::hash_table::Entry;
/// # use dense_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table: HashTable<Person> = HashTable::with_capacity(100);
/// let rehash = |p: &Person| hash_id(p.id);
///
/// match table.entry(hash_id(123), |p| p.id == 123, rehash) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(table.find(hash_id(123), |p| p.id == 123).unwrap().name, "Alice");
/// ```
pub struct HashTable<V, A = Global, St = Contiguous<V, A>>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    index: IndexTable<A>,
    values: St,
    _marker: PhantomData<V>,
}

impl<V, A, St> Debug for HashTable<V, A, St>
where
    V: Debug,
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("values", &DebugValues(&self.values, PhantomData::<V>))
            .field("index", &self.index)
            .finish()
    }
}

struct DebugValues<'a, V, St>(&'a St, PhantomData<V>);

impl<V: Debug, St: ValueStore<V>> Debug for DebugValues<'_, V, St> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<V, A, St> Clone for HashTable<V, A, St>
where
    V: Clone,
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    /// Copies the table into a new allocation from the same backend.
    fn clone(&self) -> Self {
        self.try_clone_in(self.allocator().clone())
            .unwrap_or_else(|e| handle_error(e))
    }

    /// Copy-assignment: `self` keeps its own backend and receives a deep
    /// copy of `source` allocated from it.
    fn clone_from(&mut self, source: &Self) {
        if let Err(e) = self.try_clone_from(source) {
            handle_error(e);
        }
    }
}

impl<V, A, St> Default for HashTable<V, A, St>
where
    A: MemoryBackend + Default,
    St: ValueStore<V, Backend = A>,
{
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<V, A, St> HashTable<V, A, St>
where
    A: MemoryBackend + Default,
    St: ValueStore<V, Backend = A>,
{
    /// Creates an empty table. Nothing is allocated until the first insert.
    pub fn new() -> Self {
        Self::new_in(A::default())
    }

    /// Creates a table able to hold at least `capacity` elements without
    /// growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dense_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert!(table.bucket_count().is_power_of_two());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, A::default())
    }
}

impl<V, A, St> HashTable<V, A, St>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    /// Creates an empty table that will allocate from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self {
            index: IndexTable::new_in(alloc.clone(), DEFAULT_MAX_LOAD_FACTOR),
            values: St::new_in(alloc),
            _marker: PhantomData,
        }
    }

    /// Creates a table able to hold at least `capacity` elements, allocating
    /// from `alloc`.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::try_with_capacity_in(capacity, alloc).unwrap_or_else(|e| handle_error(e))
    }

    /// Fallible form of [`with_capacity_in`](Self::with_capacity_in).
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        let bucket_count = bucket_count_for(capacity, DEFAULT_MAX_LOAD_FACTOR)?;
        let index =
            IndexTable::try_with_buckets_in(bucket_count, alloc.clone(), DEFAULT_MAX_LOAD_FACTOR)?;
        let mut values = St::new_in(alloc);
        values.try_reserve(capacity)?;
        Ok(Self {
            index,
            values,
            _marker: PhantomData,
        })
    }

    /// The backend this table allocates from.
    pub fn allocator(&self) -> &A {
        self.values.allocator()
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    /// Returns the number of elements in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dense_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// assert_eq!(table.len(), 0);
    ///
    /// table.entry(1, |&n| n == 1, |&n| n).or_insert(1);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Number of elements the table can hold before its index must grow.
    pub fn capacity(&self) -> usize {
        self.index.max_filled()
    }

    /// Number of buckets in the index table: zero or a power of two.
    pub fn bucket_count(&self) -> usize {
        self.index.bucket_count()
    }

    /// Largest bucket count the index table can address.
    pub fn max_bucket_count() -> usize {
        MAX_BUCKET_COUNT / 2
    }

    /// `len / bucket_count`, or zero for an unallocated table.
    pub fn load_factor(&self) -> f32 {
        if self.index.bucket_count() == 0 {
            0.0
        } else {
            self.len() as f32 / self.index.bucket_count() as f32
        }
    }

    /// The fraction of buckets that may be filled before the table grows.
    pub fn max_load_factor(&self) -> f32 {
        self.index.max_load_factor()
    }

    /// Sets the maximum load factor, clamped to `[0.05, 0.99]`.
    ///
    /// If the table now holds more elements than the new factor allows, the
    /// index grows immediately.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32, hasher: impl Fn(&V) -> u64) {
        let limit = self.index.set_max_load_factor(max_load_factor);
        if self.len() > limit {
            let result = bucket_count_for(self.len(), self.index.max_load_factor())
                .and_then(|count| self.rebuild(count, &hasher));
            if let Err(e) = result {
                handle_error(e);
            }
        }
    }

    /// Finds a value by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dense_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<(u64, char)> = HashTable::new();
    /// let rehash = |v: &(u64, char)| v.0;
    /// table.entry(7, |v| v.0 == 7, rehash).or_insert((7, 'x'));
    ///
    /// assert_eq!(table.find(7, |v| v.0 == 7), Some(&(7, 'x')));
    /// assert_eq!(table.find(8, |v| v.0 == 8), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: The index table only refers to live positions.
        Some(unsafe { self.values.get_unchecked(index) })
    }

    /// Finds a value by hash and equality predicate, mutably.
    ///
    /// The value must not be modified in a way that changes its hash or
    /// equality.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: The index table only refers to live positions.
        Some(unsafe { self.values.get_unchecked_mut(index) })
    }

    /// Finds the position of a value in iteration order.
    #[inline]
    pub fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        self.find_slot(hash, eq).map(|(_, value_index)| value_index)
    }

    /// Returns the value at position `index` in iteration order.
    pub fn get_index(&self, index: usize) -> Option<&V> {
        self.values.get(index)
    }

    /// Returns the value at position `index` in iteration order, mutably.
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut V> {
        self.values.get_mut(index)
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// If the value is absent and the table is full, the index grows first
    /// so that inserting through the returned [`VacantEntry`] never
    /// allocates. Finding an existing value never allocates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use dense_hash::hash_table::Entry;
    /// # use dense_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<String> = HashTable::new();
    /// let rehash = |s: &String| hash_str(s);
    ///
    /// match table.entry(hash_str("hello"), |s| s == "hello", rehash) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// assert!(matches!(
    ///     table.entry(hash_str("hello"), |s| s == "hello", rehash),
    ///     Entry::Occupied(_)
    /// ));
    /// ```
    #[inline]
    pub fn entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Entry<'_, V, A, St> {
        self.try_entry(hash, eq, hasher).unwrap_or_else(|e| handle_error(e))
    }

    /// Fallible form of [`entry`](Self::entry).
    ///
    /// On error the table is unchanged.
    pub fn try_entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<Entry<'_, V, A, St>, TryReserveError> {
        let probe = if self.len() < self.index.max_filled() {
            self.probe(hash, &eq)
        } else if let Some((pos, value_index)) = self.find_slot(hash, &eq) {
            Probe::Found { pos, value_index }
        } else {
            self.try_reserve(1, &hasher)?;
            self.probe(hash, &eq)
        };

        match probe {
            Probe::Found { pos, value_index } => Ok(Entry::Occupied(OccupiedEntry {
                table: self,
                pos,
                value_index,
            })),
            Probe::Vacant { pos, dist_fp } => {
                self.values.try_reserve(1)?;
                Ok(Entry::Vacant(VacantEntry {
                    table: self,
                    pos,
                    dist_fp,
                }))
            }
        }
    }

    /// Probes an index that has room for one more slot.
    #[inline]
    fn probe(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Probe {
        debug_assert!(self.len() < self.index.max_filled());
        let values = &self.values;
        // SAFETY: The index table only refers to live positions.
        self.index.probe(hash, |i| eq(unsafe { values.get_unchecked(i) }))
    }

    #[inline]
    fn find_slot(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<(usize, usize)> {
        let values = &self.values;
        // SAFETY: The index table only refers to live positions.
        self.index.find(hash, |i| eq(unsafe { values.get_unchecked(i) }))
    }

    /// Removes and returns a value from the table.
    ///
    /// If the removed value was not the last one, the last value moves into
    /// its position in iteration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dense_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// for n in 0..4 {
    ///     table.entry(n, |&v| v == n, |&v| v).or_insert(n);
    /// }
    ///
    /// assert_eq!(table.remove(1, |&v| v == 1, |&v| v), Some(1));
    /// assert_eq!(table.remove(1, |&v| v == 1, |&v| v), None);
    /// assert_eq!(table.iter().copied().collect::<Vec<_>>(), [0, 3, 2]);
    /// ```
    pub fn remove(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Option<V> {
        let (pos, value_index) = self.find_slot(hash, eq)?;
        Some(self.remove_slot(pos, value_index, hasher))
    }

    /// Removes the value at position `index` in iteration order, moving the
    /// last value into its place.
    pub fn swap_remove_index(&mut self, index: usize, hasher: impl Fn(&V) -> u64) -> Option<V> {
        let value = self.values.get(index)?;
        let hash = hasher(value);
        let (pos, _) = self.index.find(hash, |i| i == index)?;
        Some(self.remove_slot(pos, index, hasher))
    }

    fn remove_slot(&mut self, pos: usize, value_index: usize, hasher: impl Fn(&V) -> u64) -> V {
        let last = self.values.len() - 1;
        let last_hash = if value_index != last {
            // SAFETY: `last < len`.
            Some(hasher(unsafe { self.values.get_unchecked(last) }))
        } else {
            None
        };

        self.index.remove_at(pos);
        if let Some(hash) = last_hash {
            self.index.relink(hash, last, value_index);
        }
        self.values.swap_remove(value_index)
    }

    /// Keeps only the values for which `f` returns `true`.
    ///
    /// Values are visited from last to first, so each value is visited
    /// exactly once even though removals relocate the last value.
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool, hasher: impl Fn(&V) -> u64) {
        for i in (0..self.len()).rev() {
            // SAFETY: `i < len`, and removals only shrink the store from
            // positions at or after `i`.
            let keep = f(unsafe { self.values.get_unchecked_mut(i) });
            if !keep {
                self.swap_remove_index(i, &hasher);
            }
        }
    }

    /// Removes all elements from the table, keeping the index allocation.
    pub fn clear(&mut self) {
        self.values.clear();
        self.index.clear();
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dense_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(50, |&v| v);
    /// assert!(table.capacity() >= 50);
    /// ```
    pub fn reserve(&mut self, additional: usize, hasher: impl Fn(&V) -> u64) {
        if let Err(e) = self.try_reserve(additional, hasher) {
            handle_error(e);
        }
    }

    /// Fallible form of [`reserve`](Self::reserve). On error the table's
    /// contents are unchanged.
    pub fn try_reserve(
        &mut self,
        additional: usize,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<(), TryReserveError> {
        let required = self
            .len()
            .checked_add(additional)
            .context(CapacityOverflowSnafu)?;
        if required <= self.index.max_filled() {
            return self.values.try_reserve(additional);
        }

        let bucket_count = bucket_count_for(required, self.index.max_load_factor())?;
        self.values.try_reserve(additional)?;
        self.rebuild(bucket_count, &hasher)
    }

    /// Rebuilds the index with at least `bucket_count` buckets, and at least
    /// as many as the current elements need.
    ///
    /// A request of zero on an empty table releases the index allocation.
    pub fn rehash(&mut self, bucket_count: usize, hasher: impl Fn(&V) -> u64) {
        let result = self.target_bucket_count(bucket_count).and_then(|target| {
            if target == self.index.bucket_count() {
                Ok(())
            } else {
                self.rebuild(target, &hasher)
            }
        });
        if let Err(e) = result {
            handle_error(e);
        }
    }

    fn target_bucket_count(&self, requested: usize) -> Result<usize, TryReserveError> {
        let needed = bucket_count_for(self.len(), self.index.max_load_factor())?;
        if requested == 0 {
            return Ok(needed);
        }
        let requested = requested
            .max(MIN_BUCKET_COUNT)
            .checked_next_power_of_two()
            .context(CapacityOverflowSnafu)?;
        ensure!(requested < MAX_BUCKET_COUNT, CapacityOverflowSnafu);
        Ok(requested.max(needed))
    }

    /// Shrinks the index and the value store as much as possible.
    ///
    /// Shrinking is best-effort: if the smaller allocations cannot be
    /// obtained the table keeps its current storage.
    pub fn shrink_to_fit(&mut self, hasher: impl Fn(&V) -> u64) {
        let result = self.target_bucket_count(0).and_then(|target| {
            if target < self.index.bucket_count() {
                self.rebuild(target, &hasher)
            } else {
                Ok(())
            }
        });
        if let Err(e) = result.and_then(|()| self.values.try_shrink_to_fit()) {
            log::debug!("shrink_to_fit kept current storage: {e}");
        }
    }

    fn rebuild(
        &mut self,
        bucket_count: usize,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<(), TryReserveError> {
        self.index = self
            .index
            .try_rebuilt(bucket_count, self.values.iter().map(|v| hasher(v)))?;
        Ok(())
    }

    /// Returns an iterator over all values in insertion order (modulo
    /// removals).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dense_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// for n in [5, 3, 9] {
    ///     table.entry(n, |&v| v == n, |&v| v).or_insert(n);
    /// }
    /// assert_eq!(table.iter().copied().collect::<Vec<_>>(), [5, 3, 9]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V, St> {
        Iter {
            inner: self.values.iter(),
        }
    }

    /// Returns a mutable iterator over all values.
    ///
    /// Values must not be modified in a way that changes their hash or
    /// equality.
    pub fn iter_mut(&mut self) -> IterMut<'_, V, St> {
        IterMut {
            inner: self.values.iter_mut(),
        }
    }

    /// Removes every value, yielding them in iteration order.
    ///
    /// The table is empty as soon as this returns, whether or not the
    /// iterator is consumed. The index allocation is kept; the value storage
    /// moves into the iterator.
    pub fn drain(&mut self) -> Drain<'_, V, St> {
        let fresh = St::new_in(self.allocator().clone());
        let values = core::mem::replace(&mut self.values, fresh);
        self.index.clear();
        Drain {
            inner: values.into_values(),
            _marker: PhantomData,
        }
    }

    /// Copies every value into a new table allocating from `alloc`.
    ///
    /// The index slots are copied verbatim since the copy keeps positions.
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, TryReserveError>
    where
        V: Clone,
    {
        let index = self.index.try_clone_in(alloc.clone())?;
        let values = self.values.try_clone_in(alloc)?;
        Ok(Self {
            index,
            values,
            _marker: PhantomData,
        })
    }

    /// Fallible copy-assignment. `self` keeps its backend; on error it is
    /// unchanged.
    pub fn try_clone_from(&mut self, source: &Self) -> Result<(), TryReserveError>
    where
        V: Clone,
    {
        *self = source.try_clone_in(self.allocator().clone())?;
        Ok(())
    }

    /// Move-assignment: transfers the contents of `source` into `self`,
    /// leaving `source` empty.
    ///
    /// When the backends are interchangeable this is O(1) and `self` adopts
    /// `source`'s storage. Otherwise every element is moved into new storage
    /// allocated from `self`'s backend.
    pub fn move_from(&mut self, source: &mut Self) {
        if let Err(e) = self.try_move_from(source) {
            handle_error(e);
        }
    }

    /// Fallible form of [`move_from`](Self::move_from). On error neither
    /// table is changed.
    ///
    /// On success `source` is left empty, bound to its own backend, and keeps
    /// its maximum load factor.
    pub fn try_move_from(&mut self, source: &mut Self) -> Result<(), TryReserveError> {
        if interchangeable(self.allocator(), source.allocator()) {
            let empty = source.emptied();
            *self = core::mem::replace(source, empty);
            return Ok(());
        }

        log::debug!("moving {} elements between unequal memory backends", source.len());
        let alloc = self.allocator().clone();
        let index = source.index.try_clone_in(alloc.clone())?;
        let mut values = St::new_in(alloc);
        values.try_reserve(source.len())?;

        let empty = source.emptied();
        let taken = core::mem::replace(source, empty);
        for value in taken.values.into_values() {
            // SAFETY: Reserved room for every source element above.
            unsafe {
                values.push_within_capacity(value);
            }
        }

        *self = Self {
            index,
            values,
            _marker: PhantomData,
        };
        Ok(())
    }

    /// An empty table on the same backend with the same maximum load factor.
    fn emptied(&self) -> Self {
        let alloc = self.allocator().clone();
        Self {
            index: IndexTable::new_in(alloc.clone(), self.max_load_factor()),
            values: St::new_in(alloc),
            _marker: PhantomData,
        }
    }

    /// Exchanges the contents of two tables, including their backends.
    ///
    /// The backends must be interchangeable; this is checked in debug
    /// builds.
    pub fn swap(&mut self, other: &mut Self) {
        debug_assert!(
            interchangeable(self.allocator(), other.allocator()),
            "swapping tables bound to unequal memory backends"
        );
        core::mem::swap(self, other);
    }

    /// Computes a histogram of probe lengths for the current table state.
    ///
    /// Entry `d` counts the elements stored `d` buckets past their home
    /// bucket. The vector is as long as the largest displacement plus one,
    /// and empty for an empty table.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> alloc::vec::Vec<usize> {
        let mut hist = alloc::vec::Vec::new();
        for slot in self.index.slots().iter().filter(|s| !s.is_empty()) {
            let d = slot.displacement();
            if hist.len() <= d {
                hist.resize(d + 1, 0);
            }
            hist[d] += 1;
        }
        hist
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.probe_histogram();
        let total: usize = hist.iter().enumerate().map(|(d, n)| d * n).sum();
        let value_bytes = self.values.capacity().saturating_mul(core::mem::size_of::<V>());

        DebugStats {
            populated: self.len(),
            capacity: self.capacity(),
            bucket_count: self.bucket_count(),
            max_displacement: hist.len().saturating_sub(1),
            mean_displacement: if self.is_empty() {
                0.0
            } else {
                total as f64 / self.len() as f64
            },
            load_factor: self.load_factor() as f64,
            index_bytes: self.bucket_count() * core::mem::size_of::<crate::index::Slot>(),
            value_bytes,
            wasted_bytes: value_bytes - self.len() * core::mem::size_of::<V>(),
        }
    }

    /// Pretty-prints the probe-length histogram horizontally using stdout.
    ///
    /// Each row corresponds to one displacement.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_probe_histogram(&self) {
        let hist = self.probe_histogram();
        let max = *hist.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.len());

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = ['▏', '▎', '▍', '▌', '▋', '▊', '▉'];
            if units % 8 > 0 {
                bar.push(partial[units % 8 - 1]);
            }
            bar
        };

        for (displacement, &count) in hist.iter().enumerate() {
            println!("{:>3} | {} ({})", displacement, make_bar(count), count);
        }
    }
}

impl<V, A> HashTable<V, A, Contiguous<V, A>>
where
    A: MemoryBackend,
{
    /// The values in iteration order, as a slice.
    pub fn as_slice(&self) -> &[V] {
        self.values.as_slice()
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
///
/// # Examples
///
/// ```rust
/// # use dense_hash::hash_table::Entry;
/// # use dense_hash::hash_table::HashTable;
/// #
/// let mut table: HashTable<(u32, u32)> = HashTable::new();
/// let rehash = |v: &(u32, u32)| v.0 as u64;
///
/// match table.entry(1, |v| v.0 == 1, rehash) {
///     Entry::Vacant(entry) => {
///         entry.insert((1, 10));
///     }
///     Entry::Occupied(entry) => {
///         println!("Key already exists with value: {:?}", entry.get());
///     }
/// }
/// ```
pub enum Entry<'a, V, A = Global, St = Contiguous<V, A>>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    /// A vacant entry - the value is not present in the table
    Vacant(VacantEntry<'a, V, A, St>),
    /// An occupied entry - the value is present in the table
    Occupied(OccupiedEntry<'a, V, A, St>),
}

impl<'a, V, A, St> Entry<'a, V, A, St>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant. `default` is
    /// only called for vacant entries.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Calls `f` on the value of an occupied entry.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Inserts `V::default()` if the entry is vacant.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in a [`HashTable`].
///
/// Room for the value has already been reserved, so inserting never
/// allocates.
pub struct VacantEntry<'a, V, A = Global, St = Contiguous<V, A>>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    table: &'a mut HashTable<V, A, St>,
    pos: usize,
    dist_fp: u32,
}

impl<'a, V, A, St> VacantEntry<'a, V, A, St>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    /// Inserts `value`, which must match the hash and predicate used to
    /// obtain this entry, at the end of the iteration order.
    pub fn insert(self, value: V) -> &'a mut V {
        let value_index = self.table.values.len();
        self.table.index.insert_at(self.pos, self.dist_fp, value_index);
        self.table.values.push(value)
    }

    /// The position the value will occupy in iteration order.
    pub fn index(&self) -> usize {
        self.table.values.len()
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V, A = Global, St = Contiguous<V, A>>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    table: &'a mut HashTable<V, A, St>,
    pos: usize,
    value_index: usize,
}

impl<'a, V, A, St> OccupiedEntry<'a, V, A, St>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: `value_index` came from the index table.
        unsafe { self.table.values.get_unchecked(self.value_index) }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: `value_index` came from the index table.
        unsafe { self.table.values.get_unchecked_mut(self.value_index) }
    }

    /// Converts the entry into a mutable reference bound to the table.
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: `value_index` came from the index table.
        unsafe { self.table.values.get_unchecked_mut(self.value_index) }
    }

    /// The position of the value in iteration order.
    pub fn index(&self) -> usize {
        self.value_index
    }

    /// Removes the value from the table, moving the last value into its
    /// position.
    pub fn remove(self, hasher: impl Fn(&V) -> u64) -> V {
        self.table.remove_slot(self.pos, self.value_index, hasher)
    }
}

/// An iterator over the values in a [`HashTable`], in iteration order.
pub struct Iter<'a, V, St>
where
    St: ValueStore<V> + 'a,
    V: 'a,
{
    inner: St::Iter<'a>,
}

impl<'a, V, St> Iterator for Iter<'a, V, St>
where
    St: ValueStore<V> + 'a,
    V: 'a,
{
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, V, St> ExactSizeIterator for Iter<'a, V, St>
where
    St: ValueStore<V> + 'a,
    V: 'a,
{
}

impl<'a, V, St> FusedIterator for Iter<'a, V, St>
where
    St: ValueStore<V> + 'a,
    St::Iter<'a>: FusedIterator,
    V: 'a,
{
}

/// A mutable iterator over the values in a [`HashTable`].
pub struct IterMut<'a, V, St>
where
    St: ValueStore<V> + 'a,
    V: 'a,
{
    inner: St::IterMut<'a>,
}

impl<'a, V, St> Iterator for IterMut<'a, V, St>
where
    St: ValueStore<V> + 'a,
    V: 'a,
{
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, V, St> ExactSizeIterator for IterMut<'a, V, St>
where
    St: ValueStore<V> + 'a,
    V: 'a,
{
}

/// A draining iterator over the values of a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V, St>
where
    St: ValueStore<V>,
{
    inner: St::IntoIter,
    _marker: PhantomData<&'a mut V>,
}

impl<V, St> Iterator for Drain<'_, V, St>
where
    St: ValueStore<V>,
{
    type Item = V;

    #[inline]
    fn next(&mut self) -> Option<V> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V, St> ExactSizeIterator for Drain<'_, V, St> where St: ValueStore<V> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V, St>
where
    St: ValueStore<V>,
{
    inner: St::IntoIter,
}

impl<V, St> Iterator for IntoIter<V, St>
where
    St: ValueStore<V>,
{
    type Item = V;

    #[inline]
    fn next(&mut self) -> Option<V> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V, St> ExactSizeIterator for IntoIter<V, St> where St: ValueStore<V> {}

impl<V, A, St> IntoIterator for HashTable<V, A, St>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    type Item = V;
    type IntoIter = IntoIter<V, St>;

    fn into_iter(self) -> IntoIter<V, St> {
        IntoIter {
            inner: self.values.into_values(),
        }
    }
}

impl<'a, V, A, St> IntoIterator for &'a HashTable<V, A, St>
where
    A: MemoryBackend,
    St: ValueStore<V, Backend = A>,
{
    type Item = &'a V;
    type IntoIter = Iter<'a, V, St>;

    fn into_iter(self) -> Iter<'a, V, St> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::store::Segmented;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn hash_string_key(state: &HashState, key: &str) -> u64 {
        let mut h = state.build_hasher();
        h.write(key.as_bytes());
        h.finish()
    }

    fn insert_item<St: ValueStore<Item, Backend = Global>>(
        table: &mut HashTable<Item, Global, St>,
        state: &HashState,
        key: u64,
        value: i32,
    ) {
        let hash = hash_key(state, key);
        match table.entry(hash, |v| v.key == key, |v| hash_key(state, v.key)) {
            Entry::Vacant(v) => {
                v.insert(Item { key, value });
            }
            Entry::Occupied(mut o) => o.get_mut().value = value,
        }
    }

    fn assert_consistent<St: ValueStore<Item, Backend = Global>>(
        table: &HashTable<Item, Global, St>,
        state: &HashState,
    ) {
        assert!(table.len() <= table.capacity());
        assert!(table.bucket_count() == 0 || table.bucket_count().is_power_of_two());
        for (i, item) in table.iter().enumerate() {
            let hash = hash_key(state, item.key);
            assert_eq!(
                table.find_index(hash, |v| v.key == item.key),
                Some(i),
                "{:#?}",
                table
            );
        }
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            match table.entry(hash, |v: &Item| v.key == k, |v| hash_key(&state, v.key)) {
                Entry::Vacant(v) => {
                    v.insert(Item {
                        key: k,
                        value: (k as i32) * 2,
                    });
                    assert_eq!(
                        table.find(hash, |v| v.key == k),
                        Some(&Item {
                            key: k,
                            value: (k as i32) * 2
                        }),
                        "{:#?}",
                        table
                    );
                }
                Entry::Occupied(_) => panic!("unexpected occupied on first insert: {:#?}", table),
            }
        }
        assert_eq!(table.len(), 32);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
            );
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
        assert_consistent(&table, &state);
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let k = 42u64;
        let hash = hash_key(&state, k);
        let rehash = |v: &Item| hash_key(&state, v.key);

        match table.entry(hash, |v| v.key == k, rehash) {
            Entry::Vacant(v) => {
                v.insert(Item { key: k, value: 7 });
            }
            Entry::Occupied(_) => panic!("should be vacant first time"),
        }

        match table.entry(hash, |v| v.key == k, rehash) {
            Entry::Occupied(mut occ) => {
                assert_eq!(occ.get().value, 7);
                assert_eq!(occ.index(), 0);
                occ.get_mut().value = 11;
            }
            Entry::Vacant(_) => panic!("should be occupied second time"),
        }

        assert_eq!(table.find(hash, |v| v.key == k).unwrap().value, 11);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn existing_key_never_grows() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let mut k = 0;
        while table.len() < table.capacity() || table.is_empty() {
            insert_item(&mut table, &state, k, 0);
            k += 1;
        }
        let buckets = table.bucket_count();
        insert_item(&mut table, &state, 0, 5);
        assert_eq!(table.bucket_count(), buckets);
        insert_item(&mut table, &state, k, 5);
        assert_eq!(table.bucket_count(), buckets * 2);
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            insert_item(&mut table, &state, k, 0);
        }
        for k in 0..10u64 {
            let hash = hash_key(&state, k);
            table.find_mut(hash, |v| v.key == k).unwrap().value = k as i32 + 100;
        }
        for k in 0..10u64 {
            let hash = hash_key(&state, k);
            assert_eq!(table.find(hash, |v| v.key == k).unwrap().value, k as i32 + 100);
        }
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let rehash = |v: &Item| hash_key(&state, v.key);
        for k in 0..100u64 {
            insert_item(&mut table, &state, k, k as i32);
        }

        for k in (0..100u64).step_by(3) {
            let hash = hash_key(&state, k);
            let removed = table.remove(hash, |v| v.key == k, rehash);
            assert_eq!(removed, Some(Item { key: k, value: k as i32 }));
            assert!(table.remove(hash, |v| v.key == k, rehash).is_none());
        }

        assert_eq!(table.len(), 66);
        for k in 0..100u64 {
            let hash = hash_key(&state, k);
            assert_eq!(table.find(hash, |v| v.key == k).is_some(), k % 3 != 0);
        }
        assert_consistent(&table, &state);
    }

    #[test]
    fn removal_moves_last_into_hole() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let rehash = |v: &Item| hash_key(&state, v.key);
        for k in 0..5u64 {
            insert_item(&mut table, &state, k, 0);
        }

        table.remove(hash_key(&state, 1), |v| v.key == 1, rehash);
        let keys: Vec<u64> = table.iter().map(|v| v.key).collect();
        assert_eq!(keys, [0, 4, 2, 3]);

        table.remove(hash_key(&state, 3), |v| v.key == 3, rehash);
        let keys: Vec<u64> = table.iter().map(|v| v.key).collect();
        assert_eq!(keys, [0, 4, 2]);

        assert_eq!(table.swap_remove_index(0, rehash).map(|v| v.key), Some(0));
        let keys: Vec<u64> = table.iter().map(|v| v.key).collect();
        assert_eq!(keys, [2, 4]);
        assert!(table.swap_remove_index(2, rehash).is_none());
        assert_consistent(&table, &state);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..50_000u64 {
            insert_item(&mut table, &state, k, k as i32);
            assert!(table.len() <= table.capacity());
        }
        assert_eq!(table.len(), 50_000);
        assert!(table.load_factor() <= table.max_load_factor());
        assert_consistent(&table, &state);
    }

    #[test]
    fn explicit_collision() {
        let mut table: HashTable<Item> = HashTable::new();
        let rehash = |_: &Item| 0xDEAD_BEEF;
        for k in 0..20u64 {
            table
                .entry(0xDEAD_BEEF, |v| v.key == k, rehash)
                .or_insert(Item { key: k, value: k as i32 });
        }
        assert_eq!(table.len(), 20);
        for k in 0..20u64 {
            assert_eq!(
                table.find(0xDEAD_BEEF, |v| v.key == k).map(|v| v.value),
                Some(k as i32)
            );
        }
        assert_eq!(table.probe_histogram(), vec![1; 20]);

        for k in (0..20u64).rev().step_by(2) {
            assert!(table.remove(0xDEAD_BEEF, |v| v.key == k, rehash).is_some());
        }
        assert_eq!(table.probe_histogram(), vec![1; 10]);
        for k in 0..20u64 {
            assert_eq!(table.find(0xDEAD_BEEF, |v| v.key == k).is_some(), k % 2 == 0);
        }
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..50u64 {
            insert_item(&mut table, &state, k, k as i32);
        }

        let sum: i32 = table.iter().map(|v| v.value).sum();
        assert_eq!(sum, (0..50).sum());
        assert_eq!(table.iter().len(), 50);

        for item in table.iter_mut() {
            item.value *= 2;
        }

        let buckets = table.bucket_count();
        let drained: Vec<Item> = table.drain().collect();
        assert_eq!(drained.len(), 50);
        assert_eq!(drained[10], Item { key: 10, value: 20 });
        assert!(table.is_empty());
        assert_eq!(table.bucket_count(), buckets);
        assert!(table.find(hash_key(&state, 10), |v| v.key == 10).is_none());

        insert_item(&mut table, &state, 3, 3);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn drain_dropped_early_empties_table() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            insert_item(&mut table, &state, k, 0);
        }
        let mut drain = table.drain();
        drain.next();
        drop(drain);
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn insert_and_find_string_keys() {
        let state = HashState::default();
        let mut table: HashTable<String> = HashTable::new();
        let rehash = |s: &String| hash_string_key(&state, s);
        let words = ["alpha", "beta", "gamma", "delta", "epsilon"];
        for w in words {
            table
                .entry(hash_string_key(&state, w), |s| s == w, rehash)
                .or_insert(w.to_string());
        }
        for w in words {
            assert_eq!(
                table.find(hash_string_key(&state, w), |s| s == w).map(String::as_str),
                Some(w)
            );
        }
        assert_eq!(
            table.iter().map(String::as_str).collect::<Vec<_>>(),
            words
        );
        assert_eq!(table.as_slice().len(), 5);
    }

    #[test]
    fn retain_visits_each_once() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..200u64 {
            insert_item(&mut table, &state, k, 0);
        }
        let mut visits = 0;
        table.retain(
            |v| {
                visits += 1;
                v.key % 4 == 0
            },
            |v| hash_key(&state, v.key),
        );
        assert_eq!(visits, 200);
        assert_eq!(table.len(), 50);
        assert!(table.iter().all(|v| v.key % 4 == 0));
        assert_consistent(&table, &state);
    }

    #[test]
    fn entry_or_insert_with_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let rehash = |v: &Item| hash_key(&state, v.key);
        let hash = hash_key(&state, 5);

        let mut calls = 0;
        for _ in 0..3 {
            table
                .entry(hash, |v| v.key == 5, rehash)
                .and_modify(|v| v.value += 1)
                .or_insert_with(|| {
                    calls += 1;
                    Item { key: 5, value: 0 }
                });
        }
        assert_eq!(calls, 1);
        assert_eq!(table.find(hash, |v| v.key == 5).unwrap().value, 2);

        let removed = match table.entry(hash, |v| v.key == 5, rehash) {
            Entry::Occupied(o) => o.remove(rehash),
            Entry::Vacant(_) => unreachable!(),
        };
        assert_eq!(removed.value, 2);
        assert!(table.is_empty());
    }

    #[test]
    fn histogram_output() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..1000u64 {
            insert_item(&mut table, &state, k, 0);
        }
        let hist = table.probe_histogram();
        assert_eq!(hist.iter().sum::<usize>(), 1000);
        let stats = table.debug_stats();
        assert_eq!(stats.populated, 1000);
        assert_eq!(stats.max_displacement + 1, hist.len());
        assert_eq!(stats.index_bytes, table.bucket_count() * 8);
        #[cfg(feature = "std")]
        {
            stats.print();
            table.print_probe_histogram();
        }
    }

    #[test]
    fn test_clone() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..100u64 {
            insert_item(&mut table, &state, k, k as i32);
        }

        let mut cloned = table.clone();
        assert_eq!(cloned.len(), table.len());
        assert_eq!(cloned.bucket_count(), table.bucket_count());
        assert!(cloned.iter().eq(table.iter()));
        assert_consistent(&cloned, &state);

        insert_item(&mut cloned, &state, 7, -1);
        assert_eq!(table.find(hash_key(&state, 7), |v| v.key == 7).unwrap().value, 7);
    }

    #[test]
    fn test_clone_empty_table() {
        let table: HashTable<Item> = HashTable::new();
        let cloned = table.clone();
        assert!(cloned.is_empty());
        assert_eq!(cloned.bucket_count(), 0);
    }

    #[test]
    fn test_clone_from_keeps_destination_contents_replaced() {
        let state = HashState::default();
        let mut source: HashTable<Item> = HashTable::new();
        let mut dest: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            insert_item(&mut source, &state, k, 1);
            insert_item(&mut dest, &state, k + 100, 2);
        }
        dest.clone_from(&source);
        assert!(dest.iter().eq(source.iter()));
        assert_consistent(&dest, &state);
    }

    #[test]
    fn test_move_from_leaves_source_empty() {
        let state = HashState::default();
        let mut source: HashTable<Item> = HashTable::new();
        let mut dest: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            insert_item(&mut source, &state, k, 1);
        }
        insert_item(&mut dest, &state, 99, 0);
        let before: Vec<Item> = source.iter().cloned().collect();

        dest.move_from(&mut source);
        assert!(source.is_empty());
        assert_eq!(dest.iter().cloned().collect::<Vec<_>>(), before);
        assert!(dest.find(hash_key(&state, 99), |v| v.key == 99).is_none());

        insert_item(&mut source, &state, 1, 1);
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_move_from_keeps_source_max_load_factor() {
        let state = HashState::default();
        let rehash = |v: &Item| hash_key(&state, v.key);
        let mut source: HashTable<Item> = HashTable::new();
        source.set_max_load_factor(0.5, rehash);
        for k in 0..20u64 {
            insert_item(&mut source, &state, k, 1);
        }
        let mut dest: HashTable<Item> = HashTable::new();

        dest.move_from(&mut source);
        assert!(source.is_empty());
        assert_eq!(source.max_load_factor(), 0.5);
        assert_eq!(dest.max_load_factor(), 0.5);

        for k in 0..20u64 {
            insert_item(&mut source, &state, k, 2);
        }
        assert!(source.load_factor() <= 0.5);
        assert_consistent(&source, &state);
    }

    #[test]
    fn test_swap() {
        let state = HashState::default();
        let mut a: HashTable<Item> = HashTable::new();
        let mut b: HashTable<Item> = HashTable::new();
        insert_item(&mut a, &state, 1, 1);
        for k in 0..3 {
            insert_item(&mut b, &state, k, 2);
        }
        a.swap(&mut b);
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 1);
        assert_consistent(&a, &state);
        assert_consistent(&b, &state);
    }

    #[test]
    fn test_shrink_to_fit_empty_table() {
        let mut table: HashTable<Item> = HashTable::with_capacity(100);
        assert!(table.bucket_count() > 0);
        table.shrink_to_fit(|v| v.key);
        assert_eq!(table.bucket_count(), 0);
        assert_eq!(table.capacity(), 0);
    }

    #[test]
    fn test_shrink_to_fit_after_removals() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let rehash = |v: &Item| hash_key(&state, v.key);
        for k in 0..1000u64 {
            insert_item(&mut table, &state, k, 0);
        }
        for k in 10..1000u64 {
            table.remove(hash_key(&state, k), |v| v.key == k, rehash);
        }
        let before = table.bucket_count();
        table.shrink_to_fit(rehash);
        assert!(table.bucket_count() < before);
        assert!(table.capacity() >= 10);
        assert_consistent(&table, &state);

        insert_item(&mut table, &state, 5000, 0);
        assert_eq!(table.len(), 11);
        assert_consistent(&table, &state);
    }

    #[test]
    fn test_rehash_and_max_load_factor() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let rehash = |v: &Item| hash_key(&state, v.key);
        for k in 0..100u64 {
            insert_item(&mut table, &state, k, 0);
        }

        table.rehash(1000, rehash);
        assert_eq!(table.bucket_count(), 1024);
        assert_consistent(&table, &state);

        table.rehash(1, rehash);
        assert_eq!(table.bucket_count(), 128);

        table.set_max_load_factor(0.5, rehash);
        assert_eq!(table.max_load_factor(), 0.5);
        assert_eq!(table.bucket_count(), 256);
        assert!(table.load_factor() <= 0.5);
        assert_consistent(&table, &state);
    }

    #[test]
    fn test_reserve_overflow_is_atomic() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            insert_item(&mut table, &state, k, 0);
        }
        let buckets = table.bucket_count();
        assert_eq!(
            table.try_reserve(usize::MAX, |v| hash_key(&state, v.key)),
            Err(TryReserveError::CapacityOverflow)
        );
        assert_eq!(
            table.try_reserve(usize::MAX / 2, |v| hash_key(&state, v.key)),
            Err(TryReserveError::CapacityOverflow)
        );
        assert_eq!(table.bucket_count(), buckets);
        assert_eq!(table.len(), 10);
        assert_consistent(&table, &state);
    }

    #[test]
    fn segmented_store_table() {
        let state = HashState::default();
        let mut table: HashTable<Item, Global, Segmented<Item>> = HashTable::new();
        let rehash = |v: &Item| hash_key(&state, v.key);
        insert_item(&mut table, &state, 0, 0);
        let first = table.find(hash_key(&state, 0), |v| v.key == 0).unwrap() as *const Item;
        for k in 1..3000u64 {
            insert_item(&mut table, &state, k, k as i32);
        }
        let again = table.find(hash_key(&state, 0), |v| v.key == 0).unwrap() as *const Item;
        assert_eq!(first, again);

        for k in (0..3000u64).filter(|k| k % 7 == 3) {
            table.remove(hash_key(&state, k), |v| v.key == k, rehash);
        }
        assert_consistent(&table, &state);
    }
}
