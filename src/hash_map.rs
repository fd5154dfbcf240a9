use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::hash_table;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::memory::Global;
use crate::memory::MemoryBackend;
use crate::store::Contiguous;
use crate::store::ValueStore;

/// Equality predicate matching a stored `(K, V)` pair against a borrowed key.
#[inline]
pub(crate) fn equivalent_key<Q, K, V>(key: &Q) -> impl Fn(&(K, V)) -> bool + '_
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    move |(k, _)| key == k.borrow()
}

/// Rehash closure for stored `(K, V)` pairs.
#[inline]
pub(crate) fn make_hasher<K, V, S>(hash_builder: &S) -> impl Fn(&(K, V)) -> u64 + '_
where
    K: Hash,
    S: BuildHasher,
{
    move |(k, _)| hash_builder.hash_one(k)
}

/// A dense hash map with insertion-ordered storage.
///
/// `HashMap<K, V, S>` stores key-value pairs where keys implement `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash keys. Pairs live in a
/// dense value store in insertion order; the robin-hood index table of
/// [`HashTable`] maps hashes to positions in that store.
///
/// Two more type parameters select where memory comes from and how pairs
/// are stored:
///
/// - `A`, the [`MemoryBackend`] every allocation goes through ([`Global`] by
///   default, or a [`ResourceRef`](crate::memory::ResourceRef) for a runtime
///   memory resource; see [`pmr`](crate::pmr)).
/// - `St`, the [`ValueStore`] ([`Contiguous`] by default, or
///   [`Segmented`](crate::store::Segmented) for pairs whose addresses survive
///   growth; see [`SegmentedMap`](crate::SegmentedMap)).
///
/// # Iteration order
///
/// Iteration yields pairs in insertion order, except that removing a pair
/// moves the most recently inserted surviving pair into the removed pair's
/// position.
///
/// # Performance Characteristics
///
/// - **Memory**: 8 bytes of index per bucket, plus the size of `(K, V)` per
///   element. No hashes are stored; growth rehashes every key.
pub struct HashMap<K, V, S = DefaultHashBuilder, A = Global, St = Contiguous<(K, V), A>>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    table: HashTable<(K, V), A, St>,
    hash_builder: S,
}

impl<K, V, S, A, St> Debug for HashMap<K, V, S, A, St>
where
    K: Debug,
    V: Debug,
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, A, St> Clone for HashMap<K, V, S, A, St>
where
    K: Clone,
    V: Clone,
    S: Clone,
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Copies the map into a new allocation from the same backend.
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }

    /// Copy-assignment: `self` keeps its own backend and receives a deep copy
    /// of `source` allocated from it.
    fn clone_from(&mut self, source: &Self) {
        self.table.clone_from(&source.table);
        self.hash_builder.clone_from(&source.hash_builder);
    }
}

impl<K, V, S, A, St> HashMap<K, V, S, A, St>
where
    S: Default,
    A: MemoryBackend + Default,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Creates an empty map using the default hasher builder and backend.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use dense_hash::HashMap;
    /// #
    /// # #[derive(Default)]
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, SimpleHasher> = HashMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.bucket_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self::with_hasher_in(S::default(), A::default())
    }

    /// Creates a map able to hold at least `capacity` pairs without growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let map: HashMap<i32, String> = HashMap::with_capacity(100);
    /// assert!(map.capacity() >= 100);
    /// # }
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher_in(capacity, S::default(), A::default())
    }
}

impl<K, V, S, A, St> HashMap<K, V, S, A, St>
where
    A: MemoryBackend + Default,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Creates an empty map with the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_in(hash_builder, A::default())
    }

    /// Creates a map with the given capacity and hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_and_hasher_in(capacity, hash_builder, A::default())
    }
}

impl<K, V, S, A, St> HashMap<K, V, S, A, St>
where
    S: Default,
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Creates an empty map allocating from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self::with_hasher_in(S::default(), alloc)
    }

    /// Creates a map with the given capacity, allocating from `alloc`.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::with_capacity_and_hasher_in(capacity, S::default(), alloc)
    }
}

impl<K, V, S, A, St> HashMap<K, V, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Creates an empty map with the given hasher builder, allocating from
    /// `alloc`. Nothing is allocated until the first insert.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::new_in(alloc),
            hash_builder,
        }
    }

    /// Creates a map with the given capacity and hasher builder, allocating
    /// from `alloc`.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::with_capacity_in(capacity, alloc),
            hash_builder,
        }
    }

    /// Returns the number of elements in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// assert_eq!(map.len(), 0);
    /// map.insert(1, "a");
    /// assert_eq!(map.len(), 1);
    /// # }
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of pairs the map can hold before it must grow.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Number of buckets in the index table: zero or a power of two.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Largest bucket count the index table can address.
    pub fn max_bucket_count(&self) -> usize {
        HashTable::<(K, V), A, St>::max_bucket_count()
    }

    /// `len / bucket_count`, or zero before the first allocation.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// The fraction of buckets that may be filled before the map grows.
    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor()
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// The backend this map allocates from.
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Clears the map, removing all key-value pairs. Keeps the index
    /// allocation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.insert(1, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert!(map.bucket_count() > 0);
    /// # }
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns the pair at position `index` in iteration order.
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        self.table.get_index(index).map(|(k, v)| (k, v))
    }

    /// Returns the pair at position `index` in iteration order, with a
    /// mutable value.
    pub fn get_index_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        self.table.get_index_mut(index).map(|(k, v)| (&*k, v))
    }

    /// Returns an iterator over the key-value pairs in iteration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.insert(2, "b");
    /// map.insert(1, "a");
    ///
    /// let pairs: Vec<_> = map.iter().collect();
    /// assert_eq!(pairs, [(&2, &"b"), (&1, &"a")]);
    /// # }
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V, St> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the pairs with mutable references to the
    /// values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, St> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Returns an iterator over the keys in iteration order.
    pub fn keys(&self) -> Keys<'_, K, V, St> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values in iteration order.
    pub fn values(&self) -> Values<'_, K, V, St> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, St> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Removes every pair, yielding them in iteration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    ///
    /// let drained: Vec<(i32, &str)> = map.drain().collect();
    /// assert_eq!(drained, [(1, "a"), (2, "b")]);
    /// assert!(map.is_empty());
    /// # }
    /// ```
    pub fn drain(&mut self) -> Drain<'_, K, V, St> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Exchanges the contents, hasher builders, and backends of two maps.
    ///
    /// The backends must be interchangeable; this is checked in debug
    /// builds.
    pub fn swap(&mut self, other: &mut Self) {
        self.table.swap(&mut other.table);
        core::mem::swap(&mut self.hash_builder, &mut other.hash_builder);
    }

    /// Move-assignment: transfers every pair of `source` into `self`,
    /// leaving `source` empty but usable.
    ///
    /// O(1) when the backends are interchangeable; otherwise the pairs are
    /// moved one by one into storage allocated from `self`'s backend. The
    /// hasher builders are exchanged so that each map keeps hashing
    /// consistently.
    pub fn move_from(&mut self, source: &mut Self) {
        self.table.move_from(&mut source.table);
        core::mem::swap(&mut self.hash_builder, &mut source.hash_builder);
    }

    /// Fallible form of [`move_from`](Self::move_from). On error neither map
    /// is changed.
    pub fn try_move_from(&mut self, source: &mut Self) -> Result<(), TryReserveError> {
        self.table.try_move_from(&mut source.table)?;
        core::mem::swap(&mut self.hash_builder, &mut source.hash_builder);
        Ok(())
    }

    /// Copies the map into new storage allocated from `alloc`.
    pub fn clone_in(&self, alloc: A) -> Self
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        self.try_clone_in(alloc)
            .unwrap_or_else(|e| crate::error::handle_error(e))
    }

    /// Fallible form of [`clone_in`](Self::clone_in).
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, TryReserveError>
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        Ok(Self {
            table: self.table.try_clone_in(alloc)?,
            hash_builder: self.hash_builder.clone(),
        })
    }

    /// Fallible copy-assignment. `self` keeps its backend; on error it is
    /// unchanged.
    pub fn try_clone_from(&mut self, source: &Self) -> Result<(), TryReserveError>
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        self.table.try_clone_from(&source.table)?;
        self.hash_builder.clone_from(&source.hash_builder);
        Ok(())
    }

    /// Probe-length histogram of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> alloc::vec::Vec<usize> {
        self.table.probe_histogram()
    }

    /// Utilization statistics of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }

    /// Prints the probe-length histogram of the underlying table.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_probe_histogram(&self) {
        self.table.print_probe_histogram();
    }
}

impl<K, V, S, A> HashMap<K, V, S, A, Contiguous<(K, V), A>>
where
    A: MemoryBackend,
{
    /// The pairs in iteration order, as a slice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let mut map: HashMap<&str, i32> = HashMap::new();
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    /// assert_eq!(map.as_slice(), &[("a", 1), ("b", 2)]);
    /// # }
    /// ```
    pub fn as_slice(&self) -> &[(K, V)] {
        self.table.as_slice()
    }
}

impl<K, V, S, A, St> HashMap<K, V, S, A, St>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Reserves capacity for at least `additional` more pairs.
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, make_hasher::<K, V, S>(&self.hash_builder));
    }

    /// Fallible form of [`reserve`](Self::reserve). On error the map is
    /// unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table
            .try_reserve(additional, make_hasher::<K, V, S>(&self.hash_builder))
    }

    /// Rebuilds the index with at least `bucket_count` buckets (rounded up to
    /// a power of two, and never fewer than the current pairs need).
    pub fn rehash(&mut self, bucket_count: usize) {
        self.table
            .rehash(bucket_count, make_hasher::<K, V, S>(&self.hash_builder));
    }

    /// Shrinks the index and the value store as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table
            .shrink_to_fit(make_hasher::<K, V, S>(&self.hash_builder));
    }

    /// Sets the maximum load factor, clamped to `[0.05, 0.99]`. Grows
    /// immediately if the map now exceeds it.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) {
        self.table
            .set_max_load_factor(max_load_factor, make_hasher::<K, V, S>(&self.hash_builder));
    }

    /// Inserts a key-value pair, returning the previous value if the key was
    /// present. The stored key is not replaced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use dense_hash::HashMap;
    /// #
    /// # #[derive(Default)]
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map: HashMap<i32, &str, SimpleHasher> = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.try_insert(key, value)
            .unwrap_or_else(|e| crate::error::handle_error(e))
    }

    /// Fallible form of [`insert`](Self::insert). On error the map is
    /// unchanged and the pair is dropped.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, TryReserveError> {
        let hash = self.hash_builder.hash_one(&key);
        let entry = self.table.try_entry(
            hash,
            equivalent_key(&key),
            make_hasher::<K, V, S>(&self.hash_builder),
        )?;
        Ok(match entry {
            TableEntry::Occupied(mut entry) => {
                Some(core::mem::replace(&mut entry.get_mut().1, value))
            }
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                None
            }
        })
    }

    /// Inserts the pair only if `key` is absent.
    ///
    /// Returns the value now stored under `key` and whether the insert took
    /// place. An existing value is left untouched and `value` is dropped.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> (&mut V, bool) {
        match self.entry(key) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => (entry.insert(value), true),
        }
    }

    /// Returns the value stored under `key`, inserting the result of
    /// `make` first if the key is absent. `make` runs only when inserting.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        self.entry(key).or_insert_with(make)
    }

    /// Keyed access: returns the value stored under `key`, inserting
    /// `V::default()` first if the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let mut counts: HashMap<&str, u32> = HashMap::new();
    /// for word in ["a", "b", "a"] {
    ///     *counts.get_or_insert_default(word) += 1;
    /// }
    /// assert_eq!(counts[&"a"], 2);
    /// assert_eq!(counts[&"b"], 1);
    /// # }
    /// ```
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and value corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find(hash, equivalent_key(key))
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_mut(hash, equivalent_key(key))
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_index_of(key).is_some()
    }

    /// Returns the position of the key in iteration order.
    pub fn get_index_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table.find_index(hash, equivalent_key(key))
    }

    /// Returns the pairs matching `key`: one if present, none otherwise.
    ///
    /// Keys are unique, so the range never holds more than one pair.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.equal_range(&1).len(), 1);
    /// assert_eq!(map.equal_range(&2).len(), 0);
    /// # }
    /// ```
    pub fn equal_range<Q>(&self, key: &Q) -> EqualRange<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        EqualRange {
            inner: self.get_key_value(key).into_iter(),
        }
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// The last pair in iteration order moves into the removed pair's
    /// position.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(
            hash,
            equivalent_key(key),
            make_hasher::<K, V, S>(&self.hash_builder),
        )
    }

    /// Removes the pair at position `index` in iteration order, moving the
    /// last pair into its place.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    /// map.insert(3, "c");
    ///
    /// assert_eq!(map.swap_remove_index(0), Some((1, "a")));
    /// assert_eq!(map.get_index(0), Some((&3, &"c")));
    /// assert_eq!(map.swap_remove_index(5), None);
    /// # }
    /// ```
    pub fn swap_remove_index(&mut self, index: usize) -> Option<(K, V)> {
        self.table
            .swap_remove_index(index, make_hasher::<K, V, S>(&self.hash_builder))
    }

    /// Retains only the pairs for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(
            |(k, v)| f(k, v),
            make_hasher::<K, V, S>(&self.hash_builder),
        );
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use dense_hash::HashMap;
    ///
    /// let mut map: HashMap<&str, u32> = HashMap::new();
    /// map.entry("a").or_insert(1);
    /// *map.entry("a").or_insert(10) += 1;
    /// assert_eq!(map.get("a"), Some(&2));
    /// # }
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S, A, St> {
        let hash = self.hash_builder.hash_one(&key);
        let Self {
            table,
            hash_builder,
        } = self;
        match table.entry(
            hash,
            equivalent_key(&key),
            make_hasher::<K, V, S>(hash_builder),
        ) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry {
                entry,
                hash_builder,
            }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }
}

impl<K, V, S, A, St> PartialEq for HashMap<K, V, S, A, St>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Two maps are equal when they hold the same keys with equal values,
    /// regardless of iteration order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| v == ov))
    }
}

impl<K, V, S, A, St> Eq for HashMap<K, V, S, A, St>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
}

impl<K, V, S, A, St> Default for HashMap<K, V, S, A, St>
where
    S: Default,
    A: MemoryBackend + Default,
    St: ValueStore<(K, V), Backend = A>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, Q, V, S, A, St> Index<&Q> for HashMap<K, V, S, A, St>
where
    K: Hash + Eq + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in HashMap")
    }
}

impl<K, V, S, A, St> Extend<(K, V)> for HashMap<K, V, S, A, St>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let reserve = if self.is_empty() {
            iter.size_hint().0
        } else {
            iter.size_hint().0.div_ceil(2)
        };
        self.reserve(reserve);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S, A, St> Extend<(&'a K, &'a V)> for HashMap<K, V, S, A, St>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<K, V, S, A, St> FromIterator<(K, V)> for HashMap<K, V, S, A, St>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    A: MemoryBackend + Default,
    St: ValueStore<(K, V), Backend = A>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, A, St> IntoIterator for HashMap<K, V, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, St>;

    fn into_iter(self) -> IntoIter<K, V, St> {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S, A, St> IntoIterator for &'a HashMap<K, V, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, St>;

    fn into_iter(self) -> Iter<'a, K, V, St> {
        self.iter()
    }
}

impl<'a, K, V, S, A, St> IntoIterator for &'a mut HashMap<K, V, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, St>;

    fn into_iter(self) -> IterMut<'a, K, V, St> {
        self.iter_mut()
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, S = DefaultHashBuilder, A = Global, St = Contiguous<(K, V), A>>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, A, St>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, S, A, St>),
}

impl<'a, K, V, S, A, St> Entry<'a, K, V, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }

    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V, A = Global, St = Contiguous<(K, V), A>>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    entry: hash_table::VacantEntry<'a, (K, V), A, St>,
    key: K,
}

impl<'a, K, V, A, St> VacantEntry<'a, K, V, A, St>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, S = DefaultHashBuilder, A = Global, St = Contiguous<(K, V), A>>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    entry: hash_table::OccupiedEntry<'a, (K, V), A, St>,
    hash_builder: &'a S,
}

impl<'a, K, V, S, A, St> OccupiedEntry<'a, K, V, S, A, St>
where
    A: MemoryBackend,
    St: ValueStore<(K, V), Backend = A>,
{
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// The position of the pair in iteration order.
    pub fn index(&self) -> usize {
        self.entry.index()
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V
    where
        K: Hash,
        S: BuildHasher,
    {
        self.remove_entry().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V)
    where
        K: Hash,
        S: BuildHasher,
    {
        self.entry
            .remove(make_hasher::<K, V, S>(self.hash_builder))
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    inner: hash_table::Iter<'a, (K, V), St>,
}

impl<'a, K, V, St> Iterator for Iter<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, St> ExactSizeIterator for Iter<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
}

/// A mutable iterator over the key-value pairs of a `HashMap`.
pub struct IterMut<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    inner: hash_table::IterMut<'a, (K, V), St>,
}

impl<'a, K, V, St> Iterator for IterMut<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, St> ExactSizeIterator for IterMut<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    inner: Iter<'a, K, V, St>,
}

impl<'a, K, V, St> Iterator for Keys<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, St> ExactSizeIterator for Keys<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    inner: Iter<'a, K, V, St>,
}

impl<'a, K, V, St> Iterator for Values<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, St> ExactSizeIterator for Values<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
}

/// A mutable iterator over the values of a `HashMap`.
pub struct ValuesMut<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    inner: IterMut<'a, K, V, St>,
}

impl<'a, K, V, St> Iterator for ValuesMut<'a, K, V, St>
where
    St: ValueStore<(K, V)> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// The pairs matching a key; see [`HashMap::equal_range`].
pub struct EqualRange<'a, K, V> {
    inner: core::option::IntoIter<(&'a K, &'a V)>,
}

impl<'a, K, V> Iterator for EqualRange<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for EqualRange<'_, K, V> {}

impl<K, V> DoubleEndedIterator for EqualRange<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> FusedIterator for EqualRange<'_, K, V> {}

/// A draining iterator over the key-value pairs of a `HashMap`.
pub struct Drain<'a, K, V, St>
where
    St: ValueStore<(K, V)>,
{
    inner: hash_table::Drain<'a, (K, V), St>,
}

impl<K, V, St> Iterator for Drain<'_, K, V, St>
where
    St: ValueStore<(K, V)>,
{
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, St> ExactSizeIterator for Drain<'_, K, V, St> where St: ValueStore<(K, V)> {}

/// An owning iterator over the key-value pairs of a `HashMap`.
pub struct IntoIter<K, V, St>
where
    St: ValueStore<(K, V)>,
{
    inner: hash_table::IntoIter<(K, V), St>,
}

impl<K, V, St> Iterator for IntoIter<K, V, St>
where
    St: ValueStore<(K, V)>,
{
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, St> ExactSizeIterator for IntoIter<K, V, St> where St: ValueStore<(K, V)> {}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
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
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type Map<K, V> = HashMap<K, V, SipHashBuilder>;

    #[test]
    fn test_new_and_with_hasher() {
        let map: Map<i32, String> = HashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.capacity(), 0);

        let map: Map<i32, String> = HashMap::with_hasher(SipHashBuilder::default());
        assert!(map.is_empty());
    }

    #[test]
    fn test_with_capacity() {
        let map: Map<i32, String> = HashMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        assert!(map.bucket_count().is_power_of_two());
        assert!(map.max_bucket_count() >= map.bucket_count());
    }

    #[test]
    fn test_insert_and_get() {
        let mut map: Map<i32, String> = HashMap::new();
        assert_eq!(map.insert(1, "one".to_string()), None);
        assert_eq!(map.insert(2, "two".to_string()), None);
        assert_eq!(map.insert(1, "uno".to_string()), Some("one".to_string()));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&1).map(String::as_str), Some("uno"));
        assert_eq!(map.get(&2).map(String::as_str), Some("two"));
        assert_eq!(map.get(&3), None);
        assert_eq!(map.get_key_value(&2).map(|(k, _)| *k), Some(2));
    }

    #[test]
    fn test_borrowed_lookups() {
        let mut map: Map<String, i32> = HashMap::new();
        map.insert("alpha".to_string(), 1);
        assert_eq!(map.get("alpha"), Some(&1));
        assert!(map.contains_key("alpha"));
        assert_eq!(map["alpha"], 1);
        *map.get_mut("alpha").unwrap() += 1;
        assert_eq!(map.remove("alpha"), Some(2));
        assert!(!map.contains_key("alpha"));
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_missing_panics() {
        let map: Map<i32, i32> = HashMap::new();
        let _ = map[&1];
    }

    #[test]
    fn test_insert_if_absent_and_emplace() {
        let mut map: Map<i32, String> = HashMap::new();
        let (value, inserted) = map.insert_if_absent(1, "a".to_string());
        assert!(inserted);
        assert_eq!(value, "a");
        let (value, inserted) = map.insert_if_absent(1, "b".to_string());
        assert!(!inserted);
        assert_eq!(value, "a");

        let mut built = 0;
        for _ in 0..3 {
            map.get_or_insert_with(2, || {
                built += 1;
                "two".to_string()
            });
        }
        assert_eq!(built, 1);
        assert_eq!(map.get_or_insert_default(3), "");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_remove_and_order() {
        let mut map: Map<u32, u32> = HashMap::new();
        for k in 1..=100 {
            map.insert(k, k * 10);
        }
        assert_eq!(map.remove(&50), Some(500));
        assert_eq!(map.len(), 99);
        assert_eq!(map.get(&50), None);
        assert_eq!(map.equal_range(&50).count(), 0);
        for k in (1..=100).filter(|&k| k != 50) {
            assert_eq!(map.get(&k), Some(&(k * 10)));
            assert_eq!(map.equal_range(&k).len(), 1);
        }

        // Key 100 now occupies position 49.
        assert_eq!(map.get_index(49), Some((&100, &1000)));
        assert_eq!(map.get_index_of(&100), Some(49));
        let keys: Vec<u32> = map.keys().copied().collect();
        let mut expected: Vec<u32> = (1..=99).collect();
        expected[49] = 100;
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_remove_entry() {
        let mut map: Map<String, i32> = HashMap::new();
        map.insert("k".to_string(), 5);
        assert_eq!(map.remove_entry("k"), Some(("k".to_string(), 5)));
        assert_eq!(map.remove_entry("k"), None);
    }

    #[test]
    fn test_clear() {
        let mut map: Map<i32, i32> = HashMap::new();
        for i in 0..10 {
            map.insert(i, i);
        }
        let buckets = map.bucket_count();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), buckets);
        assert_eq!(map.get(&3), None);
    }

    #[test]
    fn test_reserve_and_shrink() {
        let mut map: Map<i32, i32> = HashMap::new();
        map.reserve(1000);
        assert!(map.capacity() >= 1000);
        let buckets = map.bucket_count();
        for i in 0..1000 {
            map.insert(i, i);
        }
        assert_eq!(map.bucket_count(), buckets);

        map.retain(|k, _| *k < 10);
        map.shrink_to_fit();
        assert!(map.bucket_count() < buckets);
        for i in 0..10 {
            assert_eq!(map.get(&i), Some(&i));
        }
        assert_eq!(map.try_reserve(usize::MAX), Err(TryReserveError::CapacityOverflow));
    }

    #[test]
    fn test_rehash_and_load_factor() {
        let mut map: Map<i32, i32> = HashMap::new();
        for i in 0..100 {
            map.insert(i, i);
        }
        map.rehash(4096);
        assert_eq!(map.bucket_count(), 4096);
        map.set_max_load_factor(0.25);
        assert!(map.load_factor() <= 0.25);
        map.set_max_load_factor(0.99);
        assert_eq!(map.max_load_factor(), 0.99);
        for i in 0..100 {
            assert_eq!(map[&i], i);
        }
    }

    #[test]
    fn test_entry_api() {
        let mut map: Map<&str, i32> = HashMap::new();
        *map.entry("a").or_insert(0) += 1;
        *map.entry("a").or_insert(0) += 1;
        map.entry("b").and_modify(|v| *v = 100).or_insert(7);
        map.entry("b").and_modify(|v| *v = 100).or_insert(7);
        assert_eq!(map.get("a"), Some(&2));
        assert_eq!(map.get("b"), Some(&100));
        assert_eq!(map.entry("c").key(), &"c");
    }

    #[test]
    fn test_entry_or_default() {
        let mut map: Map<i32, Vec<i32>> = HashMap::new();
        map.entry(1).or_default().push(1);
        map.entry(1).or_default().push(2);
        assert_eq!(map.get(&1), Some(&alloc::vec![1, 2]));
    }

    #[test]
    fn test_occupied_entry() {
        let mut map: Map<i32, String> = HashMap::new();
        map.insert(1, "a".to_string());
        map.insert(2, "b".to_string());
        match map.entry(1) {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &1);
                assert_eq!(entry.get(), "a");
                assert_eq!(entry.index(), 0);
                assert_eq!(entry.insert("z".to_string()), "a");
                assert_eq!(entry.remove_entry(), (1, "z".to_string()));
            }
            Entry::Vacant(_) => panic!("expected occupied"),
        }
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_index(0), Some((&2, &"b".to_string())));
    }

    #[test]
    fn test_vacant_entry() {
        let mut map: Map<i32, i32> = HashMap::new();
        match map.entry(9) {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &9);
                *entry.insert(1) += 1;
            }
            Entry::Occupied(_) => panic!("expected vacant"),
        }
        assert_eq!(map[&9], 2);
        match map.entry(10) {
            Entry::Vacant(entry) => assert_eq!(entry.into_key(), 10),
            Entry::Occupied(_) => panic!("expected vacant"),
        }
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_iterators() {
        let mut map: Map<i32, i32> = HashMap::new();
        for i in 0..5 {
            map.insert(i, i * 2);
        }
        assert_eq!(map.iter().len(), 5);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [0, 1, 2, 3, 4]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), [0, 2, 4, 6, 8]);

        for v in map.values_mut() {
            *v += 1;
        }
        for (_, v) in map.iter_mut() {
            *v *= 10;
        }
        for (_, v) in &mut map {
            *v += 1;
        }
        assert_eq!(
            (&map).into_iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            [11, 31, 51, 71, 91]
        );
        assert_eq!(map.as_slice()[2], (2, 51));

        let owned: Vec<(i32, i32)> = map.into_iter().collect();
        assert_eq!(owned.len(), 5);
    }

    #[test]
    fn test_drain() {
        let mut map: Map<i32, String> = HashMap::new();
        for i in 0..5 {
            map.insert(i, i.to_string());
        }
        let drained: Vec<(i32, String)> = map.drain().collect();
        assert_eq!(drained.len(), 5);
        assert!(map.is_empty());
        map.insert(1, "again".to_string());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_multiple_insertions() {
        let mut map: Map<u64, u64> = HashMap::new();
        for i in 0..10_000 {
            map.insert(i, i * i);
        }
        assert_eq!(map.len(), 10_000);
        assert!(map.load_factor() <= map.max_load_factor());
        for i in (0..10_000).step_by(7) {
            assert_eq!(map.get(&i), Some(&(i * i)));
        }
    }

    #[test]
    fn test_string_keys() {
        let mut map: Map<String, usize> = HashMap::new();
        let words = ["apple", "banana", "cherry"];
        for (i, w) in words.iter().enumerate() {
            map.insert(w.to_string(), i);
        }
        for (i, w) in words.iter().enumerate() {
            assert_eq!(map.get(*w), Some(&i));
        }
    }

    #[test]
    fn test_clone_and_equality() {
        let mut original: Map<i32, i32> = HashMap::new();
        for i in 0..20 {
            original.insert(i, i);
        }
        let mut copy = original.clone();
        assert_eq!(copy, original);

        copy.insert(0, 100);
        assert_ne!(copy, original);
        assert_eq!(original[&0], 0);

        let mut assigned: Map<i32, i32> = HashMap::new();
        assigned.insert(99, 99);
        assigned.clone_from(&original);
        assert_eq!(assigned, original);
        assert!(!assigned.contains_key(&99));

        let rebound = original.clone_in(Global);
        assert_eq!(rebound, original);
    }

    #[test]
    fn test_equality_ignores_order() {
        let mut a: Map<i32, i32> = HashMap::new();
        let mut b: Map<i32, i32> = HashMap::with_hasher(a.hasher().clone());
        for i in 0..10 {
            a.insert(i, i);
            b.insert(9 - i, 9 - i);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_move_and_swap() {
        let mut a: Map<i32, i32> = HashMap::new();
        let mut b: Map<i32, i32> = HashMap::new();
        for i in 0..10 {
            a.insert(i, -i);
        }
        b.insert(100, 100);

        let snapshot = a.clone();
        b.move_from(&mut a);
        assert!(a.is_empty());
        assert_eq!(b, snapshot);

        a.insert(1, 1);
        assert_eq!(a[&1], 1);

        a.swap(&mut b);
        assert_eq!(a, snapshot);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_extend_and_from_iter() {
        let map: Map<i32, i32> = (0..10).map(|i| (i, i)).collect();
        assert_eq!(map.len(), 10);

        let mut other: Map<i32, i32> = HashMap::new();
        other.extend(map.iter());
        other.extend([(10, 10), (0, -1)]);
        assert_eq!(other.len(), 11);
        assert_eq!(other[&0], -1);
    }

    #[test]
    fn test_swap_remove_index() {
        let mut map: Map<i32, i32> = HashMap::new();
        for i in 0..4 {
            map.insert(i, i);
        }
        assert_eq!(map.swap_remove_index(1), Some((1, 1)));
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [0, 3, 2]);
        assert_eq!(map.get(&3), Some(&3));
        if let Some((_, v)) = map.get_index_mut(0) {
            *v = 7;
        }
        assert_eq!(map[&0], 7);
    }

    #[test]
    fn test_segmented_map_keeps_addresses() {
        let mut map: HashMap<u64, u64, SipHashBuilder, Global, Segmented<(u64, u64)>> =
            HashMap::new();
        map.insert(0, 0);
        let first = map.get(&0).unwrap() as *const u64;
        for i in 1..10_000 {
            map.insert(i, i);
        }
        assert_eq!(map.get(&0).unwrap() as *const u64, first);
        assert_eq!(map.len(), 10_000);
    }

    #[test]
    fn test_debug() {
        let mut map: Map<i32, &str> = HashMap::new();
        map.insert(1, "a");
        assert_eq!(alloc::format!("{map:?}"), r#"{1: "a"}"#);
    }

    #[test]
    fn test_complex_values() {
        #[derive(Debug, Clone, PartialEq)]
        struct Complex {
            id: u32,
            tags: Vec<String>,
        }

        let mut map: Map<u32, Complex> = HashMap::new();
        for id in 0..50 {
            map.insert(
                id,
                Complex {
                    id,
                    tags: alloc::vec![id.to_string()],
                },
            );
        }
        for id in (0..50).step_by(2) {
            map.remove(&id);
        }
        for id in (1..50).step_by(2) {
            assert_eq!(map[&id].tags, [id.to_string()]);
            assert_eq!(map[&id].id, id);
        }
    }
}
