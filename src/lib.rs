#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// The error type shared by every fallible allocation.
pub mod error;

pub mod hash_policy;

/// A HashMap implementation over the dense robin-hood table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers, memory
/// backends, and value stores.
pub mod hash_map;

pub mod hash_table;

/// A hash set implementation over the dense robin-hood table.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers, memory backends, and
/// value stores.
pub mod hash_set;

mod index;
pub mod memory;
pub mod pmr;
mod raw;
pub mod store;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is named.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when none is named.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder used when no default hasher is available.
        ///
        /// It cannot be constructed; name a hasher builder explicitly.
        pub enum DefaultHashBuilder {}
    }
}

/// A [`HashMap`] whose pairs never move when the map grows.
pub type SegmentedMap<K, V, S = DefaultHashBuilder, A = memory::Global> =
    HashMap<K, V, S, A, store::Segmented<(K, V), A>>;

/// A [`HashSet`] whose values never move when the set grows.
pub type SegmentedSet<T, S = DefaultHashBuilder, A = memory::Global> =
    HashSet<T, S, A, store::Segmented<T, A>>;

pub use error::TryReserveError;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
