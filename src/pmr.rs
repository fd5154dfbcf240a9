//! Containers bound to a runtime [`MemoryResource`] per instance.
//!
//! Every alias here fixes the backend to [`ResourceRef<'r>`], so the memory
//! source is chosen when a container is constructed rather than by its type.
//! The lifetime `'r` keeps the resource alive for as long as any container
//! (or clone of one) refers to it.
//!
//! Copies made with [`Clone`] stay on the source's resource; `clone_from`
//! keeps the destination's. Moving with `move_from` between containers whose
//! resources are not [`is_equal`] copies the elements into the destination's
//! resource.
//!
//! # Examples
//!
//! ```rust
//! # #[cfg(any(feature = "std", feature = "foldhash"))]
//! # {
//! use dense_hash::memory::GlobalResource;
//! use dense_hash::memory::ResourceRef;
//! use dense_hash::pmr;
//!
//! let resource = GlobalResource;
//! let mut map: pmr::HashMap<'_, u32, &str> = pmr::HashMap::new_in(ResourceRef::from(&resource));
//! map.insert(1, "one");
//! assert_eq!(map[&1], "one");
//! # }
//! ```
//!
//! [`MemoryResource`]: crate::memory::MemoryResource
//! [`is_equal`]: crate::memory::MemoryResource::is_equal

use crate::DefaultHashBuilder;
use crate::memory::ResourceRef;
use crate::store::Segmented;

/// A [`HashMap`](crate::HashMap) allocating from a runtime memory resource.
pub type HashMap<'r, K, V, S = DefaultHashBuilder> = crate::HashMap<K, V, S, ResourceRef<'r>>;

/// A [`HashSet`](crate::HashSet) allocating from a runtime memory resource.
pub type HashSet<'r, T, S = DefaultHashBuilder> = crate::HashSet<T, S, ResourceRef<'r>>;

/// A pointer-stable map allocating from a runtime memory resource.
pub type SegmentedMap<'r, K, V, S = DefaultHashBuilder> =
    crate::HashMap<K, V, S, ResourceRef<'r>, Segmented<(K, V), ResourceRef<'r>>>;

/// A pointer-stable set allocating from a runtime memory resource.
pub type SegmentedSet<'r, T, S = DefaultHashBuilder> =
    crate::HashSet<T, S, ResourceRef<'r>, Segmented<T, ResourceRef<'r>>>;
