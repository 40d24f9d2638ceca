//! Fast hash map, hash set and ordered set type aliases.
//!
//! The Fx hash algorithm from `rustc-hash` is used for every map keyed by
//! resource paths or group names. These keys are internal and never
//! attacker-controlled, so denial-of-service resistance is not needed.
//!
//! [`FxIndexSet`] and [`FxIndexMap`] pair the Fx hasher with `indexmap` so
//! that membership and group order follow insertion while duplicates collapse.
//!
//! # Examples
//!
//! ```
//! use rws_core::{FxIndexSet, fx_index_set};
//!
//! let mut set: FxIndexSet<&str> = fx_index_set();
//! set.insert("b");
//! set.insert("a");
//! set.insert("b");
//! assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec!["b", "a"]);
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// The hasher used by the Fx collections.
pub type FxBuildHasher = rustc_hash::FxBuildHasher;

/// An insertion-ordered set using the Fx hash algorithm.
pub type FxIndexSet<V> = indexmap::IndexSet<V, FxBuildHasher>;

/// An insertion-ordered map using the Fx hash algorithm.
pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxIndexMap`].
#[inline]
#[must_use]
pub fn fx_index_map<K, V>() -> FxIndexMap<K, V> {
    FxIndexMap::with_hasher(FxBuildHasher::default())
}

/// Creates a new empty [`FxIndexSet`].
#[inline]
#[must_use]
pub fn fx_index_set<V>() -> FxIndexSet<V> {
    FxIndexSet::with_hasher(FxBuildHasher::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_map_operations() {
        let mut map: FxHashMap<&str, i32> = fx_hash_map();
        map.insert("one", 1);
        assert_eq!(map.get("one"), Some(&1));
        assert_eq!(map.get("two"), None);
    }

    #[test]
    fn test_fx_index_set_keeps_insertion_order() {
        let mut set: FxIndexSet<&str> = fx_index_set();
        assert!(set.insert("z"));
        assert!(set.insert("a"));
        assert!(!set.insert("z"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_index(0), Some(&"z"));

        assert!(set.shift_remove("z"));
        assert_eq!(set.get_index(0), Some(&"a"));
    }
}
