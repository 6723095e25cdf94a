//! Fx-hashed map aliases used for word tables.
//!
//! Word keys are short ASCII strings produced by the tokenizer. The Fx hash
//! from `rustc-hash` is not collision resistant, so these maps must not be
//! keyed by attacker-chosen data.

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// The hasher used by [`FxHashMap`].
pub type FxBuildHasher = rustc_hash::FxBuildHasher;

/// Creates an empty [`FxHashMap`] able to hold `capacity` entries without
/// reallocating.
///
/// # Examples
///
/// ```
/// use wf_core::fx_hash_map_with_capacity;
///
/// let map: wf_core::FxHashMap<String, u64> = fx_hash_map_with_capacity(64);
/// assert!(map.capacity() >= 64);
/// ```
#[inline]
#[must_use]
pub fn fx_hash_map_with_capacity<K, V>(capacity: usize) -> FxHashMap<K, V> {
    FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default())
}
