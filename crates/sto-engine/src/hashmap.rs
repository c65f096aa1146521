use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hash, Hasher};

/// Bob Jenkins' "one-at-a-time" string/byte hash, seeded. This is the
/// mixer `sto_hash_get_bucket_nr` drives via `rte_jhash` in
/// `sto_hash.c`; reimplemented here directly since there's no DPDK to
/// link against, but the mixing steps match.
#[derive(Clone)]
pub struct JenkinsHasher {
    seed: u32,
    state: u32,
}

impl JenkinsHasher {
    pub fn with_seed(seed: u32) -> Self {
        Self { seed, state: seed }
    }
}

impl Default for JenkinsHasher {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Hasher for JenkinsHasher {
    fn finish(&self) -> u64 {
        let mut hash = self.state;
        hash = hash.wrapping_add(hash << 3);
        hash ^= hash >> 11;
        hash = hash.wrapping_add(hash << 15);
        u64::from(hash)
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut hash = self.state;
        for &byte in bytes {
            hash = hash.wrapping_add(u32::from(byte));
            hash = hash.wrapping_add(hash << 10);
            hash ^= hash >> 6;
        }
        self.state = hash;
    }
}

/// Mirrors `sto_hash_buckets`: round `ceil(size * 4 / 3)` up to the next
/// power of two, capped at `STO_HASH_MAX_BUCKETS` (2^31).
fn bucket_count(size: usize) -> usize {
    const MAX_BUCKETS: usize = 1usize << 31;
    if size == 0 {
        return 1;
    }
    let val = (size * 4 + 2) / 3;
    val.next_power_of_two().min(MAX_BUCKETS)
}

/// An ownership-aware hash map keyed by `K`, seeded like
/// `sto_hash_alloc`'s bucket table. This is component A's Rust
/// reinterpretation of the original's intrusive-chaining `sto_hash`:
/// where the C version links `sto_hash_elem` nodes embedded in the
/// caller's structs through a bucket's `LIST_HEAD`, this version owns
/// its entries directly as a standard `HashMap` with a custom,
/// seed-parameterized hasher (Design Note §9, "Intrusive collections →
/// ownership-aware containers").
pub struct StoHash<K, V> {
    seed: u32,
    inner: HashMap<K, V, BuildHasherDefault<JenkinsHasher>>,
}

impl<K: Hash + Eq, V> StoHash<K, V> {
    /// Mirrors `sto_hash_alloc(size, seed)`: pre-sizes the bucket table
    /// for `size` expected elements under the same growth formula.
    pub fn with_capacity_and_seed(size: usize, seed: u32) -> Self {
        let buckets = bucket_count(size);
        Self {
            seed,
            inner: HashMap::with_capacity_and_hasher(buckets, BuildHasherDefault::default()),
        }
    }

    pub fn new(size: usize) -> Self {
        Self::with_capacity_and_seed(size, 0)
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Mirrors `sto_hash_add_elem`: inserts, returning the prior value (if
    /// any) as the C original's `sto_hash_remove_elem`-then-reinsert
    /// callers would observe.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    /// Mirrors `sto_hash_lookup_elem`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    /// Mirrors `sto_hash_remove_elem`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Mirrors `sto_hash_clear`.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_count_grows_with_size() {
        assert_eq!(bucket_count(0), 1);
        assert_eq!(bucket_count(1), 2);
        assert_eq!(bucket_count(6), 8);
        assert_eq!(bucket_count(100), 128);
    }

    #[test]
    fn insert_and_lookup_round_trip() {
        let mut map: StoHash<String, i32> = StoHash::new(8);
        assert_eq!(map.insert("a".to_string(), 1), None);
        assert_eq!(map.get(&"a".to_string()), Some(&1));
        assert_eq!(map.insert("a".to_string(), 2), Some(1));
        assert_eq!(map.get(&"a".to_string()), Some(&2));
    }

    #[test]
    fn remove_clears_entry() {
        let mut map: StoHash<&str, i32> = StoHash::new(4);
        map.insert("k", 42);
        assert_eq!(map.remove(&"k"), Some(42));
        assert_eq!(map.get(&"k"), None);
    }

    #[test]
    fn seeded_maps_are_independent() {
        let mut a: StoHash<i32, i32> = StoHash::with_capacity_and_seed(4, 1);
        let mut b: StoHash<i32, i32> = StoHash::with_capacity_and_seed(4, 2);
        a.insert(1, 100);
        b.insert(1, 200);
        assert_eq!(a.get(&1), Some(&100));
        assert_eq!(b.get(&1), Some(&200));
        assert_ne!(a.seed(), b.seed());
    }
}
