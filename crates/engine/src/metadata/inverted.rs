//! Inverted tag index: `(key, value) -> ids`
//!
//! A chained hash table keyed on the tag pair. Each entry holds the ids
//! tagged with that pair in insertion order, at most once each.
//!
//! # Invariants
//!
//! - An id appears under a pair iff its last add for that pair was not
//!   followed by a remove (directly or via `remove_vector`/`update`).
//! - `query`/`ids` return an entry's ids in stored order; `count` is their number.
//! - Entries with no ids are dropped, so `len()` counts live pairs only.

use std::hash::Hasher;

use rustc_hash::{FxHashSet, FxHasher};
use stratavec_core::{VectorError, VectorId, VectorResult};
use tracing::debug;

use super::tags::Metadata;

/// Bucket count of a new index
pub const INITIAL_BUCKETS: usize = 1024;

/// Initial capacity of an entry's id list; grows by doubling
const INITIAL_ID_CAPACITY: usize = 16;

/// Entries per bucket above which the table doubles
const MAX_LOAD_FACTOR: f64 = 0.75;

#[derive(Debug)]
struct Entry {
    key: String,
    value: String,
    hash: u64,
    ids: Vec<VectorId>,
}

impl Entry {
    fn matches(&self, hash: u64, key: &str, value: &str) -> bool {
        self.hash == hash && self.key == key && self.value == value
    }
}

fn hash_str(s: &str) -> u64 {
    let mut h = FxHasher::default();
    h.write(s.as_bytes());
    h.finish()
}

/// Order-sensitive pair hash: `("a","b")` and `("b","a")` land apart
fn pair_hash(key: &str, value: &str) -> u64 {
    hash_str(key) ^ (hash_str(value) << 1)
}

/// Reserve room for one more id, doubling the list when full
fn reserve_id_slot(ids: &mut Vec<VectorId>) -> VectorResult<()> {
    if ids.len() == ids.capacity() {
        let extra = ids.capacity().max(INITIAL_ID_CAPACITY);
        ids.try_reserve_exact(extra)
            .map_err(|_| VectorError::out_of_memory("metadata id list"))?;
    }
    Ok(())
}

/// Inverted index from tag pairs to vector ids
///
/// Writers take `&mut self`; callers synchronize externally.
#[derive(Debug)]
pub struct MetadataIndex {
    buckets: Vec<Vec<Entry>>,
    entries: usize,
}

impl Default for MetadataIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataIndex {
    /// Create an empty index with [`INITIAL_BUCKETS`] buckets
    pub fn new() -> Self {
        Self::with_buckets(INITIAL_BUCKETS)
    }

    /// Create an empty index with at least `buckets` buckets
    ///
    /// Rounded up to a power of two.
    pub fn with_buckets(buckets: usize) -> Self {
        let n = buckets.max(1).next_power_of_two();
        MetadataIndex {
            buckets: (0..n).map(|_| Vec::new()).collect(),
            entries: 0,
        }
    }

    #[inline]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    fn find(&self, key: &str, value: &str) -> Option<&Entry> {
        let hash = pair_hash(key, value);
        self.buckets[self.bucket_index(hash)]
            .iter()
            .find(|e| e.matches(hash, key, value))
    }

    /// Double the bucket array if one more entry would exceed the load factor
    fn grow_if_needed(&mut self) -> VectorResult<()> {
        let limit = self.buckets.len() as f64 * MAX_LOAD_FACTOR;
        if (self.entries + 1) as f64 <= limit {
            return Ok(());
        }

        let new_len = self.buckets.len() * 2;
        let mut resized: Vec<Vec<Entry>> = Vec::new();
        resized
            .try_reserve_exact(new_len)
            .map_err(|_| VectorError::out_of_memory("metadata bucket array"))?;
        resized.resize_with(new_len, Vec::new);

        let mask = new_len - 1;
        for chain in self.buckets.drain(..) {
            for entry in chain {
                resized[(entry.hash as usize) & mask].push(entry);
            }
        }
        debug!(
            target: "stratavec::metadata",
            entries = self.entries,
            buckets = new_len,
            "Resized metadata index"
        );
        self.buckets = resized;
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Tag `id` with `(key, value)`
    ///
    /// Adding an id already present under the pair is a no-op.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if the id list or table cannot grow.
    pub fn add(&mut self, key: &str, value: &str, id: VectorId) -> VectorResult<()> {
        let hash = pair_hash(key, value);
        let b = self.bucket_index(hash);
        if let Some(entry) = self.buckets[b]
            .iter_mut()
            .find(|e| e.matches(hash, key, value))
        {
            if entry.ids.contains(&id) {
                return Ok(());
            }
            reserve_id_slot(&mut entry.ids)?;
            entry.ids.push(id);
            return Ok(());
        }

        self.grow_if_needed()?;

        let mut ids = Vec::new();
        ids.try_reserve_exact(INITIAL_ID_CAPACITY)
            .map_err(|_| VectorError::out_of_memory("metadata id list"))?;
        ids.push(id);

        let b = self.bucket_index(hash);
        let chain = &mut self.buckets[b];
        chain
            .try_reserve(1)
            .map_err(|_| VectorError::out_of_memory("metadata bucket chain"))?;
        chain.push(Entry {
            key: key.to_string(),
            value: value.to_string(),
            hash,
            ids,
        });
        self.entries += 1;
        Ok(())
    }

    /// Remove the `(key, value)` tag from `id`
    ///
    /// Returns whether anything was removed. Order of the remaining ids is kept.
    pub fn remove(&mut self, key: &str, value: &str, id: VectorId) -> bool {
        let hash = pair_hash(key, value);
        let b = self.bucket_index(hash);
        let chain = &mut self.buckets[b];
        let Some(pos) = chain.iter().position(|e| e.matches(hash, key, value)) else {
            return false;
        };

        let ids = &mut chain[pos].ids;
        let Some(at) = ids.iter().position(|&x| x == id) else {
            return false;
        };
        ids.remove(at);

        if ids.is_empty() {
            chain.swap_remove(pos);
            self.entries -= 1;
        }
        true
    }

    /// Remove `id` from every entry
    ///
    /// Returns the number of entries that contained it. Linear in the index size.
    pub fn remove_vector(&mut self, id: VectorId) -> usize {
        let mut touched = 0;
        for chain in &mut self.buckets {
            for entry in chain.iter_mut() {
                if let Some(at) = entry.ids.iter().position(|&x| x == id) {
                    entry.ids.remove(at);
                    touched += 1;
                }
            }
            chain.retain(|e| !e.ids.is_empty());
        }
        self.entries = self.buckets.iter().map(Vec::len).sum();
        touched
    }

    /// Replace the tags of `id`: remove every old pair, then add every new pair
    ///
    /// Either side may be `None` or empty.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if adding a new pair fails. Old pairs are already removed.
    pub fn update(
        &mut self,
        id: VectorId,
        old: Option<&Metadata>,
        new: Option<&Metadata>,
    ) -> VectorResult<()> {
        if let Some(old) = old {
            for (k, v) in old.iter() {
                self.remove(k, v, id);
            }
        }
        if let Some(new) = new {
            for (k, v) in new.iter() {
                self.add(k, v, id)?;
            }
        }
        Ok(())
    }

    /// Drop every entry, keeping the current bucket count
    pub fn clear(&mut self) {
        for chain in &mut self.buckets {
            chain.clear();
        }
        self.entries = 0;
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Copy up to `out.len()` ids tagged `(key, value)` into `out`
    ///
    /// Returns how many were written; 0 for an unknown pair.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `out` is empty.
    pub fn query(&self, key: &str, value: &str, out: &mut [VectorId]) -> VectorResult<usize> {
        if out.is_empty() {
            return Err(VectorError::invalid_argument(
                "query output buffer must hold at least one id",
            ));
        }
        let ids = self.ids(key, value);
        let n = ids.len().min(out.len());
        out[..n].copy_from_slice(&ids[..n]);
        Ok(n)
    }

    /// Ids tagged `(key, value)`, in insertion order
    pub fn ids(&self, key: &str, value: &str) -> &[VectorId] {
        self.find(key, value).map(|e| e.ids.as_slice()).unwrap_or(&[])
    }

    /// Number of ids tagged `(key, value)`
    pub fn count(&self, key: &str, value: &str) -> usize {
        self.ids(key, value).len()
    }

    /// Whether `id` is tagged `(key, value)`
    pub fn contains(&self, key: &str, value: &str, id: VectorId) -> bool {
        self.ids(key, value).contains(&id)
    }

    /// Fraction of `total_vectors` tagged `(key, value)`; 0 when the total is 0
    pub fn selectivity(&self, key: &str, value: &str, total_vectors: usize) -> f64 {
        if total_vectors == 0 {
            return 0.0;
        }
        (self.count(key, value) as f64 / total_vectors as f64).min(1.0)
    }

    /// Ids tagged with every listed pair
    ///
    /// Follows the order of the smallest entry. No pairs gives no ids.
    pub fn intersect(&self, pairs: &[(&str, &str)]) -> Vec<VectorId> {
        let mut lists: Vec<&[VectorId]> = pairs.iter().map(|(k, v)| self.ids(k, v)).collect();
        lists.sort_by_key(|ids| ids.len());

        let Some((smallest, rest)) = lists.split_first() else {
            return Vec::new();
        };
        if smallest.is_empty() {
            return Vec::new();
        }

        let rest: Vec<FxHashSet<VectorId>> = rest
            .iter()
            .map(|ids| ids.iter().copied().collect())
            .collect();
        smallest
            .iter()
            .copied()
            .filter(|id| rest.iter().all(|set| set.contains(id)))
            .collect()
    }

    /// Number of live `(key, value)` entries
    pub fn len(&self) -> usize {
        self.entries
    }

    /// True if no pair has any id
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Current bucket count
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn id(n: u64) -> VectorId {
        VectorId::new(n)
    }

    #[test]
    fn test_add_is_set_semantics() {
        let mut idx = MetadataIndex::new();
        for _ in 0..5 {
            idx.add("color", "red", id(1)).unwrap();
        }
        assert_eq!(idx.count("color", "red"), 1);
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut idx = MetadataIndex::new();
        for n in [5, 3, 9, 1] {
            idx.add("k", "v", id(n)).unwrap();
        }
        assert!(idx.remove("k", "v", id(3)));
        assert_eq!(idx.ids("k", "v"), &[id(5), id(9), id(1)]);
    }

    #[test]
    fn test_pair_order_matters() {
        let mut idx = MetadataIndex::new();
        idx.add("a", "b", id(1)).unwrap();
        assert_eq!(idx.count("a", "b"), 1);
        assert_eq!(idx.count("b", "a"), 0);
    }

    #[test]
    fn test_remove_idempotent() {
        let mut idx = MetadataIndex::new();
        idx.add("k", "v", id(1)).unwrap();
        assert!(idx.remove("k", "v", id(1)));
        assert!(!idx.remove("k", "v", id(1)));
        assert!(!idx.remove("missing", "pair", id(1)));
        assert!(idx.is_empty());
    }

    #[test]
    fn test_query_bounds() {
        let mut idx = MetadataIndex::new();
        for n in 0..10 {
            idx.add("k", "v", id(n)).unwrap();
        }

        let mut out = [VectorId::new(0); 4];
        assert_eq!(idx.query("k", "v", &mut out).unwrap(), 4);
        assert_eq!(out, [id(0), id(1), id(2), id(3)]);

        let mut big = [VectorId::new(0); 32];
        assert_eq!(idx.query("k", "v", &mut big).unwrap(), 10);
        assert_eq!(idx.query("nope", "v", &mut big).unwrap(), 0);

        let mut empty: [VectorId; 0] = [];
        assert!(idx.query("k", "v", &mut empty).is_err());
    }

    #[test]
    fn test_remove_vector() {
        let mut idx = MetadataIndex::new();
        idx.add("color", "red", id(1)).unwrap();
        idx.add("color", "red", id(2)).unwrap();
        idx.add("size", "xl", id(1)).unwrap();
        idx.add("size", "s", id(2)).unwrap();

        assert_eq!(idx.remove_vector(id(1)), 2);
        assert_eq!(idx.count("color", "red"), 1);
        assert_eq!(idx.count("size", "xl"), 0);
        assert_eq!(idx.count("size", "s"), 1);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.remove_vector(id(1)), 0);
    }

    #[test]
    fn test_update_swaps_tags() {
        let mut idx = MetadataIndex::new();
        let old: Metadata = [("color", "red"), ("size", "xl")].into_iter().collect();
        let new: Metadata = [("color", "blue"), ("size", "xl")].into_iter().collect();

        idx.update(id(7), None, Some(&old)).unwrap();
        assert!(idx.contains("color", "red", id(7)));

        idx.update(id(7), Some(&old), Some(&new)).unwrap();
        assert!(!idx.contains("color", "red", id(7)));
        assert!(idx.contains("color", "blue", id(7)));
        assert!(idx.contains("size", "xl", id(7)));

        idx.update(id(7), Some(&new), None).unwrap();
        assert!(idx.is_empty());
    }

    #[test]
    fn test_resize_preserves_entries() {
        let mut idx = MetadataIndex::with_buckets(4);
        for n in 0..100u64 {
            idx.add("k", &n.to_string(), id(n)).unwrap();
        }
        assert!(idx.bucket_count() >= 128);
        assert_eq!(idx.len(), 100);
        for n in 0..100u64 {
            assert_eq!(idx.ids("k", &n.to_string()), &[id(n)]);
        }
    }

    #[test]
    fn test_selectivity() {
        let mut idx = MetadataIndex::new();
        for n in 0..5 {
            idx.add("k", "v", id(n)).unwrap();
        }
        assert!((idx.selectivity("k", "v", 100) - 0.05).abs() < 1e-12);
        assert_eq!(idx.selectivity("k", "v", 0), 0.0);
        assert_eq!(idx.selectivity("x", "y", 100), 0.0);
    }

    #[test]
    fn test_intersect() {
        let mut idx = MetadataIndex::new();
        for n in 0..10 {
            idx.add("even", if n % 2 == 0 { "y" } else { "n" }, id(n)).unwrap();
        }
        for n in [6, 2, 3, 8] {
            idx.add("pick", "y", id(n)).unwrap();
        }
        assert_eq!(
            idx.intersect(&[("even", "y"), ("pick", "y")]),
            vec![id(6), id(2), id(8)]
        );
        assert!(idx.intersect(&[]).is_empty());
        assert!(idx.intersect(&[("even", "y"), ("none", "x")]).is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8, u8, u64),
        Remove(u8, u8, u64),
        RemoveVector(u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..4, 0u8..4, 0u64..20).prop_map(|(k, v, i)| Op::Add(k, v, i)),
            (0u8..4, 0u8..4, 0u64..20).prop_map(|(k, v, i)| Op::Remove(k, v, i)),
            (0u64..20).prop_map(Op::RemoveVector),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_set_model(ops in prop::collection::vec(op_strategy(), 0..300)) {
            let mut idx = MetadataIndex::with_buckets(2);
            let mut model: BTreeMap<(String, String), BTreeSet<u64>> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Add(k, v, i) => {
                        let (k, v) = (k.to_string(), v.to_string());
                        idx.add(&k, &v, id(i)).unwrap();
                        model.entry((k, v)).or_default().insert(i);
                    }
                    Op::Remove(k, v, i) => {
                        let (k, v) = (k.to_string(), v.to_string());
                        let expected = model.get_mut(&(k.clone(), v.clone())).map_or(false, |s| s.remove(&i));
                        prop_assert_eq!(idx.remove(&k, &v, id(i)), expected);
                    }
                    Op::RemoveVector(i) => {
                        let expected = model.values_mut().map(|s| s.remove(&i)).filter(|&removed| removed).count();
                        prop_assert_eq!(idx.remove_vector(id(i)), expected);
                    }
                }
            }

            model.retain(|_, s| !s.is_empty());
            prop_assert_eq!(idx.len(), model.len());
            for ((k, v), set) in &model {
                let got: BTreeSet<u64> = idx.ids(k, v).iter().map(|x| x.as_u64()).collect();
                prop_assert_eq!(&got, set);
                prop_assert_eq!(idx.count(k, v), set.len());
            }
        }
    }
}
