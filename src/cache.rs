//! Operation caches (computed tables) memoizing the recursive kernel algorithms.
//!
//! A cache is a flat, prime-sized array indexed by `hash mod size`. There is no
//! chaining: a new result simply overwrites whatever occupied its slot, so a lookup
//! may miss a result computed earlier but never returns a wrong one. Every entry
//! stores its full key `(a, b, c)`, and `c` carries the operation tag, so algorithms
//! that share a cache instance never confuse each other's results.

use crate::prime::prime_gte;

#[derive(Debug, Clone)]
struct Entry<V> {
    a: u32,
    b: u32,
    c: u64,
    value: V,
}

#[derive(Debug)]
pub(crate) struct OpCache<V> {
    entries: Vec<Option<Entry<V>>>,
    hits: usize,
    misses: usize,
}

impl<V: Clone> OpCache<V> {
    pub fn new(size: usize) -> Self {
        let size = prime_gte(size.max(1));
        Self {
            entries: std::iter::repeat_with(|| None).take(size).collect(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    #[inline]
    fn index(&self, hash: u64) -> usize {
        (hash % self.entries.len() as u64) as usize
    }

    /// Get the result stored for the key `(a, b, c)`.
    pub fn get(&mut self, hash: u64, a: u32, b: u32, c: u64) -> Option<V> {
        let index = self.index(hash);
        match &self.entries[index] {
            Some(entry) if entry.a == a && entry.b == b && entry.c == c => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a result, overwriting the slot's previous content.
    pub fn insert(&mut self, hash: u64, a: u32, b: u32, c: u64, value: V) {
        let index = self.index(hash);
        self.entries[index] = Some(Entry { a, b, c, value });
    }

    /// Drop all entries.
    pub fn reset(&mut self) {
        self.entries.fill_with(|| None);
    }

    /// Reallocate with at least `size` entries, dropping all results.
    pub fn resize(&mut self, size: usize) {
        let size = prime_gte(size.max(1));
        self.entries.clear();
        self.entries.resize_with(size, || None);
    }
}
