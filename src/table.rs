// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::bucket::BucketState;
use crate::hash::hash64;
use crate::store::BucketStore;

/// Smallest bucket count a table ever has.
///
/// Shrinking stops here, so every empty table occupies the same (minimum)
/// number of buckets and serializes to the same minimum-size file.
pub(crate) const MIN_CAPACITY: usize = 1024;

/// Smallest capacity in the doubling sequence that keeps the load factor at
/// or below 2/3 for `len` live entries.
fn capacity_for(len: usize) -> usize {
    let mut capacity = MIN_CAPACITY;

    while len * 3 > capacity * 2 {
        capacity *= 2;
    }

    capacity
}

fn start_bucket(key: &[u8], capacity: usize) -> usize {
    (hash64(key) % capacity as u64) as usize
}

/// First empty bucket at or after `start`, wrapping around.
///
/// Only valid for stores without tombstones (freshly rebuilt ones).
fn vacant_bucket<const N: usize>(store: &BucketStore<N>, start: usize) -> usize {
    let capacity = store.capacity();

    for i in 0..capacity {
        let idx = (start + i) % capacity;

        if store.state(idx) == BucketState::Empty {
            return idx;
        }
    }

    unreachable!("store should never be full")
}

enum Probe {
    /// Bucket holding the probed key
    Hit(usize),

    /// First reusable bucket along the probed key's probe sequence
    Miss(usize),
}

/// Open-addressed hash table over fixed-size binary keys
///
/// Keys are `key_size` bytes, values are `N` 32-bit words. Collisions are
/// resolved by linear probing; removals leave tombstones that are dropped
/// on the next rehash. The table grows once more than 2/3 of its buckets
/// are occupied or tombstoned, and shrinks back once fewer than 1/8 hold
/// live entries, never below its minimum capacity.
///
/// This is the shared engine; [`crate::LocationIndex`] and
/// [`crate::ChunkIndex`] fix `N` and give the value words domain meaning.
pub struct HashIndex<const N: usize> {
    store: BucketStore<N>,
    len: usize,
    tombstones: usize,
}

impl<const N: usize> HashIndex<N> {
    /// Creates an empty table for keys of `key_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `key_size` is 0 or greater than 255.
    #[must_use]
    pub fn new(key_size: usize) -> Self {
        Self::with_capacity(key_size, MIN_CAPACITY)
    }

    /// Creates an empty table pre-sized to at least `capacity` buckets.
    ///
    /// Pre-sizing avoids intermediate rehashes when the rough number of
    /// entries is known up front; it does not change any other behavior.
    #[must_use]
    pub fn with_capacity(key_size: usize, capacity: usize) -> Self {
        let mut rounded = MIN_CAPACITY;

        while rounded < capacity {
            rounded *= 2;
        }

        Self {
            store: BucketStore::with_capacity(key_size, rounded),
            len: 0,
            tombstones: 0,
        }
    }

    pub(crate) fn from_parts(store: BucketStore<N>, len: usize, tombstones: usize) -> Self {
        Self {
            store,
            len,
            tombstones,
        }
    }

    pub(crate) fn store(&self) -> &BucketStore<N> {
        &self.store
    }

    pub(crate) fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Width of every key in this table, in bytes.
    #[must_use]
    pub fn key_size(&self) -> usize {
        self.store.key_size()
    }

    /// Current number of buckets.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    fn probe(&self, key: &[u8]) -> Probe {
        assert_eq!(key.len(), self.store.key_size(), "invalid key size");

        let capacity = self.store.capacity();
        let start = start_bucket(key, capacity);
        let mut free = None;

        for i in 0..capacity {
            let idx = (start + i) % capacity;

            match self.store.state(idx) {
                BucketState::Occupied => {
                    if self.store.key(idx) == key {
                        return Probe::Hit(idx);
                    }
                }
                BucketState::Deleted => {
                    if free.is_none() {
                        free = Some(idx);
                    }
                }
                BucketState::Empty => {
                    return Probe::Miss(free.unwrap_or(idx));
                }
            }
        }

        // The resize controller keeps occupied + tombstone density strictly
        // below capacity, so the scan terminates at an empty bucket.
        Probe::Miss(free.expect("load factor invariant should hold"))
    }

    /// Retrieves the value of the given key.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<[u32; N]> {
        match self.probe(key) {
            Probe::Hit(idx) => Some(self.store.value(idx)),
            Probe::Miss(_) => None,
        }
    }

    /// Returns `true` if the key exists.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        matches!(self.probe(key), Probe::Hit(_))
    }

    /// Inserts a key-value pair, replacing the value of an existing key
    /// in place.
    pub fn insert(&mut self, key: &[u8], value: [u32; N]) {
        match self.probe(key) {
            Probe::Hit(idx) => {
                self.store.set_value(idx, value);
            }
            Probe::Miss(idx) => {
                if self.store.state(idx) == BucketState::Deleted {
                    self.tombstones -= 1;
                }

                self.store.set_entry(idx, key, value);
                self.len += 1;

                if (self.len + self.tombstones) * 3 > self.store.capacity() * 2 {
                    self.rehash(capacity_for(self.len));
                }
            }
        }
    }

    /// Removes a key, leaving a tombstone in its bucket.
    ///
    /// Returns `false` if the key did not exist.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        match self.probe(key) {
            Probe::Hit(idx) => {
                self.store.set_state(idx, BucketState::Deleted);
                self.len -= 1;
                self.tombstones += 1;

                let capacity = self.store.capacity();

                if capacity > MIN_CAPACITY && self.len * 8 < capacity {
                    self.rehash(capacity_for(self.len));
                }

                true
            }
            Probe::Miss(_) => false,
        }
    }

    /// Removes all entries, resetting the table to its minimum capacity.
    pub fn clear(&mut self) {
        self.store = BucketStore::with_capacity(self.store.key_size(), MIN_CAPACITY);
        self.len = 0;
        self.tombstones = 0;
    }

    /// Rebuilds the table at its canonical capacity, dropping all tombstones.
    pub(crate) fn compact(&mut self) {
        self.rehash(capacity_for(self.len));
    }

    fn rehash(&mut self, capacity: usize) {
        debug_assert!(capacity >= MIN_CAPACITY);
        debug_assert!(self.len * 3 <= capacity * 2);

        log::debug!(
            "Rehashing into {capacity} buckets ({} live entries, {} tombstones dropped)",
            self.len,
            self.tombstones,
        );

        // Reinsert in (start bucket, key) order. Linear probing places
        // colliding keys in insertion order, so a fixed reinsertion order
        // makes the rebuilt layout a function of the key set alone, not of
        // the operation history that produced the old layout.
        let mut entries: Vec<(usize, usize)> = (0..self.store.capacity())
            .filter(|&idx| self.store.state(idx).is_occupied())
            .map(|idx| (start_bucket(self.store.key(idx), capacity), idx))
            .collect();

        entries.sort_unstable_by(|&(start_a, a), &(start_b, b)| {
            start_a
                .cmp(&start_b)
                .then_with(|| self.store.key(a).cmp(self.store.key(b)))
        });

        let mut next = BucketStore::with_capacity(self.store.key_size(), capacity);

        for (start, idx) in entries {
            let slot = vacant_bucket(&next, start);
            next.set_entry(slot, self.store.key(idx), self.store.value(idx));
        }

        self.store = next;
        self.tombstones = 0;
    }

    /// Iterates over all live entries in bucket order.
    pub fn iter(&self) -> Iter<'_, N> {
        Iter {
            table: self,
            pos: 0,
        }
    }

    /// Iterates over the live entries following `marker`, in bucket order.
    ///
    /// The produced sequence is exactly the suffix of [`HashIndex::iter`]
    /// that begins after the marker key. Markers are resolved against the
    /// current bucket layout, so they stay valid only while the table is
    /// not mutated between calls.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::KeyNotFound`] if the marker key is not
    /// present.
    pub fn iter_from(&self, marker: &[u8]) -> crate::Result<Iter<'_, N>> {
        match self.probe(marker) {
            Probe::Hit(idx) => Ok(Iter {
                table: self,
                pos: idx + 1,
            }),
            Probe::Miss(_) => Err(crate::Error::KeyNotFound),
        }
    }
}

/// Iterator over the live entries of a [`HashIndex`], in bucket order
#[must_use]
pub struct Iter<'a, const N: usize> {
    table: &'a HashIndex<N>,
    pos: usize,
}

impl<'a, const N: usize> Iterator for Iter<'a, N> {
    type Item = (&'a [u8], [u32; N]);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.table.store.capacity() {
            let idx = self.pos;
            self.pos += 1;

            if self.table.store.state(idx).is_occupied() {
                return Some((self.table.store.key(idx), self.table.store.value(idx)));
            }
        }

        None
    }
}
