// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::bucket::BucketState;

/// Fixed-capacity array of buckets
///
/// Each bucket is one state tag, `key_size` key bytes and `N` value words,
/// stored column-wise. The store never resizes itself: probe sequences
/// depend on the capacity, so resizing always means building a fresh store
/// and moving every live entry into it.
pub struct BucketStore<const N: usize> {
    key_size: usize,
    states: Box<[BucketState]>,
    keys: Box<[u8]>,
    values: Box<[[u32; N]]>,
}

impl<const N: usize> BucketStore<N> {
    /// Creates a store of `capacity` empty buckets.
    #[must_use]
    pub fn with_capacity(key_size: usize, capacity: usize) -> Self {
        assert!(
            (1..=255).contains(&key_size),
            "key size should be in 1..=255",
        );
        assert!(capacity > 0, "capacity should be positive");

        Self {
            key_size,
            states: vec![BucketState::Empty; capacity].into_boxed_slice(),
            keys: vec![0; capacity * key_size].into_boxed_slice(),
            values: vec![[0; N]; capacity].into_boxed_slice(),
        }
    }

    /// Number of buckets.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.states.len()
    }

    /// Width of every key in this store, in bytes.
    #[must_use]
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    pub fn state(&self, idx: usize) -> BucketState {
        *self.states.get(idx).expect("bucket index should be in bounds")
    }

    pub fn set_state(&mut self, idx: usize, state: BucketState) {
        *self
            .states
            .get_mut(idx)
            .expect("bucket index should be in bounds") = state;
    }

    /// Key bytes of the given bucket.
    ///
    /// Only meaningful while the bucket is occupied.
    pub fn key(&self, idx: usize) -> &[u8] {
        let start = idx * self.key_size;
        self.keys
            .get(start..start + self.key_size)
            .expect("bucket index should be in bounds")
    }

    pub fn value(&self, idx: usize) -> [u32; N] {
        *self.values.get(idx).expect("bucket index should be in bounds")
    }

    pub fn set_value(&mut self, idx: usize, value: [u32; N]) {
        *self
            .values
            .get_mut(idx)
            .expect("bucket index should be in bounds") = value;
    }

    /// Stores a live entry in the given bucket.
    pub fn set_entry(&mut self, idx: usize, key: &[u8], value: [u32; N]) {
        debug_assert_eq!(key.len(), self.key_size);

        let start = idx * self.key_size;
        self.keys
            .get_mut(start..start + self.key_size)
            .expect("bucket index should be in bounds")
            .copy_from_slice(key);

        self.set_value(idx, value);
        self.set_state(idx, BucketState::Occupied);
    }
}
