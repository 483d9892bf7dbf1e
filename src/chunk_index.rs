// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::table::{HashIndex, Iter};
use crate::Error;
use std::path::Path;

/// Reference-counting and size metadata of one chunk
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChunkEntry {
    /// Number of references to the chunk
    ///
    /// A chunk with a positive refcount is already present in the store, so
    /// incoming data with the same fingerprint need not be stored again.
    pub refcount: u32,

    /// Uncompressed size of the chunk in bytes
    pub size: u32,

    /// Stored (compressed) size of the chunk in bytes
    pub csize: u32,
}

impl From<[u32; 3]> for ChunkEntry {
    fn from([refcount, size, csize]: [u32; 3]) -> Self {
        Self {
            refcount,
            size,
            csize,
        }
    }
}

impl From<ChunkEntry> for [u32; 3] {
    fn from(entry: ChunkEntry) -> Self {
        [entry.refcount, entry.size, entry.csize]
    }
}

/// Aggregate space accounting over every chunk of a [`ChunkIndex`]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ChunkStats {
    /// Number of distinct chunks
    pub unique_chunks: u64,

    /// Sum of all reference counts
    pub total_chunks: u64,

    /// Uncompressed size of all distinct chunks
    pub unique_size: u64,

    /// Stored size of all distinct chunks
    pub unique_csize: u64,

    /// Uncompressed size counting every reference
    pub total_size: u64,

    /// Stored size counting every reference
    pub total_csize: u64,
}

/// Maps content fingerprints to reference counts and sizes
///
/// This is the dedup side of the store: before storing an incoming chunk,
/// the writer asks this index whether the fingerprint already has a
/// positive refcount. Refcounts also drive garbage collection: a chunk
/// whose count drops to zero is reclaimable, and [`ChunkIndex::stats`]
/// yields the space accounting reports are built from.
pub struct ChunkIndex {
    inner: HashIndex<3>,
}

impl ChunkIndex {
    /// Creates an empty index for fingerprints of `key_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `key_size` is 0 or greater than 255.
    #[must_use]
    pub fn new(key_size: usize) -> Self {
        Self {
            inner: HashIndex::new(key_size),
        }
    }

    /// Creates an empty index pre-sized to at least `capacity` buckets.
    #[must_use]
    pub fn with_capacity(key_size: usize, capacity: usize) -> Self {
        Self {
            inner: HashIndex::with_capacity(key_size, capacity),
        }
    }

    /// Returns the number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no chunks are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if the fingerprint is indexed.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.inner.contains(key)
    }

    /// Retrieves the metadata of the chunk with the given fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the fingerprint is not indexed.
    pub fn get(&self, key: &[u8]) -> crate::Result<ChunkEntry> {
        self.inner
            .get(key)
            .map(ChunkEntry::from)
            .ok_or(Error::KeyNotFound)
    }

    /// Records a chunk's metadata, replacing any previous entry.
    pub fn insert(&mut self, key: &[u8], entry: ChunkEntry) {
        self.inner.insert(key, entry.into());
    }

    /// Drops a chunk from the index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the fingerprint is not indexed.
    pub fn remove(&mut self, key: &[u8]) -> crate::Result<()> {
        if self.inner.remove(key) {
            Ok(())
        } else {
            Err(Error::KeyNotFound)
        }
    }

    /// Increments a chunk's refcount, returning the new count.
    ///
    /// Saturates at `u32::MAX`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the fingerprint is not indexed.
    pub fn incref(&mut self, key: &[u8]) -> crate::Result<u32> {
        let mut entry = self.get(key)?;
        entry.refcount = entry.refcount.saturating_add(1);
        self.inner.insert(key, entry.into());
        Ok(entry.refcount)
    }

    /// Decrements a chunk's refcount, returning the new count.
    ///
    /// The entry stays in the index when its count reaches zero; whether to
    /// reclaim the chunk is the garbage collector's decision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the fingerprint is not indexed.
    ///
    /// # Panics
    ///
    /// Panics if the refcount is already zero.
    pub fn decref(&mut self, key: &[u8]) -> crate::Result<u32> {
        let mut entry = self.get(key)?;
        assert!(entry.refcount > 0, "refcount underflow");

        entry.refcount -= 1;
        self.inner.insert(key, entry.into());
        Ok(entry.refcount)
    }

    /// Computes aggregate space accounting over all chunks.
    #[must_use]
    pub fn stats(&self) -> ChunkStats {
        let mut stats = ChunkStats::default();

        for (_, value) in self.inner.iter() {
            let entry = ChunkEntry::from(value);

            stats.unique_chunks += 1;
            stats.total_chunks += u64::from(entry.refcount);
            stats.unique_size += u64::from(entry.size);
            stats.unique_csize += u64::from(entry.csize);
            stats.total_size += u64::from(entry.refcount) * u64::from(entry.size);
            stats.total_csize += u64::from(entry.refcount) * u64::from(entry.csize);
        }

        stats
    }

    /// Removes all entries, resetting the index to its minimum capacity.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Writes the index to the given file.
    ///
    /// See [`HashIndex::write`] for the determinism guarantees.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an I/O error occurs.
    pub fn write<P: AsRef<Path>>(&mut self, path: P) -> crate::Result<()> {
        self.inner.write(path)
    }

    /// Reads an index from the given file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the file is not a chunk index with the given
    /// key size, or if it is corrupt.
    pub fn read<P: AsRef<Path>>(path: P, key_size: usize) -> crate::Result<Self> {
        Ok(Self {
            inner: HashIndex::read(path, key_size)?,
        })
    }

    /// Iterates over all `(fingerprint, entry)` pairs in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], ChunkEntry)> {
        self.inner
            .iter()
            .map(|(key, value)| (key, ChunkEntry::from(value)))
    }

    /// Iterates over the pairs following `marker`, in bucket order.
    ///
    /// Markers stay valid only while the index is not mutated; see
    /// [`HashIndex::iter_from`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the marker key is not present.
    pub fn iter_from(&self, marker: &[u8]) -> crate::Result<ChunkIter<'_>> {
        Ok(ChunkIter {
            inner: self.inner.iter_from(marker)?,
        })
    }
}

/// Iterator over `(fingerprint, entry)` pairs
#[must_use]
pub struct ChunkIter<'a> {
    inner: Iter<'a, 3>,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = (&'a [u8], ChunkEntry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(key, value)| (key, ChunkEntry::from(value)))
    }
}
