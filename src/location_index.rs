// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::table::{HashIndex, Iter};
use crate::Error;
use std::path::Path;

/// Physical position of a stored object inside the segment log
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Location {
    /// Identifier of the segment file holding the object
    pub segment: u32,

    /// Byte offset of the object inside its segment file
    pub offset: u32,
}

impl From<[u32; 2]> for Location {
    fn from([segment, offset]: [u32; 2]) -> Self {
        Self { segment, offset }
    }
}

impl From<Location> for [u32; 2] {
    fn from(location: Location) -> Self {
        [location.segment, location.offset]
    }
}

/// Maps content fingerprints to the physical location of their objects
///
/// This is the lookup side of the store: given the fingerprint of an
/// object, it answers which segment file holds it and at which offset.
/// Probing, resizing and persistence are the shared [`HashIndex`] engine.
pub struct LocationIndex {
    inner: HashIndex<2>,
}

impl LocationIndex {
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

    /// Returns the number of indexed objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no objects are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if the fingerprint is indexed.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.inner.contains(key)
    }

    /// Retrieves the location of the object with the given fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the fingerprint is not indexed.
    pub fn get(&self, key: &[u8]) -> crate::Result<Location> {
        self.inner.get(key).map(Location::from).ok_or(Error::KeyNotFound)
    }

    /// Records the location of an object, replacing any previous location.
    pub fn insert(&mut self, key: &[u8], location: Location) {
        self.inner.insert(key, location.into());
    }

    /// Drops an object from the index.
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
    /// Will return `Err` if the file is not a location index with the given
    /// key size, or if it is corrupt.
    pub fn read<P: AsRef<Path>>(path: P, key_size: usize) -> crate::Result<Self> {
        Ok(Self {
            inner: HashIndex::read(path, key_size)?,
        })
    }

    /// Iterates over all `(fingerprint, location)` pairs in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Location)> {
        self.inner.iter().map(|(key, value)| (key, Location::from(value)))
    }

    /// Iterates over the pairs following `marker`, in bucket order.
    ///
    /// Markers stay valid only while the index is not mutated; see
    /// [`HashIndex::iter_from`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the marker key is not present.
    pub fn iter_from(&self, marker: &[u8]) -> crate::Result<LocationIter<'_>> {
        Ok(LocationIter {
            inner: self.inner.iter_from(marker)?,
        })
    }
}

/// Iterator over `(fingerprint, location)` pairs
#[must_use]
pub struct LocationIter<'a> {
    inner: Iter<'a, 2>,
}

impl<'a> Iterator for LocationIter<'a> {
    type Item = (&'a [u8], Location);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(key, value)| (key, Location::from(value)))
    }
}
