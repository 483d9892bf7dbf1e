// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::serde::{Deserializable, DeserializeError, Serializable, SerializeError};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Occupancy state of a bucket
///
/// A removed entry leaves a tombstone (`Deleted`), never an `Empty` bucket:
/// probe sequences of other keys may run through the slot and terminate at
/// the first truly empty bucket.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BucketState {
    /// Bucket has never held an entry
    Empty,

    /// Bucket holds a live entry
    Occupied,

    /// Bucket held an entry that was since removed (tombstone)
    Deleted,
}

impl BucketState {
    /// Returns `true` if the bucket holds a live entry.
    #[must_use]
    pub fn is_occupied(self) -> bool {
        self == Self::Occupied
    }
}

impl TryFrom<u8> for BucketState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Occupied),
            2 => Ok(Self::Deleted),
            _ => Err(()),
        }
    }
}

impl From<BucketState> for u8 {
    fn from(value: BucketState) -> Self {
        match value {
            BucketState::Empty => 0,
            BucketState::Occupied => 1,
            BucketState::Deleted => 2,
        }
    }
}

impl Serializable for BucketState {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), SerializeError> {
        writer.write_u8((*self).into())?;
        Ok(())
    }
}

impl Deserializable for BucketState {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self, DeserializeError> {
        let tag = reader.read_u8()?;
        Self::try_from(tag).map_err(|()| DeserializeError::InvalidTag(("BucketState", tag)))
    }
}
