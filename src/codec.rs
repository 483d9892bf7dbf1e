// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::bucket::BucketState;
use crate::serde::{Deserializable, DeserializeError, Serializable, SerializeError};
use crate::store::BucketStore;
use crate::table::HashIndex;
use crate::version::{Version, MAGIC_BYTES};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Bytes per value word
const VALUE_WIDTH: u8 = 4;

// File layout, all integers big-endian:
//
// magic (4) | version (2) | key size (1) | value arity (1) | value width (1)
// | capacity (8) | live entries (8)
// | capacity × [ state tag (1) | key bytes | arity × width value bytes ]

impl<const N: usize> Serializable for HashIndex<N> {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), SerializeError> {
        let store = self.store();

        Version::V1.serialize(writer)?;

        // NOTE: Key sizes are limited to 255 at construction,
        // value arities in use are 2 and 3
        #[allow(clippy::cast_possible_truncation)]
        let (key_size, value_arity) = (store.key_size() as u8, N as u8);

        writer.write_u8(key_size)?;
        writer.write_u8(value_arity)?;
        writer.write_u8(VALUE_WIDTH)?;
        writer.write_u64::<BigEndian>(store.capacity() as u64)?;
        writer.write_u64::<BigEndian>(self.len() as u64)?;

        let zero_key = vec![0; store.key_size()];

        for idx in 0..store.capacity() {
            let state = store.state(idx);
            state.serialize(writer)?;

            if state.is_occupied() {
                writer.write_all(store.key(idx))?;

                for word in store.value(idx) {
                    writer.write_u32::<BigEndian>(word)?;
                }
            } else {
                // Vacant buckets carry no entry; zeroed padding keeps the
                // emitted bytes a function of the logical content alone
                writer.write_all(&zero_key)?;

                for _ in 0..N {
                    writer.write_u32::<BigEndian>(0)?;
                }
            }
        }

        Ok(())
    }
}

impl<const N: usize> HashIndex<N> {
    /// Writes the table to the given file, truncating it if it exists.
    ///
    /// The table is first rebuilt at its canonical capacity, dropping any
    /// tombstones, so the emitted bytes depend only on the key/value set:
    /// tables holding the same entries write identical files no matter the
    /// operation history that produced them, and every empty table writes
    /// the same minimum-size file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an I/O error occurs.
    pub fn write<P: AsRef<Path>>(&mut self, path: P) -> crate::Result<()> {
        let path = path.as_ref();

        log::debug!("Writing index with {} entries to {path:?}", self.len());

        self.compact();
        debug_assert_eq!(0, self.tombstones());

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.serialize(&mut writer)?;
        writer.flush()?;

        Ok(())
    }

    /// Reads a table from the given file.
    ///
    /// `key_size` must match the key size the file was written with.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the header is malformed or of an unsupported
    /// version, if the key or value sizes do not match, if the file
    /// contradicts its own header, or if an I/O error occurs.
    pub fn read<P: AsRef<Path>>(path: P, key_size: usize) -> crate::Result<Self> {
        let path = path.as_ref();

        log::debug!("Reading index from {path:?}");

        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::decode_from(&mut reader, key_size)
    }

    pub(crate) fn decode_from<R: Read>(reader: &mut R, key_size: usize) -> crate::Result<Self> {
        assert!(
            (1..=255).contains(&key_size),
            "key size should be in 1..=255",
        );

        let mut magic = [0u8; MAGIC_BYTES.len()];
        reader.read_exact(&mut magic)?;

        if magic != MAGIC_BYTES {
            return Err(crate::Error::Deserialize(DeserializeError::InvalidHeader(
                "HashIndex",
            )));
        }

        let version = reader.read_u16::<BigEndian>()?;
        Version::try_from(version).map_err(|()| crate::Error::InvalidVersion(version))?;

        let stored_key_size = reader.read_u8()?;

        // NOTE: Key sizes are limited to 255, checked above
        #[allow(clippy::cast_possible_truncation)]
        let expected_key_size = key_size as u8;

        if stored_key_size != expected_key_size {
            return Err(crate::Error::KeySizeMismatch((
                stored_key_size,
                expected_key_size,
            )));
        }

        let value_arity = reader.read_u8()?;
        let value_width = reader.read_u8()?;

        // NOTE: Value arities in use are 2 and 3
        #[allow(clippy::cast_possible_truncation)]
        let expected_arity = N as u8;

        if value_arity != expected_arity || value_width != VALUE_WIDTH {
            return Err(crate::Error::ValueSizeMismatch((
                value_arity.saturating_mul(value_width),
                expected_arity * VALUE_WIDTH,
            )));
        }

        let capacity = reader.read_u64::<BigEndian>()?;
        let declared_len = reader.read_u64::<BigEndian>()?;

        if capacity == 0 {
            return Err(crate::Error::Corrupted("capacity must not be zero"));
        }
        if declared_len > capacity {
            return Err(crate::Error::Corrupted("entry count exceeds capacity"));
        }

        let capacity = usize::try_from(capacity)
            .map_err(|_| crate::Error::Corrupted("capacity overflows usize"))?;

        let mut store = BucketStore::<N>::with_capacity(key_size, capacity);
        let mut live: usize = 0;
        let mut tombstones: usize = 0;

        let mut key = vec![0; key_size];

        for idx in 0..capacity {
            let state = BucketState::deserialize(reader)?;

            reader.read_exact(&mut key)?;

            let mut value = [0u32; N];
            for word in &mut value {
                *word = reader.read_u32::<BigEndian>()?;
            }

            match state {
                BucketState::Occupied => {
                    live += 1;
                    store.set_entry(idx, &key, value);
                }
                BucketState::Deleted => {
                    tombstones += 1;
                    store.set_state(idx, BucketState::Deleted);
                }
                BucketState::Empty => {}
            }
        }

        if live as u64 != declared_len {
            return Err(crate::Error::Corrupted("live entry count mismatch"));
        }

        Ok(Self::from_parts(store, live, tombstones))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_log::test;

    fn make_key(x: usize) -> Vec<u8> {
        format!("{x:032}").into_bytes()
    }

    fn encode<const N: usize>(table: &HashIndex<N>) -> Vec<u8> {
        let mut bytes = vec![];
        table.serialize(&mut bytes).unwrap();
        bytes
    }

    // header offsets
    const VERSION_POS: usize = 4;
    const LEN_POS: usize = 17;

    #[test]
    fn codec_roundtrip() -> crate::Result<()> {
        let mut table = HashIndex::<3>::new(32);

        for x in 0..100 {
            table.insert(&make_key(x), [x as u32, 1, 2]);
        }

        let bytes = encode(&table);
        let decoded = HashIndex::<3>::decode_from(&mut Cursor::new(&bytes), 32)?;

        assert_eq!(100, decoded.len());
        assert_eq!(table.capacity(), decoded.capacity());

        for x in 0..100 {
            assert_eq!(Some([x as u32, 1, 2]), decoded.get(&make_key(x)));
        }

        Ok(())
    }

    #[test]
    fn codec_roundtrip_preserves_tombstones() -> crate::Result<()> {
        let mut table = HashIndex::<2>::new(32);

        for x in 0..100 {
            table.insert(&make_key(x), [x as u32, 0]);
        }
        for x in 0..50 {
            assert!(table.remove(&make_key(x)));
        }

        // serialized directly, without the canonicalization `write` performs
        let bytes = encode(&table);
        let decoded = HashIndex::<2>::decode_from(&mut Cursor::new(&bytes), 32)?;

        assert_eq!(50, decoded.len());

        for x in 50..100 {
            assert_eq!(Some([x as u32, 0]), decoded.get(&make_key(x)));
        }
        for x in 0..50 {
            assert_eq!(None, decoded.get(&make_key(x)));
        }

        Ok(())
    }

    #[test]
    fn codec_bad_magic() {
        let bytes = {
            let mut bytes = encode(&HashIndex::<2>::new(32));
            *bytes.first_mut().unwrap() = b'!';
            bytes
        };

        assert!(matches!(
            HashIndex::<2>::decode_from(&mut Cursor::new(&bytes), 32),
            Err(crate::Error::Deserialize(DeserializeError::InvalidHeader(
                "HashIndex"
            ))),
        ));
    }

    #[test]
    fn codec_unsupported_version() {
        let bytes = {
            let mut bytes = encode(&HashIndex::<2>::new(32));
            *bytes.get_mut(VERSION_POS + 1).unwrap() = 2;
            bytes
        };

        assert!(matches!(
            HashIndex::<2>::decode_from(&mut Cursor::new(&bytes), 32),
            Err(crate::Error::InvalidVersion(2)),
        ));
    }

    #[test]
    fn codec_key_size_mismatch() {
        let bytes = encode(&HashIndex::<2>::new(32));

        assert!(matches!(
            HashIndex::<2>::decode_from(&mut Cursor::new(&bytes), 16),
            Err(crate::Error::KeySizeMismatch((32, 16))),
        ));
    }

    #[test]
    fn codec_value_size_mismatch() {
        let bytes = encode(&HashIndex::<3>::new(32));

        assert!(matches!(
            HashIndex::<2>::decode_from(&mut Cursor::new(&bytes), 32),
            Err(crate::Error::ValueSizeMismatch((12, 8))),
        ));
    }

    #[test]
    fn codec_count_mismatch() {
        let bytes = {
            let mut bytes = encode(&HashIndex::<2>::new(32));
            *bytes.get_mut(LEN_POS + 7).unwrap() = 1;
            bytes
        };

        assert!(matches!(
            HashIndex::<2>::decode_from(&mut Cursor::new(&bytes), 32),
            Err(crate::Error::Corrupted("live entry count mismatch")),
        ));
    }

    #[test]
    fn codec_truncated() {
        let bytes = {
            let mut bytes = encode(&HashIndex::<2>::new(32));
            bytes.truncate(bytes.len() / 2);
            bytes
        };

        assert!(HashIndex::<2>::decode_from(&mut Cursor::new(&bytes), 32).is_err());
    }

    #[test]
    fn codec_invalid_state_tag() {
        let bytes = {
            let mut bytes = encode(&HashIndex::<2>::new(32));
            // first bucket's state tag
            *bytes.get_mut(LEN_POS + 8).unwrap() = 9;
            bytes
        };

        assert!(matches!(
            HashIndex::<2>::decode_from(&mut Cursor::new(&bytes), 32),
            Err(crate::Error::Deserialize(DeserializeError::InvalidTag((
                "BucketState",
                9
            )))),
        ));
    }
}
