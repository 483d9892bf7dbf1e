// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::serde::{Serializable, SerializeError};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

/// Disk format version
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Version {
    /// Version for 1.x.x releases
    V1,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u16::from(*self))
    }
}

impl From<Version> for u16 {
    fn from(value: Version) -> Self {
        match value {
            Version::V1 => 1,
        }
    }
}

impl TryFrom<u16> for Version {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            _ => Err(()),
        }
    }
}

pub const MAGIC_BYTES: [u8; 4] = [b'H', b'I', b'D', b'X'];

impl Version {
    // NOTE: Used in tests
    #[allow(unused)]
    pub(crate) fn len() -> u8 {
        6
    }
}

impl Serializable for Version {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), SerializeError> {
        writer.write_all(&MAGIC_BYTES)?;
        writer.write_u16::<BigEndian>((*self).into())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test_log::test]
    pub fn version_serialize() -> crate::Result<()> {
        let mut bytes = vec![];
        Version::V1.serialize(&mut bytes)?;
        assert_eq!(bytes, &[b'H', b'I', b'D', b'X', 0, 1]);
        assert_eq!(bytes.len(), usize::from(Version::len()));
        Ok(())
    }

    #[test_log::test]
    pub fn version_parse() {
        assert_eq!(Version::try_from(1), Ok(Version::V1));
        assert_eq!(Version::try_from(2), Err(()));
        assert_eq!(Version::try_from(0), Err(()));
    }
}
