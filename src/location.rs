use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Result;
use crate::Error;

/// Encoded size of a [`Location`] in bytes.
pub const LOCATION_SIZE: usize = 6;

/// On-disk coordinates of a candidate record, opaque to the index beyond
/// being copied verbatim. Block numbers are partition-local inside a sealed
/// table and rewritten to segment-global coordinates on lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Block holding the record
    pub block_num: u32,
    /// Record is a partial update rather than a final value
    pub is_update: bool,
    /// Record continues past the end of its starting block
    pub crosses_block: bool,
}

impl Location {
    pub fn new(block_num: u32, is_update: bool, crosses_block: bool) -> Self {
        Self {
            block_num,
            is_update,
            crosses_block,
        }
    }

    pub(crate) fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_u32::<BigEndian>(self.block_num)
            .map_err(|e| Error::Encode("block number", e))?;
        writer
            .write_u8(self.is_update as u8)
            .map_err(|e| Error::Encode("update flag", e))?;
        writer
            .write_u8(self.crosses_block as u8)
            .map_err(|e| Error::Encode("cross-block flag", e))?;
        Ok(())
    }

    pub(crate) fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let block_num = reader
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("block number", e))?;
        let is_update = reader
            .read_u8()
            .map_err(|e| Error::Decode("update flag", e))?
            != 0;
        let crosses_block = reader
            .read_u8()
            .map_err(|e| Error::Decode("cross-block flag", e))?
            != 0;
        Ok(Self {
            block_num,
            is_update,
            crosses_block,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_size() {
        let mut buffer = Vec::new();
        Location::new(42, true, false).encode(&mut buffer).unwrap();
        assert_eq!(buffer.len(), LOCATION_SIZE);
    }

    #[test]
    fn test_round_trip() {
        let location = Location::new(0xdead_beef, true, true);
        let mut buffer = Vec::new();
        location.encode(&mut buffer).unwrap();
        assert_eq!(
            Location::decode(&mut buffer.as_slice()).unwrap(),
            location
        );
    }

    #[test]
    fn test_truncated_buffer() {
        let mut buffer = Vec::new();
        Location::new(7, false, false).encode(&mut buffer).unwrap();
        buffer.truncate(3);

        let err = Location::decode(&mut buffer.as_slice()).unwrap_err();
        assert!(matches!(err, Error::Decode("block number", _)));
    }
}
