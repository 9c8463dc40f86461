use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use crc::Crc;

use crate::error::Result;
use crate::Error;

pub const HEADER_SIZE: usize = 14;
pub const MAGIC_NUMBER: u32 = 0x43_49_44_58; // ASCII "CIDX"
pub const FORMAT_VERSION: u16 = 1;

const CRC64: Crc<u64> = Crc::<u64>::new(&crc::CRC_64_ECMA_182);

/// Checksum over a serialized index payload.
pub fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// Frames a serialized index buffer. The loader rejects anything that does
/// not carry the expected magic and version or whose payload fails the
/// checksum, rather than deserializing garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic_number: u32,
    pub version: u16,
    pub checksum: u64,
}

impl Header {
    pub fn new(checksum: u64) -> Self {
        Header {
            magic_number: MAGIC_NUMBER,
            version: FORMAT_VERSION,
            checksum,
        }
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_u32::<BigEndian>(self.magic_number)
            .map_err(|e| Error::Encode("magic number", e))?;
        writer
            .write_u16::<BigEndian>(self.version)
            .map_err(|e| Error::Encode("version", e))?;
        writer
            .write_u64::<BigEndian>(self.checksum)
            .map_err(|e| Error::Encode("checksum", e))?;
        Ok(())
    }

    pub fn decode<R: Read>(reader: &mut R) -> Result<Header> {
        let magic_number = reader
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("magic number", e))?;
        if magic_number != MAGIC_NUMBER {
            return Err(Error::InvalidHeader);
        }

        let version = reader
            .read_u16::<BigEndian>()
            .map_err(|e| Error::Decode("version", e))?;
        if version != FORMAT_VERSION {
            return Err(Error::InvalidHeader);
        }

        let checksum = reader
            .read_u64::<BigEndian>()
            .map_err(|e| Error::Decode("checksum", e))?;

        Ok(Header {
            magic_number,
            version,
            checksum,
        })
    }
}
