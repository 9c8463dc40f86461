use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::config::IndexConfig;
use crate::cuckoo::{ReadableTable, WritableTable};
use crate::error::Result;
use crate::hash::HashContext;
use crate::location::Location;
use crate::Error;

/// One megablock of the index: a sealed cuckoo table over a contiguous run
/// of the sorted input, plus the maximum key stored in that run. Block
/// numbers inside the table are partition-local; the index translates them
/// back to segment coordinates on lookup.
#[derive(Debug)]
pub struct Partition {
    last_key: Vec<u8>,
    table: ReadableTable,
}

impl Partition {
    /// Consumes entries starting at `cursor` while the block span from the
    /// first entry's megablock-aligned start stays below the megablock size,
    /// builds and seals a cuckoo table over the run, and advances `cursor`
    /// past it. Input must be sorted ascending by key without duplicates.
    pub(crate) fn build(
        entries: &[(&[u8], Location)],
        cursor: &mut usize,
        ctx: HashContext,
        config: &IndexConfig,
    ) -> Partition {
        let megablock = config.megablock_size_blocks;
        let span_start = entries[*cursor].1.block_num / megablock * megablock;

        let mut last = *cursor;
        while last + 1 < entries.len()
            && entries[last + 1].1.block_num - span_start < megablock
        {
            last += 1;
        }

        let mut table = WritableTable::new(last - *cursor + 1, ctx, config);
        for i in *cursor..=last {
            debug_assert!(
                i == 0 || entries[i - 1].0 < entries[i].0,
                "index input must be sorted ascending without duplicates"
            );
            let (key, mut location) = entries[i];
            location.block_num -= span_start;
            table.insert(key, location);
        }
        let last_key = entries[last].0.to_vec();
        *cursor = last + 1;

        Partition {
            last_key,
            table: table.finalize(),
        }
    }

    /// Maximum key stored in this partition; the boundary the index binary
    /// searches on.
    pub fn last_key(&self) -> &[u8] {
        &self.last_key
    }

    /// Candidate locations for `key`, in partition-local block coordinates.
    pub fn find(&self, key: &[u8]) -> Vec<Location> {
        self.table.find(key)
    }

    pub(crate) fn encoded_size(&self) -> usize {
        4 + self.last_key.len() + self.table.encoded_size()
    }

    pub(crate) fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_u32::<BigEndian>(self.last_key.len() as u32)
            .map_err(|e| Error::Encode("boundary key length", e))?;
        writer
            .write_all(&self.last_key)
            .map_err(|e| Error::Encode("boundary key", e))?;
        self.table.encode(writer)
    }

    pub(crate) fn decode<R: Read>(
        reader: &mut R,
        ctx: HashContext,
        candidates: usize,
    ) -> Result<Self> {
        let key_len = reader
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("boundary key length", e))? as usize;
        if key_len == 0 {
            return Err(Error::IndexCorruption(
                "partition with an empty boundary key".to_string(),
            ));
        }

        let mut last_key = vec![0u8; key_len];
        reader
            .read_exact(&mut last_key)
            .map_err(|e| Error::Decode("boundary key", e))?;

        let table = ReadableTable::decode(reader, ctx, candidates)?;
        Ok(Partition { last_key, table })
    }
}
