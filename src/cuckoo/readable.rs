use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::cuckoo::WritableTable;
use crate::error::Result;
use crate::hash::HashContext;
use crate::location::{Location, LOCATION_SIZE};
use crate::Error;

/// Encoded size of one slot record: signature plus location.
pub(crate) const SLOT_SIZE: usize = 2 + LOCATION_SIZE;

#[derive(Debug, Clone, Copy)]
struct CompactSlot {
    // 0 is the empty sentinel; real signatures are 1..=u16::MAX.
    signature: u16,
    location: Location,
}

impl CompactSlot {
    const EMPTY: CompactSlot = CompactSlot {
        signature: 0,
        location: Location {
            block_num: 0,
            is_update: false,
            crosses_block: false,
        },
    };

    fn is_empty(&self) -> bool {
        self.signature == 0
    }
}

/// Sealed cuckoo table: a flat array of (signature, location) slots in the
/// same shape as the writable table it came from. Never mutated after
/// construction, so any number of threads may probe it concurrently without
/// locking.
#[derive(Debug)]
pub struct ReadableTable {
    hash_base: u16,
    slots: Vec<CompactSlot>,
    ctx: HashContext,
    candidates: usize,
}

impl ReadableTable {
    pub(crate) fn from_writable(source: &WritableTable) -> Self {
        let mut slots = vec![CompactSlot::EMPTY; source.slot_count()];
        for (i, entry) in source.slots().iter().enumerate() {
            if let Some(entry) = entry {
                slots[i] = CompactSlot {
                    signature: source.ctx().signature(&entry.key),
                    location: entry.location,
                };
            }
        }
        Self {
            hash_base: source.hash_base(),
            slots,
            ctx: *source.ctx(),
            candidates: source.candidates(),
        }
    }

    /// Candidate locations for `key`. A returned location is only a possible
    /// match, since two keys may share a signature; the caller resolves it by
    /// reading the block and comparing the real key. An inserted key always
    /// yields its location: signatures survive compaction verbatim and the
    /// probe order matches placement order.
    pub fn find(&self, key: &[u8]) -> Vec<Location> {
        let signature = self.ctx.signature(key);
        let mut locations = Vec::new();
        for candidate in 0..self.candidates {
            let index = self.ctx.slot(key, self.hash_base, candidate, self.slots.len());
            let slot = &self.slots[index];
            if slot.signature == signature {
                locations.push(slot.location);
            } else if slot.is_empty() {
                // Placement fills the first free candidate, so an empty slot
                // here proves the key was never inserted via this or any
                // later candidate.
                break;
            }
        }
        locations
    }

    pub(crate) fn encoded_size(&self) -> usize {
        2 + 4 + self.slots.len() * SLOT_SIZE
    }

    pub(crate) fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_u16::<BigEndian>(self.hash_base)
            .map_err(|e| Error::Encode("hash base", e))?;
        writer
            .write_u32::<BigEndian>(self.slots.len() as u32)
            .map_err(|e| Error::Encode("table size", e))?;
        for slot in &self.slots {
            writer
                .write_u16::<BigEndian>(slot.signature)
                .map_err(|e| Error::Encode("slot signature", e))?;
            slot.location.encode(writer)?;
        }
        Ok(())
    }

    pub(crate) fn decode<R: Read>(
        reader: &mut R,
        ctx: HashContext,
        candidates: usize,
    ) -> Result<Self> {
        let hash_base = reader
            .read_u16::<BigEndian>()
            .map_err(|e| Error::Decode("hash base", e))?;
        let size = reader
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("table size", e))? as usize;
        if size == 0 {
            return Err(Error::IndexCorruption(
                "cuckoo table with zero slots".to_string(),
            ));
        }

        let mut slots = Vec::with_capacity(size);
        for _ in 0..size {
            let signature = reader
                .read_u16::<BigEndian>()
                .map_err(|e| Error::Decode("slot signature", e))?;
            let location = Location::decode(reader)?;
            slots.push(CompactSlot {
                signature,
                location,
            });
        }
        Ok(Self {
            hash_base,
            slots,
            ctx,
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;

    fn sealed_with_keys(capacity: usize, keys: u32) -> ReadableTable {
        let mut table =
            WritableTable::new(capacity, HashContext::default(), &IndexConfig::default());
        for i in 0..keys {
            table.insert(&i.to_be_bytes(), Location::new(i, i % 2 == 0, false));
        }
        table.finalize()
    }

    #[test]
    fn test_find_returns_inserted_locations() {
        let sealed = sealed_with_keys(32, 32);
        for i in 0..32u32 {
            let found = sealed.find(&i.to_be_bytes());
            assert!(found.contains(&Location::new(i, i % 2 == 0, false)));
        }
    }

    #[test]
    fn test_sparse_table_rejects_absent_keys() {
        // One occupied slot out of nine: an absent key's probe hits an empty
        // slot almost immediately and the scan stops there.
        let sealed = sealed_with_keys(8, 1);
        for i in 1000..1005u32 {
            assert!(sealed.find(&i.to_be_bytes()).is_empty());
        }
    }

    #[test]
    fn test_codec_round_trip() {
        let sealed = sealed_with_keys(16, 16);
        let mut buffer = Vec::new();
        sealed.encode(&mut buffer).unwrap();
        assert_eq!(buffer.len(), sealed.encoded_size());

        let decoded =
            ReadableTable::decode(&mut buffer.as_slice(), HashContext::default(), 3).unwrap();
        for i in 0..16u32 {
            assert_eq!(decoded.find(&i.to_be_bytes()), sealed.find(&i.to_be_bytes()));
        }
    }

    #[test]
    fn test_truncated_table_is_a_decode_error() {
        let sealed = sealed_with_keys(16, 16);
        let mut buffer = Vec::new();
        sealed.encode(&mut buffer).unwrap();
        buffer.truncate(buffer.len() - 3);

        let err = ReadableTable::decode(&mut buffer.as_slice(), HashContext::default(), 3)
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_, _)));
    }
}
