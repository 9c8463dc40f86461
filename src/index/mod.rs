//! Two-level point-lookup index over one immutable data segment.
//!
//! The sorted (key, location) output of a flush or compaction is sliced into
//! megablock-sized partitions, each covered by its own sealed cuckoo table
//! and boundary key. A lookup binary-searches the boundary keys, probes the
//! owning partition's table, and translates the partition-local block
//! numbers back to segment coordinates. The structure is read-only for its
//! whole lifetime after [`Index::build`] or [`Index::load`] and may be
//! shared freely across threads.

pub mod header;
pub mod partition;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use itertools::Itertools;

use crate::config::IndexConfig;
use crate::error::Result;
use crate::hash::HashContext;
use crate::location::Location;
use crate::Error;

use header::{checksum, Header, HEADER_SIZE};
pub use partition::Partition;

#[derive(Debug)]
pub struct Index {
    partitions: Vec<Partition>,
    megablock_size_blocks: u32,
}

impl Index {
    /// Builds the index from the sorted, duplicate-free output of a flush or
    /// compaction. The segment must begin at block 0 and cover its megablock
    /// windows densely, so that a partition's position alone determines its
    /// block offset.
    pub fn build(entries: &[(&[u8], Location)], ctx: HashContext, config: &IndexConfig) -> Index {
        assert!(!entries.is_empty(), "cannot index an empty segment");
        assert_eq!(
            entries[0].1.block_num, 0,
            "segment must begin at block 0"
        );
        debug_assert!(
            entries.iter().tuple_windows().all(|(a, b)| a.0 < b.0),
            "index input must be sorted ascending without duplicates"
        );
        debug_assert!(
            entries
                .iter()
                .tuple_windows()
                .all(|(a, b)| a.1.block_num <= b.1.block_num),
            "block numbers must not decrease across sorted entries"
        );

        let mut partitions = Vec::new();
        let mut cursor = 0;
        while cursor < entries.len() {
            debug_assert_eq!(
                entries[cursor].1.block_num / config.megablock_size_blocks,
                partitions.len() as u32,
                "segment leaves a megablock window empty"
            );
            partitions.push(Partition::build(entries, &mut cursor, ctx, config));
        }
        tracing::debug!(
            partitions = partitions.len(),
            entries = entries.len(),
            "built partitioned index"
        );

        Index {
            partitions,
            megablock_size_blocks: config.megablock_size_blocks,
        }
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Largest key covered by the index; lookups past it are caller misuse.
    pub fn max_key(&self) -> &[u8] {
        self.partitions
            .last()
            .expect("an index always holds at least one partition")
            .last_key()
    }

    /// Index of the partition whose key range contains `key`: the first
    /// partition whose boundary key is not below it, with partition 0
    /// absorbing everything at or below its boundary. `None` for a key past
    /// the last boundary, which means the caller queried outside the
    /// segment's range.
    pub fn search(&self, key: &[u8]) -> Option<usize> {
        let index = self.partitions.partition_point(|p| p.last_key() < key);
        if index == self.partitions.len() {
            debug_assert!(false, "lookup beyond the maximum indexed key");
            return None;
        }
        Some(index)
    }

    /// Candidate locations for `key` in segment-global block coordinates.
    /// Zero false negatives; any false positives are resolved by the caller
    /// reading the block and comparing the real key.
    pub fn get_possible_locations(&self, key: &[u8]) -> Vec<Location> {
        let Some(partition) = self.search(key) else {
            return Vec::new();
        };
        let mut locations = self.partitions[partition].find(key);
        let offset = partition as u32 * self.megablock_size_blocks;
        for location in &mut locations {
            location.block_num += offset;
        }
        locations
    }

    /// Serializes the index into a framed buffer: header, partition count,
    /// then each partition in order.
    pub fn save(&self) -> Result<Vec<u8>> {
        let payload_size =
            4 + self
                .partitions
                .iter()
                .map(Partition::encoded_size)
                .sum::<usize>();
        let mut payload = Vec::with_capacity(payload_size);
        payload
            .write_u32::<BigEndian>(self.partitions.len() as u32)
            .map_err(|e| Error::Encode("partition count", e))?;
        for partition in &self.partitions {
            partition.encode(&mut payload)?;
        }

        let mut buffer = Vec::with_capacity(HEADER_SIZE + payload.len());
        Header::new(checksum(&payload)).encode(&mut buffer)?;
        buffer.extend_from_slice(&payload);
        Ok(buffer)
    }

    /// Reloads a saved index. `ctx` and `config` must match the values the
    /// index was built with; they are not serialized.
    pub fn load(buffer: &[u8], ctx: HashContext, config: &IndexConfig) -> Result<Index> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::InvalidHeader);
        }
        let header = Header::decode(&mut &buffer[..HEADER_SIZE])?;
        let payload = &buffer[HEADER_SIZE..];
        if checksum(payload) != header.checksum {
            return Err(Error::ChecksumMismatch);
        }

        let mut reader = payload;
        let count = reader
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("partition count", e))? as usize;
        if count == 0 {
            return Err(Error::IndexCorruption("index with no partitions".to_string()));
        }

        let mut partitions = Vec::with_capacity(count);
        for _ in 0..count {
            partitions.push(Partition::decode(&mut reader, ctx, config.candidates)?);
        }
        if !reader.is_empty() {
            return Err(Error::IndexCorruption(format!(
                "{} trailing bytes after the last partition",
                reader.len()
            )));
        }
        if !partitions
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.last_key() < b.last_key())
        {
            return Err(Error::IndexCorruption(
                "partition boundary keys out of order".to_string(),
            ));
        }
        tracing::debug!(
            partitions = count,
            bytes = buffer.len(),
            "loaded partitioned index"
        );

        Ok(Index {
            partitions,
            megablock_size_blocks: config.megablock_size_blocks,
        })
    }
}
