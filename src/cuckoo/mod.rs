//! Cuckoo hash tables backing one index partition.
//!
//! A [`WritableTable`] is filled once by a single writer during flush or
//! compaction, then sealed into a [`ReadableTable`] that stores a compact
//! signature instead of the key and serves lock-free concurrent lookups.

pub mod readable;
pub mod writable;

pub use readable::ReadableTable;
pub use writable::WritableTable;
