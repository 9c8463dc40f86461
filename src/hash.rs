//! Seeded hashing for slot placement and signatures.
//!
//! Two independent key families: the placement family picks candidate slots
//! and is perturbed per candidate index and per seed variant (`hash_base`),
//! the signature family produces the compact stand-in stored in place of the
//! key once a table is sealed. The context is an explicit value owned by
//! whichever component configures the index; there is no process-global seed
//! state.

use std::hash::Hasher;

use siphasher::sip::SipHasher24;

// Stable across processes so an index built in one process can be reloaded
// in another without extra plumbing.
const DEFAULT_PLACEMENT_KEY: u64 = 0x9ae1_6a3b_2f90_404f;
const DEFAULT_SIGNATURE_KEY: u64 = 0x24b3_3ab3_8c9c_9f3b;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashContext {
    placement_key: u64,
    signature_key: u64,
}

impl HashContext {
    pub fn new(placement_key: u64, signature_key: u64) -> Self {
        Self {
            placement_key,
            signature_key,
        }
    }

    fn hash(k0: u64, k1: u64, data: &[u8]) -> u64 {
        let mut hasher = SipHasher24::new_with_keys(k0, k1);
        hasher.write(data);
        hasher.finish()
    }

    /// Candidate slot for `key` under hash function `candidate` at seed
    /// variant `hash_base`.
    pub(crate) fn slot(
        &self,
        key: &[u8],
        hash_base: u16,
        candidate: usize,
        table_size: usize,
    ) -> usize {
        let variant = u64::from(hash_base) ^ ((candidate as u64 + 1) << 12);
        (Self::hash(self.placement_key, variant, key) % table_size as u64) as usize
    }

    /// Compact stand-in for `key` in a sealed table. Never zero; zero is the
    /// empty-slot sentinel. Independent of `hash_base`, so signatures survive
    /// every rehash of the table that produced them.
    pub(crate) fn signature(&self, key: &[u8]) -> u16 {
        assert!(!key.is_empty(), "cannot hash an empty key");
        (Self::hash(self.signature_key, 0, key) % u64::from(u16::MAX)) as u16 + 1
    }
}

impl Default for HashContext {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEMENT_KEY, DEFAULT_SIGNATURE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_deterministic() {
        let ctx = HashContext::default();
        for candidate in 0..3 {
            assert_eq!(
                ctx.slot(b"some key", 5, candidate, 1024),
                ctx.slot(b"some key", 5, candidate, 1024),
            );
        }
    }

    #[test]
    fn test_slot_in_range() {
        let ctx = HashContext::default();
        for size in [1usize, 2, 18, 1024] {
            for i in 0..100u32 {
                let key = i.to_be_bytes();
                assert!(ctx.slot(&key, 0, 0, size) < size);
            }
        }
    }

    #[test]
    fn test_seed_variant_changes_placement() {
        let ctx = HashContext::default();
        let moved = (0..100u32)
            .filter(|i| {
                let key = i.to_be_bytes();
                ctx.slot(&key, 0, 0, 1024) != ctx.slot(&key, 1, 0, 1024)
            })
            .count();
        assert!(moved > 0, "seed variant must perturb placement");
    }

    #[test]
    fn test_candidates_are_independent() {
        let ctx = HashContext::default();
        let split = (0..100u32)
            .filter(|i| {
                let key = i.to_be_bytes();
                ctx.slot(&key, 0, 0, 1024) != ctx.slot(&key, 0, 1, 1024)
            })
            .count();
        assert!(split > 0, "candidate functions must not all agree");
    }

    #[test]
    fn test_signature_never_empty_sentinel() {
        let ctx = HashContext::default();
        for i in 0..1000u32 {
            assert_ne!(ctx.signature(&i.to_be_bytes()), 0);
        }
    }

    #[test]
    #[should_panic(expected = "cannot hash an empty key")]
    fn test_empty_key_rejected() {
        HashContext::default().signature(b"");
    }
}
