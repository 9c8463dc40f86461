use std::collections::HashSet;

use crate::config::IndexConfig;
use crate::cuckoo::ReadableTable;
use crate::hash::HashContext;
use crate::location::Location;

// Headroom over the caller's capacity hint. Cuckoo placement needs a load
// factor below 1.0 to terminate without growing in the common case; 72/64
// keeps it around 0.89 for a full table.
const OVERCOMMIT_NUM: usize = 72;
const OVERCOMMIT_DEN: usize = 64;

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub key: Vec<u8>,
    pub location: Location,
}

/// Mutable cuckoo table holding full keys. Filled by exactly one writer:
/// every mutator takes `&mut self`, so concurrent access during build is
/// ruled out at the type level. Sealed into a [`ReadableTable`] once the
/// partition's run of entries has been inserted.
#[derive(Debug)]
pub struct WritableTable {
    slots: Vec<Option<Entry>>,
    hash_base: u16,
    num_keys: usize,
    initial_slots: usize,
    ctx: HashContext,
    candidates: usize,
    seed_variants: u16,
}

impl WritableTable {
    /// Allocates a table with overcommit headroom over `capacity_hint` keys.
    pub fn new(capacity_hint: usize, ctx: HashContext, config: &IndexConfig) -> Self {
        assert!(capacity_hint > 0, "table capacity hint must be non-zero");
        let slots = (capacity_hint * OVERCOMMIT_NUM / OVERCOMMIT_DEN).max(1);
        Self::with_slots(slots, 0, slots, ctx, config.candidates, config.seed_variants)
    }

    fn with_slots(
        slots: usize,
        hash_base: u16,
        initial_slots: usize,
        ctx: HashContext,
        candidates: usize,
        seed_variants: u16,
    ) -> Self {
        Self {
            slots: vec![None; slots],
            hash_base,
            num_keys: 0,
            initial_slots,
            ctx,
            candidates,
            seed_variants,
        }
    }

    /// Number of keys inserted so far.
    pub fn len(&self) -> usize {
        self.num_keys
    }

    pub fn is_empty(&self) -> bool {
        self.num_keys == 0
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slots(&self) -> &[Option<Entry>] {
        &self.slots
    }

    pub(crate) fn hash_base(&self) -> u16 {
        self.hash_base
    }

    pub(crate) fn ctx(&self) -> &HashContext {
        &self.ctx
    }

    pub(crate) fn candidates(&self) -> usize {
        self.candidates
    }

    /// Inserts a key. Infallible from the caller's perspective: placement
    /// failure triggers a rehash at the next seed variant or a larger size,
    /// and only exhausting that bounded retry count panics. That indicates a
    /// capacity or hash quality defect, not a runtime condition.
    pub fn insert(&mut self, key: &[u8], location: Location) {
        self.num_keys += 1;
        if !self.try_to_add(key, location) {
            self.rehash(key, location);
        }
    }

    /// Seals the table into its compact read-only form.
    pub fn finalize(&self) -> ReadableTable {
        ReadableTable::from_writable(self)
    }

    fn candidate_slots(&self, key: &[u8]) -> Vec<usize> {
        (0..self.candidates)
            .map(|i| self.ctx.slot(key, self.hash_base, i, self.slots.len()))
            .collect()
    }

    /// Attempts placement without changing the table shape. Places directly
    /// into an empty candidate slot when one exists, otherwise searches for
    /// an eviction path and applies it. Returns false if no augmenting path
    /// exists under the current seeding.
    fn try_to_add(&mut self, key: &[u8], location: Location) -> bool {
        let root = self.candidate_slots(key);
        if let Some(&slot) = root.iter().find(|&&s| self.slots[s].is_none()) {
            self.slots[slot] = Some(Entry {
                key: key.to_vec(),
                location,
            });
            return true;
        }

        // Depth-first search over eviction paths. Each stack level holds the
        // candidate slots of the key occupying the previous level's choice
        // plus a cursor over the alternatives left to try; the visited set
        // bounds the whole search by the table size.
        let mut visited: HashSet<usize> = HashSet::new();
        let mut stack: Vec<(Vec<usize>, usize)> = vec![(root, 0)];
        let mut path: Vec<usize> = Vec::new();

        while let Some((cands, cursor)) = stack.last_mut() {
            let mut chosen = None;
            while *cursor < cands.len() {
                let slot = cands[*cursor];
                *cursor += 1;
                if visited.insert(slot) {
                    chosen = Some(slot);
                    break;
                }
            }
            let Some(slot) = chosen else {
                stack.pop();
                path.pop();
                continue;
            };
            path.push(slot);

            let occupant_cands = {
                let occupant = self.slots[slot]
                    .as_ref()
                    .expect("slot on an eviction path is occupied");
                self.candidate_slots(&occupant.key)
            };
            if let Some(&empty) = occupant_cands.iter().find(|&&s| self.slots[s].is_none()) {
                self.apply_path(&path, empty);
                self.slots[path[0]] = Some(Entry {
                    key: key.to_vec(),
                    location,
                });
                return true;
            }
            stack.push((occupant_cands, 0));
        }
        false
    }

    /// Shifts every entry on the path one step toward the empty slot,
    /// freeing the path's first slot for the pending key. Insertion
    /// displaces, never duplicates.
    fn apply_path(&mut self, path: &[usize], empty: usize) {
        debug_assert!(self.slots[empty].is_none());
        let mut dst = empty;
        for &src in path.iter().rev() {
            self.slots[dst] = self.slots[src].take();
            dst = src;
        }
    }

    /// Rebuilds the table off to the side at the next seed variant, growing
    /// once the variant space is exhausted, until the pending key and every
    /// existing entry place cleanly. The replacement is swapped in whole, so
    /// the table is never observable in a partially rebuilt state.
    fn rehash(&mut self, key: &[u8], location: Location) {
        let grow_step = (self.initial_slots / 8).max(1);
        let mut hash_base = self.hash_base.wrapping_add(1);
        let mut new_size = self.slots.len();
        if hash_base >= self.seed_variants {
            hash_base = 0;
            new_size += grow_step;
        }

        let max_attempts = usize::from(self.seed_variants) * 8;
        for attempt in 0..max_attempts {
            tracing::debug!(attempt, hash_base, new_size, "rebuilding cuckoo table");
            let mut candidate = Self::with_slots(
                new_size,
                hash_base,
                self.initial_slots,
                self.ctx,
                self.candidates,
                self.seed_variants,
            );
            if self.reinsert_into(&mut candidate) && candidate.try_to_add(key, location) {
                self.slots = candidate.slots;
                self.hash_base = candidate.hash_base;
                return;
            }

            if hash_base + 1 >= self.seed_variants {
                hash_base = 0;
                new_size += grow_step;
                tracing::warn!(
                    new_size,
                    keys = self.num_keys,
                    "cuckoo placement exhausted seed variants, growing table"
                );
            } else {
                hash_base += 1;
            }
        }
        panic!(
            "cuckoo rehash failed after {} attempts ({} keys in {} slots); \
             table is undersized or hashing is degenerate",
            max_attempts,
            self.num_keys,
            self.slots.len()
        );
    }

    fn reinsert_into(&self, candidate: &mut WritableTable) -> bool {
        for entry in self.slots.iter().flatten() {
            if !candidate.try_to_add(&entry.key, entry.location) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table(capacity: usize) -> WritableTable {
        WritableTable::new(capacity, HashContext::default(), &IndexConfig::default())
    }

    fn key(i: u64) -> [u8; 8] {
        i.to_be_bytes()
    }

    #[test]
    fn test_overcommit_headroom() {
        // 16 * 72 / 64
        assert_eq!(test_table(16).slot_count(), 18);
    }

    #[test]
    fn test_fill_to_capacity_hint() {
        let mut table = test_table(16);
        for i in 0..16 {
            table.insert(&key(i), Location::new(i as u32, false, false));
        }
        assert_eq!(table.len(), 16);

        let sealed = table.finalize();
        for i in 0..16 {
            let found = sealed.find(&key(i));
            assert!(
                found.contains(&Location::new(i as u32, false, false)),
                "key {} lost during placement",
                i
            );
        }
        // A never-inserted key may collide on a signature, but with a 16-bit
        // signature space anything beyond a single stray candidate means the
        // probe order is broken.
        assert!(sealed.find(&key(999)).len() <= 1);
    }

    #[test]
    fn test_growth_keeps_every_key() {
        // 10x and change past the hint; forces repeated rehash growth.
        let mut table = test_table(4);
        let initial_slots = table.slot_count();
        for i in 0..64 {
            table.insert(&key(i), Location::new(i as u32, true, false));
        }
        assert!(table.slot_count() > initial_slots);

        let sealed = table.finalize();
        for i in 0..64 {
            assert!(
                sealed.find(&key(i)).contains(&Location::new(i as u32, true, false)),
                "key {} lost across growth",
                i
            );
        }
    }

    #[test]
    fn test_eviction_preserves_occupants() {
        // Small table, enough keys that augmenting paths must move entries.
        let mut table = test_table(8);
        for i in 0..9 {
            table.insert(&key(i), Location::new(i as u32, false, true));
        }
        let sealed = table.finalize();
        for i in 0..9 {
            assert!(sealed.find(&key(i)).contains(&Location::new(i as u32, false, true)));
        }
    }

    #[test]
    fn test_occupied_slots_match_key_count() {
        let mut table = test_table(16);
        for i in 0..12 {
            table.insert(&key(i), Location::new(i as u32, false, false));
        }
        let occupied = table.slots().iter().filter(|s| s.is_some()).count();
        assert_eq!(occupied, 12, "insertion must displace, never duplicate");
    }
}
