/// Construction parameters for a partitioned index.
///
/// Supplied by the owning storage engine at build time and again at load
/// time; the serialized index does not carry them.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Disk blocks covered by one partition (default: 1024)
    pub megablock_size_blocks: u32,

    /// Candidate hash functions probed per key (default: 3)
    pub candidates: usize,

    /// Seed variants tried before a rehash grows the table (default: 16)
    pub seed_variants: u16,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            megablock_size_blocks: 1024,
            candidates: 3,
            seed_variants: 16,
        }
    }
}

impl IndexConfig {
    /// Set the number of disk blocks covered by one partition
    pub fn megablock_size_blocks(mut self, blocks: u32) -> Self {
        assert!(blocks > 0, "megablock size must be at least one block");
        self.megablock_size_blocks = blocks;
        self
    }

    /// Set the number of candidate hash functions probed per key
    pub fn candidates(mut self, candidates: usize) -> Self {
        assert!(
            (2..=4).contains(&candidates),
            "candidate count must be between 2 and 4"
        );
        self.candidates = candidates;
        self
    }

    /// Set how many seed variants a rehash tries before growing the table
    pub fn seed_variants(mut self, variants: u16) -> Self {
        assert!(variants > 0, "at least one seed variant is required");
        self.seed_variants = variants;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.megablock_size_blocks, 1024);
        assert_eq!(config.candidates, 3);
        assert_eq!(config.seed_variants, 16);
    }

    #[test]
    fn test_config_builder() {
        let config = IndexConfig::default()
            .megablock_size_blocks(256)
            .candidates(2)
            .seed_variants(8);

        assert_eq!(config.megablock_size_blocks, 256);
        assert_eq!(config.candidates, 2);
        assert_eq!(config.seed_variants, 8);
    }

    #[test]
    #[should_panic(expected = "candidate count must be between 2 and 4")]
    fn test_candidate_count_out_of_range() {
        let _ = IndexConfig::default().candidates(7);
    }
}
