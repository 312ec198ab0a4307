//! Exact k-mer membership for small non-target genomes.
//!
//! K-mers over {A, C, G, T, U} are packed 2 bits per base (U and T collapse
//! to the same code), so a 15-mer fits a `u32` and a 7-mer a `u16`.

use fnv::{FnvHashMap, FnvHashSet};

use crate::constants::{EXACT_COUNT_CAP, PATENT_EXCLUSION_LENGTH, SEED_LENGTH};

fn base_code(base: u8) -> Option<u64> {
    match base {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' | b'U' => Some(3),
        _ => None,
    }
}

pub fn is_valid_kmer(kmer: &[u8]) -> bool {
    kmer.iter().all(|&b| base_code(b).is_some())
}

fn pack(kmer: &[u8]) -> Option<u64> {
    let mut packed = 0u64;
    for &base in kmer {
        packed = packed << 2 | base_code(base)?;
    }
    Some(packed)
}

/// None when the k-mer has the wrong length or contains N.
pub fn pack15(kmer: &[u8]) -> Option<u32> {
    (kmer.len() == PATENT_EXCLUSION_LENGTH)
        .then(|| pack(kmer))
        .flatten()
        .map(|p| p as u32)
}

pub fn pack7(kmer: &[u8]) -> Option<u16> {
    (kmer.len() == SEED_LENGTH)
        .then(|| pack(kmer))
        .flatten()
        .map(|p| p as u16)
}

/// Deterministic set of all valid 15-mers plus 7-mer occurrence counts
/// saturating at 100.
#[derive(Debug, Default)]
pub struct ExactKmerIndex {
    exclusion_kmers: FnvHashSet<u32>,
    seed_counts: FnvHashMap<u16, u32>,
}

impl ExactKmerIndex {
    /// Returns false when the k-mer was invalid and skipped.
    pub fn insert15(&mut self, kmer: &[u8]) -> bool {
        match pack15(kmer) {
            Some(packed) => {
                self.exclusion_kmers.insert(packed);
                true
            }
            None => false,
        }
    }

    pub fn insert7(&mut self, kmer: &[u8]) -> bool {
        match pack7(kmer) {
            Some(packed) => {
                let count = self.seed_counts.entry(packed).or_insert(0);
                *count = (*count + 1).min(EXACT_COUNT_CAP);
                true
            }
            None => false,
        }
    }

    pub fn contains15(&self, kmer: &[u8]) -> bool {
        pack15(kmer)
            .map(|packed| self.exclusion_kmers.contains(&packed))
            .unwrap_or(false)
    }

    pub fn seed_count(&self, kmer: &[u8]) -> u32 {
        pack7(kmer)
            .and_then(|packed| self.seed_counts.get(&packed).copied())
            .unwrap_or(0)
    }

    pub fn distinct_kmers(&self) -> usize {
        self.exclusion_kmers.len()
    }

    /// Rough live size of both tables.
    pub fn memory_bytes(&self) -> usize {
        self.exclusion_kmers.len() * std::mem::size_of::<u32>() * 2
            + self.seed_counts.len() * (std::mem::size_of::<u16>() + std::mem::size_of::<u32>()) * 2
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pack_u_equals_t() {
        assert_eq!(pack7(b"AUGCAUG"), pack7(b"ATGCATG"));
        assert_eq!(pack15(b"AUGCAUGCAUGCAUG"), pack15(b"ATGCATGCATGCATG"));
    }

    #[test]
    fn test_pack_rejects_n_and_bad_length() {
        assert_eq!(pack7(b"ATGCATN"), None);
        assert_eq!(pack7(b"ATGCAT"), None);
        assert_eq!(pack15(b"ATGC"), None);
        assert!(!is_valid_kmer(b"ACGTN"));
        assert!(is_valid_kmer(b"ACGTU"));
    }

    #[test]
    fn test_membership() {
        let mut index = ExactKmerIndex::default();
        assert!(index.insert15(b"ATGCATGCATGCATG"));
        assert!(!index.insert15(b"ATGCATGCATGCATN"));
        assert!(index.contains15(b"ATGCATGCATGCATG"));
        assert!(index.contains15(b"AUGCAUGCAUGCAUG"));
        assert!(!index.contains15(b"TTGCATGCATGCATG"));
        assert_eq!(index.distinct_kmers(), 1);
    }

    #[test]
    fn test_seed_counts_saturate() {
        let mut index = ExactKmerIndex::default();
        for _ in 0..250 {
            index.insert7(b"GGGCCCA");
        }
        index.insert7(b"AAAAAAA");
        assert_eq!(index.seed_count(b"GGGCCCA"), 100);
        assert_eq!(index.seed_count(b"AAAAAAA"), 1);
        assert_eq!(index.seed_count(b"TTTTTTT"), 0);
    }
}
