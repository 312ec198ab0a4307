//! Probabilistic k-mer membership for non-target genomes too large to index
//! exactly. A bit-set filter answers 15-mer membership with no false
//! negatives; a saturating-counter variant gives a conservative upper bound
//! on 7-mer seed multiplicity.

use std::f64::consts::LN_2;

use bit_vec::BitVec;

use crate::constants::{BLOOM_MAX_BITS, COUNTING_MAX_COUNTERS};

const LN2_SQUARED: f64 = LN_2 * LN_2;

/// MurmurHash3 x86_32. The two base hashes for double hashing are derived by
/// seeding once with 0 and once with the first hash.
fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, &b) in tail.iter().enumerate() {
            k |= (b as u32) << (8 * i);
        }
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
    }

    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

fn base_hashes(item: &[u8]) -> (u32, u32) {
    let h1 = murmur3_32(item, 0);
    let h2 = murmur3_32(item, h1);
    (h1, h2)
}

/// m = ceil(-n * ln(p) / ln(2)^2), clamped to `max_cells`.
fn optimal_cells(expected_items: usize, fp_rate: f64, max_cells: usize) -> usize {
    let n = expected_items.max(1) as f64;
    let m = (-n * fp_rate.ln() / LN2_SQUARED).ceil() as usize;
    m.clamp(1, max_cells)
}

/// k = ceil((m / n) * ln 2), clamped to [3, 10].
fn optimal_hashes(cells: usize, expected_items: usize) -> u32 {
    let k = (cells as f64 / expected_items.max(1) as f64 * LN_2).ceil() as u32;
    k.clamp(3, 10)
}

fn hit_positions(item: &[u8], num_hashes: u32, cells: usize) -> impl Iterator<Item = usize> {
    let (h1, h2) = base_hashes(item);
    (0..num_hashes as u64).map(move |i| {
        ((h1 as u64).wrapping_add(i.wrapping_mul(h2 as u64)) % cells as u64) as usize
    })
}

/// Bit-set Bloom filter. `contains` never reports a false negative; a `true`
/// is subject to the configured false-positive rate.
#[derive(Debug)]
pub struct BloomFilter {
    bits: BitVec,
    num_hashes: u32,
    inserted: u64,
}

impl BloomFilter {
    pub fn new(expected_items: usize, fp_rate: f64) -> Self {
        let cells = optimal_cells(expected_items, fp_rate, BLOOM_MAX_BITS);
        let num_hashes = optimal_hashes(cells, expected_items);
        log::debug!("bloom filter: {cells} bits, {num_hashes} hashes for {expected_items} items");
        BloomFilter {
            bits: BitVec::from_elem(cells, false),
            num_hashes,
            inserted: 0,
        }
    }

    /// Byte size of the backing store, computable before allocation.
    pub fn estimated_bytes(expected_items: usize, fp_rate: f64) -> usize {
        optimal_cells(expected_items, fp_rate, BLOOM_MAX_BITS) / 8 + 1
    }

    pub fn insert(&mut self, item: &[u8]) {
        for idx in hit_positions(item, self.num_hashes, self.bits.len()) {
            self.bits.set(idx, true);
        }
        self.inserted += 1;
    }

    pub fn contains(&self, item: &[u8]) -> bool {
        hit_positions(item, self.num_hashes, self.bits.len())
            .all(|idx| self.bits.get(idx).unwrap_or(false))
    }

    pub fn memory_bytes(&self) -> usize {
        self.bits.len() / 8 + 1
    }

    /// Live estimate (1 - e^{-kn/m})^k from the number of insertions so far.
    pub fn false_positive_estimate(&self) -> f64 {
        let k = self.num_hashes as f64;
        let n = self.inserted as f64;
        let m = self.bits.len() as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }
}

/// Bloom filter over 8-bit saturating counters. `count` is the minimum over
/// the k hashed cells, a conservative upper bound on the insertion count.
#[derive(Debug)]
pub struct CountingBloomFilter {
    counters: Vec<u8>,
    num_hashes: u32,
}

impl CountingBloomFilter {
    pub fn new(expected_items: usize, fp_rate: f64) -> Self {
        let cells = optimal_cells(expected_items, fp_rate, COUNTING_MAX_COUNTERS);
        let num_hashes = optimal_hashes(cells, expected_items);
        log::debug!(
            "counting bloom filter: {cells} counters, {num_hashes} hashes for {expected_items} items"
        );
        CountingBloomFilter {
            counters: vec![0; cells],
            num_hashes,
        }
    }

    pub fn estimated_bytes(expected_items: usize, fp_rate: f64) -> usize {
        optimal_cells(expected_items, fp_rate, COUNTING_MAX_COUNTERS)
    }

    pub fn insert(&mut self, item: &[u8]) {
        for idx in hit_positions(item, self.num_hashes, self.counters.len()) {
            self.counters[idx] = self.counters[idx].saturating_add(1);
        }
    }

    pub fn count(&self, item: &[u8]) -> u8 {
        hit_positions(item, self.num_hashes, self.counters.len())
            .map(|idx| self.counters[idx])
            .min()
            .unwrap_or(0)
    }

    pub fn memory_bytes(&self) -> usize {
        self.counters.len()
    }
}
