//! Fixed parameters of the design engine. These are part of the public
//! contract and are not configurable at run time.

/// Length of the exact-homology exclusion window.
pub const PATENT_EXCLUSION_LENGTH: usize = 15;

/// Length of the seed region.
pub const SEED_LENGTH: usize = 7;

/// Seed region spans guide positions 2-8 (1-indexed), i.e. byte offsets 1..8.
pub const SEED_START: usize = 1;

/// Extended seed spans guide positions 2-13 (1-indexed).
pub const EXTENDED_SEED_END: usize = 13;

/// Guide-strand candidate length.
pub const SIRNA_LENGTH: usize = 21;

pub const MIN_GENOME_SIZE: usize = 100;
pub const MAX_GENOME_SIZE: usize = 500_000_000;

/// Above this many bytes the non-target index switches to the
/// probabilistic variant.
pub const LARGE_FILE_THRESHOLD: usize = 10_000_000;

/// Indexing chunk size in bytes.
pub const CHUNK_SIZE: usize = 1_000_000;

/// Trailing overlap between indexing chunks, so no k-mer straddling a
/// boundary is missed.
pub const CHUNK_OVERLAP: usize = 50;

/// Upper bound on the number of windows scanned per pipeline run.
pub const SCAN_LIMIT: usize = 5_000;

/// Windows between progress callbacks and cooperative yields.
pub const PROGRESS_INTERVAL: usize = 100;

pub const GC_MIN: f64 = 30.0;
pub const GC_MAX: f64 = 52.0;

/// Candidates below this aggregate safety score are rejected.
pub const MIN_SAFETY_SCORE: f64 = 75.0;

/// Candidates above this fold risk are rejected.
pub const MAX_FOLD_RISK: u8 = 50;

pub const MIN_EFFICACY_THRESHOLD: f64 = 50.0;
pub const MAX_EFFICACY_THRESHOLD: f64 = 99.0;
pub const DEFAULT_EFFICACY_THRESHOLD: f64 = 70.0;

/// Default total memory ceiling for index construction, 1 GiB.
pub const DEFAULT_MEMORY_CEILING: usize = 1 << 30;

/// Default Bloom false-positive target.
pub const BLOOM_FALSE_POSITIVE_RATE: f64 = 0.001;

/// Bit-set Bloom filters are capped at 500 MiB of bits.
pub const BLOOM_MAX_BITS: usize = 4_194_304_000;

/// Counting Bloom filters are capped at 200 MiB of counters.
pub const COUNTING_MAX_COUNTERS: usize = 200 * 1024 * 1024;

/// Per-chunk sample length retained under `RetainPolicy::Samples`.
pub const SAMPLE_LENGTH: usize = 10_000;

/// Exact 7-mer occurrence counts saturate here.
pub const EXACT_COUNT_CAP: u32 = 100;
