//! Non-target genome indexing.
//!
//! Small genomes (<= 10 MB) get an exact k-mer index; larger ones get a
//! Bloom-filter pair plus a retained copy (or samples) of the sequence for
//! verifying positive membership queries. Both variants answer the same
//! `contains15`/`count7` interface, so the pipeline is indifferent to which
//! one it holds.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde::Serialize;

use crate::{
    bloom::{BloomFilter, CountingBloomFilter},
    constants::{
        BLOOM_FALSE_POSITIVE_RATE, CHUNK_OVERLAP, CHUNK_SIZE, DEFAULT_MEMORY_CEILING,
        EXACT_COUNT_CAP, LARGE_FILE_THRESHOLD, PATENT_EXCLUSION_LENGTH, SAMPLE_LENGTH, SEED_LENGTH,
    },
    error::{Error, Result},
    fasta::Sequence,
    kmer::{is_valid_kmer, ExactKmerIndex},
    utils::{canonical, ProgressFn},
};

/// What the probabilistic variant keeps of the raw non-target for verifying
/// Bloom positives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetainPolicy {
    /// Full canonicalized copy; Bloom positives are always verifiable.
    #[default]
    Full,
    /// Leading bytes of each chunk only; verification is best-effort.
    Samples,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexVariant {
    Exact,
    Probabilistic,
}

#[derive(Debug)]
enum Retained {
    Full(Vec<u8>),
    Samples(Vec<Vec<u8>>),
}

impl Retained {
    fn find(&self, needle: &[u8]) -> bool {
        match self {
            Retained::Full(seq) => contains_needle(seq, needle),
            Retained::Samples(samples) => samples.iter().any(|s| contains_needle(s, needle)),
        }
    }

    fn occurrences(&self, needle: &[u8]) -> u32 {
        match self {
            Retained::Full(seq) => count_needle(seq, needle),
            Retained::Samples(samples) => samples.iter().map(|s| count_needle(s, needle)).sum(),
        }
    }

    fn is_full(&self) -> bool {
        matches!(self, Retained::Full(_))
    }

    fn memory_bytes(&self) -> usize {
        match self {
            Retained::Full(seq) => seq.len(),
            Retained::Samples(samples) => samples.iter().map(Vec::len).sum(),
        }
    }
}

fn contains_needle(hay: &[u8], needle: &[u8]) -> bool {
    needle.len() <= hay.len() && hay.windows(needle.len()).any(|w| w == needle)
}

/// Overlapping occurrences.
fn count_needle(hay: &[u8], needle: &[u8]) -> u32 {
    if needle.is_empty() || needle.len() > hay.len() {
        return 0;
    }
    hay.windows(needle.len()).filter(|w| *w == needle).count() as u32
}

#[derive(Debug)]
struct ExactBackend {
    kmers: ExactKmerIndex,
    retained: Vec<u8>,
}

#[derive(Debug)]
struct ProbabilisticBackend {
    exclusion: BloomFilter,
    seeds: CountingBloomFilter,
    retained: Retained,
}

#[derive(Debug)]
enum Backend {
    Exact(ExactBackend),
    Probabilistic(ProbabilisticBackend),
}

/// Construction summary, exposed so verification semantics are predictable
/// to callers of the safety layer.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub variant: IndexVariant,
    pub total_kmers: u64,
    pub gc_percent: f64,
    pub memory_bytes: usize,
    pub retain_policy: RetainPolicy,
    pub retained_full_sequence: bool,
    pub false_positive_estimate: Option<f64>,
}

/// Immutable membership index over a non-target genome. Shared by readers
/// for the duration of a pipeline run.
#[derive(Debug)]
pub struct NonTargetIndex {
    backend: Backend,
    report: IndexReport,
}

impl NonTargetIndex {
    /// True when the 15-mer may occur in the non-target. Exact variant:
    /// definitive. Probabilistic variant: subject to the false-positive
    /// rate, never a false negative.
    pub fn contains15(&self, kmer: &[u8]) -> bool {
        let canon = canonical(kmer);
        if canon.len() != PATENT_EXCLUSION_LENGTH || !is_valid_kmer(&canon) {
            return false;
        }
        match &self.backend {
            Backend::Exact(exact) => exact.kmers.contains15(&canon),
            Backend::Probabilistic(prob) => prob.exclusion.contains(&canon),
        }
    }

    /// Conservative occurrence count for a 7-mer seed. Clamped at 100 for
    /// the exact variant and 255 for the counting filter.
    pub fn count7(&self, kmer: &[u8]) -> u32 {
        let canon = canonical(kmer);
        if canon.len() != SEED_LENGTH || !is_valid_kmer(&canon) {
            return 0;
        }
        match &self.backend {
            Backend::Exact(exact) => exact.kmers.seed_count(&canon).min(EXACT_COUNT_CAP),
            Backend::Probabilistic(prob) => prob.seeds.count(&canon) as u32,
        }
    }

    pub fn is_probabilistic(&self) -> bool {
        matches!(self.backend, Backend::Probabilistic(_))
    }

    /// Whether an exact substring search can cover the whole non-target.
    pub fn has_full_retained(&self) -> bool {
        match &self.backend {
            Backend::Exact(_) => true,
            Backend::Probabilistic(prob) => prob.retained.is_full(),
        }
    }

    /// Exact substring search over whatever sequence was retained.
    pub(crate) fn find_in_retained(&self, needle: &[u8]) -> bool {
        let canon = canonical(needle);
        match &self.backend {
            Backend::Exact(exact) => contains_needle(&exact.retained, &canon),
            Backend::Probabilistic(prob) => prob.retained.find(&canon),
        }
    }

    pub(crate) fn occurrences_in_retained(&self, needle: &[u8]) -> u32 {
        let canon = canonical(needle);
        match &self.backend {
            Backend::Exact(exact) => count_needle(&exact.retained, &canon),
            Backend::Probabilistic(prob) => prob.retained.occurrences(&canon),
        }
    }

    pub fn report(&self) -> &IndexReport {
        &self.report
    }
}

/// Builder for [`NonTargetIndex`]. Yields between 1 MB chunks so progress
/// reporting stays serviced on a single-threaded host.
pub struct IndexOptions {
    retain: RetainPolicy,
    memory_ceiling: usize,
    fp_rate: f64,
    progress: Option<ProgressFn>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            retain: RetainPolicy::Full,
            memory_ceiling: DEFAULT_MEMORY_CEILING,
            fp_rate: BLOOM_FALSE_POSITIVE_RATE,
            progress: None,
            cancel: None,
        }
    }
}

impl IndexOptions {
    pub fn retain_policy(mut self, retain: RetainPolicy) -> Self {
        self.retain = retain;
        self
    }

    pub fn memory_ceiling(mut self, bytes: usize) -> Self {
        self.memory_ceiling = bytes;
        self
    }

    pub fn progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn estimate_bytes(&self, len: usize) -> usize {
        if len > LARGE_FILE_THRESHOLD {
            let retained = match self.retain {
                RetainPolicy::Full => len,
                RetainPolicy::Samples => len.div_ceil(CHUNK_SIZE) * SAMPLE_LENGTH,
            };
            BloomFilter::estimated_bytes(len.saturating_sub(PATENT_EXCLUSION_LENGTH - 1), self.fp_rate)
                + CountingBloomFilter::estimated_bytes(len.saturating_sub(SEED_LENGTH - 1), self.fp_rate)
                + retained
        } else {
            // Retained copy plus packed hash tables with load-factor slack.
            len + len * 12
        }
    }

    pub fn build(mut self, non_target: &Sequence) -> Result<NonTargetIndex> {
        let bytes = non_target.as_bytes();
        let len = bytes.len();

        let estimated = self.estimate_bytes(len);
        if estimated > self.memory_ceiling {
            return Err(Error::MemoryCeiling {
                estimated,
                ceiling: self.memory_ceiling,
            });
        }

        let probabilistic = len > LARGE_FILE_THRESHOLD;
        let variant = if probabilistic {
            IndexVariant::Probabilistic
        } else {
            IndexVariant::Exact
        };
        log::info!("indexing {len} nt non-target, {variant:?} variant");

        let mut exact = (!probabilistic).then(ExactKmerIndex::default);
        let mut exclusion = probabilistic
            .then(|| BloomFilter::new(len.saturating_sub(PATENT_EXCLUSION_LENGTH - 1), self.fp_rate));
        let mut seeds = probabilistic
            .then(|| CountingBloomFilter::new(len.saturating_sub(SEED_LENGTH - 1), self.fp_rate));
        let mut samples = Vec::new();

        let mut total_kmers = 0u64;
        let mut base_counts = [0u64; 4];
        let n_chunks = len.div_ceil(CHUNK_SIZE);

        for chunk_idx in 0..n_chunks {
            let start = chunk_idx * CHUNK_SIZE;
            let end = (start + CHUNK_SIZE + CHUNK_OVERLAP).min(len);
            let chunk = canonical(&bytes[start..end]);

            for window in chunk.windows(PATENT_EXCLUSION_LENGTH) {
                if !is_valid_kmer(window) {
                    continue;
                }
                match (&mut exact, &mut exclusion) {
                    (Some(index), _) => {
                        index.insert15(window);
                    }
                    (_, Some(filter)) => filter.insert(window),
                    _ => unreachable!(),
                }
                total_kmers += 1;
            }
            for window in chunk.windows(SEED_LENGTH) {
                if !is_valid_kmer(window) {
                    continue;
                }
                match (&mut exact, &mut seeds) {
                    (Some(index), _) => {
                        index.insert7(window);
                    }
                    (_, Some(filter)) => filter.insert(window),
                    _ => unreachable!(),
                }
            }

            // Nucleotide totals over the non-overlap prefix only, so bases in
            // the 50-byte overlap are not counted twice.
            let prefix_len = chunk.len().min(CHUNK_SIZE);
            for &b in &chunk[..prefix_len] {
                match b {
                    b'A' => base_counts[0] += 1,
                    b'C' => base_counts[1] += 1,
                    b'G' => base_counts[2] += 1,
                    b'T' => base_counts[3] += 1,
                    _ => {}
                }
            }

            if probabilistic && self.retain == RetainPolicy::Samples {
                samples.push(chunk[..chunk.len().min(SAMPLE_LENGTH)].to_vec());
            }

            if let Some(progress) = self.progress.as_mut() {
                progress((chunk_idx + 1) as f64 / n_chunks as f64, "indexing non-target");
            }
            // Cooperative point between chunks.
            std::thread::yield_now();
            if let Some(cancel) = &self.cancel {
                if cancel.load(Ordering::Relaxed) {
                    log::info!("index build canceled after chunk {chunk_idx}");
                    return Err(Error::Canceled);
                }
            }
        }

        let acgt: u64 = base_counts.iter().sum();
        let gc_percent = if acgt == 0 {
            0.0
        } else {
            (base_counts[1] + base_counts[2]) as f64 / acgt as f64 * 100.0
        };

        let (backend, memory_bytes, fp_estimate) = if probabilistic {
            let exclusion = exclusion.take().expect("probabilistic build has filters");
            let seeds = seeds.take().expect("probabilistic build has filters");
            let retained = match self.retain {
                RetainPolicy::Full => Retained::Full(canonical(bytes)),
                RetainPolicy::Samples => Retained::Samples(samples),
            };
            let memory =
                exclusion.memory_bytes() + seeds.memory_bytes() + retained.memory_bytes();
            let fp = exclusion.false_positive_estimate();
            (
                Backend::Probabilistic(ProbabilisticBackend {
                    exclusion,
                    seeds,
                    retained,
                }),
                memory,
                Some(fp),
            )
        } else {
            let kmers = exact.take().expect("exact build has an index");
            let retained = canonical(bytes);
            let memory = kmers.memory_bytes() + retained.len();
            (Backend::Exact(ExactBackend { kmers, retained }), memory, None)
        };

        let report = IndexReport {
            variant,
            total_kmers,
            gc_percent,
            memory_bytes,
            retain_policy: self.retain,
            retained_full_sequence: !probabilistic || self.retain == RetainPolicy::Full,
            false_positive_estimate: fp_estimate,
        };
        log::info!(
            "indexed {} k-mers, GC {:.1}%, ~{} MB",
            report.total_kmers,
            report.gc_percent,
            report.memory_bytes / (1024 * 1024)
        );

        Ok(NonTargetIndex { backend, report })
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sequence_of(bases: Vec<u8>) -> Sequence {
        Sequence::validated(bases).unwrap().0
    }

    #[test]
    fn test_exact_variant_chosen_for_small_input() {
        let mut bases = vec![b'A'; 200];
        bases[90..105].copy_from_slice(b"CGTACGGTTCACGTA");
        let index = IndexOptions::default()
            .build(&sequence_of(bases))
            .unwrap();
        assert_eq!(index.report().variant, IndexVariant::Exact);
        assert!(index.report().false_positive_estimate.is_none());
        assert!(index.contains15(b"CGTACGGTTCACGTA"));
        assert!(index.contains15(b"CGUACGGUUCACGUA"), "U queries hit T entries");
        assert!(!index.contains15(b"CCCCCCCCCCCCCCC"));
        assert!(index.has_full_retained());
    }

    #[test]
    fn test_seed_counts() {
        // 100 A's hold 94 overlapping AAAAAAA seeds.
        let index = IndexOptions::default()
            .build(&sequence_of(vec![b'A'; 100]))
            .unwrap();
        assert_eq!(index.count7(b"AAAAAAA"), 94);
        assert_eq!(index.count7(b"CCCCCCC"), 0);
        assert_eq!(index.count7(b"AAANAAA"), 0, "invalid seed never counted");
        // Saturation at the exact-count cap.
        let index = IndexOptions::default()
            .build(&sequence_of(vec![b'A'; 200]))
            .unwrap();
        assert_eq!(index.count7(b"AAAAAAA"), 100);
    }

    #[test]
    fn test_kmers_spanning_chunk_boundary() {
        let mut bases = vec![b'A'; CHUNK_SIZE + 40];
        let planted = b"GCGTACGGTTCACGT";
        bases[CHUNK_SIZE - 7..CHUNK_SIZE + 8].copy_from_slice(planted);
        let index = IndexOptions::default().build(&sequence_of(bases)).unwrap();
        assert!(index.contains15(planted));
    }

    #[test]
    fn test_n_kmers_skipped() {
        let mut bases = vec![b'N'; 120];
        bases.extend(vec![b'A'; 20]);
        let index = IndexOptions::default().build(&sequence_of(bases)).unwrap();
        assert_eq!(index.count7(b"NNNNNNN"), 0);
        assert_eq!(index.count7(b"AAAAAAA"), 14);
    }

    #[test]
    fn test_memory_ceiling_refusal() {
        let err = IndexOptions::default()
            .memory_ceiling(64)
            .build(&sequence_of(vec![b'A'; 500]))
            .unwrap_err();
        assert!(matches!(err, Error::MemoryCeiling { .. }));
    }

    #[test]
    fn test_cancel_at_chunk_boundary() {
        let cancel = Arc::new(AtomicBool::new(true));
        let err = IndexOptions::default()
            .cancel_flag(cancel)
            .build(&sequence_of(vec![b'A'; 500]))
            .unwrap_err();
        assert!(matches!(err, Error::Canceled));
    }

    #[test]
    fn test_gc_percent_reported() {
        let mut bases = vec![b'G'; 50];
        bases.extend(vec![b'C'; 50]);
        bases.extend(vec![b'A'; 100]);
        let index = IndexOptions::default().build(&sequence_of(bases)).unwrap();
        assert_eq!(index.report().gc_percent, 50.0);
    }

    #[test]
    fn test_retained_samples_search() {
        let retained = Retained::Samples(vec![b"AAACGTACGGTTCACGTAAA".to_vec()]);
        assert!(retained.find(b"CGTACGGTTCACGTA"));
        assert!(!retained.find(b"GGGGGGGGGGGGGGG"));
        assert_eq!(retained.occurrences(b"ACGT"), 2);
        assert!(!retained.is_full());
    }
}
