//! FASTA ingestion and sequence validation.
//!
//! Header lines are diagnostic only; every other non-empty line is trimmed,
//! upper-cased and concatenated into one sequence, so multi-record input
//! collapses to a single validated byte string.

use crate::{
    constants::{MAX_GENOME_SIZE, MIN_GENOME_SIZE},
    error::{Error, Result, Warning},
    utils::gc_percent,
};

/// Bases inspected for the high-N warning.
const AMBIGUITY_SCAN_LIMIT: usize = 1_000_000;
const AMBIGUITY_WARN_PERCENT: f64 = 5.0;

fn is_allowed(base: u8) -> bool {
    matches!(base, b'A' | b'C' | b'G' | b'T' | b'U' | b'N')
}

/// A validated, immutable nucleotide sequence over {A, C, G, T, U, N}.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    bases: Vec<u8>,
}

impl Sequence {
    /// Parse FASTA-form bytes and validate the concatenated sequence.
    /// Accepts headerless input: any line not starting with `>` is sequence.
    pub fn from_fasta(raw: &[u8]) -> Result<(Self, Vec<Warning>)> {
        Self::validated(parse(raw))
    }

    /// Parse FASTA-form bytes for pipeline scanning. Size bounds still
    /// apply, but alphabet anomalies are left in place for the scanner's
    /// data-quality filter to quarantine window by window.
    pub fn target_from_fasta(raw: &[u8]) -> Result<(Self, Vec<Warning>)> {
        Self::normalized(parse(raw))
    }

    /// Validate an already-concatenated sequence. Case is normalized here so
    /// callers may pass raw bytes.
    pub fn validated(bases: Vec<u8>) -> Result<(Self, Vec<Warning>)> {
        let (seq, warnings) = Self::normalized(bases)?;
        if let Some(position) = seq.bases.iter().position(|&b| !is_allowed(b)) {
            return Err(Error::InvalidCharacter {
                found: seq.bases[position] as char,
                position,
            });
        }
        Ok((seq, warnings))
    }

    /// Normalize and bounds-check without rejecting on alphabet.
    pub fn normalized(mut bases: Vec<u8>) -> Result<(Self, Vec<Warning>)> {
        bases.make_ascii_uppercase();
        if bases.is_empty() {
            return Err(Error::EmptySequence);
        }
        if bases.len() < MIN_GENOME_SIZE {
            return Err(Error::SequenceTooShort(bases.len()));
        }
        if bases.len() > MAX_GENOME_SIZE {
            return Err(Error::SequenceTooLarge(bases.len()));
        }

        let mut warnings = Vec::new();
        let prefix = &bases[..bases.len().min(AMBIGUITY_SCAN_LIMIT)];
        let n_count = prefix.iter().filter(|&&b| b == b'N').count();
        let n_percent = n_count as f64 / prefix.len() as f64 * 100.0;
        if n_percent > AMBIGUITY_WARN_PERCENT {
            log::warn!("sequence has {n_percent:.1}% N in its leading {} bases", prefix.len());
            warnings.push(Warning::HighAmbiguity { percent: n_percent });
        }

        Ok((Sequence { bases }, warnings))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bases
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn gc_percent(&self) -> f64 {
        gc_percent(&self.bases)
    }
}

fn parse(raw: &[u8]) -> Vec<u8> {
    let mut bases = Vec::with_capacity(raw.len());
    for line in raw.split(|&b| b == b'\n') {
        let line = trim_ascii(line);
        if line.is_empty() || line[0] == b'>' {
            continue;
        }
        bases.extend(line.iter().map(u8::to_ascii_uppercase));
    }
    bases
}

fn trim_ascii(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |e| e + 1);
    &line[start..end]
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fasta_of(n: usize) -> Vec<u8> {
        let mut raw = b">rec1 demo\n".to_vec();
        raw.extend(std::iter::repeat(b'a').take(n));
        raw.push(b'\n');
        raw
    }

    #[test]
    fn test_multi_record_concatenation() {
        let raw = b">a\nACGT\n\n>b desc\r\nacgu\nNNNN\n";
        let mut padded = raw.to_vec();
        padded.extend(b">c\n");
        padded.extend(vec![b'T'; 100]);
        let (seq, warnings) = Sequence::from_fasta(&padded).unwrap();
        assert_eq!(&seq.as_bytes()[..12], b"ACGTACGUNNNN");
        assert_eq!(seq.len(), 112);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_headerless_input_is_sequence() {
        let raw = vec![b'G'; 120];
        let (seq, _) = Sequence::from_fasta(&raw).unwrap();
        assert_eq!(seq.len(), 120);
    }

    #[test]
    fn test_empty() {
        assert!(matches!(
            Sequence::from_fasta(b">only a header\n"),
            Err(Error::EmptySequence)
        ));
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            Sequence::from_fasta(&fasta_of(99)),
            Err(Error::SequenceTooShort(99))
        ));
        assert!(Sequence::from_fasta(&fasta_of(100)).is_ok());
    }

    #[test]
    fn test_invalid_character() {
        let mut raw = fasta_of(100);
        raw.insert(20, b'X');
        let err = Sequence::from_fasta(&raw).unwrap_err();
        match err {
            Error::InvalidCharacter { found, position } => {
                assert_eq!(found, 'X');
                assert_eq!(position, 9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_high_n_warning() {
        let mut bases = vec![b'A'; 1000];
        bases[..100].fill(b'N');
        let (_, warnings) = Sequence::validated(bases).unwrap();
        assert_eq!(warnings.len(), 1);
        match &warnings[0] {
            Warning::HighAmbiguity { percent } => assert_eq!(*percent, 10.0),
        }
    }

    #[test]
    fn test_case_normalized() {
        let (seq, _) = Sequence::validated(vec![b'a'; 150]).unwrap();
        assert!(seq.as_bytes().iter().all(|&b| b == b'A'));
    }
}
