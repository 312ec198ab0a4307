//! Five-layer safety firewall for a 21-nt candidate against a non-target
//! index: exact 15-mer homology, seed-region occurrence, extended seed,
//! palindrome, and biological motif checks, combined into one aggregate
//! score. Anomalies are reported as record fields, never raised.

use serde::Serialize;

use crate::{
    constants::{EXTENDED_SEED_END, PATENT_EXCLUSION_LENGTH, SEED_LENGTH, SEED_START},
    index::NonTargetIndex,
    utils::{canonical, reverse_complement, transcribed},
};

const POLY_RUNS: [&[u8]; 5] = [b"AAAA", b"UUUU", b"TTTT", b"GGGG", b"CCCC"];
const IMMUNE_MOTIFS: [&[u8]; 4] = [b"UGUGU", b"GUCCUUCAA", b"UGGC", b"GCCA"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SafetyStatus {
    Cleared,
    SeedWarning,
    Toxic,
}

impl std::fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyStatus::Cleared => write!(f, "Cleared"),
            SafetyStatus::SeedWarning => write!(f, "Seed-Warning"),
            SafetyStatus::Toxic => write!(f, "Toxic"),
        }
    }
}

/// Full per-candidate safety report.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyAnalysis {
    pub sequence: String,
    pub status: SafetyStatus,
    pub is_safe: bool,
    pub overall_safety_score: f64,
    /// Longest contiguous run shared with the non-target; 15 when Toxic.
    pub match_length: usize,
    pub safety_margin: usize,
    /// A Bloom 15-mer positive that could not be confirmed in the retained
    /// sequence. Deducts from the score but does not reject.
    pub bloom_unconfirmed: bool,
    pub seed: String,
    pub reverse_complement_seed: String,
    pub has_seed_match: bool,
    pub seed_match_count: u32,
    pub seed_risk: f64,
    pub extended_seed: String,
    pub has_extended_seed_match: bool,
    pub extended_seed_count: u32,
    pub has_palindrome: bool,
    pub palindrome_length: usize,
    pub palindrome_position: Option<usize>,
    pub palindrome_risk: f64,
    pub cpg_count: u32,
    pub has_cpg: bool,
    pub has_poly_run: bool,
    pub poly_run_details: Vec<String>,
    pub immune_motifs: Vec<String>,
    pub biological_risk_score: f64,
    pub risk_factors: Vec<String>,
    pub safety_notes: Vec<String>,
}

/// Layer 1 outcome for the seven 15-mer windows of a candidate.
fn exclusion_scan(candidate: &[u8], index: &NonTargetIndex) -> (bool, bool) {
    let mut unconfirmed = false;
    for window in candidate.windows(PATENT_EXCLUSION_LENGTH) {
        if !index.contains15(window) {
            continue;
        }
        if !index.is_probabilistic() || index.find_in_retained(window) {
            return (true, unconfirmed);
        }
        unconfirmed = true;
    }
    (false, unconfirmed)
}

/// First (longest) length in 14..=4 at which any candidate substring occurs
/// in the retained non-target; 0 when nothing hits.
fn max_contiguous_match(candidate: &[u8], index: &NonTargetIndex) -> usize {
    for len in (4..=PATENT_EXCLUSION_LENGTH - 1).rev() {
        if candidate
            .windows(len)
            .any(|window| index.find_in_retained(window))
        {
            return len;
        }
    }
    0
}

fn seed_risk_for(count: u32) -> f64 {
    match count {
        0 => 0.0,
        1..=10 => 15.0,
        11..=50 => 30.0,
        51..=100 => 50.0,
        _ => 80.0,
    }
}

/// Longest self-complementary substring, 12 down to 4 bases, on the DNA
/// spelling of the candidate. Returns (length, start).
fn longest_palindrome(candidate: &[u8]) -> Option<(usize, usize)> {
    let canon = canonical(candidate);
    for len in (4..=12).rev() {
        if len > canon.len() {
            continue;
        }
        for start in 0..=canon.len() - len {
            let sub = &canon[start..start + len];
            if reverse_complement(sub) == sub {
                return Some((len, start));
            }
        }
    }
    None
}

fn palindrome_risk_for(len: usize) -> f64 {
    match len {
        8.. => 60.0,
        6..=7 => 30.0,
        4..=5 => 10.0,
        _ => 0.0,
    }
}

/// Non-overlapping CG dinucleotides.
fn cpg_count(candidate: &[u8]) -> u32 {
    let canon = canonical(candidate);
    let mut count = 0;
    let mut i = 0;
    while i + 1 < canon.len() {
        if &canon[i..i + 2] == b"CG" {
            count += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    count
}

fn contains_motif(hay: &[u8], motif: &[u8]) -> bool {
    motif.len() <= hay.len() && hay.windows(motif.len()).any(|w| w == motif)
}

/// Overall deduction arithmetic, separated so the table is testable on its
/// own. `contiguous` is ignored once an exact match was confirmed.
fn aggregate_score(
    confirmed: bool,
    contiguous: usize,
    bloom_unconfirmed: bool,
    seed_risk: f64,
    palindrome_risk: f64,
    biological_risk: f64,
) -> f64 {
    if confirmed {
        return 0.0;
    }
    let mut score = 100.0;
    score -= match contiguous {
        14.. => 40.0,
        12..=13 => 20.0,
        10..=11 => 10.0,
        _ => 0.0,
    };
    if bloom_unconfirmed {
        score -= 30.0;
    }
    score -= seed_risk * 0.30;
    score -= palindrome_risk * 0.15;
    score -= biological_risk * 0.10;
    score.clamp(0.0, 100.0)
}

pub fn analyze(candidate: &[u8], index: &NonTargetIndex) -> SafetyAnalysis {
    let sequence = String::from_utf8_lossy(candidate).into_owned();
    let seed = &candidate[SEED_START..SEED_START + SEED_LENGTH];
    let rc_seed = reverse_complement(seed);
    let extended_seed = &candidate[SEED_START..EXTENDED_SEED_END];

    let (confirmed, bloom_unconfirmed) = exclusion_scan(candidate, index);
    if confirmed {
        // Hard gate: no further layers run for a confirmed homology hit.
        return SafetyAnalysis {
            sequence,
            status: SafetyStatus::Toxic,
            is_safe: false,
            overall_safety_score: 0.0,
            match_length: PATENT_EXCLUSION_LENGTH,
            safety_margin: 0,
            bloom_unconfirmed,
            seed: String::from_utf8_lossy(seed).into_owned(),
            reverse_complement_seed: String::from_utf8_lossy(&rc_seed).into_owned(),
            has_seed_match: false,
            seed_match_count: 0,
            seed_risk: 0.0,
            extended_seed: String::from_utf8_lossy(extended_seed).into_owned(),
            has_extended_seed_match: false,
            extended_seed_count: 0,
            has_palindrome: false,
            palindrome_length: 0,
            palindrome_position: None,
            palindrome_risk: 0.0,
            cpg_count: 0,
            has_cpg: false,
            has_poly_run: false,
            poly_run_details: Vec::new(),
            immune_motifs: Vec::new(),
            biological_risk_score: 0.0,
            risk_factors: vec!["exact 15-mer homology with non-target".to_string()],
            safety_notes: vec![
                "shares a 15-nt exact match with the protected genome; excluded".to_string(),
            ],
        };
    }

    let match_length = max_contiguous_match(candidate, index);

    // Layer 2: seed occurrences, forward plus reverse complement.
    let seed_match_count = index.count7(seed) + index.count7(&rc_seed);
    let has_seed_match = seed_match_count > 0;
    let seed_risk = seed_risk_for(seed_match_count);

    // Layer 3: extended seed, reported but never scored.
    let rc_extended = reverse_complement(extended_seed);
    let (has_extended_seed_match, extended_seed_count) = if index.has_full_retained() {
        let count = index.occurrences_in_retained(extended_seed)
            + index.occurrences_in_retained(&rc_extended);
        (count > 0, count)
    } else {
        (false, 0)
    };

    // Layer 4: self-complementarity within the candidate.
    let palindrome = longest_palindrome(candidate);
    let (palindrome_length, palindrome_position) = match palindrome {
        Some((len, pos)) => (len, Some(pos)),
        None => (0, None),
    };
    let palindrome_risk = palindrome_risk_for(palindrome_length);

    // Layer 5: biological motifs.
    let cpg = cpg_count(candidate);
    let has_cpg = cpg >= 3;
    let poly_run_details: Vec<String> = POLY_RUNS
        .iter()
        .filter(|run| contains_motif(candidate, run))
        .map(|run| String::from_utf8_lossy(run).into_owned())
        .collect();
    let has_poly_run = !poly_run_details.is_empty();
    let rna_form = transcribed(candidate);
    let immune_motifs: Vec<String> = IMMUNE_MOTIFS
        .iter()
        .filter(|motif| contains_motif(candidate, motif) || contains_motif(&rna_form, motif))
        .map(|motif| String::from_utf8_lossy(motif).into_owned())
        .collect();
    let mut biological_risk_score = 0.0;
    if has_cpg {
        biological_risk_score += 20.0;
    }
    if has_poly_run {
        biological_risk_score += 25.0;
    }
    if !immune_motifs.is_empty() {
        biological_risk_score += 30.0;
    }

    let overall_safety_score = aggregate_score(
        false,
        match_length,
        bloom_unconfirmed,
        seed_risk,
        palindrome_risk,
        biological_risk_score,
    );

    let status = if (has_seed_match && seed_risk >= 50.0) || overall_safety_score < 80.0 {
        SafetyStatus::SeedWarning
    } else {
        SafetyStatus::Cleared
    };

    let mut risk_factors = Vec::new();
    let mut safety_notes = Vec::new();
    if match_length >= 10 {
        risk_factors.push(format!("{match_length}-nt contiguous non-target homology"));
    }
    if bloom_unconfirmed {
        risk_factors.push("unconfirmed 15-mer filter positive".to_string());
        safety_notes.push("membership filter hit could not be verified in retained sequence".to_string());
    }
    if has_seed_match {
        risk_factors.push(format!("seed occurs {seed_match_count}x in non-target"));
    }
    if palindrome_risk > 0.0 {
        risk_factors.push(format!("{palindrome_length}-nt self-complementary region"));
    }
    if has_cpg {
        risk_factors.push(format!("{cpg} CpG dinucleotides"));
    }
    if has_poly_run {
        risk_factors.push(format!("poly-nucleotide run ({})", poly_run_details.join(", ")));
    }
    if !immune_motifs.is_empty() {
        risk_factors.push(format!("immunostimulatory motif ({})", immune_motifs.join(", ")));
    }
    if has_extended_seed_match {
        safety_notes.push(format!(
            "extended seed occurs {extended_seed_count}x in non-target (not scored)"
        ));
    }
    if risk_factors.is_empty() {
        safety_notes.push("no non-target homology or risk motifs detected".to_string());
    }

    SafetyAnalysis {
        sequence,
        status,
        is_safe: true,
        overall_safety_score,
        match_length,
        safety_margin: PATENT_EXCLUSION_LENGTH - match_length,
        bloom_unconfirmed,
        seed: String::from_utf8_lossy(seed).into_owned(),
        reverse_complement_seed: String::from_utf8_lossy(&rc_seed).into_owned(),
        has_seed_match,
        seed_match_count,
        seed_risk,
        extended_seed: String::from_utf8_lossy(extended_seed).into_owned(),
        has_extended_seed_match,
        extended_seed_count,
        has_palindrome: palindrome_length > 0,
        palindrome_length,
        palindrome_position,
        palindrome_risk,
        cpg_count: cpg,
        has_cpg,
        has_poly_run,
        poly_run_details,
        immune_motifs,
        biological_risk_score,
        risk_factors,
        safety_notes,
    }
}

#[cfg(test)]
mod test {
    use float_eq::assert_float_eq;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{fasta::Sequence, index::IndexOptions};

    fn index_of(bases: &[u8]) -> NonTargetIndex {
        let mut padded = bases.to_vec();
        // Pad with C/G filler so validation length floor is met without
        // introducing A/T homology.
        while padded.len() < 120 {
            padded.push(b'G');
        }
        let (seq, _) = Sequence::validated(padded).unwrap();
        IndexOptions::default().build(&seq).unwrap()
    }

    #[test]
    fn test_confirmed_match_is_toxic() {
        let index = index_of(b"TTTTTACACACACACACACAT");
        let candidate = b"ACACACACACACACATTTTTT";
        let analysis = analyze(candidate, &index);
        assert_eq!(analysis.status, SafetyStatus::Toxic);
        assert!(!analysis.is_safe);
        assert_eq!(analysis.overall_safety_score, 0.0);
        assert_eq!(analysis.match_length, 15);
        assert_eq!(analysis.safety_margin, 0);
    }

    #[test]
    fn test_clean_candidate() {
        let index = index_of(b"GGGGGGGGGGGGGGGGGGGGGGGG");
        let candidate = b"ATACTATCGTATCTACTCATA";
        let analysis = analyze(candidate, &index);
        assert_eq!(analysis.status, SafetyStatus::Cleared);
        assert!(analysis.is_safe);
        assert_eq!(analysis.match_length, 0);
        assert_eq!(analysis.safety_margin, 15);
        assert!(!analysis.has_seed_match);
        assert_float_eq!(analysis.overall_safety_score, 100.0, abs <= 1e-9);
    }

    #[test]
    fn test_seed_risk_tiers() {
        assert_eq!(seed_risk_for(0), 0.0);
        assert_eq!(seed_risk_for(1), 15.0);
        assert_eq!(seed_risk_for(10), 15.0);
        assert_eq!(seed_risk_for(11), 30.0);
        assert_eq!(seed_risk_for(50), 30.0);
        assert_eq!(seed_risk_for(51), 50.0);
        assert_eq!(seed_risk_for(100), 50.0);
        assert_eq!(seed_risk_for(101), 80.0);
    }

    #[test]
    fn test_seed_counts_include_reverse_complement() {
        // Seed of the candidate is TACTGGT (positions 2-8); its reverse
        // complement is ACCAGTA. Non-target carries only the latter.
        let index = index_of(b"CCCCACCAGTACCCC");
        let candidate = b"ATACTGGTCTATGTACTCATA";
        let analysis = analyze(candidate, &index);
        assert!(analysis.has_seed_match);
        assert_eq!(analysis.seed_match_count, 1);
        assert_eq!(analysis.seed_risk, 15.0);
    }

    #[test]
    fn test_palindrome_detection() {
        // GAATTC is its own reverse complement.
        let (len, pos) = longest_palindrome(b"TTTTTGAATTCTTTTT").unwrap();
        assert_eq!((len, pos), (6, 5));
        assert_eq!(longest_palindrome(b"AAAAACCCCCAAAAA"), None);
        // Length-8 self-complement scores higher.
        let (len, _) = longest_palindrome(b"TATGCGCATATATATATATAT").unwrap();
        assert!(len >= 8);
        assert_eq!(palindrome_risk_for(8), 60.0);
        assert_eq!(palindrome_risk_for(7), 30.0);
        assert_eq!(palindrome_risk_for(5), 10.0);
        assert_eq!(palindrome_risk_for(3), 0.0);
    }

    #[test]
    fn test_cpg_counting_non_overlapping() {
        assert_eq!(cpg_count(b"CGCGCG"), 3);
        assert_eq!(cpg_count(b"CCGG"), 1);
        assert_eq!(cpg_count(b"ATATAT"), 0);
    }

    #[test]
    fn test_biological_motifs() {
        let index = index_of(b"GGGGGGGGGGGGGGGGGGGGGGGG");
        // Has a TTTT run and UGGC (as TGGC after transcription).
        let candidate = b"ATACTTTTCTATGGCCTCATA";
        let analysis = analyze(candidate, &index);
        assert!(analysis.has_poly_run);
        assert_eq!(analysis.poly_run_details, vec!["TTTT".to_string()]);
        assert!(analysis
            .immune_motifs
            .contains(&"UGGC".to_string()));
        assert_float_eq!(analysis.biological_risk_score, 55.0, abs <= 1e-9);
    }

    #[test]
    fn test_aggregate_arithmetic() {
        // 13-nt contiguous match, moderate seed traffic, short palindrome,
        // one motif class: 100 - 20 - 9 - 1.5 - 2 = 67.5.
        let score = aggregate_score(false, 13, false, 30.0, 10.0, 20.0);
        assert_float_eq!(score, 67.5, abs <= 1e-9);
        assert_eq!(aggregate_score(true, 0, false, 0.0, 0.0, 0.0), 0.0);
        // Deductions past zero clamp at the floor.
        assert_float_eq!(aggregate_score(false, 14, true, 80.0, 60.0, 75.0), 0.0, abs <= 1e-9);
        assert_float_eq!(aggregate_score(false, 0, false, 0.0, 0.0, 0.0), 100.0, abs <= 1e-9);
    }

    #[test]
    fn test_seed_warning_status() {
        // Non-target stuffed with the seed pushes the count past 50.
        let mut stuffed = Vec::new();
        for _ in 0..60 {
            stuffed.extend_from_slice(b"TACTGGT");
        }
        let index = index_of(&stuffed);
        let candidate = b"ATACTGGTCTATGTACTCATA";
        let analysis = analyze(candidate, &index);
        assert!(analysis.seed_match_count > 50);
        assert_eq!(analysis.status, SafetyStatus::SeedWarning);
        assert!(analysis.is_safe, "seed warnings are not rejections by themselves");
    }
}
