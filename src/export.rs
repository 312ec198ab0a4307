//! Candidate table export. Field order is stable for downstream consumers;
//! floats are written with two decimals and a point separator.

use std::io::Write;

use crate::pipeline::Candidate;

pub const CSV_HEADER: [&str; 14] = [
    "sequence",
    "position",
    "efficiency",
    "safety_score",
    "gc_content",
    "status",
    "match_length",
    "fold_risk",
    "seed",
    "has_seed_match",
    "has_palindrome",
    "palindrome_length",
    "has_cpg_motif",
    "has_poly_run",
];

pub fn write_candidates<W: Write>(writer: W, candidates: &[Candidate]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for candidate in candidates {
        wtr.write_record([
            candidate.sequence.clone(),
            candidate.position.to_string(),
            format!("{:.2}", candidate.efficacy),
            format!("{:.2}", candidate.safety_score),
            format!("{:.2}", candidate.gc_content),
            candidate.status.to_string(),
            candidate.match_length.to_string(),
            candidate.fold_risk.to_string(),
            candidate.seed.clone(),
            candidate.has_seed_match.to_string(),
            candidate.has_palindrome.to_string(),
            candidate.palindrome_length.to_string(),
            candidate.has_cpg.to_string(),
            candidate.has_poly_run.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::safety::SafetyStatus;

    fn sample_candidate() -> Candidate {
        Candidate {
            sequence: "ATGCGTGAGTGCATCTCCATC".to_string(),
            position: 42,
            gc_content: 52.381,
            match_length: 7,
            efficacy: 81.5,
            fold_risk: 0,
            safety_score: 98.5,
            seed: "TGCGTGA".to_string(),
            has_seed_match: false,
            seed_match_count: 0,
            has_palindrome: true,
            palindrome_length: 4,
            has_cpg: false,
            has_poly_run: false,
            status: SafetyStatus::Cleared,
            risk_factors: Vec::new(),
            safety_notes: Vec::new(),
        }
    }

    #[test]
    fn test_stable_field_order() {
        let mut out = Vec::new();
        write_candidates(&mut out, &[sample_candidate()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "sequence,position,efficiency,safety_score,gc_content,status,match_length,\
             fold_risk,seed,has_seed_match,has_palindrome,palindrome_length,has_cpg_motif,\
             has_poly_run"
        );
        assert_eq!(
            lines.next().unwrap(),
            "ATGCGTGAGTGCATCTCCATC,42,81.50,98.50,52.38,Cleared,7,0,TGCGTGA,false,true,4,false,false"
        );
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let mut out = Vec::new();
        write_candidates(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
