//! Pipeline orchestration: slide a 21-nt window across the target, pass each
//! window through quality, safety, folding and efficacy filters, and rank
//! the survivors. One logical owner per run; yields and cancellation checks
//! happen every [`PROGRESS_INTERVAL`] windows.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde::Serialize;

use crate::{
    constants::{
        DEFAULT_EFFICACY_THRESHOLD, MAX_EFFICACY_THRESHOLD, MAX_FOLD_RISK, MIN_EFFICACY_THRESHOLD,
        MIN_SAFETY_SCORE, PATENT_EXCLUSION_LENGTH, PROGRESS_INTERVAL, SCAN_LIMIT, SIRNA_LENGTH,
    },
    efficacy::{efficacy_score, Species},
    error::{Error, Result},
    fasta::Sequence,
    fold::fold_risk,
    index::NonTargetIndex,
    safety::{analyze, SafetyStatus},
    utils::{gc_percent, ProgressFn},
};

/// Run configuration. `homology_threshold`, `rnai_mode` and
/// `delivery_system` are informational pass-throughs for reporting; the
/// core algorithms treat the exclusion length as fixed.
#[derive(Debug, Clone, Serialize)]
pub struct DesignConfig {
    pub efficacy_threshold: f64,
    pub species: Species,
    pub homology_threshold: usize,
    pub rnai_mode: Option<String>,
    pub delivery_system: Option<String>,
}

impl Default for DesignConfig {
    fn default() -> Self {
        DesignConfig {
            efficacy_threshold: DEFAULT_EFFICACY_THRESHOLD,
            species: Species::default(),
            homology_threshold: PATENT_EXCLUSION_LENGTH,
            rnai_mode: None,
            delivery_system: None,
        }
    }
}

impl DesignConfig {
    fn validate(&self) -> Result<()> {
        if !(MIN_EFFICACY_THRESHOLD..=MAX_EFFICACY_THRESHOLD).contains(&self.efficacy_threshold) {
            return Err(Error::InvalidThreshold(self.efficacy_threshold));
        }
        Ok(())
    }
}

/// One counter per filter stage; a rejected window increments exactly the
/// first stage that failed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectionMetrics {
    pub safety: u64,
    pub folding: u64,
    pub efficacy: u64,
    pub data_quality: u64,
}

impl RejectionMetrics {
    pub fn total(&self) -> u64 {
        self.safety + self.folding + self.efficacy + self.data_quality
    }
}

/// A surviving guide-strand candidate with its evaluation summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub sequence: String,
    pub position: usize,
    pub gc_content: f64,
    pub match_length: usize,
    pub efficacy: f64,
    pub fold_risk: u8,
    pub safety_score: f64,
    pub seed: String,
    pub has_seed_match: bool,
    pub seed_match_count: u32,
    pub has_palindrome: bool,
    pub palindrome_length: usize,
    pub has_cpg: bool,
    pub has_poly_run: bool,
    pub status: SafetyStatus,
    pub risk_factors: Vec<String>,
    pub safety_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub candidates: Vec<Candidate>,
    pub metrics: RejectionMetrics,
    pub canceled: bool,
}

fn window_is_scannable(window: &[u8]) -> bool {
    window
        .iter()
        .all(|&b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'U'))
}

/// Orchestrator options. Build with a validated config, then attach an
/// optional progress callback and cancel flag before calling [`run`].
///
/// [`run`]: PipelineOptions::run
pub struct PipelineOptions {
    config: DesignConfig,
    progress: Option<ProgressFn>,
    cancel: Option<Arc<AtomicBool>>,
}

impl PipelineOptions {
    pub fn try_new(config: DesignConfig) -> Result<Self> {
        config.validate()?;
        Ok(PipelineOptions {
            config,
            progress: None,
            cancel: None,
        })
    }

    pub fn progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn canceled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn run(mut self, target: &Sequence, index: &NonTargetIndex) -> Result<PipelineOutput> {
        let bytes = target.as_bytes();
        let scan_limit = bytes.len().saturating_sub(SIRNA_LENGTH).min(SCAN_LIMIT);
        log::info!(
            "scanning {} windows against {:?} index",
            scan_limit,
            index.report().variant
        );

        let mut metrics = RejectionMetrics::default();
        let mut candidates = Vec::new();

        for i in 0..scan_limit {
            if i % PROGRESS_INTERVAL == 0 {
                if let Some(progress) = self.progress.as_mut() {
                    progress(i as f64 / scan_limit as f64, "scanning target");
                }
                // Cooperative point; a no-op on preemptive hosts.
                std::thread::yield_now();
                if self.canceled() {
                    log::info!("pipeline canceled at window {i}");
                    return Ok(PipelineOutput {
                        candidates: Vec::new(),
                        metrics,
                        canceled: true,
                    });
                }
            }

            let window = &bytes[i..i + SIRNA_LENGTH];
            if !window_is_scannable(window) {
                metrics.data_quality += 1;
                continue;
            }

            let safety = analyze(window, index);
            if !safety.is_safe || safety.overall_safety_score < MIN_SAFETY_SCORE {
                metrics.safety += 1;
                continue;
            }

            let fold = fold_risk(window);
            if fold > MAX_FOLD_RISK {
                metrics.folding += 1;
                continue;
            }

            let efficacy = efficacy_score(window, self.config.species, fold);
            if efficacy < self.config.efficacy_threshold {
                metrics.efficacy += 1;
                continue;
            }

            if window.len() != SIRNA_LENGTH || safety.match_length >= PATENT_EXCLUSION_LENGTH {
                return Err(Error::InvariantViolation(format!(
                    "window at {i} passed all filters with length {} and match {}",
                    window.len(),
                    safety.match_length
                )));
            }

            candidates.push(Candidate {
                sequence: safety.sequence,
                position: i,
                gc_content: gc_percent(window),
                match_length: safety.match_length,
                efficacy,
                fold_risk: fold,
                safety_score: safety.overall_safety_score,
                seed: safety.seed,
                has_seed_match: safety.has_seed_match,
                seed_match_count: safety.seed_match_count,
                has_palindrome: safety.has_palindrome,
                palindrome_length: safety.palindrome_length,
                has_cpg: safety.has_cpg,
                has_poly_run: safety.has_poly_run,
                status: safety.status,
                risk_factors: safety.risk_factors,
                safety_notes: safety.safety_notes,
            });
        }

        if let Some(progress) = self.progress.as_mut() {
            progress(1.0, "ranking candidates");
        }
        candidates.sort_by(|a, b| {
            b.efficacy
                .total_cmp(&a.efficacy)
                .then(a.position.cmp(&b.position))
        });
        log::info!(
            "{} candidates emitted, {} windows rejected",
            candidates.len(),
            metrics.total()
        );

        Ok(PipelineOutput {
            candidates,
            metrics,
            canceled: false,
        })
    }
}
