use thiserror::Error;

use crate::constants::{MAX_GENOME_SIZE, MIN_GENOME_SIZE};

/// Everything the core can fail with. Validation variants stop a run before
/// it starts; `MemoryCeiling` is raised at index construction;
/// `InvariantViolation` indicates a bug and aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("sequence is empty")]
    EmptySequence,

    #[error("sequence too short: {0} nt (minimum {MIN_GENOME_SIZE})")]
    SequenceTooShort(usize),

    #[error("sequence too large: {0} bytes (maximum {MAX_GENOME_SIZE})")]
    SequenceTooLarge(usize),

    #[error("invalid character {found:?} at position {position}")]
    InvalidCharacter { found: char, position: usize },

    #[error("efficacy threshold {0} outside [50, 99]")]
    InvalidThreshold(f64),

    #[error("estimated index memory {estimated} bytes exceeds ceiling {ceiling}")]
    MemoryCeiling { estimated: usize, ceiling: usize },

    #[error("index construction canceled")]
    Canceled,

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Non-fatal findings that accompany a successful validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Fraction of `N` bases exceeds 5% of the inspected prefix.
    HighAmbiguity { percent: f64 },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::HighAmbiguity { percent } => {
                write!(f, "high N content: {percent:.1}% of inspected bases")
            }
        }
    }
}
