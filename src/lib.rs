pub mod bloom;
pub mod constants;
pub mod efficacy;
pub mod error;
pub mod export;
pub mod fasta;
pub mod fold;
pub mod index;
pub mod kmer;
pub mod pipeline;
pub mod safety;
pub mod utils;

pub use efficacy::Species;
pub use error::{Error, Warning};
pub use fasta::Sequence;
pub use index::{IndexOptions, IndexReport, NonTargetIndex, RetainPolicy};
pub use pipeline::{Candidate, DesignConfig, PipelineOptions, PipelineOutput, RejectionMetrics};
pub use safety::{SafetyAnalysis, SafetyStatus};
