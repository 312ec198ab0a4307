use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use eyre::Result;
use human_panic::setup_panic;
use indicatif::{ProgressBar, ProgressStyle};
use librnaguard::{
    export,
    utils::stdout_or_file,
    DesignConfig, IndexOptions, NonTargetIndex, PipelineOptions, RetainPolicy, Sequence, Species,
};
#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about=None)]
/// RNAi guide-strand design with non-target safety screening.
struct Args {
    #[clap(flatten)]
    verbose: Verbosity,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the non-target index and print its construction report
    Index {
        /// Non-target genome FASTA
        #[clap(short, long)]
        non_target: PathBuf,

        /// Retain per-chunk samples instead of the full sequence for
        /// verifying probabilistic index hits
        #[clap(long)]
        samples: bool,

        /// Memory ceiling in bytes for index construction
        #[clap(long)]
        memory_ceiling: Option<usize>,
    },

    /// Scan a target transcript and rank guide-strand candidates
    Design {
        /// Target (pest) transcript FASTA
        #[clap(short, long)]
        target: PathBuf,

        /// Non-target (protected organism) genome FASTA
        #[clap(short, long)]
        non_target: PathBuf,

        /// Candidate CSV output path, stdout when omitted
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Minimum efficacy score for emitted candidates
        #[clap(long, default_value_t = 70.0)]
        threshold: f64,

        /// Species order the guide is optimized for
        #[clap(long, value_enum, default_value_t = Species::Lepidoptera)]
        species: Species,

        /// Retain per-chunk samples instead of the full non-target sequence
        #[clap(long)]
        samples: bool,
    },

    /// Validate a FASTA file and report warnings without designing anything
    Validate {
        #[clap(short, long)]
        input: PathBuf,
    },
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg:>20} [{bar:40}] {percent}%")
            .expect("static template parses")
            .progress_chars("=> "),
    );
    bar
}

fn load_non_target(path: &PathBuf, samples: bool, ceiling: Option<usize>) -> Result<NonTargetIndex> {
    let raw = fs::read(path)?;
    let (non_target, warnings) = Sequence::from_fasta(&raw)?;
    for warning in &warnings {
        log::warn!("{}: {warning}", path.display());
    }

    let bar = progress_bar();
    let tick = bar.clone();
    let mut options = IndexOptions::default().progress(Box::new(move |fraction, phase| {
        tick.set_position((fraction * 100.0) as u64);
        tick.set_message(phase.to_string());
    }));
    if samples {
        options = options.retain_policy(RetainPolicy::Samples);
    }
    if let Some(bytes) = ceiling {
        options = options.memory_ceiling(bytes);
    }
    let index = options.build(&non_target)?;
    bar.finish_and_clear();
    Ok(index)
}

fn main() -> Result<()> {
    setup_panic!();
    jane_eyre::install()?;

    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    match args.command {
        Commands::Index {
            non_target,
            samples,
            memory_ceiling,
        } => {
            let index = load_non_target(&non_target, samples, memory_ceiling)?;
            let report = index.report();
            println!("variant:              {:?}", report.variant);
            println!("indexed k-mers:       {}", report.total_kmers);
            println!("GC content:           {:.2}%", report.gc_percent);
            println!("memory:               {} bytes", report.memory_bytes);
            println!("retain policy:        {:?}", report.retain_policy);
            println!("full sequence kept:   {}", report.retained_full_sequence);
            if let Some(fp) = report.false_positive_estimate {
                println!("false-positive est.:  {fp:.6}");
            }
        }

        Commands::Design {
            target,
            non_target,
            output,
            threshold,
            species,
            samples,
        } => {
            let index = load_non_target(&non_target, samples, None)?;

            let raw = fs::read(&target)?;
            let (target_seq, warnings) = Sequence::target_from_fasta(&raw)?;
            for warning in &warnings {
                log::warn!("{}: {warning}", target.display());
            }

            let config = DesignConfig {
                efficacy_threshold: threshold,
                species,
                ..DesignConfig::default()
            };
            let bar = progress_bar();
            let tick = bar.clone();
            let result = PipelineOptions::try_new(config)?
                .progress(Box::new(move |fraction, phase| {
                    tick.set_position((fraction * 100.0) as u64);
                    tick.set_message(phase.to_string());
                }))
                .run(&target_seq, &index)?;
            bar.finish_and_clear();

            let writer = stdout_or_file(output.as_ref())?;
            export::write_candidates(writer, &result.candidates)?;

            let metrics = result.metrics;
            eprintln!(
                "{} candidates; rejected {} safety, {} folding, {} efficacy, {} data-quality",
                result.candidates.len(),
                metrics.safety,
                metrics.folding,
                metrics.efficacy,
                metrics.data_quality
            );
        }

        Commands::Validate { input } => {
            let raw = fs::read(&input)?;
            let (sequence, warnings) = Sequence::from_fasta(&raw)?;
            println!("{} nt, GC {:.2}%", sequence.len(), sequence.gc_percent());
            for warning in &warnings {
                println!("warning: {warning}");
            }
        }
    }
    Ok(())
}
