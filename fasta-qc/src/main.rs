use std::{fs::File, io::BufReader, path::PathBuf};

use bio::io::fasta;
use clap::Parser;
use miette::IntoDiagnostic;
use num_format::{Locale, ToFormattedString};

#[derive(Parser)]
struct Args {
    /// FASTA file to summarize
    #[clap(short, long)]
    input: PathBuf,

    /// Flag records whose N fraction exceeds this percentage
    #[clap(short, long, default_value_t = 5.0)]
    cutoff: f64,

    #[clap(short, long)]
    output: PathBuf,
}

#[derive(serde::Serialize)]
struct Output<'a> {
    record_id: &'a str,
    length: usize,
    gc_percent: f64,
    n_percent: f64,
    flagged: bool,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let file = File::create(args.output).into_diagnostic()?;
    let mut writer = csv::WriterBuilder::default()
        .delimiter(b'\t')
        .from_writer(file);

    let reader = fasta::Reader::new(BufReader::new(File::open(args.input).into_diagnostic()?));
    let mut total_bases = 0u128;
    let mut flagged_records = 0u64;

    for record in reader.records() {
        let record = record.into_diagnostic()?;
        let seq = record.seq();

        let mut gc = 0usize;
        let mut acgt = 0usize;
        let mut ambiguous = 0usize;
        for base in seq.iter().map(u8::to_ascii_uppercase) {
            match base {
                b'G' | b'C' => {
                    gc += 1;
                    acgt += 1;
                }
                b'A' | b'T' | b'U' => acgt += 1,
                _ => ambiguous += 1,
            }
        }
        let gc_percent = if acgt == 0 {
            0.0
        } else {
            gc as f64 / acgt as f64 * 100.0
        };
        let n_percent = if seq.is_empty() {
            0.0
        } else {
            ambiguous as f64 / seq.len() as f64 * 100.0
        };
        let flagged = n_percent > args.cutoff;
        if flagged {
            flagged_records += 1;
        }
        total_bases += seq.len() as u128;

        let output = Output {
            record_id: record.id(),
            length: seq.len(),
            gc_percent,
            n_percent,
            flagged,
        };
        writer.serialize(output).into_diagnostic()?;
    }
    writer.flush().into_diagnostic()?;

    println!(
        "Total bases:      {}",
        total_bases.to_formatted_string(&Locale::en)
    );
    println!(
        "Flagged records:  {}",
        flagged_records.to_formatted_string(&Locale::en)
    );
    Ok(())
}
