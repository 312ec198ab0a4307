//! Generates a deterministic synthetic target/non-target FASTA pair for the
//! integration tests and CLI demos.

use std::path::PathBuf;

use bio::io::fasta;
use eyre::Result;
use rand::{rngs::SmallRng, Rng, SeedableRng};

const TARGET_LENGTH: usize = 2_000;
const NON_TARGET_LENGTH: usize = 50_000;

fn random_sequence(rng: &mut SmallRng, length: usize) -> Vec<u8> {
    (0..length).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

fn main() -> Result<()> {
    jane_eyre::install()?;
    let args = std::env::args().collect::<Vec<_>>();
    let output_dir = if args.len() <= 1 {
        "test_data"
    } else {
        &args[1]
    };
    let output_dir = PathBuf::from(output_dir);
    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir)?;
    }

    let mut rng = SmallRng::seed_from_u64(2456);
    let target = random_sequence(&mut rng, TARGET_LENGTH);
    let non_target = random_sequence(&mut rng, NON_TARGET_LENGTH);

    let target_path = output_dir.join("target.fa");
    let mut writer = fasta::Writer::to_file(&target_path)?;
    writer.write("target", Some("synthetic pest transcript"), &target)?;

    let non_target_path = output_dir.join("non_target.fa");
    let mut writer = fasta::Writer::to_file(&non_target_path)?;
    writer.write(
        "non_target",
        Some("synthetic beneficial-organism transcript"),
        &non_target,
    )?;

    println!("{}", target_path.display());
    println!("{}", non_target_path.display());
    Ok(())
}
