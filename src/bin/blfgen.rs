//! blfgen: build a BLF1 target filter from a list of hash160s.
//!
//! Input is newline-delimited lowercase or uppercase hex, 40 characters per
//! line. Lines that do not decode are skipped and counted.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use brainsweep::error::Result;
use brainsweep::filter::{BloomFilter, DEFAULT_PROBES};
use brainsweep::types::Hash160;

#[derive(Parser, Debug)]
#[command(name = "blfgen", version, about = "Build a target filter from hash160 hex lines")]
struct Cli {
    /// Read hash160 lines from this file instead of stdin
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Where to write the filter blob
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: PathBuf,

    /// log2 of the bit-array length (16-32); 4x-8x bits per target keeps
    /// the false-positive rate low
    #[arg(short = 'n', long = "bits", value_name = "LOG2", default_value_t = 32)]
    log2_bits: u8,

    /// Probes per lookup (1-20)
    #[arg(short = 'k', long = "probes", value_name = "N", default_value_t = DEFAULT_PROBES)]
    probes: usize,
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("blfgen: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut filter = BloomFilter::with_params(cli.log2_bits, cli.probes)?;

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut inserted = 0u64;
    let mut skipped = 0u64;
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_hash160(trimmed) {
            Some(hash) => {
                filter.insert(&hash);
                inserted += 1;
            }
            None => skipped += 1,
        }
    }

    filter.save(&cli.output)?;

    eprintln!(
        "[+] {}: {} targets, 2^{} bits, {} probes, predicted fp rate {:.3e}",
        cli.output.display(),
        inserted,
        cli.log2_bits,
        filter.probes(),
        filter.predicted_fp_rate(inserted)
    );
    if skipped > 0 {
        eprintln!("[!] skipped {} malformed lines", skipped);
    }
    Ok(())
}

fn parse_hash160(line: &str) -> Option<Hash160> {
    if line.len() != 40 {
        return None;
    }
    let bytes = hex::decode(line).ok()?;
    Some(Hash160::from_slice(&bytes))
}
