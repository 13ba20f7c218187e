use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use brainsweep::cli::Cli;
use brainsweep::ecmult::EcmultTable;
use brainsweep::error::Result;
use brainsweep::filter::BloomFilter;
use brainsweep::pipeline::{Pipeline, PipelineConfig};
use brainsweep::transform::Transform;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("brainsweep: {}", e);
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let transform = Transform::from_options(
        &cli.input_type,
        cli.salt.as_deref().map(str::as_bytes),
        cli.passphrase.as_deref().map(str::as_bytes),
    )?;

    let table = match &cli.table {
        // An explicit -w must agree with the file; otherwise the file's
        // window wins.
        Some(path) => {
            if cli.verbose {
                eprintln!("[+] loading multiplication table from {}", path.display());
            }
            EcmultTable::load(path, cli.window)?
        }
        None => {
            let window = cli.window.unwrap_or(brainsweep::ecmult::DEFAULT_WINDOW);
            if cli.verbose {
                eprintln!("[+] building {}-bit multiplication table", window);
            }
            EcmultTable::build(window)?
        }
    };

    let filter = match &cli.bloom {
        Some(path) => {
            let f = BloomFilter::load(path)?;
            if cli.verbose {
                eprintln!(
                    "[+] loaded filter: 2^{} bits, {} probes",
                    f.bit_count().trailing_zeros(),
                    f.probes()
                );
            }
            Some(Arc::new(f))
        }
        None => {
            if cli.verbose {
                eprintln!("[!] no filter given: reporting every derived hash160");
            }
            None
        }
    };

    let mut input: Box<dyn BufRead + Send> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut output: Box<dyn Write + Send> = match &cli.output {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(cli.append)
                .truncate(!cli.append)
                .open(path)?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
            eprintln!("\n[!] interrupted, draining...");
        }) {
            eprintln!("[!] could not install signal handler: {}", e);
        }
    }

    let pipeline = Pipeline::new(
        Arc::new(table),
        filter,
        PipelineConfig {
            transform,
            threads: cli.threads.max(1),
            verbose: cli.verbose,
        },
    );

    let report = pipeline.run(&mut *input, &mut *output, &shutdown)?;

    if cli.verbose {
        eprintln!(
            "[+] done: {} candidates, {} matches, {} skipped",
            report.candidates, report.matches, report.errors
        );
    }
    Ok(0)
}
