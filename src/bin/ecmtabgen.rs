//! ecmtabgen: precompute a windowed multiplication table (ECMT) so wide
//! windows pay their build cost once instead of at every startup.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use brainsweep::ecmult::{EcmultTable, DEFAULT_WINDOW};
use brainsweep::error::Result;

#[derive(Parser, Debug)]
#[command(name = "ecmtabgen", version, about = "Precompute a multiplication table file")]
struct Cli {
    /// Window width in bits (1-28); the build needs 3*2^w KiB of RAM
    #[arg(short = 'w', long = "window", value_name = "BITS", default_value_t = DEFAULT_WINDOW)]
    window: u32,

    /// Where to write the table file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: PathBuf,
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("ecmtabgen: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    eprintln!(
        "[+] building {}-bit table ({} KiB working set)",
        cli.window,
        EcmultTable::required_build_kib(cli.window)
    );
    let table = EcmultTable::build(cli.window)?;
    table.save(&cli.output)?;
    let windows = 256u64.div_ceil(u64::from(cli.window));
    let points = windows * ((1u64 << cli.window) - 1);
    eprintln!(
        "[+] {}: {} points, {} MiB resident",
        cli.output.display(),
        points,
        table.memory_bytes() / (1024 * 1024)
    );
    Ok(())
}
