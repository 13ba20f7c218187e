//! Command line interface

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "brainsweep",
    version,
    about = "Streaming brainwallet candidate auditor",
    long_about = "Reads newline-delimited candidates, derives the secp256k1 \
                  hash160 for each (compressed and uncompressed), and reports \
                  those present in a target filter. With no filter, every \
                  derived hash160 is reported."
)]
pub struct Cli {
    /// Read candidates from this file instead of stdin
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write matches to this file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Append to the output file instead of truncating it
    #[arg(short = 'a', long = "append", requires = "output")]
    pub append: bool,

    /// Target filter blob (BLF1); omit to report every derived hash160
    #[arg(short = 'b', long = "bloom", value_name = "FILE")]
    pub bloom: Option<PathBuf>,

    /// Candidate interpretation: str, hex, priv, warp, bwio or bv2
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "str")]
    pub input_type: String,

    /// Fixed salt for the salted types (candidates are passphrases)
    #[arg(short = 's', long = "salt", value_name = "SALT")]
    pub salt: Option<String>,

    /// Fixed passphrase for the salted types (candidates are salts)
    #[arg(short = 'p', long = "passphrase", value_name = "PASS")]
    pub passphrase: Option<String>,

    /// Multiplication window width in bits (1-28); wider is faster but
    /// needs 3*2^w KiB to build
    #[arg(short = 'w', long = "window", value_name = "BITS")]
    pub window: Option<u32>,

    /// Load a precomputed multiplication table (ECMT) instead of building
    /// one; the window is taken from the file unless -w is also given
    #[arg(short = 'm', long = "table", value_name = "FILE")]
    pub table: Option<PathBuf>,

    /// Worker threads (1 = run everything on the calling thread)
    #[arg(short = 'j', long = "threads", value_name = "N", default_value_t = 1)]
    pub threads: usize,

    /// Periodic progress reports on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["brainsweep"]);
        assert_eq!(cli.input_type, "str");
        assert_eq!(cli.threads, 1);
        assert!(cli.window.is_none());
        assert!(!cli.verbose);
        assert!(!cli.append);
    }

    #[test]
    fn test_full_invocation() {
        let cli = Cli::parse_from([
            "brainsweep",
            "-i", "words.txt",
            "-o", "hits.txt",
            "-a",
            "-b", "targets.blf",
            "-t", "warp",
            "-s", "pepper",
            "-w", "20",
            "-j", "8",
            "-v",
        ]);
        assert_eq!(cli.input_type, "warp");
        assert_eq!(cli.salt.as_deref(), Some("pepper"));
        assert_eq!(cli.window, Some(20));
        assert_eq!(cli.threads, 8);
        assert!(cli.append && cli.verbose);
    }

    #[test]
    fn test_append_requires_output() {
        assert!(Cli::try_parse_from(["brainsweep", "-a"]).is_err());
    }
}
