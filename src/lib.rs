//! brainsweep: streaming brainwallet candidate auditor
//!
//! The pipeline is Read -> Transform -> Derive -> Filter-check -> Emit:
//! - `transform`: candidate bytes to a 32-byte scalar (plain, hex, KDF)
//! - `ecmult`: windowed precomputed secp256k1 scalar multiplication
//! - `derive`: public point to compressed + uncompressed hash160
//! - `filter`: bloom-filter membership over target hash160s
//! - `pipeline`: the streaming loop, single-threaded or worker pool
//! - `telemetry`: adaptive progress reporting

pub mod cli;
pub mod crypto;
pub mod derive;
pub mod ecmult;
pub mod error;
pub mod filter;
pub mod kdf;
pub mod pipeline;
pub mod telemetry;
pub mod transform;
pub mod types;

pub use error::{CandidateError, Result, SweepError};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
