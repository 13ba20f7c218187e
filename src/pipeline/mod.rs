//! Streaming pipeline controller
//!
//! Per candidate: Read -> Transform -> Derive -> Filter-check (or
//! report-all) -> Emit. Candidate failures are counted and skipped; only
//! I/O failures on the match stream abort the run.
//!
//! With `threads > 1` the same steps run as a reader -> workers -> writer
//! pipeline over bounded channels. The table and filter are immutable after
//! construction and shared read-only; each worker owns its scratch buffers,
//! and a candidate's records travel as a single message so its lines can
//! never interleave with another candidate's.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::derive::{derive_pair, DerivedPair};
use crate::ecmult::EcmultTable;
use crate::error::{CandidateError, Result};
use crate::filter::BloomFilter;
use crate::telemetry::ProgressMeter;
use crate::transform::{DecodeScratch, Transform};
use crate::types::{Hash160, Parity};

/// Candidates in flight between reader and workers / workers and writer.
const CHANNEL_DEPTH: usize = 4096;

pub struct PipelineConfig {
    pub transform: Transform,
    pub threads: usize,
    pub verbose: bool,
}

/// Aggregate counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    pub candidates: u64,
    pub matches: u64,
    pub errors: u64,
}

pub struct Pipeline {
    table: Arc<EcmultTable>,
    filter: Option<Arc<BloomFilter>>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        table: Arc<EcmultTable>,
        filter: Option<Arc<BloomFilter>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            table,
            filter,
            config,
        }
    }

    /// Drive the stream to EOF (or shutdown). Returns the aggregate
    /// counters; the exit code never depends on the match count.
    pub fn run(
        &self,
        input: &mut (dyn BufRead + Send),
        output: &mut (dyn Write + Send),
        shutdown: &AtomicBool,
    ) -> Result<PipelineReport> {
        if self.config.threads > 1 {
            self.run_workers(input, output, shutdown)
        } else {
            self.run_single(input, output, shutdown)
        }
    }

    // ========================================================================
    // SINGLE-STREAM MODE
    // ========================================================================

    fn run_single(
        &self,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
        shutdown: &AtomicBool,
    ) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        let mut meter = self.config.verbose.then(ProgressMeter::new);
        let mut scratch = DecodeScratch::new();
        let mut line = Vec::with_capacity(256);
        let mut records = Vec::with_capacity(256);

        loop {
            line.clear();
            let n = input.read_until(b'\n', &mut line)?;
            let eof = n == 0;

            if !eof {
                strip_newline(&mut line);
                report.candidates += 1;

                records.clear();
                match self.process(&line, &mut scratch, &mut records) {
                    Ok(emitted) => {
                        if emitted > 0 {
                            report.matches += emitted;
                            output.write_all(&records)?;
                            output.flush()?;
                        }
                    }
                    Err(_) => report.errors += 1,
                }
            }

            if let Some(m) = meter.as_mut() {
                if let Some(status) =
                    m.tick(report.candidates, report.matches, report.errors, eof)
                {
                    eprint!("\r\x1b[2K{}", status);
                }
            }

            if eof || shutdown.load(Ordering::Relaxed) {
                break;
            }
        }

        if meter.is_some() {
            eprintln!();
        }
        output.flush()?;
        Ok(report)
    }

    // ========================================================================
    // WORKER-POOL MODE
    // ========================================================================

    fn run_workers(
        &self,
        input: &mut (dyn BufRead + Send),
        output: &mut (dyn Write + Send),
        shutdown: &AtomicBool,
    ) -> Result<PipelineReport> {
        let candidates = AtomicU64::new(0);
        let matches = AtomicU64::new(0);
        let errors = AtomicU64::new(0);
        let read_error: Mutex<Option<std::io::Error>> = Mutex::new(None);
        let mut write_result: Result<()> = Ok(());

        thread::scope(|scope| {
            let (cand_tx, cand_rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) =
                bounded(CHANNEL_DEPTH);
            let (rec_tx, rec_rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) =
                bounded(CHANNEL_DEPTH);

            // Reader: owns the input cursor, feeds the shared queue.
            scope.spawn(|| {
                let mut line = Vec::with_capacity(256);
                loop {
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    line.clear();
                    match input.read_until(b'\n', &mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            strip_newline(&mut line);
                            if cand_tx.send(line.clone()).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            *read_error.lock().expect("reader mutex") = Some(e);
                            break;
                        }
                    }
                }
                drop(cand_tx);
            });

            // Workers: private scratch each, shared read-only table/filter.
            for _ in 0..self.config.threads {
                let cand_rx = cand_rx.clone();
                let rec_tx = rec_tx.clone();
                let candidates = &candidates;
                let matches = &matches;
                let errors = &errors;
                scope.spawn(move || {
                    let mut scratch = DecodeScratch::new();
                    let mut records = Vec::with_capacity(256);
                    for candidate in cand_rx.iter() {
                        candidates.fetch_add(1, Ordering::Relaxed);
                        records.clear();
                        match self.process(&candidate, &mut scratch, &mut records) {
                            Ok(emitted) if emitted > 0 => {
                                matches.fetch_add(emitted, Ordering::Relaxed);
                                if rec_tx.send(records.clone()).is_err() {
                                    break;
                                }
                            }
                            Ok(_) => {}
                            Err(_) => {
                                errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
            drop(cand_rx);
            drop(rec_tx);

            // Writer + telemetry run on the calling thread: single owner of
            // the output stream, whole-record messages only. A write failure
            // turns the loop into a drain so blocked workers can finish.
            let mut meter = self.config.verbose.then(ProgressMeter::new);
            loop {
                match rec_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(buf) => {
                        if write_result.is_ok() {
                            if let Err(e) = output.write_all(&buf).and_then(|_| output.flush()) {
                                write_result = Err(e.into());
                                shutdown.store(true, Ordering::Relaxed);
                            }
                        }
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
                if let Some(m) = meter.as_mut() {
                    if let Some(status) = m.tick(
                        candidates.load(Ordering::Relaxed),
                        matches.load(Ordering::Relaxed),
                        errors.load(Ordering::Relaxed),
                        false,
                    ) {
                        eprint!("\r\x1b[2K{}", status);
                    }
                }
            }
            if let Some(m) = meter.as_mut() {
                if let Some(status) = m.tick(
                    candidates.load(Ordering::Relaxed),
                    matches.load(Ordering::Relaxed),
                    errors.load(Ordering::Relaxed),
                    true,
                ) {
                    eprint!("\r\x1b[2K{}", status);
                }
                eprintln!();
            }
        });

        write_result?;
        if let Some(e) = read_error.lock().expect("reader mutex").take() {
            return Err(e.into());
        }
        output.flush()?;

        Ok(PipelineReport {
            candidates: candidates.load(Ordering::Relaxed),
            matches: matches.load(Ordering::Relaxed),
            errors: errors.load(Ordering::Relaxed),
        })
    }

    // ========================================================================
    // PER-CANDIDATE WORK
    // ========================================================================

    /// Transform, derive and filter one candidate, appending any reportable
    /// records to `records`. Returns how many records were emitted.
    fn process(
        &self,
        candidate: &[u8],
        scratch: &mut DecodeScratch,
        records: &mut Vec<u8>,
    ) -> std::result::Result<u64, CandidateError> {
        let scalar = self.config.transform.apply(candidate, scratch)?;
        let DerivedPair {
            compressed,
            uncompressed,
        } = derive_pair(&self.table, &scalar)?;

        let label = self.config.transform.label();
        let mut emitted = 0u64;
        match &self.filter {
            Some(filter) => {
                if filter.contains(&uncompressed) {
                    write_record(records, &uncompressed, Parity::Uncompressed, label, candidate);
                    emitted += 1;
                }
                if filter.contains(&compressed) {
                    write_record(records, &compressed, Parity::Compressed, label, candidate);
                    emitted += 1;
                }
            }
            // No filter configured: report-all mode, both digests.
            None => {
                write_record(records, &uncompressed, Parity::Uncompressed, label, candidate);
                write_record(records, &compressed, Parity::Compressed, label, candidate);
                emitted = 2;
            }
        }
        Ok(emitted)
    }
}

#[inline]
fn strip_newline(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

/// Append one `hash160_hex:parity:transform:candidate\n` record. Candidate
/// bytes pass through verbatim.
fn write_record(out: &mut Vec<u8>, hash: &Hash160, parity: Parity, label: &str, candidate: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    for &b in hash.as_bytes() {
        out.push(HEX[(b >> 4) as usize]);
        out.push(HEX[(b & 0x0f) as usize]);
    }
    out.push(b':');
    out.push(parity.tag());
    out.push(b':');
    out.extend_from_slice(label.as_bytes());
    out.push(b':');
    out.extend_from_slice(candidate);
    out.push(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_newline_variants() {
        let mut a = b"abc\n".to_vec();
        strip_newline(&mut a);
        assert_eq!(a, b"abc");

        let mut b = b"abc\r\n".to_vec();
        strip_newline(&mut b);
        assert_eq!(b, b"abc");

        let mut c = b"abc".to_vec();
        strip_newline(&mut c);
        assert_eq!(c, b"abc");

        let mut d = b"\n".to_vec();
        strip_newline(&mut d);
        assert_eq!(d, b"");
    }

    #[test]
    fn test_record_format() {
        let mut out = Vec::new();
        let hash = Hash160::from_slice(&[0xab; 20]);
        write_record(&mut out, &hash, Parity::Compressed, "str", b"hunter2");
        assert_eq!(
            out,
            format!("{}:c:str:hunter2\n", "ab".repeat(20)).as_bytes()
        );
    }

    #[test]
    fn test_record_passes_candidate_bytes_verbatim() {
        // Candidates are byte strings, not UTF-8.
        let mut out = Vec::new();
        let hash = Hash160::from_slice(&[0x00; 20]);
        write_record(&mut out, &hash, Parity::Uncompressed, "hex", &[0xff, 0xfe]);
        assert!(out.ends_with(&[b':', 0xff, 0xfe, b'\n']));
    }
}
