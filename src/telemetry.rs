//! Adaptive progress telemetry
//!
//! Reports candidates/sec as an exponential moving average (alpha = 0.5).
//! The reporting cadence self-tunes: reports arriving faster than ~2.5s
//! apart double the candidate threshold (and reseed the average, since the
//! old samples were measured at a different granularity); reports slower
//! than ~10s apart halve it. Purely observational - enabled with -v,
//! otherwise silent.

use std::time::Instant;

const ALPHA: f64 = 0.5;
const MIN_INTERVAL_NS: u64 = 2_500_000_000;
const MAX_INTERVAL_NS: u64 = 10_000_000_000;

pub struct ProgressMeter {
    clock: Instant,
    /// Candidates between reports; grows/shrinks in powers of two.
    threshold: u64,
    start_ns: u64,
    last_ns: u64,
    last_lines: u64,
    rate_avg: f64,
}

impl ProgressMeter {
    pub fn new() -> Self {
        Self::with_origin(Instant::now())
    }

    fn with_origin(clock: Instant) -> Self {
        Self {
            clock,
            threshold: 1,
            start_ns: 0,
            last_ns: 0,
            last_lines: 0,
            rate_avg: -1.0,
        }
    }

    /// Report line when one is due, given total counters so far. `eof`
    /// forces a final report.
    pub fn tick(&mut self, lines: u64, found: u64, errors: u64, eof: bool) -> Option<String> {
        let now_ns = self.clock.elapsed().as_nanos() as u64;
        self.tick_at(now_ns, lines, found, errors, eof)
    }

    fn tick_at(
        &mut self,
        now_ns: u64,
        lines: u64,
        found: u64,
        errors: u64,
        eof: bool,
    ) -> Option<String> {
        if !eof && lines.saturating_sub(self.last_lines) < self.threshold {
            return None;
        }

        let delta_ns = (now_ns - self.last_ns).max(1);
        let elapsed_ns = now_ns - self.start_ns;
        let line_delta = lines - self.last_lines;
        let rate = line_delta as f64 * 1e9 / delta_ns as f64;

        if self.rate_avg < 0.0 {
            self.rate_avg = rate;
        } else {
            self.rate_avg = ALPHA * rate + (1.0 - ALPHA) * self.rate_avg;
        }

        // Retune cadence toward one report every ~5 seconds; a retune makes
        // the accumulated average incomparable, so reseed it.
        if delta_ns < MIN_INTERVAL_NS {
            self.threshold = (self.threshold << 1) | 1;
            self.rate_avg = rate;
        } else if delta_ns > MAX_INTERVAL_NS {
            self.threshold >>= 1;
            self.threshold = self.threshold.max(1);
            self.rate_avg = rate;
        }

        self.last_ns = now_ns;
        self.last_lines = lines;

        Some(format!(
            " rate: {:9.2} c/s found: {:5}/{:<10} errors: {} elapsed: {:8.3}s",
            self.rate_avg,
            found,
            lines,
            errors,
            elapsed_ns as f64 / 1e9,
        ))
    }
}

impl Default for ProgressMeter {
    fn default() -> Self {
        Self::new()
    }
}
