//! Windowed precomputed multiplication over the secp256k1 generator
//!
//! The table stores, for every w-bit window of the scalar, the points
//! `d * 2^(w*i) * G` for each nonzero digit value `d`. A scalar
//! multiplication then becomes ceil(256/w) table lookups and mixed
//! additions instead of a full double-and-add ladder. The table is built
//! (or loaded) once and shared read-only for the process lifetime.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{AffinePoint, EncodedPoint, ProjectivePoint};
use rayon::prelude::*;

use crate::crypto::is_valid_private_key;
use crate::error::{CandidateError, Result, SweepError};

pub const MIN_WINDOW: u32 = 1;
pub const MAX_WINDOW: u32 = 28;
pub const DEFAULT_WINDOW: u32 = 16;

const SCALAR_BITS: usize = 256;

/// Table file format v1:
/// - magic:   4 bytes ("ECMT")
/// - version: 1 byte  (current: 1)
/// - window:  1 byte
/// - reserved: 2 bytes (must be 0)
/// - count:   8 bytes (little-endian u64, number of points)
/// - points:  count * 33 bytes (compressed SEC1)
const TABLE_MAGIC: &[u8; 4] = b"ECMT";
const TABLE_VERSION: u8 = 1;
const TABLE_HEADER_SIZE: usize = 16;
const POINT_SIZE: usize = 33;

pub struct EcmultTable {
    window: u32,
    windows: usize,
    /// `windows * (2^window - 1)` affine points; digit 0 is implicit identity.
    points: Vec<AffinePoint>,
}

impl EcmultTable {
    /// One-time build cost in KiB, checked against system memory before
    /// building (peak is roughly 3x the resident table).
    #[inline]
    pub fn required_build_kib(window: u32) -> u64 {
        3u64 * (1u64 << window)
    }

    /// Fail fast if building a table of this window size would not fit in
    /// memory, rather than building and thrashing.
    pub fn check_memory(window: u32, total_ram_bytes: u64) -> Result<()> {
        let required_kib = Self::required_build_kib(window);
        let total_kib = total_ram_bytes / 1024;
        if required_kib > total_kib {
            return Err(SweepError::MemoryCeiling {
                window,
                required_kib,
                total_kib,
            });
        }
        Ok(())
    }

    /// Build the table from scratch. `window` must already be range-checked;
    /// the memory ceiling is enforced here against the running system.
    pub fn build(window: u32) -> Result<Self> {
        if !(MIN_WINDOW..=MAX_WINDOW).contains(&window) {
            return Err(SweepError::WindowSize(window));
        }
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        Self::check_memory(window, sys.total_memory())?;
        Ok(Self::build_unchecked(window))
    }

    fn build_unchecked(window: u32) -> Self {
        let w = window as usize;
        let windows = SCALAR_BITS.div_ceil(w);
        let per_window = (1usize << w) - 1;

        // Window bases: base[i] = 2^(w*i) * G, by repeated doubling.
        let mut bases = Vec::with_capacity(windows);
        let mut base = ProjectivePoint::GENERATOR;
        for _ in 0..windows {
            bases.push(base);
            for _ in 0..w {
                base = base.double();
            }
        }

        // Fill windows in parallel; within a window each entry is the
        // running sum base, 2*base, 3*base, ...
        let points: Vec<AffinePoint> = bases
            .par_iter()
            .flat_map_iter(|&b| {
                let mut column = Vec::with_capacity(per_window);
                let mut acc = ProjectivePoint::IDENTITY;
                for _ in 0..per_window {
                    acc += b;
                    column.push(acc.to_affine());
                }
                column
            })
            .collect();

        Self {
            window,
            windows,
            points,
        }
    }

    #[inline]
    pub fn window_size(&self) -> u32 {
        self.window
    }

    /// Resident size of the point table in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.points.len() * std::mem::size_of::<AffinePoint>()
    }

    #[inline]
    fn entry(&self, win: usize, digit: usize) -> &AffinePoint {
        let per_window = (1usize << self.window) - 1;
        &self.points[win * per_window + (digit - 1)]
    }

    /// Extract the w-bit digit of the scalar at window position `win`.
    /// Bit 0 is the least significant bit of the big-endian scalar.
    #[inline]
    fn digit(&self, key: &[u8; 32], win: usize) -> usize {
        let w = self.window as usize;
        let lo = win * w;
        let hi = (lo + w).min(SCALAR_BITS);
        let mut d = 0usize;
        for bit in lo..hi {
            let byte = key[31 - bit / 8];
            if (byte >> (bit % 8)) & 1 == 1 {
                d |= 1 << (bit - lo);
            }
        }
        d
    }

    /// Scalar multiplication `scalar * G` via table lookups. Produces the
    /// same point as a plain double-and-add ladder for every valid scalar;
    /// zero and out-of-order scalars are rejected, not silently defined.
    pub fn derive_point(
        &self,
        scalar: &[u8; 32],
    ) -> std::result::Result<AffinePoint, CandidateError> {
        if !is_valid_private_key(scalar) {
            return Err(CandidateError::ScalarOutOfRange);
        }
        let mut acc = ProjectivePoint::IDENTITY;
        for win in 0..self.windows {
            let digit = self.digit(scalar, win);
            if digit != 0 {
                acc += self.entry(win, digit);
            }
        }
        Ok(acc.to_affine())
    }

    // ========================================================================
    // TABLE FILE I/O
    // ========================================================================

    /// Serialize the table so later runs (and other machines) can skip the
    /// build pass. Companion of `load`; used by the ecmtabgen tool.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(4 * 1024 * 1024, file);

        writer.write_all(TABLE_MAGIC)?;
        writer.write_all(&[TABLE_VERSION, self.window as u8, 0, 0])?;
        writer.write_all(&(self.points.len() as u64).to_le_bytes())?;
        for point in &self.points {
            let encoded = point.to_encoded_point(true);
            writer.write_all(encoded.as_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a serialized table. When the caller pinned a window size on the
    /// command line, a file built for a different window is rejected.
    pub fn load(path: &Path, expected_window: Option<u32>) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;

        if raw.len() < TABLE_HEADER_SIZE || &raw[0..4] != TABLE_MAGIC {
            return Err(SweepError::TableFormat("missing ECMT header".into()));
        }
        if raw[4] != TABLE_VERSION {
            return Err(SweepError::TableFormat(format!(
                "unsupported version {}",
                raw[4]
            )));
        }
        let window = raw[5] as u32;
        if !(MIN_WINDOW..=MAX_WINDOW).contains(&window) {
            return Err(SweepError::TableFormat(format!(
                "window size {} out of range",
                window
            )));
        }
        if let Some(expected) = expected_window {
            if expected != window {
                return Err(SweepError::TableFormat(format!(
                    "table was built for window size {}, requested {}",
                    window, expected
                )));
            }
        }

        let w = window as usize;
        let windows = SCALAR_BITS.div_ceil(w);
        let per_window = (1usize << w) - 1;
        let expected_count = windows * per_window;

        let count = u64::from_le_bytes(
            raw[8..16].try_into().expect("fixed-width header field"),
        ) as usize;
        if count != expected_count {
            return Err(SweepError::TableFormat(format!(
                "point count {} does not match window size {} (expected {})",
                count, window, expected_count
            )));
        }
        let expected_len = TABLE_HEADER_SIZE + count * POINT_SIZE;
        if raw.len() != expected_len {
            return Err(SweepError::TableFormat(format!(
                "file is {} bytes, expected {}",
                raw.len(),
                expected_len
            )));
        }

        let body = &raw[TABLE_HEADER_SIZE..];
        let points = body
            .par_chunks_exact(POINT_SIZE)
            .map(|chunk| {
                let encoded = EncodedPoint::from_bytes(chunk)
                    .map_err(|_| SweepError::TableFormat("undecodable point".into()))?;
                Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
                    .ok_or_else(|| SweepError::TableFormat("point not on curve".into()))
            })
            .collect::<Result<Vec<AffinePoint>>>()?;

        Ok(Self {
            window,
            windows,
            points,
        })
    }
}
