//! Probabilistic target filter
//!
//! A plain bloom filter over hash160 digests. The probe indices are carved
//! directly out of the digest's five big-endian u32 words and their
//! byte-shifted combinations - the digest is already uniform, so no extra
//! hash function is involved. No false negatives by construction; false
//! positives at a rate fixed when the filter is built.
//!
//! The on-disk blob is loaded wholesale via mmap so multi-gigabyte filters
//! start in milliseconds and share pages between processes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::error::{Result, SweepError};
use crate::types::Hash160;

/// The digest words support at most 20 independent probe derivations.
pub const MAX_PROBES: usize = 20;
pub const DEFAULT_PROBES: usize = 20;

pub const MIN_LOG2_BITS: u8 = 16; // 8 KiB
pub const MAX_LOG2_BITS: u8 = 32; // 512 MiB

/// Filter file format v1:
/// - magic:     4 bytes ("BLF1")
/// - version:   1 byte  (current: 1)
/// - log2_bits: 1 byte
/// - probes:    1 byte
/// - reserved:  1 byte (must be 0)
/// - bit array: 2^log2_bits / 8 bytes
const FILTER_MAGIC: &[u8; 4] = b"BLF1";
const FILTER_VERSION: u8 = 1;
const FILTER_HEADER_SIZE: usize = 8;

enum FilterBits {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl FilterBits {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Owned(v) => v,
            Self::Mapped(m) => &m[FILTER_HEADER_SIZE..],
        }
    }
}

pub struct BloomFilter {
    bits: FilterBits,
    log2_bits: u8,
    mask: u32,
    probes: usize,
}

/// Derive the k-th probe index from the digest words. The first five
/// probes are the words themselves; further probes splice two words at
/// 16-, 8- and 24-bit offsets.
#[inline(always)]
fn probe_index(words: &[u32; 5], k: usize) -> u32 {
    debug_assert!(k < MAX_PROBES);
    match k / 5 {
        0 => words[k],
        1 => (words[k - 5] << 16) | (words[(k - 4) % 5] >> 16),
        2 => (words[k - 10] << 8) | (words[(k - 9) % 5] >> 24),
        _ => (words[k - 15] << 24) | (words[(k - 14) % 5] >> 8),
    }
}

impl BloomFilter {
    /// Empty filter for construction (blfgen and tests). `log2_bits` is the
    /// log2 of the bit-array length.
    pub fn with_params(log2_bits: u8, probes: usize) -> Result<Self> {
        Self::validate_params(log2_bits, probes)?;
        let bytes = 1usize << (log2_bits - 3);
        Ok(Self {
            bits: FilterBits::Owned(vec![0u8; bytes]),
            log2_bits,
            mask: (((1u64 << log2_bits) - 1) & 0xFFFF_FFFF) as u32,
            probes,
        })
    }

    fn validate_params(log2_bits: u8, probes: usize) -> Result<()> {
        if !(MIN_LOG2_BITS..=MAX_LOG2_BITS).contains(&log2_bits) {
            return Err(SweepError::FilterFormat(format!(
                "log2 bit count {} out of range {}..={}",
                log2_bits, MIN_LOG2_BITS, MAX_LOG2_BITS
            )));
        }
        if probes == 0 || probes > MAX_PROBES {
            return Err(SweepError::FilterFormat(format!(
                "probe count {} out of range 1..={}",
                probes, MAX_PROBES
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn probes(&self) -> usize {
        self.probes
    }

    pub fn bit_count(&self) -> u64 {
        1u64 << self.log2_bits
    }

    pub fn memory_bytes(&self) -> usize {
        self.bits.bytes().len()
    }

    /// Insert a digest. Only valid on an owned (under-construction) filter.
    pub fn insert(&mut self, hash: &Hash160) {
        let words = hash.words();
        let mask = self.mask;
        let probes = self.probes;
        let bits = match &mut self.bits {
            FilterBits::Owned(v) => v.as_mut_slice(),
            FilterBits::Mapped(_) => unreachable!("loaded filters are read-only"),
        };
        for k in 0..probes {
            let idx = probe_index(&words, k) & mask;
            bits[(idx >> 3) as usize] |= 1 << (idx & 7);
        }
    }

    /// Membership test. Never false for an inserted digest; may be true for
    /// a non-member at the build-time bounded rate.
    #[inline]
    pub fn contains(&self, hash: &Hash160) -> bool {
        let words = hash.words();
        let bits = self.bits.bytes();
        for k in 0..self.probes {
            let idx = probe_index(&words, k) & self.mask;
            if bits[(idx >> 3) as usize] >> (idx & 7) & 1 == 0 {
                return false;
            }
        }
        true
    }

    /// Expected false-positive rate after inserting `items` digests:
    /// (1 - e^(-k*n/m))^k. Reported by blfgen, not used for lookups.
    pub fn predicted_fp_rate(&self, items: u64) -> f64 {
        let k = self.probes as f64;
        let n = items as f64;
        let m = self.bit_count() as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    // ========================================================================
    // FILTER FILE I/O
    // ========================================================================

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(4 * 1024 * 1024, file);

        writer.write_all(FILTER_MAGIC)?;
        writer.write_all(&[FILTER_VERSION, self.log2_bits, self.probes as u8, 0])?;
        writer.write_all(self.bits.bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Load a filter blob. The declared geometry must be self-consistent:
    /// payload length must match the declared bit count, probes must be
    /// within what the digest words can derive.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(SweepError::Io)?;

        if mmap.len() < FILTER_HEADER_SIZE || &mmap[0..4] != FILTER_MAGIC {
            return Err(SweepError::FilterFormat("missing BLF1 header".into()));
        }
        if mmap[4] != FILTER_VERSION {
            return Err(SweepError::FilterFormat(format!(
                "unsupported version {}",
                mmap[4]
            )));
        }
        let log2_bits = mmap[5];
        let probes = mmap[6] as usize;
        Self::validate_params(log2_bits, probes)?;

        let expected = FILTER_HEADER_SIZE + (1usize << (log2_bits - 3));
        if mmap.len() != expected {
            return Err(SweepError::FilterFormat(format!(
                "blob is {} bytes but declared geometry needs {}",
                mmap.len(),
                expected
            )));
        }

        Ok(Self {
            bits: FilterBits::Mapped(mmap),
            log2_bits,
            mask: (((1u64 << log2_bits) - 1) & 0xFFFF_FFFF) as u32,
            probes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn random_hash() -> Hash160 {
        let mut h = [0u8; 20];
        rand::thread_rng().fill(&mut h);
        Hash160::from_slice(&h)
    }

    fn unique_temp_path(prefix: &str) -> std::path::PathBuf {
        let id: u64 = rand::thread_rng().gen();
        std::env::temp_dir().join(format!("{}_{}.blf", prefix, id))
    }

    #[test]
    fn test_no_false_negatives() {
        let mut filter = BloomFilter::with_params(22, DEFAULT_PROBES).unwrap();
        let members: Vec<_> = (0..50_000).map(|_| random_hash()).collect();
        for h in &members {
            filter.insert(h);
        }
        for h in &members {
            assert!(filter.contains(h), "false negative for {}", h);
        }
    }

    #[test]
    fn test_false_positive_rate_bounded() {
        let mut filter = BloomFilter::with_params(24, DEFAULT_PROBES).unwrap();
        let n_members = 10_000u64;
        for _ in 0..n_members {
            filter.insert(&random_hash());
        }

        let predicted = filter.predicted_fp_rate(n_members);
        let samples = 200_000u64;
        let mut positives = 0u64;
        for _ in 0..samples {
            // 160-bit random digests collide with members with negligible
            // probability, so every positive here is a false positive.
            if filter.contains(&random_hash()) {
                positives += 1;
            }
        }
        let observed = positives as f64 / samples as f64;
        assert!(
            observed <= predicted * 4.0 + 1e-4,
            "observed fp rate {} far above predicted {}",
            observed,
            predicted
        );
    }

    #[test]
    fn test_probe_indices_cover_words() {
        let h = random_hash();
        let words = h.words();
        assert_eq!(probe_index(&words, 0), words[0]);
        assert_eq!(probe_index(&words, 4), words[4]);
        assert_eq!(
            probe_index(&words, 5),
            (words[0] << 16) | (words[1] >> 16)
        );
        assert_eq!(
            probe_index(&words, 19),
            (words[4] << 24) | (words[0] >> 8)
        );
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = unique_temp_path("bloom_roundtrip");
        let mut filter = BloomFilter::with_params(18, 20).unwrap();
        let members: Vec<_> = (0..1_000).map(|_| random_hash()).collect();
        for h in &members {
            filter.insert(h);
        }
        filter.save(&path).unwrap();

        let loaded = BloomFilter::load(&path).unwrap();
        assert_eq!(loaded.probes(), 20);
        assert_eq!(loaded.bit_count(), 1 << 18);
        for h in &members {
            assert!(loaded.contains(h), "false negative after load");
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_size_mismatch() {
        let path = unique_temp_path("bloom_badsize");
        let filter = BloomFilter::with_params(18, 20).unwrap();
        filter.save(&path).unwrap();

        // Chop the payload so it no longer matches the declared geometry.
        let mut raw = std::fs::read(&path).unwrap();
        raw.truncate(raw.len() - 100);
        std::fs::write(&path, raw).unwrap();

        assert!(matches!(
            BloomFilter::load(&path),
            Err(SweepError::FilterFormat(_))
        ));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_bad_probe_count() {
        let path = unique_temp_path("bloom_badprobes");
        let filter = BloomFilter::with_params(18, 20).unwrap();
        filter.save(&path).unwrap();

        let mut raw = std::fs::read(&path).unwrap();
        raw[6] = 21; // more probes than the digest can derive
        std::fs::write(&path, raw).unwrap();

        assert!(matches!(
            BloomFilter::load(&path),
            Err(SweepError::FilterFormat(_))
        ));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let path = unique_temp_path("bloom_garbage");
        std::fs::write(&path, b"BLEH").unwrap();
        assert!(matches!(
            BloomFilter::load(&path),
            Err(SweepError::FilterFormat(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_with_params_validation() {
        assert!(BloomFilter::with_params(8, 20).is_err());
        assert!(BloomFilter::with_params(33, 20).is_err());
        assert!(BloomFilter::with_params(20, 0).is_err());
        assert!(BloomFilter::with_params(20, 21).is_err());
        assert!(BloomFilter::with_params(20, 20).is_ok());
    }
}
