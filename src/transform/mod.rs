//! Input transform layer: candidate bytes -> 32-byte scalar
//!
//! Exactly one transform is selected per run and applied to every
//! candidate. The salted KDF kinds carry their fixed side (salt or
//! passphrase) inside the variant, replacing the original design's
//! function-pointer-plus-globals dispatch.

use crate::crypto::sha256;
use crate::error::{CandidateError, Result, SweepError};
use crate::kdf;

/// Decoded-hex scratch limit. Candidates whose decoded form exceeds this
/// are a per-candidate error, never an allocation.
pub const HEX_DECODE_MAX: usize = 4096;

/// Per-worker hex decode buffer; owning it per worker keeps the hot loop
/// free of cross-candidate state and heap traffic.
pub struct DecodeScratch {
    buf: [u8; HEX_DECODE_MAX],
}

impl DecodeScratch {
    pub fn new() -> Self {
        Self {
            buf: [0u8; HEX_DECODE_MAX],
        }
    }
}

impl Default for DecodeScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// The fixed side of a salted KDF transform; the candidate stream supplies
/// the other side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KdfInput {
    /// Candidates are passphrases, hashed against this salt.
    FixedSalt(Vec<u8>),
    /// Candidates are salts, hashed against this passphrase.
    FixedPassphrase(Vec<u8>),
}

impl KdfInput {
    /// Split a candidate into the (passphrase, salt) pair for the KDF call.
    #[inline]
    fn resolve<'a>(&'a self, candidate: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        match self {
            Self::FixedSalt(salt) => (candidate, salt),
            Self::FixedPassphrase(pass) => (pass, candidate),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transform {
    /// scalar = SHA256(candidate)
    Passphrase,
    /// scalar = SHA256(hex_decode(candidate))
    HexPassphrase,
    /// scalar = hex_decode(candidate), exactly 32 bytes
    HexPrivKey,
    /// WarpWallet KDF
    Warp(KdfInput),
    /// brainwallet.io KDF
    BrainWalletIo(KdfInput),
    /// brainv2 KDF (very slow by design)
    BrainV2(KdfInput),
}

impl Transform {
    /// Label used in output records and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passphrase => "str",
            Self::HexPassphrase => "hex",
            Self::HexPrivKey => "priv",
            Self::Warp(_) => "warp",
            Self::BrainWalletIo(_) => "bwio",
            Self::BrainV2(_) => "bv2",
        }
    }

    /// Resolve the configured type name plus salt/passphrase options into a
    /// transform, enforcing the option compatibility rules once at startup.
    pub fn from_options(
        type_name: &str,
        salt: Option<&[u8]>,
        passphrase: Option<&[u8]>,
    ) -> Result<Self> {
        let salted = matches!(type_name, "warp" | "bwio" | "bv2");
        if !salted {
            if passphrase.is_some() {
                return Err(SweepError::Config(format!(
                    "a passphrase is not supported with input type '{}'",
                    type_name
                )));
            }
            if salt.is_some() {
                return Err(SweepError::Config(format!(
                    "a salt is not supported with input type '{}'",
                    type_name
                )));
            }
        }
        if salt.is_some() && passphrase.is_some() {
            return Err(SweepError::Config(
                "cannot specify both a salt and a passphrase".into(),
            ));
        }

        let kdf_input = || match passphrase {
            Some(p) => KdfInput::FixedPassphrase(p.to_vec()),
            None => KdfInput::FixedSalt(salt.unwrap_or_default().to_vec()),
        };

        match type_name {
            "str" => Ok(Self::Passphrase),
            "hex" => Ok(Self::HexPassphrase),
            "priv" => Ok(Self::HexPrivKey),
            "warp" => Ok(Self::Warp(kdf_input())),
            "bwio" => Ok(Self::BrainWalletIo(kdf_input())),
            "bv2" => Ok(Self::BrainV2(kdf_input())),
            other => Err(SweepError::Config(format!(
                "unknown input type '{}'",
                other
            ))),
        }
    }

    /// Convert one candidate to a scalar. Pure per call; failures are
    /// per-candidate and leave the scratch reusable.
    pub fn apply(
        &self,
        candidate: &[u8],
        scratch: &mut DecodeScratch,
    ) -> std::result::Result<[u8; 32], CandidateError> {
        match self {
            Self::Passphrase => Ok(sha256(candidate)),
            Self::HexPassphrase => {
                let n = decode_hex_into(candidate, &mut scratch.buf)?;
                Ok(sha256(&scratch.buf[..n]))
            }
            Self::HexPrivKey => {
                let n = decode_hex_into(candidate, &mut scratch.buf)?;
                if n != 32 {
                    return Err(CandidateError::InvalidHex);
                }
                let mut scalar = [0u8; 32];
                scalar.copy_from_slice(&scratch.buf[..32]);
                Ok(scalar)
            }
            Self::Warp(input) => {
                let (pass, salt) = input.resolve(candidate);
                kdf::warpwallet(pass, salt)
            }
            Self::BrainWalletIo(input) => {
                let (pass, salt) = input.resolve(candidate);
                kdf::brainwalletio(pass, salt)
            }
            Self::BrainV2(input) => {
                let (pass, salt) = input.resolve(candidate);
                kdf::brainv2(pass, salt)
            }
        }
    }
}

#[inline]
fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode a hex candidate into `buf`, returning the decoded length. Odd
/// length and non-hex bytes are `InvalidHex`; input longer than the buffer
/// is `OversizedInput`.
fn decode_hex_into(candidate: &[u8], buf: &mut [u8]) -> std::result::Result<usize, CandidateError> {
    if candidate.len() % 2 != 0 {
        return Err(CandidateError::InvalidHex);
    }
    let n = candidate.len() / 2;
    if n > buf.len() {
        return Err(CandidateError::OversizedInput);
    }
    for (i, pair) in candidate.chunks_exact(2).enumerate() {
        let hi = hex_val(pair[0]).ok_or(CandidateError::InvalidHex)?;
        let lo = hex_val(pair[1]).ok_or(CandidateError::InvalidHex)?;
        buf[i] = (hi << 4) | lo;
    }
    Ok(n)
}
