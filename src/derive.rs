//! Scalar -> hash160 derivation
//!
//! One point multiplication per candidate: the uncompressed serialization
//! is hashed as-is, and the compressed serialization is rebuilt from the
//! uncompressed coordinates' parity byte instead of a second multiplication.

use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::crypto::hash160;
use crate::ecmult::EcmultTable;
use crate::error::CandidateError;
use crate::types::Hash160;

/// Both digests for one candidate. Always produced together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivedPair {
    pub compressed: Hash160,
    pub uncompressed: Hash160,
}

/// Derive the compressed and uncompressed hash160 digests for a scalar.
pub fn derive_pair(
    table: &EcmultTable,
    scalar: &[u8; 32],
) -> Result<DerivedPair, CandidateError> {
    let point = table.derive_point(scalar)?;

    // 0x04 || x || y
    let encoded = point.to_encoded_point(false);
    let uncompressed_bytes = encoded.as_bytes();
    debug_assert_eq!(uncompressed_bytes.len(), 65);
    let uncompressed = hash160(uncompressed_bytes);

    // (0x02 | y parity) || x, taken from the uncompressed encoding
    let mut compressed_bytes = [0u8; 33];
    compressed_bytes[0] = 0x02 | (uncompressed_bytes[64] & 0x01);
    compressed_bytes[1..].copy_from_slice(&uncompressed_bytes[1..33]);
    let compressed = hash160(&compressed_bytes);

    Ok(DerivedPair {
        compressed,
        uncompressed,
    })
}
