//! Salted key-derivation collaborators for the warp / bwio / bv2 input
//! types. The pipeline treats these as opaque (passphrase, salt) -> scalar
//! functions; cost parameters are fixed constants of each scheme, not a
//! tunable surface.

use scrypt::{scrypt, Params};
use sha2::{Digest, Sha256};

use crate::error::CandidateError;

fn with_suffix(data: &[u8], suffix: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 1);
    out.extend_from_slice(data);
    out.push(suffix);
    out
}

fn scrypt_fixed(
    pass: &[u8],
    salt: &[u8],
    log_n: u8,
    r: u32,
    p: u32,
    out: &mut [u8],
) -> Result<(), CandidateError> {
    let params = Params::new(log_n, r, p, out.len())
        .map_err(|e| CandidateError::Kdf(format!("scrypt params: {}", e)))?;
    scrypt(pass, salt, &params, out).map_err(|e| CandidateError::Kdf(format!("scrypt: {}", e)))
}

/// WarpWallet: scrypt(pass|0x01, salt|0x01; N=2^18, r=8, p=1) XOR
/// pbkdf2-sha256(pass|0x02, salt|0x02; 2^16 rounds).
pub fn warpwallet(pass: &[u8], salt: &[u8]) -> Result<[u8; 32], CandidateError> {
    let mut s1 = [0u8; 32];
    scrypt_fixed(&with_suffix(pass, 1), &with_suffix(salt, 1), 18, 8, 1, &mut s1)?;

    let mut s2 = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        &with_suffix(pass, 2),
        &with_suffix(salt, 2),
        65536,
        &mut s2,
    );

    let mut key = [0u8; 32];
    for i in 0..32 {
        key[i] = s1[i] ^ s2[i];
    }
    Ok(key)
}

/// brainwallet.io: scalar = SHA256(lowercase_hex(scrypt(pass, salt;
/// N=2^18, r=8, p=1, 32))).
pub fn brainwalletio(pass: &[u8], salt: &[u8]) -> Result<[u8; 32], CandidateError> {
    let mut derived = [0u8; 32];
    scrypt_fixed(pass, salt, 18, 8, 1, &mut derived)?;

    let hex_out = hex::encode(derived);
    Ok(sha256_bytes(hex_out.as_bytes()))
}

/// brainv2: a deliberately expensive scheme. The KDF emits a 16-byte value
/// (scrypt, N=2^20, r=8, p=1) whose 32-character hex rendering is the
/// "passphrase" actually hashed into the scalar.
pub fn brainv2(pass: &[u8], salt: &[u8]) -> Result<[u8; 32], CandidateError> {
    let mut derived = [0u8; 16];
    scrypt_fixed(pass, salt, 20, 8, 1, &mut derived)?;

    let hex_out = hex::encode(derived);
    Ok(sha256_bytes(hex_out.as_bytes()))
}

fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}
