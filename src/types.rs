use std::fmt;

/// Hash160 = RIPEMD160(SHA256(pubkey))
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(C, align(4))]
pub struct Hash160([u8; 20]);

impl Hash160 {
    #[inline(always)]
    pub fn from_slice(slice: &[u8]) -> Self {
        debug_assert_eq!(slice.len(), 20);
        let mut arr = [0u8; 20];
        arr.copy_from_slice(slice);
        Self(arr)
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The digest as five big-endian u32 words. The bloom filter derives
    /// its probe indices from these words directly.
    #[inline(always)]
    pub fn words(&self) -> [u32; 5] {
        let b = &self.0;
        [
            u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
            u32::from_be_bytes([b[8], b[9], b[10], b[11]]),
            u32::from_be_bytes([b[12], b[13], b[14], b[15]]),
            u32::from_be_bytes([b[16], b[17], b[18], b[19]]),
        ]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Which public-key serialization a digest was derived from.
/// Rendered as `c` / `u` in output records.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Parity {
    Compressed,
    Uncompressed,
}

impl Parity {
    #[inline]
    pub fn tag(self) -> u8 {
        match self {
            Self::Compressed => b'c',
            Self::Uncompressed => b'u',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash160_equality() {
        let h1 = Hash160::from_slice(&[1u8; 20]);
        let h2 = Hash160::from_slice(&[1u8; 20]);
        let h3 = Hash160::from_slice(&[2u8; 20]);

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_hash160_hex_rendering() {
        let bytes = hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap();
        let h = Hash160::from_slice(&bytes);
        assert_eq!(h.to_hex(), "751e76e8199196d454941c45d1b3a323f1433bd6");
        assert_eq!(h.to_hex().len(), 40);
    }

    #[test]
    fn test_hash160_words_big_endian() {
        let mut bytes = [0u8; 20];
        bytes[0] = 0xde;
        bytes[1] = 0xad;
        bytes[2] = 0xbe;
        bytes[3] = 0xef;
        let h = Hash160::from_slice(&bytes);
        assert_eq!(h.words()[0], 0xdeadbeef);
        assert_eq!(h.words()[1], 0);
    }

    #[test]
    fn test_parity_tags() {
        assert_eq!(Parity::Compressed.tag(), b'c');
        assert_eq!(Parity::Uncompressed.tag(), b'u');
    }
}
