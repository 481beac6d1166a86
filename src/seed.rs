//! Numeric seed encoding for recovery phrases.
//!
//! Outer layers turn this seed into a mnemonic backup phrase; this module
//! only folds the stable-hash text into a fixed-width number.

use sha3::{Digest, Sha3_224};

/// Folds a stable-hash text into a 128-bit seed.
pub fn to_seed(hashed: &str) -> u128 {
    let digest = Sha3_224::digest(hashed.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(bytes)
}
