//! Maps stable-hash output onto the password alphabet.
//!
//! The wire-level conventions here (symbol order, the four reserved digest
//! bytes, the fixed correction order) are load-bearing: existing profiles
//! expect byte-for-byte identical passwords for identical inputs.

use sha3::{Digest, Sha3_224};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
/// Output specials. Wider than the input-policy set in `policy` on purpose:
/// generated passwords draw from more symbols than we demand of typed ones.
const SPECIALS: &[u8] = b"!@#=$%&*+-?_";

/// Digest bytes held back from the main walk for class corrections.
const RESERVED: usize = 4;

/// Converts the stable-hash text into a password.
///
/// A SHA3-224 digest of the seed text supplies the symbols, keeping the
/// mapping independent of the Argon2 output length and stretch cost. The
/// digest's last four bytes are reserved: after the main walk, any missing
/// character class is patched from them in the fixed order lowercase,
/// uppercase, digit, special, one byte per missing class. Output length
/// therefore varies between 24 and 28 characters.
pub fn to_password(seed: &str) -> String {
    // specials appear twice, doubling their sampling weight only
    let mut symbols =
        Vec::with_capacity(LOWERCASE.len() + UPPERCASE.len() + DIGITS.len() + 2 * SPECIALS.len());
    symbols.extend_from_slice(LOWERCASE);
    symbols.extend_from_slice(UPPERCASE);
    symbols.extend_from_slice(DIGITS);
    symbols.extend_from_slice(SPECIALS);
    symbols.extend_from_slice(SPECIALS);

    let digest = Sha3_224::digest(seed.as_bytes());

    let mut password = Vec::with_capacity(digest.len());
    for &byte in &digest[..digest.len() - RESERVED] {
        password.push(symbols[byte as usize % symbols.len()]);
    }

    // each check sees the password built so far, corrections included
    let mut reserve = digest.len() - RESERVED;
    if !password.iter().any(u8::is_ascii_lowercase) {
        password.push(LOWERCASE[digest[reserve] as usize % LOWERCASE.len()]);
        reserve += 1;
    }
    if !password.iter().any(u8::is_ascii_uppercase) {
        password.push(UPPERCASE[digest[reserve] as usize % UPPERCASE.len()]);
        reserve += 1;
    }
    if !password.iter().any(u8::is_ascii_digit) {
        password.push(DIGITS[digest[reserve] as usize % DIGITS.len()]);
        reserve += 1;
    }
    if !password.iter().any(|b| SPECIALS.contains(b)) {
        password.push(SPECIALS[digest[reserve] as usize % SPECIALS.len()]);
    }

    password.into_iter().map(char::from).collect()
}
