//! Two-mode Argon2id hashing engine.
//!
//! Stable mode hashes under the profile salt and is fully deterministic;
//! it feeds password derivation and seed generation. Unstable mode lets
//! the library pick a random salt per call, so it is only usable through
//! `verify` and backs the stored authentication record.

use anyhow::{Context, Result, anyhow, bail};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Fixed Argon2id configuration.
///
/// Chosen once at the façade boundary and never mutated at runtime; a
/// deployment that changes these values triggers the lazy rehash of stored
/// authentication records.
#[derive(Debug, Clone, Copy)]
pub struct HasherParams {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
    hash_len: usize,
}

impl Default for HasherParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 64 * 1024, // 64 MiB
            time_cost: 3,
            parallelism: 1,
            hash_len: 32,
        }
    }
}

impl HasherParams {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
            hash_len: Self::default().hash_len,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_cost < 1 {
            bail!("argon2 time cost must be >= 1");
        }
        if self.parallelism < 1 {
            bail!("argon2 parallelism must be >= 1");
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            bail!("argon2 memory cost must be at least 8 * parallelism");
        }
        Ok(())
    }

    pub(crate) fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.mem_cost_kib,
            self.time_cost,
            self.parallelism,
            Some(self.hash_len),
        )
        .map_err(|e| anyhow!("failed to construct Argon2 params: {e}"))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Joins variable-length strings without boundary ambiguity.
///
/// Each part is prefixed with its character count, so `["ab", "cd"]` and
/// `["a", "bcd"]` combine to distinct strings.
pub fn combine(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|s| format!("{}:{s}", s.chars().count()))
        .collect()
}

/// Argon2id engine bound to the profile salt.
pub struct Hasher {
    params: HasherParams,
    salt: String,
}

impl Hasher {
    pub fn new(params: HasherParams, salt: String) -> Result<Self> {
        params.validate().context("invalid Argon2 parameters")?;
        Ok(Self { params, salt })
    }

    /// Deterministic keyed hash of `text` under the profile salt.
    ///
    /// Returns the full PHC-encoded string; the same input always yields
    /// the same output for a fixed salt and parameters.
    pub fn stable_hash(&self, text: &str) -> Result<String> {
        let salt = SaltString::encode_b64(self.salt.as_bytes())
            .map_err(|e| anyhow!("profile salt rejected: {e}"))?;

        let hash = self
            .params
            .argon2()?
            .hash_password(text.as_bytes(), &salt)
            .map_err(|e| anyhow!("argon2 hashing failed: {e}"))?;

        Ok(hash.to_string())
    }

    /// Self-salting hash of `text` for the stored authentication record.
    ///
    /// A fresh random salt is embedded in the output, so two calls over the
    /// same input differ bit-for-bit. Never recomputed for comparison; use
    /// [`Hasher::verify`] instead.
    pub fn unstable_hash(&self, text: &str) -> Result<String> {
        let input = combine(&[text, &self.salt]);
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .params
            .argon2()?
            .hash_password(input.as_bytes(), &salt)
            .map_err(|e| anyhow!("argon2 hashing failed: {e}"))?;

        Ok(hash.to_string())
    }

    /// Verifies `text` against a stored unstable hash.
    ///
    /// A mismatch is `Ok(false)`; only malformed records or engine failures
    /// are errors.
    pub fn verify(&self, text: &str, stored: &str) -> Result<bool> {
        let input = combine(&[text, &self.salt]);
        let parsed = PasswordHash::new(stored)
            .map_err(|e| anyhow!("stored authentication record is malformed: {e}"))?;

        match self
            .params
            .argon2()?
            .verify_password(input.as_bytes(), &parsed)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("argon2 verification failed: {e}")),
        }
    }

    /// True when `stored` was produced under parameters differing from the
    /// configured ones and should be replaced after a successful
    /// verification.
    pub fn needs_rehash(&self, stored: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| anyhow!("stored authentication record is malformed: {e}"))?;

        match Algorithm::try_from(parsed.algorithm) {
            Ok(Algorithm::Argon2id) => {}
            _ => return Ok(true),
        }
        if parsed.version != Some(Version::V0x13.into()) {
            return Ok(true);
        }

        let stored_params = Params::try_from(&parsed)
            .map_err(|e| anyhow!("stored authentication record is malformed: {e}"))?;

        Ok(stored_params.m_cost() != self.params.mem_cost_kib
            || stored_params.t_cost() != self.params.time_cost
            || stored_params.p_cost() != self.params.parallelism)
    }
}
