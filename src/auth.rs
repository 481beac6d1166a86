//! Authentication against the stored app-password record.

use anyhow::{Context, Result};

use crate::hasher::Hasher;
use crate::vault::Vault;

/// Vault key holding the stored authentication record.
pub(crate) const APP_KEY: &str = "app";

/// Verifies `candidate` against the stored authentication record.
///
/// A mismatch returns `false` with no side effect. On a match, a record
/// produced under stale hasher parameters is transparently replaced with a
/// fresh one before returning `true`.
pub(crate) fn verify(vault: &mut Vault, hasher: &Hasher, candidate: &str) -> Result<bool> {
    let stored: String = vault
        .read(APP_KEY)?
        .context("profile has no authentication record")?;

    if !hasher.verify(candidate, &stored)? {
        return Ok(false);
    }

    if hasher.needs_rehash(&stored)? {
        let fresh = hasher.unstable_hash(candidate)?;
        vault.write(APP_KEY, &fresh)?;
    }

    Ok(true)
}
