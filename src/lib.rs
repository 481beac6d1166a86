mod auth;
mod derive;
mod error;
mod hasher;
mod policy;
mod registry;
mod seed;
mod storage;
mod vault;

pub use crate::error::{ManagerError, VaultError};
pub use crate::hasher::HasherParams;
pub use crate::policy::{Problem, validate_password};
pub use crate::storage::Storage;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use directories::ProjectDirs;
use getrandom::fill;

use crate::hasher::Hasher;
use crate::vault::Vault;

/// Vault key holding the base64 profile salt.
const SALT_KEY: &str = "salt";
/// Random bytes behind the profile salt, before base64 encoding.
const SALT_LENGTH: usize = 16;

/// Deterministic password derivation gated by an encrypted profile.
///
/// Opening validates the app password, unlocks (or creates) the profile,
/// binds the hashing engine to the profile salt and records a fresh
/// authentication hash. Derived passwords are computed on demand and never
/// stored.
pub struct PasswordManager {
    vault: Vault,
    hasher: Hasher,
}

impl PasswordManager {
    /// Opens (or creates) the profile with the default hasher parameters.
    pub fn open(app_password: &str, storage: Storage) -> Result<Self> {
        Self::open_with_params(app_password, storage, HasherParams::default())
    }

    /// Opens (or creates) the profile gated by `app_password`.
    ///
    /// The app password's composition is checked before any hashing or
    /// storage access; a wrong password against an existing profile fails
    /// with [`VaultError::WrongPassword`].
    pub fn open_with_params(
        app_password: &str,
        storage: Storage,
        params: HasherParams,
    ) -> Result<Self> {
        let problems = policy::validate_password(app_password);
        if !problems.is_empty() {
            return Err(ManagerError::InvalidAppPassword(problems).into());
        }

        let mut vault = Vault::open_or_create(app_password, storage, params)?;
        let salt = init_salt(&mut vault)?;
        let hasher = Hasher::new(params, salt)?;

        let record = hasher.unstable_hash(app_password)?;
        vault.write(auth::APP_KEY, &record)?;

        Ok(Self { vault, hasher })
    }

    /// Registered service labels in insertion order.
    pub fn services(&self) -> Result<Vec<String>> {
        registry::list(&self.vault)
    }

    /// Registers a service label; registering it twice is a no-op.
    pub fn add_service(&mut self, label: &str) -> Result<()> {
        registry::add(&mut self.vault, label)
    }

    /// Deregisters a service label; removing an absent one is a no-op.
    pub fn remove_service(&mut self, label: &str) -> Result<()> {
        registry::remove(&mut self.vault, label)
    }

    /// Derives the password for `service` from `master_password`.
    ///
    /// Fully determined by the master password, the service label, the
    /// profile salt and the hasher parameters; the result is never stored.
    /// The master password must satisfy the composition rules, must differ
    /// from the app password, and the service must be registered.
    pub fn generate(&mut self, master_password: &str, service: &str) -> Result<String> {
        let problems = self.validate_master(master_password)?;
        if !problems.is_empty() {
            return Err(ManagerError::InvalidMasterPassword(problems).into());
        }
        if service.is_empty() {
            return Err(ManagerError::EmptyServiceLabel.into());
        }
        if !self.services()?.iter().any(|s| s == service) {
            return Err(ManagerError::UnknownService(service.to_string()).into());
        }

        let combined = hasher::combine(&[master_password, service]);
        let seed_text = self.hasher.stable_hash(&combined)?;
        Ok(derive::to_password(&seed_text))
    }

    /// Checks `master_password` against the composition rules and the
    /// app-password inequality requirement, returning every violation.
    pub fn validate_master(&mut self, master_password: &str) -> Result<Vec<Problem>> {
        let mut problems = policy::validate_password(master_password);
        if auth::verify(&mut self.vault, &self.hasher, master_password)? {
            problems.push(Problem::MatchesAppPassword);
        }
        Ok(problems)
    }

    /// Checks whether `candidate` is the app password.
    ///
    /// A record stored under stale hasher parameters is transparently
    /// rehashed on a successful check.
    pub fn check_app_password(&mut self, candidate: &str) -> Result<bool> {
        auth::verify(&mut self.vault, &self.hasher, candidate)
    }

    /// Numeric seed for mnemonic recovery-phrase generation.
    pub fn mnemonic_seed(&self, master_password: &str) -> Result<u128> {
        let hashed = self.hasher.stable_hash(master_password)?;
        Ok(seed::to_seed(&hashed))
    }

    /// Creation timestamp of the profile.
    pub fn created(&self) -> &str {
        self.vault.created()
    }
}

/// Loads the profile salt, generating and persisting it on first open.
fn init_salt(vault: &mut Vault) -> Result<String> {
    if vault.stores_key(SALT_KEY) {
        return vault.read(SALT_KEY)?.context("profile salt is unreadable");
    }

    let mut bytes = [0u8; SALT_LENGTH];
    fill(&mut bytes).map_err(|_| anyhow!("OS random generator unavailable"))?;

    let salt = BASE64.encode(bytes);
    vault.write(SALT_KEY, &salt)?;
    Ok(salt)
}

/// Profile location in the platform data directory.
pub fn default_storage() -> Result<Storage> {
    let dirs = ProjectDirs::from("", "", "passforge")
        .context("could not determine platform directories")?;

    Ok(Storage::new(dirs.data_dir().join("profile.pf")))
}
