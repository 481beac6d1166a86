//! Encrypted key/value store for the profile.
//!
//! The profile is one JSON document encrypted with XChaCha20-Poly1305
//! under a key derived from the app password via Argon2id. On disk:
//! magic, format version, the three Argon2 cost parameters, the file
//! salt, the nonce, then the ciphertext.

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use chrono::Local;
use getrandom::fill;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::{Zeroize, Zeroizing};

use crate::error::VaultError;
use crate::hasher::HasherParams;
use crate::storage::Storage;

const MAGIC: &[u8; 4] = b"PFRG";
const VERSION_V1: u8 = 1;

const FILE_SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + 1 + 3 * 4 + FILE_SALT_LEN + NONCE_LEN;

#[derive(Serialize, Deserialize)]
struct Document {
    created: String,
    entries: BTreeMap<String, Value>,
}

/// The app-password-gated profile document.
///
/// Every write re-encrypts and persists the whole document, so callers
/// never see partially committed state on disk.
pub struct Vault {
    document: Document,
    storage: Storage,
    key: [u8; KEY_LEN],
    file_salt: [u8; FILE_SALT_LEN],
    params: HasherParams,
}

impl Drop for Vault {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl Vault {
    /// Opens an existing profile or creates and persists a fresh one.
    ///
    /// `params` only applies to the key derivation of a fresh profile; an
    /// existing file carries its own parameters in the header. A wrong
    /// app password surfaces as [`VaultError::WrongPassword`].
    pub fn open_or_create(password: &str, storage: Storage, params: HasherParams) -> Result<Self> {
        if storage.exists() {
            Self::open(password, storage)
        } else {
            Self::create(password, storage, params)
        }
    }

    fn create(password: &str, storage: Storage, params: HasherParams) -> Result<Self> {
        let mut file_salt = [0u8; FILE_SALT_LEN];
        fill(&mut file_salt).map_err(|_| anyhow!("OS random generator unavailable"))?;

        let key = derive_file_key(password, &file_salt, params)
            .context("failed to derive profile key")?;

        let vault = Self {
            document: Document {
                created: Local::now().to_string(),
                entries: BTreeMap::new(),
            },
            storage,
            key,
            file_salt,
            params,
        };
        vault.persist()?;
        Ok(vault)
    }

    fn open(password: &str, storage: Storage) -> Result<Self> {
        let data = storage.load().context("failed to read profile file")?;
        let header = Header::parse(&data)?;

        let key = derive_file_key(password, &header.file_salt, header.params)
            .context("failed to derive profile key")?;

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(XNonce::from_slice(&header.nonce), &data[HEADER_LEN..])
                .map_err(|_| VaultError::WrongPassword)?,
        );

        let document = serde_json::from_slice(&plaintext)
            .context("failed to deserialize profile; possibly corrupted data")?;

        Ok(Self {
            document,
            storage,
            key,
            file_salt: header.file_salt,
            params: header.params,
        })
    }

    /// Reads and decodes the value stored under `key`.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.document.entries.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .with_context(|| format!("malformed value under profile key '{key}'")),
            None => Ok(None),
        }
    }

    /// Stores `value` under `key` and persists the document.
    pub fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_value(value)?;
        self.document.entries.insert(key.to_string(), encoded);
        self.persist()
    }

    /// Returns `true` if the document holds a value under `key`.
    pub fn stores_key(&self, key: &str) -> bool {
        self.document.entries.contains_key(key)
    }

    /// Creation timestamp of the profile.
    pub fn created(&self) -> &str {
        &self.document.created
    }

    fn persist(&self) -> Result<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(&self.document)?);

        let mut nonce = [0u8; NONCE_LEN];
        fill(&mut nonce).map_err(|_| anyhow!("OS random generator unavailable"))?;

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.key));
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| anyhow!("profile encryption failed"))?;

        let header = Header {
            params: self.params,
            file_salt: self.file_salt,
            nonce,
        };
        let mut file = header.encode();
        file.extend_from_slice(&ciphertext);

        self.storage.save(&file)
    }
}

struct Header {
    params: HasherParams,
    file_salt: [u8; FILE_SALT_LEN],
    nonce: [u8; NONCE_LEN],
}

impl Header {
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION_V1);
        buf.extend_from_slice(&self.params.mem_cost_kib().to_le_bytes());
        buf.extend_from_slice(&self.params.time_cost().to_le_bytes());
        buf.extend_from_slice(&self.params.parallelism().to_le_bytes());
        buf.extend_from_slice(&self.file_salt);
        buf.extend_from_slice(&self.nonce);
        buf
    }

    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(VaultError::InvalidFormat("file too short".into()).into());
        }
        if &data[..MAGIC.len()] != MAGIC {
            return Err(VaultError::InvalidFormat("bad magic bytes".into()).into());
        }
        let version = data[MAGIC.len()];
        if version != VERSION_V1 {
            return Err(
                VaultError::InvalidFormat(format!("unsupported version {version}")).into(),
            );
        }

        let mut offset = MAGIC.len() + 1;
        let mem_cost_kib = u32::from_le_bytes(data[offset..offset + 4].try_into()?);
        offset += 4;
        let time_cost = u32::from_le_bytes(data[offset..offset + 4].try_into()?);
        offset += 4;
        let parallelism = u32::from_le_bytes(data[offset..offset + 4].try_into()?);
        offset += 4;

        let params = HasherParams::new(mem_cost_kib, time_cost, parallelism)
            .map_err(|e| VaultError::InvalidFormat(format!("bad Argon2 parameters: {e}")))?;

        let mut file_salt = [0u8; FILE_SALT_LEN];
        file_salt.copy_from_slice(&data[offset..offset + FILE_SALT_LEN]);
        offset += FILE_SALT_LEN;

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&data[offset..offset + NONCE_LEN]);

        Ok(Self {
            params,
            file_salt,
            nonce,
        })
    }
}

fn derive_file_key(
    password: &str,
    salt: &[u8],
    params: HasherParams,
) -> Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    params
        .argon2()?
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| anyhow!("argon2 key derivation failed: {e}"))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fast_params() -> HasherParams {
        HasherParams::new(8, 1, 1).unwrap()
    }

    #[test]
    fn fresh_vault_persists_and_reopens() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        let mut vault = Vault::open_or_create("pw", storage.clone(), fast_params()).unwrap();
        vault.write("greeting", &"hello".to_string()).unwrap();

        let reopened = Vault::open_or_create("pw", storage, fast_params()).unwrap();
        assert_eq!(
            reopened.read::<String>("greeting").unwrap().as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn wrong_password_is_distinguishable() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        Vault::open_or_create("correct", storage.clone(), fast_params()).unwrap();
        let err = Vault::open_or_create("wrong", storage, fast_params()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<VaultError>(),
            Some(VaultError::WrongPassword)
        ));
    }

    #[test]
    fn garbage_file_is_rejected_as_invalid_format() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));
        storage.save(b"not a profile").unwrap();

        let err = Vault::open_or_create("pw", storage, fast_params()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VaultError>(),
            Some(VaultError::InvalidFormat(_))
        ));
    }

    #[test]
    fn stores_key_reflects_writes() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        let mut vault = Vault::open_or_create("pw", storage, fast_params()).unwrap();
        assert!(!vault.stores_key("salt"));

        vault.write("salt", &"c2FsdA==".to_string()).unwrap();
        assert!(vault.stores_key("salt"));
    }

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        let vault = Vault::open_or_create("pw", storage, fast_params()).unwrap();
        assert_eq!(vault.read::<String>("absent").unwrap(), None);
    }

    #[test]
    fn writes_commit_immediately() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        let mut vault = Vault::open_or_create("pw", storage.clone(), fast_params()).unwrap();
        vault.write("services", &vec!["github".to_string()]).unwrap();
        drop(vault);

        let reopened = Vault::open_or_create("pw", storage, fast_params()).unwrap();
        assert_eq!(
            reopened.read::<Vec<String>>("services").unwrap(),
            Some(vec!["github".to_string()])
        );
    }

    #[test]
    fn lists_roundtrip_through_json_values() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        let mut vault = Vault::open_or_create("pw", storage, fast_params()).unwrap();
        let labels = vec!["github".to_string(), "gitlab".to_string()];
        vault.write("services", &labels).unwrap();

        assert_eq!(vault.read::<Vec<String>>("services").unwrap(), Some(labels));
    }

    #[test]
    fn created_timestamp_survives_reopen() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        let vault = Vault::open_or_create("pw", storage.clone(), fast_params()).unwrap();
        let created = vault.created().to_string();
        drop(vault);

        let reopened = Vault::open_or_create("pw", storage, fast_params()).unwrap();
        assert_eq!(reopened.created(), created);
    }
}
