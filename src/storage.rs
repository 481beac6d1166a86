//! File persistence for the encrypted profile.

use anyhow::{Context, Result};
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Backing file for the encrypted profile document.
///
/// Saves are crash-safe: the new contents go to a randomly named sibling
/// file first, which then atomically replaces the profile. After a crash
/// either the old or the new profile is on disk, never a torn write.
#[derive(Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns `true` if the profile file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the whole profile file into memory.
    pub fn load(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Atomically replaces the profile file with `data`.
    ///
    /// Creates missing parent directories, fsyncs the staged file before
    /// the swap and the parent directory after it.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => {
                fs::create_dir_all(p)?;
                Some(p)
            }
            other => other,
        };

        let staged = self.staged_path()?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged)
            .context("failed to stage profile file")?;

        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = replace_file(&staged, &self.path) {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }

        if let Some(parent) = parent {
            File::open(parent)?.sync_all()?;
        }

        Ok(())
    }

    /// Path of the profile file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Sibling path with a random suffix, for staging a save.
    fn staged_path(&self) -> Result<PathBuf> {
        let mut entropy = [0u8; 8];
        fill(&mut entropy)?;

        let suffix: String = entropy.iter().map(|b| format!("{b:02x}")).collect();
        let name = self
            .path
            .file_name()
            .context("profile path has no file name")?
            .to_string_lossy();

        Ok(self.path.with_file_name(format!(".{name}.{suffix}.part")))
    }
}

/// Atomically moves `staged` over `target`, persisted through the swap.
#[cfg(target_os = "windows")]
fn replace_file(staged: &Path, target: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{MOVEFILE_REPLACE_EXISTING, MOVEFILE_WRITE_THROUGH, MoveFileExW};

    fn wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let staged_w = wide(staged.as_os_str());
    let target_w = wide(target.as_os_str());

    // SAFETY: both strings are null-terminated UTF-16 buffers that outlive
    // the call, and Windows does not retain the pointers.
    let ok = unsafe {
        MoveFileExW(
            staged_w.as_ptr(),
            target_w.as_ptr(),
            MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH,
        )
    };

    if ok == 0 {
        return Err(std::io::Error::last_os_error()).context("atomic replace failed");
    }

    Ok(())
}

/// On Unix, `rename` is atomic within one filesystem.
#[cfg(not(target_os = "windows"))]
fn replace_file(staged: &Path, target: &Path) -> Result<()> {
    fs::rename(staged, target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        storage.save(b"profile bytes").unwrap();
        assert_eq!(storage.load().unwrap(), b"profile bytes");
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("absent.pf"));

        assert!(!storage.exists());
        assert!(storage.load().is_err());
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        storage.save(b"first").unwrap();
        storage.save(b"second").unwrap();

        assert_eq!(storage.load().unwrap(), b"second");
    }

    #[test]
    fn save_creates_missing_parents() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("deep").join("er").join("profile.pf");

        let storage = Storage::new(nested.clone());
        storage.save(b"data").unwrap();

        assert!(nested.exists());
    }

    #[test]
    fn no_staging_leftovers_after_save() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));
        storage.save(b"data").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["profile.pf"]);
    }

    #[test]
    fn staged_paths_differ_between_calls() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("profile.pf"));

        assert_ne!(storage.staged_path().unwrap(), storage.staged_path().unwrap());
    }
}
