use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{PkiError, Result};

/// Named byte blobs, the persistence interface bundles are saved through.
///
/// Names are flat identifiers such as `root-ca.key`; implementations decide
/// where they live.
pub trait Storage {
    fn exists(&self, name: &str) -> bool;

    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Writes `bytes` under `name`, replacing any previous entry.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Deletes the entry, returning whether it existed.
    fn remove(&self, name: &str) -> Result<bool>;
}

impl<T: Storage + ?Sized> Storage for &T {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        (**self).read(name)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        (**self).write(name, bytes)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        (**self).remove(name)
    }
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        (**self).read(name)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        (**self).write(name, bytes)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        (**self).remove(name)
    }
}

/// Storage backed by one directory on the local filesystem.
///
/// The directory is created on first write. On Unix, written files are only
/// readable by their owner since they hold private keys.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    root: PathBuf,
}

impl LocalDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(PkiError::InvalidInput(format!(
                "Invalid storage entry name {name:?}"
            )));
        }
        Ok(self.root.join(name))
    }
}

impl Storage for LocalDirectory {
    fn exists(&self, name: &str) -> bool {
        self.entry_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.entry_path(name)?;
        fs::read(&path)
            .map_err(|e| PkiError::StorageError(format!("read {}: {e}", path.display())))
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.entry_path(name)?;
        fs::create_dir_all(&self.root).map_err(|e| {
            PkiError::StorageError(format!("create directory {}: {e}", self.root.display()))
        })?;

        let mut file = create_private_file(&path)
            .map_err(|e| PkiError::StorageError(format!("create {}: {e}", path.display())))?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| PkiError::StorageError(format!("write {}: {e}", path.display())))?;

        debug!(path = %path.display(), len = bytes.len(), "wrote storage entry");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        let path = self.entry_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PkiError::StorageError(format!(
                "remove {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; tighten files that already existed.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// In-process storage, mostly useful for tests and ephemeral authorities.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names currently stored, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| PkiError::StorageError(format!("No entry named {name}")))
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.lock().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        Ok(self.lock().remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip_and_remove() {
        let storage = MemoryStorage::new();
        assert!(!storage.exists("a.crt"));
        storage.write("a.crt", b"hello").unwrap();
        assert!(storage.exists("a.crt"));
        assert_eq!(storage.read("a.crt").unwrap(), b"hello");
        assert!(storage.remove("a.crt").unwrap());
        assert!(!storage.remove("a.crt").unwrap());
        assert!(matches!(
            storage.read("a.crt"),
            Err(PkiError::StorageError(_))
        ));
    }

    #[test]
    fn test_local_directory_creates_directory_on_write() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalDirectory::new(tmp.path().join("nested").join("pki"));
        storage.write("root-ca.crt", b"pem").unwrap();
        assert!(storage.exists("root-ca.crt"));
        assert_eq!(storage.read("root-ca.crt").unwrap(), b"pem");
        assert!(storage.remove("root-ca.crt").unwrap());
        assert!(!storage.remove("root-ca.crt").unwrap());
    }

    #[test]
    fn test_local_directory_read_error_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalDirectory::new(tmp.path());
        let missing = tmp.path().join("missing.crt");
        match storage.read("missing.crt") {
            Err(PkiError::StorageError(msg)) => {
                assert!(msg.contains(&missing.display().to_string()), "{msg}")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_local_directory_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalDirectory::new(tmp.path());
        storage.write("root-ca.key", b"secret").unwrap();
        let mode = fs::metadata(tmp.path().join("root-ca.key"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_local_directory_rejects_path_names() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalDirectory::new(tmp.path());
        assert!(matches!(
            storage.write("../escape.crt", b"x"),
            Err(PkiError::InvalidInput(_))
        ));
        assert!(!storage.exists(".."));
    }
}
