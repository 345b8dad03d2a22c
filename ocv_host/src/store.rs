//! Directory-backed blob store: key `k` lives in `<dir>/k.ocv`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ocv_traits::{BlobStore, StoreError};

use crate::error::{HostError, Result};
use crate::util::write_atomic;

const EXTENSION: &str = "ocv";
const PROBE_FILE: &str = ".probe";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Keys are plain names: ASCII alphanumerics and `_`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(HostError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    fn check_writable(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let probe = self.dir.join(PROBE_FILE);
        fs::write(&probe, b"ok")?;
        fs::remove_file(&probe)?;
        Ok(())
    }
}

fn failed(e: &HostError) -> StoreError {
    StoreError::Failed(e.to_string())
}

impl BlobStore for FileStore {
    fn probe(&mut self) -> std::result::Result<(), StoreError> {
        self.check_writable().map_err(|e| {
            StoreError::Unavailable(format!("{}: {e}", self.dir.display()))
        })
    }

    fn read(&mut self, key: &str) -> std::result::Result<Option<String>, StoreError> {
        let path = self.path_for(key).map_err(|e| failed(&e))?;
        match fs::read_to_string(&path) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), bytes = text.len(), "store read");
                Ok(Some(text))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(failed(&HostError::Io(e))),
        }
    }

    fn write(&mut self, key: &str, blob: &str) -> std::result::Result<(), StoreError> {
        let path = self.path_for(key).map_err(|e| failed(&e))?;
        write_atomic(&path, blob.as_bytes()).map_err(|e| failed(&HostError::Io(e)))?;
        tracing::debug!(path = %path.display(), bytes = blob.len(), "store write");
        Ok(())
    }
}
