//! Store implementations for tests and for running without persistence.

use std::collections::HashMap;

use ocv_traits::{BlobStore, StoreError};

/// No storage on this host. The load attempt fails its probe and persistence
/// turns itself off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl BlobStore for NullStore {
    fn probe(&mut self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("no store configured".into()))
    }
    fn read(&mut self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("no store configured".into()))
    }
    fn write(&mut self, _key: &str, _blob: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("no store configured".into()))
    }
}

/// In-memory store with operation counters.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
    reads: usize,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, blob: &str) {
        self.blobs.insert(key.to_string(), blob.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(String::as_str)
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl BlobStore for MemoryStore {
    fn probe(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
    fn read(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads += 1;
        Ok(self.blobs.get(key).cloned())
    }
    fn write(&mut self, key: &str, blob: &str) -> Result<(), StoreError> {
        self.writes += 1;
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// A store that fails at a chosen point.
#[derive(Debug, Clone)]
pub struct FailingStore {
    probe_ok: bool,
    read_ok: bool,
    attempts: usize,
}

impl FailingStore {
    /// Probe reports the capability as missing.
    pub fn unavailable() -> Self {
        Self {
            probe_ok: false,
            read_ok: false,
            attempts: 0,
        }
    }

    /// Probe and read succeed (empty store); every write fails.
    pub fn failing_writes() -> Self {
        Self {
            probe_ok: true,
            read_ok: true,
            attempts: 0,
        }
    }

    /// Probe succeeds; the read fails.
    pub fn failing_reads() -> Self {
        Self {
            probe_ok: true,
            read_ok: false,
            attempts: 0,
        }
    }

    /// Operations attempted after a successful probe.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl BlobStore for FailingStore {
    fn probe(&mut self) -> Result<(), StoreError> {
        if self.probe_ok {
            Ok(())
        } else {
            Err(StoreError::Unavailable("probe failed".into()))
        }
    }
    fn read(&mut self, _key: &str) -> Result<Option<String>, StoreError> {
        self.attempts += 1;
        if self.read_ok {
            Ok(None)
        } else {
            Err(StoreError::Failed("read failed".into()))
        }
    }
    fn write(&mut self, _key: &str, _blob: &str) -> Result<(), StoreError> {
        self.attempts += 1;
        Err(StoreError::Failed("write failed".into()))
    }
}
