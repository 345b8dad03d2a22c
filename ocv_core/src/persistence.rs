//! Load/save lifecycle for learned parameters.
//!
//! One load attempt happens after a warm-up delay from the first valid sample.
//! Saves are only attempted after that attempt, so stored data is never
//! replaced by defaults before it has been read. Any store failure disables
//! persistence for the rest of the session; estimation carries on in memory.

use ocv_traits::{BlobStore, StoreError};

use crate::codec::{self, PersistedRecord};
use crate::config::PersistenceCfg;
use crate::error::{EstimatorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceState {
    /// Waiting for the warm-up delay before the load attempt.
    Warming,
    /// Load attempted; saves allowed.
    Ready,
    /// Turned off by config or by a store failure.
    Disabled,
}

pub struct Persistence<S> {
    store: S,
    key: String,
    cfg: PersistenceCfg,
    state: PersistenceState,
    first_sample_ms: Option<u64>,
    dirty: bool,
    last_save_ms: Option<u64>,
    saves: u32,
}

impl<S: BlobStore> Persistence<S> {
    pub fn new(store: S, key: String, cfg: PersistenceCfg) -> Self {
        let state = if cfg.enabled {
            PersistenceState::Warming
        } else {
            PersistenceState::Disabled
        };
        Self {
            store,
            key,
            cfg,
            state,
            first_sample_ms: None,
            dirty: false,
            last_save_ms: None,
            saves: 0,
        }
    }

    pub fn state(&self) -> PersistenceState {
        self.state
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Successful saves this session.
    pub fn saves(&self) -> u32 {
        self.saves
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn disable(&mut self, op: &str, err: &StoreError) {
        match err {
            StoreError::Unavailable(_) => {
                tracing::info!(key = %self.key, op, error = %err, "storage unavailable; persistence off");
            }
            StoreError::Failed(_) => {
                tracing::warn!(key = %self.key, op, error = %err, "storage failed; persistence disabled for session");
            }
        }
        self.state = PersistenceState::Disabled;
    }

    /// Called on every processed tick; attempts the load once the warm-up
    /// delay has passed. Returns the decoded record on that one tick.
    pub fn poll_load(&mut self, now_ms: u64) -> Option<PersistedRecord> {
        if self.state != PersistenceState::Warming {
            return None;
        }
        let first = *self.first_sample_ms.get_or_insert(now_ms);
        if now_ms.saturating_sub(first) < self.cfg.warmup_ms {
            return None;
        }
        self.load()
    }

    /// Probe and read now. Only the first call in a session has any effect.
    pub fn load(&mut self) -> Option<PersistedRecord> {
        if self.state != PersistenceState::Warming {
            return None;
        }
        if let Err(e) = self.store.probe() {
            self.disable("probe", &e);
            return None;
        }
        let blob = match self.store.read(&self.key) {
            Ok(blob) => blob,
            Err(e) => {
                self.disable("read", &e);
                return None;
            }
        };
        self.state = PersistenceState::Ready;
        let Some(blob) = blob else {
            tracing::info!(key = %self.key, "no stored record; using defaults");
            return None;
        };
        match codec::decode(&blob) {
            Ok(record) => {
                tracing::info!(key = %self.key, "loaded learned parameters");
                Some(record)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "stored record rejected; using defaults");
                None
            }
        }
    }

    /// Save gate: pending changes, load seen this session, throttle low,
    /// and the minimum interval since the previous save.
    pub fn should_save(&self, now_ms: u64, throttle: f32, load_seen: bool) -> bool {
        self.state == PersistenceState::Ready
            && self.dirty
            && load_seen
            && throttle <= self.cfg.save_throttle
            && self
                .last_save_ms
                .is_none_or(|t| now_ms.saturating_sub(t) >= self.cfg.save_interval_ms)
    }

    /// Write `record` unconditionally (gating is the caller's job).
    pub fn save(&mut self, now_ms: u64, record: &PersistedRecord) -> bool {
        if self.state != PersistenceState::Ready {
            return false;
        }
        match self.store.write(&self.key, &codec::encode(record)) {
            Ok(()) => {
                self.dirty = false;
                self.last_save_ms = Some(now_ms);
                self.saves = self.saves.saturating_add(1);
                tracing::info!(key = %self.key, saves = self.saves, "saved learned parameters");
                true
            }
            Err(e) => {
                self.disable("write", &e);
                false
            }
        }
    }
}

/// Probe, read and decode the record for `key` outside of a session.
/// Unlike the session load, every failure is reported.
pub fn read_record<S: BlobStore + ?Sized>(store: &mut S, key: &str) -> Result<Option<PersistedRecord>> {
    store.probe().map_err(EstimatorError::from)?;
    let Some(blob) = store.read(key).map_err(EstimatorError::from)? else {
        return Ok(None);
    };
    let record = codec::decode(&blob).map_err(EstimatorError::from)?;
    Ok(Some(record))
}

impl<S> std::fmt::Debug for Persistence<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("dirty", &self.dirty)
            .field("last_save_ms", &self.last_save_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FailingStore, MemoryStore};

    fn cfg() -> PersistenceCfg {
        PersistenceCfg {
            warmup_ms: 1_000,
            save_interval_ms: 5_000,
            ..PersistenceCfg::default()
        }
    }

    #[test]
    fn load_waits_for_warmup_and_happens_once() {
        let mut store = MemoryStore::new();
        store.insert("k", "OCVCOMP1\nBUCKETS=16\nRECOV=5000\n");
        let mut p = Persistence::new(store, "k".into(), cfg());
        assert!(p.poll_load(10_000).is_none());
        assert!(p.poll_load(10_999).is_none());
        assert_eq!(p.state(), PersistenceState::Warming);
        let rec = p.poll_load(11_000).unwrap();
        assert_eq!(rec.recovery_delay_ms, Some(5000.0));
        assert!(p.poll_load(12_000).is_none());
        assert!(p.load().is_none());
        assert_eq!(p.store().reads(), 1);
    }

    #[test]
    fn save_is_gated() {
        let mut p = Persistence::new(MemoryStore::new(), "k".into(), cfg());
        let rec = PersistedRecord::default();
        assert!(!p.should_save(0, 0.0, true), "not loaded yet");
        p.load();
        assert!(!p.should_save(0, 0.0, true), "nothing pending");
        p.mark_dirty();
        assert!(!p.should_save(0, 0.0, false));
        assert!(!p.should_save(0, 0.5, true));
        assert!(p.should_save(0, 0.0, true));
        assert!(p.save(0, &rec));
        p.mark_dirty();
        assert!(!p.should_save(4_999, 0.0, true));
        assert!(p.should_save(5_000, 0.0, true));
    }

    #[test]
    fn failure_disables() {
        let mut p = Persistence::new(FailingStore::unavailable(), "k".into(), cfg());
        assert!(p.load().is_none());
        assert_eq!(p.state(), PersistenceState::Disabled);
        p.mark_dirty();
        assert!(!p.should_save(0, 0.0, true));
        assert!(!p.save(0, &PersistedRecord::default()));
    }

    #[test]
    fn read_record_reports_failures() {
        let mut store = MemoryStore::new();
        assert!(read_record(&mut store, "k").unwrap().is_none());
        store.insert("k", "OCVCOMP1\nBUCKETS=12\n");
        let err = read_record(&mut store, "k").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EstimatorError>(),
            Some(EstimatorError::Codec(crate::error::CodecError::BucketCount { found: 12, .. }))
        ));
        let err = read_record(&mut FailingStore::unavailable(), "k").unwrap_err();
        assert!(matches!(err.downcast_ref::<EstimatorError>(), Some(EstimatorError::Store(_))));
    }

    #[test]
    fn disabled_by_config() {
        let cfg = PersistenceCfg {
            enabled: false,
            ..cfg()
        };
        let mut p = Persistence::new(MemoryStore::new(), "k".into(), cfg);
        assert!(p.poll_load(100_000).is_none());
        assert_eq!(p.store().reads(), 0);
    }
}
