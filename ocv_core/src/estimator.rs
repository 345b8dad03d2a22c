//! The per-tick driver.
//!
//! Order of work on an admitted tick:
//! rate gate → chemistry → recovery (may finalize an episode and learn) →
//! episode capture and live estimate → output composition → percent → save check.

use ocv_traits::{BlobStore, Telemetry};

use crate::bucket::bucket_index;
use crate::cap::CapStabilizer;
use crate::chemistry::{Chemistry, ChemistryClassifier, ClassifierState};
use crate::codec::{ChemistryFlag, PersistedRecord};
use crate::config::{ChemistryMode, EstimatorCfg};
use crate::decay::DecayModel;
use crate::episode::Episode;
use crate::machine::{Phase, PhaseKind};
use crate::mocks::NullStore;
use crate::output::{Composition, Estimate, compose};
use crate::percent::PercentMapper;
use crate::persistence::{Persistence, PersistenceState};
use crate::rate::RateGovernor;
use crate::recovery::LowWindow;
use crate::sag::SagCurve;
use crate::status::{SkipReason, TickStatus};
use crate::throttle::{ThrottleNormalizer, ramp_ratio};
use crate::util::{clamp_finite, ema};

/// One host reading, in host units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Monotonic host tick, milliseconds.
    pub now_ms: u64,
    pub pack_voltage: Option<f32>,
    pub throttle: Option<f32>,
}

impl Sample {
    pub fn new(now_ms: u64, pack_voltage: f32, throttle: f32) -> Self {
        Self {
            now_ms,
            pack_voltage: Some(pack_voltage),
            throttle: Some(throttle),
        }
    }
}

pub struct Estimator<S = NullStore> {
    cfg: EstimatorCfg,
    governor: RateGovernor,
    normalizer: ThrottleNormalizer,
    chemistry: ChemistryClassifier,
    percent: PercentMapper,
    sag: SagCurve,
    decay: DecayModel,
    cap: CapStabilizer,
    phase: Phase,
    recovery_delay_ms: f32,
    load_seen: bool,
    last_tick_ms: Option<u64>,
    last: Option<Estimate>,
    persistence: Persistence<S>,
}

impl<S> std::fmt::Debug for Estimator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("phase", &self.phase.kind())
            .field("anchor", &self.cap.anchor())
            .field("recovery_delay_ms", &self.recovery_delay_ms)
            .field("chemistry", &self.chemistry.chemistry())
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

impl<S: BlobStore> Estimator<S> {
    pub(crate) fn from_parts(cfg: EstimatorCfg, store: S, key: String) -> Self {
        let recovery_delay_ms = clamp_finite(
            cfg.recovery.delay_default_ms,
            cfg.recovery.delay_min_ms,
            cfg.recovery.delay_max_ms,
        );
        Self {
            governor: RateGovernor::new(cfg.rate.clone()),
            normalizer: ThrottleNormalizer::new(),
            chemistry: ChemistryClassifier::new(cfg.chemistry.clone()),
            percent: PercentMapper,
            sag: SagCurve::new(cfg.sag.clone()),
            decay: DecayModel::new(cfg.decay.clone()),
            cap: CapStabilizer::new(cfg.output.cap_ema, cfg.output.rest_ema),
            phase: Phase::Idle,
            recovery_delay_ms,
            load_seen: false,
            last_tick_ms: None,
            last: None,
            persistence: Persistence::new(store, key, cfg.persistence.clone()),
            cfg,
        }
    }

    // ── Introspection ────────────────────────────────────────────────────────

    pub fn config(&self) -> &EstimatorCfg {
        &self.cfg
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Confirmed rest voltage per cell.
    pub fn anchor(&self) -> Option<f32> {
        self.cap.anchor()
    }

    pub fn rest_estimate(&self) -> Option<f32> {
        self.cap.rest_estimate()
    }

    pub fn sag_curve(&self) -> &SagCurve {
        &self.sag
    }

    pub fn decay_model(&self) -> &DecayModel {
        &self.decay
    }

    pub fn recovery_delay_ms(&self) -> f32 {
        self.recovery_delay_ms
    }

    pub fn chemistry(&self) -> Chemistry {
        self.chemistry.chemistry()
    }

    pub fn persistence_state(&self) -> PersistenceState {
        self.persistence.state()
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    /// Whether any load episode has started this session.
    pub fn load_seen(&self) -> bool {
        self.load_seen
    }

    pub fn last_estimate(&self) -> Option<&Estimate> {
        self.last.as_ref()
    }

    /// The record a save would write right now.
    pub fn snapshot(&self) -> PersistedRecord {
        let chemistry = match self.chemistry.state() {
            ClassifierState::ForcedHighVoltage | ClassifierState::AutoLatchedHighVoltage => {
                ChemistryFlag::HighVoltage
            }
            ClassifierState::ForcedStandard => ChemistryFlag::Standard,
            ClassifierState::AutoUnlatched { .. } => ChemistryFlag::Auto,
        };
        PersistedRecord {
            recovery_delay_ms: Some(self.recovery_delay_ms),
            chemistry: Some(chemistry),
            sag: Some(self.sag.sag_values()),
            down: Some(self.sag.down_fractions()),
            decay: Some(*self.decay.rates()),
        }
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Attempt the load now instead of waiting for the warm-up delay. Returns
    /// true when a stored record was applied. Later calls do nothing.
    pub fn load_persisted(&mut self) -> bool {
        match self.persistence.load() {
            Some(record) => {
                self.apply_record(&record);
                true
            }
            None => false,
        }
    }

    /// Apply a decoded record over the current learned state, clamping every
    /// value. Absent SAG, DOWN and DCR arrays reset to compiled defaults; an
    /// absent RECOV keeps the current delay.
    pub fn apply_record(&mut self, record: &PersistedRecord) {
        let rc = &self.cfg.recovery;
        if let Some(d) = record.recovery_delay_ms {
            self.recovery_delay_ms = clamp_finite(d, rc.delay_min_ms, rc.delay_max_ms);
        }
        if record.chemistry == Some(ChemistryFlag::HighVoltage)
            && self.chemistry.mode() == ChemistryMode::Auto
        {
            self.chemistry.restore_latched();
        }
        self.sag.restore(record.sag, record.down);
        self.decay.restore(record.decay);
        tracing::debug!(
            recovery_delay_ms = self.recovery_delay_ms,
            chemistry = ?self.chemistry.chemistry(),
            "applied persisted record"
        );
    }

    // ── Tick ─────────────────────────────────────────────────────────────────

    /// Read the host bus and run one tick.
    pub fn poll<T: Telemetry + ?Sized>(&mut self, telemetry: &mut T, now_ms: u64) -> TickStatus {
        let sample = Sample {
            now_ms,
            pack_voltage: telemetry.pack_voltage(),
            throttle: telemetry.throttle(),
        };
        self.tick(sample)
    }

    /// Run one tick. Skipped ticks leave learned and phase state untouched.
    pub fn tick(&mut self, sample: Sample) -> TickStatus {
        let now = sample.now_ms;
        let Some(pack_v) = sample.pack_voltage.filter(|v| v.is_finite() && *v > 0.0) else {
            tracing::trace!(now, "skip: no pack voltage");
            return TickStatus::Skipped(SkipReason::MissingVoltage);
        };
        let Some(raw_thr) = sample.throttle.filter(|t| t.is_finite()) else {
            tracing::trace!(now, "skip: no throttle");
            return TickStatus::Skipped(SkipReason::MissingThrottle);
        };
        self.governor.observe(pack_v, now);
        if !self.governor.admit(now) {
            return TickStatus::Skipped(SkipReason::RateLimited);
        }

        let cell_v =
            pack_v / self.cfg.pack.voltage_unit.divisor() / f32::from(self.cfg.pack.cells.max(1));
        let thr = self.normalizer.normalize(raw_thr);
        let dt_ms = self
            .last_tick_ms
            .map_or(0, |t| now.saturating_sub(t).min(self.max_dt_ms()));
        self.last_tick_ms = Some(now);

        self.cap.seed(cell_v);
        if let Some(record) = self.persistence.poll_load(now) {
            self.apply_record(&record);
        }
        if self
            .chemistry
            .observe(cell_v, thr, self.cfg.throttle.rest)
        {
            self.persistence.mark_dirty();
        }

        let ratio = ramp_ratio(thr, &self.cfg.throttle);
        let before = self.phase.kind();
        self.step_recovery(now, cell_v, thr);
        self.step_episode(dt_ms, cell_v, thr, ratio);
        let after = self.phase.kind();
        if before != after {
            tracing::debug!(now, from = %before, to = %after, throttle = thr, cell_v, "phase");
        }

        let estimate = self.compose(cell_v, thr, ratio);
        self.last = Some(estimate);

        if self.persistence.should_save(now, thr, self.load_seen) {
            let record = self.snapshot();
            self.persistence.save(now, &record);
        }
        TickStatus::Estimated(estimate)
    }

    /// Per-tick elapsed-time cap. Never below the governed period, so a
    /// fixed period longer than `max_update_ms` is not truncated.
    fn max_dt_ms(&self) -> u64 {
        self.governor.period_ms().max(self.cfg.rate.max_update_ms)
    }

    fn max_cell_v(&self) -> f32 {
        match self.chemistry.chemistry() {
            Chemistry::Standard => self.cfg.output.max_cell_v,
            Chemistry::HighVoltage => self.cfg.output.max_cell_v_hv,
        }
    }

    fn step_recovery(&mut self, now: u64, cell_v: f32, thr: f32) {
        let low = thr <= self.cfg.throttle.rest;
        let phase = std::mem::take(&mut self.phase).on_throttle(low, now, cell_v);
        self.phase = match phase {
            Phase::Resting(mut w) => {
                w.update(now, cell_v, &self.cfg.recovery);
                if w.ready(self.recovery_delay_ms) {
                    self.finalize(&w, None);
                    w.mark_confirmed();
                }
                Phase::Resting(w)
            }
            Phase::Recovering(episode, mut w) => {
                w.update(now, cell_v, &self.cfg.recovery);
                if w.ready(self.recovery_delay_ms) {
                    self.finalize(&w, Some(episode));
                    w.mark_confirmed();
                    Phase::Resting(w)
                } else {
                    Phase::Recovering(episode, w)
                }
            }
            other => other,
        };
    }

    /// Confirmed recovery: learn the delay, move the anchor, and close the
    /// episode (if any) through decay and sag learning.
    fn finalize(&mut self, window: &LowWindow, episode: Option<Episode>) {
        let peak = window.long_peak();
        if self.load_seen {
            let measured = window.elapsed_ms();
            let rc = &self.cfg.recovery;
            self.recovery_delay_ms = clamp_finite(
                ema(self.recovery_delay_ms, measured as f32, rc.delay_ema),
                rc.delay_min_ms,
                rc.delay_max_ms,
            );
            self.persistence.mark_dirty();
        }

        let max_v = self.max_cell_v();
        self.cap.confirm(peak, self.cfg.output.min_cell_v, max_v);

        let mut learned = 0_usize;
        if let Some(episode) = episode {
            let decay = self
                .decay
                .learn(episode.ocv_start() - peak, episode.loaded_ms());
            if let Some(d) = decay {
                tracing::debug!(needed_v = d.needed_v, predicted_v = d.predicted_v, scale = d.scale, "decay learned");
            }
            for (i, min) in episode.minima().iter().enumerate() {
                if let Some(min) = min {
                    let update = self.sag.learn_event(i, peak - min);
                    tracing::trace!(bucket = i, ?update, "sag event");
                    learned += 1;
                }
            }
            self.sag.enforce();
            self.persistence.mark_dirty();
        }

        tracing::info!(
            peak_v = peak,
            elapsed_ms = window.elapsed_ms(),
            plateau_ms = ?window.plateau_ms(),
            anchor = ?self.cap.anchor(),
            recovery_delay_ms = self.recovery_delay_ms,
            buckets = learned,
            "recovery confirmed"
        );
    }

    fn step_episode(&mut self, dt_ms: u64, cell_v: f32, thr: f32, ratio: f32) {
        if thr < self.cfg.throttle.capture {
            return;
        }
        let index = bucket_index(thr);
        if self.phase.episode().is_none() {
            if !matches!(self.phase, Phase::Idle) {
                return;
            }
            let start = self
                .cap
                .anchor()
                .or(self.cap.rest_estimate())
                .unwrap_or(cell_v);
            let start = clamp_finite(start, self.cfg.output.min_cell_v, self.max_cell_v());
            self.phase = Phase::Loaded(Episode::open(start));
            self.load_seen = true;
            tracing::debug!(ocv_start = start, "episode opened");
        }

        // The opening tick counts too: every loaded tick accrues the interval
        // ending at it.
        let drop = self.decay.playback_drop(index, dt_ms);
        let floor = cell_v + self.sag.sag_at(thr) * ratio;
        let ceiling = self.cap.anchor().map(|a| a + self.cfg.output.cap_margin_v);
        if let Some(episode) = self.phase.episode_mut() {
            episode.capture(index, cell_v, dt_ms);
            let est = episode.advance_ocv(drop, floor, ceiling);
            tracing::trace!(bucket = index, ocv = est, floor, "ocv advance");
        }

        if thr > self.cfg.throttle.capture
            && let Some(rest) = self.cap.rest_estimate()
        {
            if self.sag.learn_continuous(index, rest - cell_v) {
                self.persistence.mark_dirty();
            }
            self.sag.enforce();
        }
    }

    fn compose(&self, cell_v: f32, thr: f32, ratio: f32) -> Estimate {
        let episode_ocv = self.phase.episode().map(Episode::ocv_estimate);
        let c = Composition {
            raw_cell_v: cell_v,
            throttle: thr,
            ratio,
            sag_v: self.sag.sag_at(thr),
            anchor: self.cap.anchor(),
            episode_ocv,
            max_cell_v: self.max_cell_v(),
        };
        let out_v = compose(&c, &self.cfg.throttle, &self.cfg.output);
        let percent = self.percent.percent(self.chemistry.chemistry(), out_v);
        tracing::trace!(raw = cell_v, out = out_v, ratio, percent, "compose");
        Estimate {
            percent,
            cell_v: out_v,
            raw_cell_v: cell_v,
            ratio_pct: ratio * 100.0,
        }
    }
}

impl<S> Estimator<S> {
    pub fn phase_kind(&self) -> PhaseKind {
        self.phase.kind()
    }
}
