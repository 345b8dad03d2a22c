//! Type-state builder for `Estimator`.
//!
//! `build()` is only available once the cell count is set; `try_build()` is
//! always available and reports what is missing.

use std::marker::PhantomData;

use ocv_traits::BlobStore;

use crate::config::*;
use crate::error::{BuildError, Result};
use crate::estimator::Estimator;
use crate::identity::model_key;
use crate::mocks::NullStore;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Estimator`. Sections left unset use their defaults.
pub struct EstimatorBuilder<C, S = NullStore> {
    cells: Option<u8>,
    voltage_unit: Option<VoltageUnit>,
    chemistry: Option<ChemistryCfg>,
    rate: Option<RateCfg>,
    throttle: Option<ThrottleCfg>,
    recovery: Option<RecoveryCfg>,
    sag: Option<SagCfg>,
    decay: Option<DecayCfg>,
    output: Option<OutputCfg>,
    persistence: Option<PersistenceCfg>,
    model: Option<String>,
    store: S,
    _c: PhantomData<C>,
}

impl Default for EstimatorBuilder<Missing, NullStore> {
    fn default() -> Self {
        Self {
            cells: None,
            voltage_unit: None,
            chemistry: None,
            rate: None,
            throttle: None,
            recovery: None,
            sag: None,
            decay: None,
            output: None,
            persistence: None,
            model: None,
            store: NullStore,
            _c: PhantomData,
        }
    }
}

impl Estimator<NullStore> {
    /// Start building an Estimator.
    pub fn builder() -> EstimatorBuilder<Missing, NullStore> {
        EstimatorBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn unit(x: f32) -> bool {
    x.is_finite() && (0.0..=1.0).contains(&x)
}

fn weight(x: f32) -> bool {
    x.is_finite() && x > 0.0 && x <= 1.0
}

/// Validate a complete configuration. Single source of truth for both
/// `EstimatorBuilder::try_build()` and `build_estimator()`.
pub fn validate(cfg: &EstimatorCfg) -> Result<()> {
    if !(1..=16).contains(&cfg.pack.cells) {
        return Err(invalid("cells must be in 1..=16"));
    }
    let t = &cfg.throttle;
    if !(unit(t.rest) && unit(t.capture) && unit(t.no_comp) && unit(t.ramp_end)) {
        return Err(invalid("throttle thresholds must be in [0, 1]"));
    }
    if t.capture <= t.rest {
        return Err(invalid("capture threshold must be above rest threshold"));
    }
    if t.ramp_end <= t.no_comp {
        return Err(invalid("ramp end must be above no-compensation threshold"));
    }
    let r = &cfg.rate;
    if r.min_update_ms == 0 || r.min_update_ms > r.max_update_ms {
        return Err(invalid("rate bounds must satisfy 0 < min_update_ms <= max_update_ms"));
    }
    if !r.adaptive && r.fixed_period_ms == 0 {
        return Err(invalid("fixed_period_ms must be > 0"));
    }
    if cfg.chemistry.detect_count == 0 {
        return Err(invalid("detect_count must be > 0"));
    }
    let rc = &cfg.recovery;
    if !(rc.plateau_epsilon_v.is_finite() && rc.plateau_epsilon_v >= 0.0) {
        return Err(invalid("plateau_epsilon_v must be >= 0"));
    }
    if !(rc.delay_min_ms.is_finite() && rc.delay_min_ms >= 0.0 && rc.delay_min_ms <= rc.delay_max_ms) {
        return Err(invalid("recovery delay bounds must satisfy 0 <= min <= max"));
    }
    if !weight(rc.delay_ema) {
        return Err(invalid("delay_ema must be in (0, 1]"));
    }
    let s = &cfg.sag;
    if !(s.max_sag_v.is_finite() && s.max_sag_v > 0.0) {
        return Err(invalid("max_sag_v must be > 0"));
    }
    if !(weight(s.fast_ema) && weight(s.slow_ema)) {
        return Err(invalid("sag EMA weights must be in (0, 1]"));
    }
    if s.down_confirmations == 0 {
        return Err(invalid("down_confirmations must be > 0"));
    }
    if !(unit(s.down_min) && unit(s.down_max) && s.down_min <= s.down_max) {
        return Err(invalid("down fraction bounds must satisfy 0 <= min <= max <= 1"));
    }
    if !(s.knee_throttle > 0.0 && s.knee_throttle <= 1.0) {
        return Err(invalid("knee_throttle must be in (0, 1]"));
    }
    if !(s.gamma.is_finite() && s.gamma > 0.0) {
        return Err(invalid("gamma must be > 0"));
    }
    let d = &cfg.decay;
    if !(d.rate_min.is_finite() && d.rate_min > 0.0 && d.rate_min <= d.rate_max) {
        return Err(invalid("decay rate bounds must satisfy 0 < min <= max"));
    }
    if !(d.scale_min > 0.0 && d.scale_min <= d.scale_max) {
        return Err(invalid("decay scale bounds must satisfy 0 < min <= max"));
    }
    if !(weight(d.learn_ema) && unit(d.playback_slowdown)) {
        return Err(invalid("decay weights must be in [0, 1]"));
    }
    let o = &cfg.output;
    if !(weight(o.cap_ema) && weight(o.rest_ema)) {
        return Err(invalid("anchor EMA weights must be in (0, 1]"));
    }
    if !(o.min_cell_v > 0.0 && o.min_cell_v < o.max_cell_v && o.max_cell_v <= o.max_cell_v_hv) {
        return Err(invalid("output limits must satisfy 0 < min < max <= max_hv"));
    }
    if o.cap_margin_v.is_sign_negative() || o.idle_margin_v.is_sign_negative() {
        return Err(invalid("output margins must be >= 0"));
    }
    if !unit(cfg.persistence.save_throttle) {
        return Err(invalid("save_throttle must be in [0, 1]"));
    }
    Ok(())
}

/// Validate `cfg` and construct an estimator over `store`.
pub fn build_estimator<S: BlobStore>(
    cfg: EstimatorCfg,
    store: S,
    model: Option<&str>,
) -> Result<Estimator<S>> {
    validate(&cfg)?;
    let key = model_key(model);
    tracing::debug!(cells = cfg.pack.cells, key = %key, "estimator built");
    Ok(Estimator::from_parts(cfg, store, key))
}

impl<C, S> EstimatorBuilder<C, S> {
    pub fn cells(self, cells: u8) -> EstimatorBuilder<Set, S> {
        EstimatorBuilder {
            cells: Some(cells),
            voltage_unit: self.voltage_unit,
            chemistry: self.chemistry,
            rate: self.rate,
            throttle: self.throttle,
            recovery: self.recovery,
            sag: self.sag,
            decay: self.decay,
            output: self.output,
            persistence: self.persistence,
            model: self.model,
            store: self.store,
            _c: PhantomData,
        }
    }

    /// Take every section (and the cell count) from a complete config.
    pub fn config(self, cfg: EstimatorCfg) -> EstimatorBuilder<Set, S> {
        let mut b = self.cells(cfg.pack.cells);
        b.voltage_unit = Some(cfg.pack.voltage_unit);
        b.chemistry = Some(cfg.chemistry);
        b.rate = Some(cfg.rate);
        b.throttle = Some(cfg.throttle);
        b.recovery = Some(cfg.recovery);
        b.sag = Some(cfg.sag);
        b.decay = Some(cfg.decay);
        b.output = Some(cfg.output);
        b.persistence = Some(cfg.persistence);
        b
    }

    /// Swap in the persistence store.
    pub fn store<S2: BlobStore>(self, store: S2) -> EstimatorBuilder<C, S2> {
        EstimatorBuilder {
            cells: self.cells,
            voltage_unit: self.voltage_unit,
            chemistry: self.chemistry,
            rate: self.rate,
            throttle: self.throttle,
            recovery: self.recovery,
            sag: self.sag,
            decay: self.decay,
            output: self.output,
            persistence: self.persistence,
            model: self.model,
            store,
            _c: PhantomData,
        }
    }

    /// Model name; sanitized into the persistence key.
    pub fn model(mut self, name: impl Into<String>) -> Self {
        self.model = Some(name.into());
        self
    }

    pub fn voltage_unit(mut self, unit: VoltageUnit) -> Self {
        self.voltage_unit = Some(unit);
        self
    }

    pub fn chemistry(mut self, c: ChemistryCfg) -> Self {
        self.chemistry = Some(c);
        self
    }

    pub fn rate(mut self, c: RateCfg) -> Self {
        self.rate = Some(c);
        self
    }

    pub fn throttle(mut self, c: ThrottleCfg) -> Self {
        self.throttle = Some(c);
        self
    }

    pub fn recovery(mut self, c: RecoveryCfg) -> Self {
        self.recovery = Some(c);
        self
    }

    pub fn sag(mut self, c: SagCfg) -> Self {
        self.sag = Some(c);
        self
    }

    pub fn decay(mut self, c: DecayCfg) -> Self {
        self.decay = Some(c);
        self
    }

    pub fn output(mut self, c: OutputCfg) -> Self {
        self.output = Some(c);
        self
    }

    pub fn persistence(mut self, c: PersistenceCfg) -> Self {
        self.persistence = Some(c);
        self
    }
}

impl<C, S: BlobStore> EstimatorBuilder<C, S> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<Estimator<S>> {
        let cells = self
            .cells
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCells))?;
        let cfg = EstimatorCfg {
            pack: PackCfg {
                cells,
                voltage_unit: self.voltage_unit.unwrap_or_default(),
            },
            chemistry: self.chemistry.unwrap_or_default(),
            rate: self.rate.unwrap_or_default(),
            throttle: self.throttle.unwrap_or_default(),
            recovery: self.recovery.unwrap_or_default(),
            sag: self.sag.unwrap_or_default(),
            decay: self.decay.unwrap_or_default(),
            output: self.output.unwrap_or_default(),
            persistence: self.persistence.unwrap_or_default(),
        };
        build_estimator(cfg, self.store, self.model.as_deref())
    }
}

impl<S: BlobStore> EstimatorBuilder<Set, S> {
    pub fn build(self) -> Result<Estimator<S>> {
        self.try_build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&EstimatorCfg::with_cells(4)).is_ok());
    }

    #[test]
    fn model_name_becomes_key() {
        let est = Estimator::builder().cells(3).model("Mini Quad").build().unwrap();
        assert_eq!(est.persistence().key(), "Mini_Quad");
    }
}
