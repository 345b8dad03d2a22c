//! Per-bucket learned voltage sag.
//!
//! Each bucket holds the sag (volts per cell under load relative to rest) for
//! its throttle band, plus the state that debounces downward corrections.
//! After every learning pass the curve is made non-decreasing by throttle and
//! the high-throttle tail is extrapolated from the knee bucket.

use crate::bucket::{BUCKET_COUNT, bucket_index, bucket_throttle};
use crate::config::SagCfg;
use crate::util::{clamp_finite, ema};

/// Learned state of one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SagCell {
    /// `None` until the bucket has learned (or inherited) a value.
    pub sag: Option<f32>,
    /// Fraction of a confirmed deficit applied per downward correction.
    pub down_fraction: f32,
    /// Consecutive below-curve candidates seen.
    pub confirmations: u8,
}

/// What an event-path candidate did to its bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SagUpdate {
    /// Below the learnable threshold; nothing changed.
    Ignored,
    /// First value for an undefined bucket.
    Seeded,
    Raised,
    /// Deficit within noise; counters relaxed only.
    Noise,
    /// Deficit counted; no correction yet.
    Pending { confirmations: u8 },
    Lowered { step: f32 },
}

#[derive(Debug, Clone)]
pub struct SagCurve {
    cfg: SagCfg,
    cells: [SagCell; BUCKET_COUNT],
}

impl SagCurve {
    pub fn new(cfg: SagCfg) -> Self {
        let cell = SagCell {
            sag: None,
            down_fraction: cfg.down_default,
            confirmations: 0,
        };
        Self {
            cfg,
            cells: [cell; BUCKET_COUNT],
        }
    }

    pub fn cells(&self) -> &[SagCell; BUCKET_COUNT] {
        &self.cells
    }

    pub fn sag(&self, index: usize) -> Option<f32> {
        self.cells.get(index).and_then(|c| c.sag)
    }

    /// Sag for the bucket containing `throttle`; undefined buckets read as 0.
    pub fn sag_at(&self, throttle: f32) -> f32 {
        self.sag(bucket_index(throttle)).unwrap_or(0.0)
    }

    pub fn sag_values(&self) -> [Option<f32>; BUCKET_COUNT] {
        self.cells.map(|c| c.sag)
    }

    pub fn down_fractions(&self) -> [f32; BUCKET_COUNT] {
        self.cells.map(|c| c.down_fraction)
    }

    #[inline]
    fn clamp_sag(&self, v: f32) -> f32 {
        clamp_finite(v, 0.0, self.cfg.max_sag_v)
    }

    #[inline]
    fn relax(&self, cell: &mut SagCell) {
        cell.down_fraction = clamp_finite(
            cell.down_fraction - self.cfg.down_step,
            self.cfg.down_min,
            self.cfg.down_max,
        );
    }

    /// Learn from one finished episode's candidate for `index`.
    pub fn learn_event(&mut self, index: usize, candidate: f32) -> SagUpdate {
        if index >= BUCKET_COUNT || candidate.is_nan() || candidate < self.cfg.min_learnable_v {
            return SagUpdate::Ignored;
        }
        let candidate = self.clamp_sag(candidate);
        let mut cell = self.cells[index];
        let update = match cell.sag {
            None => {
                cell.sag = Some(candidate);
                cell.confirmations = 0;
                SagUpdate::Seeded
            }
            Some(cur) if candidate >= cur => {
                cell.sag = Some(self.clamp_sag(ema(cur, candidate, self.cfg.fast_ema)));
                cell.confirmations = 0;
                self.relax(&mut cell);
                SagUpdate::Raised
            }
            Some(cur) => {
                let deficit = cur - candidate;
                if deficit <= self.cfg.down_noise_v {
                    cell.confirmations = 0;
                    self.relax(&mut cell);
                    SagUpdate::Noise
                } else {
                    cell.confirmations = cell.confirmations.saturating_add(1);
                    cell.down_fraction = clamp_finite(
                        cell.down_fraction + self.cfg.down_step,
                        self.cfg.down_min,
                        self.cfg.down_max,
                    );
                    if cell.confirmations >= self.cfg.down_confirmations {
                        let step = (deficit * cell.down_fraction).min(self.cfg.down_max_step_v);
                        cell.sag = Some(self.clamp_sag(cur - step));
                        cell.confirmations = self.cfg.down_confirmations / 2;
                        SagUpdate::Lowered { step }
                    } else {
                        SagUpdate::Pending {
                            confirmations: cell.confirmations,
                        }
                    }
                }
            }
        };
        self.cells[index] = cell;
        update
    }

    /// In-flight learning: only ever raises, with the slow weight. An undefined
    /// bucket starts from zero. Returns true when the bucket changed.
    pub fn learn_continuous(&mut self, index: usize, candidate: f32) -> bool {
        if index >= BUCKET_COUNT || candidate.is_nan() || candidate < self.cfg.min_learnable_v {
            return false;
        }
        let candidate = self.clamp_sag(candidate);
        let cur = self.cells[index].sag.unwrap_or(0.0);
        if candidate <= cur {
            return false;
        }
        self.cells[index].sag = Some(self.clamp_sag(ema(cur, candidate, self.cfg.slow_ema)));
        true
    }

    /// Forward-fill undefined buckets from the nearest defined lower bucket and
    /// raise any bucket below its lower neighbour.
    pub fn enforce_monotonic(&mut self) {
        let mut floor: Option<f32> = None;
        for cell in &mut self.cells {
            let v = match (cell.sag, floor) {
                (Some(v), Some(f)) => Some(v.max(f)),
                (Some(v), None) => Some(v),
                (None, inherited) => inherited,
            };
            cell.sag = v;
            floor = v;
        }
    }

    /// Project the knee bucket's sag onto every higher bucket as
    /// `ref * (t / t_ref)^gamma`, raising buckets that sit below it.
    pub fn extrapolate_high(&mut self) {
        let knee = (0..BUCKET_COUNT)
            .rev()
            .find(|&i| bucket_throttle(i) <= self.cfg.knee_throttle && self.cells[i].sag.is_some());
        let Some(r) = knee else {
            return;
        };
        let Some(ref_sag) = self.cells[r].sag else {
            return;
        };
        let ref_t = bucket_throttle(r);
        for i in (r + 1)..BUCKET_COUNT {
            let desired = self.clamp_sag(ref_sag * (bucket_throttle(i) / ref_t).powf(self.cfg.gamma));
            let cell = &mut self.cells[i];
            if cell.sag.is_none_or(|v| v < desired) {
                cell.sag = Some(desired);
            }
        }
        self.enforce_monotonic();
    }

    /// Full post-learning pass.
    pub fn enforce(&mut self) {
        self.enforce_monotonic();
        self.extrapolate_high();
    }

    /// Replace learned arrays from a persisted record, clamping every entry.
    /// An absent array falls back to the compiled default (undefined sag,
    /// `down_default` fractions). Confirmation counters restart from zero.
    pub fn restore(&mut self, sag: Option<[Option<f32>; BUCKET_COUNT]>, down: Option<[f32; BUCKET_COUNT]>) {
        let max_sag = self.cfg.max_sag_v;
        let sag = sag.unwrap_or([None; BUCKET_COUNT]);
        for (cell, v) in self.cells.iter_mut().zip(sag) {
            cell.sag = v.map(|v| clamp_finite(v, 0.0, max_sag));
            cell.confirmations = 0;
        }
        let down = down.unwrap_or([self.cfg.down_default; BUCKET_COUNT]);
        for (cell, d) in self.cells.iter_mut().zip(down) {
            cell.down_fraction = clamp_finite(d, self.cfg.down_min, self.cfg.down_max);
        }
        self.enforce();
    }
}
