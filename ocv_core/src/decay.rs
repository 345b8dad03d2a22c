//! Per-bucket open-circuit decay rate.
//!
//! While loaded, the pack's resting voltage falls at a rate that depends on
//! throttle. The live OCV estimate plays these rates back (slowed down), and
//! each confirmed recovery rescales the rates of the buckets that were used so
//! that the predicted drop matches the drop actually observed.

use crate::bucket::{BUCKET_COUNT, bucket_throttle};
use crate::config::DecayCfg;
use crate::util::{clamp_finite, ema, ms_to_s};

/// Outcome of one learning pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayLearn {
    pub needed_v: f32,
    pub predicted_v: f32,
    pub scale: f32,
}

#[derive(Debug, Clone)]
pub struct DecayModel {
    cfg: DecayCfg,
    rates: [f32; BUCKET_COUNT],
}

impl DecayModel {
    pub fn new(cfg: DecayCfg) -> Self {
        let rates = Self::default_rates(&cfg);
        Self { cfg, rates }
    }

    /// Compiled defaults: the full-throttle rate scaled by bucket throttle.
    pub fn default_rates(cfg: &DecayCfg) -> [f32; BUCKET_COUNT] {
        std::array::from_fn(|i| {
            clamp_finite(
                cfg.full_throttle_default * bucket_throttle(i),
                cfg.rate_min,
                cfg.rate_max,
            )
        })
    }

    pub fn rates(&self) -> &[f32; BUCKET_COUNT] {
        &self.rates
    }

    pub fn rate(&self, index: usize) -> f32 {
        self.rates[index.min(BUCKET_COUNT - 1)]
    }

    /// Voltage the live estimate loses over `dt_ms` in bucket `index`, using the
    /// slowed playback rate.
    pub fn playback_drop(&self, index: usize, dt_ms: u64) -> f32 {
        self.rate(index) * ms_to_s(dt_ms) * self.cfg.playback_slowdown
    }

    /// Drop predicted by the full learned rates for the given loaded times.
    pub fn predicted_drop(&self, loaded_ms: &[u64; BUCKET_COUNT]) -> f32 {
        self.rates
            .iter()
            .zip(loaded_ms)
            .filter(|(_, ms)| **ms > 0)
            .map(|(rate, ms)| rate * ms_to_s(*ms))
            .sum()
    }

    /// Rescale the rates of every loaded bucket toward `needed / predicted`.
    /// Returns `None` when there is nothing trustworthy to learn from.
    pub fn learn(&mut self, needed_v: f32, loaded_ms: &[u64; BUCKET_COUNT]) -> Option<DecayLearn> {
        if loaded_ms.iter().all(|ms| *ms == 0) {
            return None;
        }
        let needed_v = needed_v.max(0.0);
        let predicted_v = self.predicted_drop(loaded_ms);
        if !needed_v.is_finite()
            || needed_v < self.cfg.negligible_v
            || !predicted_v.is_finite()
            || predicted_v < self.cfg.negligible_v
        {
            return None;
        }
        let scale = (needed_v / predicted_v).clamp(self.cfg.scale_min, self.cfg.scale_max);
        for (rate, ms) in self.rates.iter_mut().zip(loaded_ms) {
            if *ms > 0 {
                *rate = clamp_finite(
                    ema(*rate, *rate * scale, self.cfg.learn_ema),
                    self.cfg.rate_min,
                    self.cfg.rate_max,
                );
            }
        }
        Some(DecayLearn {
            needed_v,
            predicted_v,
            scale,
        })
    }

    /// Replace the rates from a persisted record, clamping every entry.
    /// `None` restores the compiled defaults.
    pub fn restore(&mut self, rates: Option<[f32; BUCKET_COUNT]>) {
        let rates = rates.unwrap_or_else(|| Self::default_rates(&self.cfg));
        for (dst, src) in self.rates.iter_mut().zip(rates) {
            *dst = clamp_finite(src, self.cfg.rate_min, self.cfg.rate_max);
        }
    }
}
