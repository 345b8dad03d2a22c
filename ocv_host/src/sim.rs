//! A synthetic pack for exercising the estimator without hardware.
//!
//! Each cell has a resting voltage that falls with charge drawn, and a sag
//! that follows throttle with a fast attack and a slow recovery, so released
//! throttle shows the same creeping rebound a real pack does.

use ocv_traits::Telemetry;

use crate::profile::ThrottleProfile;

/// Physical parameters, per cell.
#[derive(Debug, Clone)]
pub struct PackModel {
    pub cells: u8,
    pub full_v: f32,
    pub empty_v: f32,
    /// Sag at full throttle, volts.
    pub full_throttle_sag_v: f32,
    /// State of charge drawn per second at full throttle (fraction of 1).
    pub drain_per_s: f32,
    pub attack_ms: f32,
    pub recovery_ms: f32,
    /// Peak uniform noise, volts.
    pub noise_v: f32,
    /// Multiplier from volts to reported host units (100 for centivolts).
    pub unit_scale: f32,
}

impl Default for PackModel {
    fn default() -> Self {
        Self {
            cells: 4,
            full_v: 4.20,
            empty_v: 3.30,
            full_throttle_sag_v: 0.35,
            drain_per_s: 0.002,
            attack_ms: 150.0,
            recovery_ms: 1_500.0,
            noise_v: 0.003,
            unit_scale: 1.0,
        }
    }
}

pub struct SimulatedPack {
    model: PackModel,
    profile: ThrottleProfile,
    name: Option<String>,
    t_ms: u64,
    soc: f32,
    sag_v: f32,
    rng: u32,
}

impl SimulatedPack {
    pub fn new(model: PackModel, profile: ThrottleProfile) -> Self {
        Self {
            model,
            profile,
            name: None,
            t_ms: 0,
            soc: 1.0,
            sag_v: 0.0,
            rng: 0x2545_F491,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_soc(mut self, soc: f32) -> Self {
        self.soc = soc.clamp(0.0, 1.0);
        self
    }

    pub fn model(&self) -> &PackModel {
        &self.model
    }

    pub fn time_ms(&self) -> u64 {
        self.t_ms
    }

    pub fn soc(&self) -> f32 {
        self.soc
    }

    /// Resting cell voltage at the current state of charge.
    pub fn rest_cell_v(&self) -> f32 {
        self.model.empty_v + (self.model.full_v - self.model.empty_v) * self.soc
    }

    /// Cell voltage as the sensor would see it, without noise.
    pub fn loaded_cell_v(&self) -> f32 {
        self.rest_cell_v() - self.sag_v
    }

    pub fn throttle_pct(&self) -> f32 {
        self.profile.throttle_at(self.t_ms)
    }

    /// Advance the physics by `dt_ms`.
    pub fn step(&mut self, dt_ms: u64) {
        let thr = self.throttle_pct() / 100.0;
        let dt = dt_ms as f32;
        self.soc = (self.soc - thr * self.model.drain_per_s * dt / 1_000.0).max(0.0);
        let target = thr * self.model.full_throttle_sag_v;
        let tau = if target > self.sag_v {
            self.model.attack_ms
        } else {
            self.model.recovery_ms
        };
        let k = 1.0 - (-dt / tau.max(1.0)).exp();
        self.sag_v += (target - self.sag_v) * k;
        self.t_ms = self.t_ms.saturating_add(dt_ms);
    }

    fn noise(&mut self) -> f32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        let unit = (x as f32) / (u32::MAX as f32 + 1.0);
        (unit * 2.0 - 1.0) * self.model.noise_v
    }
}

impl Telemetry for SimulatedPack {
    fn pack_voltage(&mut self) -> Option<f32> {
        let cell = self.loaded_cell_v() + self.noise();
        Some(cell * f32::from(self.model.cells) * self.model.unit_scale)
    }

    fn throttle(&mut self) -> Option<f32> {
        Some(self.throttle_pct())
    }

    fn model_name(&self) -> Option<String> {
        self.name.clone()
    }
}
