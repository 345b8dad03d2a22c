#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the open-circuit voltage estimator.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section except `[pack]` is optional and falls back to the compiled
//!   defaults, which match `ocv_core::config`.
use serde::Deserialize;
use std::path::PathBuf;

/// Host units the pack voltage sensor reports in.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoltageUnit {
    #[default]
    Volts,
    Centivolts,
    Millivolts,
}

#[derive(Debug, Deserialize)]
pub struct Pack {
    /// Series cell count; pack voltage is divided by this to get per-cell volts.
    pub cells: u8,
    #[serde(default)]
    pub voltage_unit: VoltageUnit,
}

/// Names of the host telemetry channels to bind to.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sensors {
    pub voltage: String,
    pub throttle: String,
    /// Optional fixed model name; otherwise the host supplies one.
    pub model: Option<String>,
}

impl Default for Sensors {
    fn default() -> Self {
        Self {
            voltage: "RxBt".to_string(),
            throttle: "thr".to_string(),
            model: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChemistryMode {
    #[default]
    Auto,
    Standard,
    HighVoltage,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Chemistry {
    pub mode: ChemistryMode,
    /// Rest cell voltage at or above which a sample counts as high-voltage evidence.
    pub detect_cell_v: f32,
    /// Consecutive low-throttle samples of evidence needed to latch high-voltage.
    pub detect_count: u16,
}

impl Default for Chemistry {
    fn default() -> Self {
        Self {
            mode: ChemistryMode::Auto,
            detect_cell_v: 4.25,
            detect_count: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Rate {
    /// Follow the sensor's observed update cadence; otherwise use `fixed_period_ms`.
    pub adaptive: bool,
    pub min_update_ms: u64,
    pub max_update_ms: u64,
    pub fixed_period_ms: u64,
}

impl Default for Rate {
    fn default() -> Self {
        Self {
            adaptive: true,
            min_update_ms: 100,
            max_update_ms: 1000,
            fixed_period_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Throttle {
    /// At or below: the pack is considered resting.
    pub rest: f32,
    /// At or above: a load episode is captured.
    pub capture: f32,
    /// At or below: no sag compensation is applied.
    pub no_comp: f32,
    /// At or above: full sag compensation is applied.
    pub ramp_end: f32,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            rest: 0.05,
            capture: 0.15,
            no_comp: 0.05,
            ramp_end: 0.25,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Recovery {
    pub plateau_epsilon_v: f32,
    pub plateau_hold_ms: u64,
    pub min_low_ms: u64,
    pub delay_default_ms: f32,
    pub delay_min_ms: f32,
    pub delay_max_ms: f32,
    pub delay_ema: f32,
}

impl Default for Recovery {
    fn default() -> Self {
        Self {
            plateau_epsilon_v: 0.005,
            plateau_hold_ms: 1500,
            min_low_ms: 2500,
            delay_default_ms: 4000.0,
            delay_min_ms: 2500.0,
            delay_max_ms: 20_000.0,
            delay_ema: 0.25,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sag {
    pub min_learnable_v: f32,
    pub max_sag_v: f32,
    pub fast_ema: f32,
    pub slow_ema: f32,
    pub down_noise_v: f32,
    pub down_confirmations: u8,
    pub down_step: f32,
    pub down_default: f32,
    pub down_min: f32,
    pub down_max: f32,
    pub down_max_step_v: f32,
    pub knee_throttle: f32,
    pub gamma: f32,
}

impl Default for Sag {
    fn default() -> Self {
        Self {
            min_learnable_v: 0.02,
            max_sag_v: 1.2,
            fast_ema: 0.5,
            slow_ema: 0.1,
            down_noise_v: 0.02,
            down_confirmations: 4,
            down_step: 0.05,
            down_default: 0.25,
            down_min: 0.05,
            down_max: 0.6,
            down_max_step_v: 0.05,
            knee_throttle: 0.6,
            gamma: 1.3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Decay {
    /// Valid learned decay rate range, volts per second per cell.
    pub rate_min: f32,
    pub rate_max: f32,
    /// Default rate at full throttle; lower buckets scale linearly.
    pub full_throttle_default: f32,
    pub playback_slowdown: f32,
    pub learn_ema: f32,
    pub scale_min: f32,
    pub scale_max: f32,
    pub negligible_v: f32,
}

impl Default for Decay {
    fn default() -> Self {
        Self {
            rate_min: 0.000_01,
            rate_max: 0.01,
            full_throttle_default: 0.002,
            playback_slowdown: 0.5,
            learn_ema: 0.3,
            scale_min: 0.5,
            scale_max: 2.0,
            negligible_v: 0.005,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Output {
    pub cap_ema: f32,
    pub rest_ema: f32,
    pub cap_margin_v: f32,
    pub idle_margin_v: f32,
    pub min_cell_v: f32,
    pub max_cell_v: f32,
    pub max_cell_v_hv: f32,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            cap_ema: 0.35,
            rest_ema: 0.6,
            cap_margin_v: 0.02,
            idle_margin_v: 0.01,
            min_cell_v: 3.0,
            max_cell_v: 4.25,
            max_cell_v_hv: 4.40,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Persistence {
    pub enabled: bool,
    /// Directory for the file-backed store (host side only).
    pub dir: PathBuf,
    pub warmup_ms: u64,
    pub save_interval_ms: u64,
    pub save_throttle: f32,
}

impl Default for Persistence {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("ocv_data"),
            warmup_ms: 3000,
            save_interval_ms: 30_000,
            save_throttle: 0.05,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pack: Pack,
    #[serde(default)]
    pub sensors: Sensors,
    #[serde(default)]
    pub chemistry: Chemistry,
    #[serde(default)]
    pub rate: Rate,
    #[serde(default)]
    pub throttle: Throttle,
    #[serde(default)]
    pub recovery: Recovery,
    #[serde(default)]
    pub sag: Sag,
    #[serde(default)]
    pub decay: Decay,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub persistence: Persistence,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file; validation is left to the caller.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

#[inline]
fn unit(x: f32) -> bool {
    x.is_finite() && (0.0..=1.0).contains(&x)
}

#[inline]
fn weight(x: f32) -> bool {
    x.is_finite() && x > 0.0 && x <= 1.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pack
        if self.pack.cells == 0 || self.pack.cells > 16 {
            eyre::bail!("pack.cells must be in [1, 16]");
        }

        // Sensors
        if self.sensors.voltage.trim().is_empty() {
            eyre::bail!("sensors.voltage must not be empty");
        }
        if self.sensors.throttle.trim().is_empty() {
            eyre::bail!("sensors.throttle must not be empty");
        }

        // Chemistry
        if !(3.5..=4.5).contains(&self.chemistry.detect_cell_v) {
            eyre::bail!("chemistry.detect_cell_v must be in [3.5, 4.5]");
        }
        if self.chemistry.detect_count == 0 {
            eyre::bail!("chemistry.detect_count must be >= 1");
        }

        // Rate
        if self.rate.min_update_ms == 0 {
            eyre::bail!("rate.min_update_ms must be >= 1");
        }
        if self.rate.max_update_ms < self.rate.min_update_ms {
            eyre::bail!("rate.max_update_ms must be >= rate.min_update_ms");
        }
        if self.rate.fixed_period_ms == 0 {
            eyre::bail!("rate.fixed_period_ms must be >= 1");
        }

        // Throttle
        let t = &self.throttle;
        if !(unit(t.rest) && unit(t.capture) && unit(t.no_comp) && unit(t.ramp_end)) {
            eyre::bail!("throttle thresholds must be in [0.0, 1.0]");
        }
        if t.capture <= t.rest {
            eyre::bail!("throttle.capture must be > throttle.rest");
        }
        if t.ramp_end <= t.no_comp {
            eyre::bail!("throttle.ramp_end must be > throttle.no_comp");
        }

        // Recovery
        let r = &self.recovery;
        if !(r.plateau_epsilon_v > 0.0 && r.plateau_epsilon_v < 0.5) {
            eyre::bail!("recovery.plateau_epsilon_v must be in (0.0, 0.5)");
        }
        if r.plateau_hold_ms == 0 {
            eyre::bail!("recovery.plateau_hold_ms must be >= 1");
        }
        if !(r.delay_min_ms > 0.0 && r.delay_min_ms <= r.delay_max_ms) {
            eyre::bail!("recovery.delay_min_ms must be > 0 and <= recovery.delay_max_ms");
        }
        if !(r.delay_min_ms..=r.delay_max_ms).contains(&r.delay_default_ms) {
            eyre::bail!("recovery.delay_default_ms must lie within [delay_min_ms, delay_max_ms]");
        }
        if !weight(r.delay_ema) {
            eyre::bail!("recovery.delay_ema must be in (0.0, 1.0]");
        }

        // Sag
        let s = &self.sag;
        if !(s.max_sag_v > 0.0 && s.max_sag_v <= 2.0) {
            eyre::bail!("sag.max_sag_v must be in (0.0, 2.0]");
        }
        if !(s.min_learnable_v >= 0.0 && s.min_learnable_v < s.max_sag_v) {
            eyre::bail!("sag.min_learnable_v must be in [0.0, sag.max_sag_v)");
        }
        if !weight(s.fast_ema) || !weight(s.slow_ema) {
            eyre::bail!("sag.fast_ema and sag.slow_ema must be in (0.0, 1.0]");
        }
        if s.down_noise_v < 0.0 {
            eyre::bail!("sag.down_noise_v must be >= 0.0");
        }
        if s.down_confirmations == 0 {
            eyre::bail!("sag.down_confirmations must be >= 1");
        }
        if !(unit(s.down_min) && unit(s.down_max) && s.down_min <= s.down_max) {
            eyre::bail!("sag.down_min and sag.down_max must satisfy 0 <= down_min <= down_max <= 1");
        }
        if !(s.down_min..=s.down_max).contains(&s.down_default) {
            eyre::bail!("sag.down_default must lie within [down_min, down_max]");
        }
        if !unit(s.down_step) {
            eyre::bail!("sag.down_step must be in [0.0, 1.0]");
        }
        if s.down_max_step_v <= 0.0 {
            eyre::bail!("sag.down_max_step_v must be > 0.0");
        }
        if !(s.knee_throttle > 0.0 && s.knee_throttle < 1.0) {
            eyre::bail!("sag.knee_throttle must be in (0.0, 1.0)");
        }
        if !(s.gamma > 0.0 && s.gamma <= 4.0) {
            eyre::bail!("sag.gamma must be in (0.0, 4.0]");
        }

        // Decay
        let d = &self.decay;
        if !(d.rate_min >= 0.0 && d.rate_min < d.rate_max) {
            eyre::bail!("decay.rate_min must be >= 0 and < decay.rate_max");
        }
        if !(d.full_throttle_default > 0.0 && d.full_throttle_default <= d.rate_max) {
            eyre::bail!("decay.full_throttle_default must be in (0.0, decay.rate_max]");
        }
        if !weight(d.playback_slowdown) {
            eyre::bail!("decay.playback_slowdown must be in (0.0, 1.0]");
        }
        if !weight(d.learn_ema) {
            eyre::bail!("decay.learn_ema must be in (0.0, 1.0]");
        }
        if !(d.scale_min > 0.0 && d.scale_min <= 1.0 && d.scale_max >= 1.0) {
            eyre::bail!("decay.scale_min must be in (0.0, 1.0] and decay.scale_max >= 1.0");
        }
        if d.negligible_v < 0.0 {
            eyre::bail!("decay.negligible_v must be >= 0.0");
        }

        // Output
        let o = &self.output;
        if !weight(o.cap_ema) || !weight(o.rest_ema) {
            eyre::bail!("output.cap_ema and output.rest_ema must be in (0.0, 1.0]");
        }
        if o.cap_margin_v < 0.0 || o.idle_margin_v < 0.0 {
            eyre::bail!("output margins must be >= 0.0");
        }
        if !(o.min_cell_v > 0.0 && o.min_cell_v < o.max_cell_v && o.max_cell_v <= o.max_cell_v_hv)
        {
            eyre::bail!("output voltage limits must satisfy 0 < min_cell_v < max_cell_v <= max_cell_v_hv");
        }

        // Persistence
        if self.persistence.save_interval_ms == 0 {
            eyre::bail!("persistence.save_interval_ms must be >= 1");
        }
        if !unit(self.persistence.save_throttle) {
            eyre::bail!("persistence.save_throttle must be in [0.0, 1.0]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = load_toml("[pack]\ncells = 4\n").expect("parse");
        assert_eq!(cfg.pack.cells, 4);
        assert_eq!(cfg.pack.voltage_unit, VoltageUnit::Volts);
        assert_eq!(cfg.chemistry.mode, ChemistryMode::Auto);
        assert_eq!(cfg.sensors.voltage, "RxBt");
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn missing_pack_is_a_parse_error() {
        assert!(load_toml("[sensors]\nvoltage = \"VFAS\"\n").is_err());
    }
}
