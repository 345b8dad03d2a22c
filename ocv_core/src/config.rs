//! Runtime configuration types for the estimator.
//!
//! These are the structs `Estimator` is built from. They are separate from the
//! TOML-deserialized config in `ocv_config`; see `conversions` for the bridge.

/// Host units for the pack voltage sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VoltageUnit {
    #[default]
    Volts,
    Centivolts,
    Millivolts,
}

impl VoltageUnit {
    /// Divisor that turns a host reading into volts.
    #[inline]
    pub fn divisor(self) -> f32 {
        match self {
            Self::Volts => 1.0,
            Self::Centivolts => 100.0,
            Self::Millivolts => 1000.0,
        }
    }
}

/// Pack wiring.
#[derive(Debug, Clone)]
pub struct PackCfg {
    /// Series cell count (1..=16).
    pub cells: u8,
    pub voltage_unit: VoltageUnit,
}

/// Configured chemistry handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChemistryMode {
    #[default]
    Auto,
    Standard,
    HighVoltage,
}

#[derive(Debug, Clone)]
pub struct ChemistryCfg {
    pub mode: ChemistryMode,
    /// Rest cell voltage counted as high-voltage evidence (inclusive).
    pub detect_cell_v: f32,
    /// Consecutive evidence samples required to latch.
    pub detect_count: u16,
}

impl Default for ChemistryCfg {
    fn default() -> Self {
        Self {
            mode: ChemistryMode::Auto,
            detect_cell_v: 4.25,
            detect_count: 10,
        }
    }
}

/// Processing cadence.
#[derive(Debug, Clone)]
pub struct RateCfg {
    /// Follow the sensor's update cadence. When false, `fixed_period_ms` is used.
    pub adaptive: bool,
    pub min_update_ms: u64,
    pub max_update_ms: u64,
    pub fixed_period_ms: u64,
}

impl Default for RateCfg {
    fn default() -> Self {
        Self {
            adaptive: true,
            min_update_ms: 100,
            max_update_ms: 1000,
            fixed_period_ms: 200,
        }
    }
}

/// Throttle thresholds, all on the normalized [0, 1] scale.
#[derive(Debug, Clone)]
pub struct ThrottleCfg {
    /// At or below: resting (recovery tracking, chemistry evidence).
    pub rest: f32,
    /// At or above: load episode capture.
    pub capture: f32,
    /// At or below: compensation ratio is 0.
    pub no_comp: f32,
    /// At or above: compensation ratio is 1.
    pub ramp_end: f32,
}

impl Default for ThrottleCfg {
    fn default() -> Self {
        Self {
            rest: 0.05,
            capture: 0.15,
            no_comp: 0.05,
            ramp_end: 0.25,
        }
    }
}

/// Recovery plateau detection and learned recovery delay.
#[derive(Debug, Clone)]
pub struct RecoveryCfg {
    /// A rise larger than this above the plateau peak restarts the hold timer.
    pub plateau_epsilon_v: f32,
    /// Time without a rise before a plateau is declared.
    pub plateau_hold_ms: u64,
    /// Minimum low-throttle time before a plateau may be declared.
    pub min_low_ms: u64,
    pub delay_default_ms: f32,
    pub delay_min_ms: f32,
    pub delay_max_ms: f32,
    pub delay_ema: f32,
}

impl Default for RecoveryCfg {
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

/// Sag curve learning.
#[derive(Debug, Clone)]
pub struct SagCfg {
    /// Candidates below this are not learned.
    pub min_learnable_v: f32,
    /// Upper bound of any stored sag value.
    pub max_sag_v: f32,
    /// EMA weight when an episode's candidate raises a bucket.
    pub fast_ema: f32,
    /// EMA weight for the continuous (in-flight) raise path.
    pub slow_ema: f32,
    /// Deficits up to this size are treated as noise.
    pub down_noise_v: f32,
    /// Confirmations needed before a downward correction is applied.
    pub down_confirmations: u8,
    pub down_step: f32,
    pub down_default: f32,
    pub down_min: f32,
    pub down_max: f32,
    /// Largest single downward correction.
    pub down_max_step_v: f32,
    /// Highest throttle whose bucket may serve as the extrapolation reference.
    pub knee_throttle: f32,
    pub gamma: f32,
}

impl Default for SagCfg {
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

/// Open-circuit decay model. Rates are volts per second per cell.
#[derive(Debug, Clone)]
pub struct DecayCfg {
    pub rate_min: f32,
    pub rate_max: f32,
    /// Compiled default at full throttle; bucket defaults scale with throttle.
    pub full_throttle_default: f32,
    /// Applied to learned rates when advancing the live estimate.
    pub playback_slowdown: f32,
    pub learn_ema: f32,
    pub scale_min: f32,
    pub scale_max: f32,
    /// Deltas below this are too small to learn from.
    pub negligible_v: f32,
}

impl Default for DecayCfg {
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

/// Anchor smoothing, margins and absolute voltage limits.
#[derive(Debug, Clone)]
pub struct OutputCfg {
    pub cap_ema: f32,
    pub rest_ema: f32,
    /// Hard ceiling above the anchor.
    pub cap_margin_v: f32,
    /// Ceiling above the anchor while below the ramp end.
    pub idle_margin_v: f32,
    pub min_cell_v: f32,
    pub max_cell_v: f32,
    pub max_cell_v_hv: f32,
}

impl Default for OutputCfg {
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

/// Load/save timing for learned parameters.
#[derive(Debug, Clone)]
pub struct PersistenceCfg {
    pub enabled: bool,
    /// Delay after the first valid sample before the one load attempt.
    pub warmup_ms: u64,
    pub save_interval_ms: u64,
    /// Saves only happen at or below this throttle.
    pub save_throttle: f32,
}

impl Default for PersistenceCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            warmup_ms: 3000,
            save_interval_ms: 30_000,
            save_throttle: 0.05,
        }
    }
}

/// Complete estimator configuration.
#[derive(Debug, Clone)]
pub struct EstimatorCfg {
    pub pack: PackCfg,
    pub chemistry: ChemistryCfg,
    pub rate: RateCfg,
    pub throttle: ThrottleCfg,
    pub recovery: RecoveryCfg,
    pub sag: SagCfg,
    pub decay: DecayCfg,
    pub output: OutputCfg,
    pub persistence: PersistenceCfg,
}

impl EstimatorCfg {
    /// Defaults for every section with the given cell count.
    pub fn with_cells(cells: u8) -> Self {
        Self {
            pack: PackCfg {
                cells,
                voltage_unit: VoltageUnit::Volts,
            },
            chemistry: ChemistryCfg::default(),
            rate: RateCfg::default(),
            throttle: ThrottleCfg::default(),
            recovery: RecoveryCfg::default(),
            sag: SagCfg::default(),
            decay: DecayCfg::default(),
            output: OutputCfg::default(),
            persistence: PersistenceCfg::default(),
        }
    }
}
