//! `From` implementations bridging `ocv_config` types to `ocv_core` types.

use crate::config::{
    ChemistryCfg, ChemistryMode, DecayCfg, EstimatorCfg, OutputCfg, PackCfg, PersistenceCfg,
    RateCfg, RecoveryCfg, SagCfg, ThrottleCfg, VoltageUnit,
};

// ── Pack ─────────────────────────────────────────────────────────────────────

impl From<&ocv_config::VoltageUnit> for VoltageUnit {
    fn from(u: &ocv_config::VoltageUnit) -> Self {
        match u {
            ocv_config::VoltageUnit::Volts => Self::Volts,
            ocv_config::VoltageUnit::Centivolts => Self::Centivolts,
            ocv_config::VoltageUnit::Millivolts => Self::Millivolts,
        }
    }
}

impl From<&ocv_config::Pack> for PackCfg {
    fn from(c: &ocv_config::Pack) -> Self {
        Self {
            cells: c.cells,
            voltage_unit: (&c.voltage_unit).into(),
        }
    }
}

// ── Chemistry ────────────────────────────────────────────────────────────────

impl From<&ocv_config::Chemistry> for ChemistryCfg {
    fn from(c: &ocv_config::Chemistry) -> Self {
        Self {
            mode: match c.mode {
                ocv_config::ChemistryMode::Auto => ChemistryMode::Auto,
                ocv_config::ChemistryMode::Standard => ChemistryMode::Standard,
                ocv_config::ChemistryMode::HighVoltage => ChemistryMode::HighVoltage,
            },
            detect_cell_v: c.detect_cell_v,
            detect_count: c.detect_count,
        }
    }
}

// ── Rate / throttle ──────────────────────────────────────────────────────────

impl From<&ocv_config::Rate> for RateCfg {
    fn from(c: &ocv_config::Rate) -> Self {
        Self {
            adaptive: c.adaptive,
            min_update_ms: c.min_update_ms,
            max_update_ms: c.max_update_ms,
            fixed_period_ms: c.fixed_period_ms,
        }
    }
}

impl From<&ocv_config::Throttle> for ThrottleCfg {
    fn from(c: &ocv_config::Throttle) -> Self {
        Self {
            rest: c.rest,
            capture: c.capture,
            no_comp: c.no_comp,
            ramp_end: c.ramp_end,
        }
    }
}

// ── Learning ─────────────────────────────────────────────────────────────────

impl From<&ocv_config::Recovery> for RecoveryCfg {
    fn from(c: &ocv_config::Recovery) -> Self {
        Self {
            plateau_epsilon_v: c.plateau_epsilon_v,
            plateau_hold_ms: c.plateau_hold_ms,
            min_low_ms: c.min_low_ms,
            delay_default_ms: c.delay_default_ms,
            delay_min_ms: c.delay_min_ms,
            delay_max_ms: c.delay_max_ms,
            delay_ema: c.delay_ema,
        }
    }
}

impl From<&ocv_config::Sag> for SagCfg {
    fn from(c: &ocv_config::Sag) -> Self {
        Self {
            min_learnable_v: c.min_learnable_v,
            max_sag_v: c.max_sag_v,
            fast_ema: c.fast_ema,
            slow_ema: c.slow_ema,
            down_noise_v: c.down_noise_v,
            down_confirmations: c.down_confirmations,
            down_step: c.down_step,
            down_default: c.down_default,
            down_min: c.down_min,
            down_max: c.down_max,
            down_max_step_v: c.down_max_step_v,
            knee_throttle: c.knee_throttle,
            gamma: c.gamma,
        }
    }
}

impl From<&ocv_config::Decay> for DecayCfg {
    fn from(c: &ocv_config::Decay) -> Self {
        Self {
            rate_min: c.rate_min,
            rate_max: c.rate_max,
            full_throttle_default: c.full_throttle_default,
            playback_slowdown: c.playback_slowdown,
            learn_ema: c.learn_ema,
            scale_min: c.scale_min,
            scale_max: c.scale_max,
            negligible_v: c.negligible_v,
        }
    }
}

// ── Output / persistence ─────────────────────────────────────────────────────

impl From<&ocv_config::Output> for OutputCfg {
    fn from(c: &ocv_config::Output) -> Self {
        Self {
            cap_ema: c.cap_ema,
            rest_ema: c.rest_ema,
            cap_margin_v: c.cap_margin_v,
            idle_margin_v: c.idle_margin_v,
            min_cell_v: c.min_cell_v,
            max_cell_v: c.max_cell_v,
            max_cell_v_hv: c.max_cell_v_hv,
        }
    }
}

impl From<&ocv_config::Persistence> for PersistenceCfg {
    fn from(c: &ocv_config::Persistence) -> Self {
        Self {
            enabled: c.enabled,
            warmup_ms: c.warmup_ms,
            save_interval_ms: c.save_interval_ms,
            save_throttle: c.save_throttle,
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&ocv_config::Config> for EstimatorCfg {
    fn from(c: &ocv_config::Config) -> Self {
        Self {
            pack: (&c.pack).into(),
            chemistry: (&c.chemistry).into(),
            rate: (&c.rate).into(),
            throttle: (&c.throttle).into(),
            recovery: (&c.recovery).into(),
            sag: (&c.sag).into(),
            decay: (&c.decay).into(),
            output: (&c.output).into(),
            persistence: (&c.persistence).into(),
        }
    }
}
