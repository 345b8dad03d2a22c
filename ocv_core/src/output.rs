//! Output composition and the host-facing frame.

use crate::config::{OutputCfg, ThrottleCfg};

/// Everything output composition reads, gathered after the tick's state updates.
#[derive(Debug, Clone, Copy)]
pub struct Composition {
    pub raw_cell_v: f32,
    pub throttle: f32,
    pub ratio: f32,
    /// Learned sag for the current bucket (0 when undefined).
    pub sag_v: f32,
    pub anchor: Option<f32>,
    /// Live estimate of the active episode, if any.
    pub episode_ocv: Option<f32>,
    /// Absolute ceiling for the active chemistry.
    pub max_cell_v: f32,
}

/// Compensated per-cell voltage.
///
/// Bounds are applied with `min`/`max` rather than `clamp` because the raw
/// reading can sit above the absolute maximum.
pub fn compose(c: &Composition, throttle: &ThrottleCfg, out: &OutputCfg) -> f32 {
    let mut v = match (c.anchor, c.episode_ocv) {
        (Some(anchor), _) if c.throttle <= throttle.no_comp => anchor,
        (_, Some(ocv)) if c.throttle >= throttle.capture => ocv.min(c.max_cell_v).max(c.raw_cell_v),
        _ => {
            let mut v = (c.raw_cell_v + c.sag_v * c.ratio)
                .max(out.min_cell_v)
                .min(c.max_cell_v);
            if let Some(anchor) = c.anchor
                && c.throttle < throttle.ramp_end
            {
                v = v.min(anchor + out.idle_margin_v);
            }
            v
        }
    };
    if let Some(anchor) = c.anchor {
        v = v.min(anchor + out.cap_margin_v);
    }
    v.max(c.raw_cell_v)
}

/// Exact per-tick outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub percent: f32,
    pub cell_v: f32,
    pub raw_cell_v: f32,
    /// Compensation ratio, 0..=100.
    pub ratio_pct: f32,
}

/// Outputs quantized to the host channel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Tenths of a percent.
    pub percent_x10: u16,
    /// Tenths of a volt.
    pub cell_dv: u16,
    pub raw_cell_dv: u16,
    pub ratio_pct: u8,
}

#[inline]
fn tenths(x: f32) -> u16 {
    (x * 10.0).round().clamp(0.0, f32::from(u16::MAX)) as u16
}

impl Estimate {
    pub fn frame(&self) -> Frame {
        Frame {
            percent_x10: tenths(self.percent.clamp(0.0, 100.0)),
            cell_dv: tenths(self.cell_v),
            raw_cell_dv: tenths(self.raw_cell_v),
            ratio_pct: self.ratio_pct.round().clamp(0.0, 100.0) as u8,
        }
    }
}
