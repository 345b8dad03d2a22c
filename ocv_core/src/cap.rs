//! Confirmed rest voltage ("anchor") and the stabilized rest estimate.

use crate::util::{clamp_finite, ema};

/// Both values move only when a recovery is confirmed; the anchor is also
/// seeded once from the first valid sample so the output has a ceiling from
/// the start.
#[derive(Debug, Clone)]
pub struct CapStabilizer {
    cap_ema: f32,
    rest_ema: f32,
    anchor: Option<f32>,
    rest: Option<f32>,
}

impl CapStabilizer {
    pub fn new(cap_ema: f32, rest_ema: f32) -> Self {
        Self {
            cap_ema,
            rest_ema,
            anchor: None,
            rest: None,
        }
    }

    /// Confirmed rest anchor, per cell.
    pub fn anchor(&self) -> Option<f32> {
        self.anchor
    }

    /// Stabilized rest estimate; `None` until the first confirmed recovery.
    pub fn rest_estimate(&self) -> Option<f32> {
        self.rest
    }

    /// First valid sample. No-op once an anchor exists.
    pub fn seed(&mut self, cell_v: f32) {
        if self.anchor.is_none() && cell_v.is_finite() {
            self.anchor = Some(cell_v);
        }
    }

    /// Move both values toward the peak of the window just confirmed.
    pub fn confirm(&mut self, peak_v: f32, min_v: f32, max_v: f32) {
        if !peak_v.is_finite() {
            return;
        }
        let next = |prev: Option<f32>, w: f32| {
            let v = prev.map_or(peak_v, |p| ema(p, peak_v, w));
            clamp_finite(v, min_v, max_v)
        };
        self.rest = Some(next(self.rest, self.rest_ema));
        self.anchor = Some(next(self.anchor, self.cap_ema));
    }
}
