//! Throttle normalization and the compensation ramp.

use crate::config::ThrottleCfg;

/// Host value ranges the throttle channel is known to report in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThrottleRange {
    /// 0..=100 percent.
    #[default]
    Percent,
    /// -1024..=1024 stick/channel units.
    Bipolar,
}

/// Maps raw host throttle values to [0, 1].
///
/// Percent is assumed until a value outside 0..=100 is seen; that latches the
/// bipolar range for the rest of the session.
#[derive(Debug, Clone, Default)]
pub struct ThrottleNormalizer {
    range: ThrottleRange,
}

impl ThrottleNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> ThrottleRange {
        self.range
    }

    /// Normalize one raw value. Non-finite input maps to 0 (idle).
    pub fn normalize(&mut self, raw: f32) -> f32 {
        if !raw.is_finite() {
            return 0.0;
        }
        if self.range == ThrottleRange::Percent && !(0.0..=100.0).contains(&raw) {
            tracing::debug!(raw, "throttle outside percent range; switching to bipolar");
            self.range = ThrottleRange::Bipolar;
        }
        let t = match self.range {
            ThrottleRange::Percent => raw / 100.0,
            ThrottleRange::Bipolar => (raw + 1024.0) / 2048.0,
        };
        t.clamp(0.0, 1.0)
    }
}

/// Fraction of learned sag applied at this throttle: 0 at/below `no_comp`,
/// 1 at/above `ramp_end`, linear in between.
#[inline]
pub fn ramp_ratio(throttle: f32, cfg: &ThrottleCfg) -> f32 {
    if throttle <= cfg.no_comp {
        0.0
    } else if throttle >= cfg.ramp_end {
        1.0
    } else {
        ((throttle - cfg.no_comp) / (cfg.ramp_end - cfg.no_comp)).clamp(0.0, 1.0)
    }
}
