//! Adaptive processing cadence.
//!
//! The upstream voltage sensor updates slower than the host calls us. Processing
//! every call would feed repeated values into the learning paths, so ticks are
//! admitted at the sensor's own cadence: the interval between observed value
//! changes, clamped to `[min_update_ms, max_update_ms]`.

use crate::config::RateCfg;

#[derive(Debug, Clone)]
pub struct RateGovernor {
    cfg: RateCfg,
    last_value_bits: Option<u32>,
    last_change_ms: Option<u64>,
    period_ms: u64,
    last_processed_ms: Option<u64>,
}

impl RateGovernor {
    pub fn new(cfg: RateCfg) -> Self {
        let period_ms = if cfg.adaptive {
            cfg.min_update_ms
        } else {
            cfg.fixed_period_ms
        };
        Self {
            cfg,
            last_value_bits: None,
            last_change_ms: None,
            period_ms,
            last_processed_ms: None,
        }
    }

    /// Effective period currently enforced between processed ticks.
    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn last_processed_ms(&self) -> Option<u64> {
        self.last_processed_ms
    }

    /// Record the raw sensor value seen at `now_ms`. A changed value re-derives
    /// the period from the interval since the previous change.
    pub fn observe(&mut self, raw: f32, now_ms: u64) {
        let bits = raw.to_bits();
        if self.last_value_bits == Some(bits) {
            return;
        }
        if self.cfg.adaptive
            && let Some(prev) = self.last_change_ms
        {
            let interval = now_ms.saturating_sub(prev);
            self.period_ms = interval.clamp(self.cfg.min_update_ms, self.cfg.max_update_ms);
            tracing::trace!(interval, period_ms = self.period_ms, "sensor cadence update");
        }
        self.last_value_bits = Some(bits);
        self.last_change_ms = Some(now_ms);
    }

    /// Whether a tick at `now_ms` may be processed. Admitting stamps the tick.
    pub fn admit(&mut self, now_ms: u64) -> bool {
        match self.last_processed_ms {
            Some(last) if now_ms.saturating_sub(last) < self.period_ms => false,
            _ => {
                self.last_processed_ms = Some(now_ms);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_always_admitted() {
        let mut g = RateGovernor::new(RateCfg::default());
        g.observe(12.0, 5);
        assert!(g.admit(5));
        assert!(!g.admit(50));
        assert!(g.admit(105));
    }

    #[test]
    fn period_follows_value_changes_with_clamp() {
        let mut g = RateGovernor::new(RateCfg::default());
        g.observe(12.0, 0);
        g.observe(12.1, 300);
        assert_eq!(g.period_ms(), 300);
        // unchanged value keeps the prior period
        g.observe(12.1, 5_000);
        assert_eq!(g.period_ms(), 300);
        g.observe(12.2, 5_010);
        assert_eq!(g.period_ms(), 100);
        g.observe(12.3, 9_000);
        assert_eq!(g.period_ms(), 1000);
    }

    #[test]
    fn fixed_mode_ignores_cadence() {
        let cfg = RateCfg {
            adaptive: false,
            ..RateCfg::default()
        };
        let mut g = RateGovernor::new(cfg);
        g.observe(12.0, 0);
        g.observe(12.1, 900);
        assert_eq!(g.period_ms(), 200);
    }
}
