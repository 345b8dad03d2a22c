//! Low-throttle recovery window and plateau detection.
//!
//! A window opens when throttle drops to the rest threshold. It tracks the
//! highest voltage seen (the rest reference) and a plateau detector: the
//! plateau peak only moves, and the hold timer only restarts, on rises larger
//! than `plateau_epsilon_v`. A plateau latches once the hold time has passed
//! without such a rise and the window is older than `min_low_ms`. On a flat
//! signal that means the first tick past `min_low_ms`.

use crate::config::RecoveryCfg;

#[derive(Debug, Clone, PartialEq)]
pub struct LowWindow {
    started_ms: u64,
    elapsed_ms: u64,
    long_peak: f32,
    plateau_peak: f32,
    last_increase_ms: u64,
    plateau_at_ms: Option<u64>,
    confirmed: bool,
}

impl LowWindow {
    pub fn open(now_ms: u64, cell_v: f32) -> Self {
        Self {
            started_ms: now_ms,
            elapsed_ms: 0,
            long_peak: cell_v,
            plateau_peak: cell_v,
            last_increase_ms: now_ms,
            plateau_at_ms: None,
            confirmed: false,
        }
    }

    pub fn update(&mut self, now_ms: u64, cell_v: f32, cfg: &RecoveryCfg) {
        self.elapsed_ms = now_ms.saturating_sub(self.started_ms);
        if cell_v > self.long_peak {
            self.long_peak = cell_v;
        }
        if cell_v > self.plateau_peak + cfg.plateau_epsilon_v {
            self.plateau_peak = cell_v;
            self.last_increase_ms = now_ms;
        }
        if self.plateau_at_ms.is_none()
            && now_ms.saturating_sub(self.last_increase_ms) >= cfg.plateau_hold_ms
            && self.elapsed_ms > cfg.min_low_ms
        {
            self.plateau_at_ms = Some(now_ms);
            tracing::debug!(
                elapsed_ms = self.elapsed_ms,
                peak_v = self.long_peak,
                "recovery plateau"
            );
        }
    }

    /// Plateau seen, window older than the learned delay, not yet finalized.
    pub fn ready(&self, delay_ms: f32) -> bool {
        !self.confirmed && self.plateau_at_ms.is_some() && self.elapsed_ms as f32 > delay_ms
    }

    pub fn mark_confirmed(&mut self) {
        self.confirmed = true;
    }

    pub fn confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn plateau(&self) -> bool {
        self.plateau_at_ms.is_some()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Highest voltage seen since the window opened.
    pub fn long_peak(&self) -> f32 {
        self.long_peak
    }

    /// Window age at which the plateau latched.
    pub fn plateau_ms(&self) -> Option<u64> {
        self.plateau_at_ms
            .map(|at| at.saturating_sub(self.started_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_signal_latches_on_first_tick_past_minimum() {
        let cfg = RecoveryCfg::default();
        let mut w = LowWindow::open(1_000, 3.7);
        let mut t = 1_000;
        while t - 1_000 <= cfg.min_low_ms {
            t += 100;
            w.update(t, 3.7, &cfg);
            if t - 1_000 <= cfg.min_low_ms {
                assert!(!w.plateau(), "latched early at +{}", t - 1_000);
            }
        }
        assert!(w.plateau());
        assert_eq!(w.plateau_ms(), Some(cfg.min_low_ms + 100));
    }

    #[test]
    fn rising_voltage_defers_plateau() {
        let cfg = RecoveryCfg::default();
        let mut w = LowWindow::open(0, 3.5);
        let mut v = 3.5;
        for t in (100..=4_000).step_by(100) {
            v += 0.01;
            w.update(t, v, &cfg);
        }
        assert!(!w.plateau());
        for t in (4_100..=5_500).step_by(100) {
            w.update(t, v, &cfg);
        }
        assert!(w.plateau());
        assert_eq!(w.plateau_ms(), Some(5_500));
        assert!((w.long_peak() - v).abs() < 1e-6);
    }

    #[test]
    fn sub_epsilon_creep_accumulates() {
        let cfg = RecoveryCfg::default();
        let mut w = LowWindow::open(0, 3.700);
        w.update(100, 3.703, &cfg);
        w.update(200, 3.706, &cfg);
        // 3.706 is more than epsilon above the 3.700 plateau peak
        assert_eq!(w.last_increase_ms, 200);
    }
}
