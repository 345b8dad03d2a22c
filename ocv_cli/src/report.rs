//! Per-tick estimate lines and the end-of-run summary, as text or JSON lines.

use ocv_core::{Chemistry, Estimate, PersistenceState, PhaseKind, TickStatus};
use serde_json::json;

use crate::session::HostEstimator;

pub fn chemistry_name(c: Chemistry) -> &'static str {
    match c {
        Chemistry::Standard => "standard",
        Chemistry::HighVoltage => "high_voltage",
    }
}

pub fn persistence_name(s: PersistenceState) -> &'static str {
    match s {
        PersistenceState::Warming => "warming",
        PersistenceState::Ready => "ready",
        PersistenceState::Disabled => "disabled",
    }
}

pub fn estimate_line(t_ms: u64, e: &Estimate, phase: PhaseKind, json: bool) -> String {
    if json {
        let f = e.frame();
        json!({
            "t_ms": t_ms,
            "percent": e.percent,
            "cell_v": e.cell_v,
            "raw_cell_v": e.raw_cell_v,
            "ratio_pct": e.ratio_pct,
            "phase": phase.to_string(),
            "frame": {
                "percent_x10": f.percent_x10,
                "cell_dv": f.cell_dv,
                "raw_cell_dv": f.raw_cell_dv,
                "ratio_pct": f.ratio_pct,
            },
        })
        .to_string()
    } else {
        format!(
            "t={t_ms:>8}ms  {:>5.1}%  cell {:.3}V (raw {:.3}V)  comp {:>3.0}%  {phase}",
            e.percent, e.cell_v, e.raw_cell_v, e.ratio_pct
        )
    }
}

/// Tick counters for one run.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tally {
    pub ticks: u64,
    pub estimated: u64,
    pub skipped: u64,
    pub last_t_ms: u64,
}

impl Tally {
    pub fn record(&mut self, t_ms: u64, status: &TickStatus) {
        self.ticks += 1;
        self.last_t_ms = t_ms;
        match status {
            TickStatus::Estimated(_) => self.estimated += 1,
            TickStatus::Skipped(_) => self.skipped += 1,
        }
    }

    /// Whether the `n`th estimate of a run should be printed, given `every`.
    pub fn due(&self, every: usize) -> bool {
        let every = every.max(1) as u64;
        self.estimated > 0 && (self.estimated - 1) % every == 0
    }
}

pub fn summary(est: &HostEstimator, tally: &Tally, json: bool) -> String {
    let last = est.last_estimate().copied();
    let learned = est
        .sag_curve()
        .sag_values()
        .iter()
        .filter(|s| s.is_some())
        .count();
    if json {
        json!({
            "summary": {
                "ticks": tally.ticks,
                "estimated": tally.estimated,
                "skipped": tally.skipped,
                "end_t_ms": tally.last_t_ms,
                "percent": last.map(|e| e.percent),
                "cell_v": last.map(|e| e.cell_v),
                "anchor_v": est.anchor(),
                "recovery_delay_ms": est.recovery_delay_ms(),
                "chemistry": chemistry_name(est.chemistry()),
                "learned_buckets": learned,
                "persistence": persistence_name(est.persistence_state()),
                "saves": est.persistence().saves(),
            }
        })
        .to_string()
    } else {
        let mut out = String::new();
        out.push_str("--- OCV Summary ---\n");
        out.push_str(&format!(
            "Ticks: {} ({} estimated, {} skipped)\n",
            tally.ticks, tally.estimated, tally.skipped
        ));
        match last {
            Some(e) => out.push_str(&format!(
                "Final: {:.1}% at {:.3}V/cell\n",
                e.percent, e.cell_v
            )),
            None => out.push_str("Final: no estimate\n"),
        }
        match est.anchor() {
            Some(a) => out.push_str(&format!("Anchor: {a:.3}V\n")),
            None => out.push_str("Anchor: none\n"),
        }
        out.push_str(&format!(
            "Recovery delay: {:.0}ms\n",
            est.recovery_delay_ms()
        ));
        out.push_str(&format!("Chemistry: {}\n", chemistry_name(est.chemistry())));
        out.push_str(&format!("Learned sag buckets: {learned}\n"));
        out.push_str(&format!(
            "Persistence: {} ({} saves)\n",
            persistence_name(est.persistence_state()),
            est.persistence().saves()
        ));
        out.push_str("-------------------");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocv_core::SkipReason;

    fn est() -> Estimate {
        Estimate {
            percent: 72.46,
            cell_v: 3.912,
            raw_cell_v: 3.701,
            ratio_pct: 100.0,
        }
    }

    #[test]
    fn json_line_carries_exact_and_quantized_values() {
        let line = estimate_line(1_200, &est(), PhaseKind::Loaded, true);
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["t_ms"], 1_200);
        assert_eq!(v["phase"], "loaded");
        assert_eq!(v["frame"]["percent_x10"], 725);
        assert_eq!(v["frame"]["cell_dv"], 39);
        assert_eq!(v["frame"]["ratio_pct"], 100);
    }

    #[test]
    fn text_line_is_single_line() {
        let line = estimate_line(0, &est(), PhaseKind::Idle, false);
        assert!(line.contains("72.5%"));
        assert!(line.contains("idle"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn tally_prints_first_then_every_nth() {
        let mut t = Tally::default();
        let hit = TickStatus::Estimated(est());
        let mut printed = Vec::new();
        for i in 0..7 {
            t.record(i * 100, &hit);
            if t.due(3) {
                printed.push(t.estimated);
            }
        }
        t.record(800, &TickStatus::Skipped(SkipReason::RateLimited));
        assert_eq!(printed, vec![1, 4, 7]);
        assert_eq!(t.skipped, 1);
        assert_eq!(t.ticks, 8);
    }
}
