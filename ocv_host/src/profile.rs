//! Throttle schedules for the simulator.

use std::str::FromStr;

use crate::error::HostError;

/// A throttle level held for a duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub duration_ms: u64,
    /// 0..=100 percent.
    pub throttle_pct: f32,
}

/// Repeating sequence of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleProfile {
    segments: Vec<Segment>,
    period_ms: u64,
}

impl ThrottleProfile {
    pub fn new(segments: Vec<Segment>) -> Result<Self, HostError> {
        if segments.is_empty() {
            return Err(HostError::Profile("no segments".into()));
        }
        if let Some(s) = segments
            .iter()
            .find(|s| !(0.0..=100.0).contains(&s.throttle_pct))
        {
            return Err(HostError::Profile(format!(
                "throttle {} outside 0..=100",
                s.throttle_pct
            )));
        }
        let period_ms = segments.iter().map(|s| s.duration_ms).sum();
        if period_ms == 0 {
            return Err(HostError::Profile("total duration is zero".into()));
        }
        Ok(Self { segments, period_ms })
    }

    /// Idle, hover, punch-out, idle: one short flight that exercises every phase.
    pub fn default_flight() -> Self {
        let seg = |duration_ms, throttle_pct| Segment {
            duration_ms,
            throttle_pct,
        };
        Self {
            segments: vec![
                seg(6_000, 0.0),
                seg(8_000, 45.0),
                seg(3_000, 100.0),
                seg(4_000, 60.0),
                seg(9_000, 0.0),
            ],
            period_ms: 30_000,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Throttle percent at `t_ms`, looping over the profile.
    pub fn throttle_at(&self, t_ms: u64) -> f32 {
        let mut t = t_ms % self.period_ms;
        for s in &self.segments {
            if t < s.duration_ms {
                return s.throttle_pct;
            }
            t -= s.duration_ms;
        }
        self.segments.last().map_or(0.0, |s| s.throttle_pct)
    }
}

/// `"pct:ms,pct:ms,..."`, e.g. `"0:5000,100:3000,0:8000"`.
impl FromStr for ThrottleProfile {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|part| {
                let (pct, ms) = part
                    .split_once(':')
                    .ok_or_else(|| HostError::Profile(format!("expected pct:ms, got {part:?}")))?;
                let throttle_pct = pct
                    .trim()
                    .parse::<f32>()
                    .map_err(|e| HostError::Profile(format!("{pct:?}: {e}")))?;
                let duration_ms = ms
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| HostError::Profile(format!("{ms:?}: {e}")))?;
                Ok(Segment {
                    duration_ms,
                    throttle_pct,
                })
            })
            .collect::<Result<Vec<_>, HostError>>()?;
        Self::new(segments)
    }
}
