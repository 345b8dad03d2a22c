//! Composite recovery/episode state.
//!
//! Recovery tracking ({not low, low}) and episode capture ({inactive, active})
//! are one state value. An episode ends only through a confirmed recovery,
//! which is why `Recovering` carries both.

use crate::episode::Episode;
use crate::recovery::LowWindow;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Phase {
    /// Throttle above rest, no episode.
    #[default]
    Idle,
    /// Low throttle, no episode.
    Resting(LowWindow),
    /// Episode active, throttle above rest.
    Loaded(Episode),
    /// Episode active, low throttle; waiting for a confirmed plateau.
    Recovering(Episode, LowWindow),
}

/// Payload-free view of `Phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Resting,
    Loaded,
    Recovering,
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Resting => "resting",
            Self::Loaded => "loaded",
            Self::Recovering => "recovering",
        };
        f.write_str(s)
    }
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Self::Idle => PhaseKind::Idle,
            Self::Resting(_) => PhaseKind::Resting,
            Self::Loaded(_) => PhaseKind::Loaded,
            Self::Recovering(..) => PhaseKind::Recovering,
        }
    }

    pub fn episode(&self) -> Option<&Episode> {
        match self {
            Self::Loaded(e) | Self::Recovering(e, _) => Some(e),
            Self::Idle | Self::Resting(_) => None,
        }
    }

    pub fn episode_mut(&mut self) -> Option<&mut Episode> {
        match self {
            Self::Loaded(e) | Self::Recovering(e, _) => Some(e),
            Self::Idle | Self::Resting(_) => None,
        }
    }

    pub fn window(&self) -> Option<&LowWindow> {
        match self {
            Self::Resting(w) | Self::Recovering(_, w) => Some(w),
            Self::Idle | Self::Loaded(_) => None,
        }
    }

    /// Low-throttle entry/exit. Returns the next phase; window updates and
    /// finalization are the caller's business.
    pub fn on_throttle(self, low: bool, now_ms: u64, cell_v: f32) -> Self {
        match (self, low) {
            (Self::Idle, true) => Self::Resting(LowWindow::open(now_ms, cell_v)),
            (Self::Loaded(e), true) => Self::Recovering(e, LowWindow::open(now_ms, cell_v)),
            (Self::Resting(_), false) => Self::Idle,
            (Self::Recovering(e, _), false) => Self::Loaded(e),
            (phase, _) => phase,
        }
    }
}
