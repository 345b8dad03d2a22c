//! Cell chemistry latch (standard LiPo vs. high-voltage LiHV).

use crate::config::{ChemistryCfg, ChemistryMode};

/// Chemistry in effect for percent mapping and voltage limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chemistry {
    Standard,
    HighVoltage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    ForcedStandard,
    ForcedHighVoltage,
    /// Counting consecutive low-throttle samples at or above the detection voltage.
    AutoUnlatched { run: u16 },
    /// Latched for the rest of the session; never reverts.
    AutoLatchedHighVoltage,
}

#[derive(Debug, Clone)]
pub struct ChemistryClassifier {
    cfg: ChemistryCfg,
    state: ClassifierState,
}

impl ChemistryClassifier {
    pub fn new(cfg: ChemistryCfg) -> Self {
        let state = match cfg.mode {
            ChemistryMode::Standard => ClassifierState::ForcedStandard,
            ChemistryMode::HighVoltage => ClassifierState::ForcedHighVoltage,
            ChemistryMode::Auto => ClassifierState::AutoUnlatched { run: 0 },
        };
        Self { cfg, state }
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    pub fn mode(&self) -> ChemistryMode {
        self.cfg.mode
    }

    pub fn chemistry(&self) -> Chemistry {
        match self.state {
            ClassifierState::ForcedHighVoltage | ClassifierState::AutoLatchedHighVoltage => {
                Chemistry::HighVoltage
            }
            ClassifierState::ForcedStandard | ClassifierState::AutoUnlatched { .. } => {
                Chemistry::Standard
            }
        }
    }

    /// Feed one processed sample. Returns true on the tick the latch closes.
    ///
    /// Only samples at or below the rest threshold count; a low-throttle sample
    /// under the detection voltage resets the run.
    pub fn observe(&mut self, cell_v: f32, throttle: f32, rest_threshold: f32) -> bool {
        let ClassifierState::AutoUnlatched { run } = self.state else {
            return false;
        };
        if throttle > rest_threshold {
            return false;
        }
        if cell_v >= self.cfg.detect_cell_v {
            let run = run.saturating_add(1);
            if run >= self.cfg.detect_count {
                self.state = ClassifierState::AutoLatchedHighVoltage;
                tracing::info!(cell_v, run, "high-voltage chemistry latched");
                return true;
            }
            self.state = ClassifierState::AutoUnlatched { run };
        } else {
            if run > 0 {
                tracing::debug!(cell_v, run, "high-voltage evidence run reset");
            }
            self.state = ClassifierState::AutoUnlatched { run: 0 };
        }
        false
    }

    /// Latch high-voltage from persisted evidence. Only meaningful in auto mode.
    pub fn restore_latched(&mut self) {
        if matches!(self.state, ClassifierState::AutoUnlatched { .. }) {
            self.state = ClassifierState::AutoLatchedHighVoltage;
        }
    }
}
