//! Chemistry-aware voltage to state-of-charge mapping.

use crate::chemistry::Chemistry;

/// Resting cell voltage breakpoints for standard LiPo, ascending.
/// A query maps to the percent of the first breakpoint at or above it.
const STANDARD_CURVE: [(f32, f32); 21] = [
    (3.00, 0.0),
    (3.45, 5.0),
    (3.68, 10.0),
    (3.74, 15.0),
    (3.77, 20.0),
    (3.79, 25.0),
    (3.80, 30.0),
    (3.82, 35.0),
    (3.84, 40.0),
    (3.85, 45.0),
    (3.87, 50.0),
    (3.91, 55.0),
    (3.95, 60.0),
    (3.98, 65.0),
    (4.02, 70.0),
    (4.08, 75.0),
    (4.11, 80.0),
    (4.15, 85.0),
    (4.18, 90.0),
    (4.19, 95.0),
    (4.20, 100.0),
];

const STANDARD_EMPTY_V: f32 = 3.00;
const STANDARD_FULL_V: f32 = 4.20;
const HV_FULL_V: f32 = 4.35;
/// Share of the high-voltage range covered by the standard curve.
const HV_STANDARD_SHARE: f32 = 0.95;

/// Percent for a standard cell. Stepped, not interpolated.
pub fn standard_percent(cell_v: f32) -> f32 {
    if cell_v.is_nan() || cell_v <= STANDARD_EMPTY_V {
        return 0.0;
    }
    if cell_v >= STANDARD_FULL_V {
        return 100.0;
    }
    STANDARD_CURVE
        .iter()
        .find(|(v, _)| *v >= cell_v)
        .map_or(100.0, |(_, pct)| *pct)
}

/// Percent for a high-voltage cell: the standard curve compressed into 0..95,
/// then linear from 95 at 4.20 V to 100 at 4.35 V.
pub fn high_voltage_percent(cell_v: f32) -> f32 {
    if cell_v.is_nan() {
        return 0.0;
    }
    if cell_v < STANDARD_FULL_V {
        return (standard_percent(cell_v) * HV_STANDARD_SHARE).round();
    }
    if cell_v >= HV_FULL_V {
        return 100.0;
    }
    let frac = (cell_v - STANDARD_FULL_V) / (HV_FULL_V - STANDARD_FULL_V);
    (95.0 + 5.0 * frac).clamp(95.0, 100.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PercentMapper;

impl PercentMapper {
    pub fn percent(&self, chemistry: Chemistry, cell_v: f32) -> f32 {
        match chemistry {
            Chemistry::Standard => standard_percent(cell_v),
            Chemistry::HighVoltage => high_voltage_percent(cell_v),
        }
    }
}
