//! Small numeric helpers shared by the learning components.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: f32 = 1_000.0;

/// One exponential-moving-average step: `old + weight * (sample - old)`.
#[inline]
pub fn ema(old: f32, sample: f32, weight: f32) -> f32 {
    old + weight * (sample - old)
}

/// Clamp that also maps NaN to the lower bound, so a bad sample can never
/// leak into learned state.
#[inline]
pub fn clamp_finite(x: f32, lo: f32, hi: f32) -> f32 {
    if x.is_nan() { lo } else { x.clamp(lo, hi) }
}

/// Convert a millisecond span to seconds.
#[inline]
pub fn ms_to_s(ms: u64) -> f32 {
    ms as f32 / MILLIS_PER_SEC
}
