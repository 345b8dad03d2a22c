//! One load episode: per-bucket minima, per-bucket loaded time, and the live
//! open-circuit estimate that decays while the pack is working.

use crate::bucket::BUCKET_COUNT;

#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    minima: [Option<f32>; BUCKET_COUNT],
    loaded_ms: [u64; BUCKET_COUNT],
    ocv_start: f32,
    ocv_est: f32,
}

impl Episode {
    /// Start an episode holding `ocv_start` as the open-circuit reference.
    pub fn open(ocv_start: f32) -> Self {
        Self {
            minima: [None; BUCKET_COUNT],
            loaded_ms: [0; BUCKET_COUNT],
            ocv_start,
            ocv_est: ocv_start,
        }
    }

    /// Open-circuit reference at episode start.
    pub fn ocv_start(&self) -> f32 {
        self.ocv_start
    }

    /// Live open-circuit estimate.
    pub fn ocv_estimate(&self) -> f32 {
        self.ocv_est
    }

    pub fn minima(&self) -> &[Option<f32>; BUCKET_COUNT] {
        &self.minima
    }

    pub fn loaded_ms(&self) -> &[u64; BUCKET_COUNT] {
        &self.loaded_ms
    }

    pub fn total_loaded_ms(&self) -> u64 {
        self.loaded_ms.iter().sum()
    }

    /// Lower the bucket's minimum if `cell_v` is below it.
    pub fn record_min(&mut self, index: usize, cell_v: f32) {
        if let Some(slot) = self.minima.get_mut(index) {
            *slot = Some(slot.map_or(cell_v, |m| m.min(cell_v)));
        }
    }

    /// Loaded sample: minimum plus time spent in the bucket.
    pub fn capture(&mut self, index: usize, cell_v: f32, dt_ms: u64) {
        self.record_min(index, cell_v);
        if let Some(t) = self.loaded_ms.get_mut(index) {
            *t = t.saturating_add(dt_ms);
        }
    }

    /// Decay the live estimate by `drop`, hold it at or above the sag-model
    /// `floor`, then cap it at `ceiling` when one exists.
    pub fn advance_ocv(&mut self, drop: f32, floor: f32, ceiling: Option<f32>) -> f32 {
        let mut est = self.ocv_est - drop.max(0.0);
        if floor > est {
            est = floor;
        }
        if let Some(c) = ceiling {
            est = est.min(c);
        }
        self.ocv_est = est;
        est
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_tracks_minimum_and_time() {
        let mut e = Episode::open(4.0);
        e.capture(15, 3.6, 100);
        e.capture(15, 3.5, 100);
        e.capture(15, 3.55, 100);
        e.capture(8, 3.7, 50);
        assert_eq!(e.minima()[15], Some(3.5));
        assert_eq!(e.minima()[8], Some(3.7));
        assert_eq!(e.minima()[0], None);
        assert_eq!(e.loaded_ms()[15], 300);
        assert_eq!(e.total_loaded_ms(), 350);
    }

    #[test]
    fn floor_beats_decay_and_ceiling_beats_floor() {
        let mut e = Episode::open(4.0);
        assert!((e.advance_ocv(0.1, 3.5, None) - 3.9).abs() < 1e-6);
        assert_eq!(e.advance_ocv(0.5, 3.8, None), 3.8);
        assert_eq!(e.advance_ocv(0.0, 4.5, Some(4.02)), 4.02);
    }
}
