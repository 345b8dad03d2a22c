//! Throttle bucketing shared by the learned curves.
//!
//! The throttle range [0, 1] is split into `BUCKET_COUNT` equal partitions.
//! Bucket `i` covers `[i/N, (i+1)/N)`; full throttle lands in the last bucket.

/// Number of throttle buckets. Persisted records must carry the same count.
pub const BUCKET_COUNT: usize = 16;

/// Bucket index for a normalized throttle value.
#[inline]
pub fn bucket_index(throttle: f32) -> usize {
    if !throttle.is_finite() || throttle <= 0.0 {
        return 0;
    }
    let idx = (throttle * BUCKET_COUNT as f32) as usize;
    idx.min(BUCKET_COUNT - 1)
}

/// Representative throttle of a bucket (its midpoint).
#[inline]
pub fn bucket_throttle(index: usize) -> f32 {
    (index.min(BUCKET_COUNT - 1) as f32 + 0.5) / BUCKET_COUNT as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_map_to_first_and_last() {
        assert_eq!(bucket_index(0.0), 0);
        assert_eq!(bucket_index(-0.3), 0);
        assert_eq!(bucket_index(f32::NAN), 0);
        assert_eq!(bucket_index(1.0), BUCKET_COUNT - 1);
        assert_eq!(bucket_index(0.999), BUCKET_COUNT - 1);
    }

    #[test]
    fn partitions_are_uniform() {
        assert_eq!(bucket_index(0.0624), 0);
        assert_eq!(bucket_index(0.0625), 1);
        assert_eq!(bucket_index(0.5), 8);
        assert_eq!(bucket_throttle(0), 0.5 / 16.0);
        assert_eq!(bucket_throttle(15), 15.5 / 16.0);
    }
}
