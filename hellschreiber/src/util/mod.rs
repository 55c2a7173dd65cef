use std::time::Duration;

#[inline]
pub fn db_to_linear(decibels: f32) -> f32 {
    // https://docs.rs/rodio/latest/src/rodio/math.rs.html#39-43
    // same as `10f32.powf(decibels / 20.0)`, with a maximum error of 2.48e-7.
    (decibels * 0.05 * std::f32::consts::LOG2_10).exp2()
}

/// Number of whole samples that fit into `duration` at `sample_rate`.
#[inline]
pub fn duration_to_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)) as usize
}

#[inline]
pub fn samples_to_duration(num_samples: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(num_samples as f64 / f64::from(sample_rate))
}

#[inline]
pub fn millis_to_samples(millis: f64, sample_rate: u32) -> usize {
    (f64::from(sample_rate) * millis / 1000.0) as usize
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn zero_decibels_is_unity() {
        assert_relative_eq!(db_to_linear(0.0), 1.0);
    }

    #[test]
    fn decibels_match_power_of_ten() {
        for db in [-60.0f32, -20.0, -6.0, 0.5, 6.0] {
            assert_relative_eq!(
                db_to_linear(db),
                10f32.powf(db / 20.0),
                max_relative = 1e-5
            );
        }
    }

    #[test]
    fn samples_truncate() {
        assert_eq!(millis_to_samples(4.045, 48_000), 194);
        assert_eq!(millis_to_samples(1.0, 48_000), 48);
        assert_eq!(
            duration_to_samples(Duration::from_millis(200), 48_000),
            9_600
        );
        assert_eq!(samples_to_duration(48_000, 48_000), Duration::from_secs(1));
    }
}
