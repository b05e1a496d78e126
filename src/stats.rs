//! Descriptive statistics over timing samples

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Count, extremes, central tendency and spread of a sample set.
///
/// Empty input yields all zeros; `std_dev` is the Bessel-corrected sample
/// standard deviation and is `0.0` for fewer than two samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    /// Number of samples.
    pub count: usize,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Sum of samples.
    pub sum: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Middle value (mean of the two middle values for even counts).
    pub median: f64,
    /// Sample standard deviation (n - 1 divisor).
    pub std_dev: f64,
}

impl AggregateStatistics {
    /// Compute statistics over `samples`.
    ///
    /// ```rust
    /// use perf_checkpoint::stats::AggregateStatistics;
    ///
    /// let stats = AggregateStatistics::from_samples(&[1.0, 2.0, 3.0, 4.0]);
    /// assert_eq!(stats.count, 4);
    /// assert!((stats.median - 2.5).abs() < 1e-12);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let count = samples.len();
        let sum: f64 = samples.iter().sum();
        let mean = sum / count as f64;

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let std_dev = if count < 2 {
            0.0
        } else {
            let variance =
                samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        };

        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            sum,
            mean,
            median,
            std_dev,
        }
    }

    /// True when computed over no samples.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Order two means, treating NaN as equal.
pub(crate) fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        let stats = AggregateStatistics::from_samples(&[]);
        assert_eq!(stats, AggregateStatistics::default());
        assert!(stats.is_empty());
    }

    #[test]
    fn test_single_sample() {
        let stats = AggregateStatistics::from_samples(&[1.25]);
        assert_eq!(stats.count, 1);
        assert!((stats.min - 1.25).abs() < f64::EPSILON);
        assert!((stats.max - 1.25).abs() < f64::EPSILON);
        assert!((stats.median - 1.25).abs() < f64::EPSILON);
        assert!(stats.std_dev.abs() < f64::EPSILON);
    }

    #[test]
    fn test_known_values() {
        // 2, 4, 4, 4, 5, 5, 7, 9: mean 5, sample variance 32/7
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = AggregateStatistics::from_samples(&samples);
        assert_eq!(stats.count, 8);
        assert!((stats.sum - 40.0).abs() < 1e-12);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.median - 4.5).abs() < 1e-12);
        assert!((stats.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!((stats.min - 2.0).abs() < f64::EPSILON);
        assert!((stats.max - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_median_odd_unsorted() {
        let stats = AggregateStatistics::from_samples(&[3.0, 1.0, 2.0]);
        assert!((stats.median - 2.0).abs() < f64::EPSILON);
    }
}
