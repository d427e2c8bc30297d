// src/core/features/processor.rs
//
// Cross-window processors applied once to a whole feature sequence.

use std::fmt;

use super::signal::Feature;
use crate::core::dsp::stats::{mean, stddev};
use crate::error::{ClassifierError, Result};

/// Transforms the complete, ordered feature sequence of one signal.
///
/// May change the number or length of features. Must be pure with respect
/// to `identity()` and input, since results may be cached.
pub trait FeatureProcessor: Send + Sync + fmt::Debug {
    fn apply(&self, features: &[Feature]) -> Result<Vec<Feature>>;

    fn identity(&self) -> String;
}

// Features as a time x dimension matrix; fails on ragged input
fn to_matrix(features: &[Feature], context: &str) -> Result<Vec<Vec<f64>>> {
    let dim = features.first().map(Feature::len).unwrap_or(0);
    features
        .iter()
        .map(|f| {
            if f.len() != dim {
                Err(ClassifierError::mismatch(context, dim, f.len()))
            } else {
                Ok(f.values().to_vec())
            }
        })
        .collect()
}

/// Appends first and second time differences to each feature.
///
/// `weights[0]` scales the original values, `weights[1]` the first
/// difference and `weights[2]` the second; zero-weight orders are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaFeatureProcessor {
    half_window: usize,
    weights: Vec<f64>,
}

impl DeltaFeatureProcessor {
    pub fn new(half_window: usize, weights: Vec<f64>) -> Result<Self> {
        if half_window == 0 {
            return Err(ClassifierError::invalid("delta half window must be at least 1"));
        }
        if weights.is_empty() || weights.len() > 3 {
            return Err(ClassifierError::invalid(format!(
                "delta weights cover orders 0..=2, got {} weights",
                weights.len()
            )));
        }
        if weights.iter().all(|&w| w == 0.0) {
            return Err(ClassifierError::invalid("at least one delta weight must be non-zero"));
        }
        Ok(Self { half_window, weights })
    }

    pub fn half_window(&self) -> usize {
        self.half_window
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Minimum number of features accepted by `apply`
    pub fn min_features(&self) -> usize {
        2 * self.half_window + 1
    }

    // Regression slope over +/- half_window frames, truncated at the edges
    fn delta(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let n = rows.len();
        let dim = rows.first().map(Vec::len).unwrap_or(0);

        (0..n)
            .map(|i| {
                let mut num = vec![0.0; dim];
                let mut den = 0.0;
                for j in 1..=self.half_window {
                    if i < j || i + j >= n {
                        continue;
                    }
                    let jf = j as f64;
                    for (c, acc) in num.iter_mut().enumerate() {
                        *acc += jf * (rows[i + j][c] - rows[i - j][c]);
                    }
                    den += jf * jf;
                }
                if den == 0.0 {
                    vec![0.0; dim]
                } else {
                    num.into_iter().map(|v| v / (2.0 * den)).collect()
                }
            })
            .collect()
    }
}

impl FeatureProcessor for DeltaFeatureProcessor {
    fn apply(&self, features: &[Feature]) -> Result<Vec<Feature>> {
        if features.len() < self.min_features() {
            return Err(ClassifierError::invalid(format!(
                "delta with half window {} needs at least {} features, got {}",
                self.half_window,
                self.min_features(),
                features.len()
            )));
        }

        let rows = to_matrix(features, "delta processor input")?;
        let first = self.delta(&rows);
        let second = if self.weights.len() > 2 && self.weights[2] != 0.0 {
            self.delta(&first)
        } else {
            Vec::new()
        };
        let orders = [&rows, &first, &second];

        Ok(features
            .iter()
            .enumerate()
            .map(|(t, feature)| {
                let mut values = Vec::new();
                for (order, &w) in self.weights.iter().enumerate() {
                    if w != 0.0 {
                        values.extend(orders[order][t].iter().map(|v| v * w));
                    }
                }
                feature.with_values(values)
            })
            .collect())
    }

    fn identity(&self) -> String {
        format!("delta[h={},w={:?}]", self.half_window, self.weights)
    }
}

/// Per-column standardization across the time axis of one feature gram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizingFeatureProcessor {
    zero_mean: bool,
    unit_stddev: bool,
}

impl Default for NormalizingFeatureProcessor {
    fn default() -> Self {
        Self {
            zero_mean: true,
            unit_stddev: true,
        }
    }
}

impl NormalizingFeatureProcessor {
    pub fn new(zero_mean: bool, unit_stddev: bool) -> Self {
        Self { zero_mean, unit_stddev }
    }
}

impl FeatureProcessor for NormalizingFeatureProcessor {
    fn apply(&self, features: &[Feature]) -> Result<Vec<Feature>> {
        let mut rows = to_matrix(features, "normalizing processor input")?;
        let dim = rows.first().map(Vec::len).unwrap_or(0);

        for c in 0..dim {
            let column: Vec<f64> = rows.iter().map(|r| r[c]).collect();
            let m = mean(&column);
            let s = stddev(&column, m);
            for row in rows.iter_mut() {
                if self.zero_mean {
                    row[c] -= m;
                }
                if self.unit_stddev && s > 0.0 {
                    row[c] /= s;
                }
            }
        }

        Ok(features
            .iter()
            .zip(rows)
            .map(|(f, values)| f.with_values(values))
            .collect())
    }

    fn identity(&self) -> String {
        format!("normalize[mean={},stddev={}]", self.zero_mean, self.unit_stddev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<Feature> {
        (0..n)
            .map(|i| Feature::new(vec![i as f64, 2.0 * i as f64], i as f64 * 10.0, (i + 1) as f64 * 10.0))
            .collect()
    }

    #[test]
    fn test_delta_of_ramp() {
        let processor = DeltaFeatureProcessor::new(2, vec![1.0, 1.0]).unwrap();
        let out = processor.apply(&ramp(7)).unwrap();
        assert_eq!(out.len(), 7);
        assert_eq!(out[3].len(), 4);
        // Interior slope of x[t] = t is (1*2 + 2*4) / (2 * 5) = 1
        assert_eq!(&out[3].values()[..2], &[3.0, 6.0]);
        assert!((out[3].values()[2] - 1.0).abs() < 1e-12);
        assert!((out[3].values()[3] - 2.0).abs() < 1e-12);
        assert_eq!(out[3].start_msec(), 30.0);
    }

    #[test]
    fn test_delta_drops_zero_weight_orders() {
        let processor = DeltaFeatureProcessor::new(1, vec![0.0, 2.0, 1.0]).unwrap();
        let out = processor.apply(&ramp(5)).unwrap();
        assert_eq!(out[2].len(), 4);
        // Delta of x[t] = t is 1, doubled by its weight; second difference is 0
        assert!((out[2].values()[0] - 2.0).abs() < 1e-12);
        assert!(out[2].values()[2].abs() < 1e-12);
    }

    #[test]
    fn test_delta_needs_enough_features() {
        let processor = DeltaFeatureProcessor::new(2, vec![1.0, 1.0]).unwrap();
        assert!(matches!(processor.apply(&ramp(4)), Err(ClassifierError::InvalidInput(_))));
        assert!(DeltaFeatureProcessor::new(0, vec![1.0]).is_err());
        assert!(DeltaFeatureProcessor::new(1, vec![0.0, 0.0]).is_err());
    }

    #[test]
    fn test_normalizing_processor() {
        let out = NormalizingFeatureProcessor::default().apply(&ramp(5)).unwrap();
        for c in 0..2 {
            let column: Vec<f64> = out.iter().map(|f| f.values()[c]).collect();
            let m = mean(&column);
            assert!(m.abs() < 1e-12);
            assert!((stddev(&column, m) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ragged_input_rejected() {
        let mut features = ramp(3);
        features.push(Feature::new(vec![1.0], 30.0, 40.0));
        assert!(matches!(
            NormalizingFeatureProcessor::default().apply(&features),
            Err(ClassifierError::DimensionMismatch { .. })
        ));
    }
}
