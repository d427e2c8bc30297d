// src/core/features/normalizer.rs
//
// Z-score normalization fitted on a training corpus. Statistics are kept
// per position in the feature-gram array (one gram per descriptor) and per
// feature column.

use serde::{Deserialize, Serialize};

use super::signal::FeatureGram;
use crate::core::dsp::OnlineStats;
use crate::error::{ClassifierError, Result};

/// Per-column mean and standard deviation for one gram position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: Vec<f64>,
    pub stddev: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureNormalizer {
    positions: Vec<ColumnStats>,
}

impl FeatureNormalizer {
    /// Accumulate statistics over every feature of every gram array in `corpus`.
    ///
    /// All arrays must have the same number of grams, and all features at a
    /// given position must have the same length.
    pub fn fit<'a, I>(corpus: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [FeatureGram]>,
    {
        let mut accumulators: Option<Vec<Vec<OnlineStats>>> = None;

        for grams in corpus {
            let acc = accumulators.get_or_insert_with(|| {
                grams
                    .iter()
                    .map(|g| vec![OnlineStats::new(); g.feature_len().unwrap_or(0)])
                    .collect()
            });
            if grams.len() != acc.len() {
                return Err(ClassifierError::mismatch("normalizer corpus gram count", acc.len(), grams.len()));
            }

            for (pos, (gram, columns)) in grams.iter().zip(acc.iter_mut()).enumerate() {
                if columns.is_empty() {
                    columns.resize(gram.feature_len().unwrap_or(0), OnlineStats::new());
                }
                for feature in gram {
                    if feature.len() != columns.len() {
                        return Err(ClassifierError::mismatch(
                            format!("normalizer corpus position {}", pos),
                            columns.len(),
                            feature.len(),
                        ));
                    }
                    for (stats, &v) in columns.iter_mut().zip(feature.values()) {
                        stats.push(v);
                    }
                }
            }
        }

        let accumulators =
            accumulators.ok_or_else(|| ClassifierError::invalid("cannot fit a normalizer on an empty corpus"))?;

        let positions = accumulators
            .into_iter()
            .map(|columns| ColumnStats {
                mean: columns.iter().map(OnlineStats::mean).collect(),
                stddev: columns.iter().map(OnlineStats::stddev).collect(),
            })
            .collect();

        Ok(Self { positions })
    }

    pub fn positions(&self) -> &[ColumnStats] {
        &self.positions
    }

    /// New grams with every value replaced by (value - mean) / stddev.
    ///
    /// Columns with zero spread are only centered.
    pub fn normalize(&self, grams: &[FeatureGram]) -> Result<Vec<FeatureGram>> {
        if grams.len() != self.positions.len() {
            return Err(ClassifierError::mismatch(
                "normalizer gram count",
                self.positions.len(),
                grams.len(),
            ));
        }

        grams
            .iter()
            .zip(&self.positions)
            .enumerate()
            .map(|(pos, (gram, stats))| {
                let features = gram
                    .iter()
                    .map(|feature| {
                        if feature.len() != stats.mean.len() {
                            return Err(ClassifierError::mismatch(
                                format!("normalizer position {}", pos),
                                stats.mean.len(),
                                feature.len(),
                            ));
                        }
                        let values = feature
                            .values()
                            .iter()
                            .zip(stats.mean.iter().zip(&stats.stddev))
                            .map(|(&v, (&m, &s))| if s > 0.0 { (v - m) / s } else { v - m })
                            .collect();
                        Ok(feature.with_values(values))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(FeatureGram::new(features))
            })
            .collect()
    }
}
