//! Analysis window functions

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window applied to a frame before the power spectrum is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    Hamming,
    Hanning,
}

impl Default for WindowFunction {
    fn default() -> Self {
        Self::Hamming
    }
}

impl WindowFunction {
    /// Generate window coefficients
    pub fn generate(&self, size: usize) -> Vec<f64> {
        match self {
            WindowFunction::Hamming => Self::hamming(size),
            WindowFunction::Hanning => Self::hanning(size),
        }
    }

    /// Multiply `samples` by the window in place
    pub fn apply(&self, samples: &mut [f64]) {
        let coefficients = self.generate(samples.len());
        for (s, w) in samples.iter_mut().zip(coefficients) {
            *s *= w;
        }
    }

    fn hamming(size: usize) -> Vec<f64> {
        if size < 2 {
            return vec![1.0; size];
        }
        (0..size)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (size - 1) as f64).cos())
            .collect()
    }

    // Centered form: peak at the middle sample, symmetric raised cosine
    fn hanning(size: usize) -> Vec<f64> {
        let half = (size as f64 / 2.0 + 0.5) as i64;
        (0..size)
            .map(|i| {
                let x = i as i64 - half;
                (1.0 + (2.0 * PI * x as f64 / size as f64).cos()) / 2.0
            })
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::Hamming => "hamming",
            WindowFunction::Hanning => "hanning",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "hamming" => Some(Self::Hamming),
            "hanning" | "hann" => Some(Self::Hanning),
            _ => None,
        }
    }
}
