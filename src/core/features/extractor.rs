// src/core/features/extractor.rs
//
// Per-window feature extractors built on the mel filter bank.

use std::f64::consts::PI;
use std::fmt;

use super::mel::{MelConfig, MelFilterBank};
use super::signal::{Feature, Signal};
use crate::core::dsp::stats::max_abs;
use crate::error::Result;

/// Smallest value passed to log10 when log-scaling band energies
const LOG_FLOOR: f64 = 1e-50;

/// Turns one window of samples into one feature vector.
///
/// Implementations must be pure: the same identity and input must always
/// yield the same feature, since results may be served from a cache.
pub trait FeatureExtractor: Send + Sync + fmt::Debug {
    fn extract(&self, window: &Signal) -> Result<Feature>;

    /// Stable description of every parameter that affects the output
    fn identity(&self) -> String;
}

/// Mel band energies, optionally peak-normalized and log-scaled
#[derive(Debug, Clone)]
pub struct MelFilterBankExtractor {
    bank: MelFilterBank,
    use_log: bool,
    normalize: bool,
    max_final_coefficients: usize,
}

impl MelFilterBankExtractor {
    pub fn new(config: MelConfig) -> Result<Self> {
        Ok(Self {
            bank: MelFilterBank::new(config)?,
            use_log: false,
            normalize: false,
            max_final_coefficients: 0,
        })
    }

    pub fn use_log(mut self, use_log: bool) -> Self {
        self.use_log = use_log;
        self
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Truncate or zero-pad output to this length; 0 keeps the band count
    pub fn max_final_coefficients(mut self, count: usize) -> Self {
        self.max_final_coefficients = count;
        self
    }

    pub fn bank(&self) -> &MelFilterBank {
        &self.bank
    }

    fn bands(&self, window: &Signal) -> Result<Vec<f64>> {
        let mut bands = self.bank.filter(window.samples(), window.sample_rate())?;

        if self.normalize {
            let peak = max_abs(&bands);
            if peak > 0.0 {
                bands.iter_mut().for_each(|b| *b /= peak);
            }
        }
        if self.use_log {
            bands.iter_mut().for_each(|b| *b = b.max(LOG_FLOOR).log10());
        }
        if self.max_final_coefficients > 0 {
            bands.resize(self.max_final_coefficients, 0.0);
        }

        Ok(bands)
    }
}

impl FeatureExtractor for MelFilterBankExtractor {
    fn extract(&self, window: &Signal) -> Result<Feature> {
        Ok(Feature::for_window(self.bands(window)?, window))
    }

    fn identity(&self) -> String {
        format!(
            "mel[{},log={},norm={},coefs={}]",
            self.bank.config().identity(),
            self.use_log,
            self.normalize,
            self.max_final_coefficients
        )
    }
}

/// Log-scaled mel band energies
#[derive(Debug, Clone)]
pub struct LogMelExtractor {
    inner: MelFilterBankExtractor,
}

impl LogMelExtractor {
    pub fn new(config: MelConfig) -> Result<Self> {
        Ok(Self {
            inner: MelFilterBankExtractor::new(config)?.use_log(true),
        })
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.inner = self.inner.normalize(normalize);
        self
    }
}

impl FeatureExtractor for LogMelExtractor {
    fn extract(&self, window: &Signal) -> Result<Feature> {
        self.inner.extract(window)
    }

    fn identity(&self) -> String {
        format!("logmel:{}", self.inner.identity())
    }
}

/// Mel-frequency cepstral coefficients: DCT-II of log mel energies
#[derive(Debug, Clone)]
pub struct MfccExtractor {
    log_mel: MelFilterBankExtractor,
    num_coefficients: usize,
}

impl MfccExtractor {
    /// `num_coefficients` of 0 keeps one coefficient per band
    pub fn new(config: MelConfig, num_coefficients: usize) -> Result<Self> {
        Ok(Self {
            log_mel: MelFilterBankExtractor::new(config)?.use_log(true),
            num_coefficients,
        })
    }
}

impl FeatureExtractor for MfccExtractor {
    fn extract(&self, window: &Signal) -> Result<Feature> {
        let log_bands = self.log_mel.bands(window)?;
        let mut coefficients = dct_ii(&log_bands);
        if self.num_coefficients > 0 {
            coefficients.truncate(self.num_coefficients);
        }
        Ok(Feature::for_window(coefficients, window))
    }

    fn identity(&self) -> String {
        format!("mfcc[{},n={}]", self.log_mel.identity(), self.num_coefficients)
    }
}

/// Orthonormal type-II discrete cosine transform
pub fn dct_ii(input: &[f64]) -> Vec<f64> {
    let n = input.len();
    if n == 0 {
        return Vec::new();
    }
    let dc_scale = (1.0 / n as f64).sqrt();
    let ac_scale = (2.0 / n as f64).sqrt();

    (0..n)
        .map(|k| {
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| x * (PI * (i as f64 + 0.5) * k as f64 / n as f64).cos())
                .sum();
            sum * if k == 0 { dc_scale } else { ac_scale }
        })
        .collect()
}
