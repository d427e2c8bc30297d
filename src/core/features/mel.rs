// src/core/features/mel.rs
//
// Mel-scale triangular filter bank over the power spectrum.

use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::cache::FeatureCache;
use crate::core::dsp::{PowerSpectrum, SpectralPowerComputer, SpectrumConfig};
use crate::error::{ClassifierError, Result};

pub const DEFAULT_NUM_BANDS: usize = 40;
pub const DEFAULT_MIN_FREQ_HZ: f64 = 5.0;
pub const DEFAULT_MAX_FREQ_HZ: f64 = 20000.0;
/// Band counts above this engage adaptive zero-padding
pub const DEFAULT_ADAPTIVE_BAND_THRESHOLD: usize = 128;
pub const MAX_PADDING_MULTIPLIER: usize = 8;

pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CenterKey {
    num_bands: usize,
    min_bits: u64,
    max_bits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PaddingKey {
    sample_count: usize,
    rate_bits: u64,
    target_bits: u64,
    num_bands: usize,
}

static CENTER_FREQUENCIES: Lazy<FeatureCache<CenterKey, Arc<Vec<f64>>>> = Lazy::new(FeatureCache::new);
static PADDING_MULTIPLIERS: Lazy<FeatureCache<PaddingKey, usize>> = Lazy::new(FeatureCache::new);

/// `num_bands + 2` frequencies evenly spaced in mel between `min_hz` and
/// `max_hz`, clamped into that range. Results are cached.
pub fn center_frequencies(num_bands: usize, min_hz: f64, max_hz: f64) -> Arc<Vec<f64>> {
    let key = CenterKey {
        num_bands,
        min_bits: min_hz.to_bits(),
        max_bits: max_hz.to_bits(),
    };
    if let Some(centers) = CENTER_FREQUENCIES.get(&key) {
        return centers;
    }

    let min_mel = hz_to_mel(min_hz);
    let max_mel = hz_to_mel(max_hz);
    let step = (max_mel - min_mel) / (num_bands + 1) as f64;
    let centers: Vec<f64> = (0..num_bands + 2)
        .map(|i| mel_to_hz(min_mel + i as f64 * step).clamp(min_hz, max_hz.max(min_hz)))
        .collect();

    let centers = Arc::new(centers);
    CENTER_FREQUENCIES.insert(key, Arc::clone(&centers));
    centers
}

/// Options for [`MelFilterBank`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelConfig {
    pub spectrum: SpectrumConfig,
    pub num_bands: usize,
    pub min_freq_hz: f64,
    pub max_freq_hz: f64,
    pub adaptive_band_threshold: usize,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            spectrum: SpectrumConfig::default(),
            num_bands: DEFAULT_NUM_BANDS,
            min_freq_hz: DEFAULT_MIN_FREQ_HZ,
            max_freq_hz: DEFAULT_MAX_FREQ_HZ,
            adaptive_band_threshold: DEFAULT_ADAPTIVE_BAND_THRESHOLD,
        }
    }
}

impl MelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_bands == 0 {
            return Err(ClassifierError::invalid("number of mel bands must be positive"));
        }
        if !(self.min_freq_hz >= 0.0) || !(self.max_freq_hz >= 0.0) {
            return Err(ClassifierError::invalid(format!(
                "mel frequency range must be non-negative, got {}..{}",
                self.min_freq_hz, self.max_freq_hz
            )));
        }
        if self.min_freq_hz >= self.max_freq_hz {
            return Err(ClassifierError::invalid(format!(
                "minimum mel frequency {} must be below maximum {}",
                self.min_freq_hz, self.max_freq_hz
            )));
        }
        Ok(())
    }

    pub fn identity(&self) -> String {
        let s = &self.spectrum;
        format!(
            "bands={},min={},max={},target={},window={},pad={},ptn={},adaptive={}",
            self.num_bands,
            self.min_freq_hz,
            self.max_freq_hz,
            s.effective_target_rate(),
            s.window.name(),
            s.pad_to_power_of_two,
            s.max_peak_to_noise_ratio,
            self.adaptive_band_threshold
        )
    }
}

/// Reduces a sample window to per-band energies on the mel scale
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    config: MelConfig,
    spectrum: SpectralPowerComputer,
}

impl MelFilterBank {
    pub fn new(config: MelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            spectrum: SpectralPowerComputer::new(config.spectrum),
        })
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    pub fn num_bands(&self) -> usize {
        self.config.num_bands
    }

    /// Band energies for one window of samples
    pub fn filter(&self, samples: &[f64], sample_rate: f64) -> Result<Vec<f64>> {
        let num_bands = self.config.num_bands;
        if num_bands <= self.config.adaptive_band_threshold {
            let spectrum = self.spectrum.compute(samples, sample_rate)?;
            return Ok(self.filter_spectrum(&spectrum));
        }

        let key = PaddingKey {
            sample_count: samples.len(),
            rate_bits: sample_rate.to_bits(),
            target_bits: self.config.spectrum.effective_target_rate().to_bits(),
            num_bands,
        };
        if let Some(multiplier) = PADDING_MULTIPLIERS.get(&key) {
            let spectrum = self.spectrum.compute_with_padding(samples, sample_rate, multiplier)?;
            return Ok(self.filter_spectrum(&spectrum));
        }

        let mut multiplier = 1;
        let bands = loop {
            let spectrum = self.spectrum.compute_with_padding(samples, sample_rate, multiplier)?;
            let bands = self.filter_spectrum(&spectrum);
            if !bands.iter().any(|&b| b == 0.0) || multiplier >= MAX_PADDING_MULTIPLIER {
                break bands;
            }
            multiplier *= 2;
        };

        debug!(
            "resolved padding multiplier {} for {} bands over {} samples at {} Hz",
            multiplier,
            num_bands,
            samples.len(),
            sample_rate
        );
        PADDING_MULTIPLIERS.insert(key, multiplier);
        Ok(bands)
    }

    /// Apply the triangular filters to an already computed spectrum
    pub fn filter_spectrum(&self, spectrum: &PowerSpectrum) -> Vec<f64> {
        let num_bands = self.config.num_bands;
        let min_hz = self.config.min_freq_hz.max(0.0);
        let max_hz = self.config.max_freq_hz.min(spectrum.max_frequency());

        let mut bands = vec![0.0; num_bands];
        if spectrum.is_empty() || max_hz <= min_hz || spectrum.frequency_step <= 0.0 {
            return bands;
        }

        let centers = center_frequencies(num_bands, min_hz, max_hz);
        let last = spectrum.len() - 1;
        let step = spectrum.frequency_step;

        for (b, band) in bands.iter_mut().enumerate() {
            let start = centers[b];
            let center = centers[b + 1];
            let stop = centers[b + 2];

            let lo = ((start / step).floor() as usize).min(last);
            let hi = ((stop / step).ceil() as usize).min(last);

            let mut energy = 0.0;
            for i in lo..=hi {
                let f = spectrum.frequencies[i];
                if f < start || f > stop {
                    continue;
                }
                // Each side is normalized by its squared width
                let weight = if f <= center && center > start {
                    (f - start) / ((center - start) * (center - start))
                } else if f >= center && stop > center {
                    (stop - f) / ((stop - center) * (stop - center))
                } else {
                    0.0
                };
                energy += spectrum.power[i] * weight;
            }
            *band = energy;
        }

        bands
    }

    /// Peak frequency of each band for the given spectrum range
    pub fn band_centers(&self, nyquist_hz: f64) -> Vec<f64> {
        let min_hz = self.config.min_freq_hz.max(0.0);
        let max_hz = self.config.max_freq_hz.min(nyquist_hz);
        let centers = center_frequencies(self.config.num_bands, min_hz, max_hz);
        centers[1..=self.config.num_bands].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_mel_round_trip() {
        for hz in [0.0, 100.0, 1000.0, 8000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
        assert!((hz_to_mel(700.0) - 2595.0 * 2f64.log10()).abs() < 1e-9);
    }

    #[test]
    fn test_centers_monotonic_and_bounded() {
        let centers = center_frequencies(26, 20.0, 8000.0);
        assert_eq!(centers.len(), 28);
        assert!((centers[0] - 20.0).abs() < 1e-9);
        assert!((centers[27] - 8000.0).abs() < 1e-6);
        for w in centers.windows(2) {
            assert!(w[1] >= w[0]);
        }
        assert!(centers.iter().all(|&c| (20.0..=8000.0).contains(&c)));
    }

    #[test]
    fn test_centers_are_cached() {
        let a = center_frequencies(17, 0.0, 4000.0);
        let b = center_frequencies(17, 0.0, 4000.0);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_invalid_configs() {
        let bad = [
            MelConfig { num_bands: 0, ..Default::default() },
            MelConfig { min_freq_hz: -1.0, ..Default::default() },
            MelConfig { min_freq_hz: 5000.0, max_freq_hz: 5000.0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(MelFilterBank::new(config), Err(ClassifierError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_band_count_and_positivity() {
        let bank = MelFilterBank::new(MelConfig {
            num_bands: 20,
            min_freq_hz: 0.0,
            max_freq_hz: 4000.0,
            spectrum: SpectrumConfig {
                target_sampling_rate: 8000.0,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        let samples: Vec<f64> = (0..800).map(|i| (2.0 * PI * 440.0 * i as f64 / 8000.0).sin()).collect();
        let bands = bank.filter(&samples, 8000.0).unwrap();
        assert_eq!(bands.len(), 20);
        assert!(bands.iter().all(|&b| b > 0.0));
    }

    #[test]
    fn test_adaptive_padding_fills_narrow_bands() {
        // 200 bands over 64 samples leave many bands without a bin at multiplier 1
        let config = MelConfig {
            num_bands: 200,
            min_freq_hz: 0.0,
            max_freq_hz: 4000.0,
            spectrum: SpectrumConfig {
                target_sampling_rate: 8000.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let samples: Vec<f64> = (0..64).map(|i| (2.0 * PI * 1000.0 * i as f64 / 8000.0).sin()).collect();

        let bank = MelFilterBank::new(config).unwrap();
        let first = bank.filter(&samples, 8000.0).unwrap();
        let second = bank.filter(&samples, 8000.0).unwrap();
        assert_eq!(first, second);

        let key = PaddingKey {
            sample_count: 64,
            rate_bits: 8000f64.to_bits(),
            target_bits: 8000f64.to_bits(),
            num_bands: 200,
        };
        let multiplier = PADDING_MULTIPLIERS.get(&key).unwrap();
        assert!(multiplier > 1 && multiplier <= MAX_PADDING_MULTIPLIER);

        // Below the threshold the same bank configuration never pads
        let plain = MelFilterBank::new(MelConfig {
            adaptive_band_threshold: 1000,
            ..config
        })
        .unwrap();
        let unpadded = plain.filter(&samples, 8000.0).unwrap();
        assert!(unpadded.iter().any(|&b| b == 0.0));
    }
}
