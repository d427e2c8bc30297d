//! Windowed power spectrum with resampling to a common target rate
//!
//! Signals recorded at different rates are brought onto a shared frequency
//! axis before features are computed, so that spectra from heterogeneous
//! recordings can be compared bin for bin.

use log::debug;
use realfft::RealFftPlanner;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use super::filters::{decimate, interpolate};
use super::windows::WindowFunction;
use crate::error::{ClassifierError, Result};

pub const DEFAULT_TARGET_SAMPLING_RATE: f64 = 44100.0;
pub const DEFAULT_MAX_PEAK_TO_NOISE_RATIO: f64 = 1e20;

/// Options for [`SpectralPowerComputer`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Rate every signal is brought to before transforming; non-positive means the default
    pub target_sampling_rate: f64,
    pub window: WindowFunction,
    pub pad_to_power_of_two: bool,
    /// Bins quieter than peak / ratio are raised to that floor
    pub max_peak_to_noise_ratio: f64,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            target_sampling_rate: DEFAULT_TARGET_SAMPLING_RATE,
            window: WindowFunction::Hamming,
            pad_to_power_of_two: true,
            max_peak_to_noise_ratio: DEFAULT_MAX_PEAK_TO_NOISE_RATIO,
        }
    }
}

impl SpectrumConfig {
    pub fn effective_target_rate(&self) -> f64 {
        if self.target_sampling_rate > 0.0 {
            self.target_sampling_rate
        } else {
            DEFAULT_TARGET_SAMPLING_RATE
        }
    }

    fn effective_peak_to_noise(&self) -> f64 {
        if self.max_peak_to_noise_ratio > 0.0 {
            self.max_peak_to_noise_ratio
        } else {
            DEFAULT_MAX_PEAK_TO_NOISE_RATIO
        }
    }
}

/// One-sided power spectrum
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
    pub frequency_step: f64,
}

impl PowerSpectrum {
    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// Highest frequency on the axis
    pub fn max_frequency(&self) -> f64 {
        self.frequencies.last().copied().unwrap_or(0.0)
    }

    /// Index of the strongest bin
    pub fn peak_bin(&self) -> Option<usize> {
        self.power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

/// Computes power spectra of raw sample windows
#[derive(Debug, Clone, Default)]
pub struct SpectralPowerComputer {
    config: SpectrumConfig,
}

impl SpectralPowerComputer {
    pub fn new(config: SpectrumConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    pub fn compute(&self, samples: &[f64], sample_rate: f64) -> Result<PowerSpectrum> {
        self.compute_with_padding(samples, sample_rate, 1)
    }

    /// Compute the spectrum, stretching the transform length by
    /// `padding_multiplier` for finer frequency resolution.
    pub fn compute_with_padding(
        &self,
        samples: &[f64],
        sample_rate: f64,
        padding_multiplier: usize,
    ) -> Result<PowerSpectrum> {
        if samples.is_empty() {
            return Err(ClassifierError::invalid("cannot compute spectrum of an empty sample window"));
        }
        if !(sample_rate > 0.0) {
            return Err(ClassifierError::invalid(format!(
                "sampling rate must be positive, got {}",
                sample_rate
            )));
        }

        let target = self.config.effective_target_rate();
        let pad = self.config.pad_to_power_of_two;

        let (mut data, effective_rate) = if sample_rate == target {
            (samples.to_vec(), sample_rate)
        } else if sample_rate < target {
            if pad {
                debug!("interpolating {} Hz up to {} Hz", sample_rate, target);
                (interpolate(samples, sample_rate, target), target)
            } else {
                debug!("transforming at native {} Hz, rescaling axis to {} Hz", sample_rate, target);
                (samples.to_vec(), sample_rate)
            }
        } else {
            debug!("decimating {} Hz down to {} Hz", sample_rate, target);
            (decimate(samples, sample_rate, target), target)
        };

        self.config.window.apply(&mut data);

        let mut n = data.len();
        if pad {
            n = n.next_power_of_two();
        }
        n *= padding_multiplier.max(1);
        data.resize(n, 0.0);

        let squared = if pad {
            power_of_two_transform(data)
        } else {
            general_transform(data)?
        };

        let useful = squared.len();
        let frequency_step = effective_rate / n as f64;
        let total = if effective_rate < target {
            (target * n as f64 / (2.0 * effective_rate)) as usize
        } else {
            useful
        };

        let scaling = 1.0 / (n as f64 * n as f64);
        let mut power = vec![0.0; total];
        for (p, s) in power.iter_mut().zip(squared.iter()) {
            *p = s * scaling;
        }

        let peak = power.iter().copied().fold(0.0f64, f64::max);
        let floor = peak / self.config.effective_peak_to_noise();
        for p in power.iter_mut() {
            if *p < floor {
                *p = floor;
            }
        }

        let frequencies = (0..total).map(|i| i as f64 * frequency_step).collect();

        Ok(PowerSpectrum {
            frequencies,
            power,
            frequency_step,
        })
    }
}

// |X[k]|^2 for k < n/2 using a full complex transform; n is a power of two
fn power_of_two_transform(data: Vec<f64>) -> Vec<f64> {
    let n = data.len();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);

    let mut buffer: Vec<Complex<f64>> = data.into_iter().map(|s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buffer);

    buffer[..(n / 2).max(1)].iter().map(|c| c.norm_sqr()).collect()
}

// |X[k]|^2 for k < n/2 using a real-input transform of arbitrary length
fn general_transform(mut data: Vec<f64>) -> Result<Vec<f64>> {
    let n = data.len();
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);

    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut data, &mut spectrum)
        .map_err(|e| ClassifierError::invalid(format!("real transform failed: {}", e)))?;

    Ok(spectrum[..(n / 2).max(1)].iter().map(|c| c.norm_sqr()).collect())
}
