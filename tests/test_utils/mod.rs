// tests/test_utils/mod.rs
//
// Shared fixtures: synthetic tones, seeded feature clusters and WAV files.

#![allow(dead_code)]

use std::f64::consts::PI;
use std::path::Path;

use audioclassr::{Feature, FeatureGram, LabeledFeatureGram, Signal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SEED: u64 = 1443523423;

pub fn sine(freq_hz: f64, sample_rate: f64, seconds: f64) -> Vec<f64> {
    let n = (sample_rate * seconds).round() as usize;
    (0..n)
        .map(|i| (2.0 * PI * freq_hz * i as f64 / sample_rate).sin())
        .collect()
}

pub fn sine_signal(freq_hz: f64, sample_rate: f64, seconds: f64) -> Signal {
    Signal::new(sine(freq_hz, sample_rate, seconds), sample_rate, 0.0).unwrap()
}

/// Uniform white noise in [-amplitude, amplitude]
pub fn noise(n: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| (rng.gen::<f64>() * 2.0 - 1.0) * amplitude).collect()
}

/// Approximately normal points around `center` (sum of uniforms)
pub fn cluster(center: &[f64], spread: f64, n: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            center
                .iter()
                .map(|c| {
                    let z: f64 = (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0;
                    c + z * spread
                })
                .collect()
        })
        .collect()
}

pub fn gram_of(points: &[Vec<f64>]) -> FeatureGram {
    FeatureGram::new(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| Feature::new(p.clone(), i as f64 * 20.0, i as f64 * 20.0 + 40.0))
            .collect(),
    )
}

pub fn labeled(name: &str, value: &str, points: &[Vec<f64>]) -> LabeledFeatureGram {
    let mut labels = audioclassr::core::features::Labels::new();
    labels.insert(name.to_string(), value.to_string());
    LabeledFeatureGram::new(gram_of(points), labels)
}

/// Write mono 16-bit PCM
pub fn write_wav(path: &Path, samples: &[f64], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} within {} of {}",
        actual,
        tolerance,
        expected
    );
}
