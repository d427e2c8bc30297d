// tests/spectral_test.rs
//
// Spectral power and mel filter bank behavior on synthetic tones.

mod test_utils;

use audioclassr::core::dsp::SpectrumConfig;
use audioclassr::core::features::MelConfig;
use audioclassr::{MelFilterBank, SpectralPowerComputer, WindowFunction};
use test_utils::{noise, sine};

// ============================================================================
// Spectral power
// ============================================================================

#[test]
fn peak_lands_on_tone_frequency() {
    let computer = SpectralPowerComputer::new(SpectrumConfig::default());
    let samples = sine(1000.0, 44100.0, 0.1);
    let spectrum = computer.compute(&samples, 44100.0).unwrap();

    let peak = spectrum.peak_bin().unwrap();
    let peak_hz = spectrum.frequencies[peak];
    assert!(
        (peak_hz - 1000.0).abs() <= spectrum.frequency_step,
        "peak at {} Hz, step {}",
        peak_hz,
        spectrum.frequency_step
    );
}

#[test]
fn resampled_input_keeps_its_peak() {
    let computer = SpectralPowerComputer::new(SpectrumConfig {
        target_sampling_rate: 16000.0,
        ..Default::default()
    });
    let samples = sine(2000.0, 48000.0, 0.1);
    let spectrum = computer.compute(&samples, 48000.0).unwrap();

    assert!(spectrum.max_frequency() <= 8000.0 + spectrum.frequency_step);
    let peak_hz = spectrum.frequencies[spectrum.peak_bin().unwrap()];
    assert!((peak_hz - 2000.0).abs() <= 2.0 * spectrum.frequency_step);
}

#[test]
fn power_respects_dynamic_range_floor() {
    let config = SpectrumConfig {
        max_peak_to_noise_ratio: 1e6,
        ..Default::default()
    };
    let spectrum = SpectralPowerComputer::new(config)
        .compute(&sine(440.0, 44100.0, 0.05), 44100.0)
        .unwrap();

    let peak = spectrum.power.iter().cloned().fold(0.0, f64::max);
    assert!(spectrum.power.iter().all(|&p| p >= peak / 1e6 * (1.0 - 1e-12)));
    assert!(spectrum.frequencies.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn both_windows_produce_spectra() {
    let samples = noise(2048, 0.5, 7);
    for window in [WindowFunction::Hamming, WindowFunction::Hanning] {
        let config = SpectrumConfig {
            window,
            ..Default::default()
        };
        let spectrum = SpectralPowerComputer::new(config).compute(&samples, 44100.0).unwrap();
        assert!(!spectrum.is_empty());
        assert!(spectrum.power.iter().all(|p| p.is_finite() && *p > 0.0));
    }
}

// ============================================================================
// Mel filter bank
// ============================================================================

#[test]
fn mel_bands_of_1khz_tone() {
    let bank = MelFilterBank::new(MelConfig {
        num_bands: 26,
        min_freq_hz: 0.0,
        max_freq_hz: 8000.0,
        spectrum: SpectrumConfig {
            target_sampling_rate: 16000.0,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();

    let energies = bank.filter(&sine(1000.0, 16000.0, 1.0), 16000.0).unwrap();
    assert_eq!(energies.len(), 26);
    assert!(energies.iter().all(|&e| e > 0.0));

    let centers = bank.band_centers(8000.0);
    let nearest = centers
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1 - 1000.0).abs().total_cmp(&(b.1 - 1000.0).abs()))
        .map(|(i, _)| i)
        .unwrap();
    assert!(energies[nearest] > energies[25]);
    assert!(energies[nearest] > energies[0] || centers[0] > 900.0);
}

#[test]
fn narrow_bands_stay_positive() {
    let bank = MelFilterBank::new(MelConfig {
        num_bands: 200,
        ..Default::default()
    })
    .unwrap();
    let energies = bank.filter(&noise(1764, 0.5, 11), 44100.0).unwrap();
    assert_eq!(energies.len(), 200);
    assert!(energies.iter().all(|&e| e > 0.0 && e.is_finite()));
}
