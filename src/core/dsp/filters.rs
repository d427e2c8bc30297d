//! Resampling utilities used ahead of the power spectrum

/// Linearly interpolate `samples` recorded at `orig_rate` so they appear
/// to have been recorded at `new_rate`.
///
/// The output length is `round(new_rate / orig_rate * len)`; the first and
/// last output samples coincide with the first and last input samples.
pub fn interpolate(samples: &[f64], orig_rate: f64, new_rate: f64) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let new_len = (new_rate / orig_rate * samples.len() as f64 + 0.5) as usize;
    if samples.len() == 1 || new_len < 2 {
        return vec![samples[0]; new_len];
    }

    let last = samples.len() - 1;
    let ratio = last as f64 / (new_len - 1) as f64;

    (0..new_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let lo = (pos.floor() as usize).min(last);
            let hi = (pos.ceil() as usize).min(last);
            let frac = pos - lo as f64;
            samples[lo] + (samples[hi] - samples[lo]) * frac
        })
        .collect()
}

/// Block-average `samples` down to `new_len` values.
///
/// Each output value is the mean of a contiguous run of roughly
/// `len / new_len` inputs; NaN inputs are skipped and an all-NaN run
/// yields NaN.
pub fn block_downsample(samples: &[f64], new_len: usize) -> Vec<f64> {
    if new_len == 0 {
        return Vec::new();
    }
    if new_len >= samples.len() {
        return samples.to_vec();
    }

    let win = samples.len() as f64 / new_len as f64;
    let mut start = 0usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let end = ((win * (i + 1) as f64) as usize).min(samples.len());
        let (sum, count) = samples[start..end]
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0f64, 0usize), |(s, c), v| (s + v, c + 1));
        output.push(if count == 0 { f64::NAN } else { sum / count as f64 });
        start = end;
    }

    output
}

/// Decimate a signal recorded at `rate` down to `target_rate` by block averaging.
///
/// A non-empty input always keeps at least one sample.
pub fn decimate(samples: &[f64], rate: f64, target_rate: f64) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }
    let duration_secs = samples.len() as f64 / rate;
    let new_len = ((target_rate * duration_secs + 0.5) as usize).max(1);
    block_downsample(samples, new_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_doubles_length() {
        let samples = vec![0.0, 1.0, 2.0, 3.0];
        let up = interpolate(&samples, 8000.0, 16000.0);
        assert_eq!(up.len(), 8);
        assert_eq!(up[0], 0.0);
        assert!((up[7] - 3.0).abs() < 1e-12);
        // Linear ramp stays linear
        for w in up.windows(2) {
            assert!((w[1] - w[0] - 3.0 / 7.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_interpolate_single_sample() {
        assert_eq!(interpolate(&[0.25], 100.0, 300.0), vec![0.25; 3]);
    }

    #[test]
    fn test_decimate_keeps_one_sample_of_short_input() {
        assert_eq!(decimate(&[0.5], 48000.0, 16000.0), vec![0.5]);
        assert_eq!(decimate(&[1.0, 3.0], 48000.0, 16000.0), vec![2.0]);
        assert!(decimate(&[], 48000.0, 16000.0).is_empty());
    }

    #[test]
    fn test_block_downsample_averages() {
        let samples = vec![1.0, 3.0, 5.0, 7.0, 9.0, 11.0];
        assert_eq!(block_downsample(&samples, 3), vec![2.0, 6.0, 10.0]);
    }

    #[test]
    fn test_block_downsample_skips_nan() {
        let samples = vec![1.0, f64::NAN, 4.0, 6.0];
        assert_eq!(block_downsample(&samples, 2), vec![1.0, 5.0]);
    }

    #[test]
    fn test_decimate_length() {
        let samples = vec![0.5; 48000];
        let out = decimate(&samples, 48000.0, 16000.0);
        assert_eq!(out.len(), 16000);
        assert!(out.iter().all(|v| (v - 0.5).abs() < 1e-12));
    }
}
