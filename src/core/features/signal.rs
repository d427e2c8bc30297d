// src/core/features/signal.rs
//
// Sampled signals and the feature vectors extracted from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{ClassifierError, Result};

static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(1);

/// MD5 content digest of a signal's samples and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u128);

/// A window of mono samples recorded at a fixed rate
#[derive(Debug, Clone)]
pub struct Signal {
    id: u64,
    samples: Arc<[f64]>,
    sample_rate: f64,
    start_msec: f64,
}

impl Signal {
    pub fn new(samples: Vec<f64>, sample_rate: f64, start_msec: f64) -> Result<Self> {
        if samples.is_empty() {
            return Err(ClassifierError::invalid("signal must contain at least one sample"));
        }
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(ClassifierError::invalid(format!(
                "sampling rate must be positive and finite, got {}",
                sample_rate
            )));
        }
        Ok(Self {
            id: NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed),
            samples: samples.into(),
            sample_rate,
            start_msec,
        })
    }

    /// Process-unique, monotonically increasing identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; construction rejects empty signals
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn start_msec(&self) -> f64 {
        self.start_msec
    }

    pub fn duration_msec(&self) -> f64 {
        1000.0 * self.samples.len() as f64 / self.sample_rate
    }

    pub fn end_msec(&self) -> f64 {
        self.start_msec + self.duration_msec()
    }

    /// Copy `len` samples starting at sample `offset` into a new signal
    pub fn sub_signal(&self, offset: usize, len: usize) -> Result<Signal> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.samples.len())
            .ok_or_else(|| {
                ClassifierError::invalid(format!(
                    "sub-window [{}, {}+{}) exceeds signal of {} samples",
                    offset,
                    offset,
                    len,
                    self.samples.len()
                ))
            })?;
        let start_msec = self.start_msec + 1000.0 * offset as f64 / self.sample_rate;
        Signal::new(self.samples[offset..end].to_vec(), self.sample_rate, start_msec)
    }

    /// Digest over sample bits, rate and start time
    pub fn fingerprint(&self) -> Fingerprint {
        let mut ctx = md5::Context::new();
        for s in self.samples.iter() {
            ctx.consume(s.to_le_bytes());
        }
        ctx.consume(self.sample_rate.to_le_bytes());
        ctx.consume(self.start_msec.to_le_bytes());
        Fingerprint(u128::from_le_bytes(ctx.compute().0))
    }
}

/// One feature vector covering [start_msec, end_msec)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    values: Vec<f64>,
    start_msec: f64,
    end_msec: f64,
}

impl Feature {
    pub fn new(values: Vec<f64>, start_msec: f64, end_msec: f64) -> Self {
        Self {
            values,
            start_msec,
            end_msec,
        }
    }

    /// Feature spanning the same time range as `window`
    pub fn for_window(values: Vec<f64>, window: &Signal) -> Self {
        Self::new(values, window.start_msec(), window.end_msec())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn start_msec(&self) -> f64 {
        self.start_msec
    }

    pub fn end_msec(&self) -> f64 {
        self.end_msec
    }

    /// Same time range, different values
    pub fn with_values(&self, values: Vec<f64>) -> Self {
        Self::new(values, self.start_msec, self.end_msec)
    }
}

/// Temporally ordered features from consecutive sub-windows of one signal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureGram {
    features: Vec<Feature>,
}

impl FeatureGram {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Length of the first feature vector
    pub fn feature_len(&self) -> Option<usize> {
        self.features.first().map(Feature::len)
    }

    /// Fails unless every feature has the same length
    pub fn check_uniform(&self, context: &str) -> Result<()> {
        if let Some(expected) = self.feature_len() {
            if let Some(bad) = self.features.iter().find(|f| f.len() != expected) {
                return Err(ClassifierError::mismatch(context, expected, bad.len()));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FeatureGram {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

pub type Labels = BTreeMap<String, String>;

/// Signal annotated with label name/value pairs
#[derive(Debug, Clone)]
pub struct LabeledSignal {
    pub signal: Signal,
    pub labels: Labels,
}

impl LabeledSignal {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            labels: Labels::new(),
        }
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// Feature gram carrying the labels of the signal it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledFeatureGram {
    gram: FeatureGram,
    labels: Labels,
}

impl LabeledFeatureGram {
    pub fn new(gram: FeatureGram, labels: Labels) -> Self {
        Self { gram, labels }
    }

    pub fn gram(&self) -> &FeatureGram {
        &self.gram
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_signal_rejected() {
        assert!(matches!(
            Signal::new(vec![], 8000.0, 0.0),
            Err(ClassifierError::InvalidInput(_))
        ));
        assert!(Signal::new(vec![0.0], 0.0, 0.0).is_err());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let a = Signal::new(vec![0.0; 4], 8000.0, 0.0).unwrap();
        let b = Signal::new(vec![0.0; 4], 8000.0, 0.0).unwrap();
        assert!(b.id() > a.id());
        // Content identity does not depend on the id
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_sees_content() {
        let a = Signal::new(vec![0.0, 1.0], 8000.0, 0.0).unwrap();
        let b = Signal::new(vec![0.0, 1.5], 8000.0, 0.0).unwrap();
        let c = Signal::new(vec![0.0, 1.0], 8000.0, 10.0).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_sub_signal_timing() {
        let signal = Signal::new(vec![0.0; 1000], 1000.0, 500.0).unwrap();
        assert_eq!(signal.end_msec(), 1500.0);

        let sub = signal.sub_signal(250, 100).unwrap();
        assert_eq!(sub.len(), 100);
        assert_eq!(sub.start_msec(), 750.0);
        assert_eq!(sub.end_msec(), 850.0);

        assert!(signal.sub_signal(950, 100).is_err());
    }

    #[test]
    fn test_uniform_check() {
        let gram = FeatureGram::new(vec![
            Feature::new(vec![1.0, 2.0], 0.0, 10.0),
            Feature::new(vec![1.0], 10.0, 20.0),
        ]);
        assert!(matches!(
            gram.check_uniform("gram"),
            Err(ClassifierError::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
    }
}
