// src/core/gmm/classifier.rs
//
// Inference over a fixed set of per-label Gaussian mixtures.
//
// Each feature of the gram is scored against every label model. Labels are
// ranked by their mean log ratio against the pooled density, and the whole
// input is declared "undefined" when its mean pooled log density does not
// exceed the unknown threshold.

use log::{debug, info};

use super::mixture::GaussianMixture;
use crate::classification::{Classification, LabelValue};
use crate::core::features::{FeatureGram, FeatureGramDescriptor, FeatureGramPipeline, Signal};
use crate::error::{ClassifierError, Result};

/// Substitute denominator when every exp(score) underflows to zero
const CONFIDENCE_EPSILON: f64 = 0.00001;

/// Per-label discriminative scores for one feature gram
#[derive(Debug, Clone, PartialEq)]
pub struct GramScores {
    /// Mean of ln(density_label / density_overall), in label order
    pub label_scores: Vec<f64>,
    /// Mean of ln(density_overall)
    pub pooled_log_density: f64,
}

/// Immutable classifier holding one mixture per label value
#[derive(Debug, Clone)]
pub struct FixedGmmClassifier {
    primary_label: String,
    descriptors: Vec<FeatureGramDescriptor>,
    models: Vec<(String, GaussianMixture)>,
    unknown_threshold: f64,
}

impl FixedGmmClassifier {
    pub fn new(
        primary_label: impl Into<String>,
        descriptors: Vec<FeatureGramDescriptor>,
        models: Vec<(String, GaussianMixture)>,
        unknown_threshold: f64,
    ) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(ClassifierError::invalid("classifier needs a feature gram descriptor"));
        }
        if models.is_empty() {
            return Err(ClassifierError::invalid("classifier needs at least one label model"));
        }
        for (i, (label, model)) in models.iter().enumerate() {
            if model.is_empty() {
                return Err(ClassifierError::invalid(format!("label model '{}' has no components", label)));
            }
            if models[..i].iter().any(|(other, _)| other == label) {
                return Err(ClassifierError::invalid(format!("duplicate model for label value '{}'", label)));
            }
        }
        if unknown_threshold.is_nan() {
            return Err(ClassifierError::invalid("unknown threshold must not be NaN"));
        }
        Ok(Self {
            primary_label: primary_label.into(),
            descriptors,
            models,
            unknown_threshold,
        })
    }

    pub fn primary_label(&self) -> &str {
        &self.primary_label
    }

    pub fn descriptors(&self) -> &[FeatureGramDescriptor] {
        &self.descriptors
    }

    pub fn label_values(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|(label, _)| label.as_str())
    }

    pub fn models(&self) -> &[(String, GaussianMixture)] {
        &self.models
    }

    pub fn model(&self, label_value: &str) -> Option<&GaussianMixture> {
        self.models.iter().find(|(l, _)| l == label_value).map(|(_, m)| m)
    }

    pub fn unknown_threshold(&self) -> f64 {
        self.unknown_threshold
    }

    /// Mean discriminative score per label and mean pooled log density
    pub fn score(&self, gram: &FeatureGram) -> Result<GramScores> {
        if gram.is_empty() {
            return Err(ClassifierError::invalid("cannot classify an empty feature gram"));
        }

        let mut label_scores = vec![0.0; self.models.len()];
        let mut pooled = 0.0;
        let mut densities = vec![0.0; self.models.len()];

        for feature in gram {
            let x = feature.values();
            for (d, (_, model)) in densities.iter_mut().zip(&self.models) {
                *d = model.density(x);
            }
            let overall: f64 = densities.iter().sum();
            let log_overall = overall.ln();
            pooled += log_overall;
            for (s, d) in label_scores.iter_mut().zip(&densities) {
                *s += d.ln() - log_overall;
            }
        }

        let n = gram.len() as f64;
        label_scores.iter_mut().for_each(|s| *s /= n);
        Ok(GramScores {
            label_scores,
            pooled_log_density: pooled / n,
        })
    }

    /// Classify exactly one feature gram
    pub fn classify(&self, grams: &[FeatureGram]) -> Result<Classification> {
        match grams {
            [gram] => self.classify_gram(gram),
            _ => Err(ClassifierError::UnsupportedConfiguration(format!(
                "classification takes exactly one feature gram, got {}",
                grams.len()
            ))),
        }
    }

    pub fn classify_gram(&self, gram: &FeatureGram) -> Result<Classification> {
        let scores = self.score(gram)?;
        let pooled = scores.pooled_log_density;

        if pooled > self.unknown_threshold {
            let mut ranked: Vec<(usize, f64)> = scores.label_scores.iter().copied().enumerate().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

            let sum: f64 = ranked.iter().map(|(_, s)| s.exp()).sum();
            let denominator = if sum == 0.0 { CONFIDENCE_EPSILON } else { sum };

            let ranked = ranked
                .into_iter()
                .map(|(i, s)| LabelValue::new(self.models[i].0.clone(), s.exp() / denominator))
                .collect();
            Ok(Classification::new(self.primary_label.clone(), ranked, pooled))
        } else {
            let shaped = (pooled + (100.0 - self.unknown_threshold) / 100.0).clamp(0.0, 1.0);
            debug!(
                "pooled log density {:.3} at or below threshold {:.3}; reporting undefined",
                pooled, self.unknown_threshold
            );
            Ok(Classification::undefined(self.primary_label.clone(), 1.0 - shaped, pooled))
        }
    }

    /// Extract features with the training-time descriptors and classify
    pub fn classify_signal(&self, signal: &Signal, pipeline: &FeatureGramPipeline) -> Result<Classification> {
        let grams = pipeline.extract(signal, &self.descriptors)?;
        self.classify(&grams)
    }

    /// Union of the inputs' label models; shared labels get their mixtures
    /// merged and the threshold is the mean of the inputs' thresholds.
    pub fn merge(classifiers: &[&FixedGmmClassifier]) -> Result<FixedGmmClassifier> {
        let first = classifiers
            .first()
            .ok_or_else(|| ClassifierError::invalid("no classifiers to merge"))?;

        for other in &classifiers[1..] {
            if other.primary_label != first.primary_label {
                return Err(ClassifierError::IncompatibleModels(format!(
                    "primary label '{}' differs from '{}'",
                    other.primary_label, first.primary_label
                )));
            }
            if other.descriptors != first.descriptors {
                return Err(ClassifierError::IncompatibleModels(
                    "feature gram descriptors differ".to_string(),
                ));
            }
        }

        let mut labels: Vec<&str> = Vec::new();
        for c in classifiers {
            for label in c.label_values() {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }

        let models = labels
            .into_iter()
            .map(|label| {
                let parts: Vec<&GaussianMixture> = classifiers.iter().filter_map(|c| c.model(label)).collect();
                let mixture = match parts.as_slice() {
                    [only] => (*only).clone(),
                    _ => GaussianMixture::merge(&parts)?,
                };
                Ok((label.to_string(), mixture))
            })
            .collect::<Result<Vec<_>>>()?;

        let threshold =
            classifiers.iter().map(|c| c.unknown_threshold).sum::<f64>() / classifiers.len() as f64;

        info!(
            "merged {} classifiers for '{}' into {} label models",
            classifiers.len(),
            first.primary_label,
            models.len()
        );
        FixedGmmClassifier::new(first.primary_label.clone(), first.descriptors.clone(), models, threshold)
    }
}
