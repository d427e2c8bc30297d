// src/core/gmm/trainer.rs
//
// Expectation-maximization fitting of one mixture per label value, and
// assembly of those mixtures into a FixedGmmClassifier.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::classifier::FixedGmmClassifier;
use super::gaussian::{CovarianceType, GaussianComponent};
use super::mixture::GaussianMixture;
use crate::core::features::{FeatureGramDescriptor, FeatureGramPipeline, LabeledFeatureGram, LabeledSignal};
use crate::error::{ClassifierError, Result};

pub const DEFAULT_NUM_COMPONENTS: usize = 8;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_SEED: u64 = 1443523423;

const INITIAL_VARIANCE: f64 = 1000.0;
const VARIANCE_REGULARIZATION: f64 = 0.0001;
const CONVERGENCE_RATIO: f64 = 1.0 + 1e-5;
const THRESHOLD_MARGIN: f64 = 0.00001;

/// How the unknown threshold is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum UnknownThreshold {
    /// Use this log density directly
    Fixed(f64),
    /// Lowest training-clip pooled log density plus ln(coefficient);
    /// 0 disables unknown detection
    Coefficient(f64),
}

impl Default for UnknownThreshold {
    fn default() -> Self {
        Self::Coefficient(0.0)
    }
}

/// Fits per-label mixtures and builds a classifier from them
#[derive(Debug, Clone)]
pub struct GmmTrainer {
    num_components: usize,
    covariance: CovarianceType,
    max_iterations: usize,
    seed: u64,
    unknown_threshold: UnknownThreshold,
}

impl Default for GmmTrainer {
    fn default() -> Self {
        Self {
            num_components: DEFAULT_NUM_COMPONENTS,
            covariance: CovarianceType::Diagonal,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: DEFAULT_SEED,
            unknown_threshold: UnknownThreshold::default(),
        }
    }
}

impl GmmTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_components(mut self, n: usize) -> Self {
        self.num_components = n;
        self
    }

    pub fn covariance(mut self, covariance: CovarianceType) -> Self {
        self.covariance = covariance;
        self
    }

    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn unknown_threshold(mut self, threshold: UnknownThreshold) -> Self {
        self.unknown_threshold = threshold;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.num_components == 0 {
            return Err(ClassifierError::invalid("number of mixture components must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(ClassifierError::invalid("EM needs at least one iteration"));
        }
        match self.unknown_threshold {
            UnknownThreshold::Coefficient(c) if c.is_nan() || c < 0.0 => Err(ClassifierError::invalid(format!(
                "unknown threshold coefficient must be >= 0, got {}",
                c
            ))),
            UnknownThreshold::Fixed(t) if t.is_nan() => {
                Err(ClassifierError::invalid("unknown threshold must not be NaN"))
            }
            _ => Ok(()),
        }
    }

    /// Fit a mixture to `samples` by expectation-maximization
    pub fn fit_mixture(&self, samples: &[&[f64]]) -> Result<GaussianMixture> {
        self.validate()?;
        let first = samples
            .first()
            .ok_or_else(|| ClassifierError::invalid("cannot fit a mixture without samples"))?;
        let dim = first.len();
        if dim == 0 {
            return Err(ClassifierError::invalid("cannot fit a mixture to empty feature vectors"));
        }
        if let Some(bad) = samples.iter().find(|s| s.len() != dim) {
            return Err(ClassifierError::mismatch("training features", dim, bad.len()));
        }

        let m = self.num_components;
        let full = self.covariance == CovarianceType::Full;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut weights = vec![1.0 / m as f64; m];
        let mut means: Vec<Vec<f64>> = (0..m)
            .map(|_| (0..dim).map(|_| rng.gen::<f64>() - 0.5).collect())
            .collect();
        let mut covariances: Vec<Vec<Vec<f64>>> = (0..m)
            .map(|_| {
                (0..dim)
                    .map(|i| (0..dim).map(|j| if i == j { INITIAL_VARIANCE } else { 0.0 }).collect())
                    .collect()
            })
            .collect();

        let mut previous_likelihood = 0.0;
        for iteration in 0..self.max_iterations {
            let mixture = self.assemble(&weights, &means, &covariances)?;

            let mut post_sum = vec![0.0; m];
            let mut x_sum = vec![vec![0.0; dim]; m];
            let mut xx_sum = vec![vec![vec![0.0; dim]; dim]; m];
            let mut likelihood = 0.0;

            for x in samples {
                let posterior = mixture.posterior(x);
                likelihood += posterior.sum;
                for k in 0..m {
                    let p = posterior.probabilities[k];
                    if p == 0.0 {
                        continue;
                    }
                    post_sum[k] += p;
                    for i in 0..dim {
                        x_sum[k][i] += p * x[i];
                        if full {
                            for j in 0..dim {
                                xx_sum[k][i][j] += p * x[i] * x[j];
                            }
                        } else {
                            xx_sum[k][i][i] += p * x[i] * x[i];
                        }
                    }
                }
            }

            for k in 0..m {
                if post_sum[k] == 0.0 {
                    warn!("component {} received no responsibility; keeping previous parameters", k);
                    continue;
                }
                let mean: Vec<f64> = x_sum[k].iter().map(|s| s / post_sum[k]).collect();
                for i in 0..dim {
                    for j in 0..dim {
                        covariances[k][i][j] = if full || i == j {
                            xx_sum[k][i][j] / post_sum[k] - mean[i] * mean[j]
                        } else {
                            0.0
                        };
                    }
                    covariances[k][i][i] += VARIANCE_REGULARIZATION;
                }
                means[k] = mean;
                weights[k] = post_sum[k] / samples.len() as f64;
            }

            let ratio = likelihood / previous_likelihood;
            let converged = m == 1 || (previous_likelihood > 0.0 && (1.0..CONVERGENCE_RATIO).contains(&ratio));
            debug!(
                "EM iteration {}: summed likelihood {:.6e} (ratio {:.8})",
                iteration, likelihood, ratio
            );
            previous_likelihood = likelihood;
            if converged {
                break;
            }
        }

        self.assemble(&weights, &means, &covariances)
    }

    fn assemble(&self, weights: &[f64], means: &[Vec<f64>], covariances: &[Vec<Vec<f64>>]) -> Result<GaussianMixture> {
        let components = means
            .iter()
            .zip(covariances)
            .map(|(mean, cov)| match self.covariance {
                CovarianceType::Full => GaussianComponent::full(mean.clone(), cov.clone()),
                CovarianceType::Diagonal => {
                    GaussianComponent::diagonal(mean.clone(), (0..mean.len()).map(|i| cov[i][i]).collect())
                }
            })
            .collect::<Result<Vec<_>>>()?;
        GaussianMixture::new(weights.to_vec(), components)
    }

    /// Train one mixture per value of `primary_label` found in `data`.
    ///
    /// Grams without the primary label are skipped. Label models keep the
    /// order in which their values first appear.
    pub fn train(
        &self,
        primary_label: &str,
        descriptor: FeatureGramDescriptor,
        data: &[LabeledFeatureGram],
    ) -> Result<FixedGmmClassifier> {
        self.validate()?;

        let mut groups: Vec<(String, Vec<&LabeledFeatureGram>)> = Vec::new();
        for item in data {
            let value = match item.label(primary_label) {
                Some(v) => v,
                None => {
                    debug!("skipping feature gram without label '{}'", primary_label);
                    continue;
                }
            };
            match groups.iter_mut().find(|(v, _)| v == value) {
                Some((_, grams)) => grams.push(item),
                None => groups.push((value.to_string(), vec![item])),
            }
        }
        if groups.is_empty() {
            return Err(ClassifierError::invalid(format!(
                "no training data carries label '{}'",
                primary_label
            )));
        }

        info!(
            "training {} label models for '{}' with {} {:?} components each",
            groups.len(),
            primary_label,
            self.num_components,
            self.covariance
        );

        let models = groups
            .par_iter()
            .map(|(value, grams)| {
                let samples: Vec<&[f64]> = grams
                    .iter()
                    .flat_map(|g| g.gram().iter().map(|f| f.values()))
                    .collect();
                debug!("fitting '{}' on {} feature vectors", value, samples.len());
                Ok((value.clone(), self.fit_mixture(&samples)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let provisional =
            FixedGmmClassifier::new(primary_label, vec![descriptor.clone()], models.clone(), f64::NEG_INFINITY)?;
        let threshold = match self.unknown_threshold {
            UnknownThreshold::Fixed(t) => t,
            UnknownThreshold::Coefficient(c) => {
                let mut lowest = f64::INFINITY;
                for (_, grams) in &groups {
                    for g in grams.iter().filter(|g| !g.gram().is_empty()) {
                        lowest = lowest.min(provisional.score(g.gram())?.pooled_log_density);
                    }
                }
                lowest + c.ln() - THRESHOLD_MARGIN
            }
        };
        info!("unknown threshold for '{}' set to {}", primary_label, threshold);

        FixedGmmClassifier::new(primary_label, vec![descriptor], models, threshold)
    }

    /// Extract features from labeled signals, then train
    pub fn train_signals(
        &self,
        primary_label: &str,
        descriptor: FeatureGramDescriptor,
        signals: &[LabeledSignal],
        pipeline: &FeatureGramPipeline,
    ) -> Result<FixedGmmClassifier> {
        let descriptors = [descriptor];
        let data = signals
            .par_iter()
            .map(|s| pipeline.extract_labeled(s, &descriptors))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let [descriptor] = descriptors;
        self.train(primary_label, descriptor, &data)
    }
}
