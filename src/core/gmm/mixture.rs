// src/core/gmm/mixture.rs
//
// Weighted sum of Gaussian components.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use super::gaussian::GaussianComponent;
use crate::error::{ClassifierError, Result};

/// Smallest positive f64; each weighted component density is floored here
/// so a mixture density is never exactly zero.
pub const DENSITY_FLOOR: f64 = 4.9406564584124654e-324;

/// Per-component responsibilities for one observation
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    pub probabilities: Vec<f64>,
    /// Sum of floored weighted densities before normalization
    pub sum: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MixtureParams {
    weights: Vec<f64>,
    components: Vec<GaussianComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MixtureParams", into = "MixtureParams")]
pub struct GaussianMixture {
    weights: Vec<f64>,
    components: Vec<GaussianComponent>,
}

impl GaussianMixture {
    pub fn new(weights: Vec<f64>, components: Vec<GaussianComponent>) -> Result<Self> {
        if weights.len() != components.len() {
            return Err(ClassifierError::invalid(format!(
                "{} mixture weights for {} components",
                weights.len(),
                components.len()
            )));
        }
        Ok(Self { weights, components })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn components(&self) -> &[GaussianComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Dimension of the first component
    pub fn dim(&self) -> Option<usize> {
        self.components.first().map(GaussianComponent::dim)
    }

    fn weighted_densities<'a>(&'a self, x: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
        self.weights
            .iter()
            .zip(&self.components)
            .map(move |(w, c)| (w * c.density(x)).max(DENSITY_FLOOR))
    }

    pub fn density(&self, x: &[f64]) -> f64 {
        self.weighted_densities(x).sum()
    }

    /// Normalized responsibilities; all zero with `sum == 0` when every
    /// weighted density vanishes (only possible for an empty mixture).
    pub fn posterior(&self, x: &[f64]) -> Posterior {
        let densities: Vec<f64> = self.weighted_densities(x).collect();
        let sum: f64 = densities.iter().sum();
        if sum == 0.0 {
            return Posterior {
                probabilities: vec![0.0; densities.len()],
                sum: 0.0,
            };
        }
        Posterior {
            probabilities: densities.into_iter().map(|d| d / sum).collect(),
            sum,
        }
    }

    /// Union of every (weight, component) pair, weights divided by their
    /// grand total. A zero total leaves all weights at zero.
    pub fn merge(mixtures: &[&GaussianMixture]) -> Result<GaussianMixture> {
        if mixtures.is_empty() {
            return Err(ClassifierError::invalid("no mixtures to merge"));
        }

        let mut weights = Vec::new();
        let mut components = Vec::new();
        for m in mixtures {
            weights.extend_from_slice(&m.weights);
            components.extend(m.components.iter().cloned());
        }

        let total: f64 = weights.iter().sum();
        if total != 0.0 {
            weights.iter_mut().for_each(|w| *w /= total);
        }

        GaussianMixture::new(weights, components)
    }
}

impl TryFrom<MixtureParams> for GaussianMixture {
    type Error = ClassifierError;

    fn try_from(p: MixtureParams) -> Result<Self> {
        Self::new(p.weights, p.components)
    }
}

impl From<GaussianMixture> for MixtureParams {
    fn from(m: GaussianMixture) -> Self {
        Self {
            weights: m.weights,
            components: m.components,
        }
    }
}

impl PartialEq for GaussianMixture {
    fn eq(&self, other: &Self) -> bool {
        self.weights.len() == other.weights.len()
            && self
                .weights
                .iter()
                .zip(&other.weights)
                .all(|(a, b)| a.to_bits() == b.to_bits())
            && self.components == other.components
    }
}

impl Eq for GaussianMixture {}

impl Hash for GaussianMixture {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for w in &self.weights {
            w.to_bits().hash(state);
        }
        self.components.hash(state);
    }
}
