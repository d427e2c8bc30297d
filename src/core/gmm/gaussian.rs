// src/core/gmm/gaussian.rs
//
// Single multivariate Gaussian densities. All derived state (inverse
// covariance, log normalization) is computed once at construction.
// Equality and hashing use that derived state, compared bit for bit.

use log::warn;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::hash::{Hash, Hasher};

use crate::error::{ClassifierError, Result};

/// Covariance structure used when fitting a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceType {
    Diagonal,
    Full,
}

impl Default for CovarianceType {
    fn default() -> Self {
        Self::Diagonal
    }
}

fn hash_bits<H: Hasher>(values: &[f64], state: &mut H) {
    values.len().hash(state);
    for v in values {
        v.to_bits().hash(state);
    }
}

fn same_bits(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn half_dim_log_two_pi(dim: usize) -> f64 {
    dim as f64 / 2.0 * (2.0 * PI).ln()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiagonalParams {
    mean: Vec<f64>,
    variance: Vec<f64>,
}

/// Gaussian with independent dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DiagonalParams", into = "DiagonalParams")]
pub struct DiagonalGaussian {
    mean: Vec<f64>,
    variance: Vec<f64>,
    inv_variance: Vec<f64>,
    log_const: f64,
}

impl DiagonalGaussian {
    pub fn new(mean: Vec<f64>, variance: Vec<f64>) -> Result<Self> {
        if mean.is_empty() {
            return Err(ClassifierError::invalid("gaussian mean must not be empty"));
        }
        if mean.len() != variance.len() {
            return Err(ClassifierError::invalid(format!(
                "mean has {} dimensions but variance has {}",
                mean.len(),
                variance.len()
            )));
        }

        let inv_variance = variance.iter().map(|v| 1.0 / v).collect();
        let log_const = -variance.iter().map(|v| 0.5 * v.ln()).sum::<f64>() - half_dim_log_two_pi(mean.len());

        Ok(Self {
            mean,
            variance,
            inv_variance,
            log_const,
        })
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn variance(&self) -> &[f64] {
        &self.variance
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn log_const(&self) -> f64 {
        self.log_const
    }

    pub fn log_density(&self, x: &[f64]) -> f64 {
        let n = self.mean.len().min(x.len());
        let q: f64 = (0..n)
            .map(|i| {
                let d = x[i] - self.mean[i];
                d * d * self.inv_variance[i]
            })
            .sum();
        self.log_const - 0.5 * q
    }
}

impl TryFrom<DiagonalParams> for DiagonalGaussian {
    type Error = ClassifierError;

    fn try_from(p: DiagonalParams) -> Result<Self> {
        Self::new(p.mean, p.variance)
    }
}

impl From<DiagonalGaussian> for DiagonalParams {
    fn from(g: DiagonalGaussian) -> Self {
        Self {
            mean: g.mean,
            variance: g.variance,
        }
    }
}

impl PartialEq for DiagonalGaussian {
    fn eq(&self, other: &Self) -> bool {
        self.log_const.to_bits() == other.log_const.to_bits()
            && same_bits(&self.variance, &other.variance)
            && same_bits(&self.inv_variance, &other.inv_variance)
            && same_bits(&self.mean, &other.mean)
    }
}

impl Eq for DiagonalGaussian {}

impl Hash for DiagonalGaussian {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.log_const.to_bits().hash(state);
        hash_bits(&self.variance, state);
        hash_bits(&self.inv_variance, state);
        hash_bits(&self.mean, state);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FullParams {
    mean: Vec<f64>,
    covariance: Vec<Vec<f64>>,
}

/// Gaussian with a dense covariance matrix, inverted through the
/// Moore-Penrose pseudo-inverse so singular covariances are tolerated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "FullParams", into = "FullParams")]
pub struct FullGaussian {
    mean: Vec<f64>,
    covariance: Vec<Vec<f64>>,
    cov_inv: DMatrix<f64>,
    log_const: f64,
}

impl FullGaussian {
    pub fn new(mean: Vec<f64>, covariance: Vec<Vec<f64>>) -> Result<Self> {
        let dim = mean.len();
        if dim == 0 {
            return Err(ClassifierError::invalid("gaussian mean must not be empty"));
        }
        if covariance.len() != dim || covariance.iter().any(|row| row.len() != dim) {
            return Err(ClassifierError::invalid(format!(
                "covariance must be {}x{} to match the mean",
                dim, dim
            )));
        }

        let matrix = DMatrix::from_fn(dim, dim, |i, j| covariance[i][j]);
        let cov_inv = pseudo_inverse(matrix)?;

        let det = cov_inv.clone().determinant();
        let log_det = if det > 0.0 { det.ln() } else { f64::NEG_INFINITY };
        let log_const = 0.5 * log_det - half_dim_log_two_pi(dim);
        if !log_const.is_finite() {
            warn!(
                "pseudo-inverse determinant {} gives non-finite log normalization; densities will be floored",
                det
            );
        }

        Ok(Self {
            mean,
            covariance,
            cov_inv,
            log_const,
        })
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn covariance(&self) -> &[Vec<f64>] {
        &self.covariance
    }

    pub fn inverse_covariance(&self) -> &DMatrix<f64> {
        &self.cov_inv
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn log_const(&self) -> f64 {
        self.log_const
    }

    pub fn log_density(&self, x: &[f64]) -> f64 {
        let n = self.mean.len().min(x.len());
        let diff: Vec<f64> = (0..n).map(|i| x[i] - self.mean[i]).collect();
        let mut q = 0.0;
        for i in 0..n {
            let mut row = 0.0;
            for j in 0..n {
                row += self.cov_inv[(i, j)] * diff[j];
            }
            q += diff[i] * row;
        }
        self.log_const - 0.5 * q
    }
}

/// V * S^+ * U^T, dropping singular values at numerical zero
fn pseudo_inverse(matrix: DMatrix<f64>) -> Result<DMatrix<f64>> {
    let dim = matrix.nrows();
    let svd = matrix.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(ClassifierError::invalid("singular value decomposition did not converge")),
    };

    let largest = svd.singular_values.iter().copied().fold(0.0f64, f64::max);
    let tolerance = largest * dim as f64 * f64::EPSILON;
    let inverted = DMatrix::from_diagonal(&svd.singular_values.map(|s| if s > tolerance { 1.0 / s } else { 0.0 }));

    Ok(v_t.transpose() * inverted * u.transpose())
}

impl TryFrom<FullParams> for FullGaussian {
    type Error = ClassifierError;

    fn try_from(p: FullParams) -> Result<Self> {
        Self::new(p.mean, p.covariance)
    }
}

impl From<FullGaussian> for FullParams {
    fn from(g: FullGaussian) -> Self {
        Self {
            mean: g.mean,
            covariance: g.covariance,
        }
    }
}

impl PartialEq for FullGaussian {
    fn eq(&self, other: &Self) -> bool {
        self.log_const.to_bits() == other.log_const.to_bits()
            && self.cov_inv.shape() == other.cov_inv.shape()
            && same_bits(self.cov_inv.as_slice(), other.cov_inv.as_slice())
            && same_bits(&self.mean, &other.mean)
    }
}

impl Eq for FullGaussian {}

impl Hash for FullGaussian {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.log_const.to_bits().hash(state);
        hash_bits(self.cov_inv.as_slice(), state);
        hash_bits(&self.mean, state);
    }
}

/// One mixture component
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GaussianComponent {
    Diagonal(DiagonalGaussian),
    Full(FullGaussian),
}

impl GaussianComponent {
    pub fn diagonal(mean: Vec<f64>, variance: Vec<f64>) -> Result<Self> {
        DiagonalGaussian::new(mean, variance).map(Self::Diagonal)
    }

    pub fn full(mean: Vec<f64>, covariance: Vec<Vec<f64>>) -> Result<Self> {
        FullGaussian::new(mean, covariance).map(Self::Full)
    }

    pub fn covariance_type(&self) -> CovarianceType {
        match self {
            Self::Diagonal(_) => CovarianceType::Diagonal,
            Self::Full(_) => CovarianceType::Full,
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            Self::Diagonal(g) => g.dim(),
            Self::Full(g) => g.dim(),
        }
    }

    pub fn mean(&self) -> &[f64] {
        match self {
            Self::Diagonal(g) => g.mean(),
            Self::Full(g) => g.mean(),
        }
    }

    /// Natural log of the density. Only the first min(dim, x.len())
    /// dimensions are compared.
    pub fn log_density(&self, x: &[f64]) -> f64 {
        match self {
            Self::Diagonal(g) => g.log_density(x),
            Self::Full(g) => g.log_density(x),
        }
    }

    pub fn density(&self, x: &[f64]) -> f64 {
        self.log_density(x).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_diagonal_standard_normal() {
        let g = GaussianComponent::diagonal(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let expected = 1.0 / (2.0 * PI);
        assert!((g.density(&[0.0, 0.0]) - expected).abs() < 1e-12);
        assert!((g.density(&[1.0, 0.0]) - expected * (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        assert!(matches!(
            GaussianComponent::diagonal(vec![0.0, 0.0], vec![1.0]),
            Err(ClassifierError::InvalidInput(_))
        ));
        assert!(matches!(
            GaussianComponent::full(vec![0.0, 0.0], vec![vec![1.0, 0.0]]),
            Err(ClassifierError::InvalidInput(_))
        ));
        assert!(GaussianComponent::full(vec![0.0, 0.0], vec![vec![1.0, 0.0], vec![0.0]]).is_err());
    }

    #[test]
    fn test_truncation_lenience() {
        // Longer or shorter inputs only compare the shared leading dimensions
        let g = GaussianComponent::diagonal(vec![1.0, 2.0], vec![1.0, 1.0]).unwrap();
        let exact = g.density(&[1.0, 2.0]);
        assert_eq!(g.density(&[1.0, 2.0, 99.0]), exact);
        assert_eq!(g.density(&[1.0]), exact);
        assert_eq!(g.density(&[]), exact);

        let f = GaussianComponent::full(vec![1.0, 2.0], vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert!((f.density(&[1.0, 2.0, -50.0]) - exact).abs() < 1e-12);
    }

    #[test]
    fn test_full_matches_diagonal_for_diagonal_covariance() {
        let d = GaussianComponent::diagonal(vec![0.5, -1.0, 2.0], vec![2.0, 0.5, 3.0]).unwrap();
        let f = GaussianComponent::full(
            vec![0.5, -1.0, 2.0],
            vec![vec![2.0, 0.0, 0.0], vec![0.0, 0.5, 0.0], vec![0.0, 0.0, 3.0]],
        )
        .unwrap();
        for x in [[0.0, 0.0, 0.0], [1.0, -2.0, 3.0], [0.5, -1.0, 2.0]] {
            let (a, b) = (d.log_density(&x), f.log_density(&x));
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_full_correlated_density() {
        // det = 0.75, inverse = [[4/3, -2/3], [-2/3, 4/3]]
        let g = FullGaussian::new(vec![0.0, 0.0], vec![vec![1.0, 0.5], vec![0.5, 1.0]]).unwrap();
        let expected_const = -0.5 * 0.75f64.ln() - (2.0 * PI).ln();
        assert!((g.log_const() - expected_const).abs() < 1e-9);
        assert!((g.log_density(&[1.0, 1.0]) - (expected_const - 0.5 * (4.0 / 3.0 * 2.0 - 4.0 / 3.0))).abs() < 1e-9);
    }

    #[test]
    fn test_singular_covariance_uses_pseudo_inverse() {
        let g = FullGaussian::new(vec![0.0, 0.0], vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        // Pseudo-inverse of [[1,1],[1,1]] is [[0.25,0.25],[0.25,0.25]]
        let inv = g.inverse_covariance();
        for i in 0..2 {
            for j in 0..2 {
                assert!((inv[(i, j)] - 0.25).abs() < 1e-12);
            }
        }
        // Density never produces NaN for finite input
        assert!(!g.log_density(&[1.0, -1.0]).is_nan());
        assert!(!GaussianComponent::Full(g).density(&[1.0, -1.0]).is_nan());
    }

    #[test]
    fn test_equality_and_hash_use_derived_state() {
        let a = GaussianComponent::diagonal(vec![1.0], vec![2.0]).unwrap();
        let b = GaussianComponent::diagonal(vec![1.0], vec![2.0]).unwrap();
        let c = GaussianComponent::diagonal(vec![1.0], vec![2.5]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serde_round_trip_is_equal() {
        let components = vec![
            GaussianComponent::diagonal(vec![0.1, -3.25], vec![0.3333333333333333, 7.0]).unwrap(),
            GaussianComponent::full(vec![1.0, 2.0], vec![vec![2.0, 0.3], vec![0.3, 1.0]]).unwrap(),
        ];
        let json = serde_json::to_string(&components).unwrap();
        let back: Vec<GaussianComponent> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, components);
        assert!(json.contains("\"kind\":\"full\""));
    }
}
