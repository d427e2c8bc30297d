//! Gaussian mixture models: component densities, mixtures, the fixed
//! classifier and its EM trainer

pub mod classifier;
pub mod gaussian;
pub mod mixture;
pub mod trainer;

pub use classifier::{FixedGmmClassifier, GramScores};
pub use gaussian::{CovarianceType, DiagonalGaussian, FullGaussian, GaussianComponent};
pub use mixture::{GaussianMixture, Posterior, DENSITY_FLOOR};
pub use trainer::{GmmTrainer, UnknownThreshold};
