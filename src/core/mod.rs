//! Core numerical modules: DSP, feature extraction and Gaussian mixtures

pub mod decoder;
pub mod dsp;
pub mod features;
pub mod gmm;

pub use decoder::decode_signal;
pub use dsp::{SpectralPowerComputer, SpectrumConfig, WindowFunction};
pub use features::{FeatureGramDescriptor, FeatureGramPipeline, MelFilterBank, Signal};
pub use gmm::{FixedGmmClassifier, GaussianComponent, GaussianMixture, GmmTrainer};
