//! AudioClassr - Classify acoustic recordings with Gaussian mixtures
//!
//! Turns audio signals into sequences of spectral feature vectors and
//! classifies them against per-label Gaussian mixture models, reporting a
//! ranked list of label values with confidences, or "undefined" when the
//! input does not resemble anything seen during training.
//!
//! ## Features
//!
//! - **Spectral power**: windowed FFT with resampling to a target rate and
//!   a bounded peak-to-noise dynamic range
//! - **Mel filter bank**: triangular bands with adaptive zero-padding for
//!   narrow bands
//! - **Feature grams**: windowed extraction (mel, log mel, MFCC) with
//!   optional delta or normalizing post-processing, memoized per signal
//! - **Gaussian mixtures**: diagonal and full covariance components,
//!   EM training, mixture merging
//! - **Fixed classifier**: discriminative label scores with an unknown
//!   threshold, mergeable across training runs
//! - **Model files**: JSON persistence of trained classifiers
//!
//! ## Module Structure
//!
//! - `core` - DSP, feature extraction and Gaussian mixture models
//! - `classification` - Classification result types
//! - `config` - Presets and training configuration
//! - `persistence` - Model file format
//! - `cli` - Command-line interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use audioclassr::config::{ClassifierConfig, ConfigPreset};
//! use audioclassr::core::{decode_signal, FeatureGramPipeline};
//! use audioclassr::core::features::LabeledSignal;
//!
//! let config = ClassifierConfig::from_preset(ConfigPreset::Standard);
//! let pipeline = FeatureGramPipeline::new();
//!
//! let training: Vec<LabeledSignal> = load_training_clips()?;
//! let classifier = config
//!     .trainer()
//!     .train_signals(&config.primary_label, config.descriptor()?, &training, &pipeline)?;
//!
//! let signal = decode_signal(path)?;
//! let result = classifier.classify_signal(&signal, &pipeline)?;
//! println!("{:?} ({:.0}%)", result.top_value(), result.top().map_or(0.0, |v| v.confidence) * 100.0);
//! ```
//!
//! ## Presets
//!
//! | Preset   | Features                         | Model                        |
//! |----------|----------------------------------|------------------------------|
//! | Standard | 13 MFCCs over 40 mel bands       | 8 diagonal components        |
//! | LogMel   | 40 log mel bands + deltas        | 8 diagonal components        |
//! | Detailed | 256 log mel bands                | 4 full-covariance components |

// Numerical core
pub mod core;

// Classification result types
pub mod classification;

// Configuration and presets
pub mod config;

pub mod error;

// Model files
pub mod persistence;

// Command-line interface
pub mod cli;

// Re-export commonly used types at crate root for convenience
pub use classification::{Classification, ConfidenceLevel, LabelValue, UNDEFINED_LABEL_VALUE};
pub use config::{ClassifierConfig, ConfigBuilder, ConfigPreset, ModelConfig};
pub use crate::core::features::{
    Feature, FeatureExtractor, FeatureGram, FeatureGramConfig, FeatureGramDescriptor, FeatureGramPipeline,
    FeatureNormalizer, FeatureProcessor, LabeledFeatureGram, LabeledSignal, Signal,
};
pub use crate::core::gmm::{CovarianceType, FixedGmmClassifier, GaussianComponent, GaussianMixture, GmmTrainer, UnknownThreshold};
pub use crate::core::{decode_signal, MelFilterBank, SpectralPowerComputer, SpectrumConfig, WindowFunction};
pub use error::{ClassifierError, Result};
pub use persistence::{load_classifier, save_classifier, GmmModelFile};
