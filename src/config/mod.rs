//! Configuration for feature extraction and model training

mod settings;

pub use settings::{ClassifierConfig, ConfigBuilder, ConfigPreset, ModelConfig};
pub use crate::core::dsp::SpectrumConfig;
pub use crate::core::features::{ExtractorConfig, FeatureGramConfig, MelConfig, ProcessorConfig};
