// src/config/settings.rs
//
// Training and deployment settings: how features are extracted, how label
// models are fitted, and whether extraction results are cached.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::dsp::WindowFunction;
use crate::core::features::{
    ExtractorConfig, FeatureGramCache, FeatureGramConfig, FeatureGramDescriptor, MelConfig, ProcessorConfig,
};
use crate::core::gmm::trainer::{DEFAULT_MAX_ITERATIONS, DEFAULT_NUM_COMPONENTS, DEFAULT_SEED};
use crate::core::gmm::{CovarianceType, GmmTrainer, UnknownThreshold};
use crate::error::Result;

/// Canned configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigPreset {
    /// 13 MFCCs over 40 mel bands, 40 ms windows every 20 ms
    Standard,
    /// Log mel bands with first and second differences appended
    LogMel,
    /// 256 narrow mel bands; engages adaptive zero-padding
    Detailed,
    /// User-defined settings
    Custom,
}

impl ConfigPreset {
    pub fn all() -> Vec<Self> {
        vec![Self::Standard, Self::LogMel, Self::Detailed]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "standard" | "mfcc" => Some(Self::Standard),
            "logmel" | "log-mel" => Some(Self::LogMel),
            "detailed" => Some(Self::Detailed),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Standard => "MFCC features, 8 diagonal components per label",
            Self::LogMel => "Log mel bands with deltas, 8 diagonal components per label",
            Self::Detailed => "256 log mel bands, 4 full-covariance components per label",
            Self::Custom => "User-defined settings",
        }
    }
}

/// Mixture fitting settings applied to every label value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub covariance: CovarianceType,
    pub num_components: usize,
    pub unknown_threshold: UnknownThreshold,
    pub max_iterations: usize,
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            covariance: CovarianceType::Diagonal,
            num_components: DEFAULT_NUM_COMPONENTS,
            unknown_threshold: UnknownThreshold::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: DEFAULT_SEED,
        }
    }
}

impl ModelConfig {
    pub fn trainer(&self) -> GmmTrainer {
        GmmTrainer::new()
            .num_components(self.num_components)
            .covariance(self.covariance)
            .unknown_threshold(self.unknown_threshold)
            .max_iterations(self.max_iterations)
            .seed(self.seed)
    }
}

/// Complete classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub name: String,
    pub base_preset: ConfigPreset,
    /// Label name whose values the classifier predicts
    pub primary_label: String,
    pub feature_gram: FeatureGramConfig,
    pub model: ModelConfig,
    /// Memoize extraction in the process-wide cache
    pub cache_enabled: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::from_preset(ConfigPreset::Standard)
    }
}

impl ClassifierConfig {
    pub fn from_preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Standard | ConfigPreset::Custom => Self::standard(),
            ConfigPreset::LogMel => Self::log_mel(),
            ConfigPreset::Detailed => Self::detailed(),
        }
    }

    fn standard() -> Self {
        Self {
            name: "Standard".to_string(),
            base_preset: ConfigPreset::Standard,
            primary_label: "class".to_string(),
            feature_gram: FeatureGramConfig::default(),
            model: ModelConfig::default(),
            cache_enabled: false,
        }
    }

    fn log_mel() -> Self {
        Self {
            name: "LogMel".to_string(),
            base_preset: ConfigPreset::LogMel,
            feature_gram: FeatureGramConfig {
                extractor: ExtractorConfig::LogMel {
                    mel: MelConfig::default(),
                    normalize: false,
                },
                processor: Some(ProcessorConfig::Delta {
                    half_window: 2,
                    weights: vec![1.0, 1.0, 1.0],
                }),
                ..Default::default()
            },
            ..Self::standard()
        }
    }

    fn detailed() -> Self {
        Self {
            name: "Detailed".to_string(),
            base_preset: ConfigPreset::Detailed,
            feature_gram: FeatureGramConfig {
                extractor: ExtractorConfig::LogMel {
                    mel: MelConfig {
                        num_bands: 256,
                        ..Default::default()
                    },
                    normalize: false,
                },
                ..Default::default()
            },
            model: ModelConfig {
                covariance: CovarianceType::Full,
                num_components: 4,
                ..Default::default()
            },
            ..Self::standard()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Build the feature gram descriptor these settings describe
    pub fn descriptor(&self) -> Result<FeatureGramDescriptor> {
        self.feature_gram.build()
    }

    pub fn trainer(&self) -> GmmTrainer {
        self.model.trainer()
    }

    /// Push the cache flag to the process-wide feature cache
    pub fn apply_cache_setting(&self) {
        FeatureGramCache::set_global_enabled(self.cache_enabled);
    }
}

/// Builder for custom configurations
pub struct ConfigBuilder {
    config: ClassifierConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClassifierConfig::default(),
        }
    }

    pub fn from_preset(preset: ConfigPreset) -> Self {
        Self {
            config: ClassifierConfig::from_preset(preset),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn primary_label(mut self, label: impl Into<String>) -> Self {
        self.config.primary_label = label.into();
        self
    }

    pub fn window_size_msec(mut self, msec: f64) -> Self {
        self.config.feature_gram.window_size_msec = msec;
        self
    }

    pub fn window_shift_msec(mut self, msec: f64) -> Self {
        self.config.feature_gram.window_shift_msec = msec;
        self
    }

    pub fn target_sampling_rate(mut self, hz: f64) -> Self {
        self.config.feature_gram.extractor.mel_mut().spectrum.target_sampling_rate = hz;
        self
    }

    pub fn window_function(mut self, window: WindowFunction) -> Self {
        self.config.feature_gram.extractor.mel_mut().spectrum.window = window;
        self
    }

    pub fn num_bands(mut self, bands: usize) -> Self {
        self.config.feature_gram.extractor.mel_mut().num_bands = bands;
        self
    }

    pub fn frequency_range(mut self, min_hz: f64, max_hz: f64) -> Self {
        let mel = self.config.feature_gram.extractor.mel_mut();
        mel.min_freq_hz = min_hz;
        mel.max_freq_hz = max_hz;
        self
    }

    pub fn extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.config.feature_gram.extractor = extractor;
        self
    }

    pub fn processor(mut self, processor: Option<ProcessorConfig>) -> Self {
        self.config.feature_gram.processor = processor;
        self
    }

    pub fn covariance(mut self, covariance: CovarianceType) -> Self {
        self.config.model.covariance = covariance;
        self
    }

    pub fn num_components(mut self, n: usize) -> Self {
        self.config.model.num_components = n;
        self
    }

    pub fn unknown_threshold_coefficient(mut self, coefficient: f64) -> Self {
        self.config.model.unknown_threshold = UnknownThreshold::Coefficient(coefficient);
        self
    }

    pub fn fixed_unknown_threshold(mut self, threshold: f64) -> Self {
        self.config.model.unknown_threshold = UnknownThreshold::Fixed(threshold);
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache_enabled = enabled;
        self
    }

    pub fn build(mut self) -> ClassifierConfig {
        self.config.base_preset = ConfigPreset::Custom;
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClassifierConfig::default();
        let mel = config.feature_gram.extractor.mel();
        assert_eq!(mel.spectrum.target_sampling_rate, 44100.0);
        assert_eq!(mel.spectrum.window, WindowFunction::Hamming);
        assert_eq!(mel.num_bands, 40);
        assert_eq!(config.feature_gram.window_size_msec, 40.0);
        assert_eq!(config.feature_gram.window_shift_msec, 20.0);
        assert_eq!(config.model.num_components, 8);
        assert_eq!(config.model.unknown_threshold, UnknownThreshold::Coefficient(0.0));
        assert!(!config.cache_enabled);
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::from_preset(ConfigPreset::LogMel)
            .name("pump")
            .primary_label("state")
            .num_bands(26)
            .frequency_range(0.0, 8000.0)
            .window_function(WindowFunction::Hanning)
            .fixed_unknown_threshold(-50.0)
            .build();

        assert_eq!(config.base_preset, ConfigPreset::Custom);
        assert_eq!(config.primary_label, "state");
        let mel = config.feature_gram.extractor.mel();
        assert_eq!(mel.num_bands, 26);
        assert_eq!(mel.max_freq_hz, 8000.0);
        assert_eq!(mel.spectrum.window, WindowFunction::Hanning);
        assert!(matches!(config.feature_gram.processor, Some(ProcessorConfig::Delta { .. })));
        assert!(config.descriptor().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{"primary_label": "state", "model": {"num_components": 2}}"#).unwrap();
        assert_eq!(config.primary_label, "state");
        assert_eq!(config.model.num_components, 2);
        assert_eq!(config.model.covariance, CovarianceType::Diagonal);
        assert_eq!(config.feature_gram, FeatureGramConfig::default());
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(ConfigPreset::from_name("LogMel"), Some(ConfigPreset::LogMel));
        assert_eq!(ConfigPreset::from_name("unknown"), None);
        for preset in ConfigPreset::all() {
            assert!(ClassifierConfig::from_preset(preset).descriptor().is_ok());
        }
    }
}
