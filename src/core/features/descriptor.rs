// src/core/features/descriptor.rs
//
// How a signal is segmented and which extractor/processor run on it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::extractor::{FeatureExtractor, LogMelExtractor, MelFilterBankExtractor, MfccExtractor};
use super::mel::MelConfig;
use super::processor::{DeltaFeatureProcessor, FeatureProcessor, NormalizingFeatureProcessor};
use crate::error::{ClassifierError, Result};

pub const DEFAULT_WINDOW_SIZE_MSEC: f64 = 40.0;
pub const DEFAULT_WINDOW_SHIFT_MSEC: f64 = 20.0;
pub const DEFAULT_MFCC_COEFFICIENTS: usize = 13;

/// Sub-window segmentation plus the extractor and optional processor
#[derive(Clone)]
pub struct FeatureGramDescriptor {
    window_size_msec: f64,
    window_shift_msec: f64,
    extractor: Arc<dyn FeatureExtractor>,
    processor: Option<Arc<dyn FeatureProcessor>>,
    config: Option<FeatureGramConfig>,
}

impl FeatureGramDescriptor {
    /// A size of 0 uses the whole signal as one window; a shift of 0 equals the size.
    pub fn new(
        window_size_msec: f64,
        window_shift_msec: f64,
        extractor: Arc<dyn FeatureExtractor>,
        processor: Option<Arc<dyn FeatureProcessor>>,
    ) -> Result<Self> {
        if !(window_size_msec >= 0.0) || !window_size_msec.is_finite() {
            return Err(ClassifierError::invalid(format!(
                "window size must be >= 0 ms, got {}",
                window_size_msec
            )));
        }
        if !(window_shift_msec >= 0.0) || !window_shift_msec.is_finite() {
            return Err(ClassifierError::invalid(format!(
                "window shift must be >= 0 ms, got {}",
                window_shift_msec
            )));
        }
        let window_shift_msec = if window_shift_msec == 0.0 {
            window_size_msec
        } else {
            window_shift_msec
        };
        Ok(Self {
            window_size_msec,
            window_shift_msec,
            extractor,
            processor,
            config: None,
        })
    }

    pub fn window_size_msec(&self) -> f64 {
        self.window_size_msec
    }

    pub fn window_shift_msec(&self) -> f64 {
        self.window_shift_msec
    }

    pub fn extractor(&self) -> &Arc<dyn FeatureExtractor> {
        &self.extractor
    }

    pub fn processor(&self) -> Option<&Arc<dyn FeatureProcessor>> {
        self.processor.as_ref()
    }

    /// Serializable form, present when built from a [`FeatureGramConfig`]
    pub fn config(&self) -> Option<&FeatureGramConfig> {
        self.config.as_ref()
    }

    /// Identity of the unprocessed features: extractor and segmentation
    pub fn extraction_identity(&self) -> String {
        format!(
            "{}|size={}|shift={}",
            self.extractor.identity(),
            self.window_size_msec,
            self.window_shift_msec
        )
    }

    /// Identity of the processed feature gram
    pub fn identity(&self) -> String {
        match &self.processor {
            Some(p) => format!("{}|{}", self.extraction_identity(), p.identity()),
            None => format!("{}|none", self.extraction_identity()),
        }
    }
}

impl PartialEq for FeatureGramDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl fmt::Debug for FeatureGramDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureGramDescriptor")
            .field("window_size_msec", &self.window_size_msec)
            .field("window_shift_msec", &self.window_shift_msec)
            .field("extractor", &self.extractor.identity())
            .field("processor", &self.processor.as_ref().map(|p| p.identity()))
            .finish()
    }
}

/// Serializable extractor choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractorConfig {
    MelBands {
        #[serde(default)]
        mel: MelConfig,
        #[serde(default)]
        use_log: bool,
        #[serde(default)]
        normalize: bool,
        #[serde(default)]
        max_final_coefficients: usize,
    },
    LogMel {
        #[serde(default)]
        mel: MelConfig,
        #[serde(default)]
        normalize: bool,
    },
    Mfcc {
        #[serde(default)]
        mel: MelConfig,
        #[serde(default = "default_mfcc_coefficients")]
        num_coefficients: usize,
    },
}

fn default_mfcc_coefficients() -> usize {
    DEFAULT_MFCC_COEFFICIENTS
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::Mfcc {
            mel: MelConfig::default(),
            num_coefficients: DEFAULT_MFCC_COEFFICIENTS,
        }
    }
}

impl ExtractorConfig {
    pub fn mel(&self) -> &MelConfig {
        match self {
            Self::MelBands { mel, .. } | Self::LogMel { mel, .. } | Self::Mfcc { mel, .. } => mel,
        }
    }

    pub fn mel_mut(&mut self) -> &mut MelConfig {
        match self {
            Self::MelBands { mel, .. } | Self::LogMel { mel, .. } | Self::Mfcc { mel, .. } => mel,
        }
    }

    pub fn build(&self) -> Result<Arc<dyn FeatureExtractor>> {
        let extractor: Arc<dyn FeatureExtractor> = match self {
            Self::MelBands {
                mel,
                use_log,
                normalize,
                max_final_coefficients,
            } => Arc::new(
                MelFilterBankExtractor::new(*mel)?
                    .use_log(*use_log)
                    .normalize(*normalize)
                    .max_final_coefficients(*max_final_coefficients),
            ),
            Self::LogMel { mel, normalize } => {
                Arc::new(LogMelExtractor::new(*mel)?.normalize(*normalize))
            }
            Self::Mfcc { mel, num_coefficients } => Arc::new(MfccExtractor::new(*mel, *num_coefficients)?),
        };
        Ok(extractor)
    }
}

/// Serializable processor choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessorConfig {
    Delta { half_window: usize, weights: Vec<f64> },
    Normalize { zero_mean: bool, unit_stddev: bool },
}

impl ProcessorConfig {
    pub fn build(&self) -> Result<Arc<dyn FeatureProcessor>> {
        let processor: Arc<dyn FeatureProcessor> = match self {
            Self::Delta { half_window, weights } => {
                Arc::new(DeltaFeatureProcessor::new(*half_window, weights.clone())?)
            }
            Self::Normalize { zero_mean, unit_stddev } => {
                Arc::new(NormalizingFeatureProcessor::new(*zero_mean, *unit_stddev))
            }
        };
        Ok(processor)
    }
}

/// Serializable form of a [`FeatureGramDescriptor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureGramConfig {
    pub window_size_msec: f64,
    pub window_shift_msec: f64,
    pub extractor: ExtractorConfig,
    pub processor: Option<ProcessorConfig>,
}

impl Default for FeatureGramConfig {
    fn default() -> Self {
        Self {
            window_size_msec: DEFAULT_WINDOW_SIZE_MSEC,
            window_shift_msec: DEFAULT_WINDOW_SHIFT_MSEC,
            extractor: ExtractorConfig::default(),
            processor: None,
        }
    }
}

impl FeatureGramConfig {
    pub fn build(&self) -> Result<FeatureGramDescriptor> {
        let processor = self.processor.as_ref().map(ProcessorConfig::build).transpose()?;
        let mut descriptor = FeatureGramDescriptor::new(
            self.window_size_msec,
            self.window_shift_msec,
            self.extractor.build()?,
            processor,
        )?;
        descriptor.config = Some(self.clone());
        Ok(descriptor)
    }
}
