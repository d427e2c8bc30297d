//! Feature extraction: mel filter bank, extractors, processors, feature-gram
//! pipeline with caching, and corpus normalization

pub mod cache;
pub mod descriptor;
pub mod extractor;
pub mod mel;
pub mod normalizer;
pub mod pipeline;
pub mod processor;
pub mod signal;

pub use cache::{CacheKey, CacheStats, FeatureCache, FeatureGramCache};
pub use descriptor::{ExtractorConfig, FeatureGramConfig, FeatureGramDescriptor, ProcessorConfig};
pub use extractor::{FeatureExtractor, LogMelExtractor, MelFilterBankExtractor, MfccExtractor};
pub use mel::{MelConfig, MelFilterBank};
pub use normalizer::FeatureNormalizer;
pub use pipeline::FeatureGramPipeline;
pub use processor::{DeltaFeatureProcessor, FeatureProcessor, NormalizingFeatureProcessor};
pub use signal::{Feature, FeatureGram, Fingerprint, LabeledFeatureGram, LabeledSignal, Labels, Signal};
