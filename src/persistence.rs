// src/persistence.rs
//
// JSON model files. A trained classifier is stored as the feature gram
// settings it was trained with plus one mixture per label value; loading
// rebuilds the descriptors from those settings so extraction at inference
// time matches training exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;

use crate::core::features::FeatureGramConfig;
use crate::core::gmm::{FixedGmmClassifier, GaussianMixture};
use crate::error::{ClassifierError, Result};

/// Format version written into every model file
pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelModel {
    pub value: String,
    pub mixture: GaussianMixture,
}

/// On-disk form of a [`FixedGmmClassifier`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmmModelFile {
    pub format_version: u32,
    pub primary_label: String,
    pub feature_grams: Vec<FeatureGramConfig>,
    pub labels: Vec<LabelModel>,
    /// JSON has no infinities; non-finite thresholds are written as strings
    #[serde(with = "threshold_repr")]
    pub unknown_threshold: f64,
    pub trained_at: DateTime<Utc>,
}

impl GmmModelFile {
    /// Fails when a descriptor was assembled by hand rather than from a
    /// [`FeatureGramConfig`], since it could not be rebuilt on load.
    pub fn from_classifier(classifier: &FixedGmmClassifier) -> Result<Self> {
        let feature_grams = classifier
            .descriptors()
            .iter()
            .map(|d| {
                d.config().cloned().ok_or_else(|| {
                    ClassifierError::UnsupportedConfiguration(format!(
                        "descriptor {} has no serializable configuration",
                        d.identity()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let labels = classifier
            .models()
            .iter()
            .map(|(value, mixture)| LabelModel {
                value: value.clone(),
                mixture: mixture.clone(),
            })
            .collect();

        Ok(Self {
            format_version: MODEL_FORMAT_VERSION,
            primary_label: classifier.primary_label().to_string(),
            feature_grams,
            labels,
            unknown_threshold: classifier.unknown_threshold(),
            trained_at: Utc::now(),
        })
    }

    pub fn into_classifier(self) -> Result<FixedGmmClassifier> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(ClassifierError::UnsupportedConfiguration(format!(
                "model format version {} (expected {})",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }
        let descriptors = self
            .feature_grams
            .iter()
            .map(FeatureGramConfig::build)
            .collect::<Result<Vec<_>>>()?;
        let models = self.labels.into_iter().map(|l| (l.value, l.mixture)).collect();
        FixedGmmClassifier::new(self.primary_label, descriptors, models, self.unknown_threshold)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("wrote model for '{}' to {}", self.primary_label, path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Save a classifier in one step
pub fn save_classifier(classifier: &FixedGmmClassifier, path: &Path) -> Result<()> {
    GmmModelFile::from_classifier(classifier)?.save(path)
}

/// Load a classifier in one step
pub fn load_classifier(path: &Path) -> Result<FixedGmmClassifier> {
    GmmModelFile::load(path)?.into_classifier()
}

mod threshold_repr {
    use super::*;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Named(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let repr = if value.is_finite() {
            Repr::Finite(*value)
        } else if *value > 0.0 {
            Repr::Named("inf".to_string())
        } else {
            Repr::Named("-inf".to_string())
        };
        repr.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(v) => Ok(v),
            Repr::Named(s) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!("invalid threshold '{}'", other))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::{FeatureGramDescriptor, MfccExtractor};
    use crate::core::features::MelConfig;
    use crate::core::gmm::GaussianComponent;
    use std::sync::Arc;

    fn classifier(threshold: f64) -> FixedGmmClassifier {
        let mixture = GaussianMixture::new(
            vec![0.25, 0.75],
            vec![
                GaussianComponent::diagonal(vec![0.0, 1.0], vec![1.0, 2.0]).unwrap(),
                GaussianComponent::full(vec![3.0, 1.0], vec![vec![2.0, 0.5], vec![0.5, 1.0]]).unwrap(),
            ],
        )
        .unwrap();
        let descriptor = FeatureGramConfig::default().build().unwrap();
        FixedGmmClassifier::new("state", vec![descriptor], vec![("on".to_string(), mixture)], threshold).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_models() {
        let original = classifier(-12.5);
        let file = GmmModelFile::from_classifier(&original).unwrap();
        let json = serde_json::to_string(&file).unwrap();
        let restored: GmmModelFile = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, file);

        let rebuilt = restored.into_classifier().unwrap();
        assert_eq!(rebuilt.primary_label(), "state");
        assert_eq!(rebuilt.unknown_threshold(), -12.5);
        assert_eq!(rebuilt.descriptors(), original.descriptors());
        assert_eq!(rebuilt.models(), original.models());
    }

    #[test]
    fn test_full_precision_floats_survive_json() {
        let mixture = GaussianMixture::new(
            vec![0.33333333333333331, 0.66666666666666674],
            vec![
                GaussianComponent::diagonal(vec![1.8923499205974945, -137.04851923380011], vec![0.012345678901234567, 3.0000000000000004])
                    .unwrap(),
                GaussianComponent::diagonal(vec![-0.10000000000000001, 42.424242424242422], vec![1.1102230246251565e-7, 97.531086419753081])
                    .unwrap(),
            ],
        )
        .unwrap();
        let descriptor = FeatureGramConfig::default().build().unwrap();
        let original =
            FixedGmmClassifier::new("state", vec![descriptor], vec![("on".to_string(), mixture)], -7.2345678901234567).unwrap();

        let json = serde_json::to_string(&GmmModelFile::from_classifier(&original).unwrap()).unwrap();
        let rebuilt = serde_json::from_str::<GmmModelFile>(&json).unwrap().into_classifier().unwrap();

        assert_eq!(rebuilt.models(), original.models());
        assert_eq!(rebuilt.unknown_threshold().to_bits(), original.unknown_threshold().to_bits());
        let x = [1.5, -130.0];
        assert_eq!(rebuilt.models()[0].1.density(&x).to_bits(), original.models()[0].1.density(&x).to_bits());
    }

    #[test]
    fn test_infinite_threshold_survives_json() {
        let file = GmmModelFile::from_classifier(&classifier(f64::NEG_INFINITY)).unwrap();
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("\"-inf\""));
        let restored: GmmModelFile = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.unknown_threshold, f64::NEG_INFINITY);
    }

    #[test]
    fn test_hand_built_descriptor_is_rejected() {
        let extractor = Arc::new(MfccExtractor::new(MelConfig::default(), 13).unwrap());
        let descriptor = FeatureGramDescriptor::new(40.0, 20.0, extractor, None).unwrap();
        let mixture = classifier(0.0).models()[0].1.clone();
        let c = FixedGmmClassifier::new("state", vec![descriptor], vec![("on".to_string(), mixture)], 0.0).unwrap();
        assert!(matches!(
            GmmModelFile::from_classifier(&c),
            Err(ClassifierError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_classifier(&classifier(-3.0), &path).unwrap();
        let loaded = load_classifier(&path).unwrap();
        assert_eq!(loaded.unknown_threshold(), -3.0);
        assert_eq!(loaded.label_values().collect::<Vec<_>>(), vec!["on"]);
    }
}
