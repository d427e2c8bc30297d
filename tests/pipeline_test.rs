// tests/pipeline_test.rs
//
// Feature-gram extraction with the real extractors, caching, and corpus
// normalization.

mod test_utils;

use std::sync::Arc;

use audioclassr::config::{ClassifierConfig, ConfigPreset};
use audioclassr::core::features::FeatureGramCache;
use audioclassr::{FeatureGramConfig, FeatureGramPipeline, FeatureNormalizer, Signal};
use test_utils::{noise, sine, sine_signal};

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn mfcc_gram_shape() {
    let descriptor = FeatureGramConfig::default().build().unwrap();
    let signal = sine_signal(440.0, 16000.0, 1.0);
    let gram = FeatureGramPipeline::uncached().extract_one(&signal, &descriptor).unwrap();

    // 640-sample windows every 320 samples
    assert_eq!(gram.len(), 49);
    assert_eq!(gram.feature_len(), Some(13));
    assert!(gram.iter().all(|f| f.values().iter().all(|v| v.is_finite())));

    let times: Vec<f64> = gram.iter().map(|f| f.start_msec()).collect();
    assert_eq!(times[0], 0.0);
    assert!((times[1] - 20.0).abs() < 1e-9);
    assert!((gram.features()[0].end_msec() - 40.0).abs() < 1e-9);
}

#[test]
fn log_mel_with_deltas_triples_the_dimension() {
    let config = ClassifierConfig::from_preset(ConfigPreset::LogMel);
    let descriptor = config.descriptor().unwrap();
    let signal = Signal::new(noise(22050, 0.3, 5), 44100.0, 0.0).unwrap();
    let gram = FeatureGramPipeline::uncached().extract_one(&signal, &descriptor).unwrap();

    assert_eq!(gram.len(), 24);
    assert_eq!(gram.feature_len(), Some(120));
}

#[test]
fn signal_shorter_than_a_window_has_no_features() {
    let descriptor = FeatureGramConfig::default().build().unwrap();
    let signal = Signal::new(sine(440.0, 16000.0, 0.01), 16000.0, 0.0).unwrap();
    let gram = FeatureGramPipeline::uncached().extract_one(&signal, &descriptor).unwrap();
    assert!(gram.is_empty());
}

#[test]
fn sequential_and_parallel_extraction_agree() {
    let descriptor = FeatureGramConfig::default().build().unwrap();
    let signal = Signal::new(noise(44100 * 2, 0.5, 9), 44100.0, 0.0).unwrap();
    let parallel = FeatureGramPipeline::uncached().extract_one(&signal, &descriptor).unwrap();
    let sequential = FeatureGramPipeline::uncached()
        .sequential()
        .extract_one(&signal, &descriptor)
        .unwrap();
    assert_eq!(parallel, sequential);
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn cached_extraction_matches_uncached() {
    let cache = Arc::new(FeatureGramCache::new());
    let pipeline = FeatureGramPipeline::with_cache(Arc::clone(&cache));
    let mfcc = FeatureGramConfig::default().build().unwrap();
    let log_mel = ClassifierConfig::from_preset(ConfigPreset::LogMel).descriptor().unwrap();
    let signal = sine_signal(1000.0, 22050.0, 0.5);

    let first = pipeline.extract(&signal, &[mfcc.clone(), log_mel.clone()]).unwrap();
    let second = pipeline.extract(&signal, &[mfcc.clone(), log_mel]).unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.processed_stats().hits, 2);
    assert_eq!(cache.processed_stats().misses, 2);

    let uncached = FeatureGramPipeline::uncached().extract_one(&signal, &mfcc).unwrap();
    assert_eq!(first[0], uncached);

    // Same samples under a new signal id share the entry
    let copy = Signal::new(signal.samples().to_vec(), 22050.0, 0.0).unwrap();
    pipeline.extract_one(&copy, &mfcc).unwrap();
    assert_eq!(cache.processed_stats().hits, 3);
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn normalizer_preserves_shape_and_centers_columns() {
    let descriptors = [
        FeatureGramConfig::default().build().unwrap(),
        ClassifierConfig::from_preset(ConfigPreset::LogMel).descriptor().unwrap(),
    ];
    let pipeline = FeatureGramPipeline::uncached();
    let corpus: Vec<Vec<_>> = [220.0, 440.0, 880.0]
        .iter()
        .map(|&f| pipeline.extract(&sine_signal(f, 16000.0, 0.5), &descriptors).unwrap())
        .collect();

    let normalizer = FeatureNormalizer::fit(corpus.iter().map(|g| g.as_slice())).unwrap();
    assert_eq!(normalizer.positions().len(), 2);
    assert_eq!(normalizer.positions()[0].mean.len(), 13);
    assert_eq!(normalizer.positions()[1].mean.len(), 120);

    let mut column_sum = vec![0.0; 13];
    let mut count = 0.0;
    for grams in &corpus {
        let normalized = normalizer.normalize(grams).unwrap();
        assert_eq!(normalized.len(), grams.len());
        for (n, g) in normalized.iter().zip(grams) {
            assert_eq!(n.len(), g.len());
            assert_eq!(n.feature_len(), g.feature_len());
        }
        for f in &normalized[0] {
            for (s, v) in column_sum.iter_mut().zip(f.values()) {
                *s += v;
            }
            count += 1.0;
        }
    }
    assert!(column_sum.iter().all(|s| (s / count).abs() < 1e-6));

    assert!(normalizer.normalize(&corpus[0][..1]).is_err());
}
