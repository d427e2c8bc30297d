// src/core/features/pipeline.rs
//
// Signal -> feature gram extraction: sub-window segmentation, per-window
// extraction (parallel when there are many windows), one processor pass,
// and optional memoization.

use log::debug;
use rayon::prelude::*;
use std::sync::Arc;

use super::cache::{CacheKey, FeatureGramCache};
use super::descriptor::FeatureGramDescriptor;
use super::signal::{Feature, FeatureGram, Fingerprint, LabeledFeatureGram, LabeledSignal, Signal};
use crate::error::{ClassifierError, Result};

#[derive(Debug, Clone)]
enum CacheMode {
    /// Use the process-wide cache when it is globally enabled
    Global,
    Disabled,
    Explicit(Arc<FeatureGramCache>),
}

/// Extracts feature grams from signals
#[derive(Debug, Clone)]
pub struct FeatureGramPipeline {
    cache: CacheMode,
    parallel: bool,
}

impl Default for FeatureGramPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureGramPipeline {
    /// Pipeline consulting the process-wide cache (disabled unless
    /// `FeatureGramCache::set_global_enabled(true)` was called)
    pub fn new() -> Self {
        Self {
            cache: CacheMode::Global,
            parallel: true,
        }
    }

    pub fn uncached() -> Self {
        Self {
            cache: CacheMode::Disabled,
            parallel: true,
        }
    }

    pub fn with_cache(cache: Arc<FeatureGramCache>) -> Self {
        Self {
            cache: CacheMode::Explicit(cache),
            parallel: true,
        }
    }

    /// Never fan sub-window extraction out to the thread pool
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    fn active_cache(&self) -> Option<Arc<FeatureGramCache>> {
        match &self.cache {
            CacheMode::Global if FeatureGramCache::global_enabled() => Some(FeatureGramCache::global()),
            CacheMode::Global | CacheMode::Disabled => None,
            CacheMode::Explicit(cache) => Some(Arc::clone(cache)),
        }
    }

    /// One feature gram per descriptor, in descriptor order
    pub fn extract(&self, signal: &Signal, descriptors: &[FeatureGramDescriptor]) -> Result<Vec<FeatureGram>> {
        let cache = self.active_cache();
        let fingerprint = cache.as_ref().map(|_| signal.fingerprint());
        descriptors
            .iter()
            .map(|d| self.extract_with(signal, d, cache.as_deref(), fingerprint))
            .collect()
    }

    pub fn extract_one(&self, signal: &Signal, descriptor: &FeatureGramDescriptor) -> Result<FeatureGram> {
        let cache = self.active_cache();
        let fingerprint = cache.as_ref().map(|_| signal.fingerprint());
        self.extract_with(signal, descriptor, cache.as_deref(), fingerprint)
    }

    /// Like `extract`, copying the signal's labels onto every gram
    pub fn extract_labeled(
        &self,
        signal: &LabeledSignal,
        descriptors: &[FeatureGramDescriptor],
    ) -> Result<Vec<LabeledFeatureGram>> {
        Ok(self
            .extract(&signal.signal, descriptors)?
            .into_iter()
            .map(|gram| LabeledFeatureGram::new(gram, signal.labels.clone()))
            .collect())
    }

    fn extract_with(
        &self,
        signal: &Signal,
        descriptor: &FeatureGramDescriptor,
        cache: Option<&FeatureGramCache>,
        fingerprint: Option<Fingerprint>,
    ) -> Result<FeatureGram> {
        let (cache, fingerprint) = match (cache, fingerprint) {
            (Some(c), Some(fp)) => (c, fp),
            _ => return self.compute(signal, descriptor),
        };

        let key = CacheKey::new(descriptor.identity(), fingerprint);
        let gram = cache.processed.get_or_try_insert_with(key, || {
            let raw_key = CacheKey::new(descriptor.extraction_identity(), fingerprint);
            let raw = cache
                .unprocessed
                .get_or_try_insert_with(raw_key, || Ok(Arc::new(self.extract_windows(signal, descriptor)?)))?;
            Ok(Arc::new(self.process(&raw, descriptor)?))
        })?;

        Ok(gram.as_ref().clone())
    }

    fn compute(&self, signal: &Signal, descriptor: &FeatureGramDescriptor) -> Result<FeatureGram> {
        let raw = self.extract_windows(signal, descriptor)?;
        self.process(&raw, descriptor)
    }

    fn process(&self, raw: &[Feature], descriptor: &FeatureGramDescriptor) -> Result<FeatureGram> {
        let gram = match descriptor.processor() {
            Some(processor) if !raw.is_empty() => FeatureGram::new(processor.apply(raw)?),
            _ => FeatureGram::new(raw.to_vec()),
        };
        gram.check_uniform("feature gram")?;
        Ok(gram)
    }

    fn extract_windows(&self, signal: &Signal, descriptor: &FeatureGramDescriptor) -> Result<Vec<Feature>> {
        let offsets = segment(signal, descriptor)?;
        let window_len = match offsets.first() {
            Some(&(_, len)) => len,
            None => return Ok(Vec::new()),
        };
        let extractor = descriptor.extractor();

        let extract_at = |&(offset, len): &(usize, usize)| -> Result<Feature> {
            if offset == 0 && len == signal.len() {
                extractor.extract(signal)
            } else {
                extractor.extract(&signal.sub_signal(offset, len)?)
            }
        };

        if self.parallel && offsets.len() > 2 * rayon::current_num_threads() {
            debug!("extracting {} windows of {} samples in parallel", offsets.len(), window_len);
            offsets.par_iter().map(extract_at).collect()
        } else {
            offsets.iter().map(extract_at).collect()
        }
    }
}

/// (offset, length) in samples of each sub-window
pub fn segment(signal: &Signal, descriptor: &FeatureGramDescriptor) -> Result<Vec<(usize, usize)>> {
    if descriptor.window_size_msec() == 0.0 {
        return Ok(vec![(0, signal.len())]);
    }

    let rate = signal.sample_rate();
    let window_len = (descriptor.window_size_msec() * rate / 1000.0).round() as usize;
    if window_len == 0 {
        return Err(ClassifierError::invalid(format!(
            "{} ms window is shorter than one sample at {} Hz",
            descriptor.window_size_msec(),
            rate
        )));
    }
    let hop = ((descriptor.window_shift_msec() * rate / 1000.0).round() as usize).max(1);

    let mut offsets = Vec::new();
    let mut offset = 0usize;
    while offset + window_len <= signal.len() {
        offsets.push((offset, window_len));
        offset += hop;
    }
    Ok(offsets)
}
