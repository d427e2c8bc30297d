// src/cli/mod.rs
//
// Command-line interface: training from labeled directories, batch
// classification, model merging and inspection.

mod args;
mod output;

pub use args::{Cli, Command};
pub use output::{format_classification, format_json, format_model_summary, print_classification, FileResult};

use anyhow::{bail, Context, Result};
use colorful::Colorful;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{ClassifierConfig, ConfigPreset};
use crate::core::decoder::{decode_signal, is_audio_file};
use crate::core::features::{FeatureGramCache, FeatureGramPipeline, LabeledSignal};
use crate::core::gmm::{FixedGmmClassifier, UnknownThreshold};
use crate::persistence::{load_classifier, GmmModelFile};

/// Run a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    if cli.cache {
        FeatureGramCache::set_global_enabled(true);
    }

    match cli.command {
        Command::Train {
            input,
            output,
            config,
            preset,
            label,
            threshold,
        } => {
            let mut config = match config {
                Some(path) => ClassifierConfig::load(&path)
                    .with_context(|| format!("reading configuration {}", path.display()))?,
                None => {
                    let preset = ConfigPreset::from_name(&preset)
                        .with_context(|| format!("unknown preset '{}'", preset))?;
                    ClassifierConfig::from_preset(preset)
                }
            };
            if let Some(label) = label {
                config.primary_label = label;
            }
            if let Some(t) = threshold {
                config.model.unknown_threshold = UnknownThreshold::Fixed(t);
            }
            if cli.cache {
                config.cache_enabled = true;
            }
            train(&input, &output, &config)
        }
        Command::Classify {
            model,
            inputs,
            json,
            all,
        } => classify(&model, &inputs, json, all),
        Command::Merge { output, models } => merge(&output, &models),
        Command::Inspect { model } => {
            let file = GmmModelFile::load(&model).with_context(|| format!("reading model {}", model.display()))?;
            print!("{}", format_model_summary(&file));
            Ok(())
        }
        Command::Presets => {
            for preset in ConfigPreset::all() {
                println!("{:<10} {}", format!("{:?}", preset).to_lowercase(), preset.description());
            }
            Ok(())
        }
    }
}

/// Audio files under `path` (or `path` itself), sorted for stable ordering
pub fn collect_audio_files(path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = if path.is_file() {
        vec![path.to_path_buf()].into_iter().filter(|p| is_audio_file(p)).collect()
    } else {
        WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_audio_file(p))
            .collect()
    };
    files.sort();
    files
}

/// Pair every audio file below `root` with the name of its top-level
/// subdirectory, which becomes the value of `label`.
pub fn collect_training_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut pairs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("scanning {}", root.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let value = entry.file_name().to_string_lossy().to_string();
        for file in collect_audio_files(entry.path()) {
            pairs.push((value.clone(), file));
        }
    }
    Ok(pairs)
}

fn progress_bar(len: usize, what: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({eta})") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(what.to_string());
    bar
}

fn train(input: &Path, output: &Path, config: &ClassifierConfig) -> Result<()> {
    config.apply_cache_setting();

    let pairs = collect_training_files(input)?;
    if pairs.is_empty() {
        bail!("no audio files found in label subdirectories of {}", input.display());
    }
    println!("Found {} training file(s)", pairs.len());

    let bar = progress_bar(pairs.len(), "decoding");
    let signals: Vec<LabeledSignal> = pairs
        .par_iter()
        .progress_with(bar)
        .filter_map(|(value, path)| match decode_signal(path) {
            Ok(signal) => Some(LabeledSignal::new(signal).with_label(config.primary_label.clone(), value.clone())),
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    if signals.is_empty() {
        bail!("none of the training files could be decoded");
    }

    let descriptor = config.descriptor().context("building feature gram descriptor")?;
    let pipeline = FeatureGramPipeline::new();
    let classifier = config
        .trainer()
        .train_signals(&config.primary_label, descriptor, &signals, &pipeline)
        .context("training classifier")?;

    let file = GmmModelFile::from_classifier(&classifier)?;
    file.save(output)
        .with_context(|| format!("writing model {}", output.display()))?;

    println!(
        "{} {} label values for '{}' written to {}",
        "✓".green(),
        file.labels.len(),
        file.primary_label,
        output.display()
    );
    Ok(())
}

fn classify(model: &Path, inputs: &[PathBuf], json: bool, show_all: bool) -> Result<()> {
    let classifier = load_classifier(model).with_context(|| format!("loading model {}", model.display()))?;
    let files: Vec<PathBuf> = inputs.iter().flat_map(|p| collect_audio_files(p)).collect();
    if files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }
    info!("classifying {} files", files.len());

    // Windows inside each file are already extracted in parallel
    let pipeline = FeatureGramPipeline::new();
    let mut results = Vec::with_capacity(files.len());
    for path in &files {
        let outcome = decode_signal(path)
            .map_err(anyhow::Error::from)
            .and_then(|signal| Ok(classifier.classify_signal(&signal, &pipeline)?));
        match outcome {
            Ok(result) => {
                if !json {
                    print_classification(path, &result, show_all);
                }
                results.push((path.display().to_string(), result));
            }
            Err(e) => eprintln!("{} {}: {:#}", "✗".red(), path.display(), e),
        }
    }

    if json {
        let rows: Vec<FileResult<'_>> = results
            .iter()
            .map(|(file, classification)| FileResult {
                file: file.clone(),
                classification,
            })
            .collect();
        println!("{}", format_json(&rows)?);
    }
    Ok(())
}

fn merge(output: &Path, models: &[PathBuf]) -> Result<()> {
    let loaded = models
        .iter()
        .map(|p| load_classifier(p).with_context(|| format!("loading model {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&FixedGmmClassifier> = loaded.iter().collect();
    let merged = FixedGmmClassifier::merge(&refs).context("merging models")?;

    GmmModelFile::from_classifier(&merged)?
        .save(output)
        .with_context(|| format!("writing model {}", output.display()))?;
    println!(
        "{} merged {} models into {} ({} label values)",
        "✓".green(),
        models.len(),
        output.display(),
        merged.models().len()
    );
    Ok(())
}
