//! Output formatting for CLI results

use colorful::Colorful;
use serde::Serialize;
use std::path::Path;

use crate::classification::{Classification, ConfidenceLevel};
use crate::persistence::GmmModelFile;

/// One classified file, as printed by `classify --json`
#[derive(Debug, Serialize)]
pub struct FileResult<'a> {
    pub file: String,
    #[serde(flatten)]
    pub classification: &'a Classification,
}

/// Format a classification for terminal output
pub fn format_classification(path: &Path, result: &Classification, show_all: bool) -> String {
    let mut output = String::new();

    let top = match result.top() {
        Some(top) => top,
        None => return format!("{} {}\n", "?".dark_gray(), path.display()),
    };

    let headline = format!("{} {}", top.level().symbol(), top.value);
    let headline = if result.is_undefined() {
        headline.dark_gray().to_string()
    } else {
        match top.level() {
            ConfidenceLevel::High => headline.green().to_string(),
            ConfidenceLevel::Medium => headline.yellow().to_string(),
            ConfidenceLevel::Low => headline.red().to_string(),
        }
    };

    output.push_str(&format!(
        "{}  {}={} ({:.0}%)\n",
        path.display().to_string().cyan(),
        result.label_name,
        headline,
        top.confidence * 100.0
    ));

    if show_all {
        for candidate in result.ranked.iter().skip(1) {
            output.push_str(&format!("    {:<20} {:>5.1}%\n", candidate.value, candidate.confidence * 100.0));
        }
        output.push_str(&format!(
            "    {}\n",
            format!("pooled log density: {:.3}", result.pooled_log_density).dark_gray()
        ));
    }

    output
}

pub fn print_classification(path: &Path, result: &Classification, show_all: bool) {
    print!("{}", format_classification(path, result, show_all));
}

/// Format classification results as a JSON array
pub fn format_json(results: &[FileResult<'_>]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}

/// Human-readable description of a model file
pub fn format_model_summary(model: &GmmModelFile) -> String {
    let mut output = String::new();
    output.push_str(&format!("{}\n", format!("Model for '{}'", model.primary_label).bold()));
    output.push_str(&format!("  Trained:           {}\n", model.trained_at.format("%Y-%m-%d %H:%M:%S UTC")));
    output.push_str(&format!("  Unknown threshold: {}\n", model.unknown_threshold));

    for (i, fg) in model.feature_grams.iter().enumerate() {
        let mel = fg.extractor.mel();
        output.push_str(&format!(
            "  Feature gram {}:    {:.0} ms windows every {:.0} ms, {} mel bands {:.0}-{:.0} Hz at {:.0} Hz ({})\n",
            i,
            fg.window_size_msec,
            fg.window_shift_msec,
            mel.num_bands,
            mel.min_freq_hz,
            mel.max_freq_hz,
            mel.spectrum.target_sampling_rate,
            mel.spectrum.window.name()
        ));
    }

    output.push_str(&format!("  Label values ({}):\n", model.labels.len()));
    for label in &model.labels {
        output.push_str(&format!(
            "    {:<20} {} components, dim {}\n",
            label.value,
            label.mixture.len(),
            label.mixture.dim().unwrap_or(0)
        ));
    }
    output
}
