// src/cli/args.rs
//
// Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "audioclassr", version)]
#[command(about = "Train and apply Gaussian-mixture classifiers for audio recordings")]
pub struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Memoize feature extraction across descriptors and files
    #[arg(long, global = true, env = "AUDIOCLASSR_CACHE")]
    pub cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train a classifier from a directory with one subdirectory per label value
    Train {
        /// Training directory; each subdirectory name is the label value of the files inside
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the model file
        #[arg(short, long)]
        output: PathBuf,

        /// JSON configuration file (overrides --preset)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Preset: standard, logmel, detailed
        #[arg(short, long, default_value = "standard")]
        preset: String,

        /// Name of the label being predicted
        #[arg(short, long)]
        label: Option<String>,

        /// Use a fixed unknown threshold instead of the configured one
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f64>,
    },

    /// Classify audio files or directories with a trained model
    Classify {
        /// Model file written by `train`
        #[arg(short, long)]
        model: PathBuf,

        /// Audio files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Show every ranked label value, not just the top one
        #[arg(short, long)]
        all: bool,
    },

    /// Merge models trained with identical feature settings
    Merge {
        /// Where to write the merged model
        #[arg(short, long)]
        output: PathBuf,

        /// Models to merge
        #[arg(required = true, num_args = 2..)]
        models: Vec<PathBuf>,
    },

    /// Describe a model file
    Inspect {
        model: PathBuf,
    },

    /// List the built-in presets
    Presets,
}
