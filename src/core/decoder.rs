// src/core/decoder.rs
//
// Audio file decoding into mono signals. Uses Symphonia so any container
// it supports (WAV, FLAC, MP3, OGG, ...) can feed training and
// classification.

use log::debug;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::core::features::Signal;
use crate::error::{ClassifierError, Result};

/// File extensions accepted when scanning directories
pub const AUDIO_EXTENSIONS: [&str; 6] = ["wav", "flac", "mp3", "ogg", "m4a", "aac"];

fn decode_err(path: &Path, what: impl std::fmt::Display) -> ClassifierError {
    ClassifierError::Decode(format!("{}: {}", path.display(), what))
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode `path`, average all channels and return a signal starting at 0 ms
pub fn decode_signal(path: &Path) -> Result<Signal> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_err(path, format!("unrecognized format ({})", e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err(path, "no supported audio track"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_err(path, "sample rate not specified"))?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    if channels == 0 {
        return Err(decode_err(path, "file reports 0 audio channels"));
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(path, e))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(decode_err(path, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("skipping undecodable packet in {}: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(decode_err(path, e)),
        };

        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, *decoded.spec()));
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    if interleaved.is_empty() {
        return Err(decode_err(path, "no audio samples decoded"));
    }

    let mono = downmix(&interleaved, channels);
    debug!(
        "decoded {} ({} Hz, {} channel(s), {} frames)",
        path.display(),
        sample_rate,
        channels,
        mono.len()
    );
    Signal::new(mono, sample_rate as f64, 0.0)
}

/// Average interleaved channels into one
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f64> {
    if channels <= 1 {
        return interleaved.iter().map(|&s| s as f64).collect();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| s as f64).sum::<f64>() / channels as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_downmix() {
        let mono = downmix(&[0.5, -0.5, 0.25, 0.75], 2);
        assert_eq!(mono, vec![0.0, 0.5]);
        assert_eq!(downmix(&[0.5, 0.25], 1), vec![0.5, 0.25]);
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(&PathBuf::from("clip.WAV")));
        assert!(is_audio_file(&PathBuf::from("a/b/c.flac")));
        assert!(!is_audio_file(&PathBuf::from("model.json")));
        assert!(!is_audio_file(&PathBuf::from("noext")));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            decode_signal(&PathBuf::from("/nonexistent/clip.wav")),
            Err(ClassifierError::Io(_))
        ));
    }
}
