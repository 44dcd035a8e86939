pub mod cache;
pub mod deepgram;

use crate::caption::CaptionChunk;
use crate::config::TranscriptionConfig;
use crate::error::{AutocapError, AutocapResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single spoken word and the time it starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    #[serde(alias = "start")]
    pub start_time: f64,
    #[serde(alias = "word")]
    pub text: String,
}

impl Word {
    pub fn new(start_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            text: text.into(),
        }
    }
}

/// Options forwarded to the transcription provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscribeOptions {
    pub punctuate: bool,
    pub language: String,
}

/// Trait for pluggable speech-to-text backends.
///
/// Implementations are synchronous; the render pipeline runs them on a
/// blocking task and awaits the result once.
pub trait TranscriptionProvider: Send + Sync {
    fn transcribe(
        &self,
        media: &[u8],
        mime_type: &str,
        options: &TranscribeOptions,
    ) -> AutocapResult<Vec<Word>>;

    fn provider_name(&self) -> &str;
}

/// Factory: create a provider from the `[transcription]` config section.
pub fn create_provider(config: &TranscriptionConfig) -> AutocapResult<Box<dyn TranscriptionProvider>> {
    match config.provider.as_str() {
        "deepgram" => Ok(Box::new(deepgram::DeepgramProvider::new()?)),
        other => Err(AutocapError::config(
            "provider",
            format!("unknown transcription provider '{other}'. Supported: deepgram"),
        )),
    }
}

/// Guess the upload mime type from the media file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

/// One entry of a caller-supplied word file: either an object or a `[seconds, "text"]` pair.
#[derive(Deserialize)]
#[serde(untagged)]
enum WordRecord {
    Object(Word),
    Pair(f64, String),
}

/// Load a caller-supplied word list from a JSON file.
pub fn load_words(path: &Path) -> AutocapResult<Vec<Word>> {
    let content = std::fs::read_to_string(path)?;
    parse_words(&content)
        .map_err(|e| AutocapError::InvalidTranscript(format!("{}: {e}", path.display())))
}

fn parse_words(json: &str) -> Result<Vec<Word>, serde_json::Error> {
    let records: Vec<WordRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| match r {
            WordRecord::Object(w) => w,
            WordRecord::Pair(start_time, text) => Word { start_time, text },
        })
        .collect())
}

/// Load pre-built caption chunks from a JSON file.
pub fn load_captions(path: &Path) -> AutocapResult<Vec<CaptionChunk>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AutocapError::InvalidTranscript(format!("{}: {e}", path.display())))
}
