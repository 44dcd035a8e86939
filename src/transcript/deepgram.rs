use crate::error::{AutocapError, AutocapResult};
use crate::transcript::{TranscribeOptions, TranscriptionProvider, Word};
use serde::Deserialize;
use tracing::debug;

const API_BASE: &str = "https://api.deepgram.com/v1";

/// Speech-to-text via the Deepgram pre-recorded API.
///
/// Requires `DEEPGRAM_KEY` (or `DEEPGRAM_API_KEY`) in the environment.
/// Uploads the whole media file in one `POST /v1/listen` request.
#[derive(Debug)]
pub struct DeepgramProvider {
    api_key: String,
}

impl DeepgramProvider {
    pub fn new() -> AutocapResult<Self> {
        let api_key = std::env::var("DEEPGRAM_KEY")
            .or_else(|_| std::env::var("DEEPGRAM_API_KEY"))
            .map_err(|_| {
                AutocapError::TranscriptionService(
                    "DEEPGRAM_KEY env var not set. Get an API key from https://console.deepgram.com"
                        .into(),
                )
            })?;

        if api_key.trim().is_empty() {
            return Err(AutocapError::TranscriptionService(
                "DEEPGRAM_KEY env var is empty".into(),
            ));
        }

        Ok(Self { api_key })
    }
}

impl TranscriptionProvider for DeepgramProvider {
    fn transcribe(
        &self,
        media: &[u8],
        mime_type: &str,
        options: &TranscribeOptions,
    ) -> AutocapResult<Vec<Word>> {
        let url = listen_url(options);
        debug!(
            "Uploading {} bytes ({}) to Deepgram, language={}",
            media.len(),
            mime_type,
            options.language
        );

        let response = ureq::post(&url)
            .header("Authorization", &format!("Token {}", self.api_key))
            .header("Content-Type", mime_type)
            .send(media)
            .map_err(|e| AutocapError::TranscriptionService(format!("Deepgram request failed: {e}")))?;

        let body = response.into_body().read_to_string().map_err(|e| {
            AutocapError::TranscriptionService(format!("Failed to read Deepgram response: {e}"))
        })?;

        parse_listen_response(&body, options.punctuate)
    }

    fn provider_name(&self) -> &str {
        "deepgram"
    }
}

fn listen_url(options: &TranscribeOptions) -> String {
    format!(
        "{API_BASE}/listen?punctuate={}&language={}",
        options.punctuate, options.language
    )
}

#[derive(Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Deserialize)]
struct ListenResults {
    channels: Vec<ListenChannel>,
}

#[derive(Deserialize)]
struct ListenChannel {
    alternatives: Vec<ListenAlternative>,
}

#[derive(Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    words: Vec<ListenWord>,
}

#[derive(Deserialize)]
struct ListenWord {
    word: String,
    start: f64,
    #[serde(default)]
    punctuated_word: Option<String>,
}

/// Extract the first channel's best alternative as a word list.
fn parse_listen_response(json: &str, punctuate: bool) -> AutocapResult<Vec<Word>> {
    let parsed: ListenResponse = serde_json::from_str(json).map_err(|e| {
        AutocapError::TranscriptionService(format!("Unexpected Deepgram response: {e}"))
    })?;

    let alternative = parsed
        .results
        .channels
        .into_iter()
        .next()
        .and_then(|c| c.alternatives.into_iter().next())
        .ok_or_else(|| {
            AutocapError::TranscriptionService("Deepgram response contained no alternatives".into())
        })?;

    Ok(alternative
        .words
        .into_iter()
        .map(|w| {
            let text = match w.punctuated_word {
                Some(p) if punctuate => p,
                _ => w.word,
            };
            Word::new(w.start, text)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "metadata": {"request_id": "abc"},
        "results": {
            "channels": [{
                "alternatives": [{
                    "transcript": "hello world",
                    "confidence": 0.98,
                    "words": [
                        {"word": "hello", "start": 0.08, "end": 0.4, "confidence": 0.99, "punctuated_word": "Hello"},
                        {"word": "world", "start": 0.48, "end": 0.9, "confidence": 0.97, "punctuated_word": "world."}
                    ]
                }]
            }]
        }
    }"#;

    #[test]
    fn test_parse_punctuated() {
        let words = parse_listen_response(RESPONSE, true).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0], Word::new(0.08, "Hello"));
        assert_eq!(words[1].text, "world.");
    }

    #[test]
    fn test_parse_raw_words() {
        let words = parse_listen_response(RESPONSE, false).unwrap();
        assert_eq!(words[0].text, "hello");
        assert_eq!(words[1].text, "world");
    }

    #[test]
    fn test_parse_no_channels() {
        let err = parse_listen_response(r#"{"results": {"channels": []}}"#, true).unwrap_err();
        assert!(matches!(err, AutocapError::TranscriptionService(_)));
    }

    #[test]
    fn test_parse_silence_yields_no_words() {
        let json = r#"{"results": {"channels": [{"alternatives": [{"transcript": ""}]}]}}"#;
        let words = parse_listen_response(json, true).unwrap();
        assert!(words.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_listen_response("<html>bad gateway</html>", true).unwrap_err();
        assert!(err.to_string().contains("Unexpected Deepgram response"));
    }

    #[test]
    fn test_listen_url() {
        let url = listen_url(&TranscribeOptions {
            punctuate: true,
            language: "en-US".into(),
        });
        assert_eq!(url, "https://api.deepgram.com/v1/listen?punctuate=true&language=en-US");
    }

    #[test]
    fn test_new_missing_env_var() {
        let prev = std::env::var("DEEPGRAM_KEY").ok();
        let prev_alt = std::env::var("DEEPGRAM_API_KEY").ok();
        std::env::remove_var("DEEPGRAM_KEY");
        std::env::remove_var("DEEPGRAM_API_KEY");

        let result = DeepgramProvider::new();
        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(
            err_msg.contains("DEEPGRAM_KEY"),
            "Error should mention DEEPGRAM_KEY, got: {err_msg}"
        );

        if let Some(val) = prev {
            std::env::set_var("DEEPGRAM_KEY", val);
        }
        if let Some(val) = prev_alt {
            std::env::set_var("DEEPGRAM_API_KEY", val);
        }
    }
}
