use crate::error::{AutocapError, AutocapResult};
use crate::transcript::Word;
use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::vec::IntoIter;

/// Default number of tokens a caption grows to before it restarts.
pub const DEFAULT_MAX_PHRASE_WORDS: usize = 10;

/// A caption phrase and the window during which it is visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionChunk {
    pub start_time: f64,
    pub end_time: f64,
    pub display_text: String,
}

/// How the final chunk's end time is derived, since no next word exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LastChunkEnd {
    /// Hold the last caption until this time (the base media duration).
    /// Never ends before the chunk starts.
    HoldUntil(f64),
    /// End the last caption at its own start time.
    ZeroLength,
}

impl LastChunkEnd {
    fn resolve(self, start_time: f64) -> f64 {
        match self {
            LastChunkEnd::HoldUntil(end) if end.is_finite() => end.max(start_time),
            _ => start_time,
        }
    }
}

/// Lazily folds an ordered word stream into rolling caption chunks.
///
/// Emits exactly one chunk per word. The phrase grows by one word per chunk
/// until it holds `max_phrase_words` tokens; the next word then restarts it.
pub struct Normalizer {
    words: Peekable<IntoIter<Word>>,
    max_phrase_words: usize,
    last_chunk_end: LastChunkEnd,
    phrase: String,
    phrase_tokens: usize,
}

impl Normalizer {
    /// Validate and order `words`. Fails on an empty list, a non-finite or
    /// negative timestamp, or a word with no text.
    pub fn new(
        words: Vec<Word>,
        max_phrase_words: usize,
        last_chunk_end: LastChunkEnd,
    ) -> AutocapResult<Self> {
        if max_phrase_words == 0 {
            return Err(AutocapError::config(
                "max_phrase_words",
                "must be at least 1",
            ));
        }
        let words = validate_words(words)?;
        Ok(Self {
            words: words.into_iter().peekable(),
            max_phrase_words,
            last_chunk_end,
            phrase: String::new(),
            phrase_tokens: 0,
        })
    }
}

impl Iterator for Normalizer {
    type Item = CaptionChunk;

    fn next(&mut self) -> Option<CaptionChunk> {
        let word = self.words.next()?;

        if self.phrase_tokens >= self.max_phrase_words {
            self.phrase.clear();
            self.phrase_tokens = 0;
        }
        if !self.phrase.is_empty() {
            self.phrase.push(' ');
        }
        self.phrase.push_str(&word.text);
        self.phrase_tokens += word.text.split_whitespace().count();

        let end_time = match self.words.peek() {
            Some(next) => next.start_time,
            None => self.last_chunk_end.resolve(word.start_time),
        };

        Some(CaptionChunk {
            start_time: word.start_time,
            end_time,
            display_text: self.phrase.clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.words.size_hint()
    }
}

/// Fold `words` into caption chunks. See [`Normalizer`].
pub fn normalize(
    words: Vec<Word>,
    max_phrase_words: usize,
    last_chunk_end: LastChunkEnd,
) -> AutocapResult<Vec<CaptionChunk>> {
    Ok(Normalizer::new(words, max_phrase_words, last_chunk_end)?.collect())
}

fn validate_words(words: Vec<Word>) -> AutocapResult<Vec<Word>> {
    if words.is_empty() {
        return Err(AutocapError::InvalidTranscript(
            "transcript contains no words".into(),
        ));
    }

    let mut validated = Vec::with_capacity(words.len());
    for (i, word) in words.into_iter().enumerate() {
        if !word.start_time.is_finite() || word.start_time < 0.0 {
            return Err(AutocapError::InvalidTranscript(format!(
                "word {i} (\"{}\") has invalid start time {}",
                word.text, word.start_time
            )));
        }
        let text = word.text.trim();
        if text.is_empty() {
            return Err(AutocapError::InvalidTranscript(format!(
                "word {i} at {:.3}s has no text",
                word.start_time
            )));
        }
        validated.push(Word::new(word.start_time, text));
    }

    // Stable: equal timestamps keep their input order.
    validated.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    Ok(validated)
}

/// Validate caller-supplied chunks that bypass normalization, returning them in start order.
pub fn validate_chunks(chunks: Vec<CaptionChunk>) -> AutocapResult<Vec<CaptionChunk>> {
    if chunks.is_empty() {
        return Err(AutocapError::InvalidTranscript(
            "caption list is empty".into(),
        ));
    }

    let mut validated = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.into_iter().enumerate() {
        let times_ok = chunk.start_time.is_finite()
            && chunk.end_time.is_finite()
            && chunk.start_time >= 0.0
            && chunk.end_time >= chunk.start_time;
        if !times_ok {
            return Err(AutocapError::InvalidTranscript(format!(
                "caption {i} has invalid window {} -> {}",
                chunk.start_time, chunk.end_time
            )));
        }
        let text = chunk.display_text.trim();
        if text.is_empty() {
            return Err(AutocapError::InvalidTranscript(format!(
                "caption {i} at {:.3}s has no text",
                chunk.start_time
            )));
        }
        validated.push(CaptionChunk {
            display_text: text.to_string(),
            ..chunk
        });
    }

    validated.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    Ok(validated)
}
