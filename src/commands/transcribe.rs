use crate::caption;
use crate::config::{self, ConfigOverrides};
use crate::error::{AutocapError, AutocapResult};
use crate::render::{self, FfmpegBackend};
use crate::subtitle;
use crate::transcript::{self, Word};
use clap::ValueEnum;
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Output format of the `transcribe` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TranscriptFormat {
    /// Word list, reusable with `render --words`
    Json,
    /// Rolling captions as SubRip
    Srt,
}

/// Format a transcript. SRT output runs the words through the normalizer first.
fn format_transcript(
    words: Vec<Word>,
    format: TranscriptFormat,
    max_phrase_words: usize,
    last_chunk_end: caption::LastChunkEnd,
) -> AutocapResult<String> {
    match format {
        TranscriptFormat::Json => serde_json::to_string_pretty(&words)
            .map_err(|e| AutocapError::Other(format!("Failed to serialize transcript: {e}"))),
        TranscriptFormat::Srt => {
            let chunks = caption::normalize(words, max_phrase_words, last_chunk_end)?;
            Ok(subtitle::to_srt(&chunks))
        }
    }
}

/// CLI entry point: transcribe `video` and print or save the result.
pub async fn run(
    video: &Path,
    config_path: Option<&Path>,
    language: Option<String>,
    max_words: Option<usize>,
    format: TranscriptFormat,
    output: Option<PathBuf>,
) -> AutocapResult<()> {
    let mut app_config = config::load_config(config_path)?;
    app_config.apply_overrides(&ConfigOverrides {
        language,
        max_phrase_words: max_words,
        ..Default::default()
    });
    let settings = app_config.validate()?;

    let backend = FfmpegBackend::new(&settings.tools);
    let info = render::open_media(&backend, video)?;

    eprintln!(
        "{} {} ({:.1}s) via {}, language={}",
        "transcribe:".cyan().bold(),
        video.display(),
        info.duration,
        app_config.transcription.provider,
        settings.transcription.options.language,
    );

    let provider = Arc::from(transcript::create_provider(&app_config.transcription)?);
    let words = render::fetch_words(&settings, video, provider).await?;
    let word_count = words.len();

    let text = format_transcript(
        words,
        format,
        settings.max_phrase_words,
        settings.last_chunk_end.resolve(info.duration),
    )?;

    match output {
        Some(path) => {
            std::fs::write(&path, &text)?;
            eprintln!(
                "{} {} word(s) → {}",
                "done:".green().bold(),
                word_count,
                path.display()
            );
        }
        None => println!("{text}"),
    }

    Ok(())
}
