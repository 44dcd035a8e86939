use crate::config::{self, ConfigOverrides};
use crate::error::AutocapResult;
use crate::overlay::browser::BrowserRasterizer;
use crate::render::{self, FfmpegBackend, MediaBackend, TranscriptSource};
use crate::subtitle;
use crate::transcript;
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Inputs of a render invocation, as given on the command line.
#[derive(Debug, Default)]
pub struct RenderOptions {
    pub video: PathBuf,
    pub config: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub words: Option<PathBuf>,
    pub captions: Option<PathBuf>,
    pub srt: bool,
}

/// Structured result of a finished render.
#[derive(Serialize)]
pub struct RenderResult {
    pub output_path: String,
    pub captions: usize,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_path: Option<String>,
}

/// Programmatic render entry point.
///
/// Configuration is validated first, then the base media is opened, and only
/// then is the transcript source read or the provider created. The browser is
/// only launched once captions are known.
pub async fn render_video(opts: &RenderOptions) -> AutocapResult<RenderResult> {
    let mut app_config = config::load_config(opts.config.as_deref())?;
    app_config.apply_overrides(&opts.overrides);
    let settings = app_config.validate()?;

    let backend = FfmpegBackend::new(&settings.tools);
    let info = render::open_media(&backend, &opts.video)?;

    let source = if let Some(ref path) = opts.captions {
        TranscriptSource::Captions(transcript::load_captions(path)?)
    } else if let Some(ref path) = opts.words {
        TranscriptSource::Words(transcript::load_words(path)?)
    } else {
        TranscriptSource::Provider(Arc::from(transcript::create_provider(
            &app_config.transcription,
        )?))
    };

    let chunks = render::time_captions(&settings, &info, &opts.video, source).await?;

    eprintln!(
        "{} {}: {}x{}, {:.1}s, {} caption(s) → {} ({} @ {}fps)",
        "render:".cyan().bold(),
        opts.video.display(),
        info.width,
        info.height,
        info.duration,
        chunks.len(),
        settings.output.output_path.display(),
        settings.output.codec.ffmpeg_name(),
        settings.output.frame_rate,
    );

    let srt = opts.srt.then(|| subtitle::to_srt(&chunks));
    let caption_count = chunks.len();

    let rasterizer = BrowserRasterizer::launch(
        settings.tools.chrome.as_deref().map(Path::new),
        settings.template.as_deref(),
    )
    .await?;
    let job = render::build_job(&settings, &opts.video, &info, chunks, &rasterizer);
    rasterizer.close().await;
    let job = job?;

    let output_path = backend.write(&job)?;

    let subtitle_path = match srt {
        Some(content) => {
            let path = subtitle::srt_path_for(&output_path);
            std::fs::write(&path, content)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let duration_secs = settings
        .output
        .max_duration
        .map_or(info.duration, |d| d.min(info.duration));

    Ok(RenderResult {
        output_path: output_path.display().to_string(),
        captions: caption_count,
        duration_secs,
        subtitle_path,
    })
}

/// CLI entry point, delegates to `render_video()`.
pub async fn run(opts: RenderOptions) -> AutocapResult<()> {
    let result = render_video(&opts).await?;
    eprintln!(
        "{} {} captions, {:.1}s → {}",
        "done:".green().bold(),
        result.captions,
        result.duration_secs,
        result.output_path
    );
    if let Some(ref srt) = result.subtitle_path {
        eprintln!("  Subtitles → {srt}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutocapError;

    #[tokio::test]
    async fn test_invalid_config_fails_before_media() {
        let opts = RenderOptions {
            video: PathBuf::from("/nonexistent/rickroll.mp4"),
            overrides: ConfigOverrides {
                video_codec: Some("vp9".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = render_video(&opts).await.err().unwrap();
        match err {
            AutocapError::InvalidConfiguration { key, .. } => assert_eq!(key, "video_codec"),
            other => panic!("unexpected error: {other}"),
        }
    }

    async fn render_error(opts: RenderOptions) -> AutocapError {
        render_video(&opts).await.err().unwrap()
    }

    #[tokio::test]
    async fn test_missing_media_with_words_file() {
        let dir = tempfile::tempdir().unwrap();
        let words = dir.path().join("words.json");
        std::fs::write(&words, r#"[[0.0, "Hello"]]"#).unwrap();

        let err = render_error(RenderOptions {
            video: dir.path().join("missing.mp4"),
            words: Some(words),
            ..Default::default()
        })
        .await;
        assert!(matches!(err, AutocapError::MediaNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_media_reported_before_invalid_words_file() {
        let dir = tempfile::tempdir().unwrap();
        let words = dir.path().join("words.json");
        std::fs::write(&words, "not a word list").unwrap();

        let err = render_error(RenderOptions {
            video: dir.path().join("missing.mp4"),
            words: Some(words),
            ..Default::default()
        })
        .await;
        assert!(matches!(err, AutocapError::MediaNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_media_reported_before_unreadable_captions_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_error(RenderOptions {
            video: dir.path().join("missing.mp4"),
            captions: Some(dir.path().join("captions.json")),
            ..Default::default()
        })
        .await;
        assert!(matches!(err, AutocapError::MediaNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_media_reported_before_provider_setup() {
        // No --words or --captions: the provider would need an API key that
        // may not be set, but the missing video must be reported first.
        let err = render_error(RenderOptions {
            video: PathBuf::from("/nonexistent/rickroll.mp4"),
            ..Default::default()
        })
        .await;
        match err {
            AutocapError::MediaNotFound { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/rickroll.mp4"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_result_serialization() {
        let result = RenderResult {
            output_path: "final.mp4".into(),
            captions: 3,
            duration_secs: 16.0,
            subtitle_path: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["captions"], 3);
        assert!(json.get("subtitle_path").is_none());
    }
}
