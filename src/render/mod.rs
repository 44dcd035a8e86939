pub mod encoder;
pub mod probe;

use crate::caption::{self, CaptionChunk};
use crate::config::{Settings, ToolsConfig, VideoCodec};
use crate::error::{AutocapError, AutocapResult};
use crate::overlay::{self, FrameGeometry, OverlayFrame, TextRasterizer};
use crate::transcript::{self, cache, TranscriptionProvider, Word};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the base media looks like, as reported by the decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry {
            width: self.width,
            height: self.height,
        }
    }
}

/// Everything the encoder needs to produce the captioned file.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub base_track: PathBuf,
    pub overlays: Vec<OverlayFrame>,
    pub output_path: PathBuf,
    pub frame_rate: u32,
    pub codec: VideoCodec,
    pub audio_enabled: bool,
    pub max_duration: Option<f64>,
}

/// Reads base media metadata and writes finished render jobs.
pub trait MediaBackend {
    /// Fails with `MediaNotFound` if the path is unreadable or not a valid container.
    fn open(&self, path: &Path) -> AutocapResult<MediaInfo>;

    /// Encode `job` to `job.output_path`, returning the written path.
    fn write(&self, job: &RenderJob) -> AutocapResult<PathBuf>;
}

/// `MediaBackend` backed by the ffprobe and ffmpeg binaries.
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegBackend {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
        }
    }
}

impl MediaBackend for FfmpegBackend {
    fn open(&self, path: &Path) -> AutocapResult<MediaInfo> {
        probe::probe_media(&self.ffprobe, path)
    }

    fn write(&self, job: &RenderJob) -> AutocapResult<PathBuf> {
        encoder::write_job(&self.ffmpeg, job)
    }
}

/// Where the caption timing comes from.
pub enum TranscriptSource {
    /// Transcribe the base media, then normalize.
    Provider(Arc<dyn TranscriptionProvider>),
    /// Caller-supplied words, normalized.
    Words(Vec<Word>),
    /// Caller-supplied chunks, used as-is.
    Captions(Vec<CaptionChunk>),
}

/// Send the base media to the provider and await the word list.
///
/// The provider call runs on a blocking thread; this is the pipeline's only
/// suspend point.
pub async fn fetch_words(
    settings: &Settings,
    base: &Path,
    provider: Arc<dyn TranscriptionProvider>,
) -> AutocapResult<Vec<Word>> {
    let media = tokio::fs::read(base).await.map_err(|e| AutocapError::MediaNotFound {
        path: base.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mime = transcript::mime_for_path(base);
    let options = settings.transcription.options.clone();
    let cache_dir = settings.transcription.cache_dir.clone();

    info!(
        "Transcribing {} ({} bytes) with {}",
        base.display(),
        media.len(),
        provider.provider_name()
    );

    tokio::task::spawn_blocking(move || match cache_dir {
        Some(dir) => cache::transcribe_cached(provider.as_ref(), &media, mime, &options, &dir),
        None => provider.transcribe(&media, mime, &options),
    })
    .await
    .map_err(|e| AutocapError::TranscriptionService(format!("transcription task failed: {e}")))?
}

/// Open the base media, then obtain and time the captions.
///
/// Media is validated before any transcription request is made.
pub async fn acquire_captions(
    settings: &Settings,
    media: &dyn MediaBackend,
    base: &Path,
    source: TranscriptSource,
) -> AutocapResult<(MediaInfo, Vec<CaptionChunk>)> {
    let info = open_media(media, base)?;
    let chunks = time_captions(settings, &info, base, source).await?;
    Ok((info, chunks))
}

/// Open and describe the base media. First step of every pipeline.
pub fn open_media(media: &dyn MediaBackend, base: &Path) -> AutocapResult<MediaInfo> {
    let info = media.open(base)?;
    debug!(
        "Base media {}: {}x{}, {:.2}s, audio={}",
        base.display(),
        info.width,
        info.height,
        info.duration,
        info.has_audio
    );
    Ok(info)
}

/// Turn a transcript source into caption chunks for already-opened media.
pub async fn time_captions(
    settings: &Settings,
    info: &MediaInfo,
    base: &Path,
    source: TranscriptSource,
) -> AutocapResult<Vec<CaptionChunk>> {
    let last_chunk_end = settings.last_chunk_end.resolve(info.duration);
    match source {
        TranscriptSource::Captions(chunks) => caption::validate_chunks(chunks),
        TranscriptSource::Words(words) => {
            caption::normalize(words, settings.max_phrase_words, last_chunk_end)
        }
        TranscriptSource::Provider(provider) => {
            let words = fetch_words(settings, base, provider).await?;
            caption::normalize(words, settings.max_phrase_words, last_chunk_end)
        }
    }
}

/// Rasterize and position every chunk and assemble the render job.
pub fn build_job(
    settings: &Settings,
    base: &Path,
    info: &MediaInfo,
    chunks: Vec<CaptionChunk>,
    rasterizer: &dyn TextRasterizer,
) -> AutocapResult<RenderJob> {
    let overlays = overlay::composite(info.geometry(), chunks, &settings.style, rasterizer)?;

    let audio_enabled = settings.output.audio_enabled && info.has_audio;
    if settings.output.audio_enabled && !info.has_audio {
        warn!("{} has no audio stream; output will be silent", base.display());
    }

    Ok(RenderJob {
        base_track: base.to_path_buf(),
        overlays,
        output_path: settings.output.output_path.clone(),
        frame_rate: settings.output.frame_rate,
        codec: settings.output.codec,
        audio_enabled,
        max_duration: settings.output.max_duration,
    })
}
