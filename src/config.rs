use crate::caption::{LastChunkEnd, DEFAULT_MAX_PHRASE_WORDS};
use crate::error::{AutocapError, AutocapResult};
use crate::overlay::{CaptionStyle, Rgb, MAX_PADDING};
use crate::transcript::TranscribeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE: &str = "autocap.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub captions: CaptionsConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Raw `[output]` table. Every required key is optional here so that a
/// missing key can be reported by name during validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_frame_rate: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_enabled: Option<bool>,
    /// Trim the output to this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptionsConfig {
    #[serde(default = "default_max_phrase_words")]
    pub max_phrase_words: usize,
    #[serde(default)]
    pub last_chunk_end: LastChunkPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StyleConfig {
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default)]
    pub background_opacity: f64,
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Keep panels inside the frame instead of using the fixed anchor as-is.
    #[serde(default)]
    pub clamp_to_frame: bool,
    /// Optional handlebars HTML file replacing the built-in caption template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_punctuate")]
    pub punctuate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome: Option<String>,
}

/// Policy for the end time of the final caption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LastChunkPolicy {
    /// Hold the last caption until the base media ends.
    #[default]
    MediaEnd,
    /// End the last caption at its own start time.
    ZeroLength,
}

impl LastChunkPolicy {
    pub fn resolve(self, media_duration: f64) -> LastChunkEnd {
        match self {
            LastChunkPolicy::MediaEnd => LastChunkEnd::HoldUntil(media_duration),
            LastChunkPolicy::ZeroLength => LastChunkEnd::ZeroLength,
        }
    }
}

/// Output codecs the encoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    Libx264,
    Mpeg4,
    Rawvideo,
    Libvpx,
}

impl VideoCodec {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "libx264" => Self::Libx264,
            "mpeg4" => Self::Mpeg4,
            "rawvideo" => Self::Rawvideo,
            "libvpx" => Self::Libvpx,
            _ => return None,
        })
    }

    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::Libx264 => "libx264",
            Self::Mpeg4 => "mpeg4",
            Self::Rawvideo => "rawvideo",
            Self::Libvpx => "libvpx",
        }
    }
}

fn default_max_phrase_words() -> usize {
    DEFAULT_MAX_PHRASE_WORDS
}
fn default_font() -> String {
    "Amiri".into()
}
fn default_size() -> u32 {
    34
}
fn default_text_color() -> String {
    "#FFFFFF".into()
}
fn default_background_color() -> String {
    "#000000".into()
}
fn default_padding() -> u32 {
    6
}
fn default_provider() -> String {
    "deepgram".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_punctuate() -> bool {
    true
}
fn default_ffmpeg() -> String {
    "ffmpeg".into()
}
fn default_ffprobe() -> String {
    "ffprobe".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: Some("final.mp4".into()),
            output_frame_rate: Some(24),
            video_codec: Some("libx264".into()),
            audio_enabled: Some(true),
            max_duration: None,
        }
    }
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            max_phrase_words: default_max_phrase_words(),
            last_chunk_end: LastChunkPolicy::default(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font: default_font(),
            size: default_size(),
            text_color: default_text_color(),
            background_color: default_background_color(),
            background_opacity: 0.0,
            padding: default_padding(),
            clamp_to_frame: false,
            template: None,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            language: default_language(),
            punctuate: default_punctuate(),
            cache_dir: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            chrome: None,
        }
    }
}

/// All-optional command-line overrides, applied before validation.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub output_path: Option<PathBuf>,
    pub frame_rate: Option<i64>,
    pub video_codec: Option<String>,
    pub no_audio: bool,
    pub max_phrase_words: Option<usize>,
    pub language: Option<String>,
}

/// Validated `[output]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub output_path: PathBuf,
    pub frame_rate: u32,
    pub codec: VideoCodec,
    pub audio_enabled: bool,
    pub max_duration: Option<f64>,
}

/// Validated `[transcription]` settings.
#[derive(Debug, Clone)]
pub struct TranscriptionSettings {
    pub options: TranscribeOptions,
    pub cache_dir: Option<PathBuf>,
}

/// Immutable, fully validated configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub output: OutputSettings,
    pub max_phrase_words: usize,
    pub last_chunk_end: LastChunkPolicy,
    pub style: CaptionStyle,
    pub template: Option<PathBuf>,
    pub transcription: TranscriptionSettings,
    pub tools: ToolsConfig,
}

impl AppConfig {
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref path) = overrides.output_path {
            self.output.output_path = Some(path.display().to_string());
        }
        if let Some(fps) = overrides.frame_rate {
            self.output.output_frame_rate = Some(fps);
        }
        if let Some(ref codec) = overrides.video_codec {
            self.output.video_codec = Some(codec.clone());
        }
        if overrides.no_audio {
            self.output.audio_enabled = Some(false);
        }
        if let Some(max) = overrides.max_phrase_words {
            self.captions.max_phrase_words = max;
        }
        if let Some(ref language) = overrides.language {
            self.transcription.language = language.clone();
        }
    }

    /// Check every key and produce the immutable settings. The first bad key is reported.
    pub fn validate(&self) -> AutocapResult<Settings> {
        let output = self.output.validate()?;

        if self.captions.max_phrase_words == 0 {
            return Err(AutocapError::config("max_phrase_words", "must be at least 1"));
        }

        let style = self.style.validate()?;

        if self.transcription.language.trim().is_empty() {
            return Err(AutocapError::config("language", "must not be empty"));
        }

        Ok(Settings {
            output,
            max_phrase_words: self.captions.max_phrase_words,
            last_chunk_end: self.captions.last_chunk_end,
            style,
            template: self.style.template.as_ref().map(PathBuf::from),
            transcription: TranscriptionSettings {
                options: TranscribeOptions {
                    punctuate: self.transcription.punctuate,
                    language: self.transcription.language.clone(),
                },
                cache_dir: self.transcription.cache_dir.as_ref().map(PathBuf::from),
            },
            tools: self.tools.clone(),
        })
    }
}

impl OutputConfig {
    pub fn validate(&self) -> AutocapResult<OutputSettings> {
        let output_path = self
            .output_path
            .as_deref()
            .ok_or_else(|| missing("output_path"))?;
        let lower = output_path.to_ascii_lowercase();
        if !(lower.ends_with(".mp4") || lower.ends_with(".mov")) {
            return Err(AutocapError::config(
                "output_path",
                format!("'{output_path}' must end in .mp4 or .mov"),
            ));
        }

        let fps = self
            .output_frame_rate
            .ok_or_else(|| missing("output_frame_rate"))?;
        let frame_rate = u32::try_from(fps)
            .ok()
            .filter(|f| *f > 0)
            .ok_or_else(|| {
                AutocapError::config("output_frame_rate", format!("{fps} is not a positive integer"))
            })?;

        let codec_name = self.video_codec.as_deref().ok_or_else(|| missing("video_codec"))?;
        let codec = VideoCodec::from_name(codec_name).ok_or_else(|| {
            AutocapError::config(
                "video_codec",
                format!("unsupported codec '{codec_name}'. Supported: libx264, mpeg4, rawvideo, libvpx"),
            )
        })?;

        let audio_enabled = self.audio_enabled.ok_or_else(|| missing("audio_enabled"))?;

        if let Some(d) = self.max_duration {
            if !d.is_finite() || d <= 0.0 {
                return Err(AutocapError::config(
                    "max_duration",
                    format!("{d} is not a positive number of seconds"),
                ));
            }
        }

        Ok(OutputSettings {
            output_path: PathBuf::from(output_path),
            frame_rate,
            codec,
            audio_enabled,
            max_duration: self.max_duration,
        })
    }
}

impl StyleConfig {
    pub fn validate(&self) -> AutocapResult<CaptionStyle> {
        if self.font.trim().is_empty() {
            return Err(AutocapError::config("font", "must not be empty"));
        }
        if self.size == 0 {
            return Err(AutocapError::config("size", "must be greater than 0"));
        }
        if self.padding > MAX_PADDING {
            return Err(AutocapError::config(
                "padding",
                format!("{} exceeds the maximum of {MAX_PADDING}px", self.padding),
            ));
        }
        let text_color = Rgb::parse(&self.text_color).ok_or_else(|| {
            AutocapError::config("text_color", format!("'{}' is not a #RRGGBB color", self.text_color))
        })?;
        let background_color = Rgb::parse(&self.background_color).ok_or_else(|| {
            AutocapError::config(
                "background_color",
                format!("'{}' is not a #RRGGBB color", self.background_color),
            )
        })?;
        if !(0.0..=1.0).contains(&self.background_opacity) {
            return Err(AutocapError::config(
                "background_opacity",
                format!("{} is outside 0.0..=1.0", self.background_opacity),
            ));
        }

        Ok(CaptionStyle {
            font: self.font.clone(),
            size: self.size,
            text_color,
            background_color,
            background_opacity: self.background_opacity,
            padding: self.padding,
            clamp_to_frame: self.clamp_to_frame,
        })
    }
}

fn missing(key: &str) -> AutocapError {
    AutocapError::config(key, "missing from [output]")
}

/// Load config from `explicit`, else `./autocap.toml` if present, else defaults.
pub fn load_config(explicit: Option<&Path>) -> AutocapResult<AppConfig> {
    let path = match explicit {
        Some(p) => {
            if !p.exists() {
                return Err(AutocapError::ConfigNotFound(p.to_path_buf()));
            }
            p.to_path_buf()
        }
        None => {
            let p = PathBuf::from(CONFIG_FILE);
            if !p.exists() {
                return Ok(AppConfig::default());
            }
            p
        }
    };
    let content = std::fs::read_to_string(&path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> AutocapResult<AppConfig> {
    toml::from_str(content).map_err(|e| AutocapError::ConfigParse(e.to_string()))
}
