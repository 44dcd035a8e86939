use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutocapError {
    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("Media not found: {path}: {reason}")]
    MediaNotFound { path: PathBuf, reason: String },

    #[error("Transcription service error: {0}")]
    TranscriptionService(String),

    #[error("Rasterization error: {0}")]
    Rasterization(String),

    #[error("Invalid configuration for '{key}': {message}")]
    InvalidConfiguration { key: String, message: String },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    #[error("Already initialized: {0} already exists")]
    AlreadyInitialized(PathBuf),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AutocapError {
    /// Shorthand for a configuration error on a named key.
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        AutocapError::InvalidConfiguration {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Return an actionable hint for the user, if applicable.
    pub fn hint(&self) -> Option<String> {
        match self {
            AutocapError::InvalidTranscript(_) => Some(
                "Word files are JSON lists of {\"start_time\": 1.5, \"text\": \"hello\"} objects or [1.5, \"hello\"] pairs. Caption files need start_time, end_time and display_text.".into(),
            ),
            AutocapError::MediaNotFound { .. } => Some(
                "Check the video path. The file must exist and be a container ffprobe can read (mp4, mov, mkv, webm).".into(),
            ),
            AutocapError::TranscriptionService(msg) => {
                if msg.contains("DEEPGRAM") {
                    Some("Set DEEPGRAM_KEY in your environment or in a .env file next to where you run autocap.".into())
                } else {
                    Some("Check your network connection and Deepgram key, or pass --words / --captions to skip transcription.".into())
                }
            }
            AutocapError::Rasterization(_) => Some(
                "Ensure Chromium/Chrome is installed, or point [tools] chrome at an executable. Check that [style] font names an installed font.".into(),
            ),
            AutocapError::InvalidConfiguration { .. } => Some(
                "Run 'autocap init' to generate a complete autocap.toml with every key documented.".into(),
            ),
            AutocapError::ConfigNotFound(_) => Some(
                "Pass an existing file to --config, or run 'autocap init' to create autocap.toml.".into(),
            ),
            AutocapError::ConfigParse(_) => Some(
                "Check autocap.toml syntax. Run 'autocap init <dir>' to generate a valid example config.".into(),
            ),
            AutocapError::AlreadyInitialized(_) => Some(
                "Edit the existing autocap.toml, or delete it first.".into(),
            ),
            AutocapError::Ffmpeg(_) => Some(
                "Ensure FFmpeg is installed and on your PATH. Install via: brew install ffmpeg (macOS) or apt install ffmpeg (Linux).".into(),
            ),
            _ => None,
        }
    }
}

pub type AutocapResult<T> = Result<T, AutocapError>;
