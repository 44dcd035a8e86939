use crate::config::CONFIG_FILE;
use crate::error::{AutocapError, AutocapResult};
use colored::*;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r##"# autocap configuration

[output]
# Must end in .mp4 or .mov
output_path = "final.mp4"
output_frame_rate = 24
# One of: libx264, mpeg4, rawvideo, libvpx
video_codec = "libx264"
audio_enabled = true
# Trim the output to this many seconds
# max_duration = 16.0

[captions]
# A caption grows word by word up to this many words, then restarts
max_phrase_words = 10
# "media-end" holds the last caption until the video ends,
# "zero-length" ends it at its own start time
last_chunk_end = "media-end"

[style]
font = "Amiri"
size = 34
text_color = "#FFFFFF"
background_color = "#000000"
# 0.0 = transparent, 1.0 = opaque
background_opacity = 0.0
padding = 6
# Keep long captions inside the frame instead of using the fixed anchor
clamp_to_frame = false
# Handlebars HTML with an element id="caption" around {{text}}
# template = "caption.html"

[transcription]
provider = "deepgram"
language = "en"
punctuate = true
# Reuse transcripts for identical media
# cache_dir = ".autocap-cache"

[tools]
ffmpeg = "ffmpeg"
ffprobe = "ffprobe"
# chrome = "/usr/bin/chromium"
"##;

/// Write a default `autocap.toml` into `dir`, returning its path.
pub fn write_default_config(dir: &Path) -> AutocapResult<PathBuf> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        return Err(AutocapError::AlreadyInitialized(path));
    }
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, DEFAULT_CONFIG)?;
    Ok(path)
}

/// CLI entry point.
pub fn run(dir: &Path) -> AutocapResult<()> {
    let path = write_default_config(dir)?;

    eprintln!("{} Created {}", "done:".green().bold(), path.display());
    eprintln!();
    eprintln!("Next: set {} in your environment or .env, then run:", "DEEPGRAM_KEY".cyan());
    eprintln!("  autocap render <video.mp4>");

    Ok(())
}
