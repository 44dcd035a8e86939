use crate::caption::CaptionChunk;
use std::path::{Path, PathBuf};

/// Write caption chunks as an SRT document. Indices are 1-based.
pub fn to_srt(chunks: &[CaptionChunk]) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(chunk.start_time),
            format_srt_time(chunk.end_time),
        ));
        out.push_str(&chunk.display_text);
        out.push_str("\n\n");
    }
    out
}

/// Sidecar path for a rendered video: same stem, `.srt` extension.
pub fn srt_path_for(video: &Path) -> PathBuf {
    video.with_extension("srt")
}

/// Format seconds as SRT timestamp: "HH:MM:SS,mmm"
fn format_srt_time(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let s = total_s % 60;
    let total_m = total_s / 60;
    let m = total_m % 60;
    let h = total_m / 60;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}
