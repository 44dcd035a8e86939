use crate::error::{AutocapError, AutocapResult};
use crate::render::MediaInfo;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::debug;

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Query frame size, duration and audio presence via ffprobe.
pub fn probe_media(ffprobe: &str, path: &Path) -> AutocapResult<MediaInfo> {
    let not_found = |reason: String| AutocapError::MediaNotFound {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(not_found("no such file".into()));
    }

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "stream=codec_type,width,height:format=duration",
            "-of",
            "json",
        ])
        .arg(path.as_os_str())
        .output()
        .map_err(|e| AutocapError::Ffmpeg(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(not_found(
            stderr.lines().last().unwrap_or("ffprobe failed").to_string(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&stdout).map_err(not_found)?;
    debug!("Probed {}: {:?}", path.display(), info);
    Ok(info)
}

fn parse_probe_output(json: &str) -> Result<MediaInfo, String> {
    let parsed: ProbeOutput =
        serde_json::from_str(json).map_err(|e| format!("unreadable ffprobe output: {e}"))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or("no video stream")?;
    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no frame size".into()),
    };

    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or("container reports no duration")?;

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        width,
        height,
        duration,
        has_audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_with_audio() {
        let json = r#"{
            "programs": [],
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "16.016000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.duration - 16.016).abs() < 1e-9);
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_silent_video() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 360}],
            "format": {"duration": "3.5"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!(!info.has_audio);
    }

    #[test]
    fn test_parse_audio_only() {
        let json = r#"{
            "streams": [{"codec_type": "audio"}],
            "format": {"duration": "3.5"}
        }"#;
        assert_eq!(parse_probe_output(json).unwrap_err(), "no video stream");
    }

    #[test]
    fn test_parse_missing_duration() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 360}],
            "format": {}
        }"#;
        assert!(parse_probe_output(json).is_err());
    }

    #[test]
    fn test_missing_file_is_media_not_found() {
        let err = probe_media("ffprobe", Path::new("/nonexistent/rickroll.mp4")).unwrap_err();
        match err {
            AutocapError::MediaNotFound { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/rickroll.mp4"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
