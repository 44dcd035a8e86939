use crate::config::VideoCodec;
use crate::error::{AutocapError, AutocapResult};
use crate::overlay::OverlayFrame;
use crate::render::RenderJob;
use image::ImageFormat;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

const FILTER_SCRIPT: &str = "captions.filter";

/// File name of the `index`th overlay PNG inside the work directory.
fn overlay_file_name(index: usize) -> String {
    format!("overlay_{index:05}.png")
}

/// Build the ffmpeg filter graph that stacks every overlay on the base video.
///
/// Each overlay is shown on the half-open window `[start, end)`, so abutting
/// captions never draw on the same frame. The result is labelled `[vout]`.
pub fn overlay_filter_graph(overlays: &[OverlayFrame]) -> String {
    if overlays.is_empty() {
        return "[0:v]null[vout]".into();
    }

    let mut graph = String::new();
    let last = overlays.len() - 1;
    for (i, overlay) in overlays.iter().enumerate() {
        let input = if i == 0 {
            "[0:v]".to_string()
        } else {
            format!("[v{}]", i - 1)
        };
        let output = if i == last {
            "[vout]".to_string()
        } else {
            format!("[v{i}]")
        };
        let _ = writeln!(
            graph,
            "movie={file}[o{i}];\n{input}[o{i}]overlay=x={x}:y={y}:enable='gte(t,{start:.3})*lt(t,{end:.3})'{output}{sep}",
            file = overlay_file_name(i),
            x = overlay.x,
            y = overlay.y,
            start = overlay.start_time,
            end = overlay.end_time,
            sep = if i == last { "" } else { ";" },
        );
    }
    graph
}

/// Arguments after the filter script: stream mapping, codecs and output.
fn output_args(job: &RenderJob, output_path: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-map".into(), "[vout]".into()];

    if job.audio_enabled {
        args.extend(["-map".into(), "0:a:0".into(), "-c:a".into(), "aac".into()]);
    } else {
        args.push("-an".into());
    }

    args.extend(["-c:v".into(), job.codec.ffmpeg_name().into()]);
    if job.codec == VideoCodec::Libx264 {
        args.extend(["-pix_fmt".into(), "yuv420p".into()]);
    }
    args.extend(["-r".into(), job.frame_rate.to_string()]);

    if let Some(duration) = job.max_duration {
        args.extend(["-t".into(), format!("{duration:.3}")]);
    }

    args.push(output_path.display().to_string());
    args
}

/// Make `path` absolute against the current directory.
fn absolute(path: &Path) -> AutocapResult<PathBuf> {
    Ok(std::env::current_dir()?.join(path))
}

/// Write overlay PNGs to a temp directory and run ffmpeg to composite them.
///
/// ffmpeg runs inside the temp directory so the filter script can name the
/// overlays without path escaping.
pub fn write_job(ffmpeg: &str, job: &RenderJob) -> AutocapResult<PathBuf> {
    let work_dir = tempfile::tempdir()?;

    for (i, overlay) in job.overlays.iter().enumerate() {
        let path = work_dir.path().join(overlay_file_name(i));
        overlay
            .bitmap
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| AutocapError::Other(format!("Failed to write {}: {e}", path.display())))?;
    }

    let script_path = work_dir.path().join(FILTER_SCRIPT);
    std::fs::write(&script_path, overlay_filter_graph(&job.overlays))?;

    let base = absolute(&job.base_track)?;
    let output_path = absolute(&job.output_path)?;
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    debug!(
        "Encoding {} overlay(s) onto {} -> {} ({} @ {}fps, audio={})",
        job.overlays.len(),
        base.display(),
        output_path.display(),
        job.codec.ffmpeg_name(),
        job.frame_rate,
        job.audio_enabled
    );

    let output = Command::new(ffmpeg)
        .current_dir(work_dir.path())
        .args(["-y", "-i"])
        .arg(base.as_os_str())
        .args(["-filter_complex_script", FILTER_SCRIPT])
        .args(output_args(job, &output_path))
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| AutocapError::Ffmpeg(format!("Failed to spawn ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AutocapError::Ffmpeg(format!(
            "FFmpeg caption encoding failed (exit {}): {}",
            output.status,
            stderr.lines().last().unwrap_or("unknown error")
        )));
    }

    Ok(output_path)
}
