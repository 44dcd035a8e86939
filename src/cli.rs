use crate::commands::transcribe::TranscriptFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "autocap",
    about = "Transcribe a video and burn rolling word-by-word captions into it",
    version,
    after_help = "\x1b[1mExamples:\x1b[0m
  autocap init                          Write a default autocap.toml
  autocap render talk.mp4               Transcribe and caption talk.mp4
  autocap render talk.mp4 -o out.mov --codec mpeg4 --srt
  autocap transcribe talk.mp4 -o words.json
  autocap render talk.mp4 --words words.json   Reuse an existing transcript"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default autocap.toml
    Init {
        /// Directory to write the config into
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Transcribe a video and print its words or captions
    Transcribe {
        /// Input video
        video: PathBuf,

        /// Config file (default: ./autocap.toml if present)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Spoken language code (overrides [transcription] language)
        #[arg(long)]
        language: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = TranscriptFormat::Json)]
        format: TranscriptFormat,

        /// Words per caption before it restarts (SRT output only)
        #[arg(long)]
        max_words: Option<usize>,

        /// Write to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Caption a video and encode the result
    Render {
        /// Input video
        video: PathBuf,

        /// Config file (default: ./autocap.toml if present)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output file, .mp4 or .mov (overrides [output] output_path)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Output frame rate
        #[arg(long)]
        fps: Option<i64>,

        /// Video codec: libx264, mpeg4, rawvideo, libvpx
        #[arg(long)]
        codec: Option<String>,

        /// Drop the audio track
        #[arg(long)]
        no_audio: bool,

        /// Use a word list (JSON) instead of calling the transcription service
        #[arg(long, conflicts_with = "captions")]
        words: Option<PathBuf>,

        /// Use pre-timed captions (JSON) as-is
        #[arg(long)]
        captions: Option<PathBuf>,

        /// Words per caption before it restarts
        #[arg(long)]
        max_words: Option<usize>,

        /// Spoken language code (overrides [transcription] language)
        #[arg(long)]
        language: Option<String>,

        /// Also write an SRT file next to the output
        #[arg(long)]
        srt: bool,
    },
}
