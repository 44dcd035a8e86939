mod caption;
mod cli;
mod commands;
mod config;
mod error;
mod overlay;
mod render;
mod subtitle;
mod template;
mod transcript;

use clap::Parser;
use cli::{Cli, Command};
use colored::*;
use config::ConfigOverrides;
use error::AutocapResult;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Tracing is opt-in, gated on RUST_LOG
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        if let Some(hint) = e.hint() {
            eprintln!("{} {}", "hint:".yellow().bold(), hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AutocapResult<()> {
    match cli.command {
        Command::Init { dir } => commands::init::run(&dir),
        Command::Transcribe {
            video,
            config,
            language,
            format,
            max_words,
            output,
        } => {
            commands::transcribe::run(&video, config.as_deref(), language, max_words, format, output)
                .await
        }
        Command::Render {
            video,
            config,
            output,
            fps,
            codec,
            no_audio,
            words,
            captions,
            max_words,
            language,
            srt,
        } => {
            commands::render::run(commands::render::RenderOptions {
                video,
                config,
                overrides: ConfigOverrides {
                    output_path: output,
                    frame_rate: fps,
                    video_codec: codec,
                    no_audio,
                    max_phrase_words: max_words,
                    language,
                },
                words,
                captions,
                srt,
            })
            .await
        }
    }
}
