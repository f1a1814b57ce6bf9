use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use serde_json::json;
use speedup::{CleanupPolicy, FfmpegLogLevel, SpeedUpOptions, VideoSource};

const CLI_AFTER_HELP: &str = "Examples:\n  speedup run ~/Movies/clip.MOV clip_2x.mp4\n  speedup run input.mov output.mp4 --speed 4 --ffmpeg /opt/homebrew/bin/ffmpeg\n  speedup probe input.mov --json\n  speedup completions zsh > _speedup";

#[derive(Debug, Parser)]
#[command(
    name = "speedup",
    version,
    about = "Speed up a video by dropping frames, then re-encode it to MP4",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Allow overwriting an existing output file.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg library log level (quiet, fatal, error, warning, info, verbose, debug).
    #[arg(long, global = true, default_value = "error")]
    log_level: FfmpegLogLevel,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Speed up a video and write an MP4.
    #[command(
        about = "Speed up a video",
        after_help = "Examples:\n  speedup run input.mov output.mp4\n  speedup run input.mov output.mp4 --speed 8 --intermediate-dir /scratch"
    )]
    Run {
        /// Source video path (`~` is expanded).
        input: PathBuf,
        /// Output MP4 path (`~` is expanded).
        output: PathBuf,
        /// Keep one frame in every N and play N times faster.
        #[arg(long, short, default_value_t = speedup::DEFAULT_SPEED_FACTOR)]
        speed: u32,
        /// Encoder executable used for the final conversion.
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,
        /// Final video codec.
        #[arg(long, default_value = "h264")]
        video_codec: String,
        /// Final audio codec.
        #[arg(long, default_value = "aac")]
        audio_codec: String,
        /// Intermediate bitrate in bits per second.
        #[arg(long)]
        bitrate: Option<usize>,
        /// Directory for the intermediate file (default: system temp dir).
        #[arg(long)]
        intermediate_dir: Option<PathBuf>,
        /// Delete the intermediate even when the final conversion fails.
        #[arg(long)]
        always_cleanup: bool,
    },

    /// Print metadata for a source video.
    #[command(about = "Print source metadata", visible_alias = "info")]
    Probe {
        /// Source video path (`~` is expanded).
        input: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "speedup=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    speedup::set_ffmpeg_log_level(cli.global.log_level);

    match cli.command {
        Commands::Run {
            input,
            output,
            speed,
            ffmpeg,
            video_codec,
            audio_codec,
            bitrate,
            intermediate_dir,
            always_cleanup,
        } => {
            let output = speedup::expand_home(output);
            ensure_writable_path(&output, cli.global.overwrite)?;

            let mut options = SpeedUpOptions::new()
                .with_speed_factor(speed)
                .with_ffmpeg_program(ffmpeg)
                .with_video_codec(video_codec)
                .with_audio_codec(audio_codec);
            if let Some(bitrate) = bitrate {
                options = options.with_intermediate_bitrate(bitrate);
            }
            if let Some(dir) = intermediate_dir {
                options = options.with_intermediate_dir(speedup::expand_home(dir));
            }
            if always_cleanup {
                options = options.with_cleanup(CleanupPolicy::Always);
            }
            let report = speedup::speed_up_video(&input, &output, &options)?;

            println!(
                "✅ {}",
                format!(
                    "{}x video saved: kept {} of {} frames at {:.2} fps",
                    report.decimation.speed_factor,
                    report.decimation.frames_written,
                    report.decimation.frames_read,
                    speedup::utilities::rational_to_f64(report.decimation.frame_rate),
                )
                .green()
            );
            println!("✅ {}", "MOV -> MP4 conversion complete".green());
            println!(
                "🎉 {} {}",
                "saved".green().bold(),
                report.output.display()
            );
        }
        Commands::Probe { input, json } => {
            let source = VideoSource::open(&input)?;
            let metadata = source.metadata();
            if json {
                let payload = json!({
                    "path": source.path().display().to_string(),
                    "format": metadata.format,
                    "codec": metadata.codec,
                    "width": metadata.width,
                    "height": metadata.height,
                    "fps": metadata.frames_per_second,
                    "frame_rate": metadata.frame_rate.to_string(),
                    "frame_count": metadata.frame_count,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "readable": metadata.is_readable(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Video: {}x{} @ {:.2} fps, {} frames [{}]",
                    metadata.width,
                    metadata.height,
                    metadata.frames_per_second,
                    metadata.frame_count,
                    metadata.codec,
                );
                if !metadata.is_readable() {
                    println!("{} {}", "warning:".yellow().bold(), "source cannot be sped up".yellow());
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "speedup", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("❌ {} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["speedup", "run", "in.mov", "out.mp4"]).unwrap();
        let Commands::Run {
            speed,
            ffmpeg,
            video_codec,
            audio_codec,
            always_cleanup,
            ..
        } = cli.command
        else {
            panic!("expected run command");
        };
        assert_eq!(speed, 2);
        assert_eq!(ffmpeg.to_str(), Some("ffmpeg"));
        assert_eq!(video_codec, "h264");
        assert_eq!(audio_codec, "aac");
        assert!(!always_cleanup);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "speedup", "run", "in.mov", "out.mp4", "-s", "4", "--overwrite", "--log-level", "quiet",
        ])
        .unwrap();
        assert!(cli.global.overwrite);
        assert_eq!(cli.global.log_level, speedup::FfmpegLogLevel::Quiet);
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(Cli::try_parse_from(["speedup", "--log-level", "loud", "probe", "in.mov"]).is_err());
    }
}
