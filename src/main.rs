use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};

use tracking_utils::{
    config::Config,
    video::{probe_video, VideoReader, VideoWriter},
    TrackingError,
};

#[derive(Parser)]
#[command(
    name = "tracking-utils",
    version,
    about = "Inspect and re-encode videos for tracking pipelines",
    long_about = "Decodes videos into RGB frames and writes frame sequences back out as 24 fps Motion JPEG, using the FFmpeg command line tools."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print container metadata
    Probe {
        /// Video file path
        input: PathBuf,
    },

    /// Decode every frame and write them back out as Motion JPEG
    Reencode {
        /// Source video file path
        input: PathBuf,

        /// Destination video file path
        output: PathBuf,
    },

    /// Save a single decoded frame as an image
    Snapshot {
        /// Video file path
        input: PathBuf,

        /// Zero-based frame index
        index: usize,

        /// Image file path (PNG or JPEG, by extension)
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    if let Err(err) = run(cli) {
        error!("{}", describe(&err));
        std::process::exit(1);
    }
}

/// Library errors carry a friendlier message than their `Display`
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<TrackingError>() {
        Some(tracking) => tracking.user_message(),
        None => format!("{:#}", err),
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };
    config.validate()?;

    match cli.command {
        Commands::Probe { input } => {
            let metadata = probe_video(&input, &config.video)?;
            println!("{}", input.display());
            println!("  codec:      {}", metadata.codec);
            println!("  resolution: {}x{}", metadata.width, metadata.height);
            println!("  fps:        {:.3}", metadata.fps);
            match metadata.frame_count {
                Some(count) => println!("  frames:     {}", count),
                None => println!("  frames:     unknown"),
            }
            if let Some(duration) = metadata.duration {
                println!("  duration:   {:.2}s", duration);
            }
        }
        Commands::Reencode { input, output } => {
            let frames = VideoReader::new(config.video.clone()).read(&input)?;
            VideoWriter::new(config.video).save(&frames, &output)?;
        }
        Commands::Snapshot { input, index, output } => {
            let frames = VideoReader::new(config.video).read(&input)?;
            let total = frames.len();
            let frame = frames
                .get(index)
                .with_context(|| format!("frame {} out of range, video has {} frames", index, total))?;
            frame
                .save_image(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!("Saved frame {} to {:?}", index, output);
        }
    }

    Ok(())
}
