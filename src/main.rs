use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use batchmark::{
    Config,
    batch::JobState,
    engine::compress::{CropAnchor, PhotoFormat, VideoFormat},
    job::{BatchJob, WatermarkKind},
    log_sink::{LogEvent, LogSink, TracingSink},
    params::{CommonParams, CompressParams, SizeMode, WatermarkParams},
    placement::Corner,
    timestamp::DateFormat,
    worker::{BatchHandle, spawn_batch},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "batchmark.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Print progress events as JSON lines on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Root directory to read photos and videos from
    input: PathBuf,

    /// Output root (defaults to `{input}_out`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rename outputs to `{rename}_{n}.{ext}`, numbered per folder
    #[arg(short, long)]
    rename: Option<String>,

    /// Process videos as well; otherwise they are copied unchanged
    #[arg(long)]
    process_video: bool,
}

impl CommonArgs {
    fn into_params(self) -> CommonParams {
        CommonParams {
            input_root: self.input.to_string_lossy().into_owned(),
            output_root: self
                .output
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            rename_template: self.rename.unwrap_or_default(),
            process_video: self.process_video,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stamp a text or image watermark onto every photo (and optionally video)
    Watermark {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, value_enum, default_value_t = WatermarkKind::Text)]
        kind: WatermarkKind,

        /// Watermark text (defaults to the folder's Chinese name plus the capture date)
        #[arg(short, long)]
        text: Option<String>,

        /// Catalog font name, font file name, or absolute font path
        #[arg(long, default_value = batchmark::fonts::DEFAULT_FONT)]
        font: String,

        #[arg(long, default_value_t = 40)]
        font_size: i32,

        #[arg(long, value_enum, default_value_t = Corner::BottomLeft)]
        anchor: Corner,

        #[arg(long, default_value_t = 20)]
        h_padding: i32,

        #[arg(long, default_value_t = 40)]
        v_padding: i32,

        /// Text color as `#RRGGBB` or `#AARRGGBB`
        #[arg(long, default_value = "#FFFFFFFF")]
        color: String,

        /// Opacity of the box behind the text (0 hides it)
        #[arg(long, default_value_t = 0)]
        background_alpha: u8,

        #[arg(long, value_enum, default_value_t = DateFormat::YmdCn)]
        date_format: DateFormat,

        /// Watermark image (image kind)
        #[arg(long)]
        image: Option<PathBuf>,

        #[arg(long)]
        image_width: Option<u32>,

        #[arg(long)]
        image_height: Option<u32>,
    },

    /// Re-encode photos and videos at a lower quality or size
    Compress {
        #[command(flatten)]
        common: CommonArgs,

        /// Quality percentage, 0-100
        #[arg(short, long, default_value_t = 75)]
        quality: i32,

        #[arg(long, value_enum)]
        photo_format: Option<PhotoFormat>,

        #[arg(long, value_enum)]
        video_format: Option<VideoFormat>,

        #[arg(long, value_enum, default_value_t = SizeMode::Original)]
        size: SizeMode,

        #[arg(long, default_value_t = 80)]
        scale: i32,

        #[arg(long, default_value_t = 1080)]
        width: u32,

        #[arg(long, default_value_t = 1920)]
        height: u32,

        #[arg(long, value_enum, default_value_t = CropAnchor::Center)]
        crop_anchor: CropAnchor,

        #[arg(long, default_value_t = 720)]
        crop_width: u32,

        #[arg(long, default_value_t = 720)]
        crop_height: u32,
    },
}

fn build_job(command: Commands) -> BatchJob {
    match command {
        Commands::Watermark {
            common,
            kind,
            text,
            font,
            font_size,
            anchor,
            h_padding,
            v_padding,
            color,
            background_alpha,
            date_format,
            image,
            image_width,
            image_height,
        } => WatermarkParams {
            common: common.into_params(),
            kind,
            text: text.unwrap_or_default(),
            font,
            font_size,
            anchor,
            h_padding,
            v_padding,
            text_color: color,
            background_alpha,
            date_format,
            image_path: image
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            image_width: image_width.unwrap_or(0),
            image_height: image_height.unwrap_or(0),
        }
        .into_job(),
        Commands::Compress {
            common,
            quality,
            photo_format,
            video_format,
            size,
            scale,
            width,
            height,
            crop_anchor,
            crop_width,
            crop_height,
        } => CompressParams {
            common: common.into_params(),
            quality,
            photo_format,
            video_format,
            size_mode: size,
            scale_percent: scale,
            width,
            height,
            crop_anchor,
            crop_width,
            crop_height,
        }
        .into_job(),
    }
}

fn print_event(event: LogEvent, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(&event)?);
    } else {
        TracingSink.emit(event);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(&cli.config)?;
    info!("Engine: {:?}", config.engine.ffmpeg);
    info!("Font directory: {:?}", config.fonts.directory);

    let job = build_job(cli.command);
    info!("Input: {:?}, output: {:?}", job.input_root, job.output_root);

    let BatchHandle { mut events, task } = spawn_batch(job, config);
    while let Some(event) = events.recv().await {
        print_event(event, cli.json)?;
    }

    let report = match task.await {
        Ok(report) => report,
        Err(e) => {
            error!("Batch worker stopped unexpectedly: {}", e);
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string(&report)?);
    }
    info!(
        "Finished: {} processed, {} failed",
        report.processed, report.failed
    );

    if report.state == JobState::Aborted {
        std::process::exit(2);
    }
    Ok(())
}
