use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use photocap::{
    CaptionEngine, CaptionStyle, DecodedImage, NullVisionBackend, PhotocapConfig,
};

#[derive(Parser, Debug)]
#[command(name = "photocap")]
#[command(about = "Adaptive on-device photo captioning with vision fallback")]
#[command(version)]
#[command(long_about = "Captions photographs using on-device analysis. When the vision \
backend is degraded or unavailable, captioning falls back through progressively cheaper \
strategies, always ending in a pixel-statistics caption.")]
struct Args {
    /// Image files to caption
    #[arg(value_name = "IMAGE", help = "Image files to caption")]
    images: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "photocap.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Caption style (creative or factual)
    #[arg(short, long, help = "Caption style: creative or factual")]
    style: Option<String>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without captioning")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args);

    let config = PhotocapConfig::load_from_file(&args.config)?;
    config.validate()?;

    if args.validate_config {
        info!("Configuration file {} is valid", args.config);
        println!("Configuration is valid");
        return Ok(());
    }

    if args.images.is_empty() {
        anyhow::bail!("no images given; pass one or more image paths");
    }

    let style = match args.style {
        Some(ref s) => s
            .parse::<CaptionStyle>()
            .map_err(|e| anyhow::anyhow!(e))?,
        None => config
            .caption
            .default_style
            .parse::<CaptionStyle>()
            .map_err(|e| anyhow::anyhow!(e))?,
    };

    // No platform vision facility is wired up in the CLI build; the null
    // backend routes everything to the pixel-statistics rung.
    let engine = CaptionEngine::with_config(Arc::new(NullVisionBackend), config);

    for path in &args.images {
        match DecodedImage::open(path) {
            Ok(image) => {
                let caption = engine.generate_caption(&image, style).await;
                println!("{}: {}", path.display(), caption);
            }
            Err(e) => {
                error!("Failed to decode {}: {}", path.display(), e);
                println!("{}: {}", path.display(), photocap::error_caption(&e.to_string()));
            }
        }
    }

    Ok(())
}

fn init_logging(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("photocap={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_default_config() -> Result<()> {
    let config = PhotocapConfig::default();
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
