use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use svd_image_compress::config::CompressConfig;
use svd_image_compress::{BatchSummary, ImageOutcome, compress_images};
use tracing_subscriber::EnvFilter;

/// Low-rank SVD compression of RGB images:
/// - each channel is factorized and truncated to its k largest singular values
/// - reconstructions are clipped to 8 bits and written as JPEG
#[derive(Parser, Debug)]
#[command(name = "svdc")]
#[command(about = "Compress images with per-channel truncated SVD")]
#[command(long_about = "Compress images with per-channel truncated SVD.
Each source image produces one JPEG per rank, named {name}_{variant}_{rank}.jpg,
together with energy, storage ratio and quality reports.")]
struct Args {
    /// Source images
    #[arg(help = "Images to compress (any format the image crate decodes)")]
    images: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, help = "Directory for reconstructions [default: result]")]
    output_dir: Option<PathBuf>,

    /// Truncation ranks
    #[arg(short, long, value_delimiter = ',', value_parser = parse_rank,
          help = "Comma-separated ranks to reconstruct [default: 5,20,50]")]
    ranks: Option<Vec<usize>>,

    /// Variant tag for output file names
    #[arg(long, help = "Tag inserted into output names [default: svd]")]
    variant: Option<String>,

    /// Decode images to floating point before factorizing
    #[arg(long = "float", help = "Keep sub-8-bit precision of the source through the SVD")]
    reload_as_float: bool,

    /// JPEG quality
    #[arg(short, long, help = "JPEG quality 1-100 [default: 95]")]
    quality: Option<u8>,

    /// Process channels and ranks one after another
    #[arg(long, help = "Disable concurrent channel and rank processing")]
    sequential: bool,

    /// Singular values reported per channel
    #[arg(long, help = "Number of leading singular values to report [default: 100]")]
    profile_len: Option<usize>,

    /// JSON configuration file
    #[arg(short, long, help = "Load settings from a JSON file; flags override it")]
    config: Option<PathBuf>,

    /// JSON-lines report file
    #[arg(long, help = "Append every report event to this file as JSON lines")]
    report: Option<PathBuf>,

    /// Verbosity
    #[arg(short, long, action = clap::ArgAction::Count,
          help = "Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence")]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = resolve_config(args)?;
    let summary = compress_images(&config).await?;
    print_summary(&summary);

    if summary.is_success() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} of {} images did not compress cleanly",
            summary.failed(),
            summary.images.len()
        ))
    }
}

/// Install the global tracing subscriber.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Merge the optional config file with command-line flags. Flags win.
fn resolve_config(args: Args) -> Result<CompressConfig> {
    let mut config = match &args.config {
        Some(path) => CompressConfig::from_json_file(path)?,
        None => CompressConfig::default(),
    };

    if !args.images.is_empty() {
        config.images = args.images;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(ranks) = args.ranks {
        config.ranks = ranks;
    }
    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    if args.reload_as_float {
        config.reload_as_float = true;
    }
    if let Some(quality) = args.quality {
        config.jpeg_quality = quality;
    }
    if args.sequential {
        config.parallel = false;
    }
    if let Some(len) = args.profile_len {
        config.profile_len = len;
    }
    if let Some(report) = args.report {
        config.report_path = Some(report);
    }

    config.validate()?;
    Ok(config)
}

/// Parse a single rank, rejecting zero up front
fn parse_rank(value: &str) -> Result<usize> {
    let rank: usize = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid rank: {}", value))?;
    if rank == 0 {
        return Err(anyhow!("Rank must be at least 1"));
    }
    Ok(rank)
}

fn print_summary(summary: &BatchSummary) {
    println!("Compression finished:");
    for image in &summary.images {
        match &image.outcome {
            ImageOutcome::Completed { writes } => {
                println!("  {}", image.path.display());
                for write in writes {
                    match &write.result {
                        Ok(path) => println!("    rank {:>4} -> {}", write.rank, path.display()),
                        Err(e) => println!("    rank {:>4} FAILED: {}", write.rank, e),
                    }
                }
            }
            ImageOutcome::Failed(e) => {
                println!("  {} FAILED: {}", image.path.display(), e);
            }
        }
    }
    println!(
        "  {} succeeded, {} failed",
        summary.succeeded(),
        summary.failed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranks() {
        assert_eq!(parse_rank("20").unwrap(), 20);
        assert_eq!(parse_rank(" 5 ").unwrap(), 5);
        assert!(parse_rank("0").is_err());
        assert!(parse_rank("five").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "svdc", "a.png", "b.png", "-r", "3,9", "--variant", "human", "--sequential",
        ]);
        let config = resolve_config(args).unwrap();
        assert_eq!(config.images.len(), 2);
        assert_eq!(config.ranks, vec![3, 9]);
        assert_eq!(config.variant, "human");
        assert!(!config.parallel);
        assert_eq!(config.jpeg_quality, 95);
    }

    #[test]
    fn missing_images_is_rejected() {
        let args = Args::parse_from(["svdc"]);
        assert!(resolve_config(args).is_err());
    }
}
