//! # SVD Image Compression Library
//!
//! Low-rank approximation of RGB images. Each colour channel is factorized with a
//! singular value decomposition, truncated to its k largest singular values and
//! reconstructed; the three approximations are merged, clipped to `[0, 255]` and written
//! as JPEG. Energy retained, storage ratio and reconstruction quality are reported for
//! every rank.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `core`: The source and reconstructed image types
//! - `processing`: Factorize / truncate / assemble pipeline and quality metrics
//! - `io`: Image loading, JPEG writing and diagnostic report sinks
//! - `config`: Configuration management and validation
//! - `session`: Batch orchestration over many images
//!
//! The numerical kernel (factorization, truncation, energy analysis) lives in the
//! `svd-rank` workspace crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use svd_image_compress::compress_images;
//! use svd_image_compress::config::CompressConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut config = CompressConfig::new(vec!["silksong.png".into()]);
//! config.ranks = vec![5, 20, 50];
//! config.output_dir = "result".into();
//!
//! let summary = compress_images(&config).await?;
//! println!("{} images compressed", summary.succeeded());
//! # Ok(())
//! # }
//! ```

// External crate imports
use anyhow::Result;
use tracing::info;

// Internal module imports
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod processing;
pub mod session;

/// Re-export error types for convenience
pub use error::{CompressError, CompressResult, ErrorSeverity, HasSeverity};

/// Re-export the numerical kernel
pub use svd_rank;

pub use config::CompressConfig;
pub use session::{BatchSummary, CompressionSession, ImageOutcome, ImageSummary};

use io::report::{JsonLinesReportSink, LogReportSink};
use io::sink::JpegFileSink;
use io::source::FileImageSource;

/// Wire a [`CompressionSession`] from a validated configuration.
///
/// Reports always go to the log; when `report_path` is set they are also appended to
/// that file as JSON lines.
pub fn build_session(config: &CompressConfig) -> CompressResult<CompressionSession> {
    config.validate()?;

    let mut builder = CompressionSession::builder()
        .with_options(config.to_options())
        .with_source(FileImageSource::new(config.reload_as_float))
        .with_sink(JpegFileSink::new(&config.output_dir, config.jpeg_quality))
        .with_report_sink(LogReportSink);

    if let Some(path) = &config.report_path {
        let sink = JsonLinesReportSink::create(path).map_err(|e| {
            CompressError::config("report_path", path.display().to_string(), e.to_string())
        })?;
        builder = builder.with_report_sink(sink);
    }

    builder.build()
}

/// Main entry point for batch compression.
///
/// Validates `config`, processes every image and returns the per-image summary. Image
/// level failures are recorded in the summary; only configuration problems and defects
/// are returned as errors.
pub async fn compress_images(config: &CompressConfig) -> Result<BatchSummary> {
    info!(
        images = config.images.len(),
        ranks = ?config.ranks,
        output_dir = %config.output_dir.display(),
        "starting compression"
    );

    let session = build_session(config)?;
    let summary = session.run(&config.images).await?;
    Ok(summary)
}
