//! # Compression Pipeline
//!
//! Drives one [`SourceImage`] through per-channel factorization, rank-k truncation and
//! assembly, then hands the finished reconstructions to an [`ImageSink`].
//!
//! ## Stages
//!
//! ```text
//! Loaded ──> Factorized ──> Reconstructing ──> Done
//!   │            │                │
//!   │            │                └─ per rank: truncate R/G/B concurrently, assemble + clip
//!   │            └─ R/G/B factorized concurrently, shared as Arc<Factorization>
//!   └─ three f64 channel matrices
//! ```
//!
//! Channels are independent until assembly, so they fan out onto the blocking pool. Ranks
//! are independent given the factorizations, so they fan out too. A failure in any
//! channel aborts the whole image before anything is written: every rank is computed
//! first, then [`CompressionPipeline::emit`] persists them.
//!
//! With `parallel = false` the same stages run one after another on the caller's task.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::{try_join_all, try_join3};
use image::RgbImage;
use svd_rank::energy::{EnergyReport, analyze};
use svd_rank::{
    ChannelMatrix, Factorization, SvdError, TruncationResult, factorize, storage_ratio_percent,
};
use tracing::{debug, error, info, warn};

use crate::core::image::{CHANNEL_NAMES, ReconstructedImage, SourceImage};
use crate::error::{CompressError, CompressResult, classify};
use crate::io::report::{ReportEvent, ReportMultiplexer};
use crate::io::sink::{ImageSink, OutputName};
use crate::processing::assembler::assemble;
use crate::processing::quality::{QualityMetrics, compare};

/// Ranks reconstructed when nothing else is configured.
pub const DEFAULT_RANKS: [usize; 3] = [5, 20, 50];

/// Number of leading singular values reported per channel by default.
pub const DEFAULT_PROFILE_LEN: usize = 100;

/// Options controlling a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Truncation ranks, in output order.
    pub ranks: Vec<usize>,
    /// Variant tag inserted into output file names.
    pub variant: String,
    /// Fan channels and ranks out onto the blocking pool.
    pub parallel: bool,
    /// How many leading singular values to report per channel.
    pub profile_len: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            ranks: DEFAULT_RANKS.to_vec(),
            variant: "svd".to_string(),
            parallel: true,
            profile_len: DEFAULT_PROFILE_LEN,
        }
    }
}

/// Where an image is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Loaded,
    Factorized,
    Reconstructing,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Loaded => "loaded",
            PipelineStage::Factorized => "factorized",
            PipelineStage::Reconstructing => "reconstructing",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Energy retained by one channel at each configured rank.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEnergy {
    pub channel: &'static str,
    pub reports: Vec<EnergyReport>,
}

/// Leading singular values of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SingularValueProfile {
    pub channel: &'static str,
    pub values: Vec<f64>,
}

/// One rank's reconstruction plus its diagnostics.
#[derive(Debug, Clone)]
pub struct RankReconstruction {
    pub image: ReconstructedImage,
    /// Storage of the rank-k factors relative to the raw image, in percent.
    pub storage_ratio_percent: f64,
    /// `None` only if the reconstruction dimensions disagree with the source.
    pub quality: Option<QualityMetrics>,
}

/// Everything produced for one source image, ready to be emitted.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub name: String,
    pub height: usize,
    pub width: usize,
    pub energy: Vec<ChannelEnergy>,
    pub profiles: Vec<SingularValueProfile>,
    pub reconstructions: Vec<RankReconstruction>,
}

impl CompressedImage {
    /// Reconstruction for a requested rank, if configured.
    pub fn rank(&self, rank: usize) -> Option<&RankReconstruction> {
        self.reconstructions.iter().find(|r| r.image.rank == rank)
    }
}

/// Outcome of persisting one rank.
#[derive(Debug)]
pub struct RankWrite {
    pub rank: usize,
    pub name: OutputName,
    pub result: CompressResult<PathBuf>,
}

impl RankWrite {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-image factorize / truncate / assemble pipeline.
#[derive(Debug, Clone, Default)]
pub struct CompressionPipeline {
    options: PipelineOptions,
}

impl CompressionPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Factorize, truncate and assemble every configured rank of `image`.
    ///
    /// # Errors
    ///
    /// - [`CompressError::Numerical`] if any channel fails to factorize.
    /// - [`CompressError::ShapeMismatch`] if channel reconstructions disagree in shape.
    pub async fn run(&self, image: SourceImage) -> CompressResult<CompressedImage> {
        let name = image.name().to_string();
        let (height, width) = (image.height(), image.width());
        let original = image.original().clone();
        log_stage(&name, PipelineStage::Loaded);

        let channels = image.into_channels();
        let factors = if self.options.parallel {
            factorize_parallel(&name, channels).await?
        } else {
            factorize_sequential(&name, &channels)?
        };
        log_stage(&name, PipelineStage::Factorized);

        let energy = CHANNEL_NAMES
            .iter()
            .zip(&factors)
            .map(|(&channel, f)| ChannelEnergy {
                channel,
                reports: analyze(f.singular_values().as_slice(), &self.options.ranks),
            })
            .collect();
        let profiles = CHANNEL_NAMES
            .iter()
            .zip(&factors)
            .map(|(&channel, f)| SingularValueProfile {
                channel,
                values: f
                    .singular_values()
                    .iter()
                    .take(self.options.profile_len)
                    .copied()
                    .collect(),
            })
            .collect();

        log_stage(&name, PipelineStage::Reconstructing);
        let reconstructions = if self.options.parallel {
            let tasks = self
                .options
                .ranks
                .iter()
                .map(|&rank| reconstruct_parallel(&name, &factors, rank, &original));
            try_join_all(tasks).await?
        } else {
            self.options
                .ranks
                .iter()
                .map(|&rank| reconstruct_sequential(&name, &factors, rank, &original))
                .collect::<CompressResult<Vec<_>>>()?
        };
        log_stage(&name, PipelineStage::Done);

        Ok(CompressedImage {
            name,
            height,
            width,
            energy,
            profiles,
            reconstructions,
        })
    }

    /// Publish diagnostics and persist every rank of `compressed`.
    ///
    /// Ranks are written independently: a failed write is logged and recorded in its
    /// [`RankWrite`], and the remaining ranks are still attempted.
    pub async fn emit(
        &self,
        compressed: &CompressedImage,
        sink: &dyn ImageSink,
        reports: &ReportMultiplexer,
    ) -> Vec<RankWrite> {
        for event in report_events(compressed) {
            reports.publish(&event).await;
        }

        let mut writes = Vec::with_capacity(compressed.reconstructions.len());
        for reconstruction in &compressed.reconstructions {
            let rank = reconstruction.image.rank;
            let name = OutputName::new(&compressed.name, &self.options.variant, rank);
            let result = sink.write(&reconstruction.image, &name).await;
            match &result {
                Ok(path) => info!(image = %compressed.name, rank, path = %path.display(), "saved"),
                Err(e) if classify::is_per_rank(e) => {
                    warn!(image = %compressed.name, rank, "{}", e)
                }
                Err(e) => error!(image = %compressed.name, rank, category = e.category(), "{}", e),
            }
            writes.push(RankWrite { rank, name, result });
        }
        writes
    }
}

fn log_stage(image: &str, stage: PipelineStage) {
    debug!(%image, %stage, "pipeline stage");
}

fn channel_error(image: &str, channel: &str, error: SvdError) -> CompressError {
    match error {
        SvdError::InvalidRank { rank } => {
            CompressError::config("ranks", rank.to_string(), "rank must be at least 1")
        }
        other => CompressError::numerical(image, Some(channel), other),
    }
}

async fn factorize_blocking(
    image: &str,
    channel: ChannelMatrix,
    channel_name: &'static str,
) -> CompressResult<Arc<Factorization>> {
    tokio::task::spawn_blocking(move || factorize(&channel))
        .await
        .map_err(|e| CompressError::external("tokio", e))?
        .map(Arc::new)
        .map_err(|e| channel_error(image, channel_name, e))
}

async fn factorize_parallel(
    image: &str,
    channels: [ChannelMatrix; 3],
) -> CompressResult<[Arc<Factorization>; 3]> {
    let [red, green, blue] = channels;
    let (red, green, blue) = try_join3(
        factorize_blocking(image, red, CHANNEL_NAMES[0]),
        factorize_blocking(image, green, CHANNEL_NAMES[1]),
        factorize_blocking(image, blue, CHANNEL_NAMES[2]),
    )
    .await?;
    Ok([red, green, blue])
}

fn factorize_sequential(
    image: &str,
    channels: &[ChannelMatrix; 3],
) -> CompressResult<[Arc<Factorization>; 3]> {
    let factorize_channel = |i: usize| {
        factorize(&channels[i])
            .map(Arc::new)
            .map_err(|e| channel_error(image, CHANNEL_NAMES[i], e))
    };
    Ok([
        factorize_channel(0)?,
        factorize_channel(1)?,
        factorize_channel(2)?,
    ])
}

async fn truncate_blocking(
    image: &str,
    factor: &Arc<Factorization>,
    channel_name: &'static str,
    rank: usize,
) -> CompressResult<TruncationResult> {
    let factor = Arc::clone(factor);
    tokio::task::spawn_blocking(move || factor.truncate(rank))
        .await
        .map_err(|e| CompressError::external("tokio", e))?
        .map_err(|e| channel_error(image, channel_name, e))
}

async fn reconstruct_parallel(
    image: &str,
    factors: &[Arc<Factorization>; 3],
    rank: usize,
    original: &RgbImage,
) -> CompressResult<RankReconstruction> {
    let [red, green, blue] = factors;
    let (red, green, blue) = try_join3(
        truncate_blocking(image, red, CHANNEL_NAMES[0], rank),
        truncate_blocking(image, green, CHANNEL_NAMES[1], rank),
        truncate_blocking(image, blue, CHANNEL_NAMES[2], rank),
    )
    .await?;
    finish_rank(image, rank, [red, green, blue], original)
}

fn reconstruct_sequential(
    image: &str,
    factors: &[Arc<Factorization>; 3],
    rank: usize,
    original: &RgbImage,
) -> CompressResult<RankReconstruction> {
    let truncate_channel = |i: usize| {
        factors[i]
            .truncate(rank)
            .map_err(|e| channel_error(image, CHANNEL_NAMES[i], e))
    };
    let truncated = [
        truncate_channel(0)?,
        truncate_channel(1)?,
        truncate_channel(2)?,
    ];
    finish_rank(image, rank, truncated, original)
}

fn finish_rank(
    image: &str,
    rank: usize,
    truncated: [TruncationResult; 3],
    original: &RgbImage,
) -> CompressResult<RankReconstruction> {
    let [r, g, b] = &truncated;
    let pixels = assemble([&r.matrix, &g.matrix, &b.matrix])?;
    let effective_rank = r.effective_rank;
    if r.was_clamped() {
        debug!(%image, rank, effective_rank, "rank clamped to image size");
    }

    let (height, width) = (pixels.height() as usize, pixels.width() as usize);
    let quality = compare(original, &pixels);
    Ok(RankReconstruction {
        image: ReconstructedImage::new(rank, effective_rank, pixels),
        storage_ratio_percent: storage_ratio_percent(height, width, effective_rank),
        quality,
    })
}

/// Flatten a compressed image's diagnostics into report events.
pub fn report_events(compressed: &CompressedImage) -> Vec<ReportEvent> {
    let mut events = Vec::new();
    for channel in &compressed.energy {
        for report in &channel.reports {
            events.push(ReportEvent::ChannelEnergy {
                image: compressed.name.clone(),
                channel: channel.channel.to_string(),
                rank: report.rank,
                effective_rank: report.effective_rank,
                energy_ratio: report.energy_ratio,
            });
        }
    }
    for reconstruction in &compressed.reconstructions {
        events.push(ReportEvent::CompressionRatio {
            image: compressed.name.clone(),
            rank: reconstruction.image.rank,
            height: compressed.height,
            width: compressed.width,
            percent: reconstruction.storage_ratio_percent,
        });
        if let Some(metrics) = reconstruction.quality {
            events.push(ReportEvent::Quality {
                image: compressed.name.clone(),
                rank: reconstruction.image.rank,
                metrics,
            });
        }
    }
    for profile in &compressed.profiles {
        events.push(ReportEvent::SingularValueProfile {
            image: compressed.name.clone(),
            channel: profile.channel.to_string(),
            values: profile.values.clone(),
        });
    }
    events
}
