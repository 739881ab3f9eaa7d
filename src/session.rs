//! # Compression Session Management
//!
//! High-level orchestration of a batch of images. Provides a builder-pattern API for
//! wiring an image source, an image sink and report sinks around a
//! [`CompressionPipeline`].
//!
//! ## Architecture
//!
//! 1. **ImageSource**: decodes each path into a `SourceImage`
//! 2. **CompressionPipeline**: factorizes, truncates and assembles every rank
//! 3. **ImageSink / ReportMultiplexer**: persist reconstructions and diagnostics
//! 4. **CompressionSessionBuilder**: fluent configuration of the above
//!
//! ## Failure Handling
//!
//! Images are processed one after another and are independent of each other:
//! - A load or numerical failure is logged, recorded in the summary, and the batch
//!   moves on to the next image.
//! - A write failure affects only its rank.
//! - A shape mismatch between channels is a defect and aborts the batch.

// Standard library imports
use std::path::{Path, PathBuf};

// External crate imports
use tracing::{error, info, warn};

// Internal module imports
use crate::error::{CompressError, CompressResult, classify};
use crate::io::report::{ReportMultiplexer, ReportSink};
use crate::io::sink::ImageSink;
use crate::io::source::{FileImageSource, ImageSource};
use crate::processing::pipeline::{CompressionPipeline, PipelineOptions, RankWrite};

/// What happened to one image.
#[derive(Debug)]
pub enum ImageOutcome {
    /// The pipeline ran; each rank carries its own write result.
    Completed { writes: Vec<RankWrite> },
    /// The image produced no output.
    Failed(CompressError),
}

/// Per-image entry in a [`BatchSummary`].
#[derive(Debug)]
pub struct ImageSummary {
    pub path: PathBuf,
    pub outcome: ImageOutcome,
}

impl ImageSummary {
    /// True when every configured rank was written.
    pub fn is_success(&self) -> bool {
        match &self.outcome {
            ImageOutcome::Completed { writes } => writes.iter().all(RankWrite::is_ok),
            ImageOutcome::Failed(_) => false,
        }
    }

    /// Paths of the reconstructions that were written.
    pub fn written(&self) -> Vec<&Path> {
        match &self.outcome {
            ImageOutcome::Completed { writes } => writes
                .iter()
                .filter_map(|w| w.result.as_ref().ok().map(PathBuf::as_path))
                .collect(),
            ImageOutcome::Failed(_) => Vec::new(),
        }
    }

    /// Errors recorded for this image, whether image-level or per rank.
    pub fn errors(&self) -> Vec<&CompressError> {
        match &self.outcome {
            ImageOutcome::Completed { writes } => writes
                .iter()
                .filter_map(|w| w.result.as_ref().err())
                .collect(),
            ImageOutcome::Failed(e) => vec![e],
        }
    }
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub images: Vec<ImageSummary>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.images.iter().filter(|i| i.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.images.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Batch compression session.
pub struct CompressionSession {
    pipeline: CompressionPipeline,
    source: Box<dyn ImageSource>,
    sink: Box<dyn ImageSink>,
    reports: ReportMultiplexer,
}

impl CompressionSession {
    /// Create a new compression session using the builder pattern.
    pub fn builder() -> CompressionSessionBuilder {
        CompressionSessionBuilder::new()
    }

    pub fn pipeline(&self) -> &CompressionPipeline {
        &self.pipeline
    }

    /// Process every image in `paths`.
    ///
    /// # Errors
    ///
    /// Only defects abort the batch (see [`classify::is_defect`]). Everything else is
    /// recorded in the returned summary.
    pub async fn run(&self, paths: &[PathBuf]) -> CompressResult<BatchSummary> {
        let mut summary = BatchSummary::default();
        let total = paths.len();

        for (index, path) in paths.iter().enumerate() {
            info!(
                image = %path.display(),
                "processing image {}/{}",
                index + 1,
                total
            );
            let outcome = match self.process(path).await {
                Ok(writes) => ImageOutcome::Completed { writes },
                Err(e) if classify::is_defect(&e) => {
                    error!(image = %path.display(), "aborting batch: {}", e);
                    return Err(e);
                }
                Err(e) if classify::is_fatal_for_image(&e) => {
                    warn!(image = %path.display(), category = e.category(), "skipping image: {}", e);
                    ImageOutcome::Failed(e)
                }
                Err(e) => {
                    error!(image = %path.display(), category = e.category(), "image failed: {}", e);
                    ImageOutcome::Failed(e)
                }
            };
            summary.images.push(ImageSummary {
                path: path.clone(),
                outcome,
            });
        }

        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "batch finished"
        );
        Ok(summary)
    }

    async fn process(&self, path: &Path) -> CompressResult<Vec<RankWrite>> {
        let image = self.source.load(path).await?;
        info!(
            image = image.name(),
            height = image.height(),
            width = image.width(),
            "loaded"
        );
        let compressed = self.pipeline.run(image).await?;
        Ok(self
            .pipeline
            .emit(&compressed, self.sink.as_ref(), &self.reports)
            .await)
    }
}

/// Builder for creating compression sessions with a fluent API.
pub struct CompressionSessionBuilder {
    options: PipelineOptions,
    source: Option<Box<dyn ImageSource>>,
    sink: Option<Box<dyn ImageSink>>,
    reports: ReportMultiplexer,
}

impl Default for CompressionSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionSessionBuilder {
    /// Create a new session builder.
    pub fn new() -> Self {
        Self {
            options: PipelineOptions::default(),
            source: None,
            sink: None,
            reports: ReportMultiplexer::new(),
        }
    }

    /// Set the pipeline options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the image source. Defaults to 8-bit [`FileImageSource`].
    pub fn with_source<S: ImageSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Set the destination for reconstructions.
    pub fn with_sink<S: ImageSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Add a report sink. May be called repeatedly.
    pub fn with_report_sink<R: ReportSink + 'static>(mut self, sink: R) -> Self {
        self.reports.add_sink(Box::new(sink));
        self
    }

    /// Build the session with the configured components.
    pub fn build(self) -> CompressResult<CompressionSession> {
        let sink = self
            .sink
            .ok_or_else(|| CompressError::config("sink", "none", "no image sink configured"))?;
        let source = self
            .source
            .unwrap_or_else(|| Box::new(FileImageSource::default()));

        Ok(CompressionSession {
            pipeline: CompressionPipeline::new(self.options),
            source,
            sink,
            reports: self.reports,
        })
    }
}
