//! # Diagnostic Reports
//!
//! Energy ratios, storage ratios, singular value profiles and quality metrics are emitted
//! as [`ReportEvent`]s. They are informational: a [`ReportSink`] that fails is logged and
//! skipped, never allowed to abort image processing.
//!
//! ## Architecture
//!
//! ```text
//! CompressionPipeline::emit ──> ReportMultiplexer ──┬──> LogReportSink      (tracing)
//!                                                   ├──> JsonLinesReportSink (file)
//!                                                   └──> MemoryReportSink    (tests)
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::processing::quality::QualityMetrics;

/// One diagnostic observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    /// Fraction of a channel's energy retained at a rank.
    ChannelEnergy {
        image: String,
        channel: String,
        rank: usize,
        effective_rank: usize,
        energy_ratio: f64,
    },
    /// Storage needed for the rank-k factors as a percentage of the raw image.
    CompressionRatio {
        image: String,
        rank: usize,
        height: usize,
        width: usize,
        percent: f64,
    },
    /// Leading singular values of a channel, largest first.
    SingularValueProfile {
        image: String,
        channel: String,
        values: Vec<f64>,
    },
    /// Distortion of a reconstruction against the source pixels.
    Quality {
        image: String,
        rank: usize,
        #[serde(flatten)]
        metrics: QualityMetrics,
    },
}

/// Destination for report events.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Record a single event.
    async fn record(&self, event: &ReportEvent) -> Result<()>;

    /// Short identifier used in log messages.
    fn name(&self) -> &str;
}

/// Writes report events to the `tracing` log.
#[derive(Debug, Default)]
pub struct LogReportSink;

#[async_trait]
impl ReportSink for LogReportSink {
    async fn record(&self, event: &ReportEvent) -> Result<()> {
        match event {
            ReportEvent::ChannelEnergy {
                image,
                channel,
                rank,
                effective_rank,
                energy_ratio,
            } => info!(
                %image,
                %channel,
                rank,
                effective_rank,
                "energy retained: {:.4}",
                energy_ratio
            ),
            ReportEvent::CompressionRatio {
                image,
                rank,
                percent,
                ..
            } => info!(%image, rank, "storage ratio: {:.2}%", percent),
            ReportEvent::SingularValueProfile {
                image,
                channel,
                values,
            } => info!(
                %image,
                %channel,
                count = values.len(),
                largest = values.first().copied().unwrap_or(0.0),
                "singular value profile"
            ),
            ReportEvent::Quality {
                image,
                rank,
                metrics,
            } => match metrics.psnr_db {
                Some(psnr) => info!(%image, rank, mse = metrics.mse, "PSNR: {:.2} dB", psnr),
                None => info!(%image, rank, "lossless reconstruction"),
            },
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Appends one JSON object per event to a file.
#[derive(Debug)]
pub struct JsonLinesReportSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesReportSink {
    /// Create (or truncate) the report file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .map_err(|e| anyhow!("cannot create report file {}: {}", path.display(), e))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

#[async_trait]
impl ReportSink for JsonLinesReportSink {
    async fn record(&self, event: &ReportEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("report writer lock poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn record(&self, event: &ReportEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow!("memory report lock poisoned"))?
            .push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[async_trait]
impl<T: ReportSink + ?Sized> ReportSink for Arc<T> {
    async fn record(&self, event: &ReportEvent) -> Result<()> {
        (**self).record(event).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Broadcasts events to several report sinks.
#[derive(Default)]
pub struct ReportMultiplexer {
    pub sinks: Vec<Box<dyn ReportSink>>,
}

impl ReportMultiplexer {
    /// Create an empty multiplexer.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    /// Send an event to all sinks concurrently.
    ///
    /// Failures are logged and counted; the return value is the number of sinks that failed.
    pub async fn publish(&self, event: &ReportEvent) -> usize {
        let futures = self.sinks.iter().map(|sink| sink.record(event));
        let mut failures = 0;
        for (sink, result) in self.sinks.iter().zip(join_all(futures).await) {
            if let Err(e) = result {
                failures += 1;
                warn!(sink = sink.name(), "report sink failed: {:#}", e);
            }
        }
        failures
    }
}

impl std::fmt::Debug for ReportMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportMultiplexer")
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}
