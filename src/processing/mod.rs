//! # Processing Module
//!
//! This module contains the per-image compression pipeline: channel factorization,
//! rank-k reconstruction, assembly into 8-bit RGB and quality measurement.

pub mod assembler;
pub mod pipeline;
pub mod quality;

// Re-export commonly used types for convenience
pub use assembler::{assemble, quantize};
pub use pipeline::{
    CompressedImage, CompressionPipeline, PipelineOptions, PipelineStage, RankReconstruction,
    RankWrite,
};
pub use quality::QualityMetrics;
