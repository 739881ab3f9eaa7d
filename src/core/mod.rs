//! # Core Data Model
//!
//! The image types that flow between loading, the compression pipeline and the sinks.

pub mod image;

pub use image::{CHANNEL_NAMES, ReconstructedImage, SourceImage};
