//! # Configuration Module
//!
//! This module provides configuration structures and validation for batch compression.
//! It is the common interface between the CLI, JSON configuration files and the core
//! library.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `images` | `Vec<PathBuf>` | at least one | Source image paths |
//! | `output_dir` | `PathBuf` | Any writable path | Directory for reconstructions |
//! | `ranks` | `Vec<usize>` | each ≥ 1, unique | Truncation ranks |
//! | `variant` | `String` | non-empty, no separators | Tag in output file names |
//! | `reload_as_float` | `bool` | true/false | Decode via the float path |
//! | `jpeg_quality` | `u8` | 1-100 | JPEG encoder quality |
//! | `parallel` | `bool` | true/false | Fan channels and ranks out |
//! | `profile_len` | `usize` | any | Singular values reported per channel |
//! | `report_path` | `Option<PathBuf>` | Any writable path | JSON-lines report file |
//!
//! ## Examples
//!
//! ```rust
//! use svd_image_compress::config::config::CompressConfig;
//!
//! let mut config = CompressConfig::default();
//! config.images = vec!["cat.png".into()];
//! assert!(config.validate().is_ok());
//!
//! let options = config.to_options();
//! assert_eq!(options.ranks, vec![5, 20, 50]);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompressError, CompressResult};
use crate::io::sink::DEFAULT_JPEG_QUALITY;
use crate::processing::pipeline::{DEFAULT_PROFILE_LEN, DEFAULT_RANKS, PipelineOptions};

/// Configuration for a batch compression run.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "images": ["silksong.png"], "ranks": [10, 40], "variant": "human" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressConfig {
    /// Source images, processed in order.
    pub images: Vec<PathBuf>,

    /// Directory reconstructions are written into. Created on demand.
    pub output_dir: PathBuf,

    /// Truncation ranks. Ranks above `min(height, width)` are clamped per image.
    pub ranks: Vec<usize>,

    /// Tag placed between the base name and the rank in output file names.
    pub variant: String,

    /// Decode images to 32-bit float RGB instead of 8-bit.
    pub reload_as_float: bool,

    /// JPEG quality for written reconstructions.
    pub jpeg_quality: u8,

    /// Run channel and rank work concurrently.
    pub parallel: bool,

    /// Number of leading singular values reported per channel.
    pub profile_len: usize,

    /// Optional JSON-lines file receiving every report event.
    pub report_path: Option<PathBuf>,
}

impl Default for CompressConfig {
    /// Default values:
    /// - `output_dir`: "result"
    /// - `ranks`: 5, 20, 50
    /// - `variant`: "svd"
    /// - `jpeg_quality`: 95
    /// - `parallel`: true
    fn default() -> Self {
        Self {
            images: Vec::new(),
            output_dir: PathBuf::from("result"),
            ranks: DEFAULT_RANKS.to_vec(),
            variant: "svd".to_string(),
            reload_as_float: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            parallel: true,
            profile_len: DEFAULT_PROFILE_LEN,
            report_path: None,
        }
    }
}

impl CompressConfig {
    /// Creates a configuration for `images` with every other field defaulted.
    pub fn new(images: Vec<PathBuf>) -> Self {
        Self {
            images,
            ..Self::default()
        }
    }

    /// Read a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> CompressResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CompressError::io("read_config", e).with_path(path.display().to_string()))?;
        serde_json::from_str(&text).map_err(|e| {
            CompressError::config("config_file", path.display().to_string(), e.to_string())
        })
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> CompressResult<()> {
        if self.images.is_empty() {
            return Err(CompressError::config(
                "images",
                "[]",
                "at least one image is required",
            ));
        }
        if self.ranks.is_empty() {
            return Err(CompressError::config(
                "ranks",
                "[]",
                "at least one rank is required",
            ));
        }
        if self.ranks.contains(&0) {
            return Err(CompressError::config(
                "ranks",
                format!("{:?}", self.ranks),
                "ranks must be at least 1",
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.ranks.iter().find(|&&rank| !seen.insert(rank)) {
            return Err(CompressError::config(
                "ranks",
                dup.to_string(),
                "duplicate rank would overwrite its own output",
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(CompressError::config(
                "jpeg_quality",
                self.jpeg_quality.to_string(),
                "JPEG quality must be between 1 and 100",
            ));
        }
        if self.variant.is_empty() {
            return Err(CompressError::config(
                "variant",
                "",
                "variant tag must not be empty",
            ));
        }
        if self.variant.contains(['/', '\\']) {
            return Err(CompressError::config(
                "variant",
                self.variant.clone(),
                "variant tag must not contain path separators",
            ));
        }
        Ok(())
    }

    /// Convert to the options consumed by the compression pipeline.
    pub fn to_options(&self) -> PipelineOptions {
        PipelineOptions {
            ranks: self.ranks.clone(),
            variant: self.variant.clone(),
            parallel: self.parallel,
            profile_len: self.profile_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CompressConfig {
        CompressConfig::new(vec![PathBuf::from("cat.png")])
    }

    #[test]
    fn test_default_config() {
        let config = CompressConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("result"));
        assert_eq!(config.ranks, vec![5, 20, 50]);
        assert_eq!(config.variant, "svd");
        assert_eq!(config.jpeg_quality, 95);
        assert!(!config.reload_as_float);
        assert!(config.parallel);
    }

    #[test]
    fn test_config_validation() {
        let mut config = valid();
        assert!(config.validate().is_ok());

        config.images.clear();
        assert!(config.validate().is_err());
        config = valid();

        config.ranks = vec![];
        assert!(config.validate().is_err());
        config.ranks = vec![5, 0];
        assert!(config.validate().is_err());
        config.ranks = vec![5, 20, 5];
        assert!(config.validate().is_err());
        config = valid();

        config.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.jpeg_quality = 101;
        assert!(config.validate().is_err());
        config = valid();

        config.variant = String::new();
        assert!(config.validate().is_err());
        config.variant = "../escape".to_string();
        assert!(config.validate().is_err());
        config.variant = "human".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_reports_field() {
        let mut config = valid();
        config.ranks = vec![0];
        match config.validate().unwrap_err() {
            CompressError::Config { field, .. } => assert_eq!(field, "ranks"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_json_file_with_partial_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "images": ["a.png", "b.png"], "ranks": [10, 40], "variant": "human" }"#,
        )
        .unwrap();

        let config = CompressConfig::from_json_file(&path).unwrap();
        assert_eq!(config.images.len(), 2);
        assert_eq!(config.ranks, vec![10, 40]);
        assert_eq!(config.variant, "human");
        assert_eq!(config.jpeg_quality, 95);
    }

    #[test]
    fn test_json_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "rank": [1] }"#).unwrap();
        let err = CompressConfig::from_json_file(&path).unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CompressConfig::from_json_file("no/such/config.json").unwrap_err();
        assert_eq!(err.category(), "io");
    }

    #[test]
    fn test_to_options() {
        let mut config = valid();
        config.parallel = false;
        config.variant = "human".into();
        let options = config.to_options();
        assert_eq!(options.ranks, config.ranks);
        assert_eq!(options.variant, "human");
        assert!(!options.parallel);
    }
}
