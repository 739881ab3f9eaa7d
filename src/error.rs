//! # Error Handling for the Compression Pipeline
//!
//! This module defines the error taxonomy of the compressor together with the context
//! carried alongside each error (which file, which rank, which stage).
//!
//! ## Error Kinds
//!
//! | Kind | Raised by | Effect |
//! |------|-----------|--------|
//! | `Load` | image loader | the image is skipped, the batch continues |
//! | `Numerical` | SVD factorization | the image is skipped, no rank is emitted |
//! | `ShapeMismatch` | image assembler | programming defect, the batch stops |
//! | `Write` | image writer | only that rank is lost, other ranks are still written |
//! | `Config` | configuration validation | nothing runs |
//! | `Io` / `External` | glue code | reported with the operation that failed |
//!
//! ## Usage
//!
//! ```rust
//! use svd_image_compress::error::{classify, CompressError};
//!
//! let error = CompressError::write("result/cat_svd_20.jpg", 20, "permission denied")
//!     .with_context("persisting reconstruction");
//!
//! assert_eq!(error.category(), "write");
//! assert!(classify::is_per_rank(&error));
//! assert!(!classify::is_fatal_for_image(&error));
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

use svd_rank::SvdError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Something was lost but processing continues (e.g. one rank failed to write)
    Warning,
    /// The current image cannot be completed
    Error,
    /// An internal invariant was violated; nothing further should run
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional free-form context
    pub context: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Additional metadata as key-value pairs (image, rank, stage, ...)
    pub metadata: std::collections::BTreeMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            severity: ErrorSeverity::Error,
            metadata: std::collections::BTreeMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Base error type for the compressor
#[derive(Debug)]
pub enum CompressError {
    /// The source image could not be read or decoded
    Load {
        path: String,
        reason: String,
        context: ErrorContext,
    },
    /// The decomposition of a channel failed
    Numerical {
        image: String,
        channel: Option<String>,
        source: SvdError,
        context: ErrorContext,
    },
    /// Channels of differing shape reached the assembler
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
        channel: String,
        context: ErrorContext,
    },
    /// A reconstruction could not be persisted
    Write {
        path: String,
        rank: usize,
        reason: String,
        context: ErrorContext,
    },
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors outside of image loading and writing
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
}

impl CompressError {
    /// Create a load error
    pub fn load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a numerical failure for an image, optionally naming the channel
    pub fn numerical(image: impl Into<String>, channel: Option<&str>, source: SvdError) -> Self {
        Self::Numerical {
            image: image.into(),
            channel: channel.map(str::to_string),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(
        channel: impl Into<String>,
        expected: (usize, usize),
        found: (usize, usize),
    ) -> Self {
        Self::ShapeMismatch {
            expected,
            found,
            channel: channel.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    /// Create a write error for one rank
    pub fn write(path: impl Into<String>, rank: usize, reason: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            rank,
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Attach the path to an I/O error (no-op for other kinds)
    pub fn with_path(mut self, new_path: impl Into<String>) -> Self {
        if let Self::Io { path, .. } = &mut self {
            *path = Some(new_path.into());
        }
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Load { context, .. } => context,
            Self::Numerical { context, .. } => context,
            Self::ShapeMismatch { context, .. } => context,
            Self::Write { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Load { context, .. } => context,
            Self::Numerical { context, .. } => context,
            Self::ShapeMismatch { context, .. } => context,
            Self::Write { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Numerical { .. } => "numerical",
            Self::ShapeMismatch { .. } => "shape_mismatch",
            Self::Write { .. } => "write",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
        }
    }
}

impl fmt::Display for CompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressError::Load { path, reason, .. } => {
                write!(f, "Failed to load image '{}': {}", path, reason)
            }
            CompressError::Numerical {
                image,
                channel,
                source,
                ..
            } => match channel {
                Some(channel) => write!(
                    f,
                    "Numerical failure in {} channel of '{}': {}",
                    channel, image, source
                ),
                None => write!(f, "Numerical failure for '{}': {}", image, source),
            },
            CompressError::ShapeMismatch {
                expected,
                found,
                channel,
                ..
            } => {
                write!(
                    f,
                    "Channel shape mismatch: {} channel is {}x{}, expected {}x{}",
                    channel, found.0, found.1, expected.0, expected.1
                )
            }
            CompressError::Write {
                path, rank, reason, ..
            } => {
                write!(f, "Failed to write rank {} to '{}': {}", rank, path, reason)
            }
            CompressError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            CompressError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            CompressError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
        }
    }
}

impl StdError for CompressError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Numerical { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type CompressResult<T> = Result<T, CompressError>;

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for CompressError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// The current image cannot produce any rank; move on to the next image
    pub fn is_fatal_for_image(error: &CompressError) -> bool {
        matches!(
            error,
            CompressError::Load { .. } | CompressError::Numerical { .. }
        )
    }

    /// An internal invariant was violated; stop everything
    pub fn is_defect(error: &CompressError) -> bool {
        matches!(error, CompressError::ShapeMismatch { .. })
            || error.severity() == ErrorSeverity::Fatal
    }

    /// Only a single rank is affected; the remaining ranks proceed
    pub fn is_per_rank(error: &CompressError) -> bool {
        matches!(error, CompressError::Write { .. })
    }
}

/// Error conversion implementations
impl From<std::io::Error> for CompressError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for CompressError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = CompressError::load("missing.png", "No such file or directory");
        assert_eq!(error.category(), "load");
        assert!(classify::is_fatal_for_image(&error));
        assert!(!classify::is_defect(&error));
        assert!(error.to_string().contains("missing.png"));
    }

    #[test]
    fn test_error_with_context() {
        let error = CompressError::write("out/cat_svd_5.jpg", 5, "read-only file system")
            .with_context("persisting reconstruction")
            .with_operation("jpeg_encode")
            .with_metadata("variant", "svd");

        assert_eq!(error.category(), "write");
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert_eq!(error.context().operation.as_deref(), Some("jpeg_encode"));
        assert_eq!(
            error.context().metadata.get("variant").map(String::as_str),
            Some("svd")
        );
        let message = error.to_string();
        assert!(message.contains("rank 5"));
        assert!(message.contains("out/cat_svd_5.jpg"));
    }

    #[test]
    fn test_error_classification() {
        let mismatch = CompressError::shape_mismatch("green", (4, 4), (4, 5));
        assert!(classify::is_defect(&mismatch));
        assert_eq!(mismatch.severity(), ErrorSeverity::Fatal);
        assert!(mismatch.to_string().contains("4x5"));

        let numerical =
            CompressError::numerical("cat", Some("red"), SvdError::NoConvergence { iterations: 9 });
        assert!(classify::is_fatal_for_image(&numerical));
        assert!(numerical.source().is_some());
        assert!(numerical.to_string().contains("red channel of 'cat'"));

        let write = CompressError::write("x.jpg", 20, "disk full");
        assert!(classify::is_per_rank(&write));
        assert!(!classify::is_fatal_for_image(&write));
    }

    #[test]
    fn test_io_conversion_keeps_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = CompressError::from(io).with_path("config.json");
        assert_eq!(error.category(), "io");
        assert!(error.to_string().contains("config.json"));
    }
}
