//! # External Boundary
//!
//! Everything that touches the outside world: decoding source files, writing
//! reconstructions and recording diagnostic reports. Each concern sits behind an async
//! trait so sessions can swap in in-memory implementations.

pub mod report;
pub mod sink;
pub mod source;

pub use report::{
    JsonLinesReportSink, LogReportSink, MemoryReportSink, ReportEvent, ReportMultiplexer,
    ReportSink,
};
pub use sink::{DEFAULT_JPEG_QUALITY, ImageSink, JpegFileSink, MemoryImageSink, OutputName};
pub use source::{FileImageSource, ImageSource};
