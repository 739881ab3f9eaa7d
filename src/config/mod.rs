//! # Configuration Module
//!
//! This module provides the configuration structure for batch compression runs.

pub mod config;

pub use config::CompressConfig;
