//! annorm - Annotation Normalization
//!
//! Converts annotation exports of third-party computer-vision tools into one
//! canonical schema and validates canonical documents of every project type.
//!
//! - [`format`]: one strategy per source format, looked up by name
//! - [`convert`]: drives a strategy and writes the canonical files
//! - [`validate`]: polymorphic structural validation with addressed errors
//! - [`model`]: the canonical classes, instances and documents

pub mod color_utils;
pub mod config;
pub mod constants;
pub mod convert;
pub mod format;
pub mod geometry;
pub mod mask;
pub mod model;
pub mod source;
pub mod taxonomy;
pub mod validate;

pub use config::{ConfigError, EngineConfig, LogLevel};
pub use convert::{ConversionSummary, ConvertOptions, Converter};
pub use format::{ConversionTask, ConvertError, FormatRegistry, FormatStrategy};
pub use model::MediaType;
pub use validate::{ValidationResult, Validator};
