//! Conversion orchestrator.
//!
//! [`Converter`] resolves a format strategy by name, drives it over every
//! located source document, and writes the canonical classes document plus
//! one annotation document per item:
//!
//! ```text
//! <output>/classes/classes.json
//! <output>/<item>___objects.json
//! ```
//!
//! Nothing is written until every document has been parsed, so a failed run
//! leaves the output directory untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::color_utils::Palette;
use crate::config::ConversionConfig;
use crate::constants::{CLASSES_DIR, CLASSES_FILE};
use crate::format::{
    CanonicalOutputs, ConversionTask, ConvertError, FormatRegistry, ParseOptions, SkippedRecord,
};
use crate::model::{AnnotationClass, MediaType, VectorDocument};
use crate::source::{self, DocumentSource};
use crate::taxonomy::ClassCatalog;
use crate::validate::{ValidationError, Validator};

/// Settings of a [`Converter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Task used when a call does not name one.
    pub task: ConversionTask,

    /// IoU at which same-class boxes on one item count as duplicates.
    pub duplicate_iou: Option<f64>,

    /// Run every written document through the validator.
    pub validate_output: bool,

    /// Pretty-print the written JSON.
    pub pretty: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            task: ConversionTask::default(),
            duplicate_iou: Some(0.95),
            validate_output: true,
            pretty: true,
        }
    }
}

impl From<&ConversionConfig> for ConvertOptions {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            task: config.task,
            duplicate_iou: config.duplicate_iou,
            validate_output: config.validate_output,
            pretty: config.pretty,
        }
    }
}

/// A written document that did not pass validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidOutput {
    pub item: String,
    pub errors: Vec<ValidationError>,
}

/// What a conversion run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionSummary {
    /// Format id the run used.
    pub format: String,
    pub classes_created: usize,
    pub attribute_groups_created: usize,
    pub items_converted: usize,
    pub instances_converted: usize,
    /// Records and documents left out, with reasons.
    pub skipped: Vec<SkippedRecord>,
    /// Written documents rejected by the validator.
    pub invalid_outputs: Vec<InvalidOutput>,
    /// Paths of every file written.
    pub files_created: Vec<PathBuf>,
}

/// The canonical result of a run, before anything is written.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub format: &'static str,
    pub classes: Vec<AnnotationClass>,
    pub attribute_groups: usize,
    pub outputs: CanonicalOutputs,
}

/// Drives format strategies end to end.
pub struct Converter {
    registry: FormatRegistry,
    options: ConvertOptions,
    palette: Palette,
    validator: Validator,
}

impl Converter {
    /// Create a converter with class colors seeded from the operating system.
    pub fn new(registry: FormatRegistry, options: ConvertOptions) -> Self {
        Self {
            registry,
            options,
            palette: Palette::from_entropy(),
            validator: Validator::new(),
        }
    }

    /// Draw class colors from `palette`. Every run starts from this palette's state.
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// The registered format strategies.
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert an export on disk, a directory or a `.zip` archive.
    pub fn convert_path(
        &self,
        format: &str,
        export_root: &Path,
        output_dir: &Path,
        dataset: Option<&str>,
        task: Option<ConversionTask>,
    ) -> Result<ConversionSummary, ConvertError> {
        let source = source::open_export(export_root)?;
        self.convert(format, source.as_ref(), output_dir, dataset, task)
    }

    /// Convert every matching document of `source` and write the canonical files.
    pub fn convert(
        &self,
        format: &str,
        source: &dyn DocumentSource,
        output_dir: &Path,
        dataset: Option<&str>,
        task: Option<ConversionTask>,
    ) -> Result<ConversionSummary, ConvertError> {
        let conversion = self.run(format, source, dataset, task)?;
        self.write(conversion, output_dir)
    }

    /// Locate, parse and build without writing anything.
    pub fn run(
        &self,
        format: &str,
        source: &dyn DocumentSource,
        dataset: Option<&str>,
        task: Option<ConversionTask>,
    ) -> Result<Conversion, ConvertError> {
        if let Some(name) = dataset {
            check_dataset_name(name)?;
        }
        let strategy = self.registry.resolve(format)?;
        let options = ParseOptions {
            task: task.unwrap_or(self.options.task),
            duplicate_iou: self.options.duplicate_iou,
        };

        let handles = strategy.locate_source_documents(source, dataset)?;
        log::info!(
            "Converting {} documents of {} from {} ({})",
            handles.len(),
            strategy.display_name(),
            source.describe(),
            options.task
        );

        let mut catalog = ClassCatalog::new(self.palette.clone());
        let mut outputs = CanonicalOutputs::default();
        for handle in &handles {
            log::debug!("Parsing {}", handle);
            match strategy.parse_records(source, handle, &options) {
                Ok(batch) => {
                    outputs.extend(strategy.build_canonical_outputs(batch, &mut catalog, &options));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!("Skipping document {}: {}", handle, e);
                    outputs
                        .skipped
                        .push(SkippedRecord::new(Some(handle.key()), e.to_string()));
                }
            }
        }

        Ok(Conversion {
            format: strategy.id(),
            attribute_groups: catalog.group_count(),
            classes: catalog.into_classes(),
            outputs,
        })
    }

    /// Write the classes document and one document per item.
    pub fn write(&self, conversion: Conversion, output_dir: &Path) -> Result<ConversionSummary, ConvertError> {
        let classes_dir = output_dir.join(CLASSES_DIR);
        std::fs::create_dir_all(&classes_dir)?;

        let mut summary = ConversionSummary {
            format: conversion.format.to_string(),
            classes_created: conversion.classes.len(),
            attribute_groups_created: conversion.attribute_groups,
            skipped: conversion.outputs.skipped,
            ..ConversionSummary::default()
        };

        let classes_path = classes_dir.join(CLASSES_FILE);
        std::fs::write(&classes_path, self.to_json(&conversion.classes)?)?;
        summary.files_created.push(classes_path);

        let mut written: HashMap<String, &str> = HashMap::new();
        for (item, document) in &conversion.outputs.documents {
            let file_name = item_file_name(item, MediaType::Vector);
            if let Some(first) = written.get(&file_name) {
                log::warn!("Output of '{}' would overwrite '{}' ({})", item, first, file_name);
                summary.skipped.push(SkippedRecord::new(
                    Some(item.as_str()),
                    format!("output file '{}' is already used by item '{}'", file_name, first),
                ));
                continue;
            }

            if self.options.validate_output {
                self.check_output(item, document, &mut summary)?;
            }
            let path = output_dir.join(&file_name);
            std::fs::write(&path, self.to_json(document)?)?;
            summary.files_created.push(path);
            summary.items_converted += 1;
            summary.instances_converted += document.instances.len();
            written.insert(file_name, item);
        }

        log::info!(
            "Wrote {} classes and {} items ({} instances) to {:?}; {} skipped, {} invalid",
            summary.classes_created,
            summary.items_converted,
            summary.instances_converted,
            output_dir,
            summary.skipped.len(),
            summary.invalid_outputs.len()
        );
        Ok(summary)
    }

    fn check_output(
        &self,
        item: &str,
        document: &VectorDocument,
        summary: &mut ConversionSummary,
    ) -> Result<(), ConvertError> {
        let value = serde_json::to_value(document)?;
        let result = self.validator.validate(&value, MediaType::Vector);
        if !result.is_valid() {
            log::warn!("Output of {} failed validation:\n{}", item, result.report());
            summary.invalid_outputs.push(InvalidOutput {
                item: item.to_string(),
                errors: result.errors,
            });
        }
        Ok(())
    }

    fn to_json<T: Serialize>(&self, value: &T) -> Result<String, ConvertError> {
        Ok(if self.options.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(FormatRegistry::new(), ConvertOptions::default())
    }
}

/// Reject dataset names that are not a single plain path segment.
fn check_dataset_name(name: &str) -> Result<(), ConvertError> {
    if name.trim().is_empty() {
        return Err(ConvertError::path(name, "dataset name is empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(ConvertError::path(name, "nested folders are not allowed"));
    }
    if name == "." || name == ".." {
        return Err(ConvertError::path(name, "relative folder references are not allowed"));
    }
    Ok(())
}

/// File name of an item's annotation document.
pub fn item_file_name(item: &str, media_type: MediaType) -> String {
    let safe: String = item
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}{}", safe, media_type.file_postfix())
}
