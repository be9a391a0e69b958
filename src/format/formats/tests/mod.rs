//! Unit tests for the format strategies.
//!
//! Each strategy is driven end to end over an in-memory export: documents are
//! located, parsed into records and built into canonical documents.

mod labelbox_tests;
mod roundtrip_tests;
mod voc_tests;
mod vott_tests;
mod yolo_tests;

use crate::color_utils::Palette;
use crate::format::{CanonicalOutputs, FormatStrategy, ParseOptions};
use crate::source::DocumentSource;
use crate::taxonomy::ClassCatalog;

/// Convert every located document with default options.
pub(super) fn convert(
    format: &dyn FormatStrategy,
    source: &dyn DocumentSource,
) -> (CanonicalOutputs, ClassCatalog) {
    convert_with(format, source, &ParseOptions::default())
}

/// Convert every located document.
pub(super) fn convert_with(
    format: &dyn FormatStrategy,
    source: &dyn DocumentSource,
    options: &ParseOptions,
) -> (CanonicalOutputs, ClassCatalog) {
    let mut catalog = ClassCatalog::new(Palette::seeded(7));
    let mut outputs = CanonicalOutputs::default();
    for handle in format.locate_source_documents(source, None).unwrap() {
        let batch = format.parse_records(source, &handle, options).unwrap();
        outputs.extend(format.build_canonical_outputs(batch, &mut catalog, options));
    }
    (outputs, catalog)
}
