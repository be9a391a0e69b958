//! Tests for the YOLO TXT format.

use super::convert;
use crate::format::FormatStrategy;
use crate::format::formats::YoloFormat;
use crate::format::formats::common::tests::png;
use crate::model::VectorGeometry;
use crate::source::{DocumentHandle, MemorySource};

const LABELS: &str = "0 0.5 0.5 0.25 0.5
1 0.5 0.5 0.5 0.5 0.9
0 0.1 0.1 0.5 0.1 0.5 0.5
3 0.5 0.5 0.1 0.1
x 1 2 3 4
0 0.1 0.1 0.1 0.1 0.1 0.1
0 1 2
";

fn export() -> MemorySource {
    MemorySource::new("yolo")
        .with_file("classes.txt", "car\nperson\n")
        .with_file("images/a.png", png(100, 50))
        .with_file("labels/a.txt", LABELS)
        .with_file("labels/b.txt", "0 0.5 0.5 0.1 0.1\n")
}

#[test]
fn test_yolo_class_list_is_not_a_label_file() {
    let handles = YoloFormat.locate_source_documents(&export(), None).unwrap();
    assert_eq!(
        handles,
        vec![DocumentHandle::new("labels/a.txt"), DocumentHandle::new("labels/b.txt")]
    );
}

#[test]
fn test_yolo_rows_are_denormalized() {
    let (outputs, catalog) = convert(&YoloFormat, &export());

    let doc = &outputs.documents["a.png"];
    assert_eq!(doc.metadata.width, Some(100));
    assert_eq!(doc.metadata.height, Some(50));
    assert_eq!(doc.instances.len(), 3);

    assert_eq!(doc.instances[0].geometry, VectorGeometry::bbox(37.5, 12.5, 62.5, 37.5));
    assert_eq!(doc.instances[0].probability, None);

    assert_eq!(doc.instances[1].class_name.as_deref(), Some("person"));
    assert_eq!(doc.instances[1].geometry, VectorGeometry::bbox(25.0, 12.5, 75.0, 37.5));
    assert_eq!(doc.instances[1].probability, Some(0.9));

    assert_eq!(
        doc.instances[2].geometry,
        VectorGeometry::Polygon {
            points: vec![10.0, 5.0, 50.0, 5.0, 50.0, 25.0]
        }
    );

    let names: Vec<&str> = catalog.classes().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["car", "person"]);
}

#[test]
fn test_yolo_skips() {
    let (outputs, _) = convert(&YoloFormat, &export());

    let skipped: Vec<(Option<&str>, &str)> = outputs
        .skipped
        .iter()
        .map(|s| (s.item.as_deref(), s.reason.as_str()))
        .collect();
    // The degenerate polygon in row 6 is dropped without a skip.
    assert_eq!(
        skipped,
        [
            (Some("a.png"), "row 4: class index 3 out of range"),
            (Some("a.png"), "row 5: invalid class index 'x'"),
            (Some("a.png"), "row 7: unexpected value count 2"),
            (Some("b"), "image dimensions unknown"),
        ]
    );
    assert!(!outputs.documents.contains_key("b"));
}

#[test]
fn test_yolo_without_class_list_uses_indices() {
    let source = MemorySource::new("yolo")
        .with_file("data/a.txt", "2 0.5 0.5 0.2 0.2\n")
        .with_file("data/a.png", png(10, 10));
    let (outputs, catalog) = convert(&YoloFormat, &source);

    assert_eq!(outputs.documents["a.png"].instances.len(), 1);
    assert!(catalog.get("2").is_some());
}
