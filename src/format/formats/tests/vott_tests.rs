//! Tests for the VoTT JSON format.

use serde_json::json;

use super::convert;
use crate::format::FormatStrategy;
use crate::format::formats::VottFormat;
use crate::model::VectorGeometry;
use crate::source::{DocumentHandle, MemorySource};

fn project() -> String {
    json!({
        "name": "demo",
        "tags": [
            {"name": "car", "color": "#FF0000"},
            {"name": "sign", "color": "#00ff00"}
        ],
        "assets": {
            "a1": {
                "asset": {"name": "street.jpg", "path": "file:/data/street.jpg", "size": {"width": 800, "height": 600}},
                "regions": [
                    {
                        "type": "RECTANGLE",
                        "tags": ["car"],
                        "boundingBox": {"left": 10, "top": 20, "width": 30, "height": 40},
                        "points": []
                    },
                    {
                        "type": "POLYGON",
                        "tags": ["sign", "car"],
                        "points": [{"x": 0, "y": 0}, {"x": 5, "y": 0}, {"x": 5, "y": 5}]
                    },
                    {
                        "type": "POLYGON",
                        "tags": ["sign"],
                        "points": [{"x": 0, "y": 0}, {"x": 5, "y": 5}]
                    },
                    {"type": "POINT", "tags": ["pin"], "points": [{"x": 7, "y": 8}]},
                    {"type": "POLYLINE", "tags": [], "points": [{"x": 0, "y": 0}, {"x": 3, "y": 3}]},
                    {"type": "CIRCLE", "tags": ["car"], "points": []}
                ]
            },
            "b2": {
                "asset": {"name": "empty.jpg", "size": {"width": 10, "height": 10}},
                "regions": []
            }
        }
    })
    .to_string()
}

fn asset_file() -> String {
    json!({
        "asset": {"name": "solo.jpg", "size": {"width": 100, "height": 50}},
        "regions": [{
            "type": "RECTANGLE",
            "tags": ["truck"],
            "points": [{"x": 40, "y": 30}, {"x": 10, "y": 5}]
        }]
    })
    .to_string()
}

#[test]
fn test_vott_format_metadata() {
    assert_eq!(VottFormat.id(), "vott");
    assert_eq!(VottFormat.display_name(), "VoTT (JSON)");
}

#[test]
fn test_vott_project_regions() {
    let source = MemorySource::new("vott").with_file("vott-json-export/demo-export.json", project());
    let (outputs, catalog) = convert(&VottFormat, &source);

    assert_eq!(outputs.documents.len(), 2);
    let doc = &outputs.documents["street.jpg"];
    assert_eq!(doc.metadata.width, Some(800));

    let kinds: Vec<&str> = doc.instances.iter().map(|i| i.geometry.discriminant()).collect();
    // One instance per region tag; the degenerate polygon is dropped.
    assert_eq!(kinds, ["bbox", "polygon", "polygon", "point"]);
    assert_eq!(doc.instances[0].geometry, VectorGeometry::bbox(10.0, 20.0, 40.0, 60.0));
    assert!(outputs.documents["empty.jpg"].instances.is_empty());

    let names: Vec<&str> = catalog.classes().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["car", "sign", "pin"]);
}

#[test]
fn test_vott_tag_colors() {
    let source = MemorySource::new("vott").with_file("demo-export.json", project());
    let (_, catalog) = convert(&VottFormat, &source);

    assert_eq!(catalog.get("car").unwrap().color, "#ff0000");
    assert_eq!(catalog.get("sign").unwrap().color, "#00ff00");
    assert_ne!(catalog.get("pin").unwrap().color, "");
}

#[test]
fn test_vott_skips() {
    let source = MemorySource::new("vott").with_file("demo-export.json", project());
    let (outputs, _) = convert(&VottFormat, &source);

    let reasons: Vec<&str> = outputs.skipped.iter().map(|s| s.reason.as_str()).collect();
    assert_eq!(reasons.len(), 2);
    assert!(reasons[0].contains("no tags"));
    assert!(reasons[1].contains("CIRCLE"));
}

#[test]
fn test_vott_asset_files() {
    let source = MemorySource::new("vott").with_file("abc123-asset.json", asset_file());
    let (outputs, _) = convert(&VottFormat, &source);

    let doc = &outputs.documents["solo.jpg"];
    assert_eq!(doc.instances.len(), 1);
    assert_eq!(doc.instances[0].geometry, VectorGeometry::bbox(10.0, 5.0, 40.0, 30.0));
}

#[test]
fn test_vott_project_wins_over_asset_files() {
    let source = MemorySource::new("vott")
        .with_file("demo-export.json", project())
        .with_file("abc123-asset.json", asset_file());

    let handles = VottFormat.locate_source_documents(&source, None).unwrap();
    assert_eq!(handles, vec![DocumentHandle::new("demo-export.json")]);
}
