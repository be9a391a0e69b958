//! End-to-end conversions written to disk and read back through the validator.

use std::io::Write;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde_json::{Value, json};

use crate::color_utils::Palette;
use crate::constants::{CLASSES_DIR, CLASSES_FILE};
use crate::convert::{ConvertOptions, Converter, item_file_name};
use crate::format::FormatRegistry;
use crate::format::formats::common::tests::png;
use crate::mask::tests::mask_png;
use crate::model::{AnnotationClass, MediaType, NormalizedDocument};
use crate::source::MemorySource;
use crate::validate::Validator;

fn converter() -> Converter {
    Converter::new(FormatRegistry::new(), ConvertOptions::default()).with_palette(Palette::seeded(11))
}

/// Convert, then check every written document against the in-memory result.
fn assert_roundtrip(format: &str, source: &MemorySource) {
    let converter = converter();
    let conversion = converter.run(format, source, None, None).unwrap();
    let expected = conversion.outputs.documents.clone();
    let expected_classes = conversion.classes.clone();

    let dir = tempfile::tempdir().unwrap();
    let summary = converter.write(conversion, dir.path()).unwrap();
    assert!(summary.invalid_outputs.is_empty(), "{:?}", summary.invalid_outputs);
    assert_eq!(summary.files_created.len(), expected.len() + 1);

    let validator = Validator::new();
    for (item, document) in expected {
        let value = read_json(&dir.path().join(item_file_name(&item, MediaType::Vector)));
        let result = validator.validate(&value, MediaType::Vector);
        assert!(result.is_valid(), "{}:\n{}", item, result.report());
        assert_eq!(result.normalized, Some(NormalizedDocument::Vector(document)));
    }

    let classes: Vec<AnnotationClass> =
        serde_json::from_value(read_json(&dir.path().join(CLASSES_DIR).join(CLASSES_FILE))).unwrap();
    assert_eq!(classes, expected_classes);
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_voc_roundtrip() {
    let xml = "<annotation><filename>street.jpg</filename>\
        <size><width>64</width><height>48</height></size>\
        <object><name>car</name><pose>Left</pose><difficult>1</difficult>\
        <bndbox><xmin>4</xmin><ymin>4</ymin><xmax>20</xmax><ymax>16</ymax></bndbox></object>\
        <object><name>road</name>\
        <polygon><x1>0</x1><y1>40</y1><x2>60</x2><y2>40</y2><x3>30</x3><y3>20</y3></polygon></object>\
        </annotation>";
    let source = MemorySource::new("voc").with_file("Annotations/street.xml", xml);
    assert_roundtrip("voc", &source);
}

#[test]
fn test_vgg_roundtrip() {
    let project = json!({
        "_via_img_metadata": {
            "a.png1": {
                "filename": "a.png",
                "regions": [
                    {
                        "shape_attributes": {"name": "ellipse", "cx": 10, "cy": 10, "rx": 4, "ry": 2, "theta": 0.5},
                        "region_attributes": {"type": "ball", "size": {"big": true, "round": true}}
                    },
                    {
                        "shape_attributes": {"name": "polyline", "all_points_x": [0, 5, 9], "all_points_y": [0, 5, 2]},
                        "region_attributes": {"type": "lane"}
                    }
                ]
            }
        }
    });
    let source = MemorySource::new("vgg")
        .with_file("via_project.json", project.to_string())
        .with_file("a.png", png(32, 32));
    assert_roundtrip("vgg", &source);
}

#[test]
fn test_dataloop_roundtrip() {
    let item = json!({
        "filename": "/img.jpg",
        "metadata": {"system": {"width": 100, "height": 80}},
        "annotations": [
            {"type": "point", "label": "pin", "coordinates": {"x": 3, "y": 4}},
            {"type": "class", "label": "daytime"},
            {
                "type": "box",
                "label": "car",
                "coordinates": [{"x": 1, "y": 2}, {"x": 30, "y": 40}],
                "attributes": ["parked"]
            }
        ]
    });
    let source = MemorySource::new("dataloop").with_file("json/img.json", item.to_string());
    assert_roundtrip("dataloop", &source);
}

#[test]
fn test_yolo_roundtrip() {
    let source = MemorySource::new("yolo")
        .with_file("obj.names", "car\n")
        .with_file("images/a.png", png(100, 50))
        .with_file("labels/a.txt", "0 0.5 0.5 0.25 0.5 0.75\n0 0.1 0.1 0.5 0.1 0.5 0.5\n");
    assert_roundtrip("yolo", &source);
}

#[test]
fn test_vott_roundtrip() {
    let project = json!({
        "name": "demo",
        "tags": [{"name": "car", "color": "#FF0000"}, {"name": "sign", "color": "#00ff00"}],
        "assets": {
            "a1": {
                "asset": {"name": "street.jpg", "size": {"width": 800, "height": 600}},
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
                    {"type": "POINT", "tags": ["sign"], "points": [{"x": 7, "y": 8}]}
                ]
            }
        }
    });
    let source = MemorySource::new("vott").with_file("demo-export.json", project.to_string());
    assert_roundtrip("vott", &source);
}

#[test]
fn test_google_cloud_roundtrip() {
    let csv = "TRAIN,gs://bucket/images/a.png,car,0.25,0.5,,,0.75,1.0,,\n\
        TEST,gs://bucket/images/a.png,person,0.1,0.1,,,0.2,0.3,,\n";
    let source = MemorySource::new("gcp")
        .with_file("export.csv", csv)
        .with_file("images/a.png", png(100, 40));
    assert_roundtrip("googlecloud", &source);
}

#[test]
fn test_labelbox_roundtrip() {
    let rows = json!([{
        "ID": "ck1",
        "External ID": "img1.jpg",
        "Label": {
            "objects": [
                {
                    "title": "car",
                    "color": "#FF0000",
                    "bbox": {"top": 10, "left": 20, "height": 30, "width": 40},
                    "classifications": [
                        {"title": "color", "answer": {"title": "red"}},
                        {"title": "damage", "answers": [{"title": "dent"}, {"title": "scratch"}]}
                    ]
                },
                {"title": "road", "polygon": [{"x": 0, "y": 0}, {"x": 9, "y": 0}, {"x": 9, "y": 9}]},
                {"title": "lane", "line": [{"x": 0, "y": 0}, {"x": 4, "y": 4}]},
                {"title": "pin", "point": {"x": 1, "y": 2}}
            ],
            "classifications": [{"title": "weather", "answer": {"title": "sunny"}}]
        }
    }]);
    let source = MemorySource::new("labelbox")
        .with_file("export.json", rows.to_string())
        .with_file("img1.jpg", png(120, 80));
    assert_roundtrip("labelbox", &source);
}

#[test]
fn test_supervisely_roundtrip() {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&mask_png(&["##", "##"])).unwrap();
    let bitmap = STANDARD.encode(encoder.finish().unwrap());

    let meta = json!({"classes": [{"title": "car", "shape": "rectangle", "color": "#FF0000"}]});
    let annotation = json!({
        "size": {"width": 640, "height": 480},
        "objects": [
            {
                "classTitle": "car",
                "geometryType": "rectangle",
                "points": {"exterior": [[40, 60], [10, 20]], "interior": []},
                "tags": [{"name": "color", "value": "red"}, {"name": "parked", "value": null}]
            },
            {
                "classTitle": "lane",
                "geometryType": "line",
                "points": {"exterior": [[0, 0], [5, 5], [9, 9]], "interior": []}
            },
            {
                "classTitle": "blob",
                "geometryType": "bitmap",
                "bitmap": {"data": bitmap, "origin": [5, 7]}
            }
        ]
    });
    let source = MemorySource::new("supervisely")
        .with_file("project/meta.json", meta.to_string())
        .with_file("project/ds1/ann/a.jpg.json", annotation.to_string());
    assert_roundtrip("supervisely", &source);
}
