//! Tests for the Labelbox JSON format.

use serde_json::json;

use super::convert;
use crate::format::formats::LabelboxFormat;
use crate::format::formats::common::tests::png;
use crate::model::{Selection, VectorGeometry};
use crate::source::MemorySource;

fn rows() -> String {
    json!([
        {
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
                    {
                        "title": "road",
                        "polygon": [{"x": 0, "y": 0}, {"x": 9, "y": 0}, {"x": 9, "y": 9}]
                    },
                    {"title": "lane", "line": [{"x": 0, "y": 0}, {"x": 4, "y": 4}]},
                    {"title": "pin", "point": {"x": 1, "y": 2}},
                    {"title": "road", "polygon": [{"x": 0, "y": 0}, {"x": 1, "y": 1}]},
                    {"title": "blob"}
                ],
                "classifications": [{"title": "weather", "answer": {"title": "sunny"}}]
            }
        },
        {"External ID": "img2.jpg", "Skipped": true, "Label": {}},
        {"External ID": "img3.jpg", "Label": "Skip"},
        {"Label": {"objects": []}}
    ])
    .to_string()
}

fn export() -> MemorySource {
    MemorySource::new("labelbox")
        .with_file("export.json", rows())
        .with_file("img1.jpg", png(120, 80))
}

#[test]
fn test_labelbox_objects() {
    let (outputs, _) = convert(&LabelboxFormat, &export());

    assert_eq!(outputs.documents.len(), 1);
    let doc = &outputs.documents["img1.jpg"];
    assert_eq!(doc.metadata.width, Some(120));
    assert_eq!(doc.metadata.height, Some(80));

    let kinds: Vec<&str> = doc.instances.iter().map(|i| i.geometry.discriminant()).collect();
    assert_eq!(kinds, ["bbox", "polygon", "polyline", "point", "tag"]);
    assert_eq!(doc.instances[0].geometry, VectorGeometry::bbox(20.0, 10.0, 60.0, 40.0));
}

#[test]
fn test_labelbox_classifications() {
    let (outputs, catalog) = convert(&LabelboxFormat, &export());

    let car = catalog.get("car").unwrap();
    assert_eq!(car.color, "#ff0000");
    assert_eq!(car.group("color").unwrap().selection, Selection::Single);
    let damage = car.group("damage").unwrap();
    assert_eq!(damage.selection, Selection::Multi);
    assert!(damage.contains("dent") && damage.contains("scratch"));

    let doc = &outputs.documents["img1.jpg"];
    assert_eq!(doc.instances[0].attributes.len(), 3);

    let weather = doc.instances.last().unwrap();
    assert_eq!(weather.class_name.as_deref(), Some("weather"));
    assert_eq!(weather.attributes[0].name, "sunny");
}

#[test]
fn test_labelbox_skips() {
    let (outputs, _) = convert(&LabelboxFormat, &export());

    let reasons: Vec<&str> = outputs.skipped.iter().map(|s| s.reason.as_str()).collect();
    assert_eq!(
        reasons,
        [
            "object has no supported geometry",
            "row was skipped in Labelbox",
            "row was skipped in Labelbox",
            "row without 'External ID'"
        ]
    );
}
