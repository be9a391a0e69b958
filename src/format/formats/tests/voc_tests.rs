//! Tests for the Pascal VOC XML format.

use super::convert;
use crate::format::FormatStrategy;
use crate::format::formats::VocFormat;
use crate::model::{BboxPoints, VectorGeometry};
use crate::source::MemorySource;

const ANNOTATION: &str = r#"<annotation>
  <folder>VOC2012</folder>
  <filename>2007_000027.jpg</filename>
  <size><width>500</width><height>375</height><depth>3</depth></size>
  <object>
    <name>person</name>
    <pose>Frontal</pose>
    <truncated>0</truncated>
    <difficult>0</difficult>
    <bndbox><xmin>349</xmin><ymin>101</ymin><xmax>174</xmax><ymax>351</ymax></bndbox>
  </object>
  <object>
    <name>person</name>
    <pose>Unspecified</pose>
    <bndbox><xmin>174</xmin><ymin>101</ymin><xmax>349</xmax><ymax>351</ymax></bndbox>
  </object>
  <object>
    <name>car</name>
    <polygon><x1>10</x1><y1>10</y1><x2>50</x2><y2>10</y2><x3>50</x3><y3>40</y3></polygon>
    <attributes>
      <attribute><name>color</name><value>red</value></attribute>
    </attributes>
  </object>
</annotation>"#;

fn export() -> MemorySource {
    MemorySource::new("voc").with_file("Annotations/2007_000027.xml", ANNOTATION)
}

#[test]
fn test_voc_format_metadata() {
    let format = VocFormat;

    assert_eq!(format.id(), "voc");
    assert_eq!(format.display_name(), "Pascal VOC (XML)");
    assert!(format.extensions().contains(&"xml"));
}

#[test]
fn test_voc_boxes_and_polygons() {
    let (outputs, catalog) = convert(&VocFormat, &export());

    let doc = &outputs.documents["2007_000027.jpg"];
    assert_eq!(doc.metadata.width, Some(500));
    assert_eq!(doc.metadata.height, Some(375));
    assert_eq!(doc.instances.len(), 2);

    // Corners arrive swapped and are normalized.
    assert_eq!(
        doc.instances[0].geometry,
        VectorGeometry::Bbox {
            points: BboxPoints::normalized(174.0, 101.0, 349.0, 351.0)
        }
    );
    assert_eq!(
        doc.instances[1].geometry,
        VectorGeometry::Polygon {
            points: vec![10.0, 10.0, 50.0, 10.0, 50.0, 40.0]
        }
    );
    assert_eq!(catalog.len(), 2);
}

#[test]
fn test_voc_duplicate_boxes_are_skipped() {
    let (outputs, _) = convert(&VocFormat, &export());

    assert_eq!(outputs.skipped.len(), 1);
    assert!(outputs.skipped[0].reason.contains("duplicate"));
}

#[test]
fn test_voc_flags_become_attribute_groups() {
    let (outputs, catalog) = convert(&VocFormat, &export());

    let person = catalog.get("person").unwrap();
    let groups: Vec<&str> = person.attribute_groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(groups, ["pose", "truncated", "difficult"]);
    assert!(person.group("pose").unwrap().contains("Frontal"));

    let car = &outputs.documents["2007_000027.jpg"].instances[1];
    assert_eq!(car.attributes.len(), 1);
    assert_eq!(car.attributes[0].group_name, "color");
    assert_eq!(car.attributes[0].name, "red");
}

#[test]
fn test_voc_missing_filename_uses_stem() {
    let xml = "<annotation><object><name>dog</name>\
               <bndbox><xmin>1</xmin><ymin>1</ymin><xmax>5</xmax><ymax>5</ymax></bndbox>\
               </object></annotation>";
    let source = MemorySource::new("voc").with_file("img7.xml", xml);
    let (outputs, _) = convert(&VocFormat, &source);

    let doc = &outputs.documents["img7.jpg"];
    assert_eq!(doc.metadata.width, None);
    assert_eq!(doc.instances.len(), 1);
}

#[test]
fn test_voc_object_without_geometry() {
    let xml = "<annotation><filename>a.jpg</filename><object><name>dog</name></object></annotation>";
    let source = MemorySource::new("voc").with_file("a.xml", xml);
    let (outputs, catalog) = convert(&VocFormat, &source);

    assert_eq!(outputs.instance_count(), 0);
    assert_eq!(outputs.skipped.len(), 1);
    assert!(catalog.is_empty());
}

#[test]
fn test_voc_non_finite_box_is_skipped() {
    let xml = "<annotation><filename>a.jpg</filename><object><name>dog</name>\
               <bndbox><xmin>nan</xmin><ymin>1</ymin><xmax>5</xmax><ymax>inf</ymax></bndbox>\
               </object></annotation>";
    let source = MemorySource::new("voc").with_file("a.xml", xml);
    let (outputs, catalog) = convert(&VocFormat, &source);

    assert_eq!(outputs.instance_count(), 0);
    assert_eq!(outputs.skipped.len(), 1);
    assert!(outputs.skipped[0].reason.contains("non-finite"));
    assert!(catalog.is_empty());
}
