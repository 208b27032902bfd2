use std::io::Write;
use std::path::PathBuf;

use crate::geometry::GeometryStatus;
use crate::lines::{LineColor, LineGroup, LineKey, LineSpec};
use crate::test_harness::TestViewer;

const KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>LT26</name>
      <LineString>
        <coordinates>-71.37,-33.04,0 -71.45,-33.035,0 -71.52,-33.03,0</coordinates>
      </LineString>
    </Placemark>
  </Document>
</kml>"#;

const KMZ_DOC: &str = r#"<kml><Document><Placemark><LineString>
  <coordinates>-71.55,-32.95 -71.53,-33.00</coordinates>
</LineString></Placemark></Document></kml>"#;

/// Fresh directory per test so parallel runs do not share files.
fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("faultwatch-{}-{}", std::process::id(), test));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_kmz(path: &PathBuf, entry: &str, xml: &str) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(entry, zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

fn spec(group: LineGroup, id: &str, path: PathBuf) -> LineSpec {
    LineSpec::new(group, id, id, path, LineColor::Cyan)
}

#[test]
fn test_kml_and_kmz_load_alongside_a_broken_file() {
    let dir = scratch_dir("mixed");
    let kml = dir.join("lt26.kml");
    std::fs::write(&kml, KML).unwrap();
    let kmz = dir.join("lt41.kmz");
    write_kmz(&kmz, "doc.kml", KMZ_DOC);
    let broken = dir.join("lt27.kml");
    std::fs::write(&broken, "<kml><Document></Document></kml>").unwrap();

    let viewer = TestViewer::new().with_lines(vec![
        spec(LineGroup::Kv110, "LT26", kml),
        spec(LineGroup::Kv110, "LT27", broken),
        spec(LineGroup::Kv66, "LT41", kmz),
    ]);

    let store = viewer.geometry();
    let lt26 = store.ready(&LineKey::new(LineGroup::Kv110, "LT26")).unwrap();
    assert_eq!(lt26.point_count(), 3);
    let lt41 = store.ready(&LineKey::new(LineGroup::Kv66, "LT41")).unwrap();
    assert_eq!(lt41.point_count(), 2);
    assert!(matches!(
        store.status(&LineKey::new(LineGroup::Kv110, "LT27")),
        Some(GeometryStatus::Failed(_))
    ));
    assert_eq!(store.ready_count(), 2);

    // A line without geometry still has overlay state.
    assert!(viewer.line(LineGroup::Kv110, "LT27").is_some());

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_kmz_without_doc_kml_uses_first_kml_entry() {
    let dir = scratch_dir("kmz-entry");
    let kmz = dir.join("line.kmz");
    write_kmz(&kmz, "files/Line.KML", KMZ_DOC);

    let viewer = TestViewer::new().with_lines(vec![spec(LineGroup::Kv66, "LT41", kmz)]);
    assert!(viewer
        .geometry()
        .ready(&LineKey::new(LineGroup::Kv66, "LT41"))
        .is_some());

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_bounds_cover_every_loaded_line() {
    let dir = scratch_dir("bounds");
    let kml = dir.join("lt26.kml");
    std::fs::write(&kml, KML).unwrap();
    let kmz = dir.join("lt41.kmz");
    write_kmz(&kmz, "doc.kml", KMZ_DOC);

    let viewer = TestViewer::new().with_lines(vec![
        spec(LineGroup::Kv110, "LT26", kml),
        spec(LineGroup::Kv66, "LT41", kmz),
    ]);
    let bounds = viewer.geometry().bounds().unwrap();
    assert_eq!(bounds.min.lon, -71.55);
    assert_eq!(bounds.max.lon, -71.37);
    assert_eq!(bounds.min.lat, -33.04);
    assert_eq!(bounds.max.lat, -32.95);

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_missing_files_fail_without_blocking_polls() {
    let mut viewer = super::viewer();
    assert_eq!(viewer.geometry().ready_count(), 0);
    viewer.respond(r#"{"body": {"110kV": [0.9]}}"#);
    viewer.poll_cycle();
    assert!(viewer.line(LineGroup::Kv110, "LT26").unwrap().is_blinking);
}

#[test]
fn test_shipped_geometry_loads() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    for line in crate::lines::LineCatalog::builtin().lines() {
        let path = root.join(line.geometry.path());
        let geometry = crate::geometry::load_geometry(&path)
            .unwrap_or_else(|e| panic!("{} ({}): {e}", line.key, path.display()));
        assert!(geometry.point_count() >= 2, "{}", line.key);
        assert!(geometry.label_anchor().is_some());
    }
}
