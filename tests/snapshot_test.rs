use gpx_poster::converter::to_feature_collection;
use gpx_poster::options::ConvertOptions;
use gpx_poster::parser::parse_gpx;
use std::path::Path;

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{path}")).unwrap()
}

fn convert_with_opts(gpx: &str, opts: &ConvertOptions) -> serde_json::Value {
    let track = parse_gpx(gpx).unwrap();
    let fc = to_feature_collection(&track, opts);
    serde_json::to_value(&fc).unwrap()
}

/// Compare actual GeoJSON output against the expected snapshot file.
/// When `UPDATE_SNAPSHOTS=1` is set, write/overwrite the expected file instead.
fn assert_snapshot(actual: &serde_json::Value, expected_path: &str) {
    let path = format!("tests/fixtures/expected/{expected_path}");

    if matches!(std::env::var("UPDATE_SNAPSHOTS").as_deref(), Ok("1")) {
        let dir = Path::new(&path).parent().unwrap();
        std::fs::create_dir_all(dir).unwrap();
        let pretty = serde_json::to_string_pretty(actual).unwrap();
        std::fs::write(&path, pretty.as_bytes()).unwrap();
        eprintln!("Updated snapshot: {path}");
        return;
    }

    let expected_str = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Expected file not found: {path}. Run with UPDATE_SNAPSHOTS=1 to generate."));
    let expected: serde_json::Value = serde_json::from_str(&expected_str)
        .unwrap_or_else(|e| panic!("Failed to parse {path}: {e}"));

    assert_eq!(
        *actual, expected,
        "Snapshot mismatch for {path}.\nRun with UPDATE_SNAPSHOTS=1 to update."
    );
}

fn assert_snapshot_default(fixture: &str, expected: &str) {
    let actual = convert_with_opts(&load_fixture(fixture), &ConvertOptions::default());
    assert_snapshot(&actual, expected);
}

#[test]
fn snapshot_three_points() {
    assert_snapshot_default("basic/three_points.gpx", "basic/three_points.geojson");
}

#[test]
fn snapshot_single_point() {
    assert_snapshot_default("basic/single_point.gpx", "basic/single_point.geojson");
}

#[test]
fn snapshot_two_segments_flattened() {
    assert_snapshot_default("basic/two_segments.gpx", "basic/two_segments.geojson");
}

#[test]
fn snapshot_two_segments_preserved() {
    let opts = ConvertOptions {
        preserve_segments: true,
        ..ConvertOptions::default()
    };
    let actual = convert_with_opts(&load_fixture("basic/two_segments.gpx"), &opts);
    assert_snapshot(&actual, "basic/two_segments_preserved.geojson");
}

#[test]
fn snapshot_two_segments_without_elevation_or_metadata() {
    let opts = ConvertOptions {
        include_elevation: false,
        include_metadata: false,
        ..ConvertOptions::default()
    };
    let actual = convert_with_opts(&load_fixture("basic/two_segments.gpx"), &opts);
    assert_snapshot(&actual, "basic/two_segments_flat_2d.geojson");
}
