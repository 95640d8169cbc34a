use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::ParseError;
use crate::options::ConvertOptions;
use crate::track::{Point, Track};

/// Convert a track to a GeoJSON FeatureCollection holding a single feature.
///
/// One point becomes a `Point`, otherwise a `LineString` (or a
/// `MultiLineString` when segments are preserved and there are several).
pub fn to_feature_collection(track: &Track, opts: &ConvertOptions) -> FeatureCollection {
    let geometry = if track.len() == 1 {
        Value::Point(point_coords(track.first(), opts.include_elevation))
    } else if opts.preserve_segments && track.segment_count() > 1 {
        let lines = track
            .segments()
            .filter(|seg| seg.len() >= 2)
            .map(|seg| line_coords(seg, opts.include_elevation))
            .collect();
        Value::MultiLineString(lines)
    } else {
        Value::LineString(line_coords(track.points(), opts.include_elevation))
    };

    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("track".to_string()),
    );
    if opts.include_metadata {
        if let Some(name) = track.name() {
            props.insert("name".to_string(), JsonValue::String(name.to_string()));
        }
    }

    FeatureCollection {
        bbox: None,
        features: vec![Feature {
            bbox: None,
            geometry: Some(Geometry::new(geometry)),
            id: None,
            properties: Some(props),
            foreign_members: None,
        }],
        foreign_members: None,
    }
}

/// Read the first line (or point) feature of a collection back into a track.
pub fn track_from_feature_collection(fc: &FeatureCollection) -> Result<Track, ParseError> {
    let segments: Vec<Vec<Point>> = fc
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .find_map(|g| match &g.value {
            Value::LineString(coords) => Some(vec![positions_to_points(coords)]),
            Value::MultiLineString(lines) => {
                Some(lines.iter().map(|l| positions_to_points(l)).collect())
            }
            Value::Point(coords) => Some(vec![positions_to_points(std::slice::from_ref(coords))]),
            _ => None,
        })
        .ok_or(ParseError::NoTrackData)?;

    Track::from_segments(segments).ok_or(ParseError::NoValidPoints)
}

fn positions_to_points(positions: &[Vec<f64>]) -> Vec<Point> {
    positions
        .iter()
        .filter_map(|pos| match pos.as_slice() {
            [lon, lat, ele, ..] if ele.is_finite() => Some(Point::with_ele(*lon, *lat, *ele)),
            [lon, lat, ..] => Some(Point::new(*lon, *lat)),
            _ => None,
        })
        .filter(Point::is_finite)
        .collect()
}

fn line_coords(points: &[Point], include_elevation: bool) -> Vec<Vec<f64>> {
    points
        .iter()
        .map(|pt| point_coords(pt, include_elevation))
        .collect()
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &Point, include_elevation: bool) -> Vec<f64> {
    match (include_elevation, pt.ele) {
        (true, Some(ele)) => vec![pt.lon, pt.lat, ele],
        _ => vec![pt.lon, pt.lat],
    }
}
