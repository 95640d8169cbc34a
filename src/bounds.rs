use log::debug;
use serde::Serialize;

use crate::track::{MAX_ZOOM, MIN_ZOOM, Point, Track};

/// Share of each axis' span added as margin, split evenly between both sides.
const MARGIN: f64 = 0.2;

/// Center, zoom and expanded envelope that frame a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fit {
    pub center: [f64; 2],
    pub zoom: f64,
    /// `[[min_lng, min_lat], [max_lng, max_lat]]` after the margin.
    pub bounds: [[f64; 2]; 2],
}

pub fn fit_track(track: &Track) -> Fit {
    let [min, max] = envelope(track.points());
    let lng_pad = (max[0] - min[0]) * MARGIN / 2.0;
    let lat_pad = (max[1] - min[1]) * MARGIN / 2.0;
    let min = [min[0] - lng_pad, min[1] - lat_pad];
    let max = [max[0] + lng_pad, max[1] + lat_pad];

    let fit = Fit {
        center: [(min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0],
        zoom: fit_zoom((max[1] - min[1]).max(max[0] - min[0])),
        bounds: [min, max],
    };
    debug!("fit {} points: center {:?}, zoom {}", track.len(), fit.center, fit.zoom);
    fit
}

/// Slippy-map zoom showing `span` degrees, clamped to [1, 20].
/// A zero span (single point, or a line along one meridian and parallel)
/// means maximum zoom.
pub fn fit_zoom(span: f64) -> f64 {
    if !span.is_finite() || span <= 0.0 {
        return MAX_ZOOM;
    }
    let zoom = (360.0 / span).log2().floor() + 1.0;
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

fn envelope(points: &[Point]) -> [[f64; 2]; 2] {
    points.iter().fold(
        [
            [f64::INFINITY, f64::INFINITY],
            [f64::NEG_INFINITY, f64::NEG_INFINITY],
        ],
        |[min, max], p| {
            [
                [min[0].min(p.lon), min[1].min(p.lat)],
                [max[0].max(p.lon), max[1].max(p.lat)],
            ]
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(coords: &[(f64, f64)]) -> Track {
        Track::new(coords.iter().map(|&(lon, lat)| Point::new(lon, lat)).collect()).unwrap()
    }

    #[test]
    fn test_single_point() {
        let fit = fit_track(&track(&[(2.35, 48.85)]));
        assert_eq!(fit.center, [2.35, 48.85]);
        assert_eq!(fit.zoom, MAX_ZOOM);
        assert!(fit.zoom.is_finite());
    }

    #[test]
    fn test_unit_square() {
        let fit = fit_track(&track(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]));
        assert!((fit.center[0] - 0.5).abs() < 1e-12);
        assert!((fit.center[1] - 0.5).abs() < 1e-12);
        // span 1.2 degrees -> floor(log2(300)) + 1
        assert_eq!(fit.zoom, 9.0);
        assert!((fit.bounds[0][0] + 0.1).abs() < 1e-12);
        assert!((fit.bounds[1][1] - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_straight_meridian_line() {
        let fit = fit_track(&track(&[(5.0, 10.0), (5.0, 12.0)]));
        assert_eq!(fit.center, [5.0, 11.0]);
        // lng span is zero, lat span drives the zoom: 2.4 degrees
        assert_eq!(fit.zoom, 8.0);
    }

    #[test]
    fn test_world_spanning_track_clamped() {
        let fit = fit_track(&track(&[(-180.0, -80.0), (180.0, 80.0)]));
        assert_eq!(fit.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_fit_zoom_guards() {
        assert_eq!(fit_zoom(0.0), MAX_ZOOM);
        assert_eq!(fit_zoom(f64::NAN), MAX_ZOOM);
        assert_eq!(fit_zoom(1e-9), MAX_ZOOM);
        assert_eq!(fit_zoom(360.0), 1.0);
        assert_eq!(fit_zoom(180.0), 2.0);
    }
}
