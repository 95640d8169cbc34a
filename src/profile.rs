use serde::Serialize;

use crate::track::{Point, Track};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points (haversine).
pub fn haversine_distance(a: &Point, b: &Point) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Cumulative distance paired with elevation, one entry per track point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSeries {
    pub distance_meters: Vec<f64>,
    pub elevation_meters: Vec<f64>,
}

impl ProfileSeries {
    pub fn build(track: &Track) -> Self {
        let points = track.points();
        let mut distance_meters = Vec::with_capacity(points.len());
        let mut elevation_meters = Vec::with_capacity(points.len());
        let mut total = 0.0;
        let mut prev: Option<&Point> = None;

        for p in points {
            if let Some(prev) = prev {
                total += haversine_distance(prev, p);
            }
            distance_meters.push(total);
            elevation_meters.push(p.ele.unwrap_or(0.0));
            prev = Some(p);
        }

        Self {
            distance_meters,
            elevation_meters,
        }
    }

    pub fn len(&self) -> usize {
        self.distance_meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance_meters.is_empty()
    }

    pub fn total_distance(&self) -> f64 {
        self.distance_meters.last().copied().unwrap_or(0.0)
    }

    pub fn elevation_gain(&self) -> f64 {
        self.elevation_meters
            .windows(2)
            .map(|w| (w[1] - w[0]).max(0.0))
            .sum()
    }

    pub fn elevation_loss(&self) -> f64 {
        self.elevation_meters
            .windows(2)
            .map(|w| (w[0] - w[1]).max(0.0))
            .sum()
    }

    /// Index of the first point at or beyond `distance`, so a position on
    /// the chart maps back to a track point. Clamped to the last index.
    pub fn index_at_distance(&self, distance: f64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let idx = self.distance_meters.partition_point(|&d| d < distance);
        Some(idx.min(self.len() - 1))
    }

    /// Chart x-axis labels: kilometers with one decimal.
    pub fn distance_labels_km(&self) -> Vec<String> {
        self.distance_meters
            .iter()
            .map(|d| format!("{:.1}", d / 1000.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> Track {
        Track::new(vec![
            Point::with_ele(2.35, 48.85, 35.0),
            Point::with_ele(2.36, 48.86, 50.0),
            Point::new(2.36, 48.86),
            Point::with_ele(2.30, 48.80, 20.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_haversine_identity_and_symmetry() {
        let a = Point::new(2.35, 48.85);
        let b = Point::new(-73.98, 40.75);
        assert_eq!(haversine_distance(&a, &a), 0.0);
        assert!((haversine_distance(&a, &b) - haversine_distance(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine_distance(&Point::new(0.0, 0.0), &Point::new(0.0, 1.0));
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn test_profile_alignment() {
        let track = sample_track();
        let profile = ProfileSeries::build(&track);

        assert_eq!(profile.len(), track.len());
        assert_eq!(profile.elevation_meters.len(), track.len());
        assert_eq!(profile.distance_meters[0], 0.0);
        assert!(profile.distance_meters.windows(2).all(|w| w[0] <= w[1]));
        // repeated coordinate adds nothing; missing elevation reads as 0
        assert_eq!(profile.distance_meters[1], profile.distance_meters[2]);
        assert_eq!(profile.elevation_meters, vec![35.0, 50.0, 0.0, 20.0]);
    }

    #[test]
    fn test_single_point_profile() {
        let track = Track::new(vec![Point::new(1.0, 1.0)]).unwrap();
        let profile = ProfileSeries::build(&track);
        assert_eq!(profile.distance_meters, vec![0.0]);
        assert_eq!(profile.elevation_meters, vec![0.0]);
        assert_eq!(profile.total_distance(), 0.0);
    }

    #[test]
    fn test_gain_and_loss() {
        let profile = ProfileSeries::build(&sample_track());
        assert_eq!(profile.elevation_gain(), 15.0 + 20.0);
        assert_eq!(profile.elevation_loss(), 50.0);
    }

    #[test]
    fn test_index_at_distance() {
        let profile = ProfileSeries {
            distance_meters: vec![0.0, 100.0, 260.0],
            elevation_meters: vec![0.0; 3],
        };
        assert_eq!(profile.index_at_distance(-5.0), Some(0));
        assert_eq!(profile.index_at_distance(100.0), Some(1));
        assert_eq!(profile.index_at_distance(101.0), Some(2));
        assert_eq!(profile.index_at_distance(1e9), Some(2));
        assert_eq!(profile.distance_labels_km(), vec!["0.0", "0.1", "0.3"]);
    }
}
