use serde::Serialize;

use crate::bounds::Fit;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 20.0;

/// A single track point (`<trkpt>`), longitude first as in GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ele: Option<f64>,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            ele: None,
        }
    }

    pub fn with_ele(lon: f64, lat: f64, ele: f64) -> Self {
        Self {
            lon,
            lat,
            ele: Some(ele),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// An ordered, non-empty sequence of points.
///
/// Segments are flattened into one continuous line; `segment_starts` only
/// remembers where each original `<trkseg>` began.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    name: Option<String>,
    points: Vec<Point>,
    segment_starts: Vec<usize>,
}

impl Track {
    /// Returns `None` when `points` is empty.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(Self {
            name: None,
            points,
            segment_starts: vec![0],
        })
    }

    /// Builds a track from per-segment point lists, skipping empty segments.
    pub fn from_segments<I>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec<Point>>,
    {
        let mut points = Vec::new();
        let mut segment_starts = Vec::new();
        for seg in segments {
            if seg.is_empty() {
                continue;
            }
            segment_starts.push(points.len());
            points.extend(seg);
        }
        if points.is_empty() {
            return None;
        }
        Some(Self {
            name: None,
            points,
            segment_starts,
        })
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Never true for a constructed track.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &Point {
        &self.points[0]
    }

    pub fn last(&self) -> &Point {
        &self.points[self.points.len() - 1]
    }

    pub fn segment_count(&self) -> usize {
        self.segment_starts.len()
    }

    /// The original segments as slices of the flat point list.
    pub fn segments(&self) -> impl Iterator<Item = &[Point]> + '_ {
        self.segment_starts.iter().enumerate().map(|(i, &start)| {
            let end = self
                .segment_starts
                .get(i + 1)
                .copied()
                .unwrap_or(self.points.len());
            &self.points[start..end]
        })
    }

    /// `[lon, lat]` pairs, the shape the renderer and GeoJSON expect.
    pub fn lon_lat(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.lon, p.lat]).collect()
    }
}

/// Interactive map framing: center `[lng, lat]` and a zoom kept within [1, 20].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub center: [f64; 2],
    pub zoom: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            zoom: MIN_ZOOM,
        }
    }
}

impl ViewState {
    pub fn from_fit(fit: &Fit) -> Self {
        let mut view = Self {
            center: fit.center,
            zoom: MIN_ZOOM,
        };
        view.zoom_to(fit.zoom);
        view
    }

    pub fn zoom_to(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.zoom_to(self.zoom + delta);
    }

    pub fn pan_to(&mut self, lng: f64, lat: f64) {
        if lng.is_finite() && lat.is_finite() {
            self.center = [lng.clamp(-180.0, 180.0), lat.clamp(-90.0, 90.0)];
        }
    }
}
