//! Static map image URLs for the provider's server-side renderer.

use geojson::FeatureCollection;
use log::{debug, warn};
use serde::Deserialize;

use crate::config::{PosterConfig, ProviderConfig};
use crate::converter::track_from_feature_collection;
use crate::error::{NetworkError, PosterError, UserInputError};
use crate::polyline;

const API_BASE: &str = "https://api.mapbox.com/styles/v1/mapbox";

/// Longest URL the provider accepts.
pub const URL_LIMIT: usize = 8192;

/// Body of a static map request: `{center, zoom, style?, gpxGeoJson?}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticMapRequest {
    /// `[lng, lat]`
    #[serde(default)]
    pub center: Option<[f64; 2]>,
    #[serde(default)]
    pub zoom: Option<f64>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub gpx_geo_json: Option<FeatureCollection>,
}

impl StaticMapRequest {
    /// Build the static image URL, with the track drawn as a path overlay
    /// when one was sent.
    pub fn plan(&self, provider: &ProviderConfig, cfg: &PosterConfig) -> Result<String, PosterError> {
        let center = self
            .center
            .filter(|c| c.iter().all(|v| v.is_finite()))
            .ok_or(UserInputError::MissingField { field: "center" })?;
        let zoom = self
            .zoom
            .filter(|z| z.is_finite())
            .ok_or(UserInputError::MissingField { field: "zoom" })?;
        let token = provider.require_token()?;

        let style = self
            .style
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(cfg.static_style.as_str());

        let mut url = format!("{API_BASE}/{style}/static");
        if let Some(path) = self.path_overlay(cfg) {
            url.push('/');
            url.push_str(&path);
        }
        let size = cfg.static_map_size;
        url.push_str(&format!(
            "/{},{},{zoom}/{size}x{size}?access_token={token}",
            center[0], center[1]
        ));

        if url.len() > URL_LIMIT {
            warn!(
                "static map URL is {:.2}KB, over the provider limit; request may fail",
                url.len() as f32 / 1024.0
            );
        }
        Ok(url)
    }

    fn path_overlay(&self, cfg: &PosterConfig) -> Option<String> {
        let fc = self.gpx_geo_json.as_ref()?;
        let track = match track_from_feature_collection(fc) {
            Ok(t) => t,
            Err(e) => {
                debug!("static map without track overlay: {e}");
                return None;
            }
        };
        let coords = polyline::subsample(&track.lon_lat(), cfg.polyline_max_points);
        debug!("static map overlay: {} of {} points", coords.len(), track.len());
        let encoded = match polyline::encode_lon_lat(&coords) {
            Ok(e) => e,
            Err(e) => {
                warn!("static map without track overlay: {e}");
                return None;
            }
        };
        Some(format!(
            "{}({})",
            cfg.static_path_style,
            urlencoding::encode(&encoded)
        ))
    }
}

/// The pin-marked 800 x 1000 preview shown before the interactive map loads.
pub fn preview_url(
    center: [f64; 2],
    zoom: f64,
    style: Option<&str>,
    provider: &ProviderConfig,
) -> Result<String, NetworkError> {
    let token = provider.require_token()?;
    let style = style.unwrap_or("streets-v11");
    let [lng, lat] = center;
    Ok(format!(
        "{API_BASE}/{style}/static/pin-s+f00({lng},{lat})/{lng},{lat},{zoom}/800x1000?access_token={token}"
    ))
}

/// Map a provider response status to an error when it is not a success.
pub fn check_upstream(status: u16, body: &str) -> Result<(), NetworkError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    warn!("map provider returned {status}");
    Err(NetworkError::Upstream {
        status,
        body: body.to_string(),
    })
}
