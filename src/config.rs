use std::time::Duration;

use serde::Deserialize;

use crate::error::NetworkError;

/// Print and export settings. Every field has a default, so an empty JSON
/// object (or `PosterConfig::default()`) gives the standard A3 poster.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterConfig {
    /// Print target in pixels (A3 at high DPI)
    #[serde(default = "default_print_width")]
    pub print_width: u32,
    #[serde(default = "default_print_height")]
    pub print_height: u32,

    /// Size of the interactive preview the user framed the map in
    #[serde(default = "default_preview_width")]
    pub preview_width: u32,
    #[serde(default = "default_preview_height")]
    pub preview_height: u32,

    /// Height of the elevation profile band in the preview
    #[serde(default = "default_preview_profile_height")]
    pub preview_profile_height: u32,

    /// Raster exports are resampled to this fraction of the rendered size
    #[serde(default = "default_downscale")]
    pub downscale: f32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Preview line width multiplier for the print render
    #[serde(default = "default_export_line_scale")]
    pub export_line_scale: f64,

    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Tracks longer than this are subsampled before polyline encoding
    #[serde(default = "default_polyline_max_points")]
    pub polyline_max_points: usize,

    #[serde(default = "default_static_map_size")]
    pub static_map_size: u32,
    #[serde(default = "default_static_style")]
    pub static_style: String,
    #[serde(default = "default_static_path_style")]
    pub static_path_style: String,

    /// Box the convert-to-svg raster is fitted into
    #[serde(default = "default_svg_raster_width")]
    pub svg_raster_width: u32,
    #[serde(default = "default_svg_raster_height")]
    pub svg_raster_height: u32,
    #[serde(default = "default_svg_raster_quality")]
    pub svg_raster_quality: u8,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            print_width: default_print_width(),
            print_height: default_print_height(),
            preview_width: default_preview_width(),
            preview_height: default_preview_height(),
            preview_profile_height: default_preview_profile_height(),
            downscale: default_downscale(),
            jpeg_quality: default_jpeg_quality(),
            export_line_scale: default_export_line_scale(),
            render_timeout_ms: default_render_timeout_ms(),
            polyline_max_points: default_polyline_max_points(),
            static_map_size: default_static_map_size(),
            static_style: default_static_style(),
            static_path_style: default_static_path_style(),
            svg_raster_width: default_svg_raster_width(),
            svg_raster_height: default_svg_raster_height(),
            svg_raster_quality: default_svg_raster_quality(),
        }
    }
}

impl PosterConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Profile band height for a canvas `width` pixels wide, keeping the
    /// proportion the band had in the preview.
    pub fn profile_band_height(&self, width: u32) -> u32 {
        if self.preview_width == 0 {
            return 0;
        }
        let ratio = f64::from(width) / f64::from(self.preview_width);
        (f64::from(self.preview_profile_height) * ratio).round() as u32
    }
}

fn default_print_width() -> u32 {
    3508
}

fn default_print_height() -> u32 {
    4961
}

fn default_preview_width() -> u32 {
    400
}

fn default_preview_height() -> u32 {
    610
}

fn default_preview_profile_height() -> u32 {
    128
}

fn default_downscale() -> f32 {
    0.7
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_export_line_scale() -> f64 {
    4.77
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

fn default_polyline_max_points() -> usize {
    100
}

fn default_static_map_size() -> u32 {
    1280
}

fn default_static_style() -> String {
    "light-v10".to_string()
}

fn default_static_path_style() -> String {
    "path-4+0066CC-0.9".to_string()
}

fn default_svg_raster_width() -> u32 {
    1000
}

fn default_svg_raster_height() -> u32 {
    1400
}

fn default_svg_raster_quality() -> u8 {
    70
}

/// Access to the map image provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    access_token: Option<String>,
}

impl ProviderConfig {
    pub const TOKEN_VARS: [&'static str; 2] = ["MAPBOX_TOKEN", "NEXT_PUBLIC_MAPBOX_TOKEN"];

    pub fn new(access_token: Option<String>) -> Self {
        Self {
            access_token: access_token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Reads the token from the environment, server variable first.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = Self::TOKEN_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .find(|t| !t.trim().is_empty());
        Self::new(token)
    }

    pub fn require_token(&self) -> Result<&str, NetworkError> {
        self.access_token.as_deref().ok_or(NetworkError::MissingToken)
    }
}
