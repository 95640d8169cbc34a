//! Final poster encoding: takes the surfaces the renderer produced and turns
//! them into a downloadable SVG, PNG or JPEG.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{NaiveDate, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, RgbaImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::PosterConfig;
use crate::error::{CompositionError, UserInputError};
use crate::style::{self, Color, MapStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Svg,
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = UserInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            _ => Err(UserInputError::InvalidFormat {
                value: s.to_string(),
            }),
        }
    }
}

/// What the user asked for at the moment they pressed export.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSpec {
    pub format: ExportFormat,
    #[serde(default = "default_pixel_width")]
    pub pixel_width: u32,
    #[serde(default = "default_pixel_height")]
    pub pixel_height: u32,
    /// Preview line width, 1..=10
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default = "default_background")]
    pub background_color: Color,
    /// Overrides the style's own trace color
    #[serde(default)]
    pub trace_color: Option<Color>,
    #[serde(default = "default_style_id")]
    pub style_id: String,
    /// Course name, used for the file name
    #[serde(default)]
    pub label: Option<String>,
}

fn default_pixel_width() -> u32 {
    PosterConfig::default().print_width
}

fn default_pixel_height() -> u32 {
    PosterConfig::default().print_height
}

fn default_line_width() -> f64 {
    3.0
}

fn default_background() -> Color {
    Color::WHITE
}

fn default_style_id() -> String {
    style::DEFAULT_STYLE.id.to_string()
}

impl ExportSpec {
    pub fn new(format: ExportFormat, style_id: &str) -> Self {
        Self {
            format,
            pixel_width: default_pixel_width(),
            pixel_height: default_pixel_height(),
            line_width: default_line_width(),
            background_color: default_background(),
            trace_color: None,
            style_id: style_id.to_string(),
            label: None,
        }
    }

    pub fn validate(&self) -> Result<(), UserInputError> {
        if !self.line_width.is_finite() || !(1.0..=10.0).contains(&self.line_width) {
            return Err(UserInputError::LineWidthOutOfRange {
                value: self.line_width,
            });
        }
        if self.pixel_width == 0 {
            return Err(UserInputError::MissingField {
                field: "pixelWidth",
            });
        }
        if self.pixel_height == 0 {
            return Err(UserInputError::MissingField {
                field: "pixelHeight",
            });
        }
        Ok(())
    }

    pub fn style(&self) -> &'static MapStyle {
        style::resolve(&self.style_id)
    }

    pub fn trace_color(&self) -> Color {
        self.trace_color.unwrap_or(self.style().trace_color)
    }

    /// Line width for the full-resolution render.
    pub fn print_line_width(&self, cfg: &PosterConfig) -> f64 {
        self.line_width * cfg.export_line_scale
    }

    /// `<slug>-YYYY-MM-DD.<ext>`, slug taken from the label or else the style.
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!(
            "{}-{}.{}",
            self.file_stem(),
            date.format("%Y-%m-%d"),
            self.format.extension()
        )
    }

    pub fn file_stem(&self) -> String {
        [self.label.as_deref(), Some(self.style_id.as_str())]
            .into_iter()
            .flatten()
            .map(slug)
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| "map".to_string())
    }
}

/// Lowercase ASCII alphanumerics, other runs collapsed to a single `-`.
pub fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// An encoded poster ready for download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    pub content: Vec<u8>,
    pub file_name: String,
    pub mime: &'static str,
}

/// Wraps raw RGBA bytes (e.g. from a canvas `ImageData`) as a surface.
pub fn surface_from_rgba(
    width: u32,
    height: u32,
    data: Vec<u8>,
    what: &'static str,
) -> Result<RgbaImage, CompositionError> {
    if width == 0 || height == 0 {
        return Err(CompositionError::EmptySurface { what });
    }
    RgbaImage::from_raw(width, height, data).ok_or(CompositionError::SurfaceSize { width, height })
}

/// Compose and encode with today's (UTC) date in the file name.
pub fn compose_today(
    basemap: &RgbaImage,
    profile: Option<&RgbaImage>,
    spec: &ExportSpec,
    cfg: &PosterConfig,
) -> Result<ExportResult, CompositionError> {
    compose(basemap, profile, spec, cfg, Utc::now().date_naive())
}

/// Scale the basemap, lay the profile band over its bottom edge, and encode.
pub fn compose(
    basemap: &RgbaImage,
    profile: Option<&RgbaImage>,
    spec: &ExportSpec,
    cfg: &PosterConfig,
    date: NaiveDate,
) -> Result<ExportResult, CompositionError> {
    if basemap.width() == 0 || basemap.height() == 0 {
        return Err(CompositionError::EmptySurface { what: "basemap" });
    }
    if let Some(p) = profile {
        if p.width() == 0 || p.height() == 0 {
            return Err(CompositionError::EmptySurface { what: "profile" });
        }
    }
    if basemap.dimensions() != (spec.pixel_width, spec.pixel_height) {
        warn!(
            "basemap is {}x{}, export asked for {}x{}",
            basemap.width(),
            basemap.height(),
            spec.pixel_width,
            spec.pixel_height
        );
    }

    let mut canvas = match spec.format {
        ExportFormat::Svg => basemap.clone(),
        _ => downscale(basemap, cfg.downscale),
    };

    if let Some(profile) = profile {
        overlay_profile(&mut canvas, profile, cfg);
    }

    let content = match spec.format {
        ExportFormat::Png => encode_png(&canvas)?,
        ExportFormat::Jpeg => encode_jpeg(&flatten(&canvas, spec.background_color), cfg.jpeg_quality)?,
        ExportFormat::Svg => svg_document(
            spec.pixel_width,
            spec.pixel_height,
            ExportFormat::Png.mime(),
            &encode_png(&canvas)?,
        )
        .into_bytes(),
    };

    let file_name = spec.file_name(date);
    debug!(
        "composed {} ({}x{}, {} bytes)",
        file_name,
        canvas.width(),
        canvas.height(),
        content.len()
    );

    Ok(ExportResult {
        content,
        file_name,
        mime: spec.format.mime(),
    })
}

fn downscale(img: &RgbaImage, factor: f32) -> RgbaImage {
    if !(factor > 0.0 && factor < 1.0) {
        return img.clone();
    }
    let width = ((img.width() as f32 * factor).round() as u32).max(1);
    let height = ((img.height() as f32 * factor).round() as u32).max(1);
    imageops::resize(img, width, height, FilterType::Triangle)
}

fn overlay_profile(canvas: &mut RgbaImage, profile: &RgbaImage, cfg: &PosterConfig) {
    let band = cfg.profile_band_height(canvas.width()).min(canvas.height());
    if band == 0 {
        return;
    }
    let scaled = imageops::resize(profile, canvas.width(), band, FilterType::Triangle);
    let y = canvas.height() - band;
    imageops::overlay(canvas, &scaled, 0, i64::from(y));
}

/// Blend transparency onto `background`; JPEG has no alpha channel.
fn flatten(img: &RgbaImage, background: Color) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let a = u16::from(a);
        let blend = |c: u8, under: u8| {
            ((u16::from(c) * a + u16::from(under) * (255 - a) + 127) / 255) as u8
        };
        Rgb([
            blend(r, background.r),
            blend(g, background.g),
            blend(b, background.b),
        ])
    })
}

pub(crate) fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, CompositionError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

pub(crate) fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, CompositionError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(img)?;
    Ok(buf)
}

/// A fixed-size SVG holding one embedded raster image.
pub(crate) fn svg_document(width: u32, height: u32, mime: &str, raster: &[u8]) -> String {
    format!(
        r#"<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg"><image x="0" y="0" width="{width}" height="{height}" href="data:{mime};base64,{}"/></svg>"#,
        BASE64.encode(raster)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    fn spec(format: ExportFormat, w: u32, h: u32) -> ExportSpec {
        ExportSpec {
            pixel_width: w,
            pixel_height: h,
            ..ExportSpec::new(format, "vintage")
        }
    }

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn test_png_export() {
        let map = solid(100, 140, [0, 0, 255, 255]);
        let result = compose(&map, None, &spec(ExportFormat::Png, 100, 140), &PosterConfig::default(), date())
            .unwrap();

        assert_eq!(result.file_name, "vintage-2025-03-09.png");
        assert_eq!(result.mime, "image/png");
        assert!(!result.content.is_empty());

        let decoded = image::load_from_memory(&result.content).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (70, 98));
    }

    #[test]
    fn test_jpeg_flattens_onto_background() {
        let map = solid(20, 20, [0, 0, 0, 0]);
        let mut s = spec(ExportFormat::Jpeg, 20, 20);
        s.background_color = Color::rgb(255, 0, 0);
        let cfg = PosterConfig {
            downscale: 1.0,
            ..PosterConfig::default()
        };
        let result = compose(&map, None, &s, &cfg, date()).unwrap();
        assert!(result.file_name.ends_with(".jpeg"));

        let decoded = image::load_from_memory(&result.content).unwrap().to_rgb8();
        let px = decoded.get_pixel(10, 10).0;
        assert!(px[0] > 200 && px[1] < 50 && px[2] < 50, "got {px:?}");
    }

    #[test]
    fn test_svg_wraps_full_size_raster() {
        let map = solid(30, 40, [10, 20, 30, 255]);
        let result = compose(&map, None, &spec(ExportFormat::Svg, 3508, 4961), &PosterConfig::default(), date())
            .unwrap();
        let svg = String::from_utf8(result.content).unwrap();

        assert!(svg.starts_with(r#"<svg width="3508" height="4961""#));
        assert!(svg.contains(r#"href="data:image/png;base64,"#));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(result.mime, "image/svg+xml");

        // raster is embedded at its native size, not downscaled
        let b64 = svg.split("base64,").nth(1).unwrap().trim_end_matches("\"/></svg>");
        let png = BASE64.decode(b64).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 40));
    }

    #[test]
    fn test_profile_band_at_bottom() {
        let map = solid(400, 610, [0, 0, 255, 255]);
        let profile = solid(50, 10, [255, 0, 0, 255]);
        let cfg = PosterConfig {
            downscale: 1.0,
            ..PosterConfig::default()
        };
        let result = compose(&map, Some(&profile), &spec(ExportFormat::Png, 400, 610), &cfg, date())
            .unwrap();
        let img = image::load_from_memory(&result.content).unwrap().to_rgba8();

        // band is 128 px tall at preview width
        assert_eq!(img.get_pixel(200, 609).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(200, 610 - 128).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(200, 610 - 129).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_empty_surfaces_rejected() {
        let cfg = PosterConfig::default();
        let empty = RgbaImage::new(0, 0);
        let err = compose(&empty, None, &spec(ExportFormat::Png, 1, 1), &cfg, date()).unwrap_err();
        assert!(matches!(err, CompositionError::EmptySurface { what: "basemap" }));

        let map = solid(4, 4, [0, 0, 0, 255]);
        let err = compose(&map, Some(&empty), &spec(ExportFormat::Png, 4, 4), &cfg, date()).unwrap_err();
        assert!(matches!(err, CompositionError::EmptySurface { what: "profile" }));
    }

    #[test]
    fn test_surface_from_rgba() {
        assert!(surface_from_rgba(2, 2, vec![0; 16], "basemap").is_ok());
        assert!(matches!(
            surface_from_rgba(2, 2, vec![0; 15], "basemap"),
            Err(CompositionError::SurfaceSize { width: 2, height: 2 })
        ));
        assert!(matches!(
            surface_from_rgba(0, 2, Vec::new(), "profile"),
            Err(CompositionError::EmptySurface { what: "profile" })
        ));
    }

    #[test]
    fn test_file_names() {
        let mut s = ExportSpec::new(ExportFormat::Jpeg, "trace-only");
        assert_eq!(s.file_name(date()), "trace-only-2025-03-09.jpeg");

        s.label = Some("  Tour du Mont-Blanc (2024)! ".into());
        assert_eq!(s.file_stem(), "tour-du-mont-blanc-2024");

        s.label = Some("***".into());
        s.style_id = "¿?".into();
        assert_eq!(s.file_stem(), "map");
    }

    #[test]
    fn test_spec_from_json() {
        let s: ExportSpec = serde_json::from_str(
            r##"{"format": "png", "styleId": "azure", "lineWidth": 4, "backgroundColor": "#000000"}"##,
        )
        .unwrap();
        assert_eq!(s.format, ExportFormat::Png);
        assert_eq!((s.pixel_width, s.pixel_height), (3508, 4961));
        assert_eq!(s.trace_color(), Color::rgb(0x63, 0x8b, 0x98));
        assert_eq!(s.background_color, Color::BLACK);
        assert!((s.print_line_width(&PosterConfig::default()) - 19.08).abs() < 1e-9);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_spec_validation() {
        let mut s = ExportSpec::new(ExportFormat::Png, "vintage");
        s.line_width = 12.0;
        assert!(matches!(s.validate(), Err(UserInputError::LineWidthOutOfRange { .. })));
        s.line_width = f64::NAN;
        assert!(s.validate().is_err());
        s.line_width = 1.0;
        s.pixel_height = 0;
        assert!(matches!(s.validate(), Err(UserInputError::MissingField { field: "pixelHeight" })));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JPG".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
        assert_eq!("svg".parse::<ExportFormat>().unwrap(), ExportFormat::Svg);
        assert!("gif".parse::<ExportFormat>().is_err());
    }
}
