pub mod batch;
pub mod bounds;
pub mod config;
pub mod convert;
pub mod converter;
pub mod error;
pub mod export;
pub mod logging;
pub mod options;
pub mod parser;
pub mod polyline;
pub mod profile;
pub mod render;
pub mod static_map;
pub mod style;
pub mod track;

use log::LevelFilter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use crate::config::{PosterConfig, ProviderConfig};
use crate::error::{PosterError, UserInputError};
use crate::export::{ExportResult, ExportSpec};
use crate::options::ConvertOptions;
use crate::profile::ProfileSeries;
use crate::static_map::StaticMapRequest;
use crate::track::Track;

/// Reject a missing or non-`.gpx` file before reading it.
#[wasm_bindgen(js_name = checkUpload)]
pub fn check_upload(file_name: Option<String>) -> Result<(), JsValue> {
    logging::init(LevelFilter::Info);

    parser::check_upload(file_name.as_deref()).map_err(PosterError::from)?;
    Ok(())
}

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    logging::init(LevelFilter::Info);

    let opts: ConvertOptions = from_js_or_default(options)?;
    let track = parse(gpx_string)?;
    let fc = converter::to_feature_collection(&track, &opts);
    to_js(&fc)
}

/// Convert GPX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(gpx_string: &str, options: JsValue) -> Result<String, JsValue> {
    logging::init(LevelFilter::Info);

    let opts: ConvertOptions = from_js_or_default(options)?;
    let track = parse(gpx_string)?;
    let fc = converter::to_feature_collection(&track, &opts);
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Center, zoom and padded bounds framing the whole track.
#[wasm_bindgen(js_name = fitTrack)]
pub fn fit_track(gpx_string: &str) -> Result<JsValue, JsValue> {
    logging::init(LevelFilter::Info);

    let track = parse(gpx_string)?;
    to_js(&bounds::fit_track(&track))
}

/// `{distanceMeters, elevationMeters}` for the elevation chart.
#[wasm_bindgen(js_name = elevationProfile)]
pub fn elevation_profile(gpx_string: &str) -> Result<JsValue, JsValue> {
    logging::init(LevelFilter::Info);

    let track = parse(gpx_string)?;
    to_js(&ProfileSeries::build(&track))
}

/// Encode `[[lng, lat], ...]` as a precision-5 polyline.
#[wasm_bindgen(js_name = encodePolyline)]
pub fn encode_polyline(coordinates: JsValue) -> Result<String, JsValue> {
    let coords: Vec<[f64; 2]> = from_js(coordinates)?;
    polyline::encode_lon_lat(&coords).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Decode a polyline into `[[lng, lat], ...]`.
#[wasm_bindgen(js_name = decodePolyline)]
pub fn decode_polyline(encoded: &str) -> Result<JsValue, JsValue> {
    let points = polyline::decode(encoded).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let coords: Vec<[f64; 2]> = points.iter().map(|p| [p.lon, p.lat]).collect();
    to_js(&coords)
}

/// The style entry for `id`, or the default style for unknown ids.
#[wasm_bindgen(js_name = resolveStyle)]
pub fn resolve_style(id: &str) -> Result<JsValue, JsValue> {
    to_js(style::resolve(id))
}

/// Static map image URL for a `{center, zoom, style?, gpxGeoJson?}` request.
#[wasm_bindgen(js_name = staticMapUrl)]
pub fn static_map_url(request: JsValue, access_token: Option<String>, config: JsValue) -> Result<String, JsValue> {
    logging::init(LevelFilter::Info);

    let request: StaticMapRequest = from_js(request)?;
    let cfg: PosterConfig = from_js_or_default(config)?;
    let provider = ProviderConfig::new(access_token);
    Ok(request.plan(&provider, &cfg)?)
}

/// A finished export handed back to the page for download.
#[wasm_bindgen]
pub struct ExportedFile {
    inner: ExportResult,
}

#[wasm_bindgen]
impl ExportedFile {
    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.inner.file_name.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mime(&self) -> String {
        self.inner.mime.to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn content(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.inner.content.as_slice())
    }
}

/// Compose a poster from the renderer's RGBA canvases.
///
/// `profile` is optional; when present its dimensions must be given too.
#[wasm_bindgen(js_name = exportPoster)]
#[allow(clippy::too_many_arguments)]
pub fn export_poster(
    spec: JsValue,
    basemap: Vec<u8>,
    basemap_width: u32,
    basemap_height: u32,
    profile: Option<Vec<u8>>,
    profile_width: Option<u32>,
    profile_height: Option<u32>,
    config: JsValue,
) -> Result<ExportedFile, JsValue> {
    logging::init(LevelFilter::Info);

    let spec: ExportSpec = from_js(spec)?;
    let cfg: PosterConfig = from_js_or_default(config)?;
    spec.validate().map_err(PosterError::from)?;

    let basemap = export::surface_from_rgba(basemap_width, basemap_height, basemap, "basemap")
        .map_err(PosterError::from)?;
    let profile = match profile {
        Some(data) => Some(
            export::surface_from_rgba(
                profile_width.unwrap_or(0),
                profile_height.unwrap_or(0),
                data,
                "profile",
            )
            .map_err(PosterError::from)?,
        ),
        None => None,
    };

    let inner = export::compose_today(&basemap, profile.as_ref(), &spec, &cfg).map_err(PosterError::from)?;
    Ok(ExportedFile { inner })
}

/// Wrap an uploaded raster image in a print-sized SVG document.
#[wasm_bindgen(js_name = convertToSvg)]
pub fn convert_to_svg(image: Option<Vec<u8>>, config: JsValue) -> Result<String, JsValue> {
    logging::init(LevelFilter::Info);

    let cfg: PosterConfig = from_js_or_default(config)?;
    Ok(convert::convert_to_svg(image.as_deref(), &cfg)?)
}

/// Zip builder for posters exported one style at a time by the page.
#[wasm_bindgen(js_name = PosterArchive)]
pub struct PosterArchiveHandle {
    inner: Option<batch::PosterArchive>,
}

#[wasm_bindgen(js_class = PosterArchive)]
impl PosterArchiveHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            inner: Some(batch::PosterArchive::new()),
        }
    }

    /// Returns the entry name, suffixed when the name was already taken.
    #[wasm_bindgen(js_name = addPoster)]
    pub fn add_poster(&mut self, file: &ExportedFile) -> Result<String, JsValue> {
        Ok(self
            .archive()?
            .add_poster(&file.inner.file_name, &file.inner.content)
            .map_err(PosterError::from)?)
    }

    #[wasm_bindgen(js_name = addProfile)]
    pub fn add_profile(&mut self, style_id: &str, png: &[u8]) -> Result<String, JsValue> {
        Ok(self.archive()?.add_profile(style_id, png).map_err(PosterError::from)?)
    }

    /// Returns the zip bytes; the archive cannot be used afterwards.
    pub fn finish(&mut self) -> Result<Vec<u8>, JsValue> {
        let archive = self
            .inner
            .take()
            .ok_or_else(|| JsValue::from_str("archive already finished"))?;
        Ok(archive.finish().map_err(PosterError::from)?)
    }
}

impl PosterArchiveHandle {
    fn archive(&mut self) -> Result<&mut batch::PosterArchive, JsValue> {
        self.inner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("archive already finished"))
    }
}

impl Default for PosterArchiveHandle {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(gpx_string: &str) -> Result<Track, PosterError> {
    Ok(parser::parse_gpx(gpx_string)?)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Err(PosterError::from(UserInputError::MissingField { field: "input" }).into());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js_or_default<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
