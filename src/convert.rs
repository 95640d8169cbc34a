use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use log::debug;

use crate::config::PosterConfig;
use crate::error::{CompositionError, PosterError, UserInputError};
use crate::export::{encode_jpeg, svg_document};

/// Wrap an uploaded raster in a print-sized SVG.
///
/// The image is fitted into the configured raster box on a white background,
/// re-encoded as JPEG, and embedded in an SVG sized for print.
pub fn convert_to_svg(upload: Option<&[u8]>, cfg: &PosterConfig) -> Result<String, PosterError> {
    let bytes = match upload {
        Some(b) if !b.is_empty() => b,
        _ => return Err(UserInputError::MissingField { field: "image" }.into()),
    };

    let source = image::load_from_memory(bytes).map_err(CompositionError::from)?;
    debug!("convert-to-svg: source image {}x{}", source.width(), source.height());

    let (box_w, box_h) = (cfg.svg_raster_width.max(1), cfg.svg_raster_height.max(1));
    let fitted = source.resize(box_w, box_h, FilterType::Lanczos3).to_rgba8();

    let mut canvas = RgbaImage::from_pixel(box_w, box_h, Rgba([255, 255, 255, 255]));
    let x = box_w.saturating_sub(fitted.width()) / 2;
    let y = box_h.saturating_sub(fitted.height()) / 2;
    imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));

    let jpeg = encode_jpeg(
        &DynamicImage::ImageRgba8(canvas).to_rgb8(),
        cfg.svg_raster_quality,
    )?;

    Ok(svg_document(cfg.print_width, cfg.print_height, "image/jpeg", &jpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::encode_png;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;

    fn embedded(svg: &str) -> DynamicImage {
        let b64 = svg
            .split("base64,")
            .nth(1)
            .unwrap()
            .trim_end_matches("\"/></svg>");
        image::load_from_memory(&BASE64.decode(b64).unwrap()).unwrap()
    }

    #[test]
    fn test_wide_image_is_letterboxed() {
        let wide = RgbaImage::from_pixel(200, 50, Rgba([0, 0, 0, 255]));
        let png = encode_png(&wide).unwrap();
        let svg = convert_to_svg(Some(&png), &PosterConfig::default()).unwrap();

        assert!(svg.starts_with(r#"<svg width="3508" height="4961""#));
        assert!(svg.contains("data:image/jpeg;base64,"));

        let raster = embedded(&svg).to_rgb8();
        assert_eq!(raster.dimensions(), (1000, 1400));
        // 200x50 fits as 1000x250, centred vertically
        assert!(raster.get_pixel(500, 10).0.iter().all(|&c| c > 240));
        assert!(raster.get_pixel(500, 700).0.iter().all(|&c| c < 20));
    }

    #[test]
    fn test_missing_image() {
        let err = convert_to_svg(None, &PosterConfig::default()).unwrap_err();
        assert_eq!(err.status_code(), 400);
        let err = convert_to_svg(Some(&[]), &PosterConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PosterError::UserInput(UserInputError::MissingField { field: "image" })
        ));
    }

    #[test]
    fn test_undecodable_image() {
        let err = convert_to_svg(Some(b"not an image"), &PosterConfig::default()).unwrap_err();
        assert!(matches!(err, PosterError::Composition(CompositionError::Encode(_))));
        assert_eq!(err.status_code(), 500);
    }
}
