//! Image optimisation applied while copying images into the output tree.

use std::path::Path;

use image::{
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
    },
    DynamicImage,
};

use crate::error::Result;

pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "svg"];

const JPEG_QUALITY: u8 = 85;

fn reencode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

fn reencode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    Ok(out)
}

/// Recompress an image, keeping whichever of the original and the recompressed bytes is
/// smaller. Formats without a re-encoder pass through untouched.
pub fn optimize(path: &Path, bytes: Vec<u8>) -> Result<Vec<u8>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let reencoded = match ext.as_str() {
        "png" => reencode_png(&image::load_from_memory(&bytes)?)?,
        "jpg" | "jpeg" => reencode_jpeg(&image::load_from_memory(&bytes)?)?,
        _ => return Ok(bytes),
    };
    if reencoded.len() < bytes.len() {
        log::debug!(
            "Optimized `{}`: {} -> {} bytes",
            path.display(),
            bytes.len(),
            reencoded.len()
        );
        Ok(reencoded)
    } else {
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn flat_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(64, 64, Rgb([200, 40, 40]));
        let mut out = Cursor::new(Vec::new());
        // fast compression leaves room for the optimiser
        let encoder =
            PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter);
        DynamicImage::ImageRgb8(img).write_with_encoder(encoder).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_never_grows_and_stays_decodable() {
        let original = flat_png();
        let optimized = optimize(Path::new("a.png"), original.clone()).unwrap();
        assert!(optimized.len() <= original.len());
        let decoded = image::load_from_memory_with_format(&optimized, ImageFormat::Png).unwrap();
        assert_eq!(decoded.width(), 64);
    }

    #[test]
    fn svg_passes_through() {
        let svg = b"<svg xmlns='http://www.w3.org/2000/svg'/>".to_vec();
        assert_eq!(optimize(Path::new("logo.svg"), svg.clone()).unwrap(), svg);
    }

    #[test]
    fn corrupt_png_is_an_error() {
        assert!(optimize(Path::new("bad.png"), b"not a png".to_vec()).is_err());
    }
}
