//! Decode and encode images at the application boundary.
//!
//! Matted results always leave as PNG so the alpha channel survives. The
//! restored-only artwork is exported as an opaque JPEG flattened onto white.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, Rgb, RgbImage, RgbaImage};

use crate::error::{Error, Result};

/// JPEG quality used for restored-only exports.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

const DATA_URL_PREFIXES: [&str; 4] = [
    "data:image/png;base64,",
    "data:image/jpeg;base64,",
    "data:image/jpg;base64,",
    "data:image/webp;base64,",
];

/// Decode an encoded image of any supported format into RGBA8.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the bytes cannot be decoded or the
/// image is empty.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::invalid_input(format!("undecodable image: {e}")))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(Error::invalid_input("decoded image is empty"));
    }
    Ok(img.to_rgba8())
}

/// Encode an RGBA image as PNG.
///
/// # Errors
///
/// Returns an error if the encoder fails.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

/// Composite an RGBA image over a white background.
#[must_use]
pub fn flatten_on_white(img: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (src, dst) in img.pixels().zip(out.pixels_mut()) {
        let alpha = f32::from(src[3]) / 255.0;
        let inv_alpha = 1.0 - alpha;
        let mut rgb = [0u8; 3];
        for (ch, value) in rgb.iter_mut().enumerate() {
            let blended = f32::from(src[ch]) * alpha + 255.0 * inv_alpha;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                *value = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
        *dst = Rgb(rgb);
    }
    out
}

/// Encode an RGB image as JPEG with the given quality (1-100).
///
/// # Errors
///
/// Returns an error if the encoder fails.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(img)?;
    Ok(buf.into_inner())
}

/// Check that `path`'s extension names the format that will be written to it.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] if the extension is unknown or names
/// a different format.
pub fn check_output_format(path: &Path, expected: ImageFormat) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
    if format != expected {
        return Err(Error::UnsupportedFormat(format!(
            "{} must be {expected:?}, not {format:?}",
            path.display()
        )));
    }
    Ok(())
}

/// Save an RGBA image as PNG, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] unless `path` ends in `.png`, or an
/// error if the directory cannot be created or writing fails.
pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    check_output_format(path, ImageFormat::Png)?;
    ensure_parent(path)?;
    std::fs::write(path, encode_png(img)?)?;
    tracing::debug!(path = %path.display(), "wrote PNG");
    Ok(())
}

/// Flatten an RGBA image onto white and save it as JPEG.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] unless `path` ends in `.jpg`/`.jpeg`,
/// or an error if the directory cannot be created or writing fails.
pub fn save_jpeg(img: &RgbaImage, path: &Path) -> Result<()> {
    check_output_format(path, ImageFormat::Jpeg)?;
    ensure_parent(path)?;
    std::fs::write(path, encode_jpeg(&flatten_on_white(img), DEFAULT_JPEG_QUALITY)?)?;
    tracing::debug!(path = %path.display(), "wrote JPEG");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Wrap PNG bytes into a `data:image/png;base64,` URL.
#[must_use]
pub fn to_data_url(png_bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png_bytes))
}

/// Strip a `data:image/{png,jpeg,jpg,webp};base64,` prefix if present.
#[must_use]
pub fn strip_data_url_prefix(s: &str) -> &str {
    DATA_URL_PREFIXES
        .iter()
        .find_map(|prefix| s.strip_prefix(prefix))
        .unwrap_or(s)
}

/// Decode a data URL (or bare base64 payload) into bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the payload is not valid base64.
pub fn from_data_url(s: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(strip_data_url_prefix(s.trim()))
        .map_err(|e| Error::invalid_input(format!("invalid base64 payload: {e}")))
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Generate a default output path from an input path.
///
/// Example: `"scroll.jpg"` becomes `"scroll_transparent.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_transparent.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_round_trip_keeps_alpha() {
        let mut img = RgbaImage::new(4, 3);
        for (i, px) in img.pixels_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let a = (i * 20) as u8;
            *px = Rgba([10, 20, 30, a]);
        }
        let decoded = decode(&encode_png(&img).unwrap()).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn flatten_composites_over_white() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(2, 0, Rgba([0, 100, 200, 128]));
        let flat = flatten_on_white(&img);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
        let mid = flat.get_pixel(2, 0);
        assert!((126..=128).contains(&mid[0]));
        assert!(mid[2] > 200);
    }

    #[test]
    fn jpeg_export_is_decodable_and_opaque() {
        let img = RgbImage::from_pixel(8, 8, Rgb([200, 10, 10]));
        let bytes = encode_jpeg(&img, DEFAULT_JPEG_QUALITY).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back.dimensions(), (8, 8));
        assert!(back.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn save_rejects_mismatched_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));

        let wrong = dir.path().join("out.jpg");
        assert!(matches!(
            save_png(&img, &wrong),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(!wrong.exists());
        assert!(matches!(
            save_png(&img, &dir.path().join("out")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            save_jpeg(&img, &dir.path().join("out.png")),
            Err(Error::UnsupportedFormat(_))
        ));

        save_png(&img, &dir.path().join("out.png")).unwrap();
        save_jpeg(&img, &dir.path().join("out.jpeg")).unwrap();
    }

    #[test]
    fn data_url_prefixes_are_stripped() {
        assert_eq!(strip_data_url_prefix("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url_prefix("data:image/jpg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url_prefix("data:image/webp;base64,QQ=="), "QQ==");
        assert_eq!(strip_data_url_prefix("AAAA"), "AAAA");
        assert_eq!(
            strip_data_url_prefix("data:image/gif;base64,AAAA"),
            "data:image/gif;base64,AAAA"
        );
    }

    #[test]
    fn data_url_round_trip() {
        let payload = [0x89, b'P', b'N', b'G', 0, 1, 2, 3];
        let url = to_data_url(&payload);
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(from_data_url(&url).unwrap(), payload);
        assert!(matches!(
            from_data_url("data:image/png;base64,!!!"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn default_output_path_appends_transparent_suffix() {
        let p = default_output_path(Path::new("/tmp/scroll.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/scroll_transparent.png"));

        let p = default_output_path(Path::new("ink.webp"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "ink_transparent.png"
        );
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo")));
    }
}
