//! Threshold-band alpha matting for artwork photographed on white paper.
//!
//! Each pixel is reduced to a scalar brightness, either perceptual luminance or
//! closeness to pure white, and then classified:
//!
//! - `brightness > threshold`: background, alpha 0
//! - `threshold - smoothing < brightness <= threshold`: edge band, alpha ramps
//!   linearly from 0 up to 255
//! - otherwise: foreground, alpha 255
//!
//! Only the alpha channel is written. RGB values pass through untouched, so
//! running the transform twice with the same settings yields the same alpha.

use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, RgbaImage};

use crate::error::{Error, Result};

/// Default brightness cutoff, biased toward removing near-white paper.
pub const DEFAULT_THRESHOLD: u8 = 240;

/// Default width of the edge band in brightness units.
pub const DEFAULT_SMOOTHING: u8 = 20;

/// Widest edge band honored; larger smoothing values are clamped to this.
pub const MAX_SMOOTHING: u8 = 100;

/// Pixel count above which the scan is split across rayon workers.
pub const PARALLEL_MIN_PIXELS: usize = 1 << 18;

/// Pixels handed to a single worker per parallel chunk.
#[cfg(feature = "parallel")]
const PARALLEL_CHUNK_PIXELS: usize = 1 << 14;

/// How a pixel's RGB is reduced to a brightness value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MattingMode {
    /// Perceptual luma (`0.299 R + 0.587 G + 0.114 B`). Best for ink and calligraphy.
    #[default]
    Luminance,
    /// `255 - distance from white`, hue independent. Best for coloured paintings.
    Color,
}

impl MattingMode {
    /// Lowercase name used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Luminance => "luminance",
            Self::Color => "color",
        }
    }
}

impl fmt::Display for MattingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MattingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "luminance" | "luma" => Ok(Self::Luminance),
            "color" | "colour" => Ok(Self::Color),
            other => Err(Error::invalid_input(format!("unknown matting mode: {other}"))),
        }
    }
}

/// Parameters for a single matting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MattingSettings {
    /// Brightness above which a pixel is background (0-255).
    pub threshold: u8,
    /// Width of the linear edge band below `threshold` (0-100, 0 = hard edge).
    pub smoothing: u8,
    /// Brightness metric.
    pub mode: MattingMode,
}

impl Default for MattingSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            smoothing: DEFAULT_SMOOTHING,
            mode: MattingMode::Luminance,
        }
    }
}

impl MattingSettings {
    /// Return a copy with a different threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Return a copy with a different smoothing band.
    #[must_use]
    pub const fn with_smoothing(mut self, smoothing: u8) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Return a copy with a different brightness metric.
    #[must_use]
    pub const fn with_mode(mut self, mode: MattingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Smoothing clamped to [`MAX_SMOOTHING`].
    #[must_use]
    pub fn effective_smoothing(self) -> u8 {
        self.smoothing.min(MAX_SMOOTHING)
    }
}

/// Compute the brightness of a pixel under the given metric.
///
/// Luminance yields values in `[0, 255]`. Colour mode maps the Euclidean
/// distance from white onto the same scale and floors it at zero, so any
/// strongly saturated colour reads as fully dark.
#[must_use]
pub fn brightness(r: u8, g: u8, b: u8, mode: MattingMode) -> f64 {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    match mode {
        MattingMode::Luminance => 0.299 * r + 0.587 * g + 0.114 * b,
        MattingMode::Color => {
            let dist = ((255.0 - r).powi(2) + (255.0 - g).powi(2) + (255.0 - b).powi(2)).sqrt();
            (255.0 - dist).max(0.0)
        }
    }
}

/// Map a brightness value to an alpha value.
///
/// With zero smoothing this is a hard step: brightness strictly above the
/// threshold is transparent, everything else opaque. Band values are rounded
/// half to even, the way a clamped byte store rounds.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn alpha_for(brightness: f64, settings: MattingSettings) -> u8 {
    let cutoff = f64::from(settings.threshold);
    let fade = f64::from(settings.effective_smoothing());

    if brightness > cutoff {
        0
    } else if fade > 0.0 && brightness > cutoff - fade {
        let alpha = 255.0 * (1.0 - (brightness - (cutoff - fade)) / fade);
        alpha.round_ties_even().clamp(0.0, 255.0) as u8
    } else {
        255
    }
}

/// Alpha for a single RGB triple.
#[must_use]
pub fn pixel_alpha(r: u8, g: u8, b: u8, settings: MattingSettings) -> u8 {
    alpha_for(brightness(r, g, b, settings.mode), settings)
}

/// Matte a raw RGBA8 buffer in place.
///
/// Only every fourth byte (alpha) is written.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if either dimension is zero or the buffer
/// length is not `width * height * 4`.
pub fn matte_rgba(data: &mut [u8], width: u32, height: u32, settings: MattingSettings) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_input(format!(
            "empty image ({width}x{height})"
        )));
    }

    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(Error::invalid_input(format!(
            "buffer holds {} bytes, expected {expected} for {width}x{height} RGBA8",
            data.len()
        )));
    }

    apply(data, settings);
    Ok(())
}

/// Matte an RGBA image in place.
pub fn matte_in_place(image: &mut RgbaImage, settings: MattingSettings) {
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        threshold = settings.threshold,
        smoothing = settings.smoothing,
        mode = %settings.mode,
        "matting image"
    );
    apply(image, settings);
}

/// Matte a copy of an RGBA image, leaving the input untouched.
#[must_use]
pub fn matte(image: &RgbaImage, settings: MattingSettings) -> RgbaImage {
    let mut out = image.clone();
    matte_in_place(&mut out, settings);
    out
}

/// Convert any decoded image to RGBA8 and matte it.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the image has a zero dimension.
pub fn matte_image(image: &DynamicImage, settings: MattingSettings) -> Result<RgbaImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::invalid_input(format!(
            "empty image ({}x{})",
            image.width(),
            image.height()
        )));
    }
    let mut rgba = image.to_rgba8();
    matte_in_place(&mut rgba, settings);
    Ok(rgba)
}

fn apply(data: &mut [u8], settings: MattingSettings) {
    #[cfg(feature = "parallel")]
    {
        if data.len() / 4 >= PARALLEL_MIN_PIXELS {
            use rayon::prelude::*;
            data.par_chunks_mut(PARALLEL_CHUNK_PIXELS * 4)
                .for_each(|chunk| apply_sequential(chunk, settings));
            return;
        }
    }

    apply_sequential(data, settings);
}

fn apply_sequential(data: &mut [u8], settings: MattingSettings) {
    for px in data.chunks_exact_mut(4) {
        px[3] = pixel_alpha(px[0], px[1], px[2], settings);
    }
}

/// Alpha histogram summary of a matted image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatteStats {
    /// Pixels with alpha 0.
    pub transparent: u64,
    /// Pixels with alpha strictly between 0 and 255.
    pub partial: u64,
    /// Pixels with alpha 255.
    pub opaque: u64,
}

impl MatteStats {
    /// Total number of pixels counted.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.transparent + self.partial + self.opaque
    }

    /// Share of fully opaque pixels (0.0 for an empty image).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn opaque_ratio(&self) -> f32 {
        match self.total() {
            0 => 0.0,
            total => self.opaque as f32 / total as f32,
        }
    }
}

/// Count transparent, partial and opaque pixels.
#[must_use]
pub fn alpha_stats(image: &RgbaImage) -> MatteStats {
    let mut stats = MatteStats::default();
    for px in image.pixels() {
        match px[3] {
            0 => stats.transparent += 1,
            255 => stats.opaque += 1,
            _ => stats.partial += 1,
        }
    }
    stats
}
