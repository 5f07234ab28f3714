//! Color types and color-space conversions
//!
//! All classification decisions go through [`perceptual_distance`], the
//! Euclidean distance between two colors in CIE L*a*b* (ΔE76). Raw RGB
//! differences are only used by the bilateral filter's intensity weight.

use crate::error::{BgAlphaError, Result};
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// sRGB color with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from arbitrary integer channels, clamping each to [0, 255]
    #[must_use]
    pub fn from_clamped(r: i32, g: i32, b: i32) -> Self {
        Self {
            r: r.clamp(0, 255) as u8,
            g: g.clamp(0, 255) as u8,
            b: b.clamp(0, 255) as u8,
        }
    }

    /// Floor every channel to a multiple of `step`
    #[must_use]
    pub fn quantize(self, step: u8) -> Self {
        let step = step.max(1);
        Self {
            r: self.r / step * step,
            g: self.g / step * step,
            b: self.b / step * step,
        }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb`
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let parse = |s: &str| {
            u8::from_str_radix(s, 16)
                .map_err(|_| BgAlphaError::invalid_config(format!("Invalid hex color: {}", hex)))
        };

        match digits.len() {
            6 if digits.is_ascii() => Ok(Self::new(
                parse(&digits[0..2])?,
                parse(&digits[2..4])?,
                parse(&digits[4..6])?,
            )),
            3 if digits.is_ascii() => {
                let r = parse(&digits[0..1])?;
                let g = parse(&digits[1..2])?;
                let b = parse(&digits[2..3])?;
                Ok(Self::new(r * 17, g * 17, b * 17))
            },
            _ => Err(BgAlphaError::invalid_config(format!(
                "Invalid hex color: {} (expected #rrggbb or #rgb)",
                hex
            ))),
        }
    }

    /// Lowercase `#rrggbb` representation
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    #[must_use]
    pub fn to_lab(self) -> LabColor {
        rgb_to_lab(self)
    }

    #[must_use]
    pub fn to_hsv(self) -> Hsv {
        rgb_to_hsv(self)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RGB({}, {}, {})", self.r, self.g, self.b)
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Rgba<u8>> for Color {
    fn from(pixel: Rgba<u8>) -> Self {
        let [r, g, b, _] = pixel.0;
        Self::new(r, g, b)
    }
}

impl From<&Rgba<u8>> for Color {
    fn from(pixel: &Rgba<u8>) -> Self {
        Self::from(*pixel)
    }
}

impl FromStr for Color {
    type Err = BgAlphaError;

    /// Accepts hex notation or a comma separated `r,g,b` triple
    fn from_str(s: &str) -> Result<Self> {
        if !s.contains(',') {
            return Self::from_hex(s);
        }

        let channels = s
            .split(',')
            .map(|part| {
                part.trim().parse::<i32>().map_err(|_| {
                    BgAlphaError::invalid_config(format!("Invalid color channel '{}' in '{}'", part, s))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        match channels.as_slice() {
            [r, g, b] => Ok(Self::from_clamped(*r, *g, *b)),
            _ => Err(BgAlphaError::invalid_config(format!(
                "Expected three channels in '{}'",
                s
            ))),
        }
    }
}

/// CIE L*a*b* coordinates (D65)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabColor {
    /// Lightness, 0..=100
    pub l: f64,
    /// Green (-) to red (+)
    pub a: f64,
    /// Blue (-) to yellow (+)
    pub b: f64,
}

/// Hue / saturation / value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    /// Hue in degrees, 0..360
    pub h: f64,
    /// Saturation, 0..=100
    pub s: f64,
    /// Value, 0..=100
    pub v: f64,
}

impl From<lab::Lab> for LabColor {
    fn from(lab: lab::Lab) -> Self {
        Self {
            l: f64::from(lab.l),
            a: f64::from(lab.a),
            b: f64::from(lab.b),
        }
    }
}

/// Convert an sRGB color to CIE L*a*b* via XYZ, D65 white point
#[must_use]
pub fn rgb_to_lab(color: Color) -> LabColor {
    LabColor::from(lab::Lab::from_rgb(&[color.r, color.g, color.b]))
}

/// Convert every pixel of `image` to Lab in one pass, ignoring alpha
#[must_use]
pub fn image_to_labs(image: &image::RgbaImage) -> Vec<LabColor> {
    let mut rgb_bytes = Vec::with_capacity(image.width() as usize * image.height() as usize * 3);
    for pixel in image.pixels() {
        rgb_bytes.extend_from_slice(&pixel.0[..3]);
    }
    lab::rgb_bytes_to_labs(&rgb_bytes)
        .into_iter()
        .map(LabColor::from)
        .collect()
}

/// Convert an sRGB color to HSV
#[must_use]
pub fn rgb_to_hsv(color: Color) -> Hsv {
    let r = f64::from(color.r) / 255.0;
    let g = f64::from(color.g) / 255.0;
    let b = f64::from(color.b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let s = if max == 0.0 { 0.0 } else { diff / max * 100.0 };
    let v = max * 100.0;

    let h = if diff == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / diff + if g < b { 6.0 } else { 0.0 }) * 60.0
    } else if max == g {
        ((b - r) / diff + 2.0) * 60.0
    } else {
        ((r - g) / diff + 4.0) * 60.0
    };

    Hsv { h: h % 360.0, s, v }
}

/// ΔE76 between two precomputed Lab values
#[must_use]
pub fn delta_e(lhs: LabColor, rhs: LabColor) -> f64 {
    let dl = lhs.l - rhs.l;
    let da = lhs.a - rhs.a;
    let db = lhs.b - rhs.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Perceptual distance (ΔE) between two sRGB colors
#[must_use]
pub fn perceptual_distance(lhs: Color, rhs: Color) -> f64 {
    delta_e(rgb_to_lab(lhs), rgb_to_lab(rhs))
}

/// Coarse hue family of a color, derived from HSV
///
/// Diagnostic only; the classifier never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFamily {
    White,
    Black,
    Gray,
    Red,
    Yellow,
    Green,
    Cyan,
    Blue,
    Magenta,
}

impl ColorFamily {
    #[must_use]
    pub fn of(color: Color) -> Self {
        let hsv = rgb_to_hsv(color);

        if hsv.v < 20.0 {
            return Self::Black;
        }
        if hsv.s < 15.0 {
            return if hsv.v > 85.0 { Self::White } else { Self::Gray };
        }

        match hsv.h {
            h if h < 30.0 => Self::Red,
            h if h < 90.0 => Self::Yellow,
            h if h < 150.0 => Self::Green,
            h if h < 210.0 => Self::Cyan,
            h if h < 270.0 => Self::Blue,
            h if h < 330.0 => Self::Magenta,
            _ => Self::Red,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
            Self::Gray => "gray",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Cyan => "cyan",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
        }
    }
}

impl fmt::Display for ColorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
