//! RGB to CIE xy conversion for Hue bulbs.
//!
//! Implements the conversion published for Hue lamps: gamma-correct the RGB
//! input, project it onto the Wide RGB D65 XYZ space, and clip the resulting
//! chromaticity into the lamp's gamut triangle. The result is approximate;
//! clipped colors do not round-trip.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point in CIE 1931 xy chromaticity space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct XyPoint {
    pub x: f64,
    pub y: f64,
}

impl XyPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn sub(self, other: XyPoint) -> XyPoint {
        XyPoint::new(self.x - other.x, self.y - other.y)
    }

    fn cross(self, other: XyPoint) -> f64 {
        self.x * other.y - self.y * other.x
    }

    fn distance(self, other: XyPoint) -> f64 {
        let d = self.sub(other);
        (d.x * d.x + d.y * d.y).sqrt()
    }
}

impl fmt::Display for XyPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={:.4} y={:.4}", self.x, self.y)
    }
}

/// Color gamut of a Hue lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Gamut {
    /// Early LivingColors and LightStrips.
    A,
    /// First generation Hue bulbs.
    B,
    /// Current Hue bulbs, including the Bluetooth models.
    #[default]
    C,
}

impl Gamut {
    /// The gamut triangle as (red, green, blue) corners.
    #[must_use]
    pub fn triangle(&self) -> (XyPoint, XyPoint, XyPoint) {
        match self {
            Gamut::A => (
                XyPoint::new(0.704, 0.296),
                XyPoint::new(0.2151, 0.7106),
                XyPoint::new(0.138, 0.08),
            ),
            Gamut::B => (
                XyPoint::new(0.675, 0.322),
                XyPoint::new(0.4091, 0.518),
                XyPoint::new(0.167, 0.04),
            ),
            Gamut::C => (
                XyPoint::new(0.692, 0.308),
                XyPoint::new(0.17, 0.7),
                XyPoint::new(0.153, 0.048),
            ),
        }
    }

    /// Whether `point` lies inside (or on the edge of) the gamut triangle.
    #[must_use]
    pub fn contains(&self, point: XyPoint) -> bool {
        let (red, green, blue) = self.triangle();
        let v1 = green.sub(red);
        let v2 = blue.sub(red);
        let q = point.sub(red);
        let denom = v1.cross(v2);
        let s = q.cross(v2) / denom;
        let t = v1.cross(q) / denom;
        s >= 0.0 && t >= 0.0 && s + t <= 1.0
    }

    /// The point of the gamut triangle closest to `point`.
    #[must_use]
    pub fn closest_point(&self, point: XyPoint) -> XyPoint {
        let (red, green, blue) = self.triangle();
        let candidates = [
            closest_point_on_segment(red, green, point),
            closest_point_on_segment(blue, red, point),
            closest_point_on_segment(green, blue, point),
        ];

        candidates
            .into_iter()
            .min_by(|a, b| a.distance(point).total_cmp(&b.distance(point)))
            .unwrap_or(red)
    }
}

impl fmt::Display for Gamut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gamut::A => write!(f, "Gamut A"),
            Gamut::B => write!(f, "Gamut B"),
            Gamut::C => write!(f, "Gamut C"),
        }
    }
}

fn closest_point_on_segment(a: XyPoint, b: XyPoint, p: XyPoint) -> XyPoint {
    let ap = p.sub(a);
    let ab = b.sub(a);
    let ab2 = ab.x * ab.x + ab.y * ab.y;
    let t = if ab2 == 0.0 {
        0.0
    } else {
        ((ap.x * ab.x + ap.y * ab.y) / ab2).clamp(0.0, 1.0)
    };
    XyPoint::new(a.x + ab.x * t, a.y + ab.y * t)
}

/// Look up the gamut of a Hue model number (e.g. `"LCT015"`).
///
/// Returns `None` for models not in the table; callers fall back to
/// [`Gamut::default`].
///
/// # Examples
///
/// ```
/// use hue_types::color::{Gamut, gamut_for_model};
///
/// assert_eq!(gamut_for_model("LCT001"), Some(Gamut::B));
/// assert_eq!(gamut_for_model(" lca001 "), Some(Gamut::C));
/// assert_eq!(gamut_for_model("Unknown"), None);
/// ```
#[must_use]
pub fn gamut_for_model(model: &str) -> Option<Gamut> {
    let model = model.trim().trim_end_matches('\0').to_ascii_uppercase();
    match model.as_str() {
        "LST001" | "LLC005" | "LLC006" | "LLC007" | "LLC010" | "LLC011" | "LLC012"
        | "LLC013" | "LLC014" => Some(Gamut::A),
        "LCT001" | "LCT002" | "LCT003" | "LCT007" | "LLM001" => Some(Gamut::B),
        "LCT010" | "LCT011" | "LCT012" | "LCT014" | "LCT015" | "LCT016" | "LLC020"
        | "LST002" | "LCA001" | "LCA002" | "LCA003" | "LCT024" | "LCG002" => Some(Gamut::C),
        _ => None,
    }
}

fn gamma_correct(channel: f64) -> f64 {
    if channel > 0.04045 {
        ((channel + 0.055) / 1.055).powf(2.4)
    } else {
        channel / 12.92
    }
}

/// Convert an RGB color (0-255 per channel) to xy inside `gamut`.
///
/// Channels are clamped to 0-255. Black maps to `(0, 0)` before gamut
/// clipping.
#[must_use]
pub fn rgb_to_xy(red: f64, green: f64, blue: f64, gamut: Gamut) -> XyPoint {
    let r = gamma_correct(red.clamp(0.0, 255.0) / 255.0);
    let g = gamma_correct(green.clamp(0.0, 255.0) / 255.0);
    let b = gamma_correct(blue.clamp(0.0, 255.0) / 255.0);

    let x = r * 0.664511 + g * 0.154324 + b * 0.162028;
    let y = r * 0.283881 + g * 0.668433 + b * 0.047685;
    let z = r * 0.000088 + g * 0.072310 + b * 0.986039;

    let sum = x + y + z;
    let point = if sum == 0.0 {
        XyPoint::new(0.0, 0.0)
    } else {
        XyPoint::new(x / sum, y / sum)
    };

    if gamut.contains(point) {
        point
    } else {
        gamut.closest_point(point)
    }
}
