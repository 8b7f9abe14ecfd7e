use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Linear premultiplied RGBA color.
///
/// Invariant:
/// - `rgb` components are multiplied by `a` (premultiplied alpha).
///
/// Interpolating premultiplied components keeps fades towards transparent
/// from darkening.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32, // premultiplied
    pub g: f32, // premultiplied
    pub b: f32, // premultiplied
    pub a: f32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid color '{0}': expected #rrggbb, #rrggbbaa, or a color name")]
pub struct ParseColorError(pub String);

const NAMED: &[(&str, [u8; 4])] = &[
    ("Black", [0, 0, 0, 255]),
    ("Blue", [0, 0, 255, 255]),
    ("CornflowerBlue", [100, 149, 237, 255]),
    ("Cyan", [0, 255, 255, 255]),
    ("DarkGray", [169, 169, 169, 255]),
    ("Gray", [128, 128, 128, 255]),
    ("Green", [0, 128, 0, 255]),
    ("LightGray", [211, 211, 211, 255]),
    ("Lime", [0, 255, 0, 255]),
    ("Magenta", [255, 0, 255, 255]),
    ("Orange", [255, 165, 0, 255]),
    ("Red", [255, 0, 0, 255]),
    ("Transparent", [0, 0, 0, 0]),
    ("White", [255, 255, 255, 255]),
    ("Yellow", [255, 255, 0, 255]),
];

impl Color {
    pub const BLACK: Color = Color::from_premul(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::from_premul(1.0, 1.0, 1.0, 1.0);

    #[inline]
    pub const fn transparent() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }
    }

    /// Creates a premultiplied color from straight sRGB bytes (`0`–`255`).
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_straight(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    #[inline]
    pub const fn from_premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a premultiplied color from straight alpha components.
    #[inline]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: r.clamp(0.0, 1.0) * a,
            g: g.clamp(0.0, 1.0) * a,
            b: b.clamp(0.0, 1.0) * a,
            a,
        }
    }

    /// Returns a straight-alpha representation. For `a == 0`, RGB is 0.
    #[inline]
    pub fn to_straight(self) -> (f32, f32, f32, f32) {
        if self.a <= 0.0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let inv = 1.0 / self.a;
            (self.r * inv, self.g * inv, self.b * inv, self.a)
        }
    }

    /// Straight-alpha sRGB bytes, rounding to nearest.
    pub fn to_srgb_u8(self) -> [u8; 4] {
        let (r, g, b, a) = self.to_straight();
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(r), q(g), q(b), q(a)]
    }

    pub fn named(name: &str) -> Option<Self> {
        NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, [r, g, b, a])| Self::from_srgb_u8(*r, *g, *b, *a))
    }

    /// Component-wise interpolation in premultiplied space.
    pub fn lerp(self, to: Color, t: f32) -> Color {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Color { r: mix(self.r, to.r), g: mix(self.g, to.g), b: mix(self.b, to.b), a: mix(self.a, to.a) }
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    /// `#rrggbb`, `#rrggbbaa`, or a name from the built-in table.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseColorError(s.to_string());
        let Some(hex) = s.strip_prefix('#') else {
            return Color::named(s).ok_or_else(err);
        };
        if !(hex.len() == 6 || hex.len() == 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        Ok(Color::from_srgb_u8(byte(0)?, byte(2)?, byte(4)?, a))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_srgb_u8();
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!("#ff0000".parse::<Color>().unwrap(), Color::from_srgb_u8(255, 0, 0, 255));
        assert_eq!("#00ff0080".parse::<Color>().unwrap().to_srgb_u8(), [0, 255, 0, 128]);
        assert!("#ff00".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
    }

    #[test]
    fn parses_names() {
        assert_eq!("red".parse::<Color>().unwrap(), "#ff0000ff".parse::<Color>().unwrap());
        assert_eq!("Transparent".parse::<Color>().unwrap(), Color::transparent());
        assert!("Mauve-ish".parse::<Color>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let c: Color = "#336699cc".parse().unwrap();
        assert_eq!(c.to_string(), "#336699cc");
    }

    #[test]
    fn lerp_midpoint() {
        let mid = Color::BLACK.lerp(Color::WHITE, 0.5);
        assert_eq!(mid.to_srgb_u8(), [128, 128, 128, 255]);
    }
}
