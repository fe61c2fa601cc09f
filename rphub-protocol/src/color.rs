//! 24-bit color values for framebuffer commands
//!
//! Colors travel on the wire as three bytes in `r, g, b` order, both inside
//! the CLEAR parameter record and as the pixels of a DRAW payload.

use bytemuck::{Pod, Zeroable};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An RGB color with 8 bits per channel
///
/// The layout is fixed so a `&[Color]` bitmap is already its own wire
/// payload; see [`pixels_as_bytes`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Bytes per pixel on the wire
pub const BYTES_PER_PIXEL: usize = core::mem::size_of::<Color>();

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    pub const CYAN: Self = Self::rgb(0, 255, 255);
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);
    pub const ORANGE: Self = Self::rgb(255, 165, 0);
    pub const PURPLE: Self = Self::rgb(128, 0, 128);
    pub const GRAY: Self = Self::rgb(128, 128, 128);

    /// Create a color from its channels
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color with every channel scaled by `alpha`
    ///
    /// Each channel becomes `round(channel * alpha)` clamped to `0..=255`.
    /// The clamp applies to the scaled result, not to `alpha`: an alpha
    /// above 1.0 brightens toward 255, a negative or NaN alpha gives black.
    pub fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self {
            r: scale_channel(r, alpha),
            g: scale_channel(g, alpha),
            b: scale_channel(b, alpha),
        }
    }

    /// Convert 8-bit hue, saturation and value to RGB
    ///
    /// The hue circle is split into six regions of 43 steps. 6 * 43 is 258,
    /// so the last region (hue 215..=255) is three steps short; this matches
    /// the conversion the display firmware uses and is kept as-is.
    pub fn hsv(h: u8, s: u8, v: u8) -> Self {
        if s == 0 {
            return Self::rgb(v, v, v);
        }

        let region = h / 43;
        let remainder = u16::from(h - region * 43) * 6;

        let (s, v) = (u16::from(s), u16::from(v));
        let p = ((v * (255 - s)) >> 8) as u8;
        let q = ((v * (255 - ((s * remainder) >> 8))) >> 8) as u8;
        let t = ((v * (255 - ((s * (255 - remainder)) >> 8))) >> 8) as u8;
        let v = v as u8;

        match region {
            0 => Self::rgb(v, t, p),
            1 => Self::rgb(q, v, p),
            2 => Self::rgb(p, v, t),
            3 => Self::rgb(p, q, v),
            4 => Self::rgb(t, p, v),
            _ => Self::rgb(v, p, q),
        }
    }

    /// Wire representation
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Color {
    fn from(bytes: [u8; 3]) -> Self {
        Self::rgb(bytes[0], bytes[1], bytes[2])
    }
}

fn scale_channel(channel: u8, alpha: f32) -> u8 {
    let scaled = libm::fminf(libm::fmaxf(f32::from(channel) * alpha, 0.0), 255.0);
    libm::roundf(scaled) as u8
}

/// View a bitmap as its row-major RGB byte stream
pub fn pixels_as_bytes(pixels: &[Color]) -> &[u8] {
    bytemuck::cast_slice(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_named_colors() {
        assert_eq!(Color::ORANGE, Color::rgb(255, 165, 0));
        assert_eq!(Color::default(), Color::BLACK);
    }

    #[test]
    fn test_rgba_half() {
        // 255 * 0.5 = 127.5 rounds away from zero
        assert_eq!(Color::rgba(255, 100, 1, 0.5), Color::rgb(128, 50, 1));
    }

    #[test]
    fn test_rgba_out_of_range_alpha() {
        assert_eq!(Color::rgba(200, 100, 0, 2.0), Color::rgb(255, 200, 0));
        assert_eq!(Color::rgba(200, 100, 50, -1.0), Color::BLACK);
        assert_eq!(Color::rgba(200, 100, 50, f32::NAN), Color::BLACK);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(Color::hsv(0, 255, 255), Color::rgb(255, 0, 0));
        assert_eq!(Color::hsv(86, 255, 255), Color::rgb(0, 255, 0));
        assert_eq!(Color::hsv(172, 255, 255), Color::rgb(0, 0, 255));
    }

    #[test]
    fn test_hsv_last_region() {
        // hue 255: region 5, remainder 240
        let c = Color::hsv(255, 255, 255);
        assert_eq!(c.r, 255);
        assert_eq!(c.g, 0);
        assert_eq!(c.b, 15);
    }

    #[test]
    fn test_pixels_as_bytes_row_major() {
        let bitmap = [Color::RED, Color::rgb(1, 2, 3)];
        assert_eq!(pixels_as_bytes(&bitmap), &[255, 0, 0, 1, 2, 3]);
        assert_eq!(BYTES_PER_PIXEL, 3);
    }

    proptest! {
        #[test]
        fn rgb_is_identity(r: u8, g: u8, b: u8) {
            let c = Color::rgb(r, g, b);
            prop_assert_eq!(c.to_bytes(), [r, g, b]);
        }

        #[test]
        fn rgba_full_and_zero_alpha(r: u8, g: u8, b: u8) {
            prop_assert_eq!(Color::rgba(r, g, b, 1.0), Color::rgb(r, g, b));
            prop_assert_eq!(Color::rgba(r, g, b, 0.0), Color::BLACK);
        }

        #[test]
        fn hsv_zero_saturation_is_gray(h: u8, v: u8) {
            prop_assert_eq!(Color::hsv(h, 0, v), Color::rgb(v, v, v));
        }

        #[test]
        fn hsv_full_value_keeps_one_channel_saturated(h: u8) {
            let c = Color::hsv(h, 255, 255);
            prop_assert!(c.r == 255 || c.g == 255 || c.b == 255);
        }
    }
}
