#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

// Channel weights for `Color::distance_squared`.  Alpha dominates so that a
// transparent pixel never matches an opaque one of the same hue.
const ALPHA_WEIGHT: u32 = 12;
const RED_WEIGHT: u32 = 3;
const GREEN_WEIGHT: u32 = 4;
const BLUE_WEIGHT: u32 = 2;

//===========================================================================//

/// A 32-bit color with straight (non-premultiplied) alpha.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Color {
    /// Opacity; 0 is fully transparent, 255 fully opaque.
    pub a: u8,
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Opaque white; marks an opaque pixel in an alpha mask.
    pub const WHITE: Color = Color { a: 255, r: 255, g: 255, b: 255 };
    /// Opaque black; marks a transparent pixel in an alpha mask.
    pub const BLACK: Color = Color { a: 255, r: 0, g: 0, b: 0 };
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color { a: 0, r: 0, g: 0, b: 0 };

    /// Creates a color from its channels.
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Color {
        Color { a, r, g, b }
    }

    /// Creates an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { a: 255, r, g, b }
    }

    /// Unpacks a color stored as `0xAARRGGBB` (BGRA byte order in memory on
    /// little-endian machines).
    pub const fn from_argb(argb: u32) -> Color {
        Color {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// Packs this color as `0xAARRGGBB`.
    pub const fn to_argb(self) -> u32 {
        ((self.a as u32) << 24)
            | ((self.r as u32) << 16)
            | ((self.g as u32) << 8)
            | (self.b as u32)
    }

    /// Returns this color with a different alpha value.
    pub const fn with_alpha(self, a: u8) -> Color {
        Color { a, r: self.r, g: self.g, b: self.b }
    }

    /// Returns the weighted squared distance between two colors.  Zero means
    /// the colors are equal.
    pub fn distance_squared(self, other: Color) -> u32 {
        let diff = |x: u8, y: u8| {
            let d = (x as i32 - y as i32).unsigned_abs();
            d * d
        };
        ALPHA_WEIGHT * diff(self.a, other.a)
            + RED_WEIGHT * diff(self.r, other.r)
            + GREEN_WEIGHT * diff(self.g, other.g)
            + BLUE_WEIGHT * diff(self.b, other.b)
    }

    /// Returns the index of the palette color nearest to this one, or `None`
    /// if the palette is empty.  Ties go to the lowest index.
    pub fn nearest_index(self, palette: &[Color]) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (index, &candidate) in palette.iter().enumerate() {
            let distance = self.distance_squared(candidate);
            if distance == 0 {
                return Some(index);
            }
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((index, distance)),
            }
        }
        best.map(|(index, _)| index)
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::Color;

    #[test]
    fn argb_round_trip() {
        let color = Color::new(0x12, 0x34, 0x56, 0x78);
        assert_eq!(color.to_argb(), 0x12345678);
        assert_eq!(Color::from_argb(0x12345678), color);
    }

    #[test]
    fn alpha_dominates_distance() {
        let gray = Color::rgb(128, 128, 128);
        let faded = gray.with_alpha(100);
        let darker = Color::rgb(100, 128, 128);
        assert!(gray.distance_squared(faded) > gray.distance_squared(darker));
        assert_eq!(gray.distance_squared(gray), 0);
    }

    #[test]
    fn nearest_index_picks_closest() {
        let palette = [Color::BLACK, Color::WHITE, Color::TRANSPARENT];
        assert_eq!(Color::rgb(200, 210, 190).nearest_index(&palette), Some(1));
        assert_eq!(Color::rgb(20, 10, 30).nearest_index(&palette), Some(0));
        assert_eq!(
            Color::new(10, 255, 255, 255).nearest_index(&palette),
            Some(2)
        );
        assert_eq!(Color::WHITE.nearest_index(&[]), None);
    }
}

//===========================================================================//
