#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

/// The color depth an entry is stored at.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum BitDepth {
    /// 1 bit per pixel; a two-color palette plus an AND mask.
    One,
    /// 4 bits per pixel; a 16-color palette plus an AND mask.
    Four,
    /// 8 bits per pixel; a 256-color palette plus an AND mask.
    Eight,
    /// 24 bits per pixel; direct RGB color plus an AND mask.
    TwentyFour,
    /// 32 bits per pixel; direct color with per-pixel alpha.
    ThirtyTwo,
}

impl BitDepth {
    /// Returns the bit depth with the given bits-per-pixel, if supported.
    pub fn from_bits_per_pixel(bits_per_pixel: u16) -> Option<BitDepth> {
        match bits_per_pixel {
            1 => Some(BitDepth::One),
            4 => Some(BitDepth::Four),
            8 => Some(BitDepth::Eight),
            24 => Some(BitDepth::TwentyFour),
            32 => Some(BitDepth::ThirtyTwo),
            _ => None,
        }
    }

    /// Returns the number of bits used to store one pixel.
    pub fn bits_per_pixel(&self) -> u16 {
        match *self {
            BitDepth::One => 1,
            BitDepth::Four => 4,
            BitDepth::Eight => 8,
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
        }
    }

    /// Returns the maximum number of distinct colors this depth can hold.
    pub fn max_colors(&self) -> u64 {
        1u64 << self.bits_per_pixel()
    }

    /// Returns the largest palette this depth can use, or zero for direct
    /// color depths.
    pub fn palette_capacity(&self) -> usize {
        if self.is_indexed() {
            self.max_colors() as usize
        } else {
            0
        }
    }

    /// Returns true if pixels are stored as palette indices.
    pub fn is_indexed(&self) -> bool {
        matches!(*self, BitDepth::One | BitDepth::Four | BitDepth::Eight)
    }

    /// Returns true if this depth stores alpha per pixel instead of in a
    /// separate 1-bit mask.
    pub fn has_alpha_channel(&self) -> bool {
        *self == BitDepth::ThirtyTwo
    }

    /// Returns the alpha threshold a new entry at this depth starts with.
    pub fn default_alpha_threshold(&self) -> u8 {
        if self.has_alpha_channel() {
            1
        } else {
            96
        }
    }

    /// Returns the largest width or height that can still be stored as a
    /// DIB at this depth; bigger entries are always stored as PNG.
    pub fn max_bmp_dimension(&self) -> u32 {
        if self.has_alpha_channel() {
            96
        } else {
            255
        }
    }
}

//===========================================================================//


//===========================================================================//
