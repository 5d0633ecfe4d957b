use crate::bitdepth::BitDepth;
use crate::color::Color;
use crate::entry::Entry;
use crate::quantize::reduce;
use crate::raster::Raster;
use crate::resample::resample;
use log::debug;

//===========================================================================//

/// The pixels of a quantized image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PixelData {
    /// Palette indices, one per pixel in row-major order from the top.  The
    /// palette holds only colors that are actually used.
    Indexed {
        /// The colors referred to by `indices`.
        palette: Vec<Color>,
        /// One palette index per pixel.
        indices: Vec<u8>,
    },
    /// One color per pixel in row-major order from the top.
    Direct(Vec<Color>),
}

//===========================================================================//

/// A 1-bit transparency mask; the AND mask of a DIB.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    opaque: Vec<bool>,
}

impl AlphaMask {
    pub(crate) fn new(width: u32, height: u32, opaque: Vec<bool>) -> AlphaMask {
        debug_assert_eq!(opaque.len(), (width as usize) * (height as usize));
        AlphaMask { width, height, opaque }
    }

    /// Returns the width of the mask, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the mask, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns true if the pixel at the given coordinates is opaque.
    pub fn is_opaque(&self, x: u32, y: u32) -> bool {
        assert!(x < self.width && y < self.height);
        self.opaque[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Returns the mask pixel as `Color::WHITE` (opaque) or `Color::BLACK`
    /// (transparent).
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        if self.is_opaque(x, y) {
            Color::WHITE
        } else {
            Color::BLACK
        }
    }

    /// Returns the number of transparent pixels.
    pub fn transparent_count(&self) -> usize {
        self.opaque.iter().filter(|&&opaque| !opaque).count()
    }
}

//===========================================================================//

/// An entry's pixels in the exact form they are stored in a file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuantizedImage {
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    is_png: bool,
    pixels: PixelData,
    alpha_mask: Option<AlphaMask>,
}

impl QuantizedImage {
    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the depth the image was quantized to.
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Returns true if the image was prepared for PNG storage.
    pub fn is_png(&self) -> bool {
        self.is_png
    }

    /// Returns the pixel data.
    pub fn pixels(&self) -> &PixelData {
        &self.pixels
    }

    /// Returns the palette, which is empty for direct-color depths.
    pub fn palette(&self) -> &[Color] {
        match self.pixels {
            PixelData::Indexed { ref palette, .. } => palette,
            PixelData::Direct(_) => &[],
        }
    }

    /// Returns the separate 1-bit mask.  Only DIB images below 32 bits per
    /// pixel have one.
    pub fn alpha_mask(&self) -> Option<&AlphaMask> {
        self.alpha_mask.as_ref()
    }

    /// Returns the stored color of a pixel, ignoring the mask.
    pub fn color(&self, x: u32, y: u32) -> Color {
        assert!(x < self.width && y < self.height);
        let index = (y as usize) * (self.width as usize) + (x as usize);
        match self.pixels {
            PixelData::Indexed { ref palette, ref indices } => {
                palette[indices[index] as usize]
            }
            PixelData::Direct(ref colors) => colors[index],
        }
    }

    /// Returns the image as it appears when decoded: mask-transparent pixels
    /// keep their color but get zero alpha.
    pub fn to_raster(&self) -> Raster {
        let mut pixels =
            Vec::with_capacity((self.width as usize) * (self.height as usize));
        for y in 0..self.height {
            for x in 0..self.width {
                let color = self.color(x, y);
                let color = match self.alpha_mask {
                    Some(ref mask) if !mask.is_opaque(x, y) => {
                        color.with_alpha(0)
                    }
                    _ => color,
                };
                pixels.push(color);
            }
        }
        Raster::from_pixels(self.width, self.height, pixels)
    }
}

//===========================================================================//

/// Converts an entry's source raster into the pixels stored for it at the
/// given depth and encoding.  Always computes a fresh result; use
/// `Entry::quantize` to go through the entry's cache.
pub fn quantize(
    entry: &Entry,
    is_png: bool,
    bit_depth: BitDepth,
) -> QuantizedImage {
    let width = entry.width();
    let height = entry.height();
    let filter = entry.scaling_filter();
    let threshold = entry.alpha_threshold();
    debug!(
        "Quantizing {}x{} entry to {} bpp ({})",
        width,
        height,
        bit_depth.bits_per_pixel(),
        if is_png { "PNG" } else { "BMP" }
    );
    let base = resample(entry.base_image(), width, height, filter).into_pixels();
    let alpha = entry
        .alpha_image()
        .map(|image| resample(image, width, height, filter));
    let opaque: Vec<bool> = match alpha {
        Some(ref alpha) => alpha
            .pixels()
            .iter()
            .map(|&color| mask_color(color) == Color::WHITE)
            .collect(),
        None => base.iter().map(|color| color.a >= threshold).collect(),
    };

    let image = |pixels: PixelData, alpha_mask: Option<AlphaMask>| {
        QuantizedImage { width, height, bit_depth, is_png, pixels, alpha_mask }
    };

    if bit_depth.has_alpha_channel() {
        let mut pixels = base;
        if is_png && alpha.is_some() {
            for (pixel, &opaque) in pixels.iter_mut().zip(opaque.iter()) {
                if !opaque {
                    pixel.a = 0;
                }
            }
        }
        return image(PixelData::Direct(pixels), None);
    }

    // Below 32 bpp every pixel is either opaque or fully transparent.
    // Transparent pixels are opaque black under a DIB's mask, and share one
    // transparent color in a PNG.
    let flattened: Vec<Color> = base
        .iter()
        .zip(opaque.iter())
        .map(|(&color, &opaque)| match (opaque, is_png) {
            (true, _) => color.with_alpha(u8::MAX),
            (false, false) => Color::BLACK,
            (false, true) => Color::TRANSPARENT,
        })
        .collect();
    let pixels = if bit_depth.is_indexed() {
        let reduced = reduce(
            &flattened,
            bit_depth.palette_capacity(),
            threshold,
        );
        PixelData::Indexed { palette: reduced.palette, indices: reduced.indices }
    } else {
        PixelData::Direct(flattened)
    };
    let alpha_mask = if is_png {
        None
    } else {
        Some(AlphaMask::new(width, height, opaque))
    };
    image(pixels, alpha_mask)
}

// Classifies a pixel of an explicit alpha image as opaque (white) or
// transparent (black).
fn mask_color(color: Color) -> Color {
    let candidates = [Color::WHITE, Color::BLACK, Color::TRANSPARENT];
    match color.nearest_index(&candidates) {
        Some(0) => Color::WHITE,
        _ => Color::BLACK,
    }
}

//===========================================================================//


//===========================================================================//
