use crate::color::Color;
use crate::error::Result;
use crate::pngio;
use std::io::{Read, Write};

//===========================================================================//

/// A fixed-size array of colors in row-major order from top to bottom.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Raster {
    /// Creates a raster filled with the given color.  Panics if either
    /// dimension is zero.
    pub fn new(width: u32, height: u32, fill: Color) -> Raster {
        check_dimensions(width, height);
        let num_pixels = (width as usize) * (height as usize);
        Raster { width, height, pixels: vec![fill; num_pixels] }
    }

    /// Creates a raster from its pixels.  Panics if either dimension is zero
    /// or if `pixels` doesn't hold exactly `width * height` colors.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> Raster {
        check_dimensions(width, height);
        let expected_len = (width as u64) * (height as u64);
        if (pixels.len() as u64) != expected_len {
            panic!(
                "Invalid pixel count (was {}, but must be {} for {}x{} \
                 raster)",
                pixels.len(),
                expected_len,
                width,
                height
            );
        }
        Raster { width, height, pixels }
    }

    /// Creates a raster from RGBA bytes.  The `width` and `height` must be
    /// nonzero, and `rgba_data` must have `4 * width * height` bytes in
    /// row-major order from top to bottom.  Panics if the dimensions are out
    /// of range or if `rgba_data` is the wrong length.
    pub fn from_rgba_data(width: u32, height: u32, rgba_data: &[u8]) -> Raster {
        check_dimensions(width, height);
        let expected_data_len = (width as u64) * (height as u64) * 4;
        if (rgba_data.len() as u64) != expected_data_len {
            panic!(
                "Invalid data length (was {}, but must be {} for {}x{} image)",
                rgba_data.len(),
                expected_data_len,
                width,
                height
            );
        }
        let pixels = rgba_data
            .chunks_exact(4)
            .map(|px| Color::new(px[3], px[0], px[1], px[2]))
            .collect();
        Raster { width, height, pixels }
    }

    /// Returns the width of the raster, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the raster, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixels in row-major order from top to bottom.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Returns the pixels for modification.
    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    /// Consumes the raster, returning its pixels.
    pub fn into_pixels(self) -> Vec<Color> {
        self.pixels
    }

    /// Returns the color at the given coordinates.  Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        assert!(x < self.width && y < self.height);
        self.pixels[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Sets the color at the given coordinates.  Panics if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        assert!(x < self.width && y < self.height);
        let index = (y as usize) * (self.width as usize) + (x as usize);
        self.pixels[index] = color;
    }

    /// Returns the raster as RGBA bytes in row-major order from top to
    /// bottom.
    pub fn to_rgba_data(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixels.len() * 4);
        for color in self.pixels.iter() {
            rgba.extend_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        rgba
    }

    /// Decodes a raster from a PNG file of any color type.  Returns a
    /// `MalformedPng` error if the PNG data can't be decoded.
    pub fn read_png<R: Read>(mut reader: R) -> Result<Raster> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(pngio::read_png_image(&data)?.raster)
    }

    /// Encodes the raster as an RGBA PNG file.
    pub fn write_png<W: Write>(&self, writer: W) -> Result<()> {
        pngio::write_rgba_png(self, writer)
    }

    /// Returns true if any pixel is not fully opaque.
    pub fn has_alpha(&self) -> bool {
        self.pixels.iter().any(|color| color.a != u8::MAX)
    }

    /// Returns true if any pixel has an alpha value strictly between fully
    /// transparent and fully opaque.
    pub fn has_nonbinary_alpha(&self) -> bool {
        self.pixels.iter().any(|color| color.a != 0 && color.a != u8::MAX)
    }
}

fn check_dimensions(width: u32, height: u32) {
    if width < 1 {
        panic!("Invalid width (was {}, but must be at least 1)", width);
    }
    if height < 1 {
        panic!("Invalid height (was {}, but must be at least 1)", height);
    }
}

//===========================================================================//


//===========================================================================//
