use crate::bitdepth::BitDepth;
use crate::color::Color;
use crate::convert::{PixelData, QuantizedImage};
use crate::entry::check_dimension;
use crate::error::{Error, ErrorCode, FormatError};
use crate::quantize::pack_row;
use crate::raster::Raster;
use log::debug;
use std::io::{self, Write};

//===========================================================================//

// The signature that all PNG files start with.
pub(crate) const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G'];

/// Returns true if `data` starts with the PNG signature.
pub(crate) fn is_png(data: &[u8]) -> bool {
    data.starts_with(PNG_SIGNATURE)
}

//===========================================================================//

/// A PNG payload decoded to straight RGBA.
pub(crate) struct DecodedPng {
    pub(crate) raster: Raster,
    /// The depth implied by the PNG's own color type and sample depth.
    pub(crate) bit_depth: BitDepth,
}

/// Decodes a PNG entry payload of any color type and sample depth.  Images
/// too large for an entry are rejected before any pixels are decoded.
pub(crate) fn read_png(data: &[u8]) -> Result<DecodedPng, FormatError> {
    read_png_checked(data, true)
}

/// Decodes a PNG image of any size, such as a source image for an entry.
pub(crate) fn read_png_image(data: &[u8]) -> Result<DecodedPng, FormatError> {
    read_png_checked(data, false)
}

fn read_png_checked(
    data: &[u8],
    entry_sized: bool,
) -> Result<DecodedPng, FormatError> {
    let mut decoder = png::Decoder::new(data);
    decoder.set_transformations(
        png::Transformations::EXPAND | png::Transformations::STRIP_16,
    );
    let png_reader = decoder.read_info().map_err(|error| {
        debug!("Malformed PNG: {}", error);
        FormatError::new(ErrorCode::MalformedPng)
    })?;
    let (width, height) = png_reader.info().size();
    if entry_sized && width >= 1 && height >= 1 {
        check_dimension(width)?;
        check_dimension(height)?;
    }
    read_png_frame(png_reader).map_err(|error| {
        debug!("Malformed PNG: {}", error);
        FormatError::new(ErrorCode::MalformedPng)
    })
}

fn read_png_frame(mut png_reader: png::Reader<&[u8]>) -> io::Result<DecodedPng> {
    let bit_depth = implied_depth(
        png_reader.info().color_type,
        png_reader.info().bit_depth,
    );
    let mut buffer = vec![0u8; png_reader.output_buffer_size()];
    let frame = match png_reader.next_frame(&mut buffer) {
        Ok(frame) => frame,
        Err(error) => invalid_data!("Malformed PNG data: {}", error),
    };
    buffer.truncate(frame.buffer_size());
    let (width, height) = (frame.width, frame.height);
    if width < 1 || height < 1 {
        invalid_data!("Invalid PNG size {}x{}", width, height);
    }
    let rgba_data = match frame.color_type {
        png::ColorType::Rgba => buffer,
        png::ColorType::Rgb => {
            let mut rgba = Vec::with_capacity((buffer.len() / 3) * 4);
            for rgb in buffer.chunks_exact(3) {
                rgba.extend_from_slice(rgb);
                rgba.push(u8::MAX);
            }
            rgba
        }
        png::ColorType::GrayscaleAlpha => {
            let mut rgba = Vec::with_capacity(buffer.len() * 2);
            for pair in buffer.chunks_exact(2) {
                rgba.extend_from_slice(&[pair[0], pair[0], pair[0], pair[1]]);
            }
            rgba
        }
        png::ColorType::Grayscale => {
            let mut rgba = Vec::with_capacity(buffer.len() * 4);
            for value in buffer.into_iter() {
                rgba.extend_from_slice(&[value, value, value, u8::MAX]);
            }
            rgba
        }
        png::ColorType::Indexed => {
            invalid_data!("Palette was not expanded");
        }
    };
    if rgba_data.len() != (width as usize) * (height as usize) * 4 {
        invalid_data!("PNG frame has an unexpected size");
    }
    Ok(DecodedPng {
        raster: Raster::from_rgba_data(width, height, &rgba_data),
        bit_depth,
    })
}

fn implied_depth(color_type: png::ColorType, depth: png::BitDepth) -> BitDepth {
    match color_type {
        png::ColorType::Indexed | png::ColorType::Grayscale => match depth {
            png::BitDepth::One => BitDepth::One,
            png::BitDepth::Two | png::BitDepth::Four => BitDepth::Four,
            png::BitDepth::Eight | png::BitDepth::Sixteen => BitDepth::Eight,
        },
        png::ColorType::Rgb => BitDepth::TwentyFour,
        png::ColorType::Rgba | png::ColorType::GrayscaleAlpha => {
            BitDepth::ThirtyTwo
        }
    }
}

//===========================================================================//

/// Encodes a quantized image as a PNG: indexed below 24 bpp, otherwise RGB
/// when every pixel is opaque and RGBA when not.
pub(crate) fn write_png(image: &QuantizedImage) -> Result<Vec<u8>, Error> {
    let mut data = Vec::<u8>::new();
    map_encoding_error(write_png_enc(image, &mut data))?;
    Ok(data)
}

/// Encodes a raster as an 8-bit RGBA PNG.
pub(crate) fn write_rgba_png<W: Write>(
    raster: &Raster,
    writer: W,
) -> Result<(), Error> {
    let mut encoder = png::Encoder::new(writer, raster.width(), raster.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let result = encoder.write_header().and_then(|mut writer| {
        writer.write_image_data(&rgba_bytes(raster.pixels()))
    });
    map_encoding_error(result)
}

fn map_encoding_error<T>(
    result: Result<T, png::EncodingError>,
) -> Result<T, Error> {
    match result {
        Ok(value) => Ok(value),
        Err(png::EncodingError::IoError(error)) => Err(Error::Io(error)),
        Err(png::EncodingError::Format(error)) => {
            debug!("PNG format error: {}", error);
            Err(FormatError::new(ErrorCode::PngEncoding).into())
        }
        Err(png::EncodingError::LimitsExceeded) => {
            debug!("PNG limits exceeded");
            Err(FormatError::new(ErrorCode::PngEncoding).into())
        }
        Err(png::EncodingError::Parameter(error)) => {
            debug!("PNG parameter error: {}", error);
            Err(FormatError::new(ErrorCode::PngEncoding).into())
        }
    }
}

fn write_png_enc<W: Write>(
    image: &QuantizedImage,
    writer: W,
) -> Result<(), png::EncodingError> {
    let width = image.width() as usize;
    let mut encoder = png::Encoder::new(writer, image.width(), image.height());
    match *image.pixels() {
        PixelData::Indexed { ref palette, ref indices } => {
            let bits_per_pixel = image.bit_depth().bits_per_pixel();
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(match bits_per_pixel {
                1 => png::BitDepth::One,
                4 => png::BitDepth::Four,
                _ => png::BitDepth::Eight,
            });
            let mut plte = Vec::with_capacity(palette.len() * 3);
            for color in palette.iter() {
                plte.extend_from_slice(&[color.r, color.g, color.b]);
            }
            encoder.set_palette(plte);
            if palette.iter().any(|color| color.a < u8::MAX) {
                let trns: Vec<u8> =
                    palette.iter().map(|color| color.a).collect();
                encoder.set_trns(trns);
            }
            let mut data = Vec::new();
            for row in indices.chunks(width) {
                data.extend_from_slice(&pack_row(row, bits_per_pixel));
            }
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&data)?;
        }
        PixelData::Direct(ref colors) => {
            encoder.set_depth(png::BitDepth::Eight);
            let has_alpha = colors.iter().any(|color| color.a < u8::MAX);
            let data = if has_alpha {
                encoder.set_color(png::ColorType::Rgba);
                rgba_bytes(colors)
            } else {
                encoder.set_color(png::ColorType::Rgb);
                let mut rgb = Vec::with_capacity(colors.len() * 3);
                for color in colors.iter() {
                    rgb.extend_from_slice(&[color.r, color.g, color.b]);
                }
                rgb
            };
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&data)?;
        }
    }
    Ok(())
}

fn rgba_bytes(colors: &[Color]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(colors.len() * 4);
    for color in colors.iter() {
        rgba.extend_from_slice(&[color.r, color.g, color.b, color.a]);
    }
    rgba
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{is_png, read_png, read_png_image, write_png, write_rgba_png};
    use crate::bitdepth::BitDepth;
    use crate::color::Color;
    use crate::convert::quantize;
    use crate::entry::Entry;
    use crate::error::ErrorCode;
    use crate::raster::Raster;

    fn sample() -> Raster {
        let mut raster = Raster::new(7, 3, Color::rgb(0, 128, 255));
        raster.set_pixel(0, 0, Color::TRANSPARENT);
        raster.set_pixel(6, 2, Color::rgb(255, 255, 0));
        raster.set_pixel(3, 1, Color::new(200, 9, 8, 7));
        raster
    }

    #[test]
    fn read_grayscale_png() {
        let input: &[u8] = b"\
            \x89PNG\r\n\x1a\n\
            \x00\x00\x00\x0dIHDR\
            \x00\x00\x00\x01\x00\x00\x00\x01\x08\x00\x00\x00\x00\
            \x3a\x7e\x9b\x55\
            \x00\x00\x00\x0aIDAT\
            \x78\x9c\x63\x70\x00\x00\x00\x42\x00\x41\
            \x29\x37\xf4\xef\
            \x00\x00\x00\x00IEND\
            \xae\x42\x60\x82";
        assert!(is_png(input));
        let decoded = read_png(input).unwrap();
        assert_eq!(decoded.bit_depth, BitDepth::Eight);
        assert_eq!(decoded.raster.pixel(0, 0), Color::rgb(0x40, 0x40, 0x40));
    }

    #[test]
    fn oversized_payload_is_invalid_dimension() {
        let mut data = Vec::new();
        write_rgba_png(&Raster::new(800, 2, Color::WHITE), &mut data).unwrap();
        let error = read_png(&data).err().unwrap();
        assert_eq!(error.code(), ErrorCode::InvalidDimension);
        assert_eq!(error.value(), Some(800));
        let decoded = read_png_image(&data).unwrap();
        assert_eq!(decoded.raster.width(), 800);
    }

    #[test]
    fn garbage_is_malformed() {
        let input: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";
        let error = read_png(input).err().unwrap();
        assert_eq!(error.code(), ErrorCode::MalformedPng);
    }

    #[test]
    fn write_then_read_each_depth() {
        let expected_depths = [
            (BitDepth::One, BitDepth::One),
            (BitDepth::Four, BitDepth::Four),
            (BitDepth::Eight, BitDepth::Eight),
            (BitDepth::TwentyFour, BitDepth::ThirtyTwo),
            (BitDepth::ThirtyTwo, BitDepth::ThirtyTwo),
        ];
        for &(depth, read_depth) in expected_depths.iter() {
            let entry = Entry::from_image(sample(), depth).unwrap();
            let image = quantize(&entry, true, depth);
            let data = write_png(&image).unwrap();
            assert!(is_png(&data));
            let decoded = read_png(&data).unwrap();
            assert_eq!(decoded.bit_depth, read_depth, "{:?}", depth);
            assert_eq!(decoded.raster, image.to_raster(), "{:?}", depth);
        }
    }

    #[test]
    fn opaque_direct_image_is_rgb() {
        let raster = Raster::new(2, 2, Color::rgb(1, 2, 3));
        let entry = Entry::from_image(raster.clone(), BitDepth::ThirtyTwo)
            .unwrap();
        let data = write_png(&quantize(&entry, true, BitDepth::ThirtyTwo))
            .unwrap();
        let decoded = read_png(&data).unwrap();
        assert_eq!(decoded.bit_depth, BitDepth::TwentyFour);
        assert_eq!(decoded.raster, raster);
    }
}

//===========================================================================//
