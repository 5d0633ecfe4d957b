use crate::bitdepth::BitDepth;
use crate::color::Color;
use crate::convert::{PixelData, QuantizedImage};
use crate::entry::check_dimension;
use crate::error::{ErrorCode, FormatError};
use crate::quantize::pack_row;
use crate::raster::Raster;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::io::{self, Read, Write};

//===========================================================================//

// The size of a BITMAPINFOHEADER struct, in bytes.
pub(crate) const BMP_HEADER_LEN: u32 = 40;

// BI_RGB, the only compression allowed inside ICO/CUR files.
const BI_RGB: u32 = 0;

//===========================================================================//

/// A DIB payload decoded to straight RGBA.
pub(crate) struct DecodedDib {
    pub(crate) raster: Raster,
    pub(crate) bit_depth: BitDepth,
}

struct DibHeader {
    width: u32,
    height_field: i32,
    bits_per_pixel: u16,
    colors_used: u32,
}

/// Decodes a DIB payload.  `directory_height` is the height given by the
/// directory record (with a zero byte read as 256); it disambiguates 32-bpp
/// DIBs stored without an AND mask.
pub(crate) fn read_dib(
    data: &[u8],
    directory_height: u32,
) -> Result<DecodedDib, FormatError> {
    let mut reader = data;
    let header = read_header(&mut reader).map_err(malformed)?;
    let bit_depth = match BitDepth::from_bits_per_pixel(header.bits_per_pixel)
    {
        Some(depth) => depth,
        None => {
            return Err(FormatError::new(ErrorCode::UnsupportedBitDepth)
                .with_value(header.bits_per_pixel));
        }
    };
    let (height, has_mask) = pixel_height(
        header.height_field,
        header.bits_per_pixel,
        directory_height,
    )
    .map_err(malformed)?;
    check_dimension(header.width)?;
    check_dimension(height)?;
    let required = payload_len(&header, bit_depth, height, has_mask);
    if (reader.len() as u64) < required {
        debug!(
            "Malformed DIB: {} bytes of color data, {} needed",
            reader.len(),
            required
        );
        return Err(FormatError::new(ErrorCode::MalformedBmp));
    }
    let raster = read_pixels(&header, bit_depth, height, has_mask, reader)
        .map_err(malformed)?;
    Ok(DecodedDib { raster, bit_depth })
}

// The number of color table entries between the header and the pixels.
fn color_table_len(header: &DibHeader, depth: BitDepth) -> u64 {
    let capacity = depth.palette_capacity() as u64;
    let colors_used = header.colors_used as u64;
    if capacity == 0 || (1..=capacity).contains(&colors_used) {
        colors_used
    } else {
        capacity
    }
}

// The number of bytes that must follow the header: color table, color rows,
// and the AND mask rows where they are read.
fn payload_len(
    header: &DibHeader,
    depth: BitDepth,
    height: u32,
    has_mask: bool,
) -> u64 {
    let width = header.width as u64;
    let bits_per_pixel = depth.bits_per_pixel() as u64;
    let row_size = (width * bits_per_pixel).div_ceil(8).div_ceil(4) * 4;
    let mut len = color_table_len(header, depth) * 4 + row_size * height as u64;
    if has_mask && depth != BitDepth::ThirtyTwo {
        len += width.div_ceil(8).div_ceil(4) * 4 * height as u64;
    }
    len
}

fn malformed(error: io::Error) -> FormatError {
    debug!("Malformed DIB: {}", error);
    FormatError::new(ErrorCode::MalformedBmp)
}

fn read_header<R: Read>(reader: &mut R) -> io::Result<DibHeader> {
    let header_size = reader.read_u32::<LittleEndian>()?;
    if header_size != BMP_HEADER_LEN {
        invalid_data!(
            "Invalid BMP header size (was {}, must be {})",
            header_size,
            BMP_HEADER_LEN
        );
    }
    let width = reader.read_i32::<LittleEndian>()?;
    if width < 1 {
        invalid_data!("Invalid BMP width (was {}, but must be at least 1)",
                      width);
    }
    let height_field = reader.read_i32::<LittleEndian>()?;
    let _planes = reader.read_u16::<LittleEndian>()?;
    let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
    let compression = reader.read_u32::<LittleEndian>()?;
    if compression != BI_RGB {
        invalid_data!("Unsupported BMP compression ({})", compression);
    }
    let _image_size = reader.read_u32::<LittleEndian>()?;
    let _horz_ppm = reader.read_i32::<LittleEndian>()?;
    let _vert_ppm = reader.read_i32::<LittleEndian>()?;
    let colors_used = reader.read_u32::<LittleEndian>()?;
    let _colors_important = reader.read_u32::<LittleEndian>()?;
    Ok(DibHeader {
        width: width as u32,
        height_field,
        bits_per_pixel,
        colors_used,
    })
}

/// Works out the pixel height of a DIB and whether an AND mask follows the
/// color data.  The height field normally counts the rows of both the color
/// data and the mask; a 32-bpp DIB whose height field equals the directory
/// height is taken to have no mask.
pub(crate) fn pixel_height(
    height_field: i32,
    bits_per_pixel: u16,
    directory_height: u32,
) -> io::Result<(u32, bool)> {
    if height_field < 1 {
        invalid_data!(
            "Invalid BMP height (was {}, but must be at least 1)",
            height_field
        );
    }
    if bits_per_pixel == 32 && height_field as u32 == directory_height {
        return Ok((height_field as u32, false));
    }
    if height_field % 2 != 0 {
        invalid_data!(
            "Invalid height field in BMP header \
             (was {}, but must be divisible by 2)",
            height_field
        );
    }
    Ok(((height_field / 2) as u32, true))
}

fn read_pixels<R: Read>(
    header: &DibHeader,
    depth: BitDepth,
    height: u32,
    has_mask: bool,
    mut reader: R,
) -> io::Result<Raster> {
    let width = header.width;
    let table_len = color_table_len(header, depth);
    let num_colors = if depth.palette_capacity() == 0 {
        // Direct-color DIBs may still carry a color table; skip over it.
        io::copy(&mut (&mut reader).take(table_len * 4), &mut io::sink())?;
        0
    } else {
        table_len as usize
    };

    // Read in the color table:
    let mut color_table = Vec::<Color>::with_capacity(num_colors);
    for _ in 0..num_colors {
        let blue = reader.read_u8()?;
        let green = reader.read_u8()?;
        let red = reader.read_u8()?;
        let _reserved = reader.read_u8()?;
        color_table.push(Color::rgb(red, green, blue));
    }
    let lookup = |index: u8| match color_table.get(index as usize) {
        Some(&color) => Ok(color),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Palette index {} out of range ({} colors)",
                index, num_colors
            ),
        )),
    };

    // Read in the color data, which is stored row by row, starting from
    // the *bottom* row:
    let num_pixels = match (width as usize).checked_mul(height as usize) {
        Some(num) => num,
        None => invalid_data!("Width * Height is too large"),
    };
    let mut pixels = vec![Color::TRANSPARENT; num_pixels];
    let bits_per_pixel = depth.bits_per_pixel() as usize;
    let row_data_size = (width as usize * bits_per_pixel).div_ceil(8);
    let mut row = vec![0u8; row_data_size.div_ceil(4) * 4];
    for row_index in 0..height {
        reader.read_exact(&mut row)?;
        let start = ((height - row_index - 1) * width) as usize;
        let out = &mut pixels[start..][..width as usize];
        match depth {
            BitDepth::One | BitDepth::Four | BitDepth::Eight => {
                let per_byte = 8 / bits_per_pixel;
                let mask = ((1u16 << bits_per_pixel) - 1) as u8;
                for (col, pixel) in out.iter_mut().enumerate() {
                    let byte = row[col / per_byte];
                    let shift = 8 - bits_per_pixel * (col % per_byte + 1);
                    *pixel = lookup((byte >> shift) & mask)?;
                }
            }
            BitDepth::TwentyFour => {
                for (pixel, bgr) in out.iter_mut().zip(row.chunks_exact(3)) {
                    *pixel = Color::rgb(bgr[2], bgr[1], bgr[0]);
                }
            }
            BitDepth::ThirtyTwo => {
                for (pixel, bgra) in out.iter_mut().zip(row.chunks_exact(4)) {
                    *pixel = Color::new(bgra[3], bgra[2], bgra[1], bgra[0]);
                }
            }
        }
    }

    // Read in the alpha mask (1 bit per pixel), which again is stored row
    // by row, starting from the *bottom* row, with each row padded to a
    // multiple of four bytes.  At 32 bpp the alpha channel wins, so any
    // mask there is left unread.
    if has_mask && depth != BitDepth::ThirtyTwo {
        let mut mask_row = vec![0u8; (width as usize).div_ceil(8).div_ceil(4) * 4];
        for row_index in 0..height {
            reader.read_exact(&mut mask_row)?;
            let start = ((height - row_index - 1) * width) as usize;
            let out = &mut pixels[start..][..width as usize];
            for (col, pixel) in out.iter_mut().enumerate() {
                if (mask_row[col / 8] >> (7 - col % 8)) & 0x1 == 1 {
                    pixel.a = 0;
                }
            }
        }
    }

    Ok(Raster::from_pixels(width, height, pixels))
}

//===========================================================================//

/// Encodes a quantized image as a DIB, followed by an AND mask below 32 bpp.
pub(crate) fn write_dib(image: &QuantizedImage) -> io::Result<Vec<u8>> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let depth = image.bit_depth();
    let bits_per_pixel = depth.bits_per_pixel();
    let has_mask = !depth.has_alpha_channel();
    let palette = image.palette();

    // Determine the size of the encoded data:
    let rgb_row_data_size = (width * bits_per_pixel as usize).div_ceil(8);
    let rgb_row_size = rgb_row_data_size.div_ceil(4) * 4;
    let mask_row_data_size = width.div_ceil(8);
    let mask_row_size = mask_row_data_size.div_ceil(4) * 4;
    let image_size = height
        * (rgb_row_size + if has_mask { mask_row_size } else { 0 });
    let data_size = BMP_HEADER_LEN as usize + 4 * palette.len() + image_size;
    let mut data = Vec::<u8>::with_capacity(data_size);

    // Write the BITMAPINFOHEADER struct:
    let height_field = if has_mask { 2 * height } else { height };
    data.write_u32::<LittleEndian>(BMP_HEADER_LEN)?;
    data.write_i32::<LittleEndian>(width as i32)?;
    data.write_i32::<LittleEndian>(height_field as i32)?;
    data.write_u16::<LittleEndian>(1)?; // planes
    data.write_u16::<LittleEndian>(bits_per_pixel)?;
    data.write_u32::<LittleEndian>(BI_RGB)?;
    data.write_u32::<LittleEndian>(image_size as u32)?;
    data.write_i32::<LittleEndian>(0)?; // horz ppm
    data.write_i32::<LittleEndian>(0)?; // vert ppm
    data.write_u32::<LittleEndian>(palette.len() as u32)?; // colors used
    data.write_u32::<LittleEndian>(0)?; // colors important
    debug_assert_eq!(data.len(), BMP_HEADER_LEN as usize);

    // Write the color table:
    for color in palette.iter() {
        data.write_all(&[color.b, color.g, color.r, 0])?;
    }

    // Write the color data:
    let rgb_row_padding = vec![0u8; rgb_row_size - rgb_row_data_size];
    for row in 0..height {
        let start = (height - row - 1) * width;
        match *image.pixels() {
            PixelData::Indexed { ref indices, .. } => {
                let row_indices = &indices[start..][..width];
                data.write_all(&pack_row(row_indices, bits_per_pixel))?;
            }
            PixelData::Direct(ref colors) => {
                for color in colors[start..][..width].iter() {
                    if depth == BitDepth::ThirtyTwo {
                        data.write_all(&[color.b, color.g, color.r, color.a])?;
                    } else {
                        data.write_all(&[color.b, color.g, color.r])?;
                    }
                }
            }
        }
        data.write_all(&rgb_row_padding)?;
    }

    // Write the mask data:
    if has_mask {
        let mask = image.alpha_mask();
        let mut mask_row = vec![0u8; mask_row_size];
        for row in 0..height {
            let y = (height - row - 1) as u32;
            for byte in mask_row.iter_mut() {
                *byte = 0;
            }
            for x in 0..width {
                let opaque = mask.map_or(true, |mask| mask.is_opaque(x as u32, y));
                if !opaque {
                    mask_row[x / 8] |= 1 << (7 - x % 8);
                }
            }
            data.write_all(&mask_row)?;
        }
    }

    debug_assert_eq!(data.len(), data_size);
    Ok(data)
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{pixel_height, read_dib, write_dib};
    use crate::bitdepth::BitDepth;
    use crate::color::Color;
    use crate::convert::quantize;
    use crate::entry::Entry;
    use crate::error::ErrorCode;
    use crate::raster::Raster;

    #[test]
    fn read_1bpp_dib() {
        let input: &[u8] = b"\
            \x28\x00\x00\x00\x02\x00\x00\x00\x04\x00\x00\x00\
            \x01\x00\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\
            \x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\
            \x00\x00\x00\x00\
            \
            \x55\x00\x55\x00\xff\xff\xff\x00\
            \
            \xc0\x00\x00\x00\
            \x40\x00\x00\x00\
            \
            \x40\x00\x00\x00\
            \x00\x00\x00\x00";
        let decoded = read_dib(input, 2).unwrap();
        assert_eq!(decoded.bit_depth, BitDepth::One);
        let rgba: &[u8] = b"\
            \x55\x00\x55\xff\xff\xff\xff\xff\
            \xff\xff\xff\xff\xff\xff\xff\x00";
        assert_eq!(decoded.raster.to_rgba_data().as_slice(), rgba);
    }

    #[test]
    fn double_height_heuristic() {
        // Masked DIBs store twice the pixel height.
        assert_eq!(pixel_height(32, 8, 16).unwrap(), (16, true));
        assert_eq!(pixel_height(32, 32, 16).unwrap(), (16, true));
        // A 32-bpp DIB whose height matches the directory has no mask.
        assert_eq!(pixel_height(16, 32, 16).unwrap(), (16, false));
        // The same height at a lower depth is still halved.
        assert_eq!(pixel_height(16, 8, 16).unwrap(), (8, true));
        // A 32-bpp DIB with an odd height matching the directory is fine.
        assert_eq!(pixel_height(5, 32, 5).unwrap(), (5, false));
        assert!(pixel_height(5, 8, 5).is_err());
        assert!(pixel_height(0, 32, 0).is_err());
        assert!(pixel_height(-4, 8, 2).is_err());
    }

    #[test]
    fn unsupported_depth_is_reported() {
        let mut input = vec![0u8; 48];
        input[0] = 40;
        input[4] = 1;
        input[8] = 2;
        input[12] = 1;
        input[14] = 16;
        let error = read_dib(&input, 1).err().unwrap();
        assert_eq!(error.code(), ErrorCode::UnsupportedBitDepth);
        assert_eq!(error.value(), Some(16));
    }

    fn header(width: u32, height_field: u32, bpp: u16, colors: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&40u32.to_le_bytes());
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height_field.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&bpp.to_le_bytes());
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&colors.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }

    #[test]
    fn oversized_dib_is_invalid_dimension() {
        let mut input = header(1000, 2000, 32, 0);
        input.extend_from_slice(&[0u8; 64]);
        let error = read_dib(&input, 0).err().unwrap();
        assert_eq!(error.code(), ErrorCode::InvalidDimension);
        assert_eq!(error.value(), Some(1000));

        let mut input = header(16, 100_000, 32, 0);
        input.extend_from_slice(&[0u8; 64]);
        let error = read_dib(&input, 16).err().unwrap();
        assert_eq!(error.code(), ErrorCode::InvalidDimension);
        assert_eq!(error.value(), Some(50_000));
    }

    #[test]
    fn short_pixel_data_is_malformed() {
        let mut input = header(2, 2, 32, 0);
        input.extend_from_slice(&[0u8; 12]);
        let error = read_dib(&input, 2).err().unwrap();
        assert_eq!(error.code(), ErrorCode::MalformedBmp);
        // A 1-bpp DIB must also carry its AND mask.
        let mut input = header(2, 4, 1, 2);
        input.extend_from_slice(&[0u8; 8 + 8 + 4]);
        let error = read_dib(&input, 2).err().unwrap();
        assert_eq!(error.code(), ErrorCode::MalformedBmp);
    }

    #[test]
    fn direct_color_table_is_skipped() {
        let mut input = header(1, 1, 32, 2);
        input.extend_from_slice(&[9, 9, 9, 9, 8, 8, 8, 8]);
        input.extend_from_slice(&[30, 20, 10, 200]);
        let decoded = read_dib(&input, 1).unwrap();
        assert_eq!(decoded.raster.pixel(0, 0), Color::new(200, 10, 20, 30));

        let mut input = header(1, 2, 24, 1);
        input.extend_from_slice(&[7, 7, 7, 7]);
        input.extend_from_slice(&[3, 2, 1, 0]);
        input.extend_from_slice(&[0, 0, 0, 0]);
        let decoded = read_dib(&input, 1).unwrap();
        assert_eq!(decoded.bit_depth, BitDepth::TwentyFour);
        assert_eq!(decoded.raster.pixel(0, 0), Color::rgb(1, 2, 3));
    }

    #[test]
    fn truncated_dib_is_malformed() {
        let input: &[u8] = b"\x28\x00\x00\x00\x02\x00\x00\x00";
        let error = read_dib(input, 2).err().unwrap();
        assert_eq!(error.code(), ErrorCode::MalformedBmp);
    }

    #[test]
    fn write_then_read_each_depth() {
        let mut raster = Raster::new(5, 3, Color::rgb(10, 200, 30));
        raster.set_pixel(0, 0, Color::TRANSPARENT);
        raster.set_pixel(4, 2, Color::rgb(250, 0, 0));
        raster.set_pixel(2, 1, Color::new(128, 1, 2, 3));
        let depths = [
            BitDepth::One,
            BitDepth::Four,
            BitDepth::Eight,
            BitDepth::TwentyFour,
            BitDepth::ThirtyTwo,
        ];
        for &depth in depths.iter() {
            let entry = Entry::from_image(raster.clone(), depth).unwrap();
            let image = quantize(&entry, false, depth);
            let data = write_dib(&image).unwrap();
            let decoded = read_dib(&data, 3).unwrap();
            assert_eq!(decoded.bit_depth, depth);
            assert_eq!(decoded.raster, image.to_raster(), "{:?}", depth);
        }
    }

    #[test]
    fn thirty_two_bpp_has_single_height() {
        let raster = Raster::new(2, 2, Color::new(7, 1, 2, 3));
        let entry = Entry::from_image(raster.clone(), BitDepth::ThirtyTwo)
            .unwrap();
        let data = write_dib(&quantize(&entry, false, BitDepth::ThirtyTwo))
            .unwrap();
        assert_eq!(&data[8..12], b"\x02\x00\x00\x00");
        assert_eq!(data.len(), 40 + 2 * 8);
        assert_eq!(read_dib(&data, 2).unwrap().raster, raster);
    }
}

//===========================================================================//
