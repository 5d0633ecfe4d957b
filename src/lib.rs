//! A library for reading, writing and quantizing ICO and CUR files.
//!
//! An ICO or CUR file holds several variants of one image, each stored at
//! its own size and color depth.  Here every variant is an [`Entry`]: a
//! source [`Raster`] plus the width, height and [`BitDepth`] it should be
//! stored at.  When a file is written, each entry's source raster is scaled,
//! its transparency is reduced to a 1-bit mask where the format needs one,
//! and its colors are reduced to a palette at indexed depths.  The result
//! is stored either as a PNG stream or as a BMP-style DIB.
//!
//! # Examples
//!
//! ## Reading an icon file
//!
//! ```no_run
//! // Read an ICO file from disk:
//! let file = std::fs::File::open("path/to/file.ico").unwrap();
//! let icon = icofile::IconFile::read(file).unwrap();
//! // Print the size of each entry in the file:
//! for entry in icon.entries() {
//!     println!("{}x{} at {} bpp", entry.width(), entry.height(),
//!              entry.bit_depth().bits_per_pixel());
//! }
//! // Save the first entry's pixels as a PNG, via the png crate:
//! let entry = icon.entries().get(0).unwrap();
//! let raster = entry.base_image();
//! let out = std::fs::File::create("/tmp/icon.png").unwrap();
//! let mut encoder = png::Encoder::new(out, raster.width(), raster.height());
//! encoder.set_color(png::ColorType::Rgba);
//! encoder.set_depth(png::BitDepth::Eight);
//! let mut writer = encoder.write_header().unwrap();
//! writer.write_image_data(&raster.to_rgba_data()).unwrap();
//! ```
//!
//! ## Creating an icon file
//!
//! ```
//! use icofile::{BitDepth, Color, Entry, IconFile, Raster, ResourceType};
//! // Create a new, empty icon file:
//! let mut icon = IconFile::new(ResourceType::Icon);
//! // Add a full-color entry and a 16-color entry made from one image:
//! let raster = Raster::new(32, 32, Color::rgb(200, 40, 40));
//! let full = Entry::from_image(raster.clone(), BitDepth::ThirtyTwo).unwrap();
//! icon.entries_mut().push(full).unwrap();
//! let small = Entry::new(raster, 16, 16, BitDepth::Four).unwrap();
//! icon.entries_mut().push(small).unwrap();
//! // Write the file out:
//! let mut output = Vec::<u8>::new();
//! icon.write(&mut output).unwrap();
//! assert_eq!(&output[4..6], b"\x02\x00");
//! ```
//!
//! ## Reading a damaged file
//!
//! ```no_run
//! let file = std::fs::File::open("path/to/file.ico").unwrap();
//! let (icon, problems) = icofile::IconFile::read_lenient(file).unwrap();
//! for problem in problems.iter() {
//!     eprintln!("skipped: {}", problem);
//! }
//! println!("{} usable entries", icon.entries().len());
//! ```

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod bitdepth;
mod collection;
mod color;
mod convert;
mod dib;
mod entry;
mod error;
mod file;
mod pngio;
mod quantize;
mod raster;
mod resample;
mod restype;

pub use crate::bitdepth::BitDepth;
pub use crate::collection::{EntryCollection, MAX_ENTRIES};
pub use crate::color::Color;
pub use crate::convert::{quantize, AlphaMask, PixelData, QuantizedImage};
pub use crate::entry::{Entry, EntryKey, MAX_DIMENSION, MIN_DIMENSION};
pub use crate::error::{Error, ErrorCode, FormatError, Result};
pub use crate::file::IconFile;
pub use crate::raster::Raster;
pub use crate::resample::{resample, ScalingFilter};
pub use crate::restype::ResourceType;
