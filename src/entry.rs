use crate::bitdepth::BitDepth;
use crate::convert::{self, QuantizedImage};
use crate::error::{ErrorCode, FormatError};
use crate::raster::Raster;
use crate::resample::ScalingFilter;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

//===========================================================================//

/// The smallest width or height an entry may have.
pub const MIN_DIMENSION: u32 = 1;
/// The largest width or height an entry may have.
pub const MAX_DIMENSION: u32 = 768;

//===========================================================================//

/// The identity of an entry within a container.  No two entries in one
/// container share a key.
///
/// Keys order by bit depth (deepest first), then height (tallest first),
/// then width (widest first); this is the order entries are written in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct EntryKey {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color depth.
    pub bit_depth: BitDepth,
}

impl EntryKey {
    /// Creates a key.
    pub fn new(width: u32, height: u32, bit_depth: BitDepth) -> EntryKey {
        EntryKey { width, height, bit_depth }
    }

    /// Returns true if both dimensions are within `MIN_DIMENSION` and
    /// `MAX_DIMENSION`.
    pub fn is_valid(&self) -> bool {
        is_valid_dimension(self.width) && is_valid_dimension(self.height)
    }
}

impl Ord for EntryKey {
    fn cmp(&self, other: &EntryKey) -> Ordering {
        other
            .bit_depth
            .cmp(&self.bit_depth)
            .then(other.height.cmp(&self.height))
            .then(other.width.cmp(&self.width))
    }
}

impl PartialOrd for EntryKey {
    fn partial_cmp(&self, other: &EntryKey) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn is_valid_dimension(value: u32) -> bool {
    (MIN_DIMENSION..=MAX_DIMENSION).contains(&value)
}

//===========================================================================//

/// One image variant of an icon or cursor: a source raster plus the size,
/// depth and encoding it is stored at.
#[derive(Clone, Debug)]
pub struct Entry {
    base_image: Raster,
    alpha_image: Option<Raster>,
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    hotspot: (u16, u16),
    alpha_threshold: u8,
    scaling_filter: ScalingFilter,
    is_png: bool,
    cache: Option<QuantizedImage>,
}

impl Entry {
    /// Creates an entry that stores `base_image` scaled to `width` x
    /// `height` at the given depth.  Returns an `InvalidDimension` error if
    /// either dimension is outside `MIN_DIMENSION..=MAX_DIMENSION`.
    pub fn new(
        base_image: Raster,
        width: u32,
        height: u32,
        bit_depth: BitDepth,
    ) -> Result<Entry, FormatError> {
        check_dimension(width)?;
        check_dimension(height)?;
        Ok(Entry {
            base_image,
            alpha_image: None,
            width,
            height,
            bit_depth,
            hotspot: (0, 0),
            alpha_threshold: bit_depth.default_alpha_threshold(),
            scaling_filter: ScalingFilter::default(),
            is_png: false,
            cache: None,
        })
    }

    /// Creates an entry that stores `base_image` at its own size.
    pub fn from_image(
        base_image: Raster,
        bit_depth: BitDepth,
    ) -> Result<Entry, FormatError> {
        let (width, height) = (base_image.width(), base_image.height());
        Entry::new(base_image, width, height, bit_depth)
    }

    /// Returns the source raster.
    pub fn base_image(&self) -> &Raster {
        &self.base_image
    }

    /// Replaces the source raster.
    pub fn set_base_image(&mut self, image: Raster) {
        self.base_image = image;
        self.cache = None;
    }

    /// Returns the explicit alpha-mask source, if any.  White pixels of this
    /// raster mark opaque pixels; black or transparent ones mark transparent
    /// pixels.
    pub fn alpha_image(&self) -> Option<&Raster> {
        self.alpha_image.as_ref()
    }

    /// Sets or clears the explicit alpha-mask source.
    pub fn set_alpha_image(&mut self, image: Option<Raster>) {
        self.alpha_image = image;
        self.cache = None;
    }

    /// Returns the stored width, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the stored height, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Changes the stored size.  The hotspot is clamped to the new size.
    pub fn set_size(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<(), FormatError> {
        check_dimension(width)?;
        check_dimension(height)?;
        self.width = width;
        self.height = height;
        let (x, y) = self.hotspot;
        self.set_hotspot(x, y);
        self.cache = None;
        Ok(())
    }

    /// Returns the stored color depth.
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Changes the stored color depth.  The alpha threshold is left alone.
    pub fn set_bit_depth(&mut self, bit_depth: BitDepth) {
        self.bit_depth = bit_depth;
        self.cache = None;
    }

    /// Returns the key identifying this entry within a container.
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.width, self.height, self.bit_depth)
    }

    /// Returns the cursor hotspot (pixels right from the left edge, and
    /// pixels down from the top edge).  Ignored for icons.
    pub fn hotspot(&self) -> (u16, u16) {
        self.hotspot
    }

    /// Sets the cursor hotspot, clamping each coordinate to the entry's
    /// width and height.
    pub fn set_hotspot(&mut self, x: u16, y: u16) {
        let clamp = |value: u16, max: u32| (value as u32).min(max) as u16;
        self.hotspot = (clamp(x, self.width), clamp(y, self.height));
    }

    /// Returns the alpha value at or above which a pixel counts as opaque
    /// when a 1-bit mask has to be derived.
    pub fn alpha_threshold(&self) -> u8 {
        self.alpha_threshold
    }

    /// Sets the alpha threshold.
    pub fn set_alpha_threshold(&mut self, threshold: u8) {
        self.alpha_threshold = threshold;
        self.cache = None;
    }

    /// Returns the filter used to scale the source raster.
    pub fn scaling_filter(&self) -> ScalingFilter {
        self.scaling_filter
    }

    /// Sets the filter used to scale the source raster.
    pub fn set_scaling_filter(&mut self, filter: ScalingFilter) {
        self.scaling_filter = filter;
        self.cache = None;
    }

    /// Returns true if this entry prefers to be stored as PNG rather than
    /// as a DIB.
    pub fn is_png(&self) -> bool {
        self.is_png
    }

    /// Sets whether this entry prefers to be stored as PNG.
    pub fn set_png(&mut self, is_png: bool) {
        self.is_png = is_png;
    }

    /// Returns true if this entry will be stored as PNG: either it prefers
    /// PNG, or it is too large for a DIB at its depth.
    pub fn effective_is_png(&self) -> bool {
        let limit = self.bit_depth.max_bmp_dimension();
        self.is_png || self.width > limit || self.height > limit
    }

    /// Returns true if a quantized result is cached.
    pub fn is_quantized(&self) -> bool {
        self.cache.is_some()
    }

    /// Returns the pixels this entry will be stored with, in its own depth
    /// and encoding.  The result is cached until a setting that affects it
    /// changes.
    pub fn quantize(&mut self) -> QuantizedImage {
        let is_png = self.effective_is_png();
        let bit_depth = self.bit_depth;
        self.quantize_as(is_png, bit_depth)
    }

    /// Like `quantize`, but for an explicitly chosen encoding and depth.
    pub fn quantize_as(
        &mut self,
        is_png: bool,
        bit_depth: BitDepth,
    ) -> QuantizedImage {
        if let Some(ref cached) = self.cache {
            if cached.is_png() == is_png && cached.bit_depth() == bit_depth {
                return cached.clone();
            }
        }
        let quantized = convert::quantize(self, is_png, bit_depth);
        self.cache = Some(quantized.clone());
        quantized
    }
}

pub(crate) fn check_dimension(value: u32) -> Result<(), FormatError> {
    if is_valid_dimension(value) {
        Ok(())
    } else {
        Err(FormatError::new(ErrorCode::InvalidDimension).with_value(value))
    }
}

//===========================================================================//


//===========================================================================//
