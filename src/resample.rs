use crate::color::Color;
use crate::raster::Raster;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

/// How a source raster is resized to an entry's width and height.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ScalingFilter {
    /// Picks the source pixel under each target pixel's center.
    NearestNeighbor,
    /// Interpolates between the four nearest source pixels.
    Bilinear,
    /// Catmull-Rom interpolation over the sixteen nearest source pixels.
    Bicubic,
    /// Bilinear, widened when shrinking so that every source pixel
    /// contributes.
    HighQualityBilinear,
    /// Bicubic, widened when shrinking so that every source pixel
    /// contributes.
    HighQualityBicubic,
    /// Maps each target pixel back through an affine scale transform and
    /// samples the source bilinearly at that point.
    Matrix,
}

impl Default for ScalingFilter {
    fn default() -> ScalingFilter {
        ScalingFilter::HighQualityBicubic
    }
}

//===========================================================================//

/// Resizes `source` to `width` x `height`.  A raster that already has the
/// requested size is copied unchanged.  Panics if either dimension is zero.
pub fn resample(
    source: &Raster,
    width: u32,
    height: u32,
    filter: ScalingFilter,
) -> Raster {
    assert!(width > 0 && height > 0);
    if source.width() == width && source.height() == height {
        return source.clone();
    }
    match filter {
        ScalingFilter::NearestNeighbor => nearest(source, width, height),
        ScalingFilter::Bilinear => {
            separable(source, width, height, Kernel::Triangle, false)
        }
        ScalingFilter::Bicubic => {
            separable(source, width, height, Kernel::CatmullRom, false)
        }
        ScalingFilter::HighQualityBilinear => {
            separable(source, width, height, Kernel::Triangle, true)
        }
        ScalingFilter::HighQualityBicubic => {
            separable(source, width, height, Kernel::CatmullRom, true)
        }
        ScalingFilter::Matrix => {
            let transform = Affine::scale(
                width as f64 / source.width() as f64,
                height as f64 / source.height() as f64,
            );
            transformed(source, width, height, &transform)
        }
    }
}

//===========================================================================//

fn nearest(source: &Raster, width: u32, height: u32) -> Raster {
    let x_ratio = source.width() as f64 / width as f64;
    let y_ratio = source.height() as f64 / height as f64;
    let mut pixels = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..height {
        let src_y = (((y as f64 + 0.5) * y_ratio) as u32)
            .min(source.height() - 1);
        for x in 0..width {
            let src_x = (((x as f64 + 0.5) * x_ratio) as u32)
                .min(source.width() - 1);
            pixels.push(source.pixel(src_x, src_y));
        }
    }
    Raster::from_pixels(width, height, pixels)
}

//===========================================================================//

#[derive(Clone, Copy)]
enum Kernel {
    Triangle,
    CatmullRom,
}

impl Kernel {
    fn radius(self) -> f64 {
        match self {
            Kernel::Triangle => 1.0,
            Kernel::CatmullRom => 2.0,
        }
    }

    fn weight(self, x: f64) -> f64 {
        let x = x.abs();
        match self {
            Kernel::Triangle => {
                if x < 1.0 {
                    1.0 - x
                } else {
                    0.0
                }
            }
            Kernel::CatmullRom => {
                if x < 1.0 {
                    1.5 * x * x * x - 2.5 * x * x + 1.0
                } else if x < 2.0 {
                    -0.5 * x * x * x + 2.5 * x * x - 4.0 * x + 2.0
                } else {
                    0.0
                }
            }
        }
    }
}

// Contributions of source pixels to one target coordinate, as (source
// index, normalized weight) pairs.
type Taps = Vec<(usize, f64)>;

fn compute_taps(
    src_len: u32,
    dst_len: u32,
    kernel: Kernel,
    prefilter: bool,
) -> Vec<Taps> {
    let scale = src_len as f64 / dst_len as f64;
    let stretch = if prefilter && scale > 1.0 { scale } else { 1.0 };
    let support = kernel.radius() * stretch;
    let last = (src_len - 1) as i64;
    (0..dst_len)
        .map(|dst| {
            let center = (dst as f64 + 0.5) * scale - 0.5;
            let start = (center - support).floor() as i64;
            let end = (center + support).ceil() as i64;
            let mut taps = Taps::new();
            let mut total = 0.0;
            for src in start..=end {
                let weight = kernel.weight((src as f64 - center) / stretch);
                if weight == 0.0 {
                    continue;
                }
                let index = src.clamp(0, last) as usize;
                match taps.iter_mut().find(|tap| tap.0 == index) {
                    Some(tap) => tap.1 += weight,
                    None => taps.push((index, weight)),
                }
                total += weight;
            }
            if total == 0.0 {
                let index = center.round().clamp(0.0, last as f64) as usize;
                return vec![(index, 1.0)];
            }
            for tap in taps.iter_mut() {
                tap.1 /= total;
            }
            taps
        })
        .collect()
}

fn separable(
    source: &Raster,
    width: u32,
    height: u32,
    kernel: Kernel,
    prefilter: bool,
) -> Raster {
    let src_width = source.width() as usize;
    let src_height = source.height() as usize;
    let premultiplied: Vec<[f64; 4]> =
        source.pixels().iter().map(|&color| premultiply(color)).collect();

    let x_taps = compute_taps(source.width(), width, kernel, prefilter);
    let mut horizontal = Vec::with_capacity(width as usize * src_height);
    for row in 0..src_height {
        let row_pixels = &premultiplied[row * src_width..][..src_width];
        for taps in x_taps.iter() {
            horizontal.push(accumulate(taps, |index| row_pixels[index]));
        }
    }

    let y_taps = compute_taps(source.height(), height, kernel, prefilter);
    let width = width as usize;
    let mut pixels = Vec::with_capacity(width * height as usize);
    for taps in y_taps.iter() {
        for col in 0..width {
            let sum = accumulate(taps, |index| horizontal[index * width + col]);
            pixels.push(unpremultiply(sum));
        }
    }
    Raster::from_pixels(width as u32, height, pixels)
}

fn accumulate<F: Fn(usize) -> [f64; 4]>(taps: &[(usize, f64)], get: F) -> [f64; 4] {
    let mut sum = [0.0; 4];
    for &(index, weight) in taps.iter() {
        let value = get(index);
        for channel in 0..4 {
            sum[channel] += value[channel] * weight;
        }
    }
    sum
}

//===========================================================================//

// A 2x3 affine transform mapping source coordinates to target coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Affine {
    m11: f64,
    m12: f64,
    m21: f64,
    m22: f64,
    dx: f64,
    dy: f64,
}

impl Affine {
    fn scale(sx: f64, sy: f64) -> Affine {
        Affine { m11: sx, m12: 0.0, m21: 0.0, m22: sy, dx: 0.0, dy: 0.0 }
    }

    fn invert(&self) -> Option<Affine> {
        let det = self.m11 * self.m22 - self.m12 * self.m21;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let m11 = self.m22 / det;
        let m12 = -self.m12 / det;
        let m21 = -self.m21 / det;
        let m22 = self.m11 / det;
        Some(Affine {
            m11,
            m12,
            m21,
            m22,
            dx: -(self.dx * m11 + self.dy * m21),
            dy: -(self.dx * m12 + self.dy * m22),
        })
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.m11 + y * self.m21 + self.dx,
            x * self.m12 + y * self.m22 + self.dy,
        )
    }
}

fn transformed(
    source: &Raster,
    width: u32,
    height: u32,
    transform: &Affine,
) -> Raster {
    let inverse = match transform.invert() {
        Some(inverse) => inverse,
        None => return nearest(source, width, height),
    };
    let max_x = (source.width() - 1) as f64;
    let max_y = (source.height() - 1) as f64;
    let mut pixels = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = inverse.apply(x as f64 + 0.5, y as f64 + 0.5);
            let sx = (sx - 0.5).clamp(0.0, max_x);
            let sy = (sy - 0.5).clamp(0.0, max_y);
            let x0 = sx.floor() as u32;
            let y0 = sy.floor() as u32;
            let x1 = (x0 + 1).min(source.width() - 1);
            let y1 = (y0 + 1).min(source.height() - 1);
            let fx = sx - x0 as f64;
            let fy = sy - y0 as f64;
            let corners = [
                (premultiply(source.pixel(x0, y0)), (1.0 - fx) * (1.0 - fy)),
                (premultiply(source.pixel(x1, y0)), fx * (1.0 - fy)),
                (premultiply(source.pixel(x0, y1)), (1.0 - fx) * fy),
                (premultiply(source.pixel(x1, y1)), fx * fy),
            ];
            let mut sum = [0.0; 4];
            for &(value, weight) in corners.iter() {
                for channel in 0..4 {
                    sum[channel] += value[channel] * weight;
                }
            }
            pixels.push(unpremultiply(sum));
        }
    }
    Raster::from_pixels(width, height, pixels)
}

//===========================================================================//

fn premultiply(color: Color) -> [f64; 4] {
    let alpha = color.a as f64 / 255.0;
    [
        color.r as f64 * alpha,
        color.g as f64 * alpha,
        color.b as f64 * alpha,
        color.a as f64,
    ]
}

fn unpremultiply(value: [f64; 4]) -> Color {
    let alpha = value[3].clamp(0.0, 255.0);
    let a = alpha.round() as u8;
    if a == 0 {
        return Color::TRANSPARENT;
    }
    let channel = |v: f64| (v * 255.0 / alpha).round().clamp(0.0, 255.0) as u8;
    Color::new(a, channel(value[0]), channel(value[1]), channel(value[2]))
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{resample, Affine, ScalingFilter};
    use crate::color::Color;
    use crate::raster::Raster;

    const ALL_FILTERS: &[ScalingFilter] = &[
        ScalingFilter::NearestNeighbor,
        ScalingFilter::Bilinear,
        ScalingFilter::Bicubic,
        ScalingFilter::HighQualityBilinear,
        ScalingFilter::HighQualityBicubic,
        ScalingFilter::Matrix,
    ];

    fn checkerboard(size: u32) -> Raster {
        let mut raster = Raster::new(size, size, Color::WHITE);
        for y in 0..size {
            for x in 0..size {
                if (x + y) % 2 == 1 {
                    raster.set_pixel(x, y, Color::BLACK);
                }
            }
        }
        raster
    }

    #[test]
    fn same_size_is_unchanged() {
        let raster = checkerboard(5);
        for &filter in ALL_FILTERS.iter() {
            assert_eq!(resample(&raster, 5, 5, filter), raster);
        }
    }

    #[test]
    fn solid_color_stays_solid() {
        let color = Color::new(200, 10, 120, 240);
        let raster = Raster::new(7, 5, color);
        for &filter in ALL_FILTERS.iter() {
            let scaled = resample(&raster, 16, 3, filter);
            assert_eq!(scaled.width(), 16);
            assert_eq!(scaled.height(), 3);
            assert!(
                scaled.pixels().iter().all(|&pixel| pixel == color),
                "{:?} changed a solid color",
                filter
            );
        }
    }

    #[test]
    fn nearest_neighbor_doubles_pixels() {
        let raster = checkerboard(2);
        let scaled = resample(&raster, 4, 4, ScalingFilter::NearestNeighbor);
        assert_eq!(scaled.pixel(0, 0), Color::WHITE);
        assert_eq!(scaled.pixel(1, 1), Color::WHITE);
        assert_eq!(scaled.pixel(2, 0), Color::BLACK);
        assert_eq!(scaled.pixel(3, 1), Color::BLACK);
    }

    #[test]
    fn high_quality_shrink_averages() {
        let raster = checkerboard(8);
        let scaled =
            resample(&raster, 1, 1, ScalingFilter::HighQualityBilinear);
        let gray = scaled.pixel(0, 0);
        assert_eq!(gray.a, 255);
        assert!(gray.r > 100 && gray.r < 155, "got {:?}", gray);
    }

    #[test]
    fn transparent_pixels_do_not_bleed_color() {
        let mut raster = Raster::new(2, 1, Color::TRANSPARENT);
        raster.set_pixel(0, 0, Color::rgb(255, 0, 0));
        raster.set_pixel(1, 0, Color::new(0, 0, 255, 0));
        let scaled = resample(&raster, 3, 1, ScalingFilter::Bilinear);
        let middle = scaled.pixel(1, 0);
        assert_eq!((middle.r, middle.g, middle.b), (255, 0, 0));
        assert!(middle.a > 0 && middle.a < 255);
    }

    #[test]
    fn affine_inverse() {
        let transform = Affine::scale(2.0, 4.0);
        let inverse = transform.invert().unwrap();
        assert_eq!(inverse.apply(8.0, 8.0), (4.0, 2.0));
        assert_eq!(Affine::scale(0.0, 1.0).invert(), None);
    }
}

//===========================================================================//
