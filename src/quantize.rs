//! Palette reduction.
//!
//! Colors are reduced with Xiaolin Wu's quantizer: the opaque pixels are
//! binned into a 32x32x32 RGB histogram, and the color cube is repeatedly
//! split along whichever plane most reduces the weighted sum of squared
//! errors, until there are as many boxes as palette slots.  The mean of
//! each box becomes a palette color.

use crate::color::Color;
use log::trace;
use std::collections::HashMap;
use std::ops::{Add, AddAssign, Sub};

//===========================================================================//

// Histogram side length: 32 levels per channel plus a zero border for the
// cumulative moment tables.
const SIDE: usize = 33;
const TABLE_LEN: usize = SIDE * SIDE * SIDE;

//===========================================================================//

/// Pixels expressed as indices into a palette.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Palettized {
    pub(crate) palette: Vec<Color>,
    pub(crate) indices: Vec<u8>,
}

/// Reduces `pixels` to at most `max_colors` colors (which must be between 1
/// and 256).  Pixels with an alpha below `alpha_threshold`, or with zero
/// alpha, all share a single `Color::TRANSPARENT` slot and do not take part
/// in clustering.  The returned palette holds only colors that some pixel
/// uses.
pub(crate) fn reduce(
    pixels: &[Color],
    max_colors: usize,
    alpha_threshold: u8,
) -> Palettized {
    debug_assert!(max_colors >= 1 && max_colors <= 256);
    let is_transparent = |color: Color| color.a == 0 || color.a < alpha_threshold;
    if let Some(exact) = exact_palette(pixels, max_colors, &is_transparent) {
        trace!("Exact palette with {} colors", exact.palette.len());
        return exact;
    }
    let has_transparent = pixels.iter().any(|&color| is_transparent(color));
    let budget = (max_colors - has_transparent as usize).max(1);
    let mut moments = Moments::new();
    for &color in pixels.iter() {
        if !is_transparent(color) {
            moments.add(color);
        }
    }
    moments.cumulate();
    let mut palette = moments.palette(budget);
    let transparent_index = if has_transparent {
        palette.push(Color::TRANSPARENT);
        Some((palette.len() - 1) as u8)
    } else {
        None
    };
    trace!(
        "Clustered palette with {} of {} colors",
        palette.len(),
        max_colors
    );

    let opaque_len = palette.len() - has_transparent as usize;
    let mut cache = HashMap::<Color, u8>::new();
    let indices = pixels
        .iter()
        .map(|&color| match transparent_index {
            Some(index) if is_transparent(color) => index,
            _ => *cache.entry(color).or_insert_with(|| {
                color
                    .with_alpha(u8::MAX)
                    .nearest_index(&palette[..opaque_len])
                    .unwrap_or(0) as u8
            }),
        })
        .collect();
    compact(Palettized { palette, indices })
}

/// Builds a palette holding every distinct color, if there are few enough.
fn exact_palette<F: Fn(Color) -> bool>(
    pixels: &[Color],
    max_colors: usize,
    is_transparent: &F,
) -> Option<Palettized> {
    let mut palette = Vec::<Color>::new();
    let mut lookup = HashMap::<Color, u8>::new();
    let mut indices = Vec::with_capacity(pixels.len());
    for &color in pixels.iter() {
        let key = if is_transparent(color) { Color::TRANSPARENT } else { color };
        let index = match lookup.get(&key) {
            Some(&index) => index,
            None => {
                if palette.len() >= max_colors {
                    return None;
                }
                let index = palette.len() as u8;
                palette.push(key);
                lookup.insert(key, index);
                index
            }
        };
        indices.push(index);
    }
    Some(Palettized { palette, indices })
}

/// Drops palette entries that no pixel refers to, keeping the order of the
/// rest.
fn compact(image: Palettized) -> Palettized {
    let mut used = vec![false; image.palette.len()];
    for &index in image.indices.iter() {
        used[index as usize] = true;
    }
    if used.iter().all(|&u| u) {
        return image;
    }
    let mut remap = vec![0u8; image.palette.len()];
    let mut palette = Vec::with_capacity(image.palette.len());
    for (old, &color) in image.palette.iter().enumerate() {
        if used[old] {
            remap[old] = palette.len() as u8;
            palette.push(color);
        }
    }
    let indices =
        image.indices.iter().map(|&index| remap[index as usize]).collect();
    Palettized { palette, indices }
}

/// Packs one row of palette indices at 1, 4 or 8 bits per pixel, most
/// significant bits first.  The last byte is zero-padded.
pub(crate) fn pack_row(indices: &[u8], bits_per_pixel: u16) -> Vec<u8> {
    match bits_per_pixel {
        8 => indices.to_vec(),
        1 | 4 => {
            let bits = bits_per_pixel as usize;
            let per_byte = 8 / bits;
            let mut packed = vec![0u8; indices.len().div_ceil(per_byte)];
            for (col, &index) in indices.iter().enumerate() {
                let shift = 8 - bits * (col % per_byte + 1);
                packed[col / per_byte] |= index << shift;
            }
            packed
        }
        _ => panic!("Can't pack indices at {} bits per pixel", bits_per_pixel),
    }
}

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Axis {
    Red,
    Green,
    Blue,
}

// A box in the histogram; lower bounds exclusive, upper bounds inclusive.
#[derive(Clone, Copy, Debug, Default)]
struct ColorBox {
    r0: usize,
    r1: usize,
    g0: usize,
    g1: usize,
    b0: usize,
    b1: usize,
}

impl ColorBox {
    fn whole() -> ColorBox {
        ColorBox { r0: 0, r1: SIDE - 1, g0: 0, g1: SIDE - 1, b0: 0, b1: SIDE - 1 }
    }

    fn volume(&self) -> usize {
        (self.r1 - self.r0) * (self.g1 - self.g0) * (self.b1 - self.b0)
    }
}

fn at(r: usize, g: usize, b: usize) -> usize {
    (r * SIDE + g) * SIDE + b
}

fn volume<T>(cube: &ColorBox, table: &[T]) -> T
where
    T: Copy + Add<Output = T> + Sub<Output = T>,
{
    table[at(cube.r1, cube.g1, cube.b1)] - table[at(cube.r1, cube.g1, cube.b0)]
        - table[at(cube.r1, cube.g0, cube.b1)]
        + table[at(cube.r1, cube.g0, cube.b0)]
        - table[at(cube.r0, cube.g1, cube.b1)]
        + table[at(cube.r0, cube.g1, cube.b0)]
        + table[at(cube.r0, cube.g0, cube.b1)]
        - table[at(cube.r0, cube.g0, cube.b0)]
}

// The part of `volume` that depends on the box's lower bound along `axis`.
fn bottom(cube: &ColorBox, axis: Axis, table: &[i64]) -> i64 {
    let c = cube;
    match axis {
        Axis::Red => {
            -table[at(c.r0, c.g1, c.b1)] + table[at(c.r0, c.g1, c.b0)]
                + table[at(c.r0, c.g0, c.b1)]
                - table[at(c.r0, c.g0, c.b0)]
        }
        Axis::Green => {
            -table[at(c.r1, c.g0, c.b1)] + table[at(c.r1, c.g0, c.b0)]
                + table[at(c.r0, c.g0, c.b1)]
                - table[at(c.r0, c.g0, c.b0)]
        }
        Axis::Blue => {
            -table[at(c.r1, c.g1, c.b0)] + table[at(c.r1, c.g0, c.b0)]
                + table[at(c.r0, c.g1, c.b0)]
                - table[at(c.r0, c.g0, c.b0)]
        }
    }
}

// The part of `volume` that depends on the box's upper bound along `axis`,
// with that bound moved to `pos`.
fn top(cube: &ColorBox, axis: Axis, pos: usize, table: &[i64]) -> i64 {
    let c = cube;
    match axis {
        Axis::Red => {
            table[at(pos, c.g1, c.b1)] - table[at(pos, c.g1, c.b0)]
                - table[at(pos, c.g0, c.b1)]
                + table[at(pos, c.g0, c.b0)]
        }
        Axis::Green => {
            table[at(c.r1, pos, c.b1)] - table[at(c.r1, pos, c.b0)]
                - table[at(c.r0, pos, c.b1)]
                + table[at(c.r0, pos, c.b0)]
        }
        Axis::Blue => {
            table[at(c.r1, c.g1, pos)] - table[at(c.r1, c.g0, pos)]
                - table[at(c.r0, c.g1, pos)]
                + table[at(c.r0, c.g0, pos)]
        }
    }
}

fn cumulate<T>(table: &mut [T])
where
    T: Copy + Default + Add<Output = T> + AddAssign,
{
    for r in 1..SIDE {
        let mut area = [T::default(); SIDE];
        for g in 1..SIDE {
            let mut line = T::default();
            for b in 1..SIDE {
                line += table[at(r, g, b)];
                area[b] += line;
                table[at(r, g, b)] = table[at(r - 1, g, b)] + area[b];
            }
        }
    }
}

//===========================================================================//

// Histogram moments: pixel counts, per-channel sums and sums of squares.
struct Moments {
    weight: Vec<i64>,
    red: Vec<i64>,
    green: Vec<i64>,
    blue: Vec<i64>,
    squares: Vec<f64>,
}

impl Moments {
    fn new() -> Moments {
        Moments {
            weight: vec![0; TABLE_LEN],
            red: vec![0; TABLE_LEN],
            green: vec![0; TABLE_LEN],
            blue: vec![0; TABLE_LEN],
            squares: vec![0.0; TABLE_LEN],
        }
    }

    fn add(&mut self, color: Color) {
        let index = at(
            (color.r >> 3) as usize + 1,
            (color.g >> 3) as usize + 1,
            (color.b >> 3) as usize + 1,
        );
        let (r, g, b) = (color.r as i64, color.g as i64, color.b as i64);
        self.weight[index] += 1;
        self.red[index] += r;
        self.green[index] += g;
        self.blue[index] += b;
        self.squares[index] += (r * r + g * g + b * b) as f64;
    }

    fn cumulate(&mut self) {
        cumulate(&mut self.weight);
        cumulate(&mut self.red);
        cumulate(&mut self.green);
        cumulate(&mut self.blue);
        cumulate(&mut self.squares);
    }

    // Weighted variance of the colors inside `cube`.
    fn variance(&self, cube: &ColorBox) -> f64 {
        let weight = volume(cube, &self.weight);
        if weight == 0 {
            return 0.0;
        }
        let r = volume(cube, &self.red) as f64;
        let g = volume(cube, &self.green) as f64;
        let b = volume(cube, &self.blue) as f64;
        volume(cube, &self.squares) - (r * r + g * g + b * b) / weight as f64
    }

    // Finds the cut along `axis` that maximizes the summed squared means of
    // the two halves.  Returns that sum and the cut position.
    fn maximize(
        &self,
        cube: &ColorBox,
        axis: Axis,
        first: usize,
        last: usize,
        whole: [i64; 4],
    ) -> (f64, Option<usize>) {
        let base = [
            bottom(cube, axis, &self.red),
            bottom(cube, axis, &self.green),
            bottom(cube, axis, &self.blue),
            bottom(cube, axis, &self.weight),
        ];
        let mut best = 0.0;
        let mut cut = None;
        for pos in first..last {
            let half = [
                base[0] + top(cube, axis, pos, &self.red),
                base[1] + top(cube, axis, pos, &self.green),
                base[2] + top(cube, axis, pos, &self.blue),
                base[3] + top(cube, axis, pos, &self.weight),
            ];
            if half[3] == 0 || half[3] == whole[3] {
                continue;
            }
            let rest = [
                whole[0] - half[0],
                whole[1] - half[1],
                whole[2] - half[2],
                whole[3] - half[3],
            ];
            let score = |m: [i64; 4]| {
                let (r, g, b) = (m[0] as f64, m[1] as f64, m[2] as f64);
                (r * r + g * g + b * b) / m[3] as f64
            };
            let total = score(half) + score(rest);
            if total > best {
                best = total;
                cut = Some(pos);
            }
        }
        (best, cut)
    }

    // Splits `first` in two, storing the upper part in `second`.  Returns
    // false if the box can't be split.
    fn cut(&self, first: &mut ColorBox, second: &mut ColorBox) -> bool {
        let whole = [
            volume(first, &self.red),
            volume(first, &self.green),
            volume(first, &self.blue),
            volume(first, &self.weight),
        ];
        let (max_r, cut_r) =
            self.maximize(first, Axis::Red, first.r0 + 1, first.r1, whole);
        let (max_g, cut_g) =
            self.maximize(first, Axis::Green, first.g0 + 1, first.g1, whole);
        let (max_b, cut_b) =
            self.maximize(first, Axis::Blue, first.b0 + 1, first.b1, whole);
        let (axis, cut) = if max_r >= max_g && max_r >= max_b {
            (Axis::Red, cut_r)
        } else if max_g >= max_r && max_g >= max_b {
            (Axis::Green, cut_g)
        } else {
            (Axis::Blue, cut_b)
        };
        let cut = match cut {
            Some(cut) => cut,
            None => return false,
        };
        *second = *first;
        match axis {
            Axis::Red => {
                second.r0 = cut;
                first.r1 = cut;
            }
            Axis::Green => {
                second.g0 = cut;
                first.g1 = cut;
            }
            Axis::Blue => {
                second.b0 = cut;
                first.b1 = cut;
            }
        }
        true
    }

    // Partitions the histogram into at most `max_colors` boxes and returns
    // the mean color of each non-empty box.
    fn palette(&self, max_colors: usize) -> Vec<Color> {
        let mut cubes = vec![ColorBox::whole()];
        let mut variances = vec![0.0f64];
        let mut next = 0;
        while cubes.len() < max_colors {
            let mut first = cubes[next];
            let mut second = ColorBox::default();
            if self.cut(&mut first, &mut second) {
                cubes[next] = first;
                variances[next] = if first.volume() > 1 {
                    self.variance(&first)
                } else {
                    0.0
                };
                variances.push(if second.volume() > 1 {
                    self.variance(&second)
                } else {
                    0.0
                });
                cubes.push(second);
            } else {
                variances[next] = 0.0;
            }
            let mut best = 0;
            for (index, &variance) in variances.iter().enumerate() {
                if variance > variances[best] {
                    best = index;
                }
            }
            if variances[best] <= 0.0 {
                break;
            }
            next = best;
        }
        cubes
            .iter()
            .filter_map(|cube| {
                let weight = volume(cube, &self.weight);
                if weight == 0 {
                    return None;
                }
                let mean = |sum: i64| {
                    ((sum as f64 / weight as f64).round() as i64).clamp(0, 255)
                        as u8
                };
                Some(Color::rgb(
                    mean(volume(cube, &self.red)),
                    mean(volume(cube, &self.green)),
                    mean(volume(cube, &self.blue)),
                ))
            })
            .collect()
    }
}

//===========================================================================//


//===========================================================================//
