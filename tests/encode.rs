extern crate icofile;

use icofile::{
    BitDepth, Color, Entry, EntryKey, IconFile, Raster, ResourceType,
};
use std::io::Cursor;

//===========================================================================//

#[test]
fn encode_32bpp_bmp_is_pixel_exact() {
    let raster = gradient(24, 20);
    let read_back = round_trip(&single_entry_icon(
        Entry::from_image(raster.clone(), BitDepth::ThirtyTwo).unwrap(),
    ));
    let entry = read_back.entries().get(0).unwrap();
    assert!(!entry.is_png());
    assert_eq!(entry.key(), EntryKey::new(24, 20, BitDepth::ThirtyTwo));
    assert_eq!(entry.base_image(), &raster);
}

#[test]
fn encode_large_32bpp_entry_as_png() {
    // Above 96 pixels, 32-bpp entries are always stored as PNG.
    let raster = gradient(128, 100);
    let read_back = round_trip(&single_entry_icon(
        Entry::from_image(raster.clone(), BitDepth::ThirtyTwo).unwrap(),
    ));
    let entry = read_back.entries().get(0).unwrap();
    assert!(entry.is_png());
    assert_eq!(entry.key(), EntryKey::new(128, 100, BitDepth::ThirtyTwo));
    assert_eq!(entry.base_image(), &raster);
}

#[test]
fn encode_256px_entry_with_zero_size_bytes() {
    let raster = Raster::new(256, 256, Color::new(90, 1, 2, 3));
    let mut icon = single_entry_icon(
        Entry::from_image(raster.clone(), BitDepth::ThirtyTwo).unwrap(),
    );
    let mut output = Vec::<u8>::new();
    icon.write(&mut output).unwrap();
    assert_eq!(&output[6..8], b"\x00\x00");
    let read_back = IconFile::read(Cursor::new(output)).unwrap();
    let entry = read_back.entries().get(0).unwrap();
    assert_eq!((entry.width(), entry.height()), (256, 256));
    assert_eq!(entry.base_image(), &raster);
}

#[test]
fn encode_lower_depths_as_bmp() {
    let raster = gradient(20, 18);
    let depths =
        [BitDepth::One, BitDepth::Four, BitDepth::Eight, BitDepth::TwentyFour];
    for &depth in depths.iter() {
        let entry = Entry::from_image(raster.clone(), depth).unwrap();
        let expected = icofile::quantize(&entry, false, depth);
        assert!(expected.palette().len() as u64 <= depth.max_colors());
        let read_back = round_trip(&single_entry_icon(entry));
        let loaded = read_back.entries().get(0).unwrap();
        assert!(!loaded.is_png());
        assert_eq!(loaded.key(), EntryKey::new(20, 18, depth));
        assert_eq!(loaded.base_image(), &expected.to_raster(), "{:?}", depth);
    }
}

#[test]
fn encode_lower_depths_as_png() {
    let raster = gradient(20, 18);
    let depths = [BitDepth::One, BitDepth::Four, BitDepth::Eight];
    for &depth in depths.iter() {
        let mut entry = Entry::from_image(raster.clone(), depth).unwrap();
        entry.set_png(true);
        let expected = icofile::quantize(&entry, true, depth);
        let read_back = round_trip(&single_entry_icon(entry));
        let loaded = read_back.entries().get(0).unwrap();
        assert!(loaded.is_png());
        assert_eq!(loaded.bit_depth(), depth);
        assert_eq!(loaded.base_image(), &expected.to_raster(), "{:?}", depth);
    }
}

#[test]
fn encode_scaled_entries() {
    let source = gradient(64, 64);
    let mut icon = IconFile::new(ResourceType::Icon);
    for &size in [16, 32, 48].iter() {
        let entry = Entry::new(source.clone(), size, size, BitDepth::Eight)
            .unwrap();
        icon.entries_mut().push(entry).unwrap();
    }
    let read_back = round_trip(&icon);
    let sizes: Vec<u32> =
        read_back.entries().iter().map(|entry| entry.width()).collect();
    assert_eq!(sizes, vec![48, 32, 16]);
}

//===========================================================================//

#[test]
fn encode_entries_in_key_order() {
    let raster = Raster::new(8, 8, Color::rgb(5, 6, 7));
    let mut icon = IconFile::new(ResourceType::Icon);
    let keys = [
        (16, 16, BitDepth::Eight),
        (32, 32, BitDepth::ThirtyTwo),
        (16, 16, BitDepth::ThirtyTwo),
        (32, 32, BitDepth::Four),
        (48, 24, BitDepth::Four),
    ];
    for &(width, height, depth) in keys.iter() {
        let entry = Entry::new(raster.clone(), width, height, depth).unwrap();
        icon.entries_mut().push(entry).unwrap();
    }
    let before = icon.entries().keys();
    let mut output = Vec::<u8>::new();
    icon.write(&mut output).unwrap();
    assert_eq!(icon.entries().keys(), before);
    let read_back = IconFile::read(Cursor::new(output)).unwrap();
    assert_eq!(
        read_back.entries().keys(),
        vec![
            EntryKey::new(32, 32, BitDepth::ThirtyTwo),
            EntryKey::new(16, 16, BitDepth::ThirtyTwo),
            EntryKey::new(16, 16, BitDepth::Eight),
            EntryKey::new(32, 32, BitDepth::Four),
            EntryKey::new(48, 24, BitDepth::Four),
        ]
    );
}

#[test]
fn encode_cursor_hotspots() {
    let mut cursor = IconFile::new(ResourceType::Cursor);
    let mut big = Entry::from_image(gradient(32, 32), BitDepth::ThirtyTwo)
        .unwrap();
    big.set_hotspot(31, 2);
    let mut small =
        Entry::new(gradient(32, 32), 16, 16, BitDepth::Four).unwrap();
    small.set_hotspot(8, 15);
    cursor.entries_mut().push(small).unwrap();
    cursor.entries_mut().push(big).unwrap();
    let read_back = round_trip(&cursor);
    assert_eq!(read_back.resource_type(), ResourceType::Cursor);
    let hotspots: Vec<(u16, u16)> =
        read_back.entries().iter().map(|entry| entry.hotspot()).collect();
    assert_eq!(hotspots, vec![(31, 2), (8, 15)]);
    assert_eq!(read_back.entries().get(1).unwrap().bit_depth(),
               BitDepth::Four);
}

#[test]
fn encode_half_transparent_one_bit_mask() {
    let mut raster = Raster::new(48, 48, Color::rgb(0, 0, 200));
    for y in 0..48 {
        for x in 0..24 {
            raster.set_pixel(x, y, Color::new(100, 0, 0, 200));
        }
    }
    let mut entry = Entry::from_image(raster, BitDepth::One).unwrap();
    entry.set_alpha_threshold(128);
    let image = entry.quantize();
    assert_eq!(image.alpha_mask().unwrap().transparent_count(), 1152);
    assert_eq!(entry.quantize(), image);

    let read_back = round_trip(&single_entry_icon(entry));
    let loaded = read_back.entries().get(0).unwrap().base_image();
    let clear = loaded.pixels().iter().filter(|pixel| pixel.a == 0).count();
    assert_eq!(clear, 1152);
}

//===========================================================================//

fn gradient(width: u32, height: u32) -> Raster {
    let mut raster = Raster::new(width, height, Color::TRANSPARENT);
    for y in 0..height {
        for x in 0..width {
            let alpha = if (x + y) % 7 == 0 { 0 } else { 255 - (x % 3) as u8 };
            let color = Color::new(
                alpha,
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                ((x + y) * 4 % 256) as u8,
            );
            raster.set_pixel(x, y, color);
        }
    }
    raster
}

fn single_entry_icon(entry: Entry) -> IconFile {
    let mut icon = IconFile::new(ResourceType::Icon);
    icon.entries_mut().push(entry).unwrap();
    icon
}

fn round_trip(file: &IconFile) -> IconFile {
    let mut file = file.clone();
    let mut output = Vec::<u8>::new();
    file.write(&mut output).unwrap();
    IconFile::read(Cursor::new(output)).unwrap()
}

//===========================================================================//
