use clap::{App, Arg, SubCommand};
use icofile::{BitDepth, Entry, IconFile, Raster, ResourceType, ScalingFilter};
use std::fs;
use std::path::PathBuf;
use std::process;

//===========================================================================//

fn main() {
    env_logger::init();
    let matches = App::new("icotool")
        .version("0.1")
        .about("Manipulates ICO and CUR files")
        .subcommand(
            SubCommand::with_name("create")
                .about("Creates an ICO or CUR file from PNG files")
                .arg(
                    Arg::with_name("output")
                        .takes_value(true)
                        .value_name("PATH")
                        .short("o")
                        .long("output")
                        .help("Sets output path"),
                )
                .arg(
                    Arg::with_name("depth")
                        .takes_value(true)
                        .value_name("BPP")
                        .short("d")
                        .long("depth")
                        .possible_values(&["1", "4", "8", "24", "32"])
                        .default_value("32")
                        .help("Sets the bit depth of each entry"),
                )
                .arg(
                    Arg::with_name("size")
                        .takes_value(true)
                        .value_name("PIXELS")
                        .short("s")
                        .long("size")
                        .multiple(true)
                        .number_of_values(1)
                        .help("Adds an entry of this size for every image"),
                )
                .arg(
                    Arg::with_name("png")
                        .long("png")
                        .help("Stores entries as PNG even when small"),
                )
                .arg(
                    Arg::with_name("cursor")
                        .long("cursor")
                        .help("Creates a CUR file with a hotspot at (0, 0)"),
                )
                .arg(Arg::with_name("image").multiple(true).required(true)),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extracts an entry from an ICO or CUR file")
                .arg(
                    Arg::with_name("output")
                        .takes_value(true)
                        .value_name("PATH")
                        .short("o")
                        .long("output")
                        .help("Sets output path"),
                )
                .arg(
                    Arg::with_name("stored")
                        .long("stored")
                        .help("Extracts the pixels as they would be stored"),
                )
                .arg(Arg::with_name("ico").required(true))
                .arg(Arg::with_name("index").required(true)),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Lists entries in an ICO or CUR file")
                .arg(Arg::with_name("ico").required(true)),
        )
        .get_matches();
    if let Some(submatches) = matches.subcommand_matches("create") {
        let restype = if submatches.is_present("cursor") {
            ResourceType::Cursor
        } else {
            ResourceType::Icon
        };
        let out_path = if let Some(path) = submatches.value_of("output") {
            PathBuf::from(path)
        } else {
            let extension =
                if restype == ResourceType::Cursor { "cur" } else { "ico" };
            let mut path = PathBuf::from(format!("out.{}", extension));
            let mut index: i32 = 0;
            while path.exists() {
                index += 1;
                path = PathBuf::from(format!("out{}.{}", index, extension));
            }
            path
        };
        let depth = submatches
            .value_of("depth")
            .and_then(|depth| depth.parse::<u16>().ok())
            .and_then(BitDepth::from_bits_per_pixel)
            .unwrap_or(BitDepth::ThirtyTwo);
        let sizes: Vec<u32> = match submatches.values_of("size") {
            Some(values) => values
                .map(|value| value.parse::<u32>().unwrap_or_else(|_| {
                    fail(&format!("Invalid size {:?}", value))
                }))
                .collect(),
            None => Vec::new(),
        };
        let mut file = IconFile::new(restype);
        if let Some(paths) = submatches.values_of("image") {
            for path in paths {
                println!("Adding {:?}", path);
                let input = fs::File::open(path)
                    .unwrap_or_else(|error| fail(&error.to_string()));
                let raster = Raster::read_png(input)
                    .unwrap_or_else(|error| fail(&error.to_string()));
                let mut entries = Vec::new();
                if sizes.is_empty() {
                    entries.push(Entry::from_image(raster, depth));
                } else {
                    for &size in sizes.iter() {
                        entries.push(Entry::new(raster.clone(), size, size,
                                                depth));
                    }
                }
                for entry in entries {
                    let mut entry =
                        entry.unwrap_or_else(|error| fail(&error.to_string()));
                    entry.set_png(submatches.is_present("png"));
                    entry.set_scaling_filter(ScalingFilter::HighQualityBicubic);
                    if let Err(entry) = file.entries_mut().push(entry) {
                        println!("Skipping duplicate {:?}", entry.key());
                    }
                }
            }
        }
        let mut output = Vec::<u8>::new();
        file.write(&mut output)
            .unwrap_or_else(|error| fail(&error.to_string()));
        fs::write(out_path, output)
            .unwrap_or_else(|error| fail(&error.to_string()));
    } else if let Some(submatches) = matches.subcommand_matches("extract") {
        let path = submatches.value_of("ico").unwrap();
        let file = read_file(path).0;
        let index = submatches.value_of("index").unwrap();
        let index = index.parse::<usize>()
            .unwrap_or_else(|_| fail(&format!("Invalid index {:?}", index)));
        let entry = file.entries().get(index).unwrap_or_else(|| {
            fail(&format!("No entry {} (of {})", index, file.entries().len()))
        });
        let raster = if submatches.is_present("stored") {
            icofile::quantize(entry, entry.effective_is_png(),
                              entry.bit_depth())
                .to_raster()
        } else {
            entry.base_image().clone()
        };
        let out_path = if let Some(path) = submatches.value_of("output") {
            PathBuf::from(path)
        } else {
            PathBuf::from(format!("{}.{}.png", path, index))
        };
        let out_file = fs::File::create(out_path)
            .unwrap_or_else(|error| fail(&error.to_string()));
        raster.write_png(out_file)
            .unwrap_or_else(|error| fail(&error.to_string()));
    } else if let Some(submatches) = matches.subcommand_matches("list") {
        let path = submatches.value_of("ico").unwrap();
        let (file, problems) = read_file(path);
        println!("Resource type: {:?}", file.resource_type());
        for (index, entry) in file.entries().iter().enumerate() {
            let kind = if entry.is_png() { "PNG" } else { "BMP" };
            let suffix = if file.resource_type() == ResourceType::Cursor {
                let (x, y) = entry.hotspot();
                format!("hotspot at ({}, {})", x, y)
            } else {
                format!("{} bpp", entry.bit_depth().bits_per_pixel())
            };
            println!(
                "{:5}: {}x{} {}, {}",
                index,
                entry.width(),
                entry.height(),
                kind,
                suffix
            );
        }
        for problem in problems.iter() {
            println!("Skipped problem: {}", problem);
        }
    }
}

fn read_file(path: &str) -> (IconFile, Vec<icofile::FormatError>) {
    let file = fs::File::open(path)
        .unwrap_or_else(|error| fail(&error.to_string()));
    IconFile::read_lenient(file).unwrap_or_else(|error| fail(&error.to_string()))
}

fn fail(message: &str) -> ! {
    eprintln!("icotool: {}", message);
    process::exit(1);
}

//===========================================================================//
