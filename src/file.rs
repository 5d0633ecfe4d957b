use crate::bitdepth::BitDepth;
use crate::collection::{EntryCollection, MAX_ENTRIES};
use crate::dib::{self, BMP_HEADER_LEN};
use crate::entry::Entry;
use crate::error::{ErrorCode, FormatError, Result};
use crate::pngio;
use crate::restype::ResourceType;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use std::io::{self, Read, Seek, SeekFrom, Write};

//===========================================================================//

// The size of the ICONDIR header, in bytes.
const HEADER_LEN: u32 = 6;
// The size of each ICONDIRENTRY record, in bytes.
const RECORD_LEN: u32 = 16;

//===========================================================================//

/// The contents of a single ICO or CUR file: a resource type plus a
/// collection of entries.
#[derive(Clone, Debug)]
pub struct IconFile {
    entries: EntryCollection,
}

impl IconFile {
    /// Creates a new, empty icon or cursor file.
    pub fn new(resource_type: ResourceType) -> IconFile {
        IconFile { entries: EntryCollection::new(resource_type) }
    }

    /// Returns the type of resource stored in this file, either icons or
    /// cursors.
    pub fn resource_type(&self) -> ResourceType {
        self.entries.resource_type()
    }

    /// Returns the entries in this file.
    pub fn entries(&self) -> &EntryCollection {
        &self.entries
    }

    /// Returns the entries in this file, for adding or removing entries.
    pub fn entries_mut(&mut self) -> &mut EntryCollection {
        &mut self.entries
    }

    /// Reads an ICO or CUR file.  Any problem with the file, including one
    /// that only affects a single entry, is returned as an error.
    pub fn read<R: Read + Seek>(reader: R) -> Result<IconFile> {
        IconFile::read_with_handler(reader, |_| false)
    }

    /// Reads an ICO or CUR file, skipping over damaged entries.  Returns the
    /// file along with every recoverable problem that was found.
    pub fn read_lenient<R: Read + Seek>(
        reader: R,
    ) -> Result<(IconFile, Vec<FormatError>)> {
        let mut errors = Vec::new();
        let file = IconFile::read_with_handler(reader, |error| {
            errors.push(error.clone());
            true
        })?;
        Ok((file, errors))
    }

    /// Reads an ICO or CUR file, passing each recoverable problem to
    /// `handler`.  If the handler returns true, reading continues (skipping
    /// the affected entry if it can't be decoded); if it returns false,
    /// reading stops and the problem is returned as an error.  Problems
    /// with the header or directory are always returned as errors.
    pub fn read_with_handler<R, F>(
        mut reader: R,
        mut handler: F,
    ) -> Result<IconFile>
    where
        R: Read + Seek,
        F: FnMut(&FormatError) -> bool,
    {
        let reserved = reader.read_u16::<LittleEndian>()?;
        if reserved != 0 {
            fatal!(ErrorCode::InvalidReserved, reserved);
        }
        let restype = reader.read_u16::<LittleEndian>()?;
        let restype = match ResourceType::from_number(restype) {
            Some(restype) => restype,
            None => fatal!(ErrorCode::InvalidResourceType, restype),
        };
        let num_entries = reader.read_u16::<LittleEndian>()? as usize;
        if num_entries == 0 {
            fatal!(ErrorCode::NoEntries);
        }
        debug!("Reading {:?} file with {} entries", restype, num_entries);

        let directory_end = HEADER_LEN + RECORD_LEN * num_entries as u32;
        let mut records = Vec::<Record>::with_capacity(num_entries);
        for index in 0..num_entries {
            let record = Record::read(index, &mut reader)?;
            if record.data_size <= BMP_HEADER_LEN {
                let error = FormatError::new(ErrorCode::DataTooSmall)
                    .with_value(record.data_size)
                    .at_entry(index);
                return Err(error.into());
            }
            if record.data_offset < directory_end {
                let error = FormatError::new(ErrorCode::OffsetInDirectory)
                    .with_value(record.data_offset)
                    .at_entry(index);
                return Err(error.into());
            }
            records.push(record);
        }
        records.sort_by_key(|record| record.data_offset);
        for pair in records.windows(2) {
            let end = pair[0].data_offset as u64 + pair[0].data_size as u64;
            if end > pair[1].data_offset as u64 {
                let error = FormatError::new(ErrorCode::OverlappingData)
                    .with_value(pair[1].data_offset)
                    .at_entry(pair[1].index);
                return Err(error.into());
            }
        }

        let stream_len = reader.seek(SeekFrom::End(0))?;
        let mut entries = EntryCollection::new(restype);
        for record in records.iter() {
            let end = record.data_offset as u64 + record.data_size as u64;
            if end > stream_len {
                let message = format!(
                    "Entry {} data ends at byte {}, past the end of the \
                     file ({} bytes)",
                    record.index, end, stream_len
                );
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                                          message)
                    .into());
            }
            reader.seek(SeekFrom::Start(record.data_offset as u64))?;
            let mut data = vec![0u8; record.data_size as usize];
            reader.read_exact(&mut data)?;
            let entry = match decode_entry(restype, record, &data) {
                Decoded::Entry(entry, problems) => {
                    for problem in problems {
                        recover(&mut handler, problem)?;
                    }
                    entry
                }
                Decoded::Skipped(problems) => {
                    for problem in problems {
                        recover(&mut handler, problem)?;
                    }
                    continue;
                }
            };
            if entries.remove_similar(entry.key()).is_some() {
                debug!("Entry {} replaces an earlier {:?}", record.index,
                       entry.key());
            }
            if let Err(entry) = entries.push(entry) {
                warn!("Dropping entry {} ({:?})", record.index, entry.key());
            }
        }
        if entries.is_empty() {
            fatal!(ErrorCode::NoValidEntries);
        }
        Ok(IconFile { entries })
    }

    /// Writes an ICO or CUR file.  Entries are written in key order (the
    /// order of the collection itself is left alone), and each entry's
    /// quantized pixels are cached on it.
    pub fn write<W: Write>(&mut self, mut writer: W) -> Result<()> {
        let num_entries = self.entries.len();
        if num_entries == 0 {
            fatal!(ErrorCode::EmptyContainer);
        }
        if num_entries > MAX_ENTRIES {
            fatal!(ErrorCode::TooManyEntries, num_entries as i64);
        }
        let restype = self.entries.resource_type();
        let mut order: Vec<usize> = (0..num_entries).collect();
        order.sort_by_key(|&index| self.entries.entries()[index].key());

        let mut payloads = Vec::<Payload>::with_capacity(num_entries);
        for &index in order.iter() {
            let entry = self.entries.entry_mut(index);
            let image = entry.quantize();
            let data = if image.is_png() {
                pngio::write_png(&image)?
            } else {
                dib::write_dib(&image)?
            };
            debug!(
                "Encoded {:?} as {} ({} bytes)",
                entry.key(),
                if image.is_png() { "PNG" } else { "BMP" },
                data.len()
            );
            let (x, y) = match restype {
                ResourceType::Icon => (1, entry.bit_depth().bits_per_pixel()),
                ResourceType::Cursor => entry.hotspot(),
            };
            payloads.push(Payload {
                width: entry.width(),
                height: entry.height(),
                num_colors: image.palette().len(),
                x,
                y,
                data,
            });
        }

        writer.write_u16::<LittleEndian>(0)?; // reserved
        writer.write_u16::<LittleEndian>(restype.number())?;
        writer.write_u16::<LittleEndian>(num_entries as u16)?;
        let mut data_offset = HEADER_LEN + RECORD_LEN * num_entries as u32;
        for payload in payloads.iter() {
            // A width/height byte of zero indicates a size of 256 or more.
            let width =
                if payload.width > 255 { 0 } else { payload.width as u8 };
            writer.write_u8(width)?;
            let height =
                if payload.height > 255 { 0 } else { payload.height as u8 };
            writer.write_u8(height)?;
            let num_colors = if payload.num_colors > 255 {
                0
            } else {
                payload.num_colors as u8
            };
            writer.write_u8(num_colors)?;
            writer.write_u8(0)?; // reserved
            writer.write_u16::<LittleEndian>(payload.x)?;
            writer.write_u16::<LittleEndian>(payload.y)?;
            let data_size = payload.data.len() as u32;
            writer.write_u32::<LittleEndian>(data_size)?;
            writer.write_u32::<LittleEndian>(data_offset)?;
            data_offset += data_size;
        }
        for payload in payloads.iter() {
            writer.write_all(&payload.data)?;
        }
        Ok(())
    }
}

//===========================================================================//

// One ICONDIRENTRY record, as read from the directory.
struct Record {
    index: usize,
    width_byte: u8,
    height_byte: u8,
    x: u16,
    y: u16,
    data_size: u32,
    data_offset: u32,
}

impl Record {
    fn read<R: Read>(index: usize, reader: &mut R) -> Result<Record> {
        let width_byte = reader.read_u8()?;
        let height_byte = reader.read_u8()?;
        let _num_colors = reader.read_u8()?;
        let _reserved = reader.read_u8()?;
        let x = reader.read_u16::<LittleEndian>()?;
        let y = reader.read_u16::<LittleEndian>()?;
        let data_size = reader.read_u32::<LittleEndian>()?;
        let data_offset = reader.read_u32::<LittleEndian>()?;
        Ok(Record {
            index,
            width_byte,
            height_byte,
            x,
            y,
            data_size,
            data_offset,
        })
    }

    // The ICONDIRENTRY struct uses only one byte each for width and height.
    // A byte of zero stands for 256 (or, since Windows Vista, any larger
    // size, with the real size coming from the payload).
    fn height(&self) -> u32 {
        if self.height_byte == 0 {
            256
        } else {
            self.height_byte as u32
        }
    }
}

// One encoded entry, waiting to be written.
struct Payload {
    width: u32,
    height: u32,
    num_colors: usize,
    x: u16,
    y: u16,
    data: Vec<u8>,
}

enum Decoded {
    Entry(Entry, Vec<FormatError>),
    Skipped(Vec<FormatError>),
}

fn recover<F>(handler: &mut F, error: FormatError) -> Result<()>
where
    F: FnMut(&FormatError) -> bool,
{
    warn!("{}", error);
    if handler(&error) {
        Ok(())
    } else {
        Err(error.into())
    }
}

fn decode_entry(restype: ResourceType, record: &Record, data: &[u8]) -> Decoded {
    let index = record.index;
    let mut problems = Vec::new();
    let directory_bpp = match restype {
        ResourceType::Icon => Some(record.y),
        ResourceType::Cursor => None,
    };
    let directory_depth = directory_bpp.and_then(BitDepth::from_bits_per_pixel);
    if let Some(bpp) = directory_bpp {
        if bpp != 0 && directory_depth.is_none() {
            problems.push(
                FormatError::new(ErrorCode::UnsupportedBitDepth)
                    .with_value(bpp)
                    .at_entry(index),
            );
        }
    }

    let decoded = if pngio::is_png(data) {
        pngio::read_png(data).map(|png| {
            (png.raster, directory_depth.unwrap_or(png.bit_depth), true)
        })
    } else {
        dib::read_dib(data, record.height()).map(|dib| {
            if let Some(depth) = directory_depth {
                if depth != dib.bit_depth {
                    problems.push(
                        FormatError::new(ErrorCode::BitDepthMismatch)
                            .with_value(dib.bit_depth.bits_per_pixel())
                            .at_entry(index),
                    );
                }
            }
            (dib.raster, dib.bit_depth, false)
        })
    };
    let (raster, bit_depth, is_png) = match decoded {
        Ok(decoded) => decoded,
        Err(error) => {
            problems.push(error.at_entry(index));
            return Decoded::Skipped(problems);
        }
    };

    let (width, height) = (raster.width(), raster.height());
    let width_matches =
        record.width_byte == 0 || width == record.width_byte as u32;
    let height_matches =
        record.height_byte == 0 || height == record.height_byte as u32;
    if !width_matches || !height_matches {
        let value = if width_matches { height } else { width };
        problems.push(
            FormatError::new(ErrorCode::SizeMismatch)
                .with_value(value)
                .at_entry(index),
        );
        return Decoded::Skipped(problems);
    }
    let mut entry = match Entry::new(raster, width, height, bit_depth) {
        Ok(entry) => entry,
        Err(error) => {
            problems.push(error.at_entry(index));
            return Decoded::Skipped(problems);
        }
    };
    entry.set_png(is_png);
    if restype == ResourceType::Cursor {
        entry.set_hotspot(record.x, record.y);
    }
    debug!(
        "Entry {}: {}x{} at {} bpp ({})",
        index,
        width,
        height,
        bit_depth.bits_per_pixel(),
        if is_png { "PNG" } else { "BMP" }
    );
    Decoded::Entry(entry, problems)
}

//===========================================================================//


//===========================================================================//
