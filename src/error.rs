use std::fmt;
use std::io;
use thiserror::Error;

//===========================================================================//

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error produced while reading or writing an ICO or CUR file.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The file contents (or the container being written) are invalid.
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl Error {
    /// Returns the format error carried by this error, if any.
    pub fn format_error(&self) -> Option<&FormatError> {
        match *self {
            Error::Format(ref error) => Some(error),
            Error::Io(_) => None,
        }
    }
}

//===========================================================================//

/// Identifies what went wrong in a `FormatError`.  The numeric values
/// returned by `number()` are stable.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorCode {
    /// The reserved field of the file header was not zero.
    InvalidReserved,
    /// The type field of the file header was neither 1 (icon) nor 2
    /// (cursor).
    InvalidResourceType,
    /// The file header declared zero entries.
    NoEntries,
    /// A directory record declared a payload too small to hold any image.
    DataTooSmall,
    /// A directory record's payload starts inside the directory table.
    OffsetInDirectory,
    /// Two directory records' payloads overlap.
    OverlappingData,
    /// A bit depth is not one of 1, 4, 8, 24 or 32.
    UnsupportedBitDepth,
    /// The decoded image size differs from the directory record.
    SizeMismatch,
    /// A width or height is outside the supported range.
    InvalidDimension,
    /// An embedded PNG could not be decoded.
    MalformedPng,
    /// An embedded DIB could not be decoded.
    MalformedBmp,
    /// The directory bit depth differs from the payload's bit depth.
    BitDepthMismatch,
    /// No entry survived validation.
    NoValidEntries,
    /// A container with no entries can't be written.
    EmptyContainer,
    /// A container has more entries than the directory can count.
    TooManyEntries,
    /// PNG encoding failed for a reason other than I/O.
    PngEncoding,
}

impl ErrorCode {
    /// Returns the stable numeric code.
    pub fn number(self) -> u16 {
        match self {
            ErrorCode::InvalidReserved => 1,
            ErrorCode::InvalidResourceType => 2,
            ErrorCode::NoEntries => 3,
            ErrorCode::DataTooSmall => 4,
            ErrorCode::OffsetInDirectory => 5,
            ErrorCode::OverlappingData => 6,
            ErrorCode::UnsupportedBitDepth => 7,
            ErrorCode::SizeMismatch => 8,
            ErrorCode::InvalidDimension => 9,
            ErrorCode::MalformedPng => 10,
            ErrorCode::MalformedBmp => 11,
            ErrorCode::BitDepthMismatch => 12,
            ErrorCode::NoValidEntries => 13,
            ErrorCode::EmptyContainer => 14,
            ErrorCode::TooManyEntries => 15,
            ErrorCode::PngEncoding => 16,
        }
    }

    /// Returns true if a load that hits this error can't continue with the
    /// remaining entries.
    pub fn is_fatal(self) -> bool {
        !matches!(
            self,
            ErrorCode::UnsupportedBitDepth
                | ErrorCode::SizeMismatch
                | ErrorCode::InvalidDimension
                | ErrorCode::MalformedPng
                | ErrorCode::MalformedBmp
                | ErrorCode::BitDepthMismatch
        )
    }

    fn description(self) -> &'static str {
        match self {
            ErrorCode::InvalidReserved => "invalid reserved field",
            ErrorCode::InvalidResourceType => "invalid resource type",
            ErrorCode::NoEntries => "file has no directory entries",
            ErrorCode::DataTooSmall => "image data is too small",
            ErrorCode::OffsetInDirectory => {
                "image data overlaps the directory"
            }
            ErrorCode::OverlappingData => "image data ranges overlap",
            ErrorCode::UnsupportedBitDepth => "unsupported bit depth",
            ErrorCode::SizeMismatch => {
                "image size doesn't match the directory"
            }
            ErrorCode::InvalidDimension => "image dimension out of range",
            ErrorCode::MalformedPng => "malformed PNG data",
            ErrorCode::MalformedBmp => "malformed BMP data",
            ErrorCode::BitDepthMismatch => {
                "bit depth doesn't match the directory"
            }
            ErrorCode::NoValidEntries => "no valid entries",
            ErrorCode::EmptyContainer => "container has no entries",
            ErrorCode::TooManyEntries => "too many entries",
            ErrorCode::PngEncoding => "PNG encoding failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

//===========================================================================//

/// A structural problem with an ICO/CUR file or with an entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormatError {
    code: ErrorCode,
    value: Option<i64>,
    entry: Option<usize>,
}

impl FormatError {
    /// Creates an error with no offending value that applies before any
    /// entry.
    pub fn new(code: ErrorCode) -> FormatError {
        FormatError { code, value: None, entry: None }
    }

    /// Attaches the offending value.
    pub fn with_value<V: Into<i64>>(mut self, value: V) -> FormatError {
        self.value = Some(value.into());
        self
    }

    /// Attaches the zero-based index of the entry the error applies to.
    pub fn at_entry(mut self, index: usize) -> FormatError {
        self.entry = Some(index);
        self
    }

    /// Returns what went wrong.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the offending value, if one was recorded.
    pub fn value(&self) -> Option<i64> {
        self.value
    }

    /// Returns the zero-based index of the directory entry this error
    /// applies to, or `None` if it occurred before any entry was read.
    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    /// Returns true if this error aborts a whole load.
    pub fn is_fatal(&self) -> bool {
        self.code.is_fatal()
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (code {})", self.code, self.code.number())?;
        if let Some(value) = self.value {
            write!(f, ", value {}", value)?;
        }
        if let Some(entry) = self.entry {
            write!(f, ", entry {}", entry)?;
        }
        Ok(())
    }
}

impl std::error::Error for FormatError {}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{Error, ErrorCode, FormatError};

    #[test]
    fn error_numbers_are_distinct() {
        let codes = [
            ErrorCode::InvalidReserved,
            ErrorCode::InvalidResourceType,
            ErrorCode::NoEntries,
            ErrorCode::DataTooSmall,
            ErrorCode::OffsetInDirectory,
            ErrorCode::OverlappingData,
            ErrorCode::UnsupportedBitDepth,
            ErrorCode::SizeMismatch,
            ErrorCode::InvalidDimension,
            ErrorCode::MalformedPng,
            ErrorCode::MalformedBmp,
            ErrorCode::BitDepthMismatch,
            ErrorCode::NoValidEntries,
            ErrorCode::EmptyContainer,
            ErrorCode::TooManyEntries,
            ErrorCode::PngEncoding,
        ];
        let mut numbers: Vec<u16> =
            codes.iter().map(|code| code.number()).collect();
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), codes.len());
    }

    #[test]
    fn display_includes_value_and_entry() {
        let error = FormatError::new(ErrorCode::SizeMismatch)
            .with_value(17)
            .at_entry(3);
        assert_eq!(
            error.to_string(),
            "image size doesn't match the directory (code 8), value 17, \
             entry 3"
        );
        assert!(!error.is_fatal());
        let error: Error = error.into();
        assert_eq!(
            error.format_error().map(|e| e.code()),
            Some(ErrorCode::SizeMismatch)
        );
    }

    #[test]
    fn structural_errors_are_fatal() {
        assert!(ErrorCode::OverlappingData.is_fatal());
        assert!(ErrorCode::NoValidEntries.is_fatal());
        assert!(!ErrorCode::MalformedPng.is_fatal());
    }
}

//===========================================================================//
