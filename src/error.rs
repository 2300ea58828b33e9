
//! Error type definitions.

use std::borrow::Cow;
use std::convert::TryFrom;
use std::error;
use std::fmt;
use std::io::ErrorKind;

pub use std::io::Error as IoError;
pub use std::io::Result as IoResult;


/// A result that may contain an error.
pub type Result<T> = std::result::Result<T, Error>;

/// A result that, if ok, contains nothing, and otherwise contains an error.
pub type UnitResult = Result<()>;


/// An error that may happen while reading or writing a png file.
/// Distinguishes between the layers of the file: the pixel grid,
/// the compressed stream, the checksums, and the chunk container.
#[derive(Debug)]
pub enum Error {

    /// The image buffer cannot exist with these dimensions,
    /// for example because the width is zero, the channel count is not one of 1, 3, or 4,
    /// or the number of pixel bytes does not match the resolution.
    InvalidDimensions(Cow<'static, str>),

    /// A deflate block header contained the reserved block type `0b11`.
    InvalidBlockType,

    /// The bytes ended while more were required.
    TruncatedStream,

    /// The compressed data is malformed,
    /// for example an invalid huffman code or a back reference before the start of the data.
    CorruptStream(Cow<'static, str>),

    /// A checksum did not match the contents it protects.
    Integrity(Cow<'static, str>),

    /// The bytes are not a supported png file,
    /// for example because of a wrong signature or unsupported header values.
    Format(Cow<'static, str>),

    /// Reading or writing the file failed for a reason outside of its contents.
    Io(IoError),
}


impl Error {

    /// Create an error of the variant `InvalidDimensions`.
    pub(crate) fn invalid_dimensions(message: impl Into<Cow<'static, str>>) -> Self {
        Error::InvalidDimensions(message.into())
    }

    /// Create an error of the variant `CorruptStream`.
    pub(crate) fn corrupt(message: impl Into<Cow<'static, str>>) -> Self {
        Error::CorruptStream(message.into())
    }

    /// Create an error of the variant `Integrity`.
    pub(crate) fn integrity(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Integrity(message.into())
    }

    /// Create an error of the variant `Format`.
    pub(crate) fn format(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Format(message.into())
    }
}

/// Enable using the `?` operator on `std::io::Result`.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        if error.kind() == ErrorKind::UnexpectedEof {
            Error::TruncatedStream
        }
        else {
            Error::Io(error)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDimensions(message) => write!(formatter, "invalid image dimensions: {}", message),
            Error::InvalidBlockType => write!(formatter, "invalid deflate block type"),
            Error::TruncatedStream => write!(formatter, "unexpected end of data"),
            Error::CorruptStream(message) => write!(formatter, "corrupt compressed data: {}", message),
            Error::Integrity(message) => write!(formatter, "checksum mismatch: {}", message),
            Error::Format(message) => write!(formatter, "invalid png file: {}", message),
            Error::Io(error) => error.fmt(formatter),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            _ => None,
        }
    }
}


/// Convert a usize to a u32, returning an error if it does not fit.
#[inline]
pub(crate) fn usize_to_u32(value: usize, error_message: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::invalid_dimensions(error_message))
}

/// Convert a u32 to a usize, returning an error if it does not fit.
#[inline]
pub(crate) fn u32_to_usize(value: u32, error_message: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid_dimensions(error_message))
}
