//! The image header, which is the data of the first chunk in each png file.

use bit_field::BitField;
use crate::error::{u32_to_usize, Error, Result, UnitResult};
use crate::io::*;
use super::chunk::{Chunk, ChunkType};


/// Number of bytes in the data of the header chunk.
pub const BYTE_SIZE: usize = 13;

/// Width and height must not exceed this value.
pub const MAX_DIMENSION: u32 = i32::MAX as u32;

/// This crate only supports one byte per sample.
pub const BIT_DEPTH: u8 = 8;

/// Deflate, the only compression method defined for png.
const COMPRESSION_METHOD: u8 = 0;

/// Adaptive filtering with the five basic filter types, the only filter method defined for png.
const FILTER_METHOD: u8 = 0;

/// Rows are stored from top to bottom, without interlacing.
const NO_INTERLACE: u8 = 0;


/// The channels contained in each pixel.
/// Palettes and grayscale with alpha are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorType {

    /// A single luminance channel.
    Grayscale,

    /// Red, green, and blue.
    Rgb,

    /// Red, green, blue, and alpha.
    Rgba,
}

impl ColorType {

    /// The color type with the specified number of channels, if supported.
    pub fn from_channel_count(channel_count: usize) -> Option<Self> {
        match channel_count {
            1 => Some(ColorType::Grayscale),
            3 => Some(ColorType::Rgb),
            4 => Some(ColorType::Rgba),
            _ => None,
        }
    }

    /// Number of bytes per pixel.
    pub fn channel_count(self) -> usize {
        match self {
            ColorType::Grayscale => 1,
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }

    /// The byte of the color type field in the header.
    pub fn to_byte(self) -> u8 {
        let mut byte = 0_u8;
        byte.set_bit(1, self != ColorType::Grayscale);
        byte.set_bit(2, self == ColorType::Rgba);
        byte
    }

    /// Parse the color type field of the header.
    /// The field is a set of flags: bit 0 for palettes, bit 1 for color, and bit 2 for alpha.
    pub fn from_byte(byte: u8) -> Result<Self> {
        if byte.get_bit(0) {
            return Err(Error::format("palette images are not supported"));
        }

        match (byte.get_bits(3 .. 8), byte.get_bit(1), byte.get_bit(2)) {
            (0, false, false) => Ok(ColorType::Grayscale),
            (0, true, false) => Ok(ColorType::Rgb),
            (0, true, true) => Ok(ColorType::Rgba),
            (0, false, true) => Err(Error::format("grayscale images with alpha are not supported")),
            _ => Err(Error::format(format!("invalid color type {}", byte))),
        }
    }
}


/// Describes the resolution and the pixel layout of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {

    /// Number of pixels in each row.
    pub width: u32,

    /// Number of rows.
    pub height: u32,

    /// The channels of each pixel.
    pub color_type: ColorType,
}

impl Header {

    /// Create a header for an image with 8 bits per sample, without interlacing.
    pub fn new(width: u32, height: u32, color_type: ColorType) -> Self {
        Header { width, height, color_type }
    }

    /// Check that the resolution is within the supported range.
    pub fn validate(&self) -> UnitResult {
        if self.width == 0 || self.height == 0 {
            return Err(Error::format("image must contain at least one pixel"));
        }

        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(Error::format("image dimensions exceed the maximum"));
        }

        Ok(())
    }

    /// Number of bytes in a single unfiltered row.
    pub fn row_byte_count(&self) -> Result<usize> {
        u32_to_usize(self.width, "image width")?
            .checked_mul(self.color_type.channel_count())
            .ok_or_else(|| Error::format("image row too large"))
    }

    /// Number of bytes of all unfiltered pixels.
    pub fn pixel_byte_count(&self) -> Result<usize> {
        self.row_byte_count()?
            .checked_mul(u32_to_usize(self.height, "image height")?)
            .ok_or_else(|| Error::format("image too large"))
    }

    /// Number of bytes of all filtered rows, including the filter byte of each row.
    pub fn filtered_byte_count(&self) -> Result<usize> {
        (self.row_byte_count()? + 1)
            .checked_mul(u32_to_usize(self.height, "image height")?)
            .ok_or_else(|| Error::format("image too large"))
    }

    /// Create the header chunk.
    pub fn to_chunk(&self) -> Result<Chunk> {
        self.validate()?;

        let mut data = Vec::with_capacity(BYTE_SIZE);
        self.width.write(&mut data)?;
        self.height.write(&mut data)?;
        u8::write_slice(&mut data, &[
            BIT_DEPTH, self.color_type.to_byte(),
            COMPRESSION_METHOD, FILTER_METHOD, NO_INTERLACE,
        ])?;

        Ok(Chunk::new(ChunkType::HEADER, data))
    }

    /// Parse and validate the data of the header chunk.
    pub fn from_chunk(chunk: &Chunk) -> Result<Self> {
        if chunk.chunk_type != ChunkType::HEADER {
            return Err(Error::format("first chunk is not the image header"));
        }

        if chunk.data.len() != BYTE_SIZE {
            return Err(Error::format("image header has an invalid size"));
        }

        let mut read = chunk.data.as_slice();
        let width = u32::read(&mut read)?;
        let height = u32::read(&mut read)?;

        let mut fields = [0_u8; 5];
        u8::read_slice(&mut read, &mut fields)?;
        let [bit_depth, color_type, compression_method, filter_method, interlace_method] = fields;

        if bit_depth != BIT_DEPTH {
            return Err(Error::format(format!("bit depth {} is not supported", bit_depth)));
        }

        let color_type = ColorType::from_byte(color_type)?;

        if compression_method != COMPRESSION_METHOD {
            return Err(Error::format("unknown compression method"));
        }

        if filter_method != FILTER_METHOD {
            return Err(Error::format("unknown filter method"));
        }

        if interlace_method != NO_INTERLACE {
            return Err(Error::format("interlaced images are not supported"));
        }

        let header = Header::new(width, height, color_type);
        header.validate()?;
        Ok(header)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    fn header_data(width: u32, height: u32, fields: [u8; 5]) -> Chunk {
        let mut data = Vec::new();
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&fields);
        Chunk::new(ChunkType::HEADER, data)
    }

    #[test]
    fn header_bytes(){
        let chunk = Header::new(2, 3, ColorType::Rgba).to_chunk().unwrap();
        assert_eq!(chunk.data, [0, 0, 0, 2, 0, 0, 0, 3, 8, 6, 0, 0, 0]);
        assert_eq!(Header::from_chunk(&chunk).unwrap(), Header::new(2, 3, ColorType::Rgba));
    }

    #[test]
    fn color_type_bytes(){
        for &channels in &[1, 3, 4] {
            let color_type = ColorType::from_channel_count(channels).unwrap();
            assert_eq!(color_type.channel_count(), channels);
            assert_eq!(ColorType::from_byte(color_type.to_byte()).unwrap(), color_type);
        }

        assert_eq!(ColorType::Grayscale.to_byte(), 0);
        assert_eq!(ColorType::Rgb.to_byte(), 2);
        assert_eq!(ColorType::Rgba.to_byte(), 6);
        assert_eq!(ColorType::from_channel_count(2), None);

        for &unsupported in &[3, 4, 5, 7, 8, 255] {
            assert!(matches!(ColorType::from_byte(unsupported), Err(Error::Format(_))));
        }
    }

    #[test]
    fn unsupported_fields(){
        assert!(Header::from_chunk(&header_data(1, 1, [8, 2, 0, 0, 0])).is_ok());

        let invalid = [
            header_data(0, 1, [8, 2, 0, 0, 0]),
            header_data(1, 0, [8, 2, 0, 0, 0]),
            header_data(1 << 31, 1, [8, 2, 0, 0, 0]),
            header_data(1, 1, [16, 2, 0, 0, 0]),
            header_data(1, 1, [8, 3, 0, 0, 0]),
            header_data(1, 1, [8, 2, 1, 0, 0]),
            header_data(1, 1, [8, 2, 0, 1, 0]),
            header_data(1, 1, [8, 2, 0, 0, 1]),
        ];

        for chunk in &invalid {
            assert!(matches!(Header::from_chunk(chunk), Err(Error::Format(_))), "{:?}", chunk);
        }

        let mut too_long = header_data(1, 1, [8, 2, 0, 0, 0]);
        too_long.data.push(0);
        assert!(matches!(Header::from_chunk(&too_long), Err(Error::Format(_))));
    }

    #[test]
    fn byte_counts(){
        let header = Header::new(5, 7, ColorType::Rgb);
        assert_eq!(header.row_byte_count().unwrap(), 15);
        assert_eq!(header.pixel_byte_count().unwrap(), 105);
        assert_eq!(header.filtered_byte_count().unwrap(), 112);
    }
}
