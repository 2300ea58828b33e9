//! The in-memory pixel grid, and the functions to read and write it as a png file.
//!
//! Encode an image:
//! ```
//! use png_lite::prelude::*;
//!
//! let image = ImageBuffer::from_fn(16, 16, 3, |x, y, pixel| {
//!     pixel.copy_from_slice(&[x as u8 * 16, y as u8 * 16, 128]);
//! }).unwrap();
//!
//! let bytes = encode(&image, WriteOptions::default()).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), image);
//! ```

pub mod read;
pub mod write;

use std::path::Path;
use crate::compression::{ByteVec, Bytes};
use crate::error::{Error, Result, UnitResult};
use crate::io::{Read, Write};
use crate::meta::header::{ColorType, Header, MAX_DIMENSION};

pub use self::read::ReadOptions;
pub use self::write::WriteOptions;


/// A grid of pixels with 8 bits per channel, stored row by row from top to bottom.
/// Always contains exactly `width * height * channels` bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    color_type: ColorType,
    pixels: ByteVec,
}

/// Check the resolution and the channel count, and compute the number of bytes in a row and in the image.
fn validate_dimensions(width: u32, height: u32, channels: usize) -> Result<(ColorType, usize, usize)> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_dimensions("image must contain at least one pixel"));
    }

    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::invalid_dimensions("width and height must not exceed 2^31 - 1"));
    }

    let color_type = ColorType::from_channel_count(channels)
        .ok_or_else(|| Error::invalid_dimensions(format!("{} channels are not supported, only 1, 3, or 4", channels)))?;

    let too_large = || Error::invalid_dimensions("image byte size overflows");

    let row_byte_count = (width as usize).checked_mul(channels).ok_or_else(too_large)?;
    let byte_count = row_byte_count.checked_mul(height as usize).ok_or_else(too_large)?;
    Ok((color_type, row_byte_count, byte_count))
}

impl ImageBuffer {

    /// Create an image from the pixel bytes, which are ordered row by row, then pixel by pixel.
    /// Fails if any dimension is zero, if the channel count is not one of 1, 3, or 4,
    /// or if the number of bytes does not match the resolution.
    pub fn new(width: u32, height: u32, channels: usize, pixels: ByteVec) -> Result<Self> {
        let (color_type, _, byte_count) = validate_dimensions(width, height, channels)?;

        if pixels.len() != byte_count {
            return Err(Error::invalid_dimensions(format!(
                "expected {} pixel bytes for {}x{} pixels with {} channels, but got {}",
                byte_count, width, height, channels, pixels.len()
            )));
        }

        Ok(ImageBuffer { width, height, color_type, pixels })
    }

    /// Create an image by calling the closure once for every pixel, row by row.
    /// The closure receives the position and the bytes of the pixel, which are initially zero.
    pub fn from_fn(width: u32, height: u32, channels: usize, mut set_pixel: impl FnMut(u32, u32, &mut [u8])) -> Result<Self> {
        let (_, _, byte_count) = validate_dimensions(width, height, channels)?;
        let mut pixels = vec![0_u8; byte_count];

        for (index, pixel) in pixels.chunks_exact_mut(channels).enumerate() {
            let x = (index % width as usize) as u32;
            let y = (index / width as usize) as u32;
            set_pixel(x, y, pixel);
        }

        Self::new(width, height, channels, pixels)
    }

    /// Copy the image out of a buffer whose rows start `stride` bytes apart,
    /// for example a frame buffer with padded rows.
    /// The padding after the last row may be missing.
    pub fn from_strided(width: u32, height: u32, channels: usize, stride: usize, bytes: Bytes<'_>) -> Result<Self> {
        let (_, row_byte_count, byte_count) = validate_dimensions(width, height, channels)?;

        if stride < row_byte_count {
            return Err(Error::invalid_dimensions("stride is smaller than a row"));
        }

        let required_byte_count = stride.checked_mul(height as usize - 1)
            .and_then(|start_of_last_row| start_of_last_row.checked_add(row_byte_count))
            .ok_or_else(|| Error::invalid_dimensions("strided image byte size overflows"))?;

        if bytes.len() < required_byte_count {
            return Err(Error::invalid_dimensions("strided buffer is too small for the image"));
        }

        let mut pixels = Vec::with_capacity(byte_count);
        for y in 0 .. height as usize {
            pixels.extend_from_slice(&bytes[y * stride .. y * stride + row_byte_count]);
        }

        Self::new(width, height, channels, pixels)
    }

    /// The same image, upside down.
    /// Graphics APIs usually read frame buffers starting at the bottom row.
    pub fn flipped_vertically(&self) -> Self {
        let row_byte_count = self.row_byte_count();

        let pixels = self.pixels.chunks_exact(row_byte_count).rev()
            .flatten().copied().collect();

        ImageBuffer { pixels, .. *self }
    }

    /// Number of pixels in each row.
    pub fn width(&self) -> u32 { self.width }

    /// Number of rows.
    pub fn height(&self) -> u32 { self.height }

    /// Number of bytes per pixel, either 1, 3, or 4.
    pub fn channels(&self) -> usize { self.color_type.channel_count() }

    /// The channels of each pixel.
    pub fn color_type(&self) -> ColorType { self.color_type }

    /// The header that describes this image in a png file.
    pub fn header(&self) -> Header {
        Header::new(self.width, self.height, self.color_type)
    }

    /// All pixel bytes, row by row, from top to bottom.
    pub fn pixels(&self) -> Bytes<'_> { &self.pixels }

    /// Number of bytes in each row.
    pub fn row_byte_count(&self) -> usize {
        self.width as usize * self.channels()
    }

    /// The bytes of a single row, or `None` if the row is outside of the image.
    pub fn row(&self, y: u32) -> Option<Bytes<'_>> {
        self.pixels.chunks_exact(self.row_byte_count()).nth(y as usize)
    }

    /// The bytes of a single pixel, or `None` if the position is outside of the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Bytes<'_>> {
        if x >= self.width { return None; }

        let channels = self.channels();
        self.row(y).map(|row| &row[x as usize * channels .. (x as usize + 1) * channels])
    }

    /// Take ownership of the pixel bytes.
    pub fn into_pixels(self) -> ByteVec { self.pixels }


    /// Write the image as a png file to the writer.
    /// Use `write_to_file` instead, if you have a file path.
    pub fn write_to_buffered(&self, mut buffered: impl Write, options: WriteOptions) -> UnitResult {
        write::write_image(self, &mut buffered, options)
    }

    /// Write the image as a png file.
    /// The incomplete file is deleted if an error occurs.
    pub fn write_to_file(&self, path: impl AsRef<Path>, options: WriteOptions) -> UnitResult {
        crate::io::attempt_delete_file_on_write_error(path.as_ref(), |file| {
            write::write_image(self, file, options)
        })
    }

    /// Read a png file from the reader.
    /// The reader should be buffered or an in-memory slice, as the chunks are read in small sections.
    /// Use `read_from_file` instead, if you have a file path.
    pub fn read_from_buffered(mut buffered: impl Read, options: ReadOptions) -> Result<Self> {
        read::read_image(&mut buffered, options)
    }

    /// Read a png file.
    pub fn read_from_file(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::read_from_buffered(std::io::BufReader::new(file), options)
    }
}
