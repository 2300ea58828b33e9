//! Read a png file into an image buffer.

use crate::compression::{self, ByteVec};
use crate::error::{Error, Result, UnitResult};
use crate::filter::unfilter_scanlines;
use crate::io::Read;
use crate::meta::chunk::{Chunk, ChunkType};
use crate::meta::header::Header;
use crate::meta::signature;
use super::ImageBuffer;


/// Specifies how strictly a png file is checked while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReadOptions {

    /// Also reject files that most decoders would accept:
    /// data chunks that are interrupted by other chunks,
    /// a non-empty end chunk, and bytes after the end chunk.
    pub pedantic: bool,

    /// Reject images whose pixels would occupy more than this many bytes,
    /// before any memory is allocated for them.
    pub max_pixel_bytes: Option<usize>,
}

impl ReadOptions {

    /// Reject all files that do not follow the png standard closely.
    pub fn pedantic() -> Self {
        ReadOptions { pedantic: true, .. Self::default() }
    }

    /// Reject images whose pixels would occupy more than this many bytes.
    pub fn with_max_pixel_bytes(self, max_pixel_bytes: usize) -> Self {
        ReadOptions { max_pixel_bytes: Some(max_pixel_bytes), .. self }
    }
}


/// Decode the bytes of a png file.
pub fn decode(bytes: &[u8]) -> Result<ImageBuffer> {
    decode_with_options(bytes, ReadOptions::default())
}

/// Decode the bytes of a png file with custom options.
pub fn decode_with_options(mut bytes: &[u8], options: ReadOptions) -> Result<ImageBuffer> {
    read_image(&mut bytes, options)
}


/// Where the reader is relative to the data chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataState {
    BeforeData,
    InData,
    AfterData,
}

/// Read the signature and all chunks up to the end chunk, then decompress and unfilter the pixels.
pub(crate) fn read_image(read: &mut impl Read, options: ReadOptions) -> Result<ImageBuffer> {
    signature::validate_png(read)?;

    let header = Header::from_chunk(&Chunk::read(read)?)?;
    let pixel_byte_count = header.pixel_byte_count()?;

    if let Some(max_pixel_bytes) = options.max_pixel_bytes {
        if pixel_byte_count > max_pixel_bytes {
            return Err(Error::format(format!(
                "image with {} pixel bytes exceeds the limit of {} bytes",
                pixel_byte_count, max_pixel_bytes
            )));
        }
    }

    let compressed = read_data_chunks(read, options.pedantic)?;

    if options.pedantic {
        validate_end_of_file(read)?;
    }

    let filtered = compression::decompress(&compressed, Some(header.filtered_byte_count()?))?;

    let pixels = unfilter_scanlines(
        &filtered, header.row_byte_count()?,
        header.height as usize, header.color_type.channel_count()
    )?;

    ImageBuffer::new(header.width, header.height, header.color_type.channel_count(), pixels)
}

/// Read all chunks after the header up to and including the end chunk,
/// and concatenate the data of all data chunks.
fn read_data_chunks(read: &mut impl Read, pedantic: bool) -> Result<ByteVec> {
    let mut compressed = Vec::new();
    let mut state = DataState::BeforeData;

    loop {
        let chunk = Chunk::read(read)?;

        match chunk.chunk_type {
            ChunkType::DATA => {
                if pedantic && state == DataState::AfterData {
                    return Err(Error::format("image data chunks are not consecutive"));
                }

                compressed.extend_from_slice(&chunk.data);
                state = DataState::InData;
                continue;
            },

            ChunkType::END => {
                if pedantic && !chunk.data.is_empty() {
                    return Err(Error::format("end chunk contains data"));
                }

                break;
            },

            ChunkType::HEADER => return Err(Error::format("image header appears twice")),

            // a suggested palette for truecolor images can be ignored
            ChunkType::PALETTE => {},

            unknown if unknown.is_critical() => return Err(Error::format(format!(
                "unknown critical chunk `{}`", unknown
            ))),

            _ => {},
        }

        if state == DataState::InData {
            state = DataState::AfterData;
        }
    }

    if state == DataState::BeforeData {
        return Err(Error::format("image data missing"));
    }

    Ok(compressed)
}

/// Fail if the reader contains any more bytes.
fn validate_end_of_file(read: &mut impl Read) -> UnitResult {
    let mut byte = [0_u8; 1];

    if read.read(&mut byte)? == 0 { Ok(()) }
    else { Err(Error::format("bytes after the end chunk")) }
}
