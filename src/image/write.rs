//! Write an image buffer as a png file.
//!
//! The pixels are filtered row by row, compressed as a single zlib stream,
//! and the compressed stream is split into data chunks of a configurable size.

use crate::compression::{ByteVec, Compression};
use crate::error::{Result, UnitResult};
use crate::filter::{filter_scanlines, FilterPolicy};
use crate::io::Write;
use crate::meta::chunk::{write_chunk, ChunkType, MAX_DATA_SIZE};
use crate::meta::signature;
use super::ImageBuffer;


/// Specifies how an image is encoded.
/// All options produce valid png files that contain the exact same pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteOptions {

    /// Decides which prediction filter is applied to each row before compression.
    pub filter: FilterPolicy,

    /// Decides which deflate blocks the compressed pixel data may consist of.
    pub compression: Compression,

    /// The compressed pixel data is split into data chunks of at most this many bytes.
    /// A value of zero is treated as one.
    pub chunk_size: u32,

    /// Filter rows on multiple threads. Only has an effect with the `rayon` feature.
    /// The resulting file is identical in either case.
    pub parallel: bool,
}

impl WriteOptions {

    /// The default maximum size of the data chunks.
    pub const DEFAULT_CHUNK_SIZE: u32 = 8192;

    /// Store the unfiltered pixels without compression.
    /// Produces large files very quickly.
    pub fn fast() -> Self {
        WriteOptions {
            filter: FilterPolicy::None,
            compression: Compression::Stored,
            .. Self::default()
        }
    }

    /// Produce the smallest files this crate can produce.
    /// Puts all pixel data into a single chunk, saving the overhead of chunk headers.
    pub fn small() -> Self {
        WriteOptions {
            filter: FilterPolicy::Adaptive,
            compression: Compression::Dynamic,
            chunk_size: MAX_DATA_SIZE as u32,
            .. Self::default()
        }
    }

    /// Use the specified filter policy.
    pub fn with_filter(self, filter: FilterPolicy) -> Self {
        WriteOptions { filter, .. self }
    }

    /// Use the specified compression method.
    pub fn with_compression(self, compression: Compression) -> Self {
        WriteOptions { compression, .. self }
    }

    /// Split the compressed data into chunks of at most this many bytes.
    pub fn with_chunk_size(self, chunk_size: u32) -> Self {
        WriteOptions { chunk_size, .. self }
    }

    /// Disable or enable multi-threaded filtering.
    pub fn with_parallel(self, parallel: bool) -> Self {
        WriteOptions { parallel, .. self }
    }
}

impl Default for WriteOptions {

    /// Adaptive filters, dynamic huffman compression, and chunks of 8 KiB.
    fn default() -> Self {
        WriteOptions {
            filter: FilterPolicy::Adaptive,
            compression: Compression::Dynamic,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            parallel: true,
        }
    }
}


/// Encode the image as the bytes of a png file.
pub fn encode(image: &ImageBuffer, options: WriteOptions) -> Result<ByteVec> {
    let mut bytes = Vec::with_capacity(image.pixels().len() / 2 + 64);
    write_image(image, &mut bytes, options)?;
    Ok(bytes)
}

/// Write the signature, the header, the data chunks, and the end chunk.
pub(crate) fn write_image(image: &ImageBuffer, write: &mut impl Write, options: WriteOptions) -> UnitResult {
    let header_chunk = image.header().to_chunk()?;

    let filtered = filter_scanlines(
        image.pixels(), image.row_byte_count(), image.channels(),
        options.filter, options.parallel
    );

    let compressed = options.compression.compress(&filtered);
    let chunk_size = (options.chunk_size.max(1) as usize).min(MAX_DATA_SIZE);

    signature::write(write)?;
    header_chunk.write(write)?;

    for section in compressed.chunks(chunk_size) {
        write_chunk(write, ChunkType::DATA, section)?;
    }

    write_chunk(write, ChunkType::END, &[])
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::meta::chunk::Chunk;

    fn chunk_types(bytes: &[u8]) -> Vec<ChunkType> {
        let mut read = &bytes[signature::BYTES.len() ..];
        let mut types = Vec::new();

        while !read.is_empty() {
            types.push(Chunk::read(&mut read).unwrap().chunk_type);
        }

        types
    }

    #[test]
    fn file_layout(){
        let image = ImageBuffer::new(2, 2, 4, vec![
            255, 0, 0, 255,   0, 255, 0, 255,
            0, 0, 255, 255,   255, 255, 255, 0,
        ]).unwrap();

        let bytes = encode(&image, WriteOptions::default()).unwrap();
        assert_eq!(&bytes[.. 8], &signature::BYTES);
        assert_eq!(chunk_types(&bytes), vec![ChunkType::HEADER, ChunkType::DATA, ChunkType::END]);

        // the end chunk always has the same bytes
        assert_eq!(&bytes[bytes.len() - 12 ..], &[0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]);
    }

    #[test]
    fn data_is_split_into_chunks(){
        let image = ImageBuffer::from_fn(64, 64, 3, |x, y, pixel| {
            pixel.copy_from_slice(&[(x * 7 ^ y * 13) as u8, (x * y) as u8, (x + y) as u8]);
        }).unwrap();

        let options = WriteOptions::fast().with_chunk_size(1000);
        let bytes = encode(&image, options).unwrap();

        let types = chunk_types(&bytes);
        let data_chunk_count = types.iter().filter(|&&chunk_type| chunk_type == ChunkType::DATA).count();

        // 64 rows of 193 filtered bytes in a single stored block, plus zlib header and checksum
        assert_eq!(data_chunk_count, (64 * 193 + 5 + 2 + 4 + 999) / 1000);
        assert_eq!(types.first(), Some(&ChunkType::HEADER));
        assert_eq!(types.last(), Some(&ChunkType::END));
    }

    #[test]
    fn zero_chunk_size_is_one(){
        let image = ImageBuffer::new(1, 1, 1, vec![42]).unwrap();
        let bytes = encode(&image, WriteOptions::fast().with_chunk_size(0)).unwrap();

        // a stored zlib stream of two filtered bytes has 2 + 5 + 2 + 4 bytes
        let data_chunk_count = chunk_types(&bytes).iter().filter(|&&chunk_type| chunk_type == ChunkType::DATA).count();
        assert_eq!(data_chunk_count, 13);
    }

    #[test]
    fn stored_output_size(){
        let image = ImageBuffer::new(3, 2, 3, vec![9; 18]).unwrap();
        let bytes = encode(&image, WriteOptions::fast()).unwrap();

        let zlib_size = 2 + 5 + 2 * 10 + 4;
        assert_eq!(bytes.len(), 8 + (12 + 13) + (12 + zlib_size) + 12);
    }
}
