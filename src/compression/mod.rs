
//! Contains the compression method definition
//! and methods to compress and decompress image data.

pub mod bits;
pub mod deflate;
pub mod zlib;

use crate::error::Result;


/// A byte vector.
pub type ByteVec = Vec<u8>;

/// A byte slice.
pub type Bytes<'s> = &'s [u8];


/// Specifies which deflate blocks the encoder may produce.
/// All methods are lossless. Every decoder supports all methods.
/// Use stored data for fastest writing speeds.
/// Use dynamic compression for the smallest files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {

    /// Store the filtered bytes without any compression.
    /// Produces large files that can be written very quickly.
    /// The file is a few bytes larger than the raw pixels.
    Stored,

    /// Replaces repeated byte sequences with back references,
    /// and codes the result with the huffman tables predefined by the format.
    /// Saves the space of the table descriptions, which works well for small images.
    /// Falls back to stored blocks where compression would not help.
    Fixed,

    /// Replaces repeated byte sequences with back references,
    /// and codes the result with huffman tables optimized for each block.
    /// Produces the smallest files, at the cost of some more computation.
    /// Falls back to fixed or stored blocks where those are smaller.
    Dynamic,
}

impl Default for Compression {
    fn default() -> Self { Compression::Dynamic }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} compression", match self {
            Compression::Stored => "no",
            Compression::Fixed => "fixed huffman",
            Compression::Dynamic => "dynamic huffman",
        })
    }
}

impl Compression {

    /// Compress the bytes into a zlib stream.
    pub fn compress(self, uncompressed: Bytes<'_>) -> ByteVec {
        zlib::compress(uncompressed, self)
    }
}


/// Compress the bytes into a zlib stream, as stored in png image data.
pub fn compress(uncompressed: Bytes<'_>, compression: Compression) -> ByteVec {
    zlib::compress(uncompressed, compression)
}

/// Decompress a zlib stream of any compression method.
/// Fails if the stream would inflate to more than `max_byte_size` bytes.
pub fn decompress(compressed: Bytes<'_>, max_byte_size: Option<usize>) -> Result<ByteVec> {
    zlib::decompress(compressed, max_byte_size)
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dynamic_is_smallest_for_redundant_data(){
        let data: Vec<u8> = (0 .. 20_000_u32).map(|index| (index / 40 % 7) as u8 * 30).collect();

        let stored = Compression::Stored.compress(&data);
        let fixed = Compression::Fixed.compress(&data);
        let dynamic = Compression::Dynamic.compress(&data);

        assert!(fixed.len() < stored.len());
        assert!(dynamic.len() <= fixed.len());

        for compressed in &[stored, fixed, dynamic] {
            assert_eq!(decompress(compressed, Some(data.len())).unwrap(), data);
        }
    }

    #[test]
    fn deterministic(){
        let data = b"the same input always produces the same output, the same output".repeat(50);
        assert_eq!(compress(&data, Compression::Dynamic), compress(&data, Compression::Dynamic));
    }

    #[test]
    fn display(){
        assert_eq!(Compression::default().to_string(), "dynamic huffman compression");
    }
}
