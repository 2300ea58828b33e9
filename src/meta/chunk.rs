//! The chunks that make up a png file.
//! Each chunk consists of its length, its type, its data, and a checksum.

use std::fmt;
use bit_field::BitField;
use crate::checksum::Crc32;
use crate::compression::{ByteVec, Bytes};
use crate::error::{usize_to_u32, Error, Result, UnitResult};
use crate::io::*;


/// Chunks contain at most this many bytes of data.
pub const MAX_DATA_SIZE: usize = i32::MAX as usize;

/// Reading chunk data does not allocate more than this many bytes at once,
/// so that a damaged length field cannot cause a huge allocation.
const READ_ALLOCATION_LIMIT: usize = 1 << 16;


/// The four ascii letters that identify the contents of a chunk.
/// The case of each letter is a property flag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {

    /// The image header, which must be the first chunk.
    pub const HEADER: ChunkType = ChunkType(*b"IHDR");

    /// A section of the compressed pixel data.
    pub const DATA: ChunkType = ChunkType(*b"IDAT");

    /// The palette, which is only a suggestion for the truecolor images of this crate.
    pub const PALETTE: ChunkType = ChunkType(*b"PLTE");

    /// Marks the end of the file.
    pub const END: ChunkType = ChunkType(*b"IEND");

    /// Check that all bytes are ascii letters and that the reserved bit is not set.
    pub fn validate(self) -> UnitResult {
        if !self.0.iter().all(|byte| byte.is_ascii_alphabetic()) {
            return Err(Error::format("chunk type contains bytes other than ascii letters"));
        }

        if self.is_reserved_bit_set() {
            return Err(Error::format(format!("chunk type `{}` has the reserved bit set", self)));
        }

        Ok(())
    }

    /// A decoder must understand a critical chunk to display the image.
    /// Unknown ancillary chunks can be skipped.
    pub fn is_critical(self) -> bool {
        !self.0[0].get_bit(5)
    }

    /// Whether this chunk type is part of the png standard, as opposed to an application specific type.
    pub fn is_public(self) -> bool {
        !self.0[1].get_bit(5)
    }

    /// Valid chunk types have an uppercase third letter.
    pub fn is_reserved_bit_set(self) -> bool {
        self.0[2].get_bit(5)
    }

    /// Whether editors may copy this chunk even if they modified critical chunks.
    pub fn is_safe_to_copy(self) -> bool {
        self.0[3].get_bit(5)
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "ChunkType({})", self)
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            write!(formatter, "{}", std::ascii::escape_default(byte))?;
        }

        Ok(())
    }
}


/// A single section of a png file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {

    /// Identifies the contents of this chunk.
    pub chunk_type: ChunkType,

    /// The contents of this chunk.
    pub data: ByteVec,
}

impl Chunk {

    /// Create a chunk with the specified type and data.
    pub fn new(chunk_type: ChunkType, data: ByteVec) -> Self {
        Chunk { chunk_type, data }
    }

    /// The checksum over the type and the data of this chunk.
    pub fn crc(&self) -> u32 {
        Crc32::new().update(&self.chunk_type.0).update(&self.data).finish()
    }

    /// Number of bytes this chunk occupies in a file, including length, type, and checksum.
    pub fn byte_size(&self) -> usize {
        4 + 4 + self.data.len() + 4
    }

    /// Write the length, type, data, and the freshly computed checksum.
    pub fn write(&self, write: &mut impl Write) -> UnitResult {
        write_chunk(write, self.chunk_type, &self.data)
    }

    /// Read a chunk and verify its checksum.
    /// The checksum is verified before the type is validated,
    /// so that any damage to the type or the data is reported as an integrity error.
    pub fn read(read: &mut impl Read) -> Result<Self> {
        let length = u32::read(read)? as usize;
        if length > MAX_DATA_SIZE {
            return Err(Error::format("chunk length exceeds the maximum"));
        }

        let mut chunk_type = [0_u8; 4];
        u8::read_slice(read, &mut chunk_type)?;

        let data = u8::read_vec(read, length, READ_ALLOCATION_LIMIT, Some(MAX_DATA_SIZE))?;
        let chunk = Chunk::new(ChunkType(chunk_type), data);

        let expected_crc = u32::read(read)?;
        if chunk.crc() != expected_crc {
            return Err(Error::integrity(format!("crc of `{}` chunk", chunk.chunk_type)));
        }

        chunk.chunk_type.validate()?;
        Ok(chunk)
    }
}


/// Write a chunk without taking ownership of its data.
pub fn write_chunk(write: &mut impl Write, chunk_type: ChunkType, data: Bytes<'_>) -> UnitResult {
    if data.len() > MAX_DATA_SIZE {
        return Err(Error::format("chunk data too large"));
    }

    usize_to_u32(data.len(), "chunk data size")?.write(write)?;
    u8::write_slice(write, &chunk_type.0)?;
    u8::write_slice(write, data)?;
    Crc32::new().update(&chunk_type.0).update(data).finish().write(write)
}
