
//! Raw deflate streams as specified in RFC 1951.
//! Combines LZ77 back references with huffman coding, organized in blocks.
// see https://www.rfc-editor.org/rfc/rfc1951

mod huffman;
mod lz77;
mod encode;
mod decode;

pub use self::encode::compress;
pub use self::decode::decompress;
pub(crate) use self::decode::decompress_with_remainder;

use smallvec::SmallVec;
use crate::error::{Error, Result};


/// A stored block can contain at most this many bytes.
pub const MAX_STORED_BLOCK_SIZE: usize = 65535;

/// Back references can reach at most this many bytes into the past.
pub const WINDOW_SIZE: usize = 32768;

/// Shorter matches are encoded as literals.
pub const MIN_MATCH_LENGTH: usize = 3;

/// The longest match a single length symbol can express.
pub const MAX_MATCH_LENGTH: usize = 258;

/// The literal/length symbol that terminates each huffman block.
const END_OF_BLOCK: u16 = 256;

/// Number of literal/length symbols that may appear in a valid stream.
const LITERAL_LENGTH_SYMBOL_COUNT: usize = 286;

/// Number of distance symbols that may appear in a valid stream.
const DISTANCE_SYMBOL_COUNT: usize = 30;

/// Number of symbols in the alphabet that encodes the code lengths of a dynamic block.
const CODE_LENGTH_SYMBOL_COUNT: usize = 19;

/// Longest huffman code allowed for literals, lengths, and distances.
const MAX_CODE_LENGTH: u8 = 15;

/// Longest huffman code allowed for the code length alphabet.
const MAX_CODE_LENGTH_CODE_LENGTH: u8 = 7;

/// The order in which the code lengths of the code length alphabet are transmitted.
const CODE_LENGTH_ORDER: [usize; CODE_LENGTH_SYMBOL_COUNT] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Smallest match length of each length symbol, starting at symbol 257.
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31,
    35, 43, 51, 59, 67, 83, 99, 115, 131, 163, 195, 227, 258,
];

/// Number of extra bits following each length symbol, starting at symbol 257.
const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2,
    3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Smallest distance of each distance symbol.
const DISTANCE_BASE: [u16; DISTANCE_SYMBOL_COUNT] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193,
    257, 385, 513, 769, 1025, 1537, 2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Number of extra bits following each distance symbol.
const DISTANCE_EXTRA_BITS: [u8; DISTANCE_SYMBOL_COUNT] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6,
    7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13, 13,
];


/// Code lengths of all literal/length symbols and all distance symbols of a dynamic block.
type CodeLengths = SmallVec<[u8; 512]>;


/// The three kinds of deflate blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {

    /// Raw bytes, prefixed with their length.
    Stored,

    /// Huffman coded with the code tables predefined by the format.
    Fixed,

    /// Huffman coded with code tables transmitted at the start of the block.
    Dynamic,
}

impl BlockType {

    /// The two-bit `BTYPE` value of the block header.
    pub fn bits(self) -> u32 {
        match self {
            BlockType::Stored => 0b00,
            BlockType::Fixed => 0b01,
            BlockType::Dynamic => 0b10,
        }
    }

    /// Parse the two-bit `BTYPE` value of the block header.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            0b00 => Ok(BlockType::Stored),
            0b01 => Ok(BlockType::Fixed),
            0b10 => Ok(BlockType::Dynamic),
            _ => Err(Error::InvalidBlockType),
        }
    }
}


/// Code lengths of the predefined literal/length code.
/// Contains the two unused symbols 286 and 287 so that the code is complete.
fn fixed_literal_length_code_lengths() -> [u8; 288] {
    let mut lengths = [0_u8; 288];
    lengths[0 ..= 143].iter_mut().for_each(|length| *length = 8);
    lengths[144 ..= 255].iter_mut().for_each(|length| *length = 9);
    lengths[256 ..= 279].iter_mut().for_each(|length| *length = 7);
    lengths[280 ..= 287].iter_mut().for_each(|length| *length = 8);
    lengths
}

/// Code lengths of the predefined distance code.
/// Contains the two unused symbols 30 and 31 so that the code is complete.
fn fixed_distance_code_lengths() -> [u8; 32] {
    [5; 32]
}

/// The symbol, the number of extra bits, and the extra bits value for a match length.
#[inline]
fn length_to_symbol(length: usize) -> (u16, u8, u32) {
    debug_assert!((MIN_MATCH_LENGTH ..= MAX_MATCH_LENGTH).contains(&length));

    let index = LENGTH_BASE.partition_point(|&base| base as usize <= length) - 1;
    (257 + index as u16, LENGTH_EXTRA_BITS[index], (length - LENGTH_BASE[index] as usize) as u32)
}

/// The symbol, the number of extra bits, and the extra bits value for a match distance.
#[inline]
fn distance_to_symbol(distance: usize) -> (u16, u8, u32) {
    debug_assert!((1 ..= WINDOW_SIZE).contains(&distance));

    let index = DISTANCE_BASE.partition_point(|&base| base as usize <= distance) - 1;
    (index as u16, DISTANCE_EXTRA_BITS[index], (distance - DISTANCE_BASE[index] as usize) as u32)
}
