//! Writes deflate streams.
//! Splits the input into blocks and emits each block
//! in whichever representation is the smallest.

use crate::compression::bits::BitWriter;
use crate::compression::{ByteVec, Bytes, Compression};
use super::huffman::HuffmanEncoder;
use super::lz77::{self, Token};
use super::*;


/// Each huffman block contains at most this many tokens.
const MAX_BLOCK_TOKENS: usize = 16384;


/// Compress the bytes into a raw deflate stream.
/// The output is a deterministic function of the input and the compression method.
pub fn compress(uncompressed: Bytes<'_>, compression: Compression) -> ByteVec {
    let mut writer = BitWriter::with_capacity(uncompressed.len() / 2 + 64);

    match compression {
        Compression::Stored => write_stored_blocks(&mut writer, uncompressed, true),

        Compression::Fixed | Compression::Dynamic => {
            let tokens = lz77::tokenize(uncompressed);
            let block_count = ((tokens.len() + MAX_BLOCK_TOKENS - 1) / MAX_BLOCK_TOKENS).max(1);

            let mut block_start = 0;
            for block_index in 0 .. block_count {
                let token_start = block_index * MAX_BLOCK_TOKENS;
                let token_end = (token_start + MAX_BLOCK_TOKENS).min(tokens.len());
                let block_tokens = &tokens[token_start .. token_end];

                let block_end = block_start + block_tokens.iter().map(|token| token.byte_len()).sum::<usize>();
                let block_bytes = &uncompressed[block_start .. block_end];
                block_start = block_end;

                let is_final = block_index + 1 == block_count;
                write_block(&mut writer, block_tokens, block_bytes, is_final, compression);
            }
        }
    }

    writer.finish()
}


/// Emit the tokens as the smallest block type that the compression method allows.
/// On equal size, stored blocks are preferred over fixed blocks, and fixed blocks over dynamic blocks.
fn write_block(writer: &mut BitWriter, tokens: &[Token], bytes: Bytes<'_>, is_final: bool, compression: Compression) {
    let stored_size = stored_blocks_bit_size(writer.bit_len(), bytes.len());

    let fixed = FixedCodes::new();
    let fixed_size = 3 + symbols_bit_size(tokens, &fixed.literals, &fixed.distances);

    let dynamic = if compression == Compression::Dynamic {
        let dynamic = DynamicCodes::from_tokens(tokens);
        let size = 3 + dynamic.header_bit_size() + symbols_bit_size(tokens, &dynamic.literals, &dynamic.distances);
        Some((dynamic, size))
    }
    else { None };

    match dynamic {
        Some((dynamic, dynamic_size)) if dynamic_size < fixed_size && dynamic_size < stored_size => {
            writer.write_bits(is_final as u32, 1);
            writer.write_bits(BlockType::Dynamic.bits(), 2);
            dynamic.write_header(writer);
            write_symbols(writer, tokens, &dynamic.literals, &dynamic.distances);
        },

        _ if fixed_size < stored_size => {
            writer.write_bits(is_final as u32, 1);
            writer.write_bits(BlockType::Fixed.bits(), 2);
            write_symbols(writer, tokens, &fixed.literals, &fixed.distances);
        },

        _ => write_stored_blocks(writer, bytes, is_final),
    }
}

/// Write the bytes as one or more stored blocks, as a single one holds at most 65535 bytes.
/// An empty input still produces one empty block.
fn write_stored_blocks(writer: &mut BitWriter, bytes: Bytes<'_>, is_final: bool) {
    let block_count = ((bytes.len() + MAX_STORED_BLOCK_SIZE - 1) / MAX_STORED_BLOCK_SIZE).max(1);

    for block_index in 0 .. block_count {
        let start = block_index * MAX_STORED_BLOCK_SIZE;
        let block = &bytes[start .. (start + MAX_STORED_BLOCK_SIZE).min(bytes.len())];
        let length = block.len() as u16;

        let is_final_block = is_final && block_index + 1 == block_count;
        writer.write_bits(is_final_block as u32, 1);
        writer.write_bits(BlockType::Stored.bits(), 2);
        writer.write_aligned_u16_le(length);
        writer.write_aligned_u16_le(!length);
        writer.write_aligned_bytes(block);
    }
}

/// Number of bits the stored blocks would occupy when starting at the specified bit position,
/// including the padding before the lengths.
fn stored_blocks_bit_size(start_bit: usize, byte_count: usize) -> usize {
    let block_count = ((byte_count + MAX_STORED_BLOCK_SIZE - 1) / MAX_STORED_BLOCK_SIZE).max(1);
    let mut bit = start_bit;

    for block_index in 0 .. block_count {
        let block_bytes = (byte_count - block_index * MAX_STORED_BLOCK_SIZE).min(MAX_STORED_BLOCK_SIZE);
        bit += 3;
        bit = (bit + 7) / 8 * 8;
        bit += 32 + 8 * block_bytes;
    }

    bit - start_bit
}


/// The predefined huffman codes.
struct FixedCodes {
    literals: HuffmanEncoder,
    distances: HuffmanEncoder,
}

impl FixedCodes {
    fn new() -> Self {
        FixedCodes {
            literals: HuffmanEncoder::from_lengths(&fixed_literal_length_code_lengths()),
            distances: HuffmanEncoder::from_lengths(&fixed_distance_code_lengths()),
        }
    }
}


/// Huffman codes optimized for the tokens of one block,
/// together with the run length encoded code lengths that describe them.
struct DynamicCodes {
    literals: HuffmanEncoder,
    distances: HuffmanEncoder,
    code_lengths: HuffmanEncoder,

    literal_count: usize,
    distance_count: usize,
    code_length_count: usize,

    /// Code length symbols (0 to 18), each with its extra bits value.
    code_length_symbols: Vec<(u8, u8)>,
}

impl DynamicCodes {
    fn from_tokens(tokens: &[Token]) -> Self {
        let mut literal_frequencies = [0_u32; LITERAL_LENGTH_SYMBOL_COUNT];
        let mut distance_frequencies = [0_u32; DISTANCE_SYMBOL_COUNT];

        for &token in tokens {
            match token {
                Token::Literal(byte) => literal_frequencies[byte as usize] += 1,
                Token::Match { length, distance } => {
                    literal_frequencies[length_to_symbol(length as usize).0 as usize] += 1;
                    distance_frequencies[distance_to_symbol(distance as usize).0 as usize] += 1;
                }
            }
        }

        literal_frequencies[END_OF_BLOCK as usize] = 1;

        let literals = HuffmanEncoder::from_frequencies(&literal_frequencies, MAX_CODE_LENGTH);
        let distances = HuffmanEncoder::from_frequencies(&distance_frequencies, MAX_CODE_LENGTH);

        let literal_count = used_prefix_len(literals.lengths()).max(257);
        let distance_count = used_prefix_len(distances.lengths()).max(1);

        let all_lengths: CodeLengths = literals.lengths()[.. literal_count].iter()
            .chain(&distances.lengths()[.. distance_count])
            .copied().collect();

        let code_length_symbols = run_length_encode(&all_lengths);

        let mut code_length_frequencies = [0_u32; CODE_LENGTH_SYMBOL_COUNT];
        for &(symbol, _) in &code_length_symbols {
            code_length_frequencies[symbol as usize] += 1;
        }

        let code_lengths = HuffmanEncoder::from_frequencies(&code_length_frequencies, MAX_CODE_LENGTH_CODE_LENGTH);

        let code_length_count = CODE_LENGTH_ORDER.iter()
            .rposition(|&symbol| code_lengths.length(symbol as u16) != 0)
            .map_or(0, |index| index + 1)
            .max(4);

        DynamicCodes {
            literals, distances, code_lengths,
            literal_count, distance_count, code_length_count,
            code_length_symbols,
        }
    }

    fn header_bit_size(&self) -> usize {
        let code_length_bits: usize = self.code_length_symbols.iter()
            .map(|&(symbol, _)| {
                self.code_lengths.length(symbol as u16) as usize + code_length_extra_bits(symbol) as usize
            })
            .sum();

        5 + 5 + 4 + 3 * self.code_length_count + code_length_bits
    }

    fn write_header(&self, writer: &mut BitWriter) {
        writer.write_bits((self.literal_count - 257) as u32, 5);
        writer.write_bits((self.distance_count - 1) as u32, 5);
        writer.write_bits((self.code_length_count - 4) as u32, 4);

        for &symbol in &CODE_LENGTH_ORDER[.. self.code_length_count] {
            writer.write_bits(self.code_lengths.length(symbol as u16) as u32, 3);
        }

        for &(symbol, extra) in &self.code_length_symbols {
            self.code_lengths.write_symbol(writer, symbol as u16);
            writer.write_bits(extra as u32, code_length_extra_bits(symbol));
        }
    }
}

/// Number of leading entries up to and including the last nonzero length.
fn used_prefix_len(lengths: &[u8]) -> usize {
    lengths.iter().rposition(|&length| length != 0).map_or(0, |index| index + 1)
}

fn code_length_extra_bits(symbol: u8) -> u8 {
    match symbol {
        16 => 2,
        17 => 3,
        18 => 7,
        _ => 0,
    }
}

/// Compress a sequence of code lengths using the repeat symbols 16, 17, and 18.
fn run_length_encode(lengths: &[u8]) -> Vec<(u8, u8)> {
    let mut symbols = Vec::with_capacity(lengths.len());
    let mut index = 0;

    while index < lengths.len() {
        let value = lengths[index];
        let run = lengths[index ..].iter().take_while(|&&length| length == value).count();

        if value == 0 {
            let mut remaining = run;

            while remaining >= 11 {
                let repeat = remaining.min(138);
                symbols.push((18, (repeat - 11) as u8));
                remaining -= repeat;
            }

            if remaining >= 3 {
                symbols.push((17, (remaining - 3) as u8));
                remaining = 0;
            }

            symbols.extend(std::iter::repeat((0, 0)).take(remaining));
        }
        else {
            symbols.push((value, 0));
            let mut remaining = run - 1;

            while remaining >= 3 {
                let repeat = remaining.min(6);
                symbols.push((16, (repeat - 3) as u8));
                remaining -= repeat;
            }

            symbols.extend(std::iter::repeat((value, 0)).take(remaining));
        }

        index += run;
    }

    symbols
}


/// Number of bits the tokens and the end of block symbol occupy with these codes.
fn symbols_bit_size(tokens: &[Token], literals: &HuffmanEncoder, distances: &HuffmanEncoder) -> usize {
    let token_bits: usize = tokens.iter()
        .map(|&token| match token {
            Token::Literal(byte) => literals.length(byte as u16) as usize,
            Token::Match { length, distance } => {
                let (length_symbol, length_extra_bits, _) = length_to_symbol(length as usize);
                let (distance_symbol, distance_extra_bits, _) = distance_to_symbol(distance as usize);

                literals.length(length_symbol) as usize + length_extra_bits as usize
                    + distances.length(distance_symbol) as usize + distance_extra_bits as usize
            }
        })
        .sum();

    token_bits + literals.length(END_OF_BLOCK) as usize
}

/// Write the tokens and the end of block symbol.
fn write_symbols(writer: &mut BitWriter, tokens: &[Token], literals: &HuffmanEncoder, distances: &HuffmanEncoder) {
    for &token in tokens {
        match token {
            Token::Literal(byte) => literals.write_symbol(writer, byte as u16),
            Token::Match { length, distance } => {
                let (length_symbol, length_extra_bits, length_extra) = length_to_symbol(length as usize);
                literals.write_symbol(writer, length_symbol);
                writer.write_bits(length_extra, length_extra_bits);

                let (distance_symbol, distance_extra_bits, distance_extra) = distance_to_symbol(distance as usize);
                distances.write_symbol(writer, distance_symbol);
                writer.write_bits(distance_extra, distance_extra_bits);
            }
        }
    }

    literals.write_symbol(writer, END_OF_BLOCK);
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_stored_stream(){
        let compressed = compress(&[], Compression::Stored);
        assert_eq!(compressed, vec![0b001, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn stored_stream_layout(){
        let compressed = compress(b"abc", Compression::Stored);
        assert_eq!(compressed, vec![0b001, 3, 0, 0xFC, 0xFF, b'a', b'b', b'c']);
    }

    #[test]
    fn stored_size_estimate_matches_writer(){
        for &(start_bits, byte_count) in &[(0, 0), (3, 10), (7, 65535), (13, 65536), (0, 131_071)] {
            let mut writer = BitWriter::default();
            writer.write_bits(0, start_bits);

            let bytes = vec![7_u8; byte_count];
            write_stored_blocks(&mut writer, &bytes, true);
            assert_eq!(writer.bit_len() - start_bits as usize, stored_blocks_bit_size(start_bits as usize, byte_count));
        }
    }

    #[test]
    fn dynamic_header_size_estimate_matches_writer(){
        let tokens = lz77::tokenize(b"this is some text that is repeated, some text that is repeated");
        let codes = DynamicCodes::from_tokens(&tokens);

        let mut writer = BitWriter::default();
        codes.write_header(&mut writer);
        assert_eq!(writer.bit_len(), codes.header_bit_size());
    }

    #[test]
    fn run_lengths(){
        let mut lengths = vec![0_u8; 150];
        lengths.extend_from_slice(&[5; 8]);
        lengths.extend_from_slice(&[0, 0, 3]);

        let symbols = run_length_encode(&lengths);
        assert_eq!(symbols, vec![
            (18, 127), (18, 1),
            (5, 0), (16, 3), (5, 0),
            (0, 0), (0, 0), (3, 0),
        ]);
    }

    #[test]
    fn compressible_data_uses_huffman_blocks(){
        let bytes = b"ab".repeat(1000);
        let compressed = compress(&bytes, Compression::Dynamic);
        assert!(compressed.len() < 100);

        // the first block is not stored
        assert_ne!((compressed[0] >> 1) & 0b11, BlockType::Stored.bits() as u8);
    }

    #[test]
    fn incompressible_data_falls_back_to_stored_blocks(){
        // bytes without much repetition
        let bytes: Vec<u8> = (0 .. 256_u32).flat_map(|a| (0 .. 4_u32).map(move |b| (a * 4 + b * 61) as u8)).take(300).collect();
        let compressed = compress(&bytes, Compression::Fixed);
        assert!(compressed.len() <= bytes.len() + 5);
    }
}
