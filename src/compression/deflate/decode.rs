//! Reads deflate streams.

use crate::compression::bits::BitReader;
use crate::compression::{ByteVec, Bytes};
use crate::error::{Error, Result, UnitResult};
use super::huffman::HuffmanDecoder;
use super::*;


/// Decompress a raw deflate stream.
/// Bytes after the final block are ignored.
///
/// If `max_byte_size` is specified, fails as soon as the output would grow larger than that,
/// which protects against inputs that expand to huge amounts of data.
/// Either returns the complete data or an error, never partial data.
pub fn decompress(compressed: Bytes<'_>, max_byte_size: Option<usize>) -> Result<ByteVec> {
    decompress_with_remainder(compressed, max_byte_size).map(|(decompressed, _)| decompressed)
}

/// Decompress a raw deflate stream and also return the bytes following the final block.
pub(crate) fn decompress_with_remainder(compressed: Bytes<'_>, max_byte_size: Option<usize>) -> Result<(ByteVec, Bytes<'_>)> {
    let mut reader = BitReader::new(compressed);
    let mut output = Output::new(max_byte_size, compressed.len());
    let fixed_literals = HuffmanDecoder::from_lengths(&fixed_literal_length_code_lengths())?;
    let fixed_distances = HuffmanDecoder::from_lengths(&fixed_distance_code_lengths())?;

    loop {
        let is_final = reader.read_bit()?;

        match BlockType::from_bits(reader.read_bits(2)?)? {
            BlockType::Stored => inflate_stored_block(&mut reader, &mut output)?,
            BlockType::Fixed => inflate_huffman_block(&mut reader, &mut output, &fixed_literals, &fixed_distances)?,
            BlockType::Dynamic => {
                let (literals, distances) = read_dynamic_codes(&mut reader)?;
                inflate_huffman_block(&mut reader, &mut output, &literals, &distances)?;
            }
        }

        if is_final { break; }
    }

    Ok((output.bytes, reader.remaining_aligned_bytes()))
}


/// The decompressed bytes, with an optional size limit.
struct Output {
    bytes: ByteVec,
    max_byte_size: usize,
}

impl Output {
    fn new(max_byte_size: Option<usize>, compressed_byte_size: usize) -> Self {
        let max_byte_size = max_byte_size.unwrap_or(usize::MAX);

        // most streams expand, but do not reserve more than the limit
        let capacity = compressed_byte_size.saturating_mul(4).min(max_byte_size).min(1 << 26);
        Output { bytes: Vec::with_capacity(capacity), max_byte_size }
    }

    #[inline]
    fn reserve(&self, additional: usize) -> UnitResult {
        if additional > self.max_byte_size - self.bytes.len() {
            Err(Error::corrupt("decompressed data is larger than expected"))
        }
        else { Ok(()) }
    }

    #[inline]
    fn push(&mut self, byte: u8) -> UnitResult {
        self.reserve(1)?;
        self.bytes.push(byte);
        Ok(())
    }

    /// Append a copy of earlier output. The ranges may overlap,
    /// in which case the copied bytes include bytes produced by this very copy.
    #[inline]
    fn copy_back_reference(&mut self, distance: usize, length: usize) -> UnitResult {
        if distance > self.bytes.len() {
            return Err(Error::corrupt("back reference points before the start of the data"));
        }

        self.reserve(length)?;

        // byte by byte, as the source may not be fully written yet when the distance is smaller than the length
        let start = self.bytes.len() - distance;
        for index in start .. start + length {
            let byte = self.bytes[index];
            self.bytes.push(byte);
        }

        Ok(())
    }
}


fn inflate_stored_block(reader: &mut BitReader<'_>, output: &mut Output) -> UnitResult {
    let length = reader.read_aligned_u16_le()?;
    let length_complement = reader.read_aligned_u16_le()?;

    if length != !length_complement {
        return Err(Error::corrupt("stored block length does not match its complement"));
    }

    let bytes = reader.read_aligned_bytes(length as usize)?;
    output.reserve(bytes.len())?;
    output.bytes.extend_from_slice(bytes);
    Ok(())
}

fn inflate_huffman_block(
    reader: &mut BitReader<'_>, output: &mut Output,
    literals: &HuffmanDecoder, distances: &HuffmanDecoder,
) -> UnitResult
{
    loop {
        let symbol = literals.decode_symbol(reader)?;

        match symbol {
            0 ..= 255 => output.push(symbol as u8)?,
            END_OF_BLOCK => return Ok(()),

            257 ..= 285 => {
                let length_index = (symbol - 257) as usize;
                let length = LENGTH_BASE[length_index] as usize
                    + reader.read_bits(LENGTH_EXTRA_BITS[length_index])? as usize;

                let distance_index = distances.decode_symbol(reader)? as usize;
                if distance_index >= DISTANCE_SYMBOL_COUNT {
                    return Err(Error::corrupt("invalid distance symbol"));
                }

                let distance = DISTANCE_BASE[distance_index] as usize
                    + reader.read_bits(DISTANCE_EXTRA_BITS[distance_index])? as usize;

                output.copy_back_reference(distance, length)?;
            },

            _ => return Err(Error::corrupt("invalid literal or length symbol")),
        }
    }
}

/// Read the code length tables at the start of a dynamic block.
fn read_dynamic_codes(reader: &mut BitReader<'_>) -> Result<(HuffmanDecoder, HuffmanDecoder)> {
    let literal_count = reader.read_bits(5)? as usize + 257;
    let distance_count = reader.read_bits(5)? as usize + 1;
    let code_length_count = reader.read_bits(4)? as usize + 4;

    if literal_count > LITERAL_LENGTH_SYMBOL_COUNT || distance_count > DISTANCE_SYMBOL_COUNT {
        return Err(Error::corrupt("too many literal/length or distance symbols"));
    }

    let mut code_length_code_lengths = [0_u8; CODE_LENGTH_SYMBOL_COUNT];
    for &symbol in &CODE_LENGTH_ORDER[.. code_length_count] {
        code_length_code_lengths[symbol] = reader.read_bits(3)? as u8;
    }

    let code_length_decoder = HuffmanDecoder::from_lengths(&code_length_code_lengths)?;

    let total_count = literal_count + distance_count;
    let mut lengths = CodeLengths::new();

    while lengths.len() < total_count {
        let symbol = code_length_decoder.decode_symbol(reader)?;

        let (value, repetitions) = match symbol {
            0 ..= 15 => (symbol as u8, 1),

            16 => {
                let previous = *lengths.last()
                    .ok_or_else(|| Error::corrupt("code length repetition without a previous length"))?;

                (previous, 3 + reader.read_bits(2)? as usize)
            },

            17 => (0, 3 + reader.read_bits(3)? as usize),
            18 => (0, 11 + reader.read_bits(7)? as usize),
            _ => return Err(Error::corrupt("invalid code length symbol")),
        };

        if lengths.len() + repetitions > total_count {
            return Err(Error::corrupt("code length repetition exceeds the table"));
        }

        lengths.extend(std::iter::repeat(value).take(repetitions));
    }

    let (literal_lengths, distance_lengths) = lengths.split_at(literal_count);

    if literal_lengths[END_OF_BLOCK as usize] == 0 {
        return Err(Error::corrupt("missing end of block code"));
    }

    Ok((
        HuffmanDecoder::from_lengths(literal_lengths)?,
        HuffmanDecoder::from_lengths(distance_lengths)?,
    ))
}
