//! Canonical huffman codes for deflate.
//! Both sides only exchange the code length of each symbol.
//! The codes themselves are derived from the lengths:
//! shorter codes come first, and codes of equal length are assigned in ascending symbol order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use crate::compression::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};
use super::MAX_CODE_LENGTH;


/// Assigns a canonical code to each symbol, given the length of each symbol's code.
/// Symbols with a length of zero do not occur and receive no code.
pub fn canonical_codes(lengths: &[u8]) -> Vec<u16> {
    let mut count_per_length = [0_u16; MAX_CODE_LENGTH as usize + 1];
    for &length in lengths {
        count_per_length[length as usize] += 1;
    }

    count_per_length[0] = 0;

    // the numerically smallest code of each length
    let mut next_code = [0_u16; MAX_CODE_LENGTH as usize + 1];
    let mut code = 0_u16;
    for length in 1 ..= MAX_CODE_LENGTH as usize {
        code = (code + count_per_length[length - 1]) << 1;
        next_code[length] = code;
    }

    lengths.iter()
        .map(|&length| {
            if length == 0 { 0 }
            else {
                let code = next_code[length as usize];
                next_code[length as usize] += 1;
                code
            }
        })
        .collect()
}


/// Encodes symbols into a bit stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanEncoder {
    lengths: Vec<u8>,
    codes: Vec<u16>,
}

impl HuffmanEncoder {

    /// Use the canonical code described by these lengths.
    pub fn from_lengths(lengths: &[u8]) -> Self {
        HuffmanEncoder { codes: canonical_codes(lengths), lengths: lengths.to_vec() }
    }

    /// Build an optimal code for these symbol frequencies that uses no code longer than `max_length`.
    pub fn from_frequencies(frequencies: &[u32], max_length: u8) -> Self {
        Self::from_lengths(&length_limited_code_lengths(frequencies, max_length))
    }

    /// The code length of each symbol.
    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    /// The number of bits used to encode the symbol.
    #[inline]
    pub fn length(&self, symbol: u16) -> u8 {
        self.lengths[symbol as usize]
    }

    /// Append the code of the symbol to the bit stream.
    #[inline]
    pub fn write_symbol(&self, writer: &mut BitWriter, symbol: u16) {
        let length = self.lengths[symbol as usize];
        debug_assert_ne!(length, 0, "symbol {} has no code", symbol);
        writer.write_code(self.codes[symbol as usize], length);
    }
}


/// Decodes symbols from a bit stream, reading one bit at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanDecoder {

    /// Number of codes per code length.
    count_per_length: [u16; MAX_CODE_LENGTH as usize + 1],

    /// All symbols with a code, ordered by code length and then by symbol value,
    /// which is exactly the order of their canonical codes.
    sorted_symbols: Vec<u16>,
}

impl HuffmanDecoder {

    /// Prepare decoding the canonical code described by these lengths.
    /// Returns an error if the lengths describe more codes than fit into the code space.
    /// Incomplete codes are accepted, as the format allows a single distance code.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        let mut count_per_length = [0_u16; MAX_CODE_LENGTH as usize + 1];

        for &length in lengths {
            if length > MAX_CODE_LENGTH {
                return Err(Error::corrupt("huffman code length too large"));
            }

            count_per_length[length as usize] += 1;
        }

        count_per_length[0] = 0;

        // each length doubles the code space, each code uses up one entry
        let mut remaining_codes = 1_i32;
        for &count in &count_per_length[1..] {
            remaining_codes = (remaining_codes << 1) - count as i32;

            if remaining_codes < 0 {
                return Err(Error::corrupt("over-subscribed huffman code"));
            }
        }

        let mut offsets = [0_usize; MAX_CODE_LENGTH as usize + 2];
        for length in 1 ..= MAX_CODE_LENGTH as usize {
            offsets[length + 1] = offsets[length] + count_per_length[length] as usize;
        }

        let mut sorted_symbols = vec![0_u16; offsets[MAX_CODE_LENGTH as usize + 1]];
        for (symbol, &length) in lengths.iter().enumerate() {
            if length != 0 {
                sorted_symbols[offsets[length as usize]] = symbol as u16;
                offsets[length as usize] += 1;
            }
        }

        Ok(HuffmanDecoder { count_per_length, sorted_symbols })
    }

    /// Read bits until they form a complete code, and return the symbol of that code.
    pub fn decode_symbol(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let mut code = 0_i32; // the bits read so far
        let mut first = 0_i32; // first code of the current length
        let mut index = 0_i32; // index of the first code of the current length in the sorted symbols

        for &count in &self.count_per_length[1..] {
            code |= reader.read_bits(1)? as i32;
            let count = count as i32;

            if code - first < count {
                return Ok(self.sorted_symbols[(index + code - first) as usize]);
            }

            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }

        Err(Error::corrupt("invalid huffman code"))
    }
}


/// A node of the huffman tree, ordered such that the `BinaryHeap` pops the least frequent node first.
/// Nodes with equal frequency are ordered by their index, which makes the code deterministic.
#[derive(Eq, PartialEq)]
struct HeapNode {
    frequency: u64,
    index: usize,
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other.frequency.cmp(&self.frequency)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compute the code length of each symbol, such that frequent symbols get short codes,
/// no code is longer than `max_length`, and the code is complete.
/// Symbols with a frequency of zero receive no code.
///
/// If fewer than two symbols occur, two codes of length one are assigned anyway,
/// because decoders reject incomplete code length alphabets.
pub fn length_limited_code_lengths(frequencies: &[u32], max_length: u8) -> Vec<u8> {
    debug_assert!(frequencies.len() >= 2);
    debug_assert!(max_length >= 1 && max_length <= MAX_CODE_LENGTH);

    let mut lengths = vec![0_u8; frequencies.len()];

    let mut used_symbols: Vec<usize> = (0 .. frequencies.len())
        .filter(|&symbol| frequencies[symbol] != 0)
        .collect();

    if used_symbols.len() < 2 {
        let symbol = used_symbols.first().copied().unwrap_or(0);
        lengths[symbol] = 1;
        lengths[if symbol == 0 { 1 } else { 0 }] = 1;
        return lengths;
    }

    // the leaves are the used symbols, the following nodes are created while merging
    let leaf_count = used_symbols.len();
    let mut parents = vec![0_usize; 2 * leaf_count - 1];
    let mut heap: BinaryHeap<HeapNode> = used_symbols.iter().enumerate()
        .map(|(index, &symbol)| HeapNode { frequency: frequencies[symbol] as u64, index })
        .collect();

    let mut next_index = leaf_count;
    while let Some(first) = heap.pop() {
        let second = match heap.pop() {
            Some(second) => second,
            None => break, // only the root is left
        };

        parents[first.index] = next_index;
        parents[second.index] = next_index;
        heap.push(HeapNode { frequency: first.frequency + second.frequency, index: next_index });
        next_index += 1;
    }

    // parents are always created after their children,
    // so walking backwards from the root visits each parent before its children
    let root = parents.len() - 1;
    let mut depths = vec![0_usize; parents.len()];
    for node in (0 .. root).rev() {
        depths[node] = depths[parents[node]] + 1;
    }

    let max_length = max_length as usize;
    let mut count_per_length = vec![0_u32; leaf_count.max(max_length) + 1];
    for &depth in &depths[.. leaf_count] {
        count_per_length[depth] += 1;
    }

    // move all overlong codes to the maximum length, which over-subscribes the code space,
    // then lengthen shorter codes until the code fits again
    let overlong: u32 = count_per_length[max_length + 1 ..].iter().sum();
    if overlong > 0 {
        count_per_length[max_length] += overlong;
        count_per_length.truncate(max_length + 1);

        let mut kraft_sum: u64 = (1 ..= max_length)
            .map(|length| (count_per_length[length] as u64) << (max_length - length))
            .sum();

        while kraft_sum > 1 << max_length {
            count_per_length[max_length] -= 1;

            for length in (1 .. max_length).rev() {
                if count_per_length[length] != 0 {
                    count_per_length[length] -= 1;
                    count_per_length[length + 1] += 2;
                    break;
                }
            }

            kraft_sum -= 1;
        }
    }

    // the rarest symbols receive the longest codes
    used_symbols.sort_by_key(|&symbol| (frequencies[symbol], symbol));

    let mut rarest_first = used_symbols.into_iter();
    for length in (1 ..= max_length).rev() {
        for _ in 0 .. count_per_length[length] {
            if let Some(symbol) = rarest_first.next() {
                lengths[symbol] = length as u8;
            }
        }
    }

    lengths
}


#[cfg(test)]
mod test {
    use super::*;

    fn kraft_sum(lengths: &[u8]) -> f64 {
        lengths.iter().filter(|&&length| length > 0)
            .map(|&length| 0.5_f64.powi(length as i32)).sum()
    }

    #[test]
    fn canonical_codes_of_rfc_example(){
        // lengths (3, 3, 3, 3, 3, 2, 4, 4) for the symbols A to H
        let codes = canonical_codes(&[3, 3, 3, 3, 3, 2, 4, 4]);
        assert_eq!(codes, vec![0b010, 0b011, 0b100, 0b101, 0b110, 0b00, 0b1110, 0b1111]);
    }

    #[test]
    fn decode_what_was_encoded(){
        let lengths = [3, 3, 3, 3, 3, 2, 4, 4, 0, 0];
        let encoder = HuffmanEncoder::from_lengths(&lengths);
        let decoder = HuffmanDecoder::from_lengths(&lengths).unwrap();

        let symbols = [5_u16, 0, 7, 6, 1, 2, 3, 4, 5, 5];
        let mut writer = BitWriter::default();
        for &symbol in &symbols { encoder.write_symbol(&mut writer, symbol); }

        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        for &symbol in &symbols {
            assert_eq!(decoder.decode_symbol(&mut reader).unwrap(), symbol);
        }
    }

    #[test]
    fn reject_over_subscribed_code(){
        assert!(matches!(HuffmanDecoder::from_lengths(&[1, 1, 1]), Err(Error::CorruptStream(_))));
        assert!(matches!(HuffmanDecoder::from_lengths(&[16, 1]), Err(Error::CorruptStream(_))));
    }

    #[test]
    fn unassigned_code_is_corrupt(){
        // a single code of length one leaves the code `1` unassigned
        let decoder = HuffmanDecoder::from_lengths(&[1, 0]).unwrap();
        let mut reader = BitReader::new(&[0xFF, 0xFF]);
        assert!(matches!(decoder.decode_symbol(&mut reader), Err(Error::CorruptStream(_))));
    }

    #[test]
    fn frequent_symbols_get_short_codes(){
        let lengths = length_limited_code_lengths(&[100, 1, 1, 50, 0, 2], 15);
        assert_eq!(lengths[4], 0);
        assert!(lengths[0] <= lengths[3]);
        assert!(lengths[3] <= lengths[5]);
        assert!(lengths[5] <= lengths[1]);
        assert_eq!(kraft_sum(&lengths), 1.0);
    }

    #[test]
    fn lengths_are_limited(){
        // fibonacci frequencies produce the most unbalanced tree
        let mut frequencies = vec![1_u32, 1];
        while frequencies.len() < 30 {
            let next = frequencies[frequencies.len() - 1] + frequencies[frequencies.len() - 2];
            frequencies.push(next);
        }

        let deflate_limit = length_limited_code_lengths(&frequencies, 15);
        assert!(deflate_limit.iter().all(|&length| length >= 1 && length <= 15));
        assert_eq!(kraft_sum(&deflate_limit), 1.0);

        let limited = length_limited_code_lengths(&frequencies, 7);
        assert!(limited.iter().all(|&length| length >= 1 && length <= 7));
        assert_eq!(kraft_sum(&limited), 1.0);
    }

    #[test]
    fn single_symbol_gets_complete_code(){
        let lengths = length_limited_code_lengths(&[0, 0, 9, 0], 7);
        assert_eq!(lengths, vec![1, 0, 1, 0]);

        let lengths = length_limited_code_lengths(&[0, 0, 0], 7);
        assert_eq!(lengths, vec![1, 1, 0]);
        assert!(HuffmanDecoder::from_lengths(&lengths).is_ok());
    }
}
