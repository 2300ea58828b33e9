//! Bit-level reading and writing for deflate streams.
//! Bits are packed into bytes starting at the least significant bit.
//! Huffman codes are the exception: their most significant bit comes first.

use lebe::prelude::*;
use crate::error::{Error, Result};
use super::{ByteVec, Bytes};


/// Reverse the lowest `length` bits of the code.
#[inline]
pub fn reverse_bits(code: u16, length: u8) -> u16 {
    debug_assert!(length <= 16);
    if length == 0 { 0 } else { code.reverse_bits() >> (16 - length as u32) }
}


/// Accumulates bits and flushes complete bytes into a vector.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: ByteVec,
    bit_buffer: u64,
    bit_count: u32,
}

impl BitWriter {

    /// Create an empty writer with space for the specified number of bytes.
    pub fn with_capacity(byte_capacity: usize) -> Self {
        BitWriter { bytes: Vec::with_capacity(byte_capacity), bit_buffer: 0, bit_count: 0 }
    }

    /// Append the lowest `count` bits of `value`, least significant bit first.
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u8) {
        debug_assert!(count <= 32);
        debug_assert!(count == 32 || value >> count == 0, "value has more bits than specified");

        self.bit_buffer |= (value as u64) << self.bit_count;
        self.bit_count += count as u32;

        while self.bit_count >= 8 {
            self.bytes.push(self.bit_buffer as u8);
            self.bit_buffer >>= 8;
            self.bit_count -= 8;
        }
    }

    /// Append a huffman code, most significant bit first.
    #[inline]
    pub fn write_code(&mut self, code: u16, length: u8) {
        self.write_bits(reverse_bits(code, length) as u32, length);
    }

    /// Fill the current byte with zero bits.
    #[inline]
    pub fn align_to_byte(&mut self) {
        if self.bit_count > 0 {
            self.bytes.push(self.bit_buffer as u8);
            self.bit_buffer = 0;
            self.bit_count = 0;
        }
    }

    /// Align to the next byte, then append the number in little endian byte order.
    pub fn write_aligned_u16_le(&mut self, value: u16) {
        self.align_to_byte();
        self.bytes.write_as_little_endian(&value)
            .expect("write to in-memory buffer failed");
    }

    /// Align to the next byte, then append the bytes unchanged.
    pub fn write_aligned_bytes(&mut self, bytes: Bytes<'_>) {
        self.align_to_byte();
        self.bytes.extend_from_slice(bytes);
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 + self.bit_count as usize
    }

    /// Pad the last byte with zeroes and return all bytes.
    pub fn finish(mut self) -> ByteVec {
        self.align_to_byte();
        self.bytes
    }
}


/// Reads bits from a byte slice, least significant bit first.
#[derive(Debug, Clone)]
pub struct BitReader<'s> {
    bytes: Bytes<'s>,

    /// Index of the next byte that has not been moved into the bit buffer.
    byte_index: usize,

    bit_buffer: u64,
    bit_count: u32,
}

impl<'s> BitReader<'s> {

    /// Start reading at the first bit of the slice.
    pub fn new(bytes: Bytes<'s>) -> Self {
        BitReader { bytes, byte_index: 0, bit_buffer: 0, bit_count: 0 }
    }

    /// Move whole bytes into the bit buffer until it holds at least `count` bits.
    #[inline]
    fn refill(&mut self, count: u32) -> Result<()> {
        while self.bit_count < count {
            let byte = *self.bytes.get(self.byte_index).ok_or(Error::TruncatedStream)?;
            self.bit_buffer |= (byte as u64) << self.bit_count;
            self.byte_index += 1;
            self.bit_count += 8;
        }

        Ok(())
    }

    /// Read `count` bits as a number, the first bit being the least significant one.
    #[inline]
    pub fn read_bits(&mut self, count: u8) -> Result<u32> {
        debug_assert!(count <= 32);
        if count == 0 { return Ok(0); }

        self.refill(count as u32)?;

        let value = (self.bit_buffer & ((1_u64 << count) - 1)) as u32;
        self.bit_buffer >>= count;
        self.bit_count -= count as u32;
        Ok(value)
    }

    /// Read a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Discard the bits remaining in the current byte.
    #[inline]
    pub fn align_to_byte(&mut self) {
        let partial_bits = self.bit_count % 8;
        self.bit_buffer >>= partial_bits;
        self.bit_count -= partial_bits;
    }

    /// Return the buffered whole bytes to the slice, so that byte reads can continue from there.
    fn unread_buffered_bytes(&mut self) {
        self.align_to_byte();
        self.byte_index -= (self.bit_count / 8) as usize;
        self.bit_buffer = 0;
        self.bit_count = 0;
    }

    /// Align to the next byte, then read a little endian number.
    pub fn read_aligned_u16_le(&mut self) -> Result<u16> {
        let mut bytes = self.read_aligned_bytes(2)?;
        Ok(u16::read_from_little_endian(&mut bytes)?)
    }

    /// Align to the next byte, then read the next `count` bytes unchanged.
    pub fn read_aligned_bytes(&mut self, count: usize) -> Result<Bytes<'s>> {
        self.unread_buffered_bytes();

        let end = self.byte_index.checked_add(count).ok_or(Error::TruncatedStream)?;
        let bytes = self.bytes.get(self.byte_index .. end).ok_or(Error::TruncatedStream)?;

        self.byte_index = end;
        Ok(bytes)
    }

    /// Align to the next byte and return all bytes that have not been read yet.
    pub fn remaining_aligned_bytes(mut self) -> Bytes<'s> {
        self.unread_buffered_bytes();
        &self.bytes[self.byte_index ..]
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bits_are_packed_least_significant_first(){
        let mut writer = BitWriter::default();
        writer.write_bits(1, 1);
        writer.write_bits(0b10, 2);
        writer.write_bits(0b11111, 5);
        writer.write_bits(0b1, 1);

        assert_eq!(writer.bit_len(), 9);
        assert_eq!(writer.finish(), vec![0b1111_1101, 0b0000_0001]);
    }

    #[test]
    fn codes_are_packed_most_significant_first(){
        let mut writer = BitWriter::default();
        writer.write_code(0b110, 3);
        assert_eq!(writer.finish(), vec![0b011]);
    }

    #[test]
    fn reverse(){
        assert_eq!(reverse_bits(0b0011, 4), 0b1100);
        assert_eq!(reverse_bits(0b1, 1), 0b1);
        assert_eq!(reverse_bits(0b0000_0000_0000_0001, 15), 0b0100_0000_0000_0000);
        assert_eq!(reverse_bits(0, 0), 0);
    }

    #[test]
    fn aligned_values_after_bits(){
        let mut writer = BitWriter::default();
        writer.write_bits(0b101, 3);
        writer.write_aligned_u16_le(0x1234);
        writer.write_aligned_bytes(&[9, 8, 7]);
        writer.write_bits(1, 1);

        let bytes = writer.finish();
        assert_eq!(bytes, vec![0b101, 0x34, 0x12, 9, 8, 7, 1]);

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_aligned_u16_le().unwrap(), 0x1234);
        assert_eq!(reader.read_aligned_bytes(3).unwrap(), &[9, 8, 7]);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.remaining_aligned_bytes(), &[] as &[u8]);
    }

    #[test]
    fn aligned_reads_return_buffered_bytes(){
        let bytes = [0xFF, 0x01, 0x02, 0x03, 0x04, 0x05];
        let mut reader = BitReader::new(&bytes);

        // reading 12 bits buffers two bytes, the second one only partially consumed
        assert_eq!(reader.read_bits(12).unwrap(), 0x1FF);
        assert_eq!(reader.read_aligned_bytes(2).unwrap(), &[0x02, 0x03]);
        assert_eq!(reader.remaining_aligned_bytes(), &[0x04, 0x05]);
    }

    #[test]
    fn reading_past_the_end_is_truncation(){
        let mut reader = BitReader::new(&[0xAB]);
        assert_eq!(reader.read_bits(8).unwrap(), 0xAB);
        assert!(matches!(reader.read_bits(1), Err(Error::TruncatedStream)));
        assert!(matches!(BitReader::new(&[1]).read_aligned_bytes(2), Err(Error::TruncatedStream)));
    }
}
