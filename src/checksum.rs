//! Checksums protecting the chunks (CRC-32) and the compressed pixel stream (Adler-32).

/// Reversed representation of the CRC-32 polynomial `0x04C11DB7`.
const CRC_POLYNOMIAL: u32 = 0xEDB8_8320;

/// Largest prime smaller than 2^16.
const ADLER_MODULUS: u32 = 65521;

/// Largest number of bytes that can be summed before `s2` may overflow a `u32`.
const ADLER_BLOCK_SIZE: usize = 5552;

/// The CRC remainder of each possible byte value, computed at compile time.
const CRC_TABLE: [u32; 256] = build_crc_table();

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0_u32; 256];
    let mut index = 0;

    while index < 256 {
        let mut value = index as u32;
        let mut bit = 0;

        while bit < 8 {
            value = if value & 1 != 0 { CRC_POLYNOMIAL ^ (value >> 1) } else { value >> 1 };
            bit += 1;
        }

        table[index] = value;
        index += 1;
    }

    table
}


/// Compute the CRC-32 of the bytes, as used by png chunks.
#[inline]
pub fn crc32(bytes: &[u8]) -> u32 {
    Crc32::new().update(bytes).finish()
}

/// Incrementally computes a CRC-32.
/// Allows hashing the chunk type and the chunk payload without concatenating them first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self { Self::new() }
}

impl Crc32 {

    /// Start a new checksum.
    #[inline]
    pub fn new() -> Self {
        Crc32 { state: 0xFFFF_FFFF }
    }

    /// Include more bytes in the checksum.
    #[inline]
    pub fn update(mut self, bytes: &[u8]) -> Self {
        for &byte in bytes {
            self.state = CRC_TABLE[((self.state ^ byte as u32) & 0xFF) as usize] ^ (self.state >> 8);
        }

        self
    }

    /// The checksum of all bytes seen so far.
    #[inline]
    pub fn finish(self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}


/// Compute the Adler-32 of the bytes, as used by the zlib stream in the image data chunks.
pub fn adler32(bytes: &[u8]) -> u32 {
    let mut s1 = 1_u32;
    let mut s2 = 0_u32;

    // delay the expensive modulo until an overflow would be possible
    for block in bytes.chunks(ADLER_BLOCK_SIZE) {
        for &byte in block {
            s1 += byte as u32;
            s2 += s1;
        }

        s1 %= ADLER_MODULUS;
        s2 %= ADLER_MODULUS;
    }

    (s2 << 16) | s1
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn crc_reference_values(){
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b"The quick brown fox jumps over the lazy dog"), 0x414F_A339);
        assert_eq!(crc32(b"IEND"), 0xAE42_6082);
    }

    #[test]
    fn crc_incremental_equals_whole(){
        let whole = crc32(b"IHDRpayload bytes");
        let parts = Crc32::new().update(b"IHDR").update(b"payload").update(b" bytes").finish();
        assert_eq!(whole, parts);
    }

    #[test]
    fn adler_reference_values(){
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"a"), 0x0062_0062);
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
        assert_eq!(adler32(b"abc"), 0x024D_0127);
    }

    #[test]
    fn adler_does_not_overflow_on_long_input(){
        let bytes = vec![0xFF_u8; 1 << 20];

        // naive computation with 64 bit sums as reference
        let (mut s1, mut s2) = (1_u64, 0_u64);
        for &byte in &bytes {
            s1 = (s1 + byte as u64) % 65521;
            s2 = (s2 + s1) % 65521;
        }

        assert_eq!(adler32(&bytes), ((s2 << 16) | s1) as u32);
    }
}
