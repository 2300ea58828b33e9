//! The zlib container around deflate streams, as used by png image data.
// see https://www.rfc-editor.org/rfc/rfc1950

use bit_field::BitField;
use crate::checksum::adler32;
use crate::error::{Error, Result};
use crate::io::Data;
use super::*;


/// Compression method deflate with a 32 KiB window.
const CMF: u8 = 0x78;

const DEFLATE_METHOD: u8 = 8;
const MAX_WINDOW_INFO: u8 = 7;


/// The flag byte that announces the compression level and makes the header a multiple of 31.
fn header_flags(compression: Compression) -> u8 {
    let level: u8 = match compression {
        Compression::Stored => 0,
        Compression::Fixed => 1,
        Compression::Dynamic => 2,
    };

    let flags = level << 6;
    let check = (31 - (CMF as u16 * 256 + flags as u16) % 31) % 31;
    flags | check as u8
}


/// Wrap the deflate data of the bytes in a zlib header and an adler-32 trailer.
pub fn compress(uncompressed: Bytes<'_>, compression: Compression) -> ByteVec {
    let deflated = deflate::compress(uncompressed, compression);

    let mut bytes = Vec::with_capacity(deflated.len() + 6);
    bytes.push(CMF);
    bytes.push(header_flags(compression));
    bytes.extend_from_slice(&deflated);

    adler32(uncompressed).write(&mut bytes)
        .expect("write to in-memory buffer failed");

    bytes
}

/// Check the zlib header, inflate the deflate data, and verify the adler-32 trailer.
/// Bytes following the trailer are ignored.
pub fn decompress(compressed: Bytes<'_>, max_byte_size: Option<usize>) -> Result<ByteVec> {
    if compressed.len() < 2 {
        return Err(Error::TruncatedStream);
    }

    let (cmf, flags) = (compressed[0], compressed[1]);

    if cmf.get_bits(0 .. 4) != DEFLATE_METHOD {
        return Err(Error::corrupt("zlib compression method is not deflate"));
    }

    if cmf.get_bits(4 .. 8) > MAX_WINDOW_INFO {
        return Err(Error::corrupt("zlib window size too large"));
    }

    if (cmf as u16 * 256 + flags as u16) % 31 != 0 {
        return Err(Error::corrupt("zlib header check bits"));
    }

    if flags.get_bit(5) {
        return Err(Error::corrupt("zlib preset dictionaries are not supported"));
    }

    let (decompressed, mut trailer) = deflate::decompress_with_remainder(&compressed[2 ..], max_byte_size)?;

    let expected_checksum = u32::read(&mut trailer)?;
    if adler32(&decompressed) != expected_checksum {
        return Err(Error::integrity("adler-32 checksum of the decompressed data"));
    }

    Ok(decompressed)
}
