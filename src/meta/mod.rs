//! Describes the container of a png file:
//! the signature, the chunks, and the image header.

pub mod chunk;
pub mod header;


/// The eight bytes at the start of each png file.
pub mod signature {
    use crate::io::*;
    use crate::error::{Error, Result, UnitResult};

    /// The first eight bytes of each png file.
    /// Contains line endings and a non-ascii byte, so that broken file transfers are detected.
    pub const BYTES: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    /// Without validation, write the signature to the byte stream.
    pub fn write(write: &mut impl Write) -> UnitResult {
        u8::write_slice(write, &self::BYTES)
    }

    /// Consumes eight bytes from the reader and returns whether the file may be a png file.
    pub fn is_png(read: &mut impl Read) -> Result<bool> {
        let mut signature = [0; 8];
        u8::read_slice(read, &mut signature)?;
        Ok(signature == self::BYTES)
    }

    /// If the reader starts with the png signature, return `Ok(())`.
    pub fn validate_png(read: &mut impl Read) -> UnitResult {
        match self::is_png(read) {
            Ok(true) => Ok(()),
            Ok(false) | Err(Error::TruncatedStream) => Err(Error::format("png signature missing")),
            Err(error) => Err(error),
        }
    }


}
