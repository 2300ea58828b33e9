//! Specialized binary input and output.
//! Uses the error handling for this crate.
//! All multi-byte numbers in the png container are stored in big-endian network order.

pub use ::std::io::{Read, Write};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use lebe::prelude::*;
use crate::error::{Error, Result, UnitResult};


/// Generic trait that defines common binary operations such as reading and writing for this type.
pub trait Data: Sized + Default + Clone {

    /// Read a value of type `Self`.
    fn read(read: &mut impl Read) -> Result<Self>;

    /// Read as many values of type `Self` as fit into the specified slice.
    /// If the slice cannot be filled completely, returns `Error::TruncatedStream`.
    fn read_slice(read: &mut impl Read, slice: &mut[Self]) -> UnitResult;

    /// Read as many values of type `Self` as specified with `data_size`.
    ///
    /// This method will not allocate more memory than `soft_max` at once.
    /// If `hard_max` is specified, it will never read any more than that.
    /// Returns `Error::TruncatedStream` if reader does not contain the desired number of elements.
    #[inline]
    fn read_vec(read: &mut impl Read, data_size: usize, soft_max: usize, hard_max: Option<usize>) -> Result<Vec<Self>> {
        let mut vec = Vec::new();
        Self::read_into_vec(read, &mut vec, data_size, soft_max, hard_max)?;
        Ok(vec)
    }

    /// Write this value to the writer.
    fn write(self, write: &mut impl Write) -> UnitResult;

    /// Write all values of that slice to the writer.
    fn write_slice(write: &mut impl Write, slice: &[Self]) -> UnitResult;

    /// Read as many values of type `Self` as specified with `data_size` into the provided vector.
    ///
    /// This method will not allocate more memory than `soft_max` at once.
    /// If `hard_max` is specified, it will never read any more than that.
    /// A corrupt size field therefore cannot trigger a huge allocation before the data runs out.
    #[inline]
    fn read_into_vec(read: &mut impl Read, data: &mut Vec<Self>, data_size: usize, soft_max: usize, hard_max: Option<usize>) -> UnitResult {
        if let Some(max) = hard_max {
            if data_size > max {
                return Err(Error::format("content size"))
            }
        }

        let soft_max = hard_max.unwrap_or(soft_max).min(soft_max).max(1);
        let end = data.len() + data_size;

        // do not allocate more than $chunks memory at once
        // (most of the time, this loop will run only once)
        while data.len() < end {
            let chunk_start = data.len();
            let chunk_end = (chunk_start + soft_max).min(end);

            data.resize(chunk_end, Self::default());
            Self::read_slice(read, &mut data[chunk_start .. chunk_end])?; // safe because of `min(end)`
        }

        Ok(())
    }
}


macro_rules! implement_data_for_primitive {
    ($kind: ident) => {
        impl Data for $kind {
            #[inline]
            fn read(read: &mut impl Read) -> Result<Self> {
                Ok(read.read_from_big_endian()?)
            }

            #[inline]
            fn write(self, write: &mut impl Write) -> UnitResult {
                write.write_as_big_endian(&self)?;
                Ok(())
            }

            #[inline]
            fn read_slice(read: &mut impl Read, slice: &mut [Self]) -> UnitResult {
                read.read_from_big_endian_into(slice)?;
                Ok(())
            }

            #[inline]
            fn write_slice(write: &mut impl Write, slice: &[Self]) -> UnitResult {
                write.write_as_big_endian(slice)?;
                Ok(())
            }
        }
    };
}

implement_data_for_primitive!(u8);
implement_data_for_primitive!(u16);
implement_data_for_primitive!(u32);


/// Create the file and write to it with a buffer.
/// If writing fails, the incomplete file is deleted again.
pub fn attempt_delete_file_on_write_error(
    path: &Path, write: impl FnOnce(&mut BufWriter<File>) -> UnitResult
) -> UnitResult
{
    let result = File::create(path).map_err(Error::from).and_then(|file| {
        let mut buffered = BufWriter::new(file);
        write(&mut buffered)?;
        buffered.flush()?;
        Ok(())
    });

    if result.is_err() {
        let _deleted = std::fs::remove_file(path);
    }

    result
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    #[test]
    fn network_byte_order(){
        let mut bytes = Vec::new();
        0x0102_0304_u32.write(&mut bytes).unwrap();
        0x0506_u16.write(&mut bytes).unwrap();
        assert_eq!(bytes, [1, 2, 3, 4, 5, 6]);

        let mut read = bytes.as_slice();
        assert_eq!(u32::read(&mut read).unwrap(), 0x0102_0304);
        assert_eq!(u16::read(&mut read).unwrap(), 0x0506);
        assert!(matches!(u8::read(&mut read), Err(Error::TruncatedStream)));
    }

    #[test]
    fn read_vec_in_small_steps(){
        let bytes: Vec<u8> = (0 .. 100).collect();
        let vec = u8::read_vec(&mut bytes.as_slice(), 100, 7, None).unwrap();
        assert_eq!(vec, bytes);
    }

    #[test]
    fn read_vec_respects_limits(){
        let bytes = [0_u8; 16];
        assert!(matches!(u8::read_vec(&mut &bytes[..], 32, 8, None), Err(Error::TruncatedStream)));
        assert!(matches!(u8::read_vec(&mut &bytes[..], 16, 8, Some(4)), Err(Error::Format(_))));
    }
}
