
//! Read and write lossless png images with 8 bits per channel.
//!
//! Contains its own implementation of the complete pipeline:
//! scan line filters, deflate compression with stored, fixed, and dynamic huffman blocks,
//! the zlib container, and the chunked png container with its checksums.
//!
//! Supports grayscale, rgb, and rgba images without interlacing.
//! Decoding validates every checksum and reports damaged files as typed errors.
//!
//! ```
//! use png_lite::prelude::*;
//!
//! let pixels = vec![
//!     255, 0, 0, 255,    0, 255, 0, 255,
//!     0, 0, 255, 255,    255, 255, 255, 0,
//! ];
//!
//! let image = ImageBuffer::new(2, 2, 4, pixels).unwrap();
//! let bytes = encode(&image, WriteOptions::default()).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), image);
//! ```

#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused_extern_crates,
    unused,

    missing_copy_implementations,
    missing_debug_implementations,
)]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod io; // public to allow for custom chunk processing

pub mod checksum;
pub mod compression;
pub mod filter;
pub mod meta;
pub mod image;
pub mod error;

pub use crate::image::read::{decode, decode_with_options};
pub use crate::image::write::encode;


/// Export the most important items from this crate.
pub mod prelude {

    // main exports
    pub use crate::{encode, decode, decode_with_options};
    pub use crate::image::{ImageBuffer, ReadOptions, WriteOptions};

    // secondary data types
    pub use crate::compression::Compression;
    pub use crate::filter::{FilterPolicy, FilterType};
    pub use crate::meta::header::ColorType;

    pub use crate::meta;
    pub use crate::error::{self, Error, Result};
}
