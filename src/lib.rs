//! # dibdec
//!
//! BMP/DIB image decoder for the full historical family of Windows and
//! OS/2 bitmap headers.
//!
//! ## Supported inputs
//!
//! - All seven DIB header variants: 12-byte OS/2 v1 core, 16/64-byte
//!   OS/2 v2, and the Windows 40/52/56/108/124-byte INFO through V5
//!   headers
//! - Bit depths 1, 2, 4, 8 (indexed), 16, 24, 32
//! - Uncompressed, RLE4, RLE8, and BITFIELDS/ALPHABITFIELDS pixel data,
//!   bottom-up or top-down
//! - BI_JPEG / BI_PNG payloads are exposed verbatim for an external
//!   decoder
//!
//! ## Output
//!
//! Decoding normalizes *layout*, not color: rows always come back
//! top-down, indexed data expands to BGRA8, 24-bpp stays packed BGR8,
//! and 16/32-bpp bitfield data becomes BGRA8 when that is lossless;
//! otherwise the source words are handed back as
//! [`PixelFormat::RawBitfields`] together with the channel masks.
//! Palettes, V4 color-space endpoints, and V5 ICC profiles are carried
//! through in [`Metadata`] untouched.
//!
//! ## Usage
//!
//! ```no_run
//! use enough::Unstoppable;
//!
//! let data = std::fs::read("image.bmp")?;
//! let image = dibdec::decode(&data, Unstoppable)?;
//! println!(
//!     "{}x{} {:?} ({} palette entries)",
//!     image.width(),
//!     image.height(),
//!     image.format,
//!     image.palette.len()
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod bitfields;
mod decode;
mod error;
mod header;
mod image;
mod limits;
mod reader;
mod rle;

pub use enough::{Stop, Unstoppable};
pub use error::BmpError;
pub use header::{
    Bitmasks, CieXyz, CieXyzTriple, ColorSpaceType, Compression, DibType, Metadata,
    RenderingIntent,
};
pub use image::{Image, PaletteEntry, PixelFormat};
pub use limits::Limits;

/// 8-bit BGRA pixel, the layout of every `Bgra8` output buffer.
#[cfg(feature = "rgb")]
pub type BGRA8 = rgb::alt::BGRA<u8>;

/// Check whether `data` starts with the BMP magic bytes.
pub fn is_bmp(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == b'B' && data[1] == b'M'
}

/// Decode a BMP from an in-memory buffer.
///
/// Pass [`Unstoppable`] when cancellation is not needed; the decoder is
/// then a pure function of the input bytes and may be called from any
/// number of threads at once.
pub fn decode(data: &[u8], stop: impl Stop) -> Result<Image, BmpError> {
    decode::decode_impl(data, None, &stop)
}

/// Decode with resource limits, checked before any pixel allocation.
pub fn decode_with_limits(
    data: &[u8],
    limits: &Limits,
    stop: impl Stop,
) -> Result<Image, BmpError> {
    decode::decode_impl(data, Some(limits), &stop)
}

/// Parse headers and palette only, without touching pixel data.
///
/// Cheap way to inspect dimensions, bit depth, compression, and the
/// V4/V5 color-space fields before committing to a full decode. Note
/// that a missing palette is only reported by the full decode.
pub fn probe(data: &[u8]) -> Result<Metadata, BmpError> {
    Ok(header::parse(data)?.meta)
}

/// Read a whole file and decode it.
#[cfg(feature = "std")]
pub fn decode_file(path: impl AsRef<std::path::Path>, stop: impl Stop) -> Result<Image, BmpError> {
    let data = std::fs::read(path)?;
    decode::decode_impl(&data, None, &stop)
}
