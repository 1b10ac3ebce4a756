use alloc::vec::Vec;

use crate::header::{Bitmasks, Metadata};

/// Layout of the decoded pixel buffer.
///
/// Indexed sources normalize to `Bgra8`, 24-bpp to `Bgr8`. 16/32-bpp
/// bitfield sources whose channels all fit losslessly in 8 bits also
/// become `Bgra8`; anything wider or stranger is handed back as
/// `RawBitfields` together with the channel masks so no precision is
/// thrown away. `RawBitfields` is also used for embedded JPEG/PNG
/// payloads (with zero masks and zero raw bpp).
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
    Bgr8,
    Gray8,
    RawBitfields,
}

impl PixelFormat {
    /// Bytes per pixel, or 0 for `RawBitfields` (see
    /// [`Image::bytes_per_pixel`] for the resolved value).
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Bgr8 => 3,
            Self::Gray8 => 1,
            Self::RawBitfields => 0,
        }
    }
}

/// One color table entry, in file byte order. For 4-byte entries the
/// reserved byte is stored as `a`; OS/2 v1 3-byte entries get `a = 0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaletteEntry {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

/// A decoded BMP: pixel bytes in top-down row order plus everything the
/// headers said.
///
/// Rows are always top-down in `pixels` regardless of the source
/// orientation; `meta.height` keeps its sign for reference.
#[derive(Clone, Debug)]
pub struct Image {
    pub meta: Metadata,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
    /// Color table; empty for non-indexed formats.
    pub palette: Vec<PaletteEntry>,
    /// Channel masks for `RawBitfields` output, zero otherwise.
    pub raw_masks: Bitmasks,
    /// Source bit depth for `RawBitfields` output (16 or 32), zero
    /// otherwise. Zero together with `RawBitfields` means an embedded
    /// JPEG/PNG stream.
    pub raw_bits_per_pixel: u8,
}

impl Image {
    pub fn width(&self) -> u32 {
        self.meta.width as u32
    }

    pub fn height(&self) -> u32 {
        self.meta.abs_height()
    }

    /// Bytes per pixel of the output buffer, resolving `RawBitfields`
    /// through `raw_bits_per_pixel`.
    pub fn bytes_per_pixel(&self) -> usize {
        match self.format {
            PixelFormat::RawBitfields => usize::from(self.raw_bits_per_pixel / 8),
            other => other.bytes_per_pixel(),
        }
    }
}

// ── Typed pixel views (rgb feature) ─────────────────────────────────

#[cfg(feature = "rgb")]
impl Image {
    /// View the pixel buffer as typed BGRA pixels.
    ///
    /// Returns [`crate::BmpError::FormatMismatch`] unless `format` is
    /// [`PixelFormat::Bgra8`].
    pub fn as_bgra_pixels(&self) -> Result<&[rgb::alt::BGRA<u8>], crate::BmpError> {
        use rgb::AsPixels as _;
        if self.format != PixelFormat::Bgra8 {
            return Err(crate::BmpError::FormatMismatch {
                expected: PixelFormat::Bgra8,
                actual: self.format,
            });
        }
        Ok(self.pixels.as_pixels())
    }
}

#[cfg(feature = "rgb")]
impl From<PaletteEntry> for rgb::alt::BGRA<u8> {
    fn from(e: PaletteEntry) -> Self {
        Self {
            b: e.b,
            g: e.g,
            r: e.r,
            a: e.a,
        }
    }
}

#[cfg(feature = "imgref")]
impl Image {
    /// Zero-copy [`imgref::ImgRef`] view of a BGRA image.
    pub fn as_bgra_imgref(&self) -> Result<imgref::ImgRef<'_, rgb::alt::BGRA<u8>>, crate::BmpError> {
        let pixels = self.as_bgra_pixels()?;
        Ok(imgref::ImgRef::new(
            pixels,
            self.width() as usize,
            self.height() as usize,
        ))
    }

    /// Copy a BGRA image into an [`imgref::ImgVec`].
    pub fn to_bgra_imgvec(&self) -> Result<imgref::ImgVec<rgb::alt::BGRA<u8>>, crate::BmpError> {
        let pixels = self.as_bgra_pixels()?;
        Ok(imgref::ImgVec::new(
            pixels.to_vec(),
            self.width() as usize,
            self.height() as usize,
        ))
    }
}
