//! Pixel decode dispatch and the uncompressed decode paths.

use alloc::vec;
use alloc::vec::Vec;

use enough::Stop;

use crate::bitfields;
use crate::error::BmpError;
use crate::header::{self, Bitmasks, Compression, Metadata};
use crate::image::{Image, PaletteEntry, PixelFormat};
use crate::limits::Limits;
use crate::rle;

/// What a single decode path produced; assembled into an [`Image`] by
/// the dispatcher.
pub(crate) struct Decoded {
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
    pub raw_masks: Bitmasks,
    pub raw_bits_per_pixel: u8,
}

impl Decoded {
    pub(crate) fn bgra(pixels: Vec<u8>) -> Self {
        Self {
            format: PixelFormat::Bgra8,
            pixels,
            raw_masks: Bitmasks::default(),
            raw_bits_per_pixel: 0,
        }
    }
}

pub(crate) fn decode_impl(
    data: &[u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Image, BmpError> {
    let header::ParsedHeader { mut meta, palette } = header::parse(data)?;

    if let Some(limits) = limits {
        limits.check_header(&meta, palette.len())?;
    }
    stop.check()?;

    // Trim to the declared image size when it is plausible; some writers
    // append junk after the pixel array.
    let mut pix = &data[meta.file_offset_pixels as usize..];
    if meta.image_size != 0 && meta.image_size as usize <= pix.len() {
        pix = &pix[..meta.image_size as usize];
    }

    let decoded = match meta.bpp {
        1 | 2 | 4 | 8 => match meta.compression {
            Compression::Rgb => decode_indexed(&meta, &palette, pix, limits, stop).map(Decoded::bgra),
            Compression::Rle8 if meta.bpp == 8 => {
                rle::decode_rle8(&meta, &palette, pix, limits, stop).map(Decoded::bgra)
            }
            Compression::Rle4 if meta.bpp == 4 => {
                rle::decode_rle4(&meta, &palette, pix, limits, stop).map(Decoded::bgra)
            }
            Compression::Jpeg | Compression::Png => passthrough(pix, limits),
            other => Err(unsupported(other, meta.bpp)),
        },
        16 => match meta.compression {
            Compression::Rgb => {
                meta.has_masks = true;
                meta.masks = Bitmasks {
                    r: 0x7C00,
                    g: 0x03E0,
                    b: 0x001F,
                    a: 0,
                };
                bitfields::decode(&meta, pix, 2, limits, stop)
            }
            Compression::Bitfields | Compression::AlphaBitfields => {
                bitfields::decode(&meta, pix, 2, limits, stop)
            }
            Compression::Jpeg | Compression::Png => passthrough(pix, limits),
            other => Err(unsupported(other, meta.bpp)),
        },
        24 => match meta.compression {
            Compression::Rgb => decode_bgr24(&meta, pix, limits, stop),
            Compression::Jpeg | Compression::Png => passthrough(pix, limits),
            other => Err(unsupported(other, meta.bpp)),
        },
        32 => match meta.compression {
            Compression::Rgb => {
                meta.has_masks = true;
                meta.masks = Bitmasks {
                    r: 0x00FF_0000,
                    g: 0x0000_FF00,
                    b: 0x0000_00FF,
                    a: 0xFF00_0000,
                };
                bitfields::decode(&meta, pix, 4, limits, stop)
            }
            Compression::Bitfields | Compression::AlphaBitfields => {
                bitfields::decode(&meta, pix, 4, limits, stop)
            }
            Compression::Jpeg | Compression::Png => passthrough(pix, limits),
            other => Err(unsupported(other, meta.bpp)),
        },
        other => Err(BmpError::InvalidField(alloc::format!(
            "unsupported bit depth {other}"
        ))),
    }?;

    Ok(Image {
        meta,
        format: decoded.format,
        pixels: decoded.pixels,
        palette,
        raw_masks: decoded.raw_masks,
        raw_bits_per_pixel: decoded.raw_bits_per_pixel,
    })
}

fn unsupported(compression: Compression, bpp: u16) -> BmpError {
    BmpError::UnsupportedCompression(alloc::format!("{compression:?} with {bpp}-bpp data"))
}

/// Overflow-checked `width * height * bytes_per_pixel`, validated
/// against the memory limit before any allocation happens.
pub(crate) fn checked_output_len(
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
    limits: Option<&Limits>,
) -> Result<usize, BmpError> {
    let len = u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|v| v.checked_mul(bytes_per_pixel as u64))
        .ok_or(BmpError::DimensionsTooLarge { width, height })?;
    let len = usize::try_from(len).map_err(|_| BmpError::DimensionsTooLarge { width, height })?;
    if let Some(limits) = limits {
        limits.check_memory(len)?;
    }
    Ok(len)
}

/// Write one palette lookup as B,G,R,A. Indices past the palette end
/// collapse to entry 0.
pub(crate) fn put_indexed(
    buf: &mut [u8],
    palette: &[PaletteEntry],
    width: usize,
    x: usize,
    y: usize,
    idx: u8,
) {
    let mut idx = usize::from(idx);
    if idx >= palette.len() {
        idx = 0;
    }
    let e = palette[idx];
    let off = (y * width + x) * 4;
    buf[off] = e.b;
    buf[off + 1] = e.g;
    buf[off + 2] = e.r;
    buf[off + 3] = e.a;
}

// ── Uncompressed indexed (1/2/4/8 bpp) ──────────────────────────────

fn decode_indexed(
    meta: &Metadata,
    palette: &[PaletteEntry],
    pix: &[u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Vec<u8>, BmpError> {
    if palette.is_empty() {
        return Err(BmpError::MissingPalette);
    }

    let w = meta.width as u32;
    let h = meta.abs_height();
    let stride = header::row_stride(w, meta.bpp);
    let needed = stride
        .checked_mul(u64::from(h))
        .ok_or(BmpError::DimensionsTooLarge { width: w, height: h })?;
    if needed > pix.len() as u64 {
        return Err(BmpError::Truncated("pixel data".into()));
    }

    let out_len = checked_output_len(w, h, 4, limits)?;
    let mut buf = vec![0u8; out_len];

    let w = w as usize;
    let h = h as usize;
    let stride = stride as usize;
    for row in 0..h {
        if row % 16 == 0 {
            stop.check()?;
        }
        let src = &pix[row * stride..][..stride];
        let y = if meta.top_down() { row } else { h - 1 - row };
        match meta.bpp {
            8 => {
                for x in 0..w {
                    put_indexed(&mut buf, palette, w, x, y, src[x]);
                }
            }
            4 => {
                for x in 0..w {
                    let byte = src[x / 2];
                    let idx = if x % 2 == 0 { byte >> 4 } else { byte & 0x0F };
                    put_indexed(&mut buf, palette, w, x, y, idx);
                }
            }
            2 => {
                for x in 0..w {
                    let byte = src[x / 4];
                    let idx = (byte >> (6 - 2 * (x % 4))) & 0x03;
                    put_indexed(&mut buf, palette, w, x, y, idx);
                }
            }
            _ => {
                for x in 0..w {
                    let byte = src[x / 8];
                    let idx = (byte >> (7 - x % 8)) & 0x01;
                    put_indexed(&mut buf, palette, w, x, y, idx);
                }
            }
        }
    }

    Ok(buf)
}

// ── Packed 24-bpp ───────────────────────────────────────────────────

fn decode_bgr24(
    meta: &Metadata,
    pix: &[u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Decoded, BmpError> {
    let w = meta.width as u32;
    let h = meta.abs_height();
    let stride = header::row_stride(w, 24);
    let needed = stride
        .checked_mul(u64::from(h))
        .ok_or(BmpError::DimensionsTooLarge { width: w, height: h })?;
    if needed > pix.len() as u64 {
        return Err(BmpError::Truncated("pixel data".into()));
    }

    let out_len = checked_output_len(w, h, 3, limits)?;
    let mut buf = vec![0u8; out_len];

    let w = w as usize;
    let h = h as usize;
    let stride = stride as usize;
    for row in 0..h {
        if row % 16 == 0 {
            stop.check()?;
        }
        let src = &pix[row * stride..][..w * 3];
        let y = if meta.top_down() { row } else { h - 1 - row };
        buf[y * w * 3..][..w * 3].copy_from_slice(src);
    }

    Ok(Decoded {
        format: PixelFormat::Bgr8,
        pixels: buf,
        raw_masks: Bitmasks::default(),
        raw_bits_per_pixel: 0,
    })
}

// ── Embedded JPEG/PNG passthrough ───────────────────────────────────

/// The payload is some other codec's bitstream; hand it back untouched
/// for an external decoder.
fn passthrough(pix: &[u8], limits: Option<&Limits>) -> Result<Decoded, BmpError> {
    if let Some(limits) = limits {
        limits.check_memory(pix.len())?;
    }
    Ok(Decoded {
        format: PixelFormat::RawBitfields,
        pixels: pix.to_vec(),
        raw_masks: Bitmasks::default(),
        raw_bits_per_pixel: 0,
    })
}
