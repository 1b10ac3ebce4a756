//! Mask-driven 16/32-bpp decoding.
//!
//! When every channel mask is a contiguous run of at most 8 bits, the
//! pixels expand losslessly to BGRA8 (narrow channels are bit-replicated
//! up to full range, so 5-bit 0x1F becomes 0xFF). Wider or
//! non-contiguous masks cannot be mapped to 8-bit without truncation, so
//! those images come back as `RawBitfields`: stride-trimmed source
//! bytes plus the masks, for a downstream consumer that wants the full
//! precision.

use alloc::vec;

use enough::Stop;

use crate::decode::{Decoded, checked_output_len};
use crate::error::BmpError;
use crate::header::{self, Bitmasks, Metadata};
use crate::image::PixelFormat;
use crate::limits::Limits;

/// Default masks when a bitfields file carries none (the mask slot after
/// a 40-byte header may be missing entirely).
const DEFAULT_MASKS: Bitmasks = Bitmasks {
    r: 0x00FF_0000,
    g: 0x0000_FF00,
    b: 0x0000_00FF,
    a: 0xFF00_0000,
};

pub(crate) fn decode(
    meta: &Metadata,
    pix: &[u8],
    bytes_per_pixel: usize,
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Decoded, BmpError> {
    let w = meta.width as u32;
    let h = meta.abs_height();
    let stride = header::row_stride(w, (bytes_per_pixel * 8) as u16);
    let needed = stride
        .checked_mul(u64::from(h))
        .ok_or(BmpError::DimensionsTooLarge { width: w, height: h })?;
    if needed > pix.len() as u64 {
        return Err(BmpError::Truncated("pixel data".into()));
    }

    let masks = if meta.has_masks {
        meta.masks
    } else {
        DEFAULT_MASKS
    };

    if masks_expand_to_8bit(&masks) {
        decode_to_bgra(meta, pix, bytes_per_pixel, stride as usize, &masks, limits, stop)
    } else {
        copy_raw(meta, pix, bytes_per_pixel, stride as usize, masks, limits, stop)
    }
}

fn decode_to_bgra(
    meta: &Metadata,
    pix: &[u8],
    bytes_per_pixel: usize,
    stride: usize,
    masks: &Bitmasks,
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Decoded, BmpError> {
    let w = meta.width as u32;
    let h = meta.abs_height();
    let out_len = checked_output_len(w, h, 4, limits)?;
    let mut buf = vec![0u8; out_len];

    let w = w as usize;
    let h = h as usize;
    for row in 0..h {
        if row % 16 == 0 {
            stop.check()?;
        }
        let src = &pix[row * stride..][..stride];
        let y = if meta.top_down() { row } else { h - 1 - row };
        for x in 0..w {
            let v = if bytes_per_pixel == 2 {
                u32::from(u16::from_le_bytes([src[x * 2], src[x * 2 + 1]]))
            } else {
                u32::from_le_bytes([src[x * 4], src[x * 4 + 1], src[x * 4 + 2], src[x * 4 + 3]])
            };
            let off = (y * w + x) * 4;
            buf[off] = scale_channel(v, masks.b);
            buf[off + 1] = scale_channel(v, masks.g);
            buf[off + 2] = scale_channel(v, masks.r);
            buf[off + 3] = if masks.a == 0 {
                255
            } else {
                scale_channel(v, masks.a)
            };
        }
    }

    Ok(Decoded::bgra(buf))
}

fn copy_raw(
    meta: &Metadata,
    pix: &[u8],
    bytes_per_pixel: usize,
    stride: usize,
    masks: Bitmasks,
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Decoded, BmpError> {
    let w = meta.width as u32;
    let h = meta.abs_height();
    let out_len = checked_output_len(w, h, bytes_per_pixel, limits)?;
    let mut buf = vec![0u8; out_len];

    let w = w as usize;
    let h = h as usize;
    let row_bytes = w * bytes_per_pixel;
    for row in 0..h {
        if row % 16 == 0 {
            stop.check()?;
        }
        let src = &pix[row * stride..][..row_bytes];
        let y = if meta.top_down() { row } else { h - 1 - row };
        buf[y * row_bytes..][..row_bytes].copy_from_slice(src);
    }

    Ok(Decoded {
        format: PixelFormat::RawBitfields,
        pixels: buf,
        raw_masks: masks,
        raw_bits_per_pixel: (bytes_per_pixel * 8) as u8,
    })
}

// ── Mask analysis ───────────────────────────────────────────────────

/// True when the whole mask set can reach BGRA8 without losing bits:
/// every non-zero channel is one contiguous run of at most 8 bits, and
/// at least one color channel is present.
fn masks_expand_to_8bit(m: &Bitmasks) -> bool {
    (m.r | m.g | m.b) != 0
        && channel_fits_8bit(m.r)
        && channel_fits_8bit(m.g)
        && channel_fits_8bit(m.b)
        && channel_fits_8bit(m.a)
}

fn channel_fits_8bit(mask: u32) -> bool {
    if mask == 0 {
        return true;
    }
    let span = mask >> mask.trailing_zeros();
    span & span.wrapping_add(1) == 0 && span.count_ones() <= 8
}

/// Extract the channel under `mask` and normalize it to 8 bits.
///
/// Channels of 8+ bits keep their top 8. Narrower channels are
/// bit-replicated (`x = (x << width) | c` until width reaches 8), which
/// maps the channel maximum to 0xFF.
pub(crate) fn scale_channel(v: u32, mask: u32) -> u8 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let mut width = (mask >> shift).trailing_ones();
    let comp = (v & mask) >> shift;
    if width >= 8 {
        return (comp >> (width - 8)) as u8;
    }
    let mut x = comp;
    while width < 8 {
        x = (x << width) | comp;
        width <<= 1;
    }
    (x & 0xFF) as u8
}
