//! RLE8 and RLE4 decoding.
//!
//! Both decoders walk the compressed stream with `(x, y)` cursor state.
//! A zero count byte introduces an escape: 0 ends the line, 1 ends the
//! bitmap, 2 is a positional delta, and anything >= 3 is an absolute run
//! of literal indices. Absolute runs are word-aligned in the stream:
//! RLE8 pads after an odd byte count, RLE4 after an odd number of packed
//! nibble bytes. Streams that end before the end-of-bitmap escape leave
//! a partial image rather than an error; untouched pixels stay zero.

use alloc::vec;
use alloc::vec::Vec;

use enough::Stop;

use crate::decode::{checked_output_len, put_indexed};
use crate::error::BmpError;
use crate::header::Metadata;
use crate::image::PaletteEntry;
use crate::limits::Limits;

/// Emit one pixel at stream coordinates, clipping anything the escapes
/// pushed out of bounds.
fn put(
    buf: &mut [u8],
    palette: &[PaletteEntry],
    w: usize,
    h: usize,
    x: usize,
    y: usize,
    top_down: bool,
    idx: u8,
) {
    if x >= w || y >= h {
        return;
    }
    let dest_y = if top_down { y } else { h - 1 - y };
    put_indexed(buf, palette, w, x, dest_y, idx);
}

pub(crate) fn decode_rle8(
    meta: &Metadata,
    palette: &[PaletteEntry],
    pix: &[u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Vec<u8>, BmpError> {
    if palette.is_empty() {
        return Err(BmpError::MissingPalette);
    }

    let out_len = checked_output_len(meta.width as u32, meta.abs_height(), 4, limits)?;
    let mut buf = vec![0u8; out_len];

    let w = meta.width as usize;
    let h = meta.abs_height() as usize;
    let top_down = meta.top_down();

    let mut x = 0usize;
    let mut y = 0usize;
    let mut i = 0usize;
    let mut commands = 0u32;

    while i < pix.len() && y < h {
        commands += 1;
        if commands % 1024 == 0 {
            stop.check()?;
        }

        let count = pix[i];
        i += 1;
        if count > 0 {
            if i >= pix.len() {
                break;
            }
            let idx = pix[i];
            i += 1;
            for _ in 0..count {
                put(&mut buf, palette, w, h, x, y, top_down, idx);
                x += 1;
                if x >= w {
                    x = 0;
                    y += 1;
                    if y >= h {
                        break;
                    }
                }
            }
        } else {
            if i >= pix.len() {
                break;
            }
            let cmd = pix[i];
            i += 1;
            match cmd {
                0 => {
                    y += 1;
                    x = 0;
                }
                1 => break,
                2 => {
                    if i + 1 >= pix.len() {
                        break;
                    }
                    let dx = pix[i];
                    let dy = pix[i + 1];
                    i += 2;
                    x = (x + usize::from(dx)).min(w);
                    y = (y + usize::from(dy)).min(h);
                }
                n => {
                    let n = usize::from(n);
                    if i + n > pix.len() {
                        break;
                    }
                    for k in 0..n {
                        put(&mut buf, palette, w, h, x, y, top_down, pix[i + k]);
                        x += 1;
                        if x >= w {
                            x = 0;
                            y += 1;
                            if y >= h {
                                break;
                            }
                        }
                    }
                    i += n;
                    if n % 2 == 1 && i < pix.len() {
                        i += 1;
                    }
                }
            }
        }
    }

    Ok(buf)
}

pub(crate) fn decode_rle4(
    meta: &Metadata,
    palette: &[PaletteEntry],
    pix: &[u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Vec<u8>, BmpError> {
    if palette.is_empty() {
        return Err(BmpError::MissingPalette);
    }

    let out_len = checked_output_len(meta.width as u32, meta.abs_height(), 4, limits)?;
    let mut buf = vec![0u8; out_len];

    let w = meta.width as usize;
    let h = meta.abs_height() as usize;
    let top_down = meta.top_down();

    let mut x = 0usize;
    let mut y = 0usize;
    let mut i = 0usize;
    let mut commands = 0u32;

    while i < pix.len() && y < h {
        commands += 1;
        if commands % 1024 == 0 {
            stop.check()?;
        }

        let count = pix[i];
        i += 1;
        if count > 0 {
            if i >= pix.len() {
                break;
            }
            let byte = pix[i];
            i += 1;
            let hi = byte >> 4;
            let lo = byte & 0x0F;
            for k in 0..count {
                let idx = if k % 2 == 0 { hi } else { lo };
                put(&mut buf, palette, w, h, x, y, top_down, idx);
                x += 1;
                if x >= w {
                    x = 0;
                    y += 1;
                    if y >= h {
                        break;
                    }
                }
            }
        } else {
            if i >= pix.len() {
                break;
            }
            let cmd = pix[i];
            i += 1;
            match cmd {
                0 => {
                    y += 1;
                    x = 0;
                }
                1 => break,
                2 => {
                    if i + 1 >= pix.len() {
                        break;
                    }
                    let dx = pix[i];
                    let dy = pix[i + 1];
                    i += 2;
                    x = (x + usize::from(dx)).min(w);
                    y = (y + usize::from(dy)).min(h);
                }
                n => {
                    let n = usize::from(n);
                    let bytes = n.div_ceil(2);
                    if i + bytes > pix.len() {
                        break;
                    }
                    for k in 0..n {
                        let byte = pix[i + k / 2];
                        let idx = if k % 2 == 0 { byte >> 4 } else { byte & 0x0F };
                        put(&mut buf, palette, w, h, x, y, top_down, idx);
                        x += 1;
                        if x >= w {
                            x = 0;
                            y += 1;
                            if y >= h {
                                break;
                            }
                        }
                    }
                    i += bytes;
                    if bytes % 2 == 1 && i < pix.len() {
                        i += 1;
                    }
                }
            }
        }
    }

    Ok(buf)
}
