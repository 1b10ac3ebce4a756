//! RLE8 / RLE4 stream semantics: runs, escapes, alignment, clipping.

use dibdec::*;
use enough::Unstoppable;

fn file_header(off_bits: u32) -> Vec<u8> {
    let mut v = Vec::with_capacity(14);
    v.extend_from_slice(b"BM");
    v.extend_from_slice(&0u32.to_le_bytes());
    v.extend_from_slice(&[0u8; 4]);
    v.extend_from_slice(&off_bits.to_le_bytes());
    v
}

fn info_header(w: i32, h: i32, bpp: u16, compression: u32, color_used: u32) -> Vec<u8> {
    let mut v = Vec::with_capacity(40);
    v.extend_from_slice(&40u32.to_le_bytes());
    v.extend_from_slice(&w.to_le_bytes());
    v.extend_from_slice(&h.to_le_bytes());
    v.extend_from_slice(&1u16.to_le_bytes());
    v.extend_from_slice(&bpp.to_le_bytes());
    v.extend_from_slice(&compression.to_le_bytes());
    v.extend_from_slice(&[0u8; 12]);
    v.extend_from_slice(&color_used.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes());
    v
}

/// Grayscale-ish palette where entry i decodes to (i, i, i, 0).
fn flat_palette(n: u8) -> Vec<u8> {
    let mut v = Vec::new();
    for i in 0..n {
        v.extend_from_slice(&[i, i, i, 0]);
    }
    v
}

/// BGRA pixel for flat_palette entry i.
fn px(i: u8) -> [u8; 4] {
    [i, i, i, 0]
}

fn rle8_bmp(w: i32, h: i32, colors: u8, stream: &[u8]) -> Vec<u8> {
    let off = 54 + u32::from(colors) * 4;
    let mut data = file_header(off);
    data.extend(info_header(w, h, 8, 1, u32::from(colors)));
    data.extend(flat_palette(colors));
    data.extend_from_slice(stream);
    data
}

fn rle4_bmp(w: i32, h: i32, colors: u8, stream: &[u8]) -> Vec<u8> {
    let off = 54 + u32::from(colors) * 4;
    let mut data = file_header(off);
    data.extend(info_header(w, h, 4, 2, u32::from(colors)));
    data.extend(flat_palette(colors));
    data.extend_from_slice(stream);
    data
}

// ── RLE8 ────────────────────────────────────────────────────────────

#[test]
fn rle8_encoded_runs() {
    // Bottom row: 4x index 1. Top row: 2x index 2, then 2x index 0.
    let data = rle8_bmp(4, 2, 3, &[0x04, 0x01, 0x02, 0x02, 0x02, 0x00, 0x00, 0x01]);
    let img = decode(&data, Unstoppable).unwrap();
    assert_eq!(img.format, PixelFormat::Bgra8);
    let mut expected = Vec::new();
    for i in [2, 2, 0, 0, 1, 1, 1, 1] {
        expected.extend_from_slice(&px(i));
    }
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle8_absolute_odd_run_is_word_aligned() {
    // Absolute run of 3 indices (00 01 00), one pad byte, end-of-bitmap.
    let data = rle8_bmp(3, 1, 2, &[0x00, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01]);
    let img = decode(&data, Unstoppable).unwrap();
    let mut expected = Vec::new();
    for i in [0, 1, 0] {
        expected.extend_from_slice(&px(i));
    }
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle8_run_wraps_to_next_row() {
    let data = rle8_bmp(4, 2, 2, &[0x06, 0x01, 0x00, 0x01]);
    let img = decode(&data, Unstoppable).unwrap();
    let mut expected = Vec::new();
    // Source rows fill bottom-up: 4 pixels on row 0 (bottom), 2 on row 1 (top)
    for i in [1, 1, 0, 0, 1, 1, 1, 1] {
        expected.extend_from_slice(&px(i));
    }
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle8_delta_skips_pixels() {
    // 2x index 1, delta (+1,+1), 1x index 2, end.
    let data = rle8_bmp(
        4,
        2,
        3,
        &[0x02, 0x01, 0x00, 0x02, 0x01, 0x01, 0x01, 0x02, 0x00, 0x01],
    );
    let img = decode(&data, Unstoppable).unwrap();

    let mut expected = vec![0u8; 4 * 2 * 4];
    // Source (0,0) and (1,0) land on the bottom output row
    expected[16..20].copy_from_slice(&px(1));
    expected[20..24].copy_from_slice(&px(1));
    // After the delta the cursor is at (3,1): top output row, last column
    expected[12..16].copy_from_slice(&px(2));
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle8_premature_end_leaves_partial_image() {
    let data = rle8_bmp(4, 2, 2, &[0x04, 0x01]);
    let img = decode(&data, Unstoppable).unwrap();
    let mut expected = vec![0u8; 4 * 2 * 4];
    for x in 0..4 {
        expected[16 + x * 4..16 + x * 4 + 4].copy_from_slice(&px(1));
    }
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle8_top_down_rows_stay_in_order() {
    let data = rle8_bmp(4, -2, 3, &[0x04, 0x01, 0x04, 0x02, 0x00, 0x01]);
    let img = decode(&data, Unstoppable).unwrap();
    let mut expected = Vec::new();
    for i in [1, 1, 1, 1, 2, 2, 2, 2] {
        expected.extend_from_slice(&px(i));
    }
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle8_without_palette_is_fatal() {
    let mut data = file_header(54);
    data.extend(info_header(4, 2, 8, 1, 0));
    data.extend_from_slice(&[0x04, 0x01, 0x00, 0x01]);
    assert!(matches!(
        decode(&data, Unstoppable),
        Err(BmpError::MissingPalette)
    ));
}

// ── RLE4 ────────────────────────────────────────────────────────────

#[test]
fn rle4_run_alternates_nibbles_high_first() {
    let data = rle4_bmp(5, 1, 3, &[0x05, 0x12, 0x00, 0x01]);
    let img = decode(&data, Unstoppable).unwrap();
    let mut expected = Vec::new();
    for i in [1, 2, 1, 2, 1] {
        expected.extend_from_slice(&px(i));
    }
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle4_rows_flip_bottom_up() {
    let data = rle4_bmp(4, 2, 4, &[0x04, 0x12, 0x04, 0x30, 0x00, 0x01]);
    let img = decode(&data, Unstoppable).unwrap();
    let mut expected = Vec::new();
    for i in [3, 0, 3, 0, 1, 2, 1, 2] {
        expected.extend_from_slice(&px(i));
    }
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle4_absolute_run_even_byte_count() {
    // 3 literal nibbles pack into 2 bytes; even count, no padding.
    let data = rle4_bmp(3, 1, 4, &[0x00, 0x03, 0x12, 0x30, 0x00, 0x01]);
    let img = decode(&data, Unstoppable).unwrap();
    let mut expected = Vec::new();
    for i in [1, 2, 3] {
        expected.extend_from_slice(&px(i));
    }
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle4_absolute_run_odd_byte_count_is_padded() {
    // 5 nibbles -> 3 bytes -> one pad byte before the next command.
    let data = rle4_bmp(
        5,
        1,
        6,
        &[0x00, 0x05, 0x12, 0x34, 0x50, 0x00, 0x00, 0x01],
    );
    let img = decode(&data, Unstoppable).unwrap();
    let mut expected = Vec::new();
    for i in [1, 2, 3, 4, 5] {
        expected.extend_from_slice(&px(i));
    }
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle4_premature_end_leaves_partial_image() {
    let data = rle4_bmp(4, 2, 2, &[0x02, 0x11]);
    let img = decode(&data, Unstoppable).unwrap();
    let mut expected = vec![0u8; 4 * 2 * 4];
    expected[16..20].copy_from_slice(&px(1));
    expected[20..24].copy_from_slice(&px(1));
    assert_eq!(img.pixels, expected);
}

#[test]
fn rle4_without_palette_is_fatal() {
    let mut data = file_header(54);
    data.extend(info_header(4, 1, 4, 2, 0));
    data.extend_from_slice(&[0x04, 0x12, 0x00, 0x01]);
    assert!(matches!(
        decode(&data, Unstoppable),
        Err(BmpError::MissingPalette)
    ));
}
