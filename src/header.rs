//! File header and DIB header parsing, palette reconstruction.
//!
//! Seven DIB variants are distinguished by the leading 32-bit size field:
//! 12 (OS/2 v1 core), 16 and 64 (OS/2 v2), 40 (BITMAPINFOHEADER),
//! 52 (v2), 56 (v3), 108 (v4), 124 (v5). Field layouts follow the
//! Windows GDI and OS/2 Presentation Manager references.

use alloc::vec::Vec;

use crate::error::BmpError;
use crate::image::PaletteEntry;
use crate::reader::ByteReader;

pub(crate) const FILE_HEADER_LEN: usize = 14;

// ── Header enums ────────────────────────────────────────────────────

/// Which DIB header variant a file carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DibType {
    /// 12-byte BITMAPCOREHEADER (OS/2 v1).
    CoreOs2V1,
    /// 16- or 64-byte OS/2 v2 header.
    Os2V2,
    /// 40-byte BITMAPINFOHEADER.
    Info,
    /// 52-byte BITMAPV2INFOHEADER.
    V2,
    /// 56-byte BITMAPV3INFOHEADER.
    V3,
    /// 108-byte BITMAPV4HEADER.
    V4,
    /// 124-byte BITMAPV5HEADER.
    V5,
}

/// Compression tags from wingdi.h and the OS/2 docs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Rgb,
    Rle8,
    Rle4,
    Bitfields,
    Jpeg,
    Png,
    AlphaBitfields,
    Cmyk,
    CmykRle8,
    CmykRle4,
}

impl Compression {
    pub fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Rgb,
            1 => Self::Rle8,
            2 => Self::Rle4,
            3 => Self::Bitfields,
            4 => Self::Jpeg,
            5 => Self::Png,
            6 => Self::AlphaBitfields,
            11 => Self::Cmyk,
            12 => Self::CmykRle8,
            13 => Self::CmykRle4,
            _ => return None,
        })
    }
}

/// Color space tag from V4/V5 headers.
///
/// Unrecognized tags are preserved verbatim rather than rejected; the
/// decoder never interprets them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpaceType {
    CalibratedRgb,
    Srgb,
    WindowsColorSpace,
    ProfileLinked,
    ProfileEmbedded,
    Unknown(u32),
}

impl ColorSpaceType {
    pub fn from_u32(raw: u32) -> Self {
        match raw {
            0x0000_0000 => Self::CalibratedRgb,
            0x7352_4742 => Self::Srgb,
            0x5769_6E20 => Self::WindowsColorSpace,
            0x4C49_4E4B => Self::ProfileLinked,
            0x4D42_4544 => Self::ProfileEmbedded,
            other => Self::Unknown(other),
        }
    }
}

/// V5 rendering intent. Unknown values fall back to `Images`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderingIntent {
    AbsColorimetric,
    Business,
    Graphics,
    Images,
}

impl RenderingIntent {
    pub fn from_u32(raw: u32) -> Self {
        match raw {
            1 => Self::Business,
            2 => Self::Graphics,
            8 => Self::AbsColorimetric,
            _ => Self::Images,
        }
    }
}

/// Per-channel extraction masks for 16/32-bpp pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bitmasks {
    pub r: u32,
    pub g: u32,
    pub b: u32,
    pub a: u32,
}

/// CIE XYZ coordinate in the header's fixed-point encoding, kept verbatim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CieXyz {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// V4/V5 color space endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CieXyzTriple {
    pub r: CieXyz,
    pub g: CieXyz,
    pub b: CieXyz,
}

// ── Metadata ────────────────────────────────────────────────────────

/// Everything the headers said about the image.
///
/// All fields are preserved as parsed; `height` keeps its sign (negative
/// means the source was top-down) even though decoded pixel rows are
/// always returned top-down.
#[derive(Clone, Debug)]
pub struct Metadata {
    pub dib_type: DibType,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bpp: u16,
    pub compression: Compression,
    pub image_size: u32,
    pub ppm_x: u32,
    pub ppm_y: u32,
    pub color_used: u32,
    pub color_important: u32,

    /// True when the file carried explicit bitfield masks, or when the
    /// decoder synthesized the 16/32-bpp defaults for `Rgb` compression.
    pub has_masks: bool,
    pub masks: Bitmasks,

    // V4 fields
    pub cstype: ColorSpaceType,
    pub endpoints: CieXyzTriple,
    pub gamma_red: u32,
    pub gamma_green: u32,
    pub gamma_blue: u32,

    // V5 fields
    pub intent: RenderingIntent,
    /// Embedded ICC profile bytes; empty unless `cstype` is
    /// `ProfileEmbedded` and the declared range fits inside the file.
    pub embedded_profile: Vec<u8>,

    pub file_offset_pixels: u32,
    pub header_size: u32,
    pub file_size: u32,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            dib_type: DibType::Info,
            width: 0,
            height: 0,
            planes: 1,
            bpp: 0,
            compression: Compression::Rgb,
            image_size: 0,
            ppm_x: 0,
            ppm_y: 0,
            color_used: 0,
            color_important: 0,
            has_masks: false,
            masks: Bitmasks::default(),
            cstype: ColorSpaceType::Srgb,
            endpoints: CieXyzTriple::default(),
            gamma_red: 0,
            gamma_green: 0,
            gamma_blue: 0,
            intent: RenderingIntent::Images,
            embedded_profile: Vec::new(),
            file_offset_pixels: 0,
            header_size: 0,
            file_size: 0,
        }
    }
}

impl Metadata {
    /// Whether row 0 of the source data is the top of the image.
    pub fn top_down(&self) -> bool {
        self.height < 0
    }

    /// Height with the orientation sign stripped.
    pub fn abs_height(&self) -> u32 {
        self.height.unsigned_abs()
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

pub(crate) struct ParsedHeader {
    pub meta: Metadata,
    pub palette: Vec<PaletteEntry>,
}

pub(crate) fn parse(data: &[u8]) -> Result<ParsedHeader, BmpError> {
    let r = ByteReader::new(data);

    if data.len() < FILE_HEADER_LEN {
        return Err(BmpError::Truncated("file header".into()));
    }
    if data[0] != b'B' || data[1] != b'M' {
        return Err(BmpError::NotABmp);
    }

    let file_size = r.u32le(2, "file size")?;
    let off_bits = r.u32le(10, "pixel data offset")?;
    if off_bits as usize > data.len() {
        return Err(BmpError::BadOffset("pixel data offset".into()));
    }

    let dib_size = r.u32le(FILE_HEADER_LEN, "DIB header size")?;
    let dib_end = (dib_size as usize)
        .checked_add(FILE_HEADER_LEN)
        .ok_or_else(|| BmpError::Truncated("DIB header".into()))?;
    if dib_end > data.len() {
        return Err(BmpError::Truncated("DIB header".into()));
    }

    let mut m = Metadata {
        file_offset_pixels: off_bits,
        header_size: dib_size,
        file_size,
        ..Metadata::default()
    };

    let dib = FILE_HEADER_LEN;
    match dib_size {
        12 => {
            m.dib_type = DibType::CoreOs2V1;
            m.width = i32::from(r.u16le(dib + 4, "width")? as i16);
            m.height = i32::from(r.u16le(dib + 6, "height")? as i16);
            m.planes = r.u16le(dib + 8, "planes")?;
            m.bpp = r.u16le(dib + 10, "bits-per-pixel")?;
        }
        16 | 64 => {
            m.dib_type = DibType::Os2V2;
            m.width = r.i32le(dib + 4, "width")?;
            m.height = r.i32le(dib + 8, "height")?;
            m.planes = r.u16le(dib + 12, "planes")?;
            m.bpp = r.u16le(dib + 14, "bits-per-pixel")?;
            if dib_size == 64 {
                m.compression = parse_compression(r.u32le(dib + 16, "compression")?)?;
                m.image_size = r.u32le(dib + 20, "image size")?;
                m.ppm_x = r.u32le(dib + 24, "horizontal resolution")?;
                m.ppm_y = r.u32le(dib + 28, "vertical resolution")?;
                m.color_used = r.u32le(dib + 32, "colors used")?;
                m.color_important = r.u32le(dib + 36, "important colors")?;
            }
        }
        40 | 52 | 56 | 108 | 124 => {
            m.dib_type = match dib_size {
                40 => DibType::Info,
                52 => DibType::V2,
                56 => DibType::V3,
                108 => DibType::V4,
                _ => DibType::V5,
            };
            m.width = r.i32le(dib + 4, "width")?;
            m.height = r.i32le(dib + 8, "height")?;
            m.planes = r.u16le(dib + 12, "planes")?;
            m.bpp = r.u16le(dib + 14, "bits-per-pixel")?;
            m.compression = parse_compression(r.u32le(dib + 16, "compression")?)?;
            m.image_size = r.u32le(dib + 20, "image size")?;
            m.ppm_x = r.u32le(dib + 24, "horizontal resolution")?;
            m.ppm_y = r.u32le(dib + 28, "vertical resolution")?;
            m.color_used = r.u32le(dib + 32, "colors used")?;
            m.color_important = r.u32le(dib + 36, "important colors")?;

            if matches!(
                m.compression,
                Compression::Bitfields | Compression::AlphaBitfields
            ) {
                if dib_size >= 52 {
                    m.masks.r = r.u32le(dib + 40, "red mask")?;
                    m.masks.g = r.u32le(dib + 44, "green mask")?;
                    m.masks.b = r.u32le(dib + 48, "blue mask")?;
                    m.has_masks = true;
                    if dib_size >= 56 {
                        m.masks.a = r.u32le(dib + 52, "alpha mask")?;
                    }
                } else if dib_end + 12 <= data.len() {
                    // INFO header with the masks trailing it
                    m.masks.r = r.u32le(dib + 40, "red mask")?;
                    m.masks.g = r.u32le(dib + 44, "green mask")?;
                    m.masks.b = r.u32le(dib + 48, "blue mask")?;
                    m.has_masks = true;
                    if m.compression == Compression::AlphaBitfields && dib_end + 16 <= data.len() {
                        m.masks.a = r.u32le(dib + 52, "alpha mask")?;
                    }
                }
            }

            if dib_size >= 108 {
                m.cstype = ColorSpaceType::from_u32(r.u32le(dib + 40, "color space type")?);
                m.endpoints.r.x = r.i32le(dib + 44, "red endpoint")?;
                m.endpoints.r.y = r.i32le(dib + 48, "red endpoint")?;
                m.endpoints.r.z = r.i32le(dib + 52, "red endpoint")?;
                m.endpoints.g.x = r.i32le(dib + 56, "green endpoint")?;
                m.endpoints.g.y = r.i32le(dib + 60, "green endpoint")?;
                m.endpoints.g.z = r.i32le(dib + 64, "green endpoint")?;
                m.endpoints.b.x = r.i32le(dib + 68, "blue endpoint")?;
                m.endpoints.b.y = r.i32le(dib + 72, "blue endpoint")?;
                m.endpoints.b.z = r.i32le(dib + 76, "blue endpoint")?;
                m.gamma_red = r.u32le(dib + 80, "red gamma")?;
                m.gamma_green = r.u32le(dib + 84, "green gamma")?;
                m.gamma_blue = r.u32le(dib + 88, "blue gamma")?;
            }

            if dib_size >= 124 {
                m.intent = RenderingIntent::from_u32(r.u32le(dib + 92, "rendering intent")?);
                let profile_data = r.u32le(dib + 112, "profile data offset")?;
                let profile_size = r.u32le(dib + 116, "profile size")?;

                if m.cstype == ColorSpaceType::ProfileEmbedded && profile_size > 0 {
                    // A profile pointing outside the file is dropped, not fatal.
                    let start = dib.checked_add(profile_data as usize);
                    let end = start.and_then(|s| s.checked_add(profile_size as usize));
                    if let (Some(start), Some(end)) = (start, end) {
                        if let Some(bytes) = data.get(start..end) {
                            m.embedded_profile = bytes.to_vec();
                        }
                    }
                }
            }
        }
        other => return Err(BmpError::UnsupportedDib(other)),
    }

    if m.planes != 1 {
        return Err(BmpError::InvalidField(alloc::format!(
            "planes is {}, expected 1",
            m.planes
        )));
    }
    if m.bpp == 0 {
        return Err(BmpError::InvalidField("bits-per-pixel is zero".into()));
    }
    if !matches!(m.bpp, 1 | 2 | 4 | 8 | 16 | 24 | 32) {
        return Err(BmpError::InvalidField(alloc::format!(
            "unsupported bit depth {}",
            m.bpp
        )));
    }
    if m.width <= 0 {
        return Err(BmpError::InvalidField(alloc::format!(
            "width is {} (must be positive)",
            m.width
        )));
    }
    if m.height == 0 {
        return Err(BmpError::InvalidField("height is zero".into()));
    }

    let palette = read_palette(data, &m);

    Ok(ParsedHeader { meta: m, palette })
}

fn parse_compression(raw: u32) -> Result<Compression, BmpError> {
    Compression::from_u32(raw)
        .ok_or_else(|| BmpError::UnsupportedCompression(alloc::format!("compression tag {raw}")))
}

// ── Palette ─────────────────────────────────────────────────────────

/// Read the color table sitting between the DIB header and the pixel
/// data. The entry count is capped both at what the header promises and
/// at what actually fits before `off_bits`, so truncated or overstated
/// files yield a short palette instead of an error.
fn read_palette(data: &[u8], m: &Metadata) -> Vec<PaletteEntry> {
    let declared = default_palette_entries(m) as usize;
    let palette_offset = FILE_HEADER_LEN + m.header_size as usize;
    let available = (m.file_offset_pixels as usize).saturating_sub(palette_offset);
    if declared == 0 || available == 0 {
        return Vec::new();
    }

    let entry_size = if m.dib_type == DibType::CoreOs2V1 { 3 } else { 4 };
    let count = declared.min(available / entry_size);
    let mut palette = Vec::with_capacity(count);
    for chunk in data[palette_offset..palette_offset + count * entry_size].chunks_exact(entry_size)
    {
        palette.push(PaletteEntry {
            b: chunk[0],
            g: chunk[1],
            r: chunk[2],
            a: if entry_size == 4 { chunk[3] } else { 0 },
        });
    }
    palette
}

fn default_palette_entries(m: &Metadata) -> u32 {
    if m.dib_type == DibType::CoreOs2V1 {
        if m.bpp <= 8 {
            1u32 << m.bpp
        } else {
            0
        }
    } else if m.bpp <= 8 {
        if m.color_used != 0 {
            m.color_used
        } else {
            1u32 << m.bpp
        }
    } else {
        m.color_used
    }
}

// ── Stride ──────────────────────────────────────────────────────────

/// Source row stride: `ceil(width * bpp / 8)` rounded up to 4 bytes.
/// Computed in 64 bits so adversarial widths cannot wrap.
pub(crate) fn row_stride(width: u32, bpp: u16) -> u64 {
    let bits = u64::from(width) * u64::from(bpp);
    (bits.div_ceil(8) + 3) & !3
}
