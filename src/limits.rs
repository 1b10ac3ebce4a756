//! Decode-time resource caps.
//!
//! BMP headers are attacker-controlled: a 60-byte file can declare a
//! multi-gigabyte image, a 256-entry palette for a 2-color bitmap, or a
//! huge embedded ICC profile. `Limits` lets a caller bound all of that
//! before any pixel work starts.

use crate::error::BmpError;
use crate::header::Metadata;

/// Caps applied by [`crate::decode_with_limits`].
///
/// Every field defaults to `None` (unbounded). Header-derived values
/// (dimensions, palette, profile) are checked right after parsing; the
/// memory cap is checked against each output buffer before it is
/// allocated.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u32>,
    /// Cap on `abs(height)`; top-down files report negative heights.
    pub max_height: Option<u32>,
    /// Cap on `width * abs(height)`.
    pub max_pixels: Option<u64>,
    /// Cap on color table entries actually read from the file.
    pub max_palette_entries: Option<usize>,
    /// Cap on embedded ICC profile bytes carried by a V5 header.
    pub max_profile_bytes: Option<usize>,
    /// Cap on any single output buffer allocation.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Validate everything the headers promised before pixels decode.
    pub(crate) fn check_header(
        &self,
        meta: &Metadata,
        palette_entries: usize,
    ) -> Result<(), BmpError> {
        let width = meta.width as u32;
        let height = meta.abs_height();
        if self.max_width.is_some_and(|cap| width > cap) {
            return Err(over("width", u64::from(width)));
        }
        if self.max_height.is_some_and(|cap| height > cap) {
            return Err(over("height", u64::from(height)));
        }
        let pixels = u64::from(width) * u64::from(height);
        if self.max_pixels.is_some_and(|cap| pixels > cap) {
            return Err(over("pixel count", pixels));
        }
        if self
            .max_palette_entries
            .is_some_and(|cap| palette_entries > cap)
        {
            return Err(over("palette entry count", palette_entries as u64));
        }
        if self
            .max_profile_bytes
            .is_some_and(|cap| meta.embedded_profile.len() > cap)
        {
            return Err(over(
                "embedded profile size",
                meta.embedded_profile.len() as u64,
            ));
        }
        Ok(())
    }

    pub(crate) fn check_memory(&self, bytes: usize) -> Result<(), BmpError> {
        if self.max_memory_bytes.is_some_and(|cap| bytes as u64 > cap) {
            return Err(over("output allocation", bytes as u64));
        }
        Ok(())
    }
}

fn over(what: &str, value: u64) -> BmpError {
    BmpError::LimitExceeded(alloc::format!("{what} {value} is over the configured cap"))
}
