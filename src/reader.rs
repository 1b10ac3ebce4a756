//! Bounds-checked little-endian reads at absolute offsets.
//!
//! BMP offsets come straight from the file, so every access goes through
//! here and fails with an error naming the field it was reading.

use crate::error::BmpError;

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn span(&self, at: usize, len: usize, field: &'static str) -> Result<&'a [u8], BmpError> {
        let end = at
            .checked_add(len)
            .ok_or_else(|| BmpError::Truncated(field.into()))?;
        self.data
            .get(at..end)
            .ok_or_else(|| BmpError::Truncated(field.into()))
    }

    pub(crate) fn u16le(&self, at: usize, field: &'static str) -> Result<u16, BmpError> {
        let b = self.span(at, 2, field)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32le(&self, at: usize, field: &'static str) -> Result<u32, BmpError> {
        let b = self.span(at, 4, field)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i32le(&self, at: usize, field: &'static str) -> Result<i32, BmpError> {
        Ok(self.u32le(at, field)? as i32)
    }
}
