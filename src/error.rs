use alloc::string::String;
use enough::StopReason;

/// Errors from BMP decoding.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BmpError {
    #[error("not a BMP (missing 'BM' magic)")]
    NotABmp,

    #[error("truncated input: {0}")]
    Truncated(String),

    #[error("offset beyond end of data: {0}")]
    BadOffset(String),

    #[error("unsupported DIB header size: {0}")]
    UnsupportedDib(u32),

    #[error("invalid header field: {0}")]
    InvalidField(String),

    #[error("missing palette for indexed image")]
    MissingPalette,

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[cfg(feature = "rgb")]
    #[error("pixel format mismatch: expected {expected:?}, got {actual:?}")]
    FormatMismatch {
        expected: crate::PixelFormat,
        actual: crate::PixelFormat,
    },

    #[error("operation cancelled")]
    Cancelled(StopReason),

    #[cfg(feature = "std")]
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StopReason> for BmpError {
    fn from(r: StopReason) -> Self {
        BmpError::Cancelled(r)
    }
}
