//! Error types for the engine
//!
//! Every precondition that callers can violate is reported through [`Error`]
//! instead of being left undefined: stale or wrong-variant handles, invalid
//! dimensions, malformed datum values, short pixel buffers, and decode
//! failures all come back as explicit variants.

use core::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors reported by engine operations.
#[derive(Debug)]
pub enum Error {
    /// Handle does not resolve to a live target (stale generation, freed
    /// sprite, or a raw value that was never issued).
    InvalidHandle,
    /// Operation requires the other handle variant (e.g. a refresh-mode call
    /// on a sprite, or a sprite push on the root).
    WrongTarget {
        /// Name of the rejected operation.
        operation: &'static str,
    },
    /// Width or height outside the accepted range.
    InvalidDimensions {
        /// Requested width in pixels
        width: i32,
        /// Requested height in pixels
        height: i32,
    },
    /// Rotation outside 0..=3.
    InvalidRotation(u8),
    /// Datum byte is not one of the twelve valid anchor values.
    InvalidDatum(u8),
    /// Refresh mode byte outside 1..=4.
    InvalidRefreshMode(u8),
    /// Bits-per-pixel not supported for static sprite buffers.
    InvalidBitDepth(u8),
    /// The sprite handle space (65536 slots) is exhausted.
    SpriteLimit,
    /// Pixel data shorter than the stated image dimensions require.
    BufferTooSmall {
        /// Required buffer size in bytes
        required: usize,
        /// Provided buffer size in bytes
        provided: usize,
    },
    /// Font data could not be parsed.
    FontData(&'static str),
    /// Font has no glyph for the requested character.
    Glyph(char),
    /// PNG data could not be decoded.
    Png(image::ImageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHandle => write!(f, "handle does not resolve to a live target"),
            Error::WrongTarget { operation } => {
                write!(f, "{operation} called on the wrong target variant")
            }
            Error::InvalidDimensions { width, height } => {
                write!(f, "invalid dimensions: {width}x{height}")
            }
            Error::InvalidRotation(r) => write!(f, "invalid rotation {r} (expected 0..=3)"),
            Error::InvalidDatum(raw) => write!(f, "invalid datum value {raw:#04x}"),
            Error::InvalidRefreshMode(raw) => {
                write!(f, "invalid refresh mode {raw} (expected 1..=4)")
            }
            Error::InvalidBitDepth(bpp) => {
                write!(f, "unsupported bit depth {bpp} (expected 8 or 32)")
            }
            Error::SpriteLimit => write!(f, "sprite handle space exhausted"),
            Error::BufferTooSmall { required, provided } => {
                write!(
                    f,
                    "buffer too small: required {required} bytes, provided {provided}"
                )
            }
            Error::FontData(msg) => write!(f, "font data rejected: {msg}"),
            Error::Glyph(c) => write!(f, "no glyph for {c:?}"),
            Error::Png(e) => write!(f, "png decode failed: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Png(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Png(e)
    }
}
