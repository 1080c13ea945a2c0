//! Rotation-aware software framebuffer
//!
//! [`Canvas`] is the pixel store behind every target. It owns its buffer for
//! regular targets and borrows a caller-supplied buffer for static sprites
//! (that buffer is never freed here). Coordinates given to drawing code are
//! logical: rotation is applied when mapping to the native buffer, so an odd
//! rotation swaps the reported width and height.
//!
//! The canvas implements [`DrawTarget`] so `embedded-graphics` primitives and
//! text render straight into it. Out-of-bounds pixels are clipped, never
//! errors.

use embedded_graphics::pixelcolor::Rgb888 as EgRgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::Pixel;

use crate::color::Rgb888;
use crate::error::{Error, Result};

/// Supported framebuffer pixel layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel, packed 3-3-2.
    Rgb332,
    /// Four bytes per pixel, little-endian `0x00RRGGBB`.
    Rgb888,
}

impl PixelFormat {
    pub const fn bits_per_pixel(self) -> u8 {
        match self {
            PixelFormat::Rgb332 => 8,
            PixelFormat::Rgb888 => 32,
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb332 => 1,
            PixelFormat::Rgb888 => 4,
        }
    }

    /// Map a bits-per-pixel value from the binding surface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBitDepth`] for anything other than 8 or 32.
    pub fn from_bits(bpp: u8) -> Result<Self> {
        match bpp {
            8 => Ok(PixelFormat::Rgb332),
            32 => Ok(PixelFormat::Rgb888),
            other => Err(Error::InvalidBitDepth(other)),
        }
    }
}

enum Storage {
    Owned(Vec<u8>),
    /// Caller-owned memory for static sprites. Never freed here; the caller
    /// guarantees it outlives the canvas and is not aliased while drawing.
    Foreign { ptr: *mut u8, len: usize },
}

// Foreign pointers are only touched through &self/&mut self accessors and the
// caller contract above makes that exclusive access.
unsafe impl Send for Storage {}

impl Storage {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(v) => v,
            Storage::Foreign { ptr, len } => unsafe {
                core::slice::from_raw_parts(*ptr, *len)
            },
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Storage::Owned(v) => v,
            Storage::Foreign { ptr, len } => unsafe {
                core::slice::from_raw_parts_mut(*ptr, *len)
            },
        }
    }
}

/// Software framebuffer with a fixed native size and a quarter-turn rotation.
pub struct Canvas {
    native_width: u32,
    native_height: u32,
    rotation: u8,
    format: PixelFormat,
    storage: Storage,
}

impl Canvas {
    /// Allocate a zeroed canvas.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            native_width: width,
            native_height: height,
            rotation: 0,
            format,
            storage: Storage::Owned(vec![0; len]),
        }
    }

    /// Wrap a caller-owned buffer without taking ownership.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least `width * height * bytes_per_pixel` bytes
    /// of writable memory that outlives the canvas and is not accessed from
    /// elsewhere while the canvas is alive.
    pub unsafe fn from_raw(width: u32, height: u32, format: PixelFormat, ptr: *mut u8) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            native_width: width,
            native_height: height,
            rotation: 0,
            format,
            storage: Storage::Foreign { ptr, len },
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Logical width in pixels, swapped with height for odd rotations.
    pub fn width(&self) -> i32 {
        match self.rotation {
            1 | 3 => self.native_height as i32,
            _ => self.native_width as i32,
        }
    }

    /// Logical height in pixels, swapped with width for odd rotations.
    pub fn height(&self) -> i32 {
        match self.rotation {
            1 | 3 => self.native_width as i32,
            _ => self.native_height as i32,
        }
    }

    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    /// Set rotation in quarter turns clockwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRotation`] outside 0..=3.
    pub fn set_rotation(&mut self, rotation: u8) -> Result<()> {
        if rotation > 3 {
            return Err(Error::InvalidRotation(rotation));
        }
        self.rotation = rotation;
        Ok(())
    }

    /// Map logical coordinates to a native byte index, or `None` when the
    /// point is outside the logical bounds.
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        let (nw, nh) = (self.native_width, self.native_height);
        let (nx, ny) = match self.rotation {
            0 => (x, y),
            1 => (y, nh - 1 - x),
            2 => (nw - 1 - x, nh - 1 - y),
            _ => (nw - 1 - y, x),
        };
        Some((ny as usize * nw as usize + nx as usize) * self.format.bytes_per_pixel())
    }

    /// Write a pixel; out-of-bounds points are clipped.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb888) {
        let Some(i) = self.index(x, y) else { return };
        let buf = self.storage.as_mut_slice();
        match self.format {
            PixelFormat::Rgb332 => buf[i] = crate::color::Rgb332::from(color).raw(),
            PixelFormat::Rgb888 => buf[i..i + 4].copy_from_slice(&color.raw().to_le_bytes()),
        }
    }

    /// Read a pixel back, expanded to 24-bit color. `None` when out of bounds.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb888> {
        let i = self.index(x, y)?;
        let buf = self.storage.as_slice();
        Some(match self.format {
            PixelFormat::Rgb332 => crate::color::Rgb332::new(buf[i]).into(),
            PixelFormat::Rgb888 => {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&buf[i..i + 4]);
                Rgb888::new(u32::from_le_bytes(bytes))
            }
        })
    }

    /// Fill the whole buffer with one color, ignoring rotation.
    pub fn fill(&mut self, color: Rgb888) {
        match self.format {
            PixelFormat::Rgb332 => {
                let byte = crate::color::Rgb332::from(color).raw();
                self.storage.as_mut_slice().fill(byte);
            }
            PixelFormat::Rgb888 => {
                let bytes = color.raw().to_le_bytes();
                for px in self.storage.as_mut_slice().chunks_exact_mut(4) {
                    px.copy_from_slice(&bytes);
                }
            }
        }
    }

    /// Raw native-order framebuffer bytes.
    pub fn data(&self) -> &[u8] {
        self.storage.as_slice()
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width() as u32, self.height() as u32)
    }
}

impl DrawTarget for Canvas {
    type Color = EgRgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_swapped_dimensions_for_odd_rotations() {
        let mut canvas = Canvas::new(40, 30, PixelFormat::Rgb888);
        assert_eq!((canvas.width(), canvas.height()), (40, 30));
        canvas.set_rotation(1).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (30, 40));
        canvas.set_rotation(2).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (40, 30));
        canvas.set_rotation(3).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (30, 40));
    }

    #[test]
    fn rejects_out_of_range_rotation() {
        let mut canvas = Canvas::new(8, 8, PixelFormat::Rgb888);
        assert!(matches!(
            canvas.set_rotation(4),
            Err(Error::InvalidRotation(4))
        ));
        assert_eq!(canvas.rotation(), 0);
    }

    #[test]
    fn pixel_round_trip_rgb888() {
        let mut canvas = Canvas::new(4, 4, PixelFormat::Rgb888);
        canvas.set_pixel(1, 2, Rgb888::new(0x123456));
        assert_eq!(canvas.pixel(1, 2), Some(Rgb888::new(0x123456)));
        assert_eq!(canvas.pixel(0, 0), Some(Rgb888::BLACK));
    }

    #[test]
    fn pixel_round_trip_rgb332_is_quantized() {
        let mut canvas = Canvas::new(4, 4, PixelFormat::Rgb332);
        canvas.set_pixel(0, 0, Rgb888::WHITE);
        assert_eq!(canvas.pixel(0, 0), Some(Rgb888::WHITE));
        // Arbitrary colors survive only at 3-3-2 precision.
        let color = Rgb888::new(0x102030);
        canvas.set_pixel(1, 0, color);
        let read = canvas.pixel(1, 0).unwrap();
        assert_eq!(
            crate::color::Rgb332::from(read),
            crate::color::Rgb332::from(color)
        );
    }

    #[test]
    fn out_of_bounds_access_is_clipped() {
        let mut canvas = Canvas::new(4, 4, PixelFormat::Rgb888);
        canvas.set_pixel(-1, 0, Rgb888::WHITE);
        canvas.set_pixel(4, 0, Rgb888::WHITE);
        canvas.set_pixel(0, 4, Rgb888::WHITE);
        assert_eq!(canvas.pixel(4, 0), None);
        assert!(canvas.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn rotation_transposes_into_the_native_buffer() {
        let mut canvas = Canvas::new(4, 2, PixelFormat::Rgb888);
        canvas.set_rotation(1).unwrap();
        // Logical (0, 0) under a 90 degree turn lands at native (0, 1).
        canvas.set_pixel(0, 0, Rgb888::WHITE);
        canvas.set_rotation(0).unwrap();
        assert_eq!(canvas.pixel(0, 1), Some(Rgb888::WHITE));
    }

    #[test]
    fn foreign_buffer_is_read_and_written_in_place() {
        let mut backing = vec![0u8; 4 * 4];
        let mut canvas =
            unsafe { Canvas::from_raw(4, 4, PixelFormat::Rgb332, backing.as_mut_ptr()) };
        canvas.set_pixel(2, 1, Rgb888::WHITE);
        drop(canvas);
        // The caller's memory holds the pixel and was not freed.
        assert_eq!(backing[4 + 2], 0xFF);
    }
}
