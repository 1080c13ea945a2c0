//! Raw image pushes and PNG drawing
//!
//! Raw pushes accept grayscale, packed 3-3-2 and packed 32-bit pixel data
//! with explicit dimensions and a validated buffer length. PNG drawing
//! delegates decoding to the `image` crate and handles placement here:
//! datum anchoring, sub-image offset, independent x/y scaling and an
//! optional clip on the drawn size.

use image::GenericImageView;

use crate::color::{Rgb332, Rgb888};
use crate::datum::{Datum, HorizontalDatum, VerticalDatum};
use crate::error::{Error, Result};
use crate::surface::Surface;

/// Pixel layouts accepted by [`Surface::push_image`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    /// One byte per pixel, 0 = black, 255 = white.
    Gray8,
    /// One byte per pixel, packed 3-3-2.
    Rgb332,
    /// Four bytes per pixel, little-endian `0x00RRGGBB`.
    Rgb888,
}

impl ImageFormat {
    const fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::Gray8 | ImageFormat::Rgb332 => 1,
            ImageFormat::Rgb888 => 4,
        }
    }
}

/// Placement options for [`Surface::draw_png`].
#[derive(Clone, Copy, Debug)]
pub struct PngOptions {
    /// Clip the drawn width to this many pixels; non-positive means no clip.
    pub max_width: i32,
    /// Clip the drawn height; non-positive means no clip.
    pub max_height: i32,
    /// Horizontal offset into the decoded image.
    pub offset_x: i32,
    /// Vertical offset into the decoded image.
    pub offset_y: i32,
    /// Horizontal scale factor; non-positive snaps to 1.0.
    pub scale_x: f32,
    /// Vertical scale factor; non-positive follows `scale_x`.
    pub scale_y: f32,
    /// Anchor of the drawn image relative to the given coordinates.
    pub datum: Datum,
}

impl Default for PngOptions {
    fn default() -> Self {
        Self {
            max_width: 0,
            max_height: 0,
            offset_x: 0,
            offset_y: 0,
            scale_x: 1.0,
            scale_y: 0.0,
            datum: Datum::TOP_LEFT,
        }
    }
}

impl Surface {
    /// Copy a raw pixel buffer into the surface at `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] for non-positive sizes,
    /// [`Error::BufferTooSmall`] when `data` is shorter than
    /// `width * height` pixels in the given format.
    pub fn push_image(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: ImageFormat,
        data: &[u8],
    ) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let required = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                provided: data.len(),
            });
        }

        for row in 0..height {
            for col in 0..width {
                let i = (row as usize * width as usize + col as usize) * format.bytes_per_pixel();
                let color = match format {
                    ImageFormat::Gray8 => {
                        let g = data[i];
                        Rgb888::from_channels(g, g, g)
                    }
                    ImageFormat::Rgb332 => Rgb332::new(data[i]).into(),
                    ImageFormat::Rgb888 => {
                        let mut bytes = [0u8; 4];
                        bytes.copy_from_slice(&data[i..i + 4]);
                        Rgb888::new(u32::from_le_bytes(bytes))
                    }
                };
                self.canvas.set_pixel(x + col, y + row, color);
            }
        }
        Ok(())
    }

    /// Decode a PNG and draw it anchored at `(x, y)`.
    ///
    /// Pixels with alpha below half are skipped. Scaling is nearest-neighbor.
    ///
    /// # Errors
    ///
    /// [`Error::Png`] when the bytes are not a decodable PNG.
    pub fn draw_png(&mut self, data: &[u8], x: i32, y: i32, options: &PngOptions) -> Result<()> {
        let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png)?;
        let rgba = decoded.to_rgba8();
        let (img_w, img_h) = decoded.dimensions();

        let sx = if options.scale_x.is_finite() && options.scale_x > 0.0 {
            options.scale_x
        } else {
            1.0
        };
        let sy = if options.scale_y.is_finite() && options.scale_y > 0.0 {
            options.scale_y
        } else {
            sx
        };

        let off_x = options.offset_x.max(0);
        let off_y = options.offset_y.max(0);
        let avail_w = img_w as i32 - off_x;
        let avail_h = img_h as i32 - off_y;
        if avail_w <= 0 || avail_h <= 0 {
            return Ok(());
        }

        let mut out_w = (avail_w as f32 * sx).round() as i32;
        let mut out_h = (avail_h as f32 * sy).round() as i32;
        if options.max_width > 0 {
            out_w = out_w.min(options.max_width);
        }
        if options.max_height > 0 {
            out_h = out_h.min(options.max_height);
        }

        let x0 = match options.datum.horizontal {
            HorizontalDatum::Left => x,
            HorizontalDatum::Center => x - out_w / 2,
            HorizontalDatum::Right => x - out_w,
        };
        let y0 = match options.datum.vertical {
            VerticalDatum::Top => y,
            VerticalDatum::Middle => y - out_h / 2,
            // Images have no baseline; anchor at the bottom edge.
            VerticalDatum::Bottom | VerticalDatum::Baseline => y - out_h,
        };

        for oy in 0..out_h {
            let src_y = off_y + ((oy as f32 + 0.5) / sy) as i32;
            if src_y < 0 || src_y >= img_h as i32 {
                continue;
            }
            for ox in 0..out_w {
                let src_x = off_x + ((ox as f32 + 0.5) / sx) as i32;
                if src_x < 0 || src_x >= img_w as i32 {
                    continue;
                }
                let px = rgba.get_pixel(src_x as u32, src_y as u32);
                if px.0[3] >= 128 {
                    self.canvas.set_pixel(
                        x0 + ox,
                        y0 + oy,
                        Rgb888::from_channels(px.0[0], px.0[1], px.0[2]),
                    );
                }
            }
        }
        Ok(())
    }
}
