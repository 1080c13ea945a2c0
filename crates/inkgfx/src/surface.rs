//! Drawing surface
//!
//! A [`Surface`] pairs a [`Canvas`] with its own text state; the root target
//! and every sprite each own one. Primitive drawing goes through
//! `embedded-graphics` primitives so clipping and rasterization follow the
//! ecosystem behavior; the canvas clips out-of-bounds pixels.

use core::convert::Infallible;

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};

use crate::canvas::{Canvas, PixelFormat};
use crate::color::Rgb888;
use crate::error::Result;
use crate::text::TextState;

pub struct Surface {
    pub(crate) canvas: Canvas,
    pub(crate) text: TextState,
}

// Drawing into the canvas cannot fail; this discharges the Infallible error.
fn infallible(result: core::result::Result<(), Infallible>) {
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

impl Surface {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            canvas: Canvas::new(width, height, format),
            text: TextState::default(),
        }
    }

    /// Wrap a caller-owned pixel buffer. See [`Canvas::from_raw`] for the
    /// safety contract.
    ///
    /// # Safety
    ///
    /// Same as [`Canvas::from_raw`].
    pub unsafe fn from_raw(width: u32, height: u32, format: PixelFormat, ptr: *mut u8) -> Self {
        Self {
            canvas: unsafe { Canvas::from_raw(width, height, format, ptr) },
            text: TextState::default(),
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn width(&self) -> i32 {
        self.canvas.width()
    }

    pub fn height(&self) -> i32 {
        self.canvas.height()
    }

    pub fn rotation(&self) -> u8 {
        self.canvas.rotation()
    }

    pub fn set_rotation(&mut self, rotation: u8) -> Result<()> {
        self.canvas.set_rotation(rotation)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb888> {
        self.canvas.pixel(x, y)
    }

    /// Fill the entire surface with one color.
    pub fn clear(&mut self, color: Rgb888) {
        self.canvas.fill(color);
    }

    /// Fill a rectangle. Non-positive sizes draw nothing; out-of-bounds
    /// regions are clipped.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Rgb888) {
        if width <= 0 || height <= 0 {
            return;
        }
        infallible(
            Rectangle::new(Point::new(x, y), Size::new(width as u32, height as u32))
                .into_styled(PrimitiveStyle::with_fill(color.into()))
                .draw(&mut self.canvas),
        );
    }

    /// Draw a one-pixel rectangle outline.
    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Rgb888) {
        if width <= 0 || height <= 0 {
            return;
        }
        infallible(
            Rectangle::new(Point::new(x, y), Size::new(width as u32, height as u32))
                .into_styled(PrimitiveStyle::with_stroke(color.into(), 1))
                .draw(&mut self.canvas),
        );
    }

    /// Draw a one-pixel line between two endpoints, inclusive.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb888) {
        infallible(
            Line::new(Point::new(x0, y0), Point::new(x1, y1))
                .into_styled(PrimitiveStyle::with_stroke(color.into(), 1))
                .draw(&mut self.canvas),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_rect_paints_exactly_the_region() {
        let mut s = Surface::new(40, 40, PixelFormat::Rgb888);
        s.clear(Rgb888::WHITE);
        s.fill_rect(10, 10, 20, 20, Rgb888::BLACK);
        for y in 0..40 {
            for x in 0..40 {
                let expected = if (10..30).contains(&x) && (10..30).contains(&y) {
                    Rgb888::BLACK
                } else {
                    Rgb888::WHITE
                };
                assert_eq!(s.pixel(x, y), Some(expected), "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn fill_rect_ignores_non_positive_sizes() {
        let mut s = Surface::new(8, 8, PixelFormat::Rgb888);
        s.fill_rect(0, 0, 0, 5, Rgb888::WHITE);
        s.fill_rect(0, 0, 5, -1, Rgb888::WHITE);
        assert!(s.canvas().data().iter().all(|&b| b == 0));
    }

    #[test]
    fn draw_rect_outline_leaves_interior_untouched() {
        let mut s = Surface::new(20, 20, PixelFormat::Rgb888);
        s.draw_rect(2, 2, 10, 10, Rgb888::WHITE);
        assert_eq!(s.pixel(2, 2), Some(Rgb888::WHITE));
        assert_eq!(s.pixel(11, 11), Some(Rgb888::WHITE));
        assert_eq!(s.pixel(5, 5), Some(Rgb888::BLACK));
    }

    #[test]
    fn draw_line_covers_both_endpoints() {
        let mut s = Surface::new(20, 20, PixelFormat::Rgb888);
        s.draw_line(1, 1, 8, 5, Rgb888::WHITE);
        assert_eq!(s.pixel(1, 1), Some(Rgb888::WHITE));
        assert_eq!(s.pixel(8, 5), Some(Rgb888::WHITE));
    }

    #[test]
    fn drawing_clips_at_the_edges() {
        let mut s = Surface::new(10, 10, PixelFormat::Rgb888);
        s.fill_rect(-5, -5, 8, 8, Rgb888::WHITE);
        s.draw_line(5, 5, 50, 5, Rgb888::WHITE);
        assert_eq!(s.pixel(0, 0), Some(Rgb888::WHITE));
        assert_eq!(s.pixel(9, 5), Some(Rgb888::WHITE));
    }
}
