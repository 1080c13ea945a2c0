//! Font handling and text rendering
//!
//! Two font backends sit behind one [`Font`] type: the built-in
//! `embedded-graphics` mono font used as the default, and caller-loaded
//! TTF/OTF fonts rasterized by `fontdue`. Glyphs are rasterized to coverage
//! bitmaps and blitted onto the canvas with independent x/y scale factors,
//! so both backends share the drawing path.
//!
//! Every target carries its own [`TextState`]: cursor, scale, datum, colors
//! and the active font.

use std::sync::Arc;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888 as EgRgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use crate::canvas::{Canvas, PixelFormat};
use crate::color::Rgb888;
use crate::datum::{Datum, HorizontalDatum, VerticalDatum};
use crate::error::{Error, Result};
use crate::surface::Surface;

/// Per-font metrics, in unscaled pixels.
///
/// Field order matches the binding-surface metrics structure and must be kept:
/// width, x_advance, x_offset, height, y_advance, y_offset, baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FontMetrics {
    /// Glyph bitmap width.
    pub width: i16,
    /// Horizontal pen advance.
    pub x_advance: i16,
    /// Offset from the pen to the left edge of the bitmap.
    pub x_offset: i16,
    /// Glyph bitmap height.
    pub height: i16,
    /// Vertical advance (line feed distance).
    pub y_advance: i16,
    /// Offset from the cell top to the top of the bitmap.
    pub y_offset: i16,
    /// Distance from the cell top to the baseline.
    pub baseline: i16,
}

/// A rasterized glyph ready for blitting.
pub(crate) struct Glyph {
    /// Row-major coverage, one byte per pixel, 0..=255.
    pub coverage: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Horizontal offset from the pen position.
    pub left: i32,
    /// Vertical offset from the cell top.
    pub top: i32,
    /// Unscaled horizontal advance.
    pub advance: i32,
}

enum Glyphs {
    Mono(&'static MonoFont<'static>),
    Ttf { font: fontdue::Font, px: f32 },
}

/// A font descriptor: either the built-in mono font or a loaded TTF/OTF.
pub struct Font {
    glyphs: Glyphs,
}

impl Font {
    /// The built-in 6x10 mono font every target starts with.
    pub fn builtin() -> Self {
        Self {
            glyphs: Glyphs::Mono(&FONT_6X10),
        }
    }

    /// Use another `embedded-graphics` mono font.
    pub fn from_mono(font: &'static MonoFont<'static>) -> Self {
        Self {
            glyphs: Glyphs::Mono(font),
        }
    }

    /// Parse a TTF/OTF font and fix its rasterization size in pixels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FontData`] when `fontdue` rejects the bytes.
    pub fn from_ttf(data: &[u8], px: f32) -> Result<Self> {
        let px = if px.is_finite() && px > 0.0 { px } else { 16.0 };
        let settings = fontdue::FontSettings {
            scale: px,
            ..fontdue::FontSettings::default()
        };
        let font = fontdue::Font::from_bytes(data, settings).map_err(Error::FontData)?;
        Ok(Self {
            glyphs: Glyphs::Ttf { font, px },
        })
    }

    /// Unscaled line height in pixels.
    pub fn line_height(&self) -> i32 {
        match &self.glyphs {
            Glyphs::Mono(f) => f.character_size.height as i32,
            Glyphs::Ttf { font, px } => match font.horizontal_line_metrics(*px) {
                Some(lm) => lm.new_line_size.round() as i32,
                None => px.round() as i32,
            },
        }
    }

    fn ascent(&self) -> i32 {
        match &self.glyphs {
            Glyphs::Mono(f) => f.baseline as i32,
            Glyphs::Ttf { font, px } => match font.horizontal_line_metrics(*px) {
                Some(lm) => lm.ascent.round() as i32,
                None => px.round() as i32,
            },
        }
    }

    /// Font-wide default metrics.
    pub fn default_metrics(&self) -> FontMetrics {
        match &self.glyphs {
            Glyphs::Mono(f) => {
                let w = f.character_size.width as i16;
                let h = f.character_size.height as i16;
                FontMetrics {
                    width: w,
                    x_advance: w + f.character_spacing as i16,
                    x_offset: 0,
                    height: h,
                    y_advance: h,
                    y_offset: 0,
                    baseline: f.baseline as i16,
                }
            }
            Glyphs::Ttf { font, px } => {
                let m = font.metrics('M', *px);
                FontMetrics {
                    width: m.width as i16,
                    x_advance: m.advance_width.round() as i16,
                    x_offset: m.xmin as i16,
                    height: self.line_height() as i16,
                    y_advance: self.line_height() as i16,
                    y_offset: 0,
                    baseline: self.ascent() as i16,
                }
            }
        }
    }

    /// Metrics for one character.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Glyph`] when a TTF font has no glyph for `c`. The
    /// mono backend substitutes its fallback glyph and never fails.
    pub fn glyph_metrics(&self, c: char) -> Result<FontMetrics> {
        match &self.glyphs {
            Glyphs::Mono(_) => Ok(self.default_metrics()),
            Glyphs::Ttf { font, px } => {
                if font.lookup_glyph_index(c) == 0 {
                    return Err(Error::Glyph(c));
                }
                let m = font.metrics(c, *px);
                let ascent = self.ascent();
                Ok(FontMetrics {
                    width: m.width as i16,
                    x_advance: m.advance_width.round() as i16,
                    x_offset: m.xmin as i16,
                    height: m.height as i16,
                    y_advance: self.line_height() as i16,
                    y_offset: (ascent - (m.ymin + m.height as i32)) as i16,
                    baseline: ascent as i16,
                })
            }
        }
    }

    pub(crate) fn rasterize(&self, c: char) -> Glyph {
        match &self.glyphs {
            Glyphs::Mono(f) => {
                let w = f.character_size.width;
                let h = f.character_size.height;
                let mut cell = Canvas::new(w, h, PixelFormat::Rgb888);
                let style = MonoTextStyle::new(f, EgRgb888::WHITE);
                let mut buf = [0u8; 4];
                let s: &str = c.encode_utf8(&mut buf);
                // Canvas drawing is infallible.
                let _ = Text::with_baseline(s, Point::zero(), style, Baseline::Top).draw(&mut cell);
                let mut coverage = Vec::with_capacity((w * h) as usize);
                for y in 0..h as i32 {
                    for x in 0..w as i32 {
                        let lit = cell.pixel(x, y).is_some_and(|p| p != Rgb888::BLACK);
                        coverage.push(if lit { 255 } else { 0 });
                    }
                }
                Glyph {
                    coverage,
                    width: w,
                    height: h,
                    left: 0,
                    top: 0,
                    advance: (w + f.character_spacing) as i32,
                }
            }
            Glyphs::Ttf { font, px } => {
                let (m, coverage) = font.rasterize(c, *px);
                Glyph {
                    coverage,
                    width: m.width as u32,
                    height: m.height as u32,
                    left: m.xmin,
                    top: self.ascent() - (m.ymin + m.height as i32),
                    advance: m.advance_width.round() as i32,
                }
            }
        }
    }
}

/// Per-target text rendering state.
pub(crate) struct TextState {
    pub cursor_x: i32,
    pub cursor_y: i32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub datum: Datum,
    pub fg: Rgb888,
    pub bg: Rgb888,
    pub font: Arc<Font>,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            cursor_x: 0,
            cursor_y: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            datum: Datum::TOP_LEFT,
            fg: Rgb888::WHITE,
            bg: Rgb888::BLACK,
            font: Arc::new(Font::builtin()),
        }
    }
}

fn sanitize_scale(s: f32) -> f32 {
    if s.is_finite() && s > 0.0 {
        s
    } else {
        1.0
    }
}

fn scaled(value: i32, scale: f32) -> i32 {
    (value as f32 * scale).round() as i32
}

impl Surface {
    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.text.cursor_x = x;
        self.text.cursor_y = y;
    }

    pub fn cursor(&self) -> (i32, i32) {
        (self.text.cursor_x, self.text.cursor_y)
    }

    /// Non-positive or non-finite factors snap to 1.0.
    pub fn set_text_size(&mut self, sx: f32, sy: f32) {
        self.text.scale_x = sanitize_scale(sx);
        self.text.scale_y = sanitize_scale(sy);
    }

    pub fn set_text_datum(&mut self, datum: Datum) {
        self.text.datum = datum;
    }

    pub fn text_datum(&self) -> Datum {
        self.text.datum
    }

    pub fn set_text_color(&mut self, fg: Rgb888, bg: Rgb888) {
        self.text.fg = fg;
        self.text.bg = bg;
    }

    pub fn set_font(&mut self, font: Arc<Font>) {
        self.text.font = font;
    }

    pub fn font(&self) -> Arc<Font> {
        Arc::clone(&self.text.font)
    }

    /// Active font line height scaled by the current y text size.
    pub fn font_height(&self) -> i32 {
        scaled(self.text.font.line_height(), self.text.scale_y)
    }

    /// Draw one character with its cell top-left at `(x, y)`.
    ///
    /// The background cell is filled with `bg` first unless `bg == fg`.
    /// Returns the scaled advance width.
    pub fn draw_char(
        &mut self,
        c: char,
        x: i32,
        y: i32,
        fg: Rgb888,
        bg: Rgb888,
        sx: f32,
        sy: f32,
    ) -> i32 {
        let sx = sanitize_scale(sx);
        let sy = sanitize_scale(sy);
        let font = self.font();
        let glyph = font.rasterize(c);
        let advance = scaled(glyph.advance, sx);

        if bg != fg {
            self.fill_rect(x, y, advance, scaled(font.line_height(), sy), bg);
        }

        let out_w = (glyph.width as f32 * sx).round() as i32;
        let out_h = (glyph.height as f32 * sy).round() as i32;
        let x0 = x + scaled(glyph.left, sx);
        let y0 = y + scaled(glyph.top, sy);
        for oy in 0..out_h {
            let src_y = (((oy as f32 + 0.5) / sy) as u32).min(glyph.height.saturating_sub(1));
            for ox in 0..out_w {
                let src_x = (((ox as f32 + 0.5) / sx) as u32).min(glyph.width.saturating_sub(1));
                let cov = glyph.coverage[(src_y * glyph.width + src_x) as usize];
                if cov >= 128 {
                    self.canvas.set_pixel(x0 + ox, y0 + oy, fg);
                }
            }
        }
        advance
    }

    /// Render the valid UTF-8 prefix of `bytes` at the cursor and advance it.
    ///
    /// Handles `\n` and `\r`, wraps at the right edge, and returns the number
    /// of bytes consumed (the length of the valid prefix).
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        let text = match core::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                let valid = e.valid_up_to();
                core::str::from_utf8(&bytes[..valid]).unwrap_or("")
            }
        };

        let line_height = self.font_height();
        let width = self.width();
        for c in text.chars() {
            match c {
                '\n' => {
                    self.text.cursor_x = 0;
                    self.text.cursor_y += line_height;
                }
                '\r' => self.text.cursor_x = 0,
                _ => {
                    let (fg, bg) = (self.text.fg, self.text.bg);
                    let (sx, sy) = (self.text.scale_x, self.text.scale_y);
                    let advance = self
                        .font()
                        .glyph_metrics(c)
                        .map(|m| scaled(m.x_advance as i32, sx))
                        .unwrap_or(0);
                    if advance == 0 {
                        continue;
                    }
                    if self.text.cursor_x > 0 && self.text.cursor_x + advance > width {
                        self.text.cursor_x = 0;
                        self.text.cursor_y += line_height;
                    }
                    let (cx, cy) = (self.text.cursor_x, self.text.cursor_y);
                    self.text.cursor_x += self.draw_char(c, cx, cy, fg, bg, sx, sy);
                }
            }
        }
        text.len()
    }

    /// Measure a string at the given scale without drawing it.
    pub fn measure_string(&self, s: &str, sx: f32, sy: f32) -> (i32, i32) {
        let sx = sanitize_scale(sx);
        let sy = sanitize_scale(sy);
        let font = &self.text.font;
        let mut left = 0.0f32;
        let mut right = 0.0f32;
        let mut max_height = 0.0f32;
        for c in s.chars() {
            if let Ok(m) = font.glyph_metrics(c) {
                let offset = m.x_offset as f32 * sx;
                let advance = m.x_advance as f32 * sx;
                let width = m.width as f32 * sx;
                let height = m.height as f32 * sy;
                if left == 0.0 && right == 0.0 && offset < 0.0 {
                    left = -offset;
                    right = -offset;
                }
                right = left + advance.max(width + offset);
                left += advance;
                max_height = max_height.max(height);
            }
        }
        (right.round() as i32, max_height.round() as i32)
    }

    /// Draw a string anchored at `(x, y)` according to `datum`, using the
    /// target's current colors and scale. Returns the measured size.
    pub fn draw_string(&mut self, s: &str, x: i32, y: i32, datum: Datum) -> (i32, i32) {
        let (sx, sy) = (self.text.scale_x, self.text.scale_y);
        let (fg, bg) = (self.text.fg, self.text.bg);
        let (width, height) = self.measure_string(s, sx, sy);
        let metrics = self.text.font.default_metrics();

        let mut x = x;
        let mut y = y;
        match datum.vertical {
            VerticalDatum::Top => {}
            VerticalDatum::Middle => y -= height / 2,
            VerticalDatum::Bottom => y -= height,
            VerticalDatum::Baseline => y -= scaled(metrics.baseline as i32, sy),
        }
        match datum.horizontal {
            HorizontalDatum::Left => {}
            HorizontalDatum::Center => x -= width / 2,
            HorizontalDatum::Right => x -= width,
        }

        let mut advance = 0;
        for c in s.chars() {
            advance += self.draw_char(c, x + advance, y, fg, bg, sx, sy);
        }
        (width, height)
    }
}
