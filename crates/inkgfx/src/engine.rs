//! Handle-based engine
//!
//! [`Engine`] owns the root surface, the panel behind it and the sprite
//! registry, and dispatches every operation through a tagged [`Handle`].
//! Handles never carry pointers: the root is a reserved value and sprites
//! encode a registry slot plus generation, so a wrong-variant or stale handle
//! is a checked [`Error`] at the call boundary rather than undefined
//! behavior.
//!
//! Drawing on the root flushes a frame to the panel after every operation
//! unless a write bracket is open; `start_write`/`end_write` nest, and the
//! outermost `end_write` performs the single batched flush. [`WriteScope`]
//! wraps the pair so the closing call runs on every exit path.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::canvas::PixelFormat;
use crate::color::Rgb888;
use crate::datum::Datum;
use crate::error::{Error, Result};
use crate::image::{ImageFormat, PngOptions};
use crate::panel::{Panel, RefreshMode};
use crate::sprite::{Registry, Sprite};
use crate::surface::Surface;
use crate::text::{Font, FontMetrics};

const SPRITE_TAG: u32 = 0x8000_0000;

/// Opaque reference to a drawing target.
///
/// The raw `u32` form crosses the binding surface: `0` is invalid, `1` is the
/// root display target, and tagged values name sprite slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handle(u32);

impl Handle {
    /// The null handle; resolves to nothing.
    pub const INVALID: Handle = Handle(0);
    /// The process's singleton display target.
    pub const ROOT: Handle = Handle(1);

    pub(crate) fn sprite(index: usize, generation: u16) -> Handle {
        Handle(SPRITE_TAG | ((generation as u32 & 0x7FFF) << 16) | (index as u32 & 0xFFFF))
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn from_raw(raw: u32) -> Handle {
        Handle(raw)
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub const fn is_root(self) -> bool {
        self.0 == 1
    }

    pub const fn is_sprite(self) -> bool {
        self.0 & SPRITE_TAG != 0
    }

    fn sprite_parts(self) -> Option<(usize, u16)> {
        if self.is_sprite() {
            Some(((self.0 & 0xFFFF) as usize, ((self.0 >> 16) & 0x7FFF) as u16))
        } else {
            None
        }
    }
}

/// The graphics engine: root target, panel, and sprite registry.
pub struct Engine<P: Panel> {
    root: Surface,
    panel: P,
    sprites: Registry,
    write_depth: u32,
}

impl<P: Panel> Engine<P> {
    /// Create an engine with a root framebuffer of the given native size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for non-positive sizes.
    pub fn new(width: i32, height: i32, panel: P) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        log::debug!("engine setup: {width}x{height}, epd={}", panel.is_epd());
        Ok(Self {
            root: Surface::new(width as u32, height as u32, PixelFormat::Rgb888),
            panel,
            sprites: Registry::new(),
            write_depth: 0,
        })
    }

    fn surface(&self, handle: Handle) -> Result<&Surface> {
        if handle.is_root() {
            return Ok(&self.root);
        }
        match handle.sprite_parts() {
            Some((index, generation)) => self
                .sprites
                .get(index, generation)
                .map(|s| &s.surface)
                .ok_or(Error::InvalidHandle),
            None => Err(Error::InvalidHandle),
        }
    }

    fn surface_mut(&mut self, handle: Handle) -> Result<&mut Surface> {
        if handle.is_root() {
            return Ok(&mut self.root);
        }
        match handle.sprite_parts() {
            Some((index, generation)) => self
                .sprites
                .get_mut(index, generation)
                .map(|s| &mut s.surface)
                .ok_or(Error::InvalidHandle),
            None => Err(Error::InvalidHandle),
        }
    }

    /// Flush the root frame unless a write bracket is open.
    fn maybe_flush(&mut self, handle: Handle) {
        if handle.is_root() && self.write_depth == 0 {
            self.panel.flush(self.root.canvas());
        }
    }

    // --- display properties -------------------------------------------------

    pub fn width(&self, handle: Handle) -> Result<i32> {
        Ok(self.surface(handle)?.width())
    }

    pub fn height(&self, handle: Handle) -> Result<i32> {
        Ok(self.surface(handle)?.height())
    }

    pub fn rotation(&self, handle: Handle) -> Result<u8> {
        Ok(self.surface(handle)?.rotation())
    }

    pub fn set_rotation(&mut self, handle: Handle, rotation: u8) -> Result<()> {
        self.surface_mut(handle)?.set_rotation(rotation)
    }

    /// Whether the display behind the root target is e-paper class.
    ///
    /// # Errors
    ///
    /// [`Error::WrongTarget`] on a sprite handle: the property belongs to the
    /// panel, which only the root is bound to.
    pub fn is_epd(&self, handle: Handle) -> Result<bool> {
        if !handle.is_root() {
            self.surface(handle)?;
            return Err(Error::WrongTarget { operation: "is_epd" });
        }
        Ok(self.panel.is_epd())
    }

    pub fn refresh_mode(&self, handle: Handle) -> Result<RefreshMode> {
        if !handle.is_root() {
            self.surface(handle)?;
            return Err(Error::WrongTarget {
                operation: "refresh_mode",
            });
        }
        Ok(self.panel.refresh_mode())
    }

    pub fn set_refresh_mode(&mut self, handle: Handle, mode: RefreshMode) -> Result<()> {
        if !handle.is_root() {
            self.surface(handle)?;
            return Err(Error::WrongTarget {
                operation: "set_refresh_mode",
            });
        }
        self.panel.set_refresh_mode(mode);
        Ok(())
    }

    /// The panel behind the root target.
    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    // --- drawing primitives -------------------------------------------------

    pub fn clear(&mut self, handle: Handle, color: Rgb888) -> Result<()> {
        self.surface_mut(handle)?.clear(color);
        self.maybe_flush(handle);
        Ok(())
    }

    pub fn fill_rect(
        &mut self,
        handle: Handle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: Rgb888,
    ) -> Result<()> {
        self.surface_mut(handle)?.fill_rect(x, y, width, height, color);
        self.maybe_flush(handle);
        Ok(())
    }

    pub fn draw_rect(
        &mut self,
        handle: Handle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: Rgb888,
    ) -> Result<()> {
        self.surface_mut(handle)?.draw_rect(x, y, width, height, color);
        self.maybe_flush(handle);
        Ok(())
    }

    pub fn draw_line(
        &mut self,
        handle: Handle,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Rgb888,
    ) -> Result<()> {
        self.surface_mut(handle)?.draw_line(x0, y0, x1, y1, color);
        self.maybe_flush(handle);
        Ok(())
    }

    /// Read one pixel back. `None` when the point is outside the target.
    pub fn read_pixel(&self, handle: Handle, x: i32, y: i32) -> Result<Option<Rgb888>> {
        Ok(self.surface(handle)?.pixel(x, y))
    }

    // --- images -------------------------------------------------------------

    pub fn push_image(
        &mut self,
        handle: Handle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: ImageFormat,
        data: &[u8],
    ) -> Result<()> {
        self.surface_mut(handle)?
            .push_image(x, y, width, height, format, data)?;
        self.maybe_flush(handle);
        Ok(())
    }

    pub fn draw_png(
        &mut self,
        handle: Handle,
        data: &[u8],
        x: i32,
        y: i32,
        options: &PngOptions,
    ) -> Result<()> {
        self.surface_mut(handle)?.draw_png(data, x, y, options)?;
        self.maybe_flush(handle);
        Ok(())
    }

    // --- sprites ------------------------------------------------------------

    /// Allocate an off-screen sprite parented to `parent`.
    ///
    /// Construction is atomic: the sprite is registered only after its
    /// backing buffer exists, so a failure leaks nothing and no handle to a
    /// partially built sprite is ever visible.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidHandle`] when `parent` does not resolve,
    /// [`Error::InvalidDimensions`] for non-positive sizes.
    pub fn create_sprite(&mut self, parent: Handle, width: i32, height: i32) -> Result<Handle> {
        self.surface(parent)?;
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let sprite = Sprite {
            surface: Surface::new(width as u32, height as u32, PixelFormat::Rgb888),
            parent,
        };
        let (index, generation) = self.sprites.insert(sprite).ok_or(Error::SpriteLimit)?;
        let handle = Handle::sprite(index, generation);
        log::debug!("sprite {:#010x} created: {width}x{height}", handle.raw());
        Ok(handle)
    }

    /// Like [`create_sprite`](Self::create_sprite) but drawing into a
    /// caller-owned buffer, which is never freed by the engine.
    ///
    /// # Safety
    ///
    /// `buffer` must point to at least `width * height * bpp / 8` writable
    /// bytes that outlive the sprite and are not accessed from elsewhere
    /// while it is alive.
    pub unsafe fn create_sprite_static(
        &mut self,
        parent: Handle,
        width: i32,
        height: i32,
        buffer: *mut u8,
        bpp: u8,
    ) -> Result<Handle> {
        self.surface(parent)?;
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let format = PixelFormat::from_bits(bpp)?;
        let sprite = Sprite {
            surface: unsafe { Surface::from_raw(width as u32, height as u32, format, buffer) },
            parent,
        };
        let (index, generation) = self.sprites.insert(sprite).ok_or(Error::SpriteLimit)?;
        Ok(Handle::sprite(index, generation))
    }

    /// Release a sprite. The invalid handle is a no-op; owned backing
    /// buffers are freed, caller-owned (static) buffers are not.
    ///
    /// # Errors
    ///
    /// [`Error::WrongTarget`] for the root (which is never destroyed),
    /// [`Error::InvalidHandle`] for a stale sprite handle.
    pub fn delete_sprite(&mut self, handle: Handle) -> Result<()> {
        if !handle.is_valid() {
            return Ok(());
        }
        if handle.is_root() {
            return Err(Error::WrongTarget {
                operation: "delete_sprite",
            });
        }
        let (index, generation) = handle.sprite_parts().ok_or(Error::InvalidHandle)?;
        self.sprites
            .remove(index, generation)
            .ok_or(Error::InvalidHandle)?;
        log::debug!("sprite {:#010x} deleted", handle.raw());
        Ok(())
    }

    /// Composite a sprite onto the parent recorded at its creation.
    ///
    /// # Errors
    ///
    /// [`Error::WrongTarget`] on the root handle, [`Error::InvalidHandle`]
    /// when the sprite or its parent no longer exists.
    pub fn push_sprite(&mut self, handle: Handle, x: i32, y: i32) -> Result<()> {
        let (index, generation) = handle.sprite_parts().ok_or(Error::WrongTarget {
            operation: "push_sprite",
        })?;
        let parent = self
            .sprites
            .get(index, generation)
            .ok_or(Error::InvalidHandle)?
            .parent;

        if parent.is_root() {
            let sprite = self
                .sprites
                .get(index, generation)
                .ok_or(Error::InvalidHandle)?;
            blit(&sprite.surface, &mut self.root, x, y);
            self.maybe_flush(Handle::ROOT);
            return Ok(());
        }

        let dst = parent.sprite_parts().ok_or(Error::InvalidHandle)?;
        let (src, dst) = self
            .sprites
            .pair_mut((index, generation), dst)
            .ok_or(Error::InvalidHandle)?;
        blit(&src.surface, &mut dst.surface, x, y);
        Ok(())
    }

    /// Number of live sprites.
    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    // --- write bracket ------------------------------------------------------

    /// Open a write bracket on the root target: drawing is batched until the
    /// matching [`end_write`](Self::end_write). Brackets nest. On a sprite
    /// handle this is a no-op (sprites have no hardware transaction).
    pub fn start_write(&mut self, handle: Handle) -> Result<()> {
        self.surface(handle)?;
        if handle.is_root() {
            self.write_depth += 1;
        }
        Ok(())
    }

    /// Close a write bracket; the outermost close flushes the frame once.
    /// An unmatched close is logged and ignored rather than corrupting the
    /// depth count.
    pub fn end_write(&mut self, handle: Handle) -> Result<()> {
        self.surface(handle)?;
        if handle.is_root() {
            if self.write_depth == 0 {
                log::warn!("end_write without matching start_write");
                return Ok(());
            }
            self.write_depth -= 1;
            if self.write_depth == 0 {
                self.panel.flush(self.root.canvas());
            }
        }
        Ok(())
    }

    /// Open a write bracket that closes itself when the scope drops, on
    /// every exit path.
    pub fn write_scope(&mut self, handle: Handle) -> Result<WriteScope<'_, P>> {
        self.start_write(handle)?;
        Ok(WriteScope {
            engine: self,
            handle,
        })
    }

    // --- text ---------------------------------------------------------------

    /// Render the valid UTF-8 prefix of `bytes` at the target's cursor.
    /// Returns the number of bytes consumed.
    pub fn write_bytes(&mut self, handle: Handle, bytes: &[u8]) -> Result<usize> {
        let consumed = self.surface_mut(handle)?.write_bytes(bytes);
        self.maybe_flush(handle);
        Ok(consumed)
    }

    pub fn set_cursor(&mut self, handle: Handle, x: i32, y: i32) -> Result<()> {
        self.surface_mut(handle)?.set_cursor(x, y);
        Ok(())
    }

    pub fn set_text_size(&mut self, handle: Handle, sx: f32, sy: f32) -> Result<()> {
        self.surface_mut(handle)?.set_text_size(sx, sy);
        Ok(())
    }

    pub fn set_text_datum(&mut self, handle: Handle, datum: Datum) -> Result<()> {
        self.surface_mut(handle)?.set_text_datum(datum);
        Ok(())
    }

    pub fn set_text_color(&mut self, handle: Handle, fg: Rgb888, bg: Rgb888) -> Result<()> {
        self.surface_mut(handle)?.set_text_color(fg, bg);
        Ok(())
    }

    /// Draw one character; returns the scaled advance width.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_char(
        &mut self,
        handle: Handle,
        c: char,
        x: i32,
        y: i32,
        fg: Rgb888,
        bg: Rgb888,
        sx: f32,
        sy: f32,
    ) -> Result<i32> {
        let advance = self.surface_mut(handle)?.draw_char(c, x, y, fg, bg, sx, sy);
        self.maybe_flush(handle);
        Ok(advance)
    }

    pub fn set_font(&mut self, handle: Handle, font: Arc<Font>) -> Result<()> {
        self.surface_mut(handle)?.set_font(font);
        Ok(())
    }

    pub fn font(&self, handle: Handle) -> Result<Arc<Font>> {
        Ok(self.surface(handle)?.font())
    }

    /// Active font line height scaled by the target's y text size.
    pub fn font_height(&self, handle: Handle) -> Result<i32> {
        Ok(self.surface(handle)?.font_height())
    }

    pub fn measure_string(&self, handle: Handle, s: &str, sx: f32, sy: f32) -> Result<(i32, i32)> {
        Ok(self.surface(handle)?.measure_string(s, sx, sy))
    }

    /// Draw a string anchored per `datum`; returns the measured size.
    pub fn draw_string(
        &mut self,
        handle: Handle,
        s: &str,
        x: i32,
        y: i32,
        datum: Datum,
    ) -> Result<(i32, i32)> {
        let size = self.surface_mut(handle)?.draw_string(s, x, y, datum);
        self.maybe_flush(handle);
        Ok(size)
    }

    pub fn default_font_metrics(&self, handle: Handle) -> Result<FontMetrics> {
        Ok(self.surface(handle)?.font().default_metrics())
    }
}

fn blit(src: &Surface, dst: &mut Surface, x: i32, y: i32) {
    for sy in 0..src.height() {
        for sx in 0..src.width() {
            if let Some(px) = src.pixel(sx, sy) {
                dst.canvas_mut().set_pixel(x + sx, y + sy, px);
            }
        }
    }
}

/// RAII write bracket: derefs to the engine and closes the bracket on drop.
pub struct WriteScope<'a, P: Panel> {
    engine: &'a mut Engine<P>,
    handle: Handle,
}

impl<P: Panel> Deref for WriteScope<'_, P> {
    type Target = Engine<P>;

    fn deref(&self) -> &Engine<P> {
        self.engine
    }
}

impl<P: Panel> DerefMut for WriteScope<'_, P> {
    fn deref_mut(&mut self) -> &mut Engine<P> {
        self.engine
    }
}

impl<P: Panel> Drop for WriteScope<'_, P> {
    fn drop(&mut self) {
        // The handle resolved when the scope opened; a failure here can only
        // mean the sprite was deleted inside the scope, which needs no close.
        let _ = self.engine.end_write(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::SimPanel;

    fn engine() -> Engine<SimPanel> {
        Engine::new(64, 48, SimPanel::new()).unwrap()
    }

    #[test]
    fn setup_rejects_bad_dimensions() {
        assert!(matches!(
            Engine::new(0, 48, SimPanel::new()),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Engine::new(64, -1, SimPanel::new()),
            Err(Error::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn root_dimensions_follow_rotation() {
        let mut e = engine();
        assert_eq!(e.width(Handle::ROOT).unwrap(), 64);
        assert_eq!(e.height(Handle::ROOT).unwrap(), 48);
        e.set_rotation(Handle::ROOT, 1).unwrap();
        assert_eq!(e.width(Handle::ROOT).unwrap(), 48);
        assert_eq!(e.height(Handle::ROOT).unwrap(), 64);
        e.set_rotation(Handle::ROOT, 2).unwrap();
        assert_eq!(e.width(Handle::ROOT).unwrap(), 64);
    }

    #[test]
    fn sprite_creation_validates_dimensions_without_leaking() {
        let mut e = engine();
        for (w, h) in [(0, 10), (10, 0), (-3, 10), (10, -3)] {
            assert!(matches!(
                e.create_sprite(Handle::ROOT, w, h),
                Err(Error::InvalidDimensions { .. })
            ));
        }
        assert_eq!(e.sprite_count(), 0);
        let s = e.create_sprite(Handle::ROOT, 10, 10).unwrap();
        assert!(s.is_sprite());
        assert_eq!(e.sprite_count(), 1);
    }

    #[test]
    fn delete_sprite_invalid_handle_is_a_noop() {
        let mut e = engine();
        assert!(e.delete_sprite(Handle::INVALID).is_ok());
    }

    #[test]
    fn delete_sprite_rejects_root_and_stale_handles() {
        let mut e = engine();
        assert!(matches!(
            e.delete_sprite(Handle::ROOT),
            Err(Error::WrongTarget { .. })
        ));
        let s = e.create_sprite(Handle::ROOT, 4, 4).unwrap();
        e.delete_sprite(s).unwrap();
        assert!(matches!(e.delete_sprite(s), Err(Error::InvalidHandle)));
        assert!(matches!(e.width(s), Err(Error::InvalidHandle)));
    }

    #[test]
    fn refresh_mode_is_a_root_only_property() {
        let mut e = engine();
        assert_eq!(e.refresh_mode(Handle::ROOT).unwrap(), RefreshMode::Quality);
        e.set_refresh_mode(Handle::ROOT, RefreshMode::Fastest).unwrap();
        assert_eq!(e.refresh_mode(Handle::ROOT).unwrap(), RefreshMode::Fastest);

        let s = e.create_sprite(Handle::ROOT, 4, 4).unwrap();
        assert!(matches!(
            e.refresh_mode(s),
            Err(Error::WrongTarget { .. })
        ));
        assert!(matches!(
            e.set_refresh_mode(s, RefreshMode::Fast),
            Err(Error::WrongTarget { .. })
        ));
        assert!(matches!(e.is_epd(s), Err(Error::WrongTarget { .. })));
        assert!(e.is_epd(Handle::ROOT).unwrap());
    }

    #[test]
    fn push_sprite_requires_a_sprite_handle() {
        let mut e = engine();
        assert!(matches!(
            e.push_sprite(Handle::ROOT, 0, 0),
            Err(Error::WrongTarget { .. })
        ));
    }

    #[test]
    fn push_sprite_composites_onto_the_root() {
        let mut e = engine();
        let s = e.create_sprite(Handle::ROOT, 4, 4).unwrap();
        e.clear(s, Rgb888::WHITE).unwrap();
        e.push_sprite(s, 10, 10).unwrap();
        assert_eq!(
            e.read_pixel(Handle::ROOT, 10, 10).unwrap(),
            Some(Rgb888::WHITE)
        );
        assert_eq!(
            e.read_pixel(Handle::ROOT, 13, 13).unwrap(),
            Some(Rgb888::WHITE)
        );
        assert_eq!(
            e.read_pixel(Handle::ROOT, 14, 14).unwrap(),
            Some(Rgb888::BLACK)
        );
    }

    #[test]
    fn push_sprite_composites_onto_another_sprite() {
        let mut e = engine();
        let outer = e.create_sprite(Handle::ROOT, 8, 8).unwrap();
        let inner = e.create_sprite(outer, 2, 2).unwrap();
        e.clear(inner, Rgb888::WHITE).unwrap();
        e.push_sprite(inner, 3, 3).unwrap();
        assert_eq!(e.read_pixel(outer, 3, 3).unwrap(), Some(Rgb888::WHITE));
        assert_eq!(e.read_pixel(outer, 0, 0).unwrap(), Some(Rgb888::BLACK));
    }

    #[test]
    fn push_sprite_with_deleted_parent_is_reported() {
        let mut e = engine();
        let outer = e.create_sprite(Handle::ROOT, 8, 8).unwrap();
        let inner = e.create_sprite(outer, 2, 2).unwrap();
        e.delete_sprite(outer).unwrap();
        assert!(matches!(
            e.push_sprite(inner, 0, 0),
            Err(Error::InvalidHandle)
        ));
    }

    #[test]
    fn unbatched_drawing_flushes_per_operation() {
        let mut e = engine();
        let before = e.panel().flush_count();
        e.clear(Handle::ROOT, Rgb888::WHITE).unwrap();
        e.fill_rect(Handle::ROOT, 0, 0, 4, 4, Rgb888::BLACK).unwrap();
        assert_eq!(e.panel().flush_count(), before + 2);
    }

    #[test]
    fn write_bracket_batches_into_one_flush() {
        let mut e = engine();
        let before = e.panel().flush_count();
        e.start_write(Handle::ROOT).unwrap();
        e.clear(Handle::ROOT, Rgb888::WHITE).unwrap();
        e.fill_rect(Handle::ROOT, 0, 0, 4, 4, Rgb888::BLACK).unwrap();
        e.draw_line(Handle::ROOT, 0, 0, 10, 10, Rgb888::BLACK).unwrap();
        assert_eq!(e.panel().flush_count(), before);
        e.end_write(Handle::ROOT).unwrap();
        assert_eq!(e.panel().flush_count(), before + 1);
    }

    #[test]
    fn nested_brackets_flush_once_at_the_outermost_close() {
        let mut e = engine();
        let before = e.panel().flush_count();
        e.start_write(Handle::ROOT).unwrap();
        e.start_write(Handle::ROOT).unwrap();
        e.clear(Handle::ROOT, Rgb888::WHITE).unwrap();
        e.end_write(Handle::ROOT).unwrap();
        assert_eq!(e.panel().flush_count(), before);
        e.end_write(Handle::ROOT).unwrap();
        assert_eq!(e.panel().flush_count(), before + 1);
    }

    #[test]
    fn unmatched_end_write_is_ignored() {
        let mut e = engine();
        let before = e.panel().flush_count();
        e.end_write(Handle::ROOT).unwrap();
        assert_eq!(e.panel().flush_count(), before);
        // The depth counter did not go negative: a later bracket still works.
        e.start_write(Handle::ROOT).unwrap();
        e.clear(Handle::ROOT, Rgb888::WHITE).unwrap();
        e.end_write(Handle::ROOT).unwrap();
        assert_eq!(e.panel().flush_count(), before + 1);
    }

    #[test]
    fn write_scope_closes_on_early_return() {
        fn draw(e: &mut Engine<SimPanel>) -> Result<()> {
            let mut scope = e.write_scope(Handle::ROOT)?;
            scope.clear(Handle::ROOT, Rgb888::WHITE)?;
            // Early error return: the scope must still close the bracket.
            scope.push_image(Handle::ROOT, 0, 0, -1, -1, ImageFormat::Gray8, &[])?;
            Ok(())
        }
        let mut e = engine();
        let before = e.panel().flush_count();
        assert!(draw(&mut e).is_err());
        assert_eq!(e.panel().flush_count(), before + 1);
    }

    #[test]
    fn static_sprite_uses_the_callers_buffer_and_never_frees_it() {
        let mut e = engine();
        let mut backing = vec![0u8; 4 * 4];
        let s = unsafe {
            e.create_sprite_static(Handle::ROOT, 4, 4, backing.as_mut_ptr(), 8)
                .unwrap()
        };
        e.clear(s, Rgb888::WHITE).unwrap();
        e.delete_sprite(s).unwrap();
        // The caller's memory survived deletion and holds the pixels.
        assert!(backing.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn static_sprite_rejects_unknown_bit_depths() {
        let mut e = engine();
        let mut backing = vec![0u8; 64];
        let result =
            unsafe { e.create_sprite_static(Handle::ROOT, 4, 4, backing.as_mut_ptr(), 16) };
        assert!(matches!(result, Err(Error::InvalidBitDepth(16))));
        assert_eq!(e.sprite_count(), 0);
    }
}
