//! C-linkage surface over the graphics engine.
//!
//! Every function takes a `u32` handle instead of a raw pointer: `0` never
//! resolves, `1` is the root display created by [`inkgfx_setup`], and sprite
//! handles come back from the create calls. Handles are validated on entry,
//! so a stale or wrong-variant handle is rejected with a logged warning and a
//! sentinel return (`false`, `0`, or null) rather than undefined behavior.
//!
//! The engine behind the surface is a process-wide singleton guarded by a
//! mutex; calls are safe from any thread once setup has run.

use std::sync::{Arc, Mutex};

use inkgfx::{
    Datum, Engine, Font, Handle, ImageFormat, PngOptions, RefreshMode, Result, Rgb332, Rgb888,
    SimPanel,
};

static ENGINE: Mutex<Option<Engine<SimPanel>>> = Mutex::new(None);

/// Run `f` against the singleton engine; a missing engine or an operation
/// error is logged and mapped to `default`.
fn with_engine<T>(name: &str, default: T, f: impl FnOnce(&mut Engine<SimPanel>) -> Result<T>) -> T {
    let mut guard = match ENGINE.lock() {
        Ok(guard) => guard,
        // A panic while holding the lock cannot leave the engine in a state
        // that breaks memory safety; keep serving callers.
        Err(poisoned) => poisoned.into_inner(),
    };
    let Some(engine) = guard.as_mut() else {
        log::warn!("{name} called before setup");
        return default;
    };
    match f(engine) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{name} rejected: {e}");
            default
        }
    }
}

/// Create the singleton engine with a framebuffer of the given size and
/// return the root handle. Repeated calls return the existing root without
/// resizing. Returns `0` for non-positive dimensions.
#[no_mangle]
pub extern "C" fn inkgfx_setup(width: i32, height: i32) -> u32 {
    let mut guard = match ENGINE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if guard.is_some() {
        log::debug!("inkgfx_setup called again; returning the existing root");
        return Handle::ROOT.raw();
    }
    match Engine::new(width, height, SimPanel::new()) {
        Ok(engine) => {
            *guard = Some(engine);
            Handle::ROOT.raw()
        }
        Err(e) => {
            log::warn!("inkgfx_setup rejected: {e}");
            Handle::INVALID.raw()
        }
    }
}

// --- display properties -----------------------------------------------------

#[no_mangle]
pub extern "C" fn inkgfx_is_epd(target: u32) -> bool {
    with_engine("inkgfx_is_epd", false, |e| e.is_epd(Handle::from_raw(target)))
}

/// Current refresh mode (1..=4), or `0` when the handle is not the root.
#[no_mangle]
pub extern "C" fn inkgfx_get_refresh_mode(target: u32) -> u8 {
    with_engine("inkgfx_get_refresh_mode", 0, |e| {
        Ok(e.refresh_mode(Handle::from_raw(target))?.raw())
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_set_refresh_mode(target: u32, mode: u8) -> bool {
    with_engine("inkgfx_set_refresh_mode", false, |e| {
        e.set_refresh_mode(Handle::from_raw(target), RefreshMode::from_raw(mode)?)?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_set_rotation(target: u32, rotation: u8) -> bool {
    with_engine("inkgfx_set_rotation", false, |e| {
        e.set_rotation(Handle::from_raw(target), rotation)?;
        Ok(true)
    })
}

/// Logical width of the target, `0` for an unknown handle.
#[no_mangle]
pub extern "C" fn inkgfx_width(target: u32) -> i32 {
    with_engine("inkgfx_width", 0, |e| e.width(Handle::from_raw(target)))
}

#[no_mangle]
pub extern "C" fn inkgfx_height(target: u32) -> i32 {
    with_engine("inkgfx_height", 0, |e| e.height(Handle::from_raw(target)))
}

// --- drawing ----------------------------------------------------------------

#[no_mangle]
pub extern "C" fn inkgfx_clear_rgb332(target: u32, color: u8) -> bool {
    with_engine("inkgfx_clear_rgb332", false, |e| {
        e.clear(Handle::from_raw(target), Rgb332::new(color).into())?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_clear_rgb888(target: u32, color: u32) -> bool {
    with_engine("inkgfx_clear_rgb888", false, |e| {
        e.clear(Handle::from_raw(target), Rgb888::new(color))?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_fill_rect_rgb332(
    target: u32,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    color: u8,
) -> bool {
    with_engine("inkgfx_fill_rect_rgb332", false, |e| {
        e.fill_rect(
            Handle::from_raw(target),
            left,
            top,
            width,
            height,
            Rgb332::new(color).into(),
        )?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_fill_rect_rgb888(
    target: u32,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    color: u32,
) -> bool {
    with_engine("inkgfx_fill_rect_rgb888", false, |e| {
        e.fill_rect(
            Handle::from_raw(target),
            left,
            top,
            width,
            height,
            Rgb888::new(color),
        )?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_draw_rect_rgb332(
    target: u32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    color: u8,
) -> bool {
    with_engine("inkgfx_draw_rect_rgb332", false, |e| {
        e.draw_rect(
            Handle::from_raw(target),
            x,
            y,
            width,
            height,
            Rgb332::new(color).into(),
        )?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_draw_rect_rgb888(
    target: u32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    color: u32,
) -> bool {
    with_engine("inkgfx_draw_rect_rgb888", false, |e| {
        e.draw_rect(
            Handle::from_raw(target),
            x,
            y,
            width,
            height,
            Rgb888::new(color),
        )?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_draw_line_rgb332(
    target: u32,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    color: u8,
) -> bool {
    with_engine("inkgfx_draw_line_rgb332", false, |e| {
        e.draw_line(
            Handle::from_raw(target),
            x0,
            y0,
            x1,
            y1,
            Rgb332::new(color).into(),
        )?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_draw_line_rgb888(
    target: u32,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    color: u32,
) -> bool {
    with_engine("inkgfx_draw_line_rgb888", false, |e| {
        e.draw_line(Handle::from_raw(target), x0, y0, x1, y1, Rgb888::new(color))?;
        Ok(true)
    })
}

/// Read one pixel back as `0x00RRGGBB` into `out`. Returns `false` when the
/// point is outside the target or the handle does not resolve.
///
/// # Safety
///
/// `out` must be null or point to a writable `u32`.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_read_pixel(target: u32, x: i32, y: i32, out: *mut u32) -> bool {
    if out.is_null() {
        return false;
    }
    with_engine("inkgfx_read_pixel", false, |e| {
        match e.read_pixel(Handle::from_raw(target), x, y)? {
            Some(color) => {
                unsafe { out.write(color.raw()) };
                Ok(true)
            }
            None => Ok(false),
        }
    })
}

// --- images -----------------------------------------------------------------

unsafe fn push_image(
    name: &str,
    target: u32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    format: ImageFormat,
    data: *const u8,
    bytes_per_pixel: usize,
) -> bool {
    if data.is_null() || width <= 0 || height <= 0 {
        return false;
    }
    let len = width as usize * height as usize * bytes_per_pixel;
    let slice = unsafe { std::slice::from_raw_parts(data, len) };
    with_engine(name, false, |e| {
        e.push_image(Handle::from_raw(target), x, y, width, height, format, slice)?;
        Ok(true)
    })
}

/// Copy a grayscale buffer (one byte per pixel) into the target.
///
/// # Safety
///
/// `data` must be null or point to at least `width * height` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_push_image_grayscale(
    target: u32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    data: *const u8,
) -> bool {
    unsafe {
        push_image(
            "inkgfx_push_image_grayscale",
            target,
            x,
            y,
            width,
            height,
            ImageFormat::Gray8,
            data,
            1,
        )
    }
}

/// # Safety
///
/// `data` must be null or point to at least `width * height` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_push_image_rgb332(
    target: u32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    data: *const u8,
) -> bool {
    unsafe {
        push_image(
            "inkgfx_push_image_rgb332",
            target,
            x,
            y,
            width,
            height,
            ImageFormat::Rgb332,
            data,
            1,
        )
    }
}

/// Pixels are little-endian `0x00RRGGBB` words.
///
/// # Safety
///
/// `data` must be null or point to at least `width * height * 4` readable
/// bytes.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_push_image_rgb888(
    target: u32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    data: *const u8,
) -> bool {
    unsafe {
        push_image(
            "inkgfx_push_image_rgb888",
            target,
            x,
            y,
            width,
            height,
            ImageFormat::Rgb888,
            data,
            4,
        )
    }
}

/// Decode a PNG and draw it anchored at `(x, y)`.
///
/// # Safety
///
/// `data` must be null or point to `len` readable bytes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn inkgfx_draw_png(
    target: u32,
    data: *const u8,
    len: usize,
    x: i32,
    y: i32,
    max_width: i32,
    max_height: i32,
    offset_x: i32,
    offset_y: i32,
    scale_x: f32,
    scale_y: f32,
    datum: u8,
) -> bool {
    if data.is_null() {
        return false;
    }
    let slice = unsafe { std::slice::from_raw_parts(data, len) };
    with_engine("inkgfx_draw_png", false, |e| {
        let options = PngOptions {
            max_width,
            max_height,
            offset_x,
            offset_y,
            scale_x,
            scale_y,
            datum: Datum::from_raw(datum)?,
        };
        e.draw_png(Handle::from_raw(target), slice, x, y, &options)?;
        Ok(true)
    })
}

// --- sprites ----------------------------------------------------------------

/// Create an off-screen sprite parented to `target`. Returns its handle, or
/// `0` on failure.
#[no_mangle]
pub extern "C" fn inkgfx_create_sprite(target: u32, width: i32, height: i32) -> u32 {
    with_engine("inkgfx_create_sprite", Handle::INVALID.raw(), |e| {
        Ok(e.create_sprite(Handle::from_raw(target), width, height)?.raw())
    })
}

/// Create a sprite that draws into caller-owned memory. The buffer is never
/// freed by the engine. `bpp` selects the pixel format: 8 for packed 3-3-2,
/// 32 for `0x00RRGGBB` words.
///
/// # Safety
///
/// `buffer` must point to at least `width * height * bpp / 8` writable bytes
/// that outlive the sprite and are not accessed from elsewhere while it is
/// alive.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_create_sprite_static(
    target: u32,
    width: i32,
    height: i32,
    buffer: *mut u8,
    bpp: u8,
) -> u32 {
    if buffer.is_null() {
        return Handle::INVALID.raw();
    }
    with_engine("inkgfx_create_sprite_static", Handle::INVALID.raw(), |e| {
        let handle =
            unsafe { e.create_sprite_static(Handle::from_raw(target), width, height, buffer, bpp)? };
        Ok(handle.raw())
    })
}

/// Composite a sprite onto the parent it was created with.
#[no_mangle]
pub extern "C" fn inkgfx_push_sprite(target: u32, x: i32, y: i32) -> bool {
    with_engine("inkgfx_push_sprite", false, |e| {
        e.push_sprite(Handle::from_raw(target), x, y)?;
        Ok(true)
    })
}

/// Release a sprite and its owned buffer. The null handle is accepted and
/// does nothing.
#[no_mangle]
pub extern "C" fn inkgfx_delete_sprite(target: u32) -> bool {
    with_engine("inkgfx_delete_sprite", false, |e| {
        e.delete_sprite(Handle::from_raw(target))?;
        Ok(true)
    })
}

// --- write bracket ----------------------------------------------------------

#[no_mangle]
pub extern "C" fn inkgfx_start_write(target: u32) -> bool {
    with_engine("inkgfx_start_write", false, |e| {
        e.start_write(Handle::from_raw(target))?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_end_write(target: u32) -> bool {
    with_engine("inkgfx_end_write", false, |e| {
        e.end_write(Handle::from_raw(target))?;
        Ok(true)
    })
}

// --- text -------------------------------------------------------------------

/// Render the valid UTF-8 prefix of `buffer` at the target's cursor; returns
/// the number of bytes consumed.
///
/// # Safety
///
/// `buffer` must be null or point to `length` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_write(target: u32, buffer: *const u8, length: usize) -> usize {
    if buffer.is_null() {
        return 0;
    }
    let slice = unsafe { std::slice::from_raw_parts(buffer, length) };
    with_engine("inkgfx_write", 0, |e| {
        e.write_bytes(Handle::from_raw(target), slice)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_set_cursor(target: u32, x: i32, y: i32) -> bool {
    with_engine("inkgfx_set_cursor", false, |e| {
        e.set_cursor(Handle::from_raw(target), x, y)?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_set_text_size(target: u32, sx: f32, sy: f32) -> bool {
    with_engine("inkgfx_set_text_size", false, |e| {
        e.set_text_size(Handle::from_raw(target), sx, sy)?;
        Ok(true)
    })
}

/// `datum` uses the packed anchor encoding: horizontal 0/1/2 in the low two
/// bits, vertical 0/4/8/16.
#[no_mangle]
pub extern "C" fn inkgfx_set_text_datum(target: u32, datum: u8) -> bool {
    with_engine("inkgfx_set_text_datum", false, |e| {
        e.set_text_datum(Handle::from_raw(target), Datum::from_raw(datum)?)?;
        Ok(true)
    })
}

#[no_mangle]
pub extern "C" fn inkgfx_set_text_color_rgb888(target: u32, fg: u32, bg: u32) -> bool {
    with_engine("inkgfx_set_text_color_rgb888", false, |e| {
        e.set_text_color(Handle::from_raw(target), Rgb888::new(fg), Rgb888::new(bg))?;
        Ok(true)
    })
}

fn draw_char(
    name: &str,
    target: u32,
    x: i32,
    y: i32,
    unicode: u16,
    fg: Rgb888,
    bg: Rgb888,
    sx: f32,
    sy: f32,
) -> usize {
    // Lone surrogates are not characters.
    let Some(c) = char::from_u32(unicode as u32) else {
        return 0;
    };
    with_engine(name, 0, |e| {
        let advance = e.draw_char(Handle::from_raw(target), c, x, y, fg, bg, sx, sy)?;
        Ok(advance.max(0) as usize)
    })
}

/// Draw one character; returns its scaled advance in pixels.
#[no_mangle]
pub extern "C" fn inkgfx_draw_char_rgb332(
    target: u32,
    x: i32,
    y: i32,
    unicode: u16,
    color: u8,
    bg: u8,
    size_x: f32,
    size_y: f32,
) -> usize {
    draw_char(
        "inkgfx_draw_char_rgb332",
        target,
        x,
        y,
        unicode,
        Rgb332::new(color).into(),
        Rgb332::new(bg).into(),
        size_x,
        size_y,
    )
}

#[no_mangle]
pub extern "C" fn inkgfx_draw_char_rgb888(
    target: u32,
    x: i32,
    y: i32,
    unicode: u16,
    color: u32,
    bg: u32,
    size_x: f32,
    size_y: f32,
) -> usize {
    draw_char(
        "inkgfx_draw_char_rgb888",
        target,
        x,
        y,
        unicode,
        Rgb888::new(color),
        Rgb888::new(bg),
        size_x,
        size_y,
    )
}

/// Measure a UTF-8 string without drawing it.
///
/// # Safety
///
/// `s` must be null or point to `len` readable bytes; `out_width` and
/// `out_height` must each be null or point to a writable `i32`.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_measure_string(
    target: u32,
    s: *const u8,
    len: usize,
    size_x: f32,
    size_y: f32,
    out_width: *mut i32,
    out_height: *mut i32,
) -> bool {
    if s.is_null() {
        return false;
    }
    let bytes = unsafe { std::slice::from_raw_parts(s, len) };
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    with_engine("inkgfx_measure_string", false, |e| {
        let (w, h) = e.measure_string(Handle::from_raw(target), text, size_x, size_y)?;
        unsafe {
            if !out_width.is_null() {
                out_width.write(w);
            }
            if !out_height.is_null() {
                out_height.write(h);
            }
        }
        Ok(true)
    })
}

/// Draw a UTF-8 string anchored at `(x, y)` per the packed datum encoding,
/// using the target's current colors and text size.
///
/// # Safety
///
/// `s` must be null or point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_draw_string(
    target: u32,
    s: *const u8,
    len: usize,
    x: i32,
    y: i32,
    datum: u8,
) -> bool {
    if s.is_null() {
        return false;
    }
    let bytes = unsafe { std::slice::from_raw_parts(s, len) };
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    with_engine("inkgfx_draw_string", false, |e| {
        e.draw_string(Handle::from_raw(target), text, x, y, Datum::from_raw(datum)?)?;
        Ok(true)
    })
}

// --- fonts ------------------------------------------------------------------

/// Glyph metrics as laid out on the binding surface. Field order is part of
/// the contract.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct RawFontMetrics {
    pub width: i16,
    pub x_advance: i16,
    pub x_offset: i16,
    pub height: i16,
    pub y_advance: i16,
    pub y_offset: i16,
    pub baseline: i16,
}

impl From<inkgfx::FontMetrics> for RawFontMetrics {
    fn from(m: inkgfx::FontMetrics) -> Self {
        Self {
            width: m.width,
            x_advance: m.x_advance,
            x_offset: m.x_offset,
            height: m.height,
            y_advance: m.y_advance,
            y_offset: m.y_offset,
            baseline: m.baseline,
        }
    }
}

/// Parse a TTF/OTF font rasterized at `px` pixels. Returns an owned font
/// pointer, or null when the data is rejected. Release it with
/// [`inkgfx_free_font`].
///
/// # Safety
///
/// `data` must be null or point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_load_font(data: *const u8, len: usize, px: f32) -> *const Font {
    if data.is_null() {
        return std::ptr::null();
    }
    let slice = unsafe { std::slice::from_raw_parts(data, len) };
    match Font::from_ttf(slice, px) {
        Ok(font) => Arc::into_raw(Arc::new(font)),
        Err(e) => {
            log::warn!("inkgfx_load_font rejected: {e}");
            std::ptr::null()
        }
    }
}

/// Release a font returned by [`inkgfx_load_font`]. Targets holding the font
/// keep it alive; the last reference frees it. Null is accepted.
///
/// # Safety
///
/// `font` must be null or a pointer from [`inkgfx_load_font`] that has not
/// already been freed.
#[no_mangle]
pub unsafe extern "C" fn inkgfx_free_font(font: *const Font) {
    if !font.is_null() {
        drop(unsafe { Arc::from_raw(font) });
    }
}

/// Select the target's active font. Null is rejected.
///
/// # Safety
///
/// `font` must be null or a live pointer from [`inkgfx_load_font`] or
/// [`inkgfx_get_font`].
#[no_mangle]
pub unsafe extern "C" fn inkgfx_set_font(target: u32, font: *const Font) -> bool {
    if font.is_null() {
        return false;
    }
    // The caller keeps its reference; take a new one for the target.
    let font = unsafe {
        Arc::increment_strong_count(font);
        Arc::from_raw(font)
    };
    with_engine("inkgfx_set_font", false, |e| {
        e.set_font(Handle::from_raw(target), font)?;
        Ok(true)
    })
}

/// Borrow the target's active font. The pointer stays valid while the target
/// holds the font; it is not an owned reference.
#[no_mangle]
pub extern "C" fn inkgfx_get_font(target: u32) -> *const Font {
    with_engine("inkgfx_get_font", std::ptr::null(), |e| {
        Ok(Arc::as_ptr(&e.font(Handle::from_raw(target))?))
    })
}

/// Font-wide default metrics.
///
/// # Safety
///
/// `font` must be a live font pointer; `metrics` must be null or point to a
/// writable [`RawFontMetrics`].
#[no_mangle]
pub unsafe extern "C" fn inkgfx_font_get_default_metrics(
    font: *const Font,
    metrics: *mut RawFontMetrics,
) {
    if font.is_null() || metrics.is_null() {
        return;
    }
    let font = unsafe { &*font };
    unsafe { metrics.write(font.default_metrics().into()) };
}

/// Update `metrics` for one character. Returns `false` and leaves `metrics`
/// untouched when the font has no glyph for it.
///
/// # Safety
///
/// `font` must be a live font pointer; `metrics` must be null or point to a
/// writable [`RawFontMetrics`].
#[no_mangle]
pub unsafe extern "C" fn inkgfx_font_update_font_metrics(
    font: *const Font,
    metrics: *mut RawFontMetrics,
    unicode: u16,
) -> bool {
    if font.is_null() || metrics.is_null() {
        return false;
    }
    let Some(c) = char::from_u32(unicode as u32) else {
        return false;
    };
    let font = unsafe { &*font };
    match font.glyph_metrics(c) {
        Ok(m) => {
            unsafe { metrics.write(m.into()) };
            true
        }
        Err(e) => {
            log::warn!("inkgfx_font_update_font_metrics rejected: {e}");
            false
        }
    }
}

/// Scaled line height of the target's active font.
#[no_mangle]
pub extern "C" fn inkgfx_font_height(target: u32) -> i32 {
    with_engine("inkgfx_font_height", 0, |e| {
        e.font_height(Handle::from_raw(target))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Layout of the metrics struct is a binding contract.
    #[test]
    fn raw_metrics_layout_matches_the_contract() {
        assert_eq!(std::mem::size_of::<RawFontMetrics>(), 14);
        let m = RawFontMetrics {
            width: 1,
            x_advance: 2,
            x_offset: 3,
            height: 4,
            y_advance: 5,
            y_offset: 6,
            baseline: 7,
        };
        let words: [i16; 7] = unsafe { std::mem::transmute(m) };
        assert_eq!(words, [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn error_mapping_uses_the_sentinel() {
        // Exercised without the singleton: with_engine itself reports the
        // default before setup.
        assert!(!inkgfx_is_epd(Handle::ROOT.raw()));
        assert_eq!(inkgfx_width(0xDEAD_BEEF), 0);
    }
}
