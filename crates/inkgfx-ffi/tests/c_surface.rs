//! Exercises the C surface end to end. The engine is a process-wide
//! singleton, so everything runs in one test function to keep the calls
//! sequential.

use inkgfx_ffi::*;

const WHITE: u32 = 0x00FF_FFFF;
const BLACK: u32 = 0x0000_0000;

fn pixel(target: u32, x: i32, y: i32) -> Option<u32> {
    let mut out = 0u32;
    if unsafe { inkgfx_read_pixel(target, x, y, &mut out) } {
        Some(out)
    } else {
        None
    }
}

#[test]
fn c_surface_end_to_end() {
    // Calls before setup report sentinels, never crash.
    assert_eq!(inkgfx_width(1), 0);
    assert!(!inkgfx_clear_rgb888(1, WHITE));

    // Setup is idempotent and rejects bad sizes after the fact.
    assert_eq!(inkgfx_setup(0, 10), 0);
    let root = inkgfx_setup(120, 80);
    assert_eq!(root, 1);
    assert_eq!(inkgfx_setup(999, 999), root);
    assert_eq!(inkgfx_width(root), 120);
    assert_eq!(inkgfx_height(root), 80);
    assert!(inkgfx_is_epd(root));

    // Refresh mode round-trips its wire values; garbage is rejected.
    assert_eq!(inkgfx_get_refresh_mode(root), 1);
    assert!(inkgfx_set_refresh_mode(root, 4));
    assert_eq!(inkgfx_get_refresh_mode(root), 4);
    assert!(!inkgfx_set_refresh_mode(root, 0));
    assert_eq!(inkgfx_get_refresh_mode(root), 4);

    // Basic drawing with readback.
    assert!(inkgfx_clear_rgb888(root, WHITE));
    assert!(inkgfx_fill_rect_rgb888(root, 10, 10, 20, 20, BLACK));
    assert_eq!(pixel(root, 15, 15), Some(BLACK));
    assert_eq!(pixel(root, 5, 5), Some(WHITE));
    assert_eq!(pixel(root, 500, 5), None);

    // 3-3-2 colors expand to full-scale channels.
    assert!(inkgfx_fill_rect_rgb332(root, 0, 0, 2, 2, 0xFF));
    assert_eq!(pixel(root, 0, 0), Some(WHITE));

    assert!(inkgfx_draw_line_rgb888(root, 0, 40, 119, 40, BLACK));
    assert_eq!(pixel(root, 60, 40), Some(BLACK));
    assert!(inkgfx_draw_rect_rgb888(root, 50, 50, 10, 10, BLACK));
    assert_eq!(pixel(root, 50, 50), Some(BLACK));
    assert_eq!(pixel(root, 55, 55), Some(WHITE));

    // Write bracket brackets without changing pixels.
    assert!(inkgfx_start_write(root));
    assert!(inkgfx_clear_rgb888(root, BLACK));
    assert!(inkgfx_end_write(root));
    assert_eq!(pixel(root, 0, 0), Some(BLACK));
    // Unmatched close is tolerated.
    assert!(inkgfx_end_write(root));

    // Raw image push.
    let gray = [0xFFu8; 4];
    assert!(unsafe { inkgfx_push_image_grayscale(root, 2, 2, 2, 2, gray.as_ptr()) });
    assert_eq!(pixel(root, 3, 3), Some(WHITE));
    assert!(!unsafe { inkgfx_push_image_grayscale(root, 0, 0, 2, 2, std::ptr::null()) });

    // Sprite lifecycle through raw handles.
    let sprite = inkgfx_create_sprite(root, 8, 8);
    assert_ne!(sprite, 0);
    assert_eq!(inkgfx_width(sprite), 8);
    assert!(inkgfx_clear_rgb888(sprite, WHITE));
    assert!(inkgfx_push_sprite(sprite, 20, 20));
    assert_eq!(pixel(root, 24, 24), Some(WHITE));
    assert!(inkgfx_delete_sprite(sprite));
    // Stale handle afterwards: rejected, not resolved.
    assert!(!inkgfx_clear_rgb888(sprite, WHITE));
    assert!(!inkgfx_push_sprite(sprite, 0, 0));
    // The null handle deletes to a no-op; the root cannot be deleted.
    assert!(inkgfx_delete_sprite(0));
    assert!(!inkgfx_delete_sprite(root));

    // Wrong-variant calls are rejected.
    let sprite = inkgfx_create_sprite(root, 4, 4);
    assert!(!inkgfx_set_refresh_mode(sprite, 1));
    assert!(!inkgfx_is_epd(sprite));
    assert!(!inkgfx_push_sprite(root, 0, 0));
    assert!(inkgfx_delete_sprite(sprite));

    // Static sprite draws into the caller's buffer.
    let mut backing = vec![0u8; 4 * 4 * 4];
    let sprite =
        unsafe { inkgfx_create_sprite_static(root, 4, 4, backing.as_mut_ptr(), 32) };
    assert_ne!(sprite, 0);
    assert!(inkgfx_clear_rgb888(sprite, 0x112233));
    assert!(inkgfx_delete_sprite(sprite));
    let first = u32::from_le_bytes([backing[0], backing[1], backing[2], backing[3]]);
    assert_eq!(first, 0x112233);
    // Unknown bit depth is rejected.
    assert_eq!(
        unsafe { inkgfx_create_sprite_static(root, 4, 4, backing.as_mut_ptr(), 16) },
        0
    );

    // PNG drawing.
    let png = png_fixture();
    assert!(inkgfx_clear_rgb888(root, BLACK));
    assert!(unsafe {
        inkgfx_draw_png(root, png.as_ptr(), png.len(), 30, 30, 0, 0, 0, 0, 1.0, 0.0, 0)
    });
    assert_eq!(pixel(root, 30, 30), Some(WHITE));
    // Invalid datum byte is rejected before decoding.
    assert!(!unsafe {
        inkgfx_draw_png(root, png.as_ptr(), png.len(), 0, 0, 0, 0, 0, 0, 1.0, 0.0, 3)
    });
    assert!(!unsafe {
        inkgfx_draw_png(root, [0u8; 4].as_ptr(), 4, 0, 0, 0, 0, 0, 0, 1.0, 0.0, 0)
    });

    // Text through the cursor path.
    assert!(inkgfx_clear_rgb888(root, BLACK));
    assert!(inkgfx_set_text_color_rgb888(root, WHITE, BLACK));
    assert!(inkgfx_set_cursor(root, 4, 4));
    assert_eq!(unsafe { inkgfx_write(root, b"hi".as_ptr(), 2) }, 2);
    let mut lit = false;
    for y in 0..16 {
        for x in 0..20 {
            if pixel(root, x, y) == Some(WHITE) {
                lit = true;
            }
        }
    }
    assert!(lit, "expected glyph pixels after inkgfx_write");

    // Invalid UTF-8 consumes only the valid prefix.
    let bytes = [b'a', 0xFF, b'b'];
    assert_eq!(unsafe { inkgfx_write(root, bytes.as_ptr(), 3) }, 1);

    // Measurement and anchored drawing.
    let (mut w, mut h) = (0i32, 0i32);
    assert!(unsafe {
        inkgfx_measure_string(root, b"hi".as_ptr(), 2, 1.0, 1.0, &mut w, &mut h)
    });
    assert_eq!((w, h), (12, 10));
    assert!(unsafe { inkgfx_draw_string(root, b"hi".as_ptr(), 2, 60, 40, 5) });
    assert!(!unsafe { inkgfx_draw_string(root, b"hi".as_ptr(), 2, 0, 0, 7) });

    // Datum and text state setters validate their wire encodings.
    assert!(inkgfx_set_text_datum(root, 18));
    assert!(!inkgfx_set_text_datum(root, 3));
    assert!(inkgfx_set_text_size(root, 2.0, 2.0));
    assert!(inkgfx_set_text_datum(root, 0));
    assert!(inkgfx_set_text_size(root, 1.0, 1.0));

    // Default font metrics through the opaque font pointer.
    let font = inkgfx_get_font(root);
    assert!(!font.is_null());
    let mut metrics = RawFontMetrics::default();
    unsafe { inkgfx_font_get_default_metrics(font, &mut metrics) };
    assert_eq!(metrics.width, 6);
    assert_eq!(metrics.height, 10);
    assert!(unsafe { inkgfx_font_update_font_metrics(font, &mut metrics, b'W' as u16) });
    assert_eq!(metrics.x_advance, 6);
    assert_eq!(inkgfx_font_height(root), 10);

    // Draw-char returns the advance; lone surrogates return zero.
    assert_eq!(
        inkgfx_draw_char_rgb888(root, 0, 60, b'A' as u16, WHITE, BLACK, 1.0, 1.0),
        6
    );
    assert_eq!(
        inkgfx_draw_char_rgb888(root, 0, 60, 0xD800, WHITE, BLACK, 1.0, 1.0),
        0
    );
    assert_eq!(
        inkgfx_draw_char_rgb332(root, 8, 60, b'A' as u16, 0xFF, 0x00, 2.0, 1.0),
        12
    );

    // Garbage font data yields a null pointer, which free accepts.
    let bad = unsafe { inkgfx_load_font([0u8; 8].as_ptr(), 8, 16.0) };
    assert!(bad.is_null());
    unsafe { inkgfx_free_font(bad) };
    assert!(!unsafe { inkgfx_set_font(root, std::ptr::null()) });

    // Rotation swaps the reported size.
    assert!(inkgfx_set_rotation(root, 1));
    assert_eq!(inkgfx_width(root), 80);
    assert_eq!(inkgfx_height(root), 120);
    assert!(!inkgfx_set_rotation(root, 4));
    assert!(inkgfx_set_rotation(root, 0));
}

fn png_fixture() -> Vec<u8> {
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder;
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&[255u8; 2 * 2 * 4], 2, 2, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}
