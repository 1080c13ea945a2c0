//! Packed color encodings
//!
//! Two encodings cross the binding surface: [`Rgb332`] (one byte, 3-3-2
//! channels) and [`Rgb888`] (low 24 bits of a `u32`). The canvas stores
//! canonical 24-bit color; 332 values are expanded by bit replication on the
//! way in and truncated on the way out.

use embedded_graphics::pixelcolor::Rgb888 as EgRgb888;
use embedded_graphics::prelude::RgbColor;

/// Packed 3-3-2 color, one byte: `rrrgggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb332(u8);

impl Rgb332 {
    /// Wrap a raw packed byte.
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// The raw packed byte.
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Packed 8-8-8 color in the low 24 bits of a `u32`: `0x00RRGGBB`.
///
/// The top byte is unused and always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb888(u32);

impl Rgb888 {
    pub const BLACK: Rgb888 = Rgb888(0x000000);
    pub const WHITE: Rgb888 = Rgb888(0xFFFFFF);

    /// Wrap a raw packed value. The unused top byte is masked off.
    pub const fn new(raw: u32) -> Self {
        Self(raw & 0x00FF_FFFF)
    }

    /// Build from individual channels.
    pub const fn from_channels(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// The raw packed value, top byte zero.
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn b(self) -> u8 {
        self.0 as u8
    }
}

impl From<Rgb332> for Rgb888 {
    /// Expand by bit replication so full-scale channels map to full-scale
    /// 8-bit values (0b111 -> 0xFF, 0b11 -> 0xFF).
    fn from(c: Rgb332) -> Self {
        let r3 = (c.0 >> 5) & 0x07;
        let g3 = (c.0 >> 2) & 0x07;
        let b2 = c.0 & 0x03;
        let r = (r3 << 5) | (r3 << 2) | (r3 >> 1);
        let g = (g3 << 5) | (g3 << 2) | (g3 >> 1);
        let b = (b2 << 6) | (b2 << 4) | (b2 << 2) | b2;
        Rgb888::from_channels(r, g, b)
    }
}

impl From<Rgb888> for Rgb332 {
    fn from(c: Rgb888) -> Self {
        Rgb332((c.r() & 0xE0) | ((c.g() >> 3) & 0x1C) | (c.b() >> 6))
    }
}

impl From<Rgb888> for EgRgb888 {
    fn from(c: Rgb888) -> Self {
        EgRgb888::new(c.r(), c.g(), c.b())
    }
}

impl From<EgRgb888> for Rgb888 {
    fn from(c: EgRgb888) -> Self {
        Rgb888::from_channels(c.r(), c.g(), c.b())
    }
}

impl From<Rgb332> for EgRgb888 {
    fn from(c: Rgb332) -> Self {
        Rgb888::from(c).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb332_expansion_hits_full_scale() {
        assert_eq!(Rgb888::from(Rgb332::new(0xFF)), Rgb888::WHITE);
        assert_eq!(Rgb888::from(Rgb332::new(0x00)), Rgb888::BLACK);
    }

    #[test]
    fn rgb332_round_trips_through_rgb888() {
        for raw in 0..=u8::MAX {
            let packed = Rgb332::new(raw);
            assert_eq!(Rgb332::from(Rgb888::from(packed)), packed);
        }
    }

    #[test]
    fn rgb888_masks_unused_byte() {
        assert_eq!(Rgb888::new(0xAB12_3456).raw(), 0x0012_3456);
    }

    #[test]
    fn channel_accessors() {
        let c = Rgb888::from_channels(0x12, 0x34, 0x56);
        assert_eq!((c.r(), c.g(), c.b()), (0x12, 0x34, 0x56));
    }
}
