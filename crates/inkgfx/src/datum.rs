//! Text and image anchor datum
//!
//! A datum packs a horizontal and a vertical anchor into one byte: the low
//! two bits hold the horizontal component (0 left, 1 center, 2 right), the
//! remaining bits hold the vertical component times four (0 top, 1 middle,
//! 2 bottom, 4 baseline). The twelve valid packed values are
//! 0, 1, 2, 4, 5, 6, 8, 9, 10, 16, 17 and 18; these exact values are part of
//! the ABI and must not change.

use crate::error::{Error, Result};

/// Horizontal anchor component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalDatum {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// Vertical anchor component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalDatum {
    #[default]
    Top = 0,
    Middle = 1,
    Bottom = 2,
    /// The line the 'A' glyph sits on.
    Baseline = 4,
}

/// Anchor point of text and image placement relative to given coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Datum {
    pub horizontal: HorizontalDatum,
    pub vertical: VerticalDatum,
}

impl Datum {
    pub const TOP_LEFT: Datum = Datum::new(HorizontalDatum::Left, VerticalDatum::Top);
    pub const TOP_CENTER: Datum = Datum::new(HorizontalDatum::Center, VerticalDatum::Top);
    pub const TOP_RIGHT: Datum = Datum::new(HorizontalDatum::Right, VerticalDatum::Top);
    pub const MIDDLE_LEFT: Datum = Datum::new(HorizontalDatum::Left, VerticalDatum::Middle);
    pub const MIDDLE_CENTER: Datum = Datum::new(HorizontalDatum::Center, VerticalDatum::Middle);
    pub const MIDDLE_RIGHT: Datum = Datum::new(HorizontalDatum::Right, VerticalDatum::Middle);
    pub const BOTTOM_LEFT: Datum = Datum::new(HorizontalDatum::Left, VerticalDatum::Bottom);
    pub const BOTTOM_CENTER: Datum = Datum::new(HorizontalDatum::Center, VerticalDatum::Bottom);
    pub const BOTTOM_RIGHT: Datum = Datum::new(HorizontalDatum::Right, VerticalDatum::Bottom);
    pub const BASELINE_LEFT: Datum = Datum::new(HorizontalDatum::Left, VerticalDatum::Baseline);
    pub const BASELINE_CENTER: Datum =
        Datum::new(HorizontalDatum::Center, VerticalDatum::Baseline);
    pub const BASELINE_RIGHT: Datum = Datum::new(HorizontalDatum::Right, VerticalDatum::Baseline);

    pub const fn new(horizontal: HorizontalDatum, vertical: VerticalDatum) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Decode a packed datum byte.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDatum`] for any bit pattern outside the twelve
    /// valid anchor values.
    pub fn from_raw(raw: u8) -> Result<Self> {
        let horizontal = match raw & 0x03 {
            0 => HorizontalDatum::Left,
            1 => HorizontalDatum::Center,
            2 => HorizontalDatum::Right,
            _ => return Err(Error::InvalidDatum(raw)),
        };
        let vertical = match raw >> 2 {
            0 => VerticalDatum::Top,
            1 => VerticalDatum::Middle,
            2 => VerticalDatum::Bottom,
            4 => VerticalDatum::Baseline,
            _ => return Err(Error::InvalidDatum(raw)),
        };
        Ok(Self {
            horizontal,
            vertical,
        })
    }

    /// The packed byte form used on the wire.
    pub const fn raw(self) -> u8 {
        self.horizontal as u8 | ((self.vertical as u8) << 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_values_are_closed_under_composition() {
        let expected = [0u8, 1, 2, 4, 5, 6, 8, 9, 10, 16, 17, 18];
        for h in [
            HorizontalDatum::Left,
            HorizontalDatum::Center,
            HorizontalDatum::Right,
        ] {
            for v in [
                VerticalDatum::Top,
                VerticalDatum::Middle,
                VerticalDatum::Bottom,
                VerticalDatum::Baseline,
            ] {
                let raw = Datum::new(h, v).raw();
                assert!(expected.contains(&raw), "unexpected packed value {raw}");
                assert_eq!(Datum::from_raw(raw).unwrap(), Datum::new(h, v));
            }
        }
    }

    #[test]
    fn every_other_bit_pattern_is_rejected() {
        let valid = [0u8, 1, 2, 4, 5, 6, 8, 9, 10, 16, 17, 18];
        for raw in 0..=u8::MAX {
            if valid.contains(&raw) {
                assert!(Datum::from_raw(raw).is_ok());
            } else {
                assert!(
                    matches!(Datum::from_raw(raw), Err(Error::InvalidDatum(r)) if r == raw),
                    "pattern {raw:#04x} should be invalid"
                );
            }
        }
    }

    #[test]
    fn abi_values_match_the_contract() {
        assert_eq!(Datum::TOP_LEFT.raw(), 0);
        assert_eq!(Datum::MIDDLE_CENTER.raw(), 5);
        assert_eq!(Datum::BOTTOM_RIGHT.raw(), 10);
        assert_eq!(Datum::BASELINE_LEFT.raw(), 16);
        assert_eq!(Datum::BASELINE_RIGHT.raw(), 18);
    }
}
