//! Panel abstraction
//!
//! The engine pushes finished frames to a [`Panel`], which stands in for the
//! display hardware: a real implementation would drive a controller over SPI,
//! the shipped [`SimPanel`] just records what it was asked to do. Refresh
//! mode is panel state because it is a property of the physical display, not
//! of any drawing surface.

use crate::canvas::Canvas;
use crate::error::{Error, Result};

/// e-paper refresh mode: quality/speed tradeoff of a full panel update.
///
/// The numeric values are part of the binding contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshMode {
    #[default]
    Quality = 1,
    Text = 2,
    Fast = 3,
    Fastest = 4,
}

impl RefreshMode {
    /// Decode a wire value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRefreshMode`] outside 1..=4.
    pub fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            1 => Ok(RefreshMode::Quality),
            2 => Ok(RefreshMode::Text),
            3 => Ok(RefreshMode::Fast),
            4 => Ok(RefreshMode::Fastest),
            other => Err(Error::InvalidRefreshMode(other)),
        }
    }

    pub const fn raw(self) -> u8 {
        self as u8
    }
}

/// Display hardware behind the root target.
pub trait Panel {
    /// Whether the panel is an electrophoretic (e-ink) device.
    fn is_epd(&self) -> bool;

    fn refresh_mode(&self) -> RefreshMode;

    fn set_refresh_mode(&mut self, mode: RefreshMode);

    /// Present the frame. Called once per drawing operation outside a write
    /// bracket and once when the outermost bracket closes.
    fn flush(&mut self, frame: &Canvas);
}

/// Software panel used for tests and host-side simulation.
///
/// Records the flush count so batching behavior is observable.
pub struct SimPanel {
    epd: bool,
    mode: RefreshMode,
    flushes: usize,
}

impl SimPanel {
    /// Simulated e-paper panel.
    pub fn new() -> Self {
        Self {
            epd: true,
            mode: RefreshMode::Quality,
            flushes: 0,
        }
    }

    /// Simulated non-epd (LCD class) panel.
    pub fn lcd() -> Self {
        Self {
            epd: false,
            ..Self::new()
        }
    }

    /// Number of frames flushed so far.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl Default for SimPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for SimPanel {
    fn is_epd(&self) -> bool {
        self.epd
    }

    fn refresh_mode(&self) -> RefreshMode {
        self.mode
    }

    fn set_refresh_mode(&mut self, mode: RefreshMode) {
        self.mode = mode;
    }

    fn flush(&mut self, frame: &Canvas) {
        self.flushes += 1;
        log::trace!(
            "sim panel flush #{}: {}x{} mode={:?}",
            self.flushes,
            frame.width(),
            frame.height(),
            self.mode
        );
    }
}
