//! Handle-based 2D graphics engine for e-paper class displays.
//!
//! The engine exposes one root display target plus any number of off-screen
//! sprite targets, all addressed through tagged [`Handle`] values that are
//! checked on every call. Drawing covers pixels, rectangles, lines, raw
//! image pushes, PNG decoding, and text with built-in or TTF fonts; output
//! goes to an in-memory framebuffer and is flushed to a [`Panel`], either
//! per operation or batched inside a write bracket.
//!
//! ```
//! use inkgfx::{Engine, Handle, Rgb888, SimPanel};
//!
//! let mut engine = Engine::new(128, 64, SimPanel::new()).unwrap();
//! let mut frame = engine.write_scope(Handle::ROOT).unwrap();
//! frame.clear(Handle::ROOT, Rgb888::WHITE).unwrap();
//! frame.fill_rect(Handle::ROOT, 10, 10, 20, 20, Rgb888::BLACK).unwrap();
//! ```

pub mod canvas;
pub mod color;
pub mod datum;
pub mod engine;
pub mod error;
pub mod image;
pub mod panel;
mod sprite;
pub mod surface;
pub mod text;

pub use canvas::{Canvas, PixelFormat};
pub use color::{Rgb332, Rgb888};
pub use datum::{Datum, HorizontalDatum, VerticalDatum};
pub use engine::{Engine, Handle, WriteScope};
pub use error::{Error, Result};
pub use image::{ImageFormat, PngOptions};
pub use panel::{Panel, RefreshMode, SimPanel};
pub use surface::Surface;
pub use text::{Font, FontMetrics};
