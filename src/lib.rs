//! Yapgen
//!
//! A text-over-color social post image generator: an editable list of
//! styled text blocks over a background color, rendered deterministically
//! onto a fixed 1200×675 canvas and exported as PNG.
//!
//! # Features
//!
//! - **One renderer, two entry points**: a synchronous raster path for
//!   direct rendering and an async snapshot path that waits for font
//!   readiness and captures at 2× for export sharpness. Both share the
//!   same layout engine and painter, so preview and export cannot drift.
//! - **Debounced export controller**: edit bursts collapse into a single
//!   render after a quiet period; a stale capture never overwrites a newer
//!   result.
//! - **Safe degradation**: a failed capture keeps the last good bitmap.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use yapgen::rendering::fonts::FontStore;
//! use yapgen::{Composition, RasterRenderer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let composition = Composition::default();
//! let renderer = RasterRenderer::new(Arc::new(FontStore::new()));
//! let bitmap = renderer.render(&composition)?;
//! std::fs::write("post.png", &bitmap.png_data)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

pub mod color;
pub mod controller;
pub mod error;
pub mod model;
pub mod rendering;
pub mod snapshot;

pub use color::Color;
pub use controller::{ExportController, Mutation, DEFAULT_DEBOUNCE};
pub use error::{Error, Result};
pub use model::{
    BlockEdit, CanvasSpec, Composition, FontFamily, FontStyle, FontWeight, TextBlock, ROOT_EM_PX,
};
pub use rendering::raster::RasterRenderer;
pub use rendering::RenderedBitmap;
pub use snapshot::{
    CaptureOptions, CaptureRoot, SnapshotBackend, SnapshotRenderer, SoftwareBackend,
};

use rendering::fonts::FontStore;

/// Configuration for the export pipeline
///
/// Defaults match the export target: a 1200×675 canvas, a 500 ms quiet
/// period after the last edit, and a 2× pixel-density multiplier on
/// capture.
///
/// # Examples
///
/// ```
/// let cfg = yapgen::ExportConfig::default();
/// assert_eq!(cfg.canvas.width, 1200);
/// ```
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Fixed logical canvas dimensions
    pub canvas: CanvasSpec,
    /// Quiet period after the last edit before a render runs
    pub debounce: Duration,
    /// Pixel-density multiplier applied on snapshot capture
    pub scale: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasSpec::default(),
            debounce: DEFAULT_DEBOUNCE,
            scale: 2.0,
        }
    }
}

/// Create an export controller over the default software snapshot backend.
///
/// Must be called within a tokio runtime.
pub fn new_exporter(
    composition: Composition,
    config: ExportConfig,
    fonts: Arc<FontStore>,
) -> ExportController {
    let backend = Arc::new(SoftwareBackend::new(Arc::clone(&fonts)));
    let renderer = SnapshotRenderer::new(
        fonts,
        backend,
        CaptureOptions {
            canvas: config.canvas,
            scale: config.scale,
        },
    );
    ExportController::spawn(composition, renderer, config.debounce)
}
