//! Snapshot rendering: rasterize the live styled tree.
//!
//! Where the raster path computes pixels from first principles, this path's
//! contract is "what you see is what you get": it captures the staged tree
//! the preview is showing. Sequencing matters: capturing before every
//! requested font face has loaded substitutes a fallback face and produces
//! wrong line breaks and wrong dimensions, so the phases below are strict:
//!
//!   AwaitingFonts → Settling → Capturing → Ready
//!
//! A capture failure aborts the transition and is logged; the caller keeps
//! the last successful bitmap, so a failed capture can never blank the
//! preview.

use std::sync::{Arc, Mutex};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::model::{CanvasSpec, Composition};
use crate::rendering::fonts::FontStore;
use crate::rendering::layout::StyledBlock;
use crate::rendering::raster::paint_blocks;
use crate::rendering::RenderedBitmap;

/// Explicit output geometry for one capture: fixed logical dimensions and
/// the pixel-density multiplier applied for export sharpness.
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub canvas: CanvasSpec,
    pub scale: f32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            canvas: CanvasSpec::default(),
            scale: 2.0,
        }
    }
}

/// The styled tree as the preview currently shows it: every block resolved
/// to absolute pixels, tagged with the model version it was staged from.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedTree {
    pub background: Color,
    pub canvas: CanvasSpec,
    pub blocks: Vec<StyledBlock>,
    pub version: u64,
}

impl StagedTree {
    pub fn from_composition(composition: &Composition) -> Self {
        Self {
            background: composition.background,
            canvas: composition.canvas,
            blocks: composition.blocks.iter().map(StyledBlock::resolve).collect(),
            version: composition.version,
        }
    }
}

/// The capture target, passed around as an explicit handle rather than
/// located by a well-known name. The export controller owns it and restages
/// it on every model edit; the snapshot path reads whatever is staged.
pub struct CaptureRoot {
    staged: Mutex<StagedTree>,
}

impl CaptureRoot {
    pub fn new(composition: &Composition) -> Arc<Self> {
        Arc::new(Self {
            staged: Mutex::new(StagedTree::from_composition(composition)),
        })
    }

    /// Re-derive the styled tree after a model edit.
    pub fn restage(&self, composition: &Composition) {
        *self.staged.lock().unwrap() = StagedTree::from_composition(composition);
    }

    pub fn current(&self) -> StagedTree {
        self.staged.lock().unwrap().clone()
    }
}

/// The engine that turns a staged tree into pixels.
pub trait SnapshotBackend: Send + Sync {
    fn capture(&self, tree: &StagedTree, options: &CaptureOptions) -> Result<RenderedBitmap>;
}

/// Default backend: the shared raster painter at the export multiplier, so
/// capture output is geometrically identical to the 1× preview.
pub struct SoftwareBackend {
    fonts: Arc<FontStore>,
}

impl SoftwareBackend {
    pub fn new(fonts: Arc<FontStore>) -> Self {
        Self { fonts }
    }
}

impl SnapshotBackend for SoftwareBackend {
    fn capture(&self, tree: &StagedTree, options: &CaptureOptions) -> Result<RenderedBitmap> {
        let fb = paint_blocks(
            &self.fonts,
            &options.canvas,
            tree.background,
            &tree.blocks,
            options.scale,
        )?;
        Ok(RenderedBitmap {
            width: fb.width,
            height: fb.height,
            png_data: fb.encode_png()?,
            version: tree.version,
        })
    }
}

/// Phases of one snapshot render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    AwaitingFonts,
    Settling,
    Capturing,
    Ready,
}

/// Drives the capture sequencing over a backend.
pub struct SnapshotRenderer {
    fonts: Arc<FontStore>,
    backend: Arc<dyn SnapshotBackend>,
    options: CaptureOptions,
    phase: Mutex<CapturePhase>,
}

impl SnapshotRenderer {
    pub fn new(
        fonts: Arc<FontStore>,
        backend: Arc<dyn SnapshotBackend>,
        options: CaptureOptions,
    ) -> Self {
        Self {
            fonts,
            backend,
            options,
            phase: Mutex::new(CapturePhase::AwaitingFonts),
        }
    }

    /// The phase the most recent render reached.
    pub fn phase(&self) -> CapturePhase {
        *self.phase.lock().unwrap()
    }

    fn set_phase(&self, phase: CapturePhase) {
        *self.phase.lock().unwrap() = phase;
    }

    /// Run one capture of whatever the root currently stages.
    ///
    /// `root` is `None` when the target has been torn down; that aborts the
    /// attempt with [`Error::RenderTargetMissing`]. Any failure leaves the
    /// caller's previous bitmap in place.
    pub async fn render(&self, root: Option<&Arc<CaptureRoot>>) -> Result<RenderedBitmap> {
        self.set_phase(CapturePhase::AwaitingFonts);
        self.fonts.wait_ready().await?;

        // Let one pending scheduling cycle complete so the staged tree has
        // its final geometry before we snapshot it.
        self.set_phase(CapturePhase::Settling);
        tokio::task::yield_now().await;

        self.set_phase(CapturePhase::Capturing);
        let root = root.ok_or_else(|| {
            Error::RenderTargetMissing("capture root is detached".to_string())
        })?;
        let tree = root.current();

        match self.backend.capture(&tree, &self.options) {
            Ok(bitmap) => {
                self.set_phase(CapturePhase::Ready);
                log::debug!(
                    "captured {}x{} bitmap for version {}",
                    bitmap.width,
                    bitmap.height,
                    bitmap.version
                );
                Ok(bitmap)
            }
            Err(e) => {
                log::warn!("snapshot capture failed: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextBlock;

    struct FailingBackend;

    impl SnapshotBackend for FailingBackend {
        fn capture(&self, _: &StagedTree, _: &CaptureOptions) -> Result<RenderedBitmap> {
            Err(Error::Capture("backend exploded".to_string()))
        }
    }

    fn software_renderer() -> SnapshotRenderer {
        let fonts = Arc::new(FontStore::new());
        let backend = Arc::new(SoftwareBackend::new(Arc::clone(&fonts)));
        SnapshotRenderer::new(fonts, backend, CaptureOptions::default())
    }

    #[tokio::test]
    async fn capture_produces_double_density_bitmap() {
        let renderer = software_renderer();
        let root = CaptureRoot::new(&Composition::default());

        let bitmap = renderer.render(Some(&root)).await.unwrap();
        assert_eq!(bitmap.width, 2400);
        assert_eq!(bitmap.height, 1350);
        assert_eq!(&bitmap.png_data[0..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(renderer.phase(), CapturePhase::Ready);
    }

    #[tokio::test]
    async fn detached_root_aborts_the_attempt() {
        let renderer = software_renderer();
        let err = renderer.render(None).await.unwrap_err();
        assert!(matches!(err, Error::RenderTargetMissing(_)));
        assert_eq!(renderer.phase(), CapturePhase::Capturing);
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_capture_error() {
        let fonts = Arc::new(FontStore::new());
        let renderer =
            SnapshotRenderer::new(fonts, Arc::new(FailingBackend), CaptureOptions::default());
        let root = CaptureRoot::new(&Composition::default());

        let err = renderer.render(Some(&root)).await.unwrap_err();
        assert!(matches!(err, Error::Capture(_)));
    }

    #[tokio::test]
    async fn unready_fonts_block_the_capture() {
        let fonts = FontStore::preload(vec![(
            crate::rendering::fonts::FaceKey::regular(crate::model::FontFamily::GtAlpina),
            std::path::PathBuf::from("/nonexistent/alpina.ttf"),
        )]);
        let backend = Arc::new(SoftwareBackend::new(Arc::clone(&fonts)));
        let renderer = SnapshotRenderer::new(fonts, backend, CaptureOptions::default());
        let root = CaptureRoot::new(&Composition::default());

        let err = renderer.render(Some(&root)).await.unwrap_err();
        assert!(matches!(err, Error::FontLoad(_)));
    }

    #[test]
    fn restage_tracks_model_edits() {
        let mut comp = Composition::default();
        let root = CaptureRoot::new(&comp);
        assert_eq!(root.current().version, 0);
        assert!(root.current().blocks.is_empty());

        comp.add_block(TextBlock::default());
        root.restage(&comp);
        let tree = root.current();
        assert_eq!(tree.version, 1);
        assert_eq!(tree.blocks.len(), 1);
        assert_eq!(tree.blocks[0].px, 96.0);
    }
}
