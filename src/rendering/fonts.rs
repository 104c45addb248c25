//! Font faces, load readiness, and text measurement.
//!
//! Faces are registered per (family, style, weight) key and loaded on a
//! dedicated loader thread; readiness is published over a watch channel so
//! the snapshot path can refuse to capture before every requested face has
//! reported loaded. Measuring or painting with a fallback face produces
//! wrong line breaks, so there is no silent substitution: a missing face is
//! an error.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fontdue::{Font, FontSettings};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::model::{FontFamily, FontStyle, FontWeight};

/// Identifies one loaded face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceKey {
    pub family: FontFamily,
    pub style: FontStyle,
    pub weight: FontWeight,
}

impl FaceKey {
    pub fn new(family: FontFamily, style: FontStyle, weight: FontWeight) -> Self {
        Self {
            family,
            style,
            weight,
        }
    }

    /// The upright regular cut of a family, used as the in-family fallback
    pub fn regular(family: FontFamily) -> Self {
        Self::new(family, FontStyle::Normal, FontWeight::Normal)
    }
}

/// Load state published to waiters.
#[derive(Debug, Clone, PartialEq)]
enum Readiness {
    Loading,
    Ready,
    Failed(String),
}

/// Registry of loaded faces plus the readiness channel.
pub struct FontStore {
    faces: Mutex<HashMap<FaceKey, Arc<Font>>>,
    state_rx: watch::Receiver<Readiness>,
    state_tx: watch::Sender<Readiness>,
}

impl FontStore {
    /// An empty store. With no faces requested there is nothing to wait
    /// for, so the store reports ready immediately.
    pub fn new() -> Self {
        let (state_tx, state_rx) = watch::channel(Readiness::Ready);
        Self {
            faces: Mutex::new(HashMap::new()),
            state_rx,
            state_tx,
        }
    }

    /// Load the given face files on a background thread. Readiness flips to
    /// ready only once every file has parsed; any failure is published and
    /// sticks (captures must not proceed with a partial set).
    pub fn preload(requests: Vec<(FaceKey, PathBuf)>) -> Arc<Self> {
        let (state_tx, state_rx) = watch::channel(Readiness::Loading);
        let store = Arc::new(Self {
            faces: Mutex::new(HashMap::new()),
            state_rx,
            state_tx,
        });

        let worker = Arc::clone(&store);
        std::thread::spawn(move || {
            for (key, path) in requests {
                match std::fs::read(&path) {
                    Ok(bytes) => {
                        if let Err(e) = worker.load_face_bytes(key, &bytes) {
                            let _ = worker.state_tx.send(Readiness::Failed(e.to_string()));
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = worker.state_tx.send(Readiness::Failed(format!(
                            "failed to read {}: {e}",
                            path.display()
                        )));
                        return;
                    }
                }
            }
            let _ = worker.state_tx.send(Readiness::Ready);
        });

        store
    }

    /// Parse font bytes and register the face under `key`.
    pub fn load_face_bytes(&self, key: FaceKey, bytes: &[u8]) -> Result<()> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| Error::FontLoad(format!("{}: {e}", key.family.display_name())))?;
        self.faces.lock().unwrap().insert(key, Arc::new(font));
        Ok(())
    }

    /// Read and register a face file synchronously (the CLI path).
    pub fn load_face_file(&self, key: FaceKey, path: &std::path::Path) -> Result<()> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::FontLoad(format!("failed to read {}: {e}", path.display())))?;
        self.load_face_bytes(key, &bytes)
    }

    /// Resolve the face for a key, falling back to the family's regular cut.
    pub fn face(&self, key: &FaceKey) -> Result<Arc<Font>> {
        let faces = self.faces.lock().unwrap();
        if let Some(font) = faces.get(key) {
            return Ok(Arc::clone(font));
        }
        if let Some(font) = faces.get(&FaceKey::regular(key.family)) {
            return Ok(Arc::clone(font));
        }
        Err(Error::FontLoad(format!(
            "no face registered for {}",
            key.family.display_name()
        )))
    }

    pub fn is_ready(&self) -> bool {
        *self.state_rx.borrow() == Readiness::Ready
    }

    /// Wait until every requested face has reported loaded. Errors if any
    /// load failed; capturing with a substituted face is never acceptable.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.state_rx.clone();
        loop {
            match rx.borrow_and_update().clone() {
                Readiness::Ready => return Ok(()),
                Readiness::Failed(msg) => return Err(Error::FontLoad(msg)),
                Readiness::Loading => {}
            }
            if rx.changed().await.is_err() {
                return Err(Error::FontLoad("font loader went away".to_string()));
            }
        }
    }
}

impl Default for FontStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Width measurement for one line of styled text. The layout engine only
/// sees this seam, which keeps the wrap logic independent of any particular
/// face (and deterministic under test).
pub trait TextMeasurer {
    fn line_width(&self, text: &str) -> f32;
}

/// Measures with real glyph advances plus letter-spacing after every
/// character, the same accumulation the painter uses.
pub struct FaceMeasurer<'a> {
    font: &'a Font,
    px: f32,
    letter_spacing: f32,
}

impl<'a> FaceMeasurer<'a> {
    pub fn new(font: &'a Font, px: f32, letter_spacing: f32) -> Self {
        Self {
            font,
            px,
            letter_spacing,
        }
    }
}

impl TextMeasurer for FaceMeasurer<'_> {
    fn line_width(&self, text: &str) -> f32 {
        let mut width = 0.0f32;
        for ch in text.chars() {
            width += self.font.metrics(ch, self.px).advance_width + self.letter_spacing;
        }
        width
    }
}

/// Fixed-advance measurer: every character is `advance` wide plus the
/// letter-spacing. Deterministic stand-in for layout tests.
pub struct FixedAdvanceMeasurer {
    pub advance: f32,
    pub letter_spacing: f32,
}

impl FixedAdvanceMeasurer {
    pub fn new(advance: f32) -> Self {
        Self {
            advance,
            letter_spacing: 0.0,
        }
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn line_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * (self.advance + self.letter_spacing)
    }
}

/// Offset from a line's vertical midpoint to its alphabetic baseline.
/// Matches a drawing surface whose text baseline is anchored at "middle".
pub fn middle_baseline_offset(font: &Font, px: f32) -> f32 {
    match font.horizontal_line_metrics(px) {
        Some(m) => (m.ascent + m.descent) / 2.0, // descent is negative
        None => px * 0.35,
    }
}
