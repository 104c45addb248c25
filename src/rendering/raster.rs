//! Direct raster rendering of a composition.
//!
//! Synchronous and deterministic: structurally equal input produces
//! byte-identical PNG output. The same painter runs at 1× for the raster
//! path and at the export pixel-density multiplier for snapshot capture,
//! which is what keeps preview and export visually consistent.

use std::sync::Arc;

use crate::color::Color;
use crate::error::Result;
use crate::model::{CanvasSpec, Composition};
use crate::rendering::fonts::{middle_baseline_offset, FaceMeasurer, FontStore};
use crate::rendering::framebuffer::FrameBuffer;
use crate::rendering::layout::{
    block_origin_x, layout_lines, max_line_width, stack_origin_y, LineGeometry, LineRecord,
    StyledBlock,
};
use crate::rendering::RenderedBitmap;

/// Renders compositions straight to pixels.
pub struct RasterRenderer {
    fonts: Arc<FontStore>,
}

impl RasterRenderer {
    pub fn new(fonts: Arc<FontStore>) -> Self {
        Self { fonts }
    }

    /// Render the composition at its logical canvas size.
    pub fn render(&self, composition: &Composition) -> Result<RenderedBitmap> {
        let styled: Vec<StyledBlock> =
            composition.blocks.iter().map(StyledBlock::resolve).collect();
        let fb = paint_blocks(
            &self.fonts,
            &composition.canvas,
            composition.background,
            &styled,
            1.0,
        )?;
        Ok(RenderedBitmap {
            width: fb.width,
            height: fb.height,
            png_data: fb.encode_png()?,
            version: composition.version,
        })
    }
}

/// Paint a resolved block stack onto a freshly allocated surface.
///
/// `scale` multiplies every linear quantity (canvas size, type size,
/// spacing, anchors), so a 2× capture is geometrically identical to the 1×
/// preview.
pub(crate) fn paint_blocks(
    fonts: &FontStore,
    canvas: &CanvasSpec,
    background: Color,
    blocks: &[StyledBlock],
    scale: f32,
) -> Result<FrameBuffer> {
    let width = (canvas.width as f32 * scale).round() as u32;
    let height = (canvas.height as f32 * scale).round() as u32;
    let mut fb = FrameBuffer::new(width, height, background);

    let mut cursor_y = stack_origin_y(canvas) * scale;
    for block in blocks {
        let face = fonts.face(&block.face)?;
        let px = block.px * scale;
        let letter_spacing = block.letter_spacing * scale;
        let pitch = block.line_pitch * scale;

        cursor_y += block.padding_y * scale;

        let geom = LineGeometry {
            origin_x: block_origin_x(canvas) * scale,
            first_baseline_y: cursor_y + middle_baseline_offset(&face, px),
            max_width: max_line_width(canvas) * scale,
            line_pitch: pitch,
        };
        let measurer = FaceMeasurer::new(&face, px, letter_spacing);
        let lines = layout_lines(&block.text, &measurer, &geom);

        for line in &lines {
            draw_line(&mut fb, &face, line, px, letter_spacing);
        }

        cursor_y += lines.len() as f32 * pitch + block.padding_y * scale;
    }

    Ok(fb)
}

/// Paint one line's glyphs in black, advancing by glyph advance plus
/// letter-spacing after every character (the measurer uses the same
/// accumulation, so wrap decisions and painted widths cannot disagree).
fn draw_line(
    fb: &mut FrameBuffer,
    font: &fontdue::Font,
    line: &LineRecord,
    px: f32,
    letter_spacing: f32,
) {
    let baseline = line.baseline_y.round() as i32;
    let mut pen_x = line.x;

    for ch in line.content.chars() {
        let (metrics, coverage) = font.rasterize(ch, px);
        let gx = (pen_x + metrics.xmin as f32).round() as i32;
        let gy = baseline - (metrics.ymin + metrics.height as i32);

        for (i, cov) in coverage.iter().enumerate() {
            if *cov == 0 {
                continue;
            }
            let dx = (i % metrics.width) as i32;
            let dy = (i / metrics.width) as i32;
            fb.blend_pixel(gx + dx, gy + dy, Color::BLACK, *cov);
        }

        pen_x += metrics.advance_width + letter_spacing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::TextBlock;
    use crate::rendering::fonts::FaceKey;

    /// Look for any parseable font on the host so glyph-painting tests can
    /// run where one exists and skip where none does.
    fn any_system_font() -> Option<Vec<u8>> {
        fn scan(dir: &std::path::Path, remaining: &mut u32, out: &mut Vec<std::path::PathBuf>) {
            if *remaining == 0 {
                return;
            }
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                if *remaining == 0 {
                    return;
                }
                let path = entry.path();
                if path.is_dir() {
                    scan(&path, remaining, out);
                } else if matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("ttf") | Some("otf")
                ) {
                    *remaining -= 1;
                    out.push(path);
                }
            }
        }

        let mut candidates = Vec::new();
        let mut remaining = 50u32;
        for root in [
            "/usr/share/fonts",
            "/usr/local/share/fonts",
            "/System/Library/Fonts",
            "C:\\Windows\\Fonts",
        ] {
            scan(std::path::Path::new(root), &mut remaining, &mut candidates);
        }

        for path in candidates {
            if let Ok(bytes) = std::fs::read(&path) {
                if fontdue::Font::from_bytes(bytes.as_slice(), fontdue::FontSettings::default())
                    .is_ok()
                {
                    return Some(bytes);
                }
            }
        }
        None
    }

    #[test]
    fn background_only_render_is_deterministic() {
        let renderer = RasterRenderer::new(Arc::new(FontStore::new()));
        let comp = Composition::default();

        let a = renderer.render(&comp).unwrap();
        let b = renderer.render(&comp).unwrap();
        assert_eq!(a.png_data, b.png_data);
        assert_eq!(a.width, 1200);
        assert_eq!(a.height, 675);
    }

    #[test]
    fn bitmap_is_tagged_with_composition_version() {
        let renderer = RasterRenderer::new(Arc::new(FontStore::new()));
        let mut comp = Composition::default();
        comp.set_background(Color::WHITE);
        comp.set_background(Color::new(0xA1, 0xFE, 0xA0));

        let bitmap = renderer.render(&comp).unwrap();
        assert_eq!(bitmap.version, 2);
    }

    #[test]
    fn text_without_registered_face_is_an_error() {
        let renderer = RasterRenderer::new(Arc::new(FontStore::new()));
        let comp = Composition::starter();
        let err = renderer.render(&comp).unwrap_err();
        assert!(matches!(err, Error::FontLoad(_)));
    }

    #[test]
    fn text_render_is_deterministic_and_paints_glyphs() {
        let Some(font_bytes) = any_system_font() else {
            eprintln!("no system font found; skipping glyph render test");
            return;
        };

        let store = FontStore::new();
        store
            .load_face_bytes(
                FaceKey::regular(crate::model::FontFamily::GtAlpina),
                &font_bytes,
            )
            .unwrap();
        let renderer = RasterRenderer::new(Arc::new(store));

        let mut comp = Composition::default();
        comp.add_block(TextBlock {
            text: "Hello, Twitter!".to_string(),
            font_size_rem: 4.0,
            letter_spacing: 0.0,
            line_height: 1.0,
            ..TextBlock::default()
        });

        let a = renderer.render(&comp).unwrap();
        let b = renderer.render(&comp).unwrap();
        assert_eq!(a.png_data, b.png_data);

        // Decode and look for ink: some pixel must be darker than the background
        let decoder = png::Decoder::new(&a.png_data[..]);
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        let darkened = buf[..info.buffer_size()]
            .chunks(4)
            .any(|px| px[0] < 0xA1 && px[1] < 0xFE);
        assert!(darkened, "expected painted glyph pixels");
    }

    #[test]
    fn scaled_painting_doubles_the_buffer() {
        let fb = paint_blocks(
            &FontStore::new(),
            &CanvasSpec::default(),
            Color::WHITE,
            &[],
            2.0,
        )
        .unwrap();
        assert_eq!(fb.width, 2400);
        assert_eq!(fb.height, 1350);
    }
}
