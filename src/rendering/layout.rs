//! Greedy word-wrap producing positioned line records.
//!
//! Wrapping is width-driven: words accumulate into a candidate line and the
//! candidate's measured width (letter-spacing included) decides when to
//! commit. Lines keep their trailing space; a word wider than the available
//! width stays on its own line unsplit. There is no character-level
//! wrapping.

use crate::model::{CanvasSpec, TextBlock};
use crate::rendering::fonts::{FaceKey, TextMeasurer};

/// Fraction of the canvas width available to a line of text
pub const MAX_WIDTH_FRACTION: f32 = 0.75;

/// Text begins one tenth of the canvas width from the left edge
pub fn block_origin_x(canvas: &CanvasSpec) -> f32 {
    canvas.width as f32 / 10.0
}

/// The block stack is anchored one quarter of the way down the canvas
pub fn stack_origin_y(canvas: &CanvasSpec) -> f32 {
    canvas.height as f32 / 4.0
}

pub fn max_line_width(canvas: &CanvasSpec) -> f32 {
    canvas.width as f32 * MAX_WIDTH_FRACTION
}

/// One laid-out line: its content and the baseline position to paint it at.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    pub content: String,
    pub x: f32,
    pub baseline_y: f32,
}

/// Geometry a block's lines are laid out against.
#[derive(Debug, Clone, Copy)]
pub struct LineGeometry {
    pub origin_x: f32,
    pub first_baseline_y: f32,
    pub max_width: f32,
    pub line_pitch: f32,
}

/// A block with its typography resolved to absolute pixels; what the
/// painter and the snapshot tree actually consume.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledBlock {
    pub text: String,
    pub face: FaceKey,
    pub px: f32,
    pub letter_spacing: f32,
    pub line_pitch: f32,
    pub padding_y: f32,
}

impl StyledBlock {
    pub fn resolve(block: &TextBlock) -> Self {
        let px = block.resolved_px();
        Self {
            text: block.text.clone(),
            face: FaceKey::new(block.font_family, block.font_style, block.font_weight),
            px,
            letter_spacing: block.letter_spacing,
            line_pitch: px * block.line_height,
            padding_y: block.padding_y,
        }
    }
}

/// Greedy word-wrap. Splits `text` on spaces, accumulates words into a
/// candidate line, and commits the current line when appending the next
/// word would push the candidate strictly past `max_width` and the line
/// already holds at least one word. Empty input yields a single empty line.
pub fn layout_lines(
    text: &str,
    measurer: &dyn TextMeasurer,
    geom: &LineGeometry,
) -> Vec<LineRecord> {
    let mut lines = Vec::new();
    let mut y = geom.first_baseline_y;

    if text.is_empty() {
        lines.push(LineRecord {
            content: String::new(),
            x: geom.origin_x,
            baseline_y: y,
        });
        return lines;
    }

    let mut line = String::new();
    for word in text.split(' ') {
        let candidate = format!("{line}{word} ");
        let candidate_width = measurer.line_width(&candidate);

        if candidate_width > geom.max_width && !line.trim().is_empty() {
            lines.push(LineRecord {
                content: line,
                x: geom.origin_x,
                baseline_y: y,
            });
            y += geom.line_pitch;
            line = format!("{word} ");
        } else {
            line = candidate;
        }
    }

    lines.push(LineRecord {
        content: line,
        x: geom.origin_x,
        baseline_y: y,
    });
    lines
}
